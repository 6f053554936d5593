// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # Ground truth geometry of SceneNet RGB-D trajectories
//!
//! Camera model, shutter poses and their interpolation,
//! reprojection of depth maps into 3D points,
//! analytic optical flow and surface normals estimation.
//!
//! The library is organized as follows:
//!
//! - `core`: camera, poses, depth maps, optical flow and normals.
//! - `math`: small vector calculus helpers.
//! - `dataset`: constants, render paths and render log parsing of SceneNet RGB-D.
//! - `misc`: type aliases, png reading and visualization helpers.
//! - `error`: the error type of the crate.

#![warn(missing_docs)]

pub mod core;
pub mod dataset;
pub mod error;
pub mod math;
pub mod misc;
