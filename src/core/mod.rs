// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Core functionalities: camera model, poses and per-pixel geometry.

pub mod camera;
pub mod depth;
pub mod flow;
pub mod normals;
pub mod points;
pub mod pose;
