// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Back-projection of depth maps into grids of 3D points.

use nalgebra::DMatrix;

use crate::core::camera::RayTable;
use crate::core::depth::DepthMap;
use crate::core::pose::Pose;
use crate::error::{Error, Result};
use crate::misc::type_aliases::{Mat4, Vec4};

/// Homogeneous 3D point `(x, y, z, 1)` of every pixel, indexed by `(row, col)`.
///
/// Points are in camera or world coordinates depending on how they were produced.
pub type PointGrid = DMatrix<Vec4>;

/// Scale the ray of every pixel by its depth.
///
/// Fails if the depth map and the ray table do not have the same shape.
pub fn camera_points(depth_map: &DepthMap, rays: &RayTable) -> Result<PointGrid> {
    check_shape(rays.shape(), depth_map.shape())?;
    Ok(DMatrix::from_fn(depth_map.nrows(), depth_map.ncols(), |row, col| {
        rays.point_at(row, col, depth_map[(row, col)])
    }))
}

/// Apply an homogeneous transform to every point of the grid.
pub fn transform(matrix: &Mat4, points: &PointGrid) -> PointGrid {
    points.map(|p| matrix * p)
}

/// World coordinates of the points of a depth map seen from `pose`.
pub fn world_points(depth_map: &DepthMap, rays: &RayTable, pose: &Pose) -> Result<PointGrid> {
    let points = camera_points(depth_map, rays)?;
    Ok(transform(&pose.camera_to_world(), &points))
}

pub(crate) fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, actual })
    }
}

// TESTS #############################################################
