// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Surface normals from a grid of reprojected depth points.
//!
//! A very simple estimation: the normal of each pixel is the cross product
//! of the two closest neighbors among pairs of neighbors 90° apart.
//! Fitting a local plane to the surrounding points with outlier rejection
//! (RANSAC) would be more robust, but results would differ from
//! the published ground truth normals.
//!
//! Neighbor directions around the anchor `A`, at distance `d` pixels:
//!
//! ```text
//!  -----------
//! | 7 | 0 | 1 |
//!  -----------
//! | 6 | A | 2 |
//!  -----------
//! | 5 | 4 | 3 |
//!  -----------
//! ```
//!
//! Direction `k` is paired with direction `(k + 2) % 8`.

use log::debug;
use nalgebra::DMatrix;

use crate::core::camera::RayTable;
use crate::core::depth::{self, DepthMap};
use crate::core::points::{self, PointGrid};
use crate::dataset::scenenet;
use crate::error::{Error, Result};
use crate::misc::type_aliases::{Float, Vec3};

/// Unit normal of every pixel.
/// Pixels without enough neighbors have the zero vector.
pub type NormalField = DMatrix<Vec3>;

/// Configuration of the surface normals estimation.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Config {
    /// Distance in pixels between a pixel and its neighbors.
    pub offset: usize,
    /// Depth given to pixels without depth before estimating normals.
    pub missing_depth: Float,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            offset: 2,
            missing_depth: scenenet::NORMALS_MISSING_DEPTH,
        }
    }
}

impl Config {
    /// Normals of camera space points.
    pub fn compute(&self, points: &PointGrid) -> Result<NormalField> {
        surface_normals(points, self.offset)
    }

    /// Normals of a rendered depth map, in camera coordinates.
    pub fn from_depth(&self, depth_map: &DepthMap, rays: &RayTable) -> Result<NormalField> {
        let filled = depth::fill_missing(depth_map, self.missing_depth);
        let points = points::camera_points(&filled, rays)?;
        let normals = self.compute(&points)?;
        debug!(
            "normals: {} pixels without normal",
            normals.iter().filter(|n| **n == Vec3::zeros()).count()
        );
        Ok(normals)
    }
}

/// Signed `(row, col)` offsets of the 8 neighbor directions.
#[rustfmt::skip]
fn lookups(d: isize) -> [(isize, isize); 8] {
    [(-d, 0), (-d, d), (0, d), (d, d), (d, 0), (d, -d), (0, -d), (-d, -d)]
}

/// Estimate the normal of every point in the grid.
///
/// Only pairs of neighbors inside the grid with finite coordinates are used,
/// and the pair closest to the anchor (sum of distances) wins.
/// Ties keep the first pair in direction order.
pub fn surface_normals(points: &PointGrid, offset: usize) -> Result<NormalField> {
    if offset == 0 {
        return Err(Error::InvalidArgument(
            "neighbor offset must be at least 1 pixel".to_string(),
        ));
    }
    #[allow(clippy::cast_possible_wrap)]
    let lookups = lookups(offset as isize);
    let (nrows, ncols) = points.shape();
    let neighbor = |row: usize, col: usize, k: usize| -> Option<Vec3> {
        let (dr, dc) = lookups[k];
        let r = row.checked_add_signed(dr).filter(|r| *r < nrows)?;
        let c = col.checked_add_signed(dc).filter(|c| *c < ncols)?;
        let p = points[(r, c)].xyz();
        if is_finite(&p) {
            Some(p)
        } else {
            None
        }
    };
    Ok(DMatrix::from_fn(nrows, ncols, |row, col| {
        let anchor = points[(row, col)].xyz();
        if !is_finite(&anchor) {
            return Vec3::zeros();
        }
        let mut best: Option<(Float, Vec3)> = None;
        for k in 0..8 {
            let pair = neighbor(row, col, k).zip(neighbor(row, col, (k + 2) % 8));
            if let Some((p2, p3)) = pair {
                let (v2, v3) = (p2 - anchor, p3 - anchor);
                let diff = v2.norm() + v3.norm();
                if best.map_or(true, |(min_diff, _)| diff < min_diff) {
                    if let Some(normal) = v2.cross(&v3).try_normalize(Float::EPSILON) {
                        best = Some((diff, normal));
                    }
                }
            }
        }
        best.map_or_else(Vec3::zeros, |(_, normal)| normal)
    }))
}

fn is_finite(p: &Vec3) -> bool {
    p.iter().all(|x| x.is_finite())
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::camera::Intrinsics;
    use crate::misc::type_aliases::Vec4;
    use approx;

    const EPSILON: Float = 1e-9;

    fn plane_z(nrows: usize, ncols: usize, z: Float) -> PointGrid {
        PointGrid::from_fn(nrows, ncols, |row, col| {
            Vec4::new(col as Float * 0.1, row as Float * 0.1, z, 1.0)
        })
    }

    #[test]
    fn fronto_parallel_plane() {
        let normals = surface_normals(&plane_z(7, 9, 2.0), 2).unwrap();
        for n in normals.iter() {
            // Every pixel of a 7x9 grid has at least one pair of neighbors at distance 2.
            assert!(approx::abs_diff_eq!(n.norm(), 1.0, epsilon = EPSILON));
            assert!(approx::abs_diff_eq!(n.z.abs(), 1.0, epsilon = EPSILON));
        }
        // First pair (up, right) of an interior pixel: (0,-1,0) x (1,0,0) points to +z.
        assert!(approx::abs_diff_eq!(normals[(3, 4)], Vec3::z(), epsilon = EPSILON));
    }

    #[test]
    fn tilted_plane() {
        // z = 1 + x, normal along (-1, 0, 1) / sqrt(2) up to orientation.
        let points = PointGrid::from_fn(9, 9, |row, col| {
            let x = col as Float * 0.1;
            Vec4::new(x, row as Float * 0.1, 1.0 + x, 1.0)
        });
        let normals = surface_normals(&points, 2).unwrap();
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!(approx::abs_diff_eq!(normals[(4, 4)].dot(&expected).abs(), 1.0, epsilon = EPSILON));
    }

    #[test]
    fn single_pixel_has_no_normal() {
        let normals = surface_normals(&plane_z(1, 1, 1.0), 2).unwrap();
        assert_eq!(normals[(0, 0)], Vec3::zeros());
    }

    #[test]
    fn isolated_pixel_has_no_normal() {
        let mut points = PointGrid::repeat(5, 5, Vec4::new(Float::NAN, Float::NAN, Float::NAN, 1.0));
        points[(2, 2)] = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let normals = surface_normals(&points, 2).unwrap();
        assert!(normals.iter().all(|n| *n == Vec3::zeros()));
    }

    #[test]
    fn grid_smaller_than_offset() {
        // No pixel of a 2x2 grid has a neighbor 2 pixels away.
        let normals = surface_normals(&plane_z(2, 2, 1.0), 2).unwrap();
        assert!(normals.iter().all(|n| *n == Vec3::zeros()));
        // With an offset of 1, corners have exactly one valid pair.
        let normals = surface_normals(&plane_z(2, 2, 1.0), 1).unwrap();
        assert!(normals.iter().all(|n| approx::abs_diff_eq!(n.norm(), 1.0, epsilon = EPSILON)));
    }

    #[test]
    fn closest_pair_wins_at_depth_edges() {
        // Left half is a wall at z = 1, right half is far away at z = 10.
        let points = PointGrid::from_fn(9, 9, |row, col| {
            let z = if col < 5 { 1.0 } else { 10.0 };
            Vec4::new(col as Float * 0.1, row as Float * 0.1, z, 1.0)
        });
        let normals = surface_normals(&points, 2).unwrap();
        // Pixel (4, 4) sees the far plane on its right but keeps the wall normal.
        assert!(approx::abs_diff_eq!(normals[(4, 4)].z.abs(), 1.0, epsilon = EPSILON));
    }

    #[test]
    fn zero_offset_is_rejected() {
        match surface_normals(&plane_z(3, 3, 1.0), 0) {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn non_sentinel_normals_have_unit_length() {
        let intrinsics = Intrinsics {
            horizontal_fov: 60.0,
            vertical_fov: 45.0,
            width: 20,
            height: 15,
        };
        let depth = DepthMap::from_fn(15, 20, |row, col| {
            if (row + col) % 7 == 0 {
                0.0
            } else {
                1.0 + 0.02 * (row * col) as Float
            }
        });
        let normals = Config::default()
            .from_depth(&depth, &intrinsics.ray_table())
            .unwrap();
        assert_eq!(normals.shape(), (15, 20));
        for n in normals.iter().filter(|n| **n != Vec3::zeros()) {
            assert!(approx::abs_diff_eq!(n.norm(), 1.0, epsilon = EPSILON));
        }
    }

    /// 3x3 grid around an anchor at (0, 0, 5), neighbor `k` at `anchor + offsets[k]`.
    fn star(offsets: [Vec3; 8]) -> PointGrid {
        let anchor = Vec3::new(0.0, 0.0, 5.0);
        let mut points = PointGrid::repeat(3, 3, anchor.push(1.0));
        for (k, (dr, dc)) in lookups(1).iter().enumerate() {
            let (r, c) = ((1 + dr) as usize, (1 + dc) as usize);
            points[(r, c)] = (anchor + offsets[k]).push(1.0);
        }
        points
    }

    #[test]
    fn first_pair_wins_ties() {
        // Every neighbor at distance 1, pairs disagree on the normal.
        let points = star([
            -Vec3::y(),
            Vec3::z(),
            Vec3::x(),
            -Vec3::z(),
            Vec3::y(),
            Vec3::z(),
            -Vec3::x(),
            -Vec3::x(),
        ]);
        let normals = surface_normals(&points, 1).unwrap();
        // Pair (0, 2): (0,-1,0) x (1,0,0), while the last pair (7, 1) gives +y.
        assert_eq!(normals[(1, 1)], Vec3::z());
    }

    #[test]
    fn degenerate_pairs_do_not_block_farther_pairs() {
        // Closest pair (0, 2) is collinear with the anchor.
        let points = star([
            0.1 * Vec3::x(),
            10.0 * Vec3::z(),
            0.2 * Vec3::x(),
            10.0 * Vec3::x(),
            Vec3::y(),
            10.0 * Vec3::y(),
            -Vec3::z(),
            -10.0 * Vec3::x(),
        ]);
        let normals = surface_normals(&points, 1).unwrap();
        // Next closest is pair (6, 0) with a diff of 1.1: (0,0,-1) x (0.1,0,0).
        assert!(approx::abs_diff_eq!(normals[(1, 1)], -Vec3::y(), epsilon = EPSILON));
    }
}
