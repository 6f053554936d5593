// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to manipulate depth maps from depth images.

use nalgebra::DMatrix;

use crate::misc::type_aliases::Float;

/// Depth of every pixel, in meters, indexed by `(row, col)`.
pub type DepthMap = DMatrix<Float>;

/// Transform a raw depth value from a depth image into meters with a given scaling.
///
/// A value of 0 means that no depth was recorded and stays 0.
pub fn from_raw(scale: Float, depth: u16) -> Float {
    scale * Float::from(depth)
}

/// Convert a whole raw depth image into a depth map in meters.
pub fn from_raw_map(scale: Float, raw: &DMatrix<u16>) -> DepthMap {
    raw.map(|d| from_raw(scale, d))
}

/// Replace missing depths (exactly 0) with a substitute depth.
///
/// Rays going through windows never hit anything and have no depth.
/// Geometry derivations need a finite point for every pixel,
/// so callers pick how far away such points are.
pub fn fill_missing(depth_map: &DepthMap, substitute: Float) -> DepthMap {
    depth_map.map(|d| if d == 0.0 { substitute } else { d })
}

/// Number of pixels without depth.
pub fn count_missing(depth_map: &DepthMap) -> usize {
    depth_map.iter().filter(|d| **d == 0.0).count()
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dataset::scenenet::DEPTH_SCALE;

    #[test]
    fn raw_millimeters_to_meters() {
        assert_eq!(from_raw(DEPTH_SCALE, 0), 0.0);
        assert!((from_raw(DEPTH_SCALE, 2500) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn fill_only_missing() {
        let raw = DMatrix::from_row_slice(2, 2, &[0, 1000, 65535, 0]);
        let depth = from_raw_map(DEPTH_SCALE, &raw);
        assert_eq!(count_missing(&depth), 2);
        let filled = fill_missing(&depth, 50.0);
        assert_eq!(count_missing(&filled), 0);
        assert_eq!(filled[(0, 0)], 50.0);
        assert_eq!(filled[(1, 1)], 50.0);
        assert!((filled[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((filled[(1, 0)] - 65.535).abs() < 1e-9);
    }
}
