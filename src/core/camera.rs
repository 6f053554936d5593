// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pinhole camera defined by its fields of view and its resolution.
//!
//! Pixel coordinates have their origin at the top left corner of the image,
//! `x` going right along columns and `y` going down along rows.
//! The center of pixel `(x, y)` is at `(x + 0.5, y + 0.5)`.

use nalgebra::DMatrix;

use crate::core::pose::Pose;
use crate::misc::type_aliases::{Float, Mat3x4, Point2, Point3, Vec3, Vec4};

/// Intrinsic parameters of a pinhole camera without distortion.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Intrinsics {
    /// Horizontal field of view, in degrees.
    pub horizontal_fov: Float,
    /// Vertical field of view, in degrees.
    pub vertical_fov: Float,
    /// Number of pixel columns.
    pub width: usize,
    /// Number of pixel rows.
    pub height: usize,
}

impl Default for Intrinsics {
    fn default() -> Self {
        crate::dataset::scenenet::INTRINSICS
    }
}

impl Intrinsics {
    /// Tangent of half the horizontal field of view.
    pub fn tan_half_hfov(&self) -> Float {
        (0.5 * self.horizontal_fov).to_radians().tan()
    }

    /// Tangent of half the vertical field of view.
    pub fn tan_half_vfov(&self) -> Float {
        (0.5 * self.vertical_fov).to_radians().tan()
    }

    /// Focal lengths `(fx, fy)` in pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn focal(&self) -> (Float, Float) {
        (
            0.5 * self.width as Float / self.tan_half_hfov(),
            0.5 * self.height as Float / self.tan_half_vfov(),
        )
    }

    /// Principal point `(cx, cy)`, always the image center.
    #[allow(clippy::cast_precision_loss)]
    pub fn principal_point(&self) -> (Float, Float) {
        (0.5 * self.width as Float, 0.5 * self.height as Float)
    }

    /// Shape `(rows, cols)` of every per-pixel grid of this camera.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Camera space direction going through the center of pixel `(x, y)`.
    ///
    /// The ray is not normalized: its z coordinate is 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn pixel_to_ray(&self, x: usize, y: usize) -> Vec3 {
        let x_ndc = 2.0 * (x as Float + 0.5) / self.width as Float - 1.0;
        let y_ndc = 2.0 * (y as Float + 0.5) / self.height as Float - 1.0;
        Vec3::new(self.tan_half_hfov() * x_ndc, self.tan_half_vfov() * y_ndc, 1.0)
    }

    /// Pinhole projection matrix `[K | 0]`.
    ///
    /// Multiplying an homogeneous camera space point by this matrix,
    /// then dividing by the third coordinate, gives its pixel location.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3x4 {
        let (fx, fy) = self.focal();
        let (cx, cy) = self.principal_point();
        Mat3x4::new(
            fx,  0.0, cx,  0.0,
            0.0, fy,  cy,  0.0,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// Pixel location `(u, v)` of a camera space point.
    ///
    /// The point is first brought to the `z = 1` plane.
    /// Points with `z == 0` project to infinity.
    #[allow(clippy::cast_precision_loss)]
    pub fn project(&self, point: &Point3) -> Point2 {
        let x = point.x / point.z;
        let y = point.y / point.z;
        Point2::new(
            0.5 * self.width as Float * (x / self.tan_half_hfov() + 1.0),
            0.5 * self.height as Float * (y / self.tan_half_vfov() + 1.0),
        )
    }

    /// Pixel location of a world space point seen from `pose`.
    ///
    /// Returns `None` if the point is not in front of the camera.
    pub fn project_world(&self, pose: &Pose, point: &Point3) -> Option<Point2> {
        let uvw = self.matrix() * pose.world_to_camera() * point.to_homogeneous();
        if uvw.z > 0.0 {
            Some(Point2::new(uvw.x / uvw.z, uvw.y / uvw.z))
        } else {
            None
        }
    }

    /// Precompute the normalized ray of every pixel.
    pub fn ray_table(&self) -> RayTable {
        RayTable::new(*self)
    }
}

// RAY TABLE ###############################################

/// Unit camera space ray of every pixel, for a given camera.
///
/// Build it once per camera configuration and share it by reference
/// with every frame processed with that camera.
#[derive(PartialEq, Debug, Clone)]
pub struct RayTable {
    intrinsics: Intrinsics,
    rays: DMatrix<Vec3>,
}

impl RayTable {
    /// Compute the rays of all pixels of the camera.
    pub fn new(intrinsics: Intrinsics) -> RayTable {
        let rays = DMatrix::from_fn(intrinsics.height, intrinsics.width, |y, x| {
            intrinsics.pixel_to_ray(x, y).normalize()
        });
        RayTable { intrinsics, rays }
    }

    /// Camera the table was built for.
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Grid of unit rays, indexed by `(row, col)`.
    pub fn rays(&self) -> &DMatrix<Vec3> {
        &self.rays
    }

    /// Shape `(rows, cols)` of the table.
    pub fn shape(&self) -> (usize, usize) {
        self.rays.shape()
    }

    /// Homogeneous camera space point at a given depth along the ray of pixel `(row, col)`.
    pub fn point_at(&self, row: usize, col: usize, depth: Float) -> Vec4 {
        (depth * self.rays[(row, col)]).push(1.0)
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::dataset::scenenet::INTRINSICS;
    use approx;
    use quickcheck_macros;

    const EPSILON: Float = 1e-9;

    #[test]
    fn scenenet_matrix() {
        let k = INTRINSICS.matrix();
        assert!(approx::abs_diff_eq!(k[(0, 0)], 277.128_129, epsilon = 1e-5));
        assert!(approx::abs_diff_eq!(k[(1, 1)], 289.705_627, epsilon = 1e-5));
        assert_eq!((k[(0, 2)], k[(1, 2)]), (160.0, 120.0));
        assert_eq!(k[(2, 2)], 1.0);
        assert_eq!(k.column(3).iter().sum::<Float>(), 0.0);
    }

    #[test]
    fn center_rays_are_symmetric() {
        let left = INTRINSICS.pixel_to_ray(159, 120);
        let right = INTRINSICS.pixel_to_ray(160, 120);
        assert!(approx::abs_diff_eq!(left.x, -right.x, epsilon = EPSILON));
        assert_eq!(left.z, 1.0);
    }

    #[test]
    fn corner_ray_reaches_field_of_view() {
        // The outer edge of the last pixel lies exactly on the fov boundary.
        let ray = INTRINSICS.pixel_to_ray(319, 239);
        let half_pixel_x = INTRINSICS.tan_half_hfov() / 320.0;
        let half_pixel_y = INTRINSICS.tan_half_vfov() / 240.0;
        assert!(approx::abs_diff_eq!(
            ray.x + half_pixel_x,
            INTRINSICS.tan_half_hfov(),
            epsilon = EPSILON
        ));
        assert!(approx::abs_diff_eq!(
            ray.y + half_pixel_y,
            INTRINSICS.tan_half_vfov(),
            epsilon = EPSILON
        ));
    }

    #[test]
    fn ray_table_is_unit_length() {
        let table = INTRINSICS.ray_table();
        assert_eq!(table.shape(), (240, 320));
        assert!(table
            .rays()
            .iter()
            .all(|ray| (ray.norm() - 1.0).abs() < EPSILON));
    }

    #[test]
    fn ray_table_follows_pixel_rays() {
        let table = INTRINSICS.ray_table();
        let ray = INTRINSICS.pixel_to_ray(12, 200);
        assert!(approx::relative_eq!(
            table.rays()[(200, 12)],
            ray.normalize(),
            epsilon = EPSILON
        ));
        let point = table.point_at(200, 12, 2.0);
        assert_eq!(point.w, 1.0);
        assert!(approx::abs_diff_eq!(point.xyz().norm(), 2.0, epsilon = EPSILON));
    }

    #[test]
    fn project_world_rejects_points_behind() {
        let pose = Pose::new(Point3::origin(), Point3::new(0.0, 0.0, 1.0), 0.0);
        assert!(INTRINSICS
            .project_world(&pose, &Point3::new(0.0, 0.0, -1.0))
            .is_none());
        let center = INTRINSICS
            .project_world(&pose, &Point3::new(0.0, 0.0, 3.0))
            .unwrap();
        assert!(approx::abs_diff_eq!(center, Point2::new(160.0, 120.0), epsilon = EPSILON));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn pixel_ray_round_trip(x: u16, y: u16) -> bool {
        let (x, y) = (usize::from(x) % 320, usize::from(y) % 240);
        let uv = INTRINSICS.project(&Point3::from(INTRINSICS.pixel_to_ray(x, y)));
        approx::abs_diff_eq!(
            uv,
            Point2::new(x as Float + 0.5, y as Float + 0.5),
            epsilon = 1e-9
        )
    }

    #[quickcheck_macros::quickcheck]
    fn matrix_agrees_with_project(x: i16, y: i16, z: u8) -> bool {
        let point = Point3::new(Float::from(x) / 100.0, Float::from(y) / 100.0, Float::from(z) + 0.5);
        let uvw = INTRINSICS.matrix() * point.to_homogeneous();
        let uv = INTRINSICS.project(&point);
        approx::relative_eq!(uv, Point2::new(uvw.x / uvw.z, uvw.y / uvw.z), epsilon = 1e-9)
    }
}
