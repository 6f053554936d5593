// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera poses given by a position and a look-at point,
//! and their linear interpolation during the shutter interval of a frame.
//!
//! The camera basis is built with a fixed world up direction `(0, 1, 0)`.
//! A camera looking straight along that direction has no defined basis:
//! every function building a basis then returns NaN values.

use crate::error::{Error, Result};
use crate::misc::type_aliases::{Float, Mat3, Mat4, Point3, Vec3};

/// Up direction of the world, used to orient the camera around its view axis.
pub fn world_up() -> Vec3 {
    Vec3::y()
}

/// Position and aim of the camera at a given instant.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Pose {
    /// Position of the camera center in world coordinates.
    pub camera: Point3,
    /// Point the camera is looking at, in world coordinates.
    pub lookat: Point3,
    /// Time of the pose, in seconds.
    pub timestamp: Float,
}

/// Orthonormal right-handed basis of a camera, in world coordinates.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CameraBasis {
    /// Camera x axis (image columns).
    pub right: Vec3,
    /// Camera y axis (image rows, pointing down in the image).
    pub up: Vec3,
    /// Camera z axis (view direction).
    pub forward: Vec3,
}

impl Pose {
    /// Pose constructor.
    pub fn new(camera: Point3, lookat: Point3, timestamp: Float) -> Pose {
        Pose {
            camera,
            lookat,
            timestamp,
        }
    }

    /// Camera basis of this pose.
    pub fn basis(&self) -> CameraBasis {
        let forward = (self.lookat - self.camera).normalize();
        let right = forward.cross(&world_up()).normalize();
        let up = -right.cross(&forward).normalize();
        CameraBasis { right, up, forward }
    }

    /// Rigid transform from world coordinates to camera coordinates.
    ///
    /// Rotation rows are the camera basis vectors, applied after
    /// translating the camera center to the origin: `R · Translate(-c)`.
    #[rustfmt::skip]
    pub fn world_to_camera(&self) -> Mat4 {
        let CameraBasis { right, up, forward } = self.basis();
        let c = self.camera.coords;
        Mat4::new(
            right.x,   right.y,   right.z,   -right.dot(&c),
            up.x,      up.y,      up.z,      -up.dot(&c),
            forward.x, forward.y, forward.z, -forward.dot(&c),
            0.0,       0.0,       0.0,       1.0,
        )
    }

    /// Rigid transform from camera coordinates to world coordinates.
    ///
    /// Closed form inverse of `world_to_camera`: `Translate(c) · Rᵀ`.
    #[rustfmt::skip]
    pub fn camera_to_world(&self) -> Mat4 {
        let rotation_t = self.basis().rotation().transpose();
        let c = self.camera;
        Mat4::new(
            rotation_t.m11, rotation_t.m12, rotation_t.m13, c.x,
            rotation_t.m21, rotation_t.m22, rotation_t.m23, c.y,
            rotation_t.m31, rotation_t.m32, rotation_t.m33, c.z,
            0.0,            0.0,            0.0,            1.0,
        )
    }
}

impl CameraBasis {
    /// Rotation from world to camera coordinates,
    /// with rows `[right; up; forward]`.
    pub fn rotation(&self) -> Mat3 {
        Mat3::from_rows(&[
            self.right.transpose(),
            self.up.transpose(),
            self.forward.transpose(),
        ])
    }
}

/// Linear interpolation between two poses: `alpha * close + (1 - alpha) * open`.
///
/// Positions, look-at points and timestamps are all interpolated linearly.
/// Fails if `alpha` is not in `[0, 1]`.
pub fn interpolate(open: &Pose, close: &Pose, alpha: Float) -> Result<Pose> {
    check_alpha(alpha)?;
    let lerp = |a: &Point3, b: &Point3| Point3::from(alpha * b.coords + (1.0 - alpha) * a.coords);
    Ok(Pose {
        camera: lerp(&open.camera, &close.camera),
        lookat: lerp(&open.lookat, &close.lookat),
        timestamp: alpha * close.timestamp + (1.0 - alpha) * open.timestamp,
    })
}

fn check_alpha(alpha: Float) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "interpolation fraction must be in [0, 1], got {}",
            alpha
        )))
    }
}

// SHUTTER INTERVAL ########################################

/// Motion of the camera while the shutter of a frame is open.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ShutterInterval {
    open: Pose,
    close: Pose,
}

impl ShutterInterval {
    /// Fails if the shutter closes before it opens.
    pub fn new(open: Pose, close: Pose) -> Result<ShutterInterval> {
        if open.timestamp <= close.timestamp {
            Ok(ShutterInterval { open, close })
        } else {
            Err(Error::InvalidArgument(format!(
                "shutter closes at {} before opening at {}",
                close.timestamp, open.timestamp
            )))
        }
    }

    /// Pose when the shutter opens.
    pub fn open(&self) -> &Pose {
        &self.open
    }

    /// Pose when the shutter closes.
    pub fn close(&self) -> &Pose {
        &self.close
    }

    /// Time between shutter opening and closing, in seconds.
    pub fn duration(&self) -> Float {
        self.close.timestamp - self.open.timestamp
    }

    /// Pose at fraction `alpha` of the interval.
    pub fn interpolate(&self, alpha: Float) -> Result<Pose> {
        interpolate(&self.open, &self.close, alpha)
    }

    /// Derivative of the camera position with respect to the interpolation fraction.
    pub fn camera_velocity(&self) -> Vec3 {
        self.close.camera - self.open.camera
    }

    /// Derivative of the look-at point with respect to the interpolation fraction.
    pub fn lookat_velocity(&self) -> Vec3 {
        self.close.lookat - self.open.lookat
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck::TestResult;
    use quickcheck_macros;

    const EPSILON: Float = 1e-9;

    fn open_pose() -> Pose {
        Pose::new(Point3::new(1.0, 1.5, -2.0), Point3::new(0.5, 1.2, 1.0), 10.0)
    }

    fn close_pose() -> Pose {
        Pose::new(Point3::new(1.2, 1.4, -1.8), Point3::new(0.8, 1.0, 1.1), 10.5)
    }

    #[test]
    fn interpolate_bounds() {
        let (open, close) = (open_pose(), close_pose());
        assert_eq!(interpolate(&open, &close, 0.0).unwrap(), open);
        assert_eq!(interpolate(&open, &close, 1.0).unwrap(), close);
    }

    #[test]
    fn interpolate_midpoint() {
        let pose = interpolate(&open_pose(), &close_pose(), 0.5).unwrap();
        assert!(approx::relative_eq!(pose.camera, Point3::new(1.1, 1.45, -1.9), epsilon = EPSILON));
        assert!(approx::relative_eq!(pose.lookat, Point3::new(0.65, 1.1, 1.05), epsilon = EPSILON));
        assert!(approx::relative_eq!(pose.timestamp, 10.25, epsilon = EPSILON));
    }

    #[test]
    fn interpolate_rejects_out_of_range() {
        let (open, close) = (open_pose(), close_pose());
        for alpha in &[-0.01, 1.01, Float::NAN] {
            match interpolate(&open, &close, *alpha) {
                Err(Error::InvalidArgument(_)) => (),
                other => panic!("alpha {} should be rejected, got {:?}", alpha, other),
            }
        }
    }

    #[test]
    fn shutter_must_not_close_before_opening() {
        assert!(ShutterInterval::new(open_pose(), close_pose()).is_ok());
        assert!(ShutterInterval::new(open_pose(), open_pose()).is_ok());
        match ShutterInterval::new(close_pose(), open_pose()) {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn basis_looking_along_z() {
        let pose = Pose::new(Point3::origin(), Point3::new(0.0, 0.0, 5.0), 0.0);
        let basis = pose.basis();
        assert_eq!(basis.forward, Vec3::z());
        assert_eq!(basis.right, -Vec3::x());
        assert_eq!(basis.up, -Vec3::y());
        assert!(approx::relative_eq!(basis.rotation().determinant(), 1.0, epsilon = EPSILON));
    }

    #[test]
    fn world_to_camera_moves_camera_to_origin() {
        let pose = open_pose();
        let center = pose.world_to_camera() * pose.camera.to_homogeneous();
        assert!(approx::abs_diff_eq!(center, Point3::origin().to_homogeneous(), epsilon = EPSILON));
        let lookat = pose.world_to_camera() * pose.lookat.to_homogeneous();
        let distance = (pose.lookat - pose.camera).norm();
        assert!(approx::abs_diff_eq!(lookat.z, distance, epsilon = EPSILON));
        assert!(approx::abs_diff_eq!(lookat.xy().norm(), 0.0, epsilon = EPSILON));
    }

    #[test]
    fn closed_form_inverse_matches_generic_inverse() {
        let pose = close_pose();
        let inverse = pose.world_to_camera().try_inverse().unwrap();
        assert!(approx::relative_eq!(pose.camera_to_world(), inverse, epsilon = EPSILON));
    }

    #[test]
    fn shutter_velocities() {
        let shutter = ShutterInterval::new(open_pose(), close_pose()).unwrap();
        assert!(approx::relative_eq!(shutter.camera_velocity(), Vec3::new(0.2, -0.1, 0.2), epsilon = EPSILON));
        assert!(approx::relative_eq!(shutter.lookat_velocity(), Vec3::new(0.3, -0.2, 0.1), epsilon = EPSILON));
        assert_eq!(shutter.duration(), 0.5);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn world_camera_round_trip(c: (i8, i8, i8), l: (i8, i8, i8)) -> TestResult {
        let camera = gen_point(c);
        let lookat = gen_point(l);
        let direction = lookat - camera;
        // Degenerate when looking along the world up direction.
        if direction.x.abs() + direction.z.abs() < 1e-3 {
            return TestResult::discard();
        }
        let pose = Pose::new(camera, lookat, 0.0);
        let identity = pose.world_to_camera() * pose.camera_to_world();
        TestResult::from_bool(approx::abs_diff_eq!(identity, Mat4::identity(), epsilon = 1e-9))
    }

    #[quickcheck_macros::quickcheck]
    fn interpolation_is_bounded_by_endpoints(alpha: u8) -> bool {
        let alpha = Float::from(alpha) / 255.0;
        let pose = interpolate(&open_pose(), &close_pose(), alpha).unwrap();
        pose.timestamp >= 10.0 && pose.timestamp <= 10.5
    }

    // GENERATORS ####################################################

    fn gen_point(p: (i8, i8, i8)) -> Point3 {
        Point3::new(Float::from(p.0), Float::from(p.1), Float::from(p.2)) / 10.0
    }
}
