// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ground truth optical flow of a static scene seen by a moving camera.
//!
//! During the shutter interval, the camera position and look-at point move
//! linearly with the interpolation fraction `alpha`.
//! The world to camera transform `T(alpha)` is differentiated analytically,
//! and the pixel location `u = fx * x / z + cx` of each point with the
//! quotient rule, giving the image velocity of every pixel.
//!
//! Points that end up on the camera plane (`z == 0`) have an infinite
//! or undefined flow. Such values are returned as is, not clamped.

use log::debug;
use nalgebra::DMatrix;

use crate::core::camera::{Intrinsics, RayTable};
use crate::core::depth::{self, DepthMap};
use crate::core::points::{self, PointGrid};
use crate::core::pose::{world_up, ShutterInterval};
use crate::dataset::scenenet;
use crate::error::{Error, Result};
use crate::math::vector;
use crate::misc::type_aliases::{Float, Mat4, Vec2, Vec3, Vec4};

/// Image velocity `(du/dt, dv/dt)` of every pixel, in pixels per second.
pub type FlowField = DMatrix<Vec2>;

/// Configuration of the optical flow computation.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Config {
    /// Fraction of the shutter interval at which the flow is evaluated.
    /// Ground truth renders are sampled at the midpoint, 0.5.
    pub alpha: Float,
    /// Real duration of the shutter interval, in seconds.
    pub shutter_time: Float,
    /// Depth given to pixels without depth before computing the flow.
    pub missing_depth: Float,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alpha: 0.5,
            shutter_time: 1.0 / 60.0,
            missing_depth: scenenet::FLOW_MISSING_DEPTH,
        }
    }
}

impl Config {
    /// Optical flow of world points.
    pub fn compute(
        &self,
        world_points: &PointGrid,
        shutter: &ShutterInterval,
        intrinsics: &Intrinsics,
    ) -> Result<FlowField> {
        optical_flow(
            world_points,
            shutter,
            intrinsics,
            self.alpha,
            self.shutter_time,
        )
    }

    /// Optical flow of a rendered depth map.
    ///
    /// Missing depths are replaced, then points are moved to world coordinates
    /// with the camera pose at which the depth map was rendered.
    pub fn from_depth(
        &self,
        depth_map: &DepthMap,
        rays: &RayTable,
        shutter: &ShutterInterval,
    ) -> Result<FlowField> {
        let nb_missing = depth::count_missing(depth_map);
        let filled = depth::fill_missing(depth_map, self.missing_depth);
        let render_pose = shutter.interpolate(scenenet::RENDER_ALPHA)?;
        let world_points = points::world_points(&filled, rays, &render_pose)?;
        let flow = self.compute(&world_points, shutter, rays.intrinsics())?;
        debug!(
            "flow at t = {}: {} missing depths, max speed {} px/s",
            render_pose.timestamp,
            nb_missing,
            flow.iter().map(|f| f.norm()).fold(0.0, Float::max)
        );
        Ok(flow)
    }
}

/// World to camera transform at some fraction of the shutter interval,
/// and its derivative with respect to that fraction.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct TransformDerivative {
    /// `T(alpha)`.
    pub transform: Mat4,
    /// `dT/dalpha`. Its last row is zero.
    pub derivative: Mat4,
}

/// Differentiate the world to camera transform along the shutter interval.
///
/// The basis vectors are derived in dependency order:
/// `forward` from the camera and look-at motion, `right` from `forward`,
/// `up` from both, each through the derivative of a normalization.
#[rustfmt::skip]
pub fn transform_derivative(shutter: &ShutterInterval, alpha: Float) -> Result<TransformDerivative> {
    let pose = shutter.interpolate(alpha)?;
    let c = pose.camera.coords;
    let dc = shutter.camera_velocity();
    let up_world = world_up();

    // forward = normalize(lookat - camera)
    let forward_raw = pose.lookat.coords - c;
    let forward = forward_raw.normalize();
    let d_forward = vector::normalize_jacobian(&forward_raw) * (shutter.lookat_velocity() - dc);

    // right = normalize(forward x world_up)
    let right_raw = forward.cross(&up_world);
    let right = right_raw.normalize();
    let d_right_raw = vector::cross_derivative(&forward, &d_forward, &up_world, &Vec3::zeros());
    let d_right = vector::normalize_jacobian(&right_raw) * d_right_raw;

    // up = -normalize(right x forward)
    let up_raw = right.cross(&forward);
    let up = -up_raw.normalize();
    let d_up_raw = vector::cross_derivative(&right, &d_right, &forward, &d_forward);
    let d_up = -(vector::normalize_jacobian(&up_raw) * d_up_raw);

    // translation t_i = -b_i . c
    let dt = |b: &Vec3, db: &Vec3| -c.dot(db) - dc.dot(b);

    let transform = pose.world_to_camera();
    let derivative = Mat4::new(
        d_right.x,   d_right.y,   d_right.z,   dt(&right, &d_right),
        d_up.x,      d_up.y,      d_up.z,      dt(&up, &d_up),
        d_forward.x, d_forward.y, d_forward.z, dt(&forward, &d_forward),
        0.0,         0.0,         0.0,         0.0,
    );
    Ok(TransformDerivative { transform, derivative })
}

/// Derivative of the pixel location of a world point with respect to `alpha`.
///
/// Quotient rule on the perspective division:
/// `du/dalpha = fx * (dx * z - dz * x) / z²`, same for `v` with `fy` and `y`.
pub fn pixel_derivative(td: &TransformDerivative, focal: (Float, Float), point: &Vec4) -> Vec2 {
    let p = td.transform * point;
    let dp = td.derivative * point;
    let z_2 = p.z * p.z;
    Vec2::new(
        focal.0 * (dp.x * p.z - dp.z * p.x) / z_2,
        focal.1 * (dp.y * p.z - dp.z * p.y) / z_2,
    )
}

/// Optical flow of world points, in pixels per second.
///
/// `world_points` must be in world coordinates, typically reconstructed from
/// a depth map with the pose at which it was rendered.
/// The flow is evaluated at fraction `alpha` of the shutter interval,
/// and converted from per-alpha to per-second with `shutter_time`.
pub fn optical_flow(
    world_points: &PointGrid,
    shutter: &ShutterInterval,
    intrinsics: &Intrinsics,
    alpha: Float,
    shutter_time: Float,
) -> Result<FlowField> {
    if !(shutter_time > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "shutter time must be positive, got {}",
            shutter_time
        )));
    }
    let td = transform_derivative(shutter, alpha)?;
    let focal = intrinsics.focal();
    Ok(world_points.map(|p| pixel_derivative(&td, focal, &p) / shutter_time))
}

// TESTS #############################################################
