// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visualization of flow and normal fields as RGB images.

use image::RgbImage;
use nalgebra::DMatrix;
use std::f64::consts::PI;

use crate::core::flow::FlowField;
use crate::core::normals::NormalField;
use crate::misc::interop;
use crate::misc::type_aliases::{Float, Point2, Vec2, Vec3};

/// Default scale from pixels per second to HSV value.
/// A flow of 100 px/s or more is displayed at full brightness.
pub const FLOW_MAGNITUDE_SCALE: Float = 1.0 / 100.0;

/// Flows shorter than this are displayed black.
const FLOW_MAGNITUDE_EPSILON: Float = 1e-8;

/// HSV color of a flow vector, each component in `[0, 1]`.
///
/// The hue is the flow direction, 0 along `+u` and increasing towards `+v`,
/// the value is the flow magnitude times `magnitude_scale`, clamped to 1.
pub fn flow_hsv(flow: &Vec2, magnitude_scale: Float) -> (Float, Float, Float) {
    let magnitude = flow.norm();
    if magnitude < FLOW_MAGNITUDE_EPSILON {
        return (0.0, 0.0, 0.0);
    }
    let mut theta = flow.y.atan2(flow.x);
    if theta < 0.0 {
        theta += 2.0 * PI;
    }
    // atan2 of a tiny negative y rounds to 2π after the shift.
    let hue = (theta / (2.0 * PI)) % 1.0;
    let value = num_traits::clamp(magnitude * magnitude_scale, 0.0, 1.0);
    (hue, 1.0, value)
}

/// Convert an HSV color into RGB, each component in `[0, 1]`.
///
/// Same hexcone conversion as the matplotlib color wheel.
#[allow(clippy::many_single_char_names)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn hsv_to_rgb(h: Float, s: Float, v: Float) -> (Float, Float, Float) {
    let h6 = h * 6.0;
    let i = h6.floor();
    let f = h6 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Quantize an RGB color in `[0, 1]` into 8 bits channels.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn to_u8((r, g, b): (Float, Float, Float)) -> (u8, u8, u8) {
    let q = |x: Float| (255.0 * num_traits::clamp(x, 0.0, 1.0)).round() as u8;
    (q(r), q(g), q(b))
}

/// Create an RGB image of a flow field with the HSV color wheel.
pub fn flow_image(flow: &FlowField, magnitude_scale: Float) -> RgbImage {
    interop::rgb_from_matrix(&flow.map(|f| {
        let (h, s, v) = flow_hsv(&f, magnitude_scale);
        to_u8(hsv_to_rgb(h, s, v))
    }))
}

/// Encode a unit normal into 8 bits RGB: `(n + 1) * 128`, saturated at 255.
///
/// The zero vector (no normal) is encoded as mid gray.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn normal_color(normal: &Vec3) -> (u8, u8, u8) {
    let q = |x: Float| num_traits::clamp((x + 1.0) * 128.0, 0.0, 255.0) as u8;
    (q(normal.x), q(normal.y), q(normal.z))
}

/// Create an RGB image of a normal field.
pub fn normals_image(normals: &NormalField) -> RgbImage {
    interop::rgb_from_matrix(&normals.map(|n| normal_color(&n)))
}

/// Draw a 5 pixels black cross centered at `pixel` (truncated to integers).
///
/// Nothing is drawn unless the center is strictly inside the image,
/// so that the whole cross fits. Returns whether the cross was drawn.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
pub fn mark_cross(img: &mut DMatrix<(u8, u8, u8)>, pixel: &Point2) -> bool {
    let (nrows, ncols) = img.shape();
    let (x, y) = (pixel.x.trunc(), pixel.y.trunc());
    let inside = |v: Float, size: usize| v > 0.0 && v < (size as Float - 1.0);
    if !(inside(x, ncols) && inside(y, nrows)) {
        return false;
    }
    #[allow(clippy::cast_sign_loss)]
    let (col, row) = (x as usize, y as usize);
    for (r, c) in [(row, col), (row - 1, col), (row + 1, col), (row, col - 1), (row, col + 1)] {
        img[(r, c)] = (0, 0, 0);
    }
    true
}

// TESTS #############################################################
