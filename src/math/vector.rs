// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Derivatives of the vector operations used to build a camera basis.

use crate::misc::type_aliases::{Mat3, Vec3};

/// Hat operator.
/// Skew-symmetric matrix such that `hat(a) * b == a.cross(&b)`.
#[rustfmt::skip]
pub fn hat(w: &Vec3) -> Mat3 {
    Mat3::new(
         0.0,  -w.z,   w.y,
         w.z,   0.0,  -w.x,
        -w.y,   w.x,   0.0,
    )
}

/// Jacobian of `v / |v|` with respect to `v`.
///
/// `(I - v̂ v̂ᵀ) / |v|`. Undefined for the null vector.
pub fn normalize_jacobian(v: &Vec3) -> Mat3 {
    let norm = v.norm();
    let unit = v / norm;
    (Mat3::identity() - unit * unit.transpose()) / norm
}

/// Derivative of `a × b` given the derivatives of `a` and `b`.
pub fn cross_derivative(a: &Vec3, da: &Vec3, b: &Vec3, db: &Vec3) -> Vec3 {
    hat(da) * b + hat(a) * db
}

// TESTS #############################################################
