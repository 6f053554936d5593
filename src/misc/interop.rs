// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::{Rgb, RgbImage};
use nalgebra::DMatrix;

/// Convert an `(u8,u8,u8)` matrix into an `RgbImage`.
/// Inverse operation of `matrix_from_rgb`.
///
/// Performs a transposition to accomodate for the
/// column major matrix into the row major image.
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_from_matrix(mat: &DMatrix<(u8, u8, u8)>) -> RgbImage {
    let (nb_rows, nb_cols) = mat.shape();
    let mut img_buf = RgbImage::new(nb_cols as u32, nb_rows as u32);
    for (x, y, pixel) in img_buf.enumerate_pixels_mut() {
        let (r, g, b) = mat[(y as usize, x as usize)];
        *pixel = Rgb([r, g, b]);
    }
    img_buf
}

/// Convert an `RgbImage` into an `(u8,u8,u8)` matrix.
/// Inverse operation of `rgb_from_matrix`.
pub fn matrix_from_rgb(img: &RgbImage) -> DMatrix<(u8, u8, u8)> {
    let (width, height) = img.dimensions();
    #[allow(clippy::cast_possible_truncation)]
    DMatrix::from_fn(height as usize, width as usize, |row, col| {
        let Rgb([r, g, b]) = *img.get_pixel(col as u32, row as u32);
        (r, g, b)
    })
}

// TESTS #############################################################
