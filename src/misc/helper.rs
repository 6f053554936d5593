// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

use byteorder::{BigEndian, ReadBytesExt};
use nalgebra::DMatrix;
use std::{fs::File, io::BufReader, io::Cursor, io::Read, path::Path};

use crate::error::{Error, Result};

/// Read a 16 bit gray png image from a file.
pub fn read_png_16bits<P: AsRef<Path>>(file_path: P) -> Result<(usize, usize, Vec<u16>)> {
    let img_file = BufReader::new(File::open(file_path)?);
    read_png_16bits_buf(img_file)
}

/// Read a 16 bit gray png image from any reader.
pub fn read_png_16bits_buf<R: Read>(r: R) -> Result<(usize, usize, Vec<u16>)> {
    let mut decoder = png::Decoder::new(r);
    // Use the IDENTITY transformation because STRIP_16
    // would only keep 8 bits.
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer)?;
    if info.bit_depth != png::BitDepth::Sixteen || info.color_type != png::ColorType::Grayscale {
        return Err(Error::Format(format!(
            "expected a 16 bits gray png, got {:?} {:?}",
            info.bit_depth, info.color_type
        )));
    }

    // Transform buffer into 16 bits slice.
    // PNG samples are stored big endian.
    let mut buffer_u16 = vec![0; (info.width * info.height) as usize];
    let mut buffer_cursor = Cursor::new(&buffer[..info.buffer_size()]);
    buffer_cursor.read_u16_into::<BigEndian>(&mut buffer_u16)?;

    // Return u16 buffer.
    Ok((info.width as usize, info.height as usize, buffer_u16))
}

/// Read a 16 bit gray png image into a matrix indexed by `(row, col)`.
pub fn read_matrix_16bits<P: AsRef<Path>>(file_path: P) -> Result<DMatrix<u16>> {
    let (w, h, buffer) = read_png_16bits(file_path)?;
    Ok(DMatrix::from_row_slice(h, w, buffer.as_slice()))
}

// TESTS #############################################################
