//! Minimal raster image header.
//!
//! Only the four fields the blitter needs are read, all little endian:
//!
//! | Offset | Size | Field            |
//! |--------|------|------------------|
//! | 10     | 4    | pixel data start |
//! | 18     | 4    | width            |
//! | 22     | 4    | height           |
//! | 28     | 2    | bits per pixel   |
//!
//! Rows are stored bottom-up and are taken to be exactly
//! `width × bytes_per_pixel` long.

use crate::blit::InputColorMode;
use crate::error::{Error, Result};

const HEADER_LEN: usize = 30;

/// Parsed header of a raster image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitmapHeader {
    /// Offset of the first pixel byte.
    pub data_offset: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Bits per pixel.
    pub bits_per_pixel: u16,
}

fn le_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let b: [u8; 4] = bytes
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::WrongParam)?;
    Ok(u32::from_le_bytes(b))
}

fn le_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    let b: [u8; 2] = bytes
        .get(offset..offset + 2)
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::WrongParam)?;
    Ok(u16::from_le_bytes(b))
}

impl BitmapHeader {
    /// Reads the header at the start of `bytes`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if `bytes` is shorter than the header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::WrongParam);
        }
        Ok(Self {
            data_offset: le_u32(bytes, 10)?,
            width: le_u32(bytes, 18)?,
            height: le_u32(bytes, 22)?,
            bits_per_pixel: le_u16(bytes, 28)?,
        })
    }

    /// Whole bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> u32 {
        self.bits_per_pixel as u32 / 8
    }

    /// Blitter input mode matching the pixel size.
    #[must_use]
    pub const fn input_mode(&self) -> InputColorMode {
        InputColorMode::from_bytes_per_pixel(self.bytes_per_pixel())
    }

    /// Length of one stored row in bytes.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the length does not fit the address space.
    pub fn row_len(&self) -> Result<usize> {
        self.width
            .checked_mul(self.bytes_per_pixel())
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(Error::WrongParam)
    }

    /// Total size of the image the header describes.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the size does not fit the address space.
    pub fn image_len(&self) -> Result<usize> {
        let height = usize::try_from(self.height).map_err(|_| Error::WrongParam)?;
        self.row_len()?
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_add(self.data_offset as usize))
            .ok_or(Error::WrongParam)
    }

    /// Stored row `index` counted from the top of the picture.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the row lies outside `bytes`.
    pub fn row<'a>(&self, bytes: &'a [u8], index: u32) -> Result<&'a [u8]> {
        if index >= self.height {
            return Err(Error::WrongParam);
        }
        let row_len = self.row_len()?;
        let stored = (self.height - 1 - index) as usize;
        let start = stored
            .checked_mul(row_len)
            .and_then(|offset| offset.checked_add(self.data_offset as usize))
            .ok_or(Error::WrongParam)?;
        let end = start.checked_add(row_len).ok_or(Error::WrongParam)?;
        bytes.get(start..end).ok_or(Error::WrongParam)
    }
}
