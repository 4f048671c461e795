//! Pixel word conversions.
//!
//! Colours travel through the pipeline as ARGB8888 words. RGB565 expansion
//! uses the same rounding the blit engine applies in hardware, so a value
//! expanded here and truncated back with [`argb8888_to_rgb565`] is unchanged.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::IntoStorage;

use crate::PixelFormat;

/// Fully opaque alpha byte in ARGB8888 position.
pub const OPAQUE: u32 = 0xFF00_0000;

/// Expands an RGB565 word to opaque ARGB8888.
#[must_use]
pub const fn rgb565_to_argb8888(color: u16) -> u32 {
    let c = color as u32;
    let r = (((c >> 11) & 0x1F) * 527 + 23) >> 6;
    let g = (((c >> 5) & 0x3F) * 259 + 33) >> 6;
    let b = ((c & 0x1F) * 527 + 23) >> 6;
    OPAQUE | (r << 16) | (g << 8) | b
}

/// Truncates an ARGB8888 word to RGB565, dropping alpha.
#[must_use]
pub const fn argb8888_to_rgb565(color: u32) -> u16 {
    let r = (color >> 19) & 0x1F;
    let g = (color >> 10) & 0x3F;
    let b = (color >> 3) & 0x1F;
    ((r << 11) | (g << 5) | b) as u16
}

/// Converts an `embedded-graphics` colour to opaque ARGB8888.
#[must_use]
pub fn to_argb8888(color: Rgb888) -> u32 {
    OPAQUE | color.into_storage()
}

/// Encodes an ARGB8888 colour as the native pixel word of `format`.
#[must_use]
pub const fn to_native(color: u32, format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Argb8888 => color,
        PixelFormat::Rgb565 => argb8888_to_rgb565(color) as u32,
    }
}

/// Decodes a native pixel word of `format` into ARGB8888.
#[must_use]
pub const fn from_native(word: u32, format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Argb8888 => word,
        PixelFormat::Rgb565 => rgb565_to_argb8888(word as u16),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use embedded_graphics::pixelcolor::RgbColor;

    use super::*;

    #[test]
    fn test_rgb565_expansion_extremes() {
        assert_eq!(rgb565_to_argb8888(0x0000), 0xFF00_0000);
        assert_eq!(rgb565_to_argb8888(0xFFFF), 0xFFFF_FFFF);
        assert_eq!(rgb565_to_argb8888(0xF800), 0xFFFF_0000);
        assert_eq!(rgb565_to_argb8888(0x07E0), 0xFF00_FF00);
        assert_eq!(rgb565_to_argb8888(0x001F), 0xFF00_00FF);
    }

    #[test]
    fn test_rgb565_expansion_rounding() {
        // 1 / 31 of full scale rounds to 8, 1 / 63 rounds to 4
        assert_eq!(rgb565_to_argb8888(0x0801), 0xFF08_0008);
        assert_eq!(rgb565_to_argb8888(0x0020), 0xFF00_0400);
    }

    #[test]
    fn test_rgb565_round_trip_is_exact() {
        for c in 0..=u16::MAX {
            assert_eq!(argb8888_to_rgb565(rgb565_to_argb8888(c)), c);
        }
    }

    #[test]
    fn test_truncation() {
        assert_eq!(argb8888_to_rgb565(0xFF0000FF), 0x001F);
        assert_eq!(argb8888_to_rgb565(0x00FF_0000), 0xF800);
        assert_eq!(argb8888_to_rgb565(0x1207_0307), 0x0000);
    }

    #[test]
    fn test_embedded_graphics_conversions() {
        let color = Rgb888::new(0x12, 0x34, 0x56);
        assert_eq!(to_argb8888(color), 0xFF12_3456);
        assert_eq!(to_argb8888(Rgb888::BLACK), OPAQUE);
        assert_eq!(to_argb8888(Rgb888::WHITE), 0xFFFF_FFFF);
    }

    #[test]
    fn test_native_words() {
        assert_eq!(to_native(0xFF0000FF, PixelFormat::Argb8888), 0xFF0000FF);
        assert_eq!(to_native(0xFF0000FF, PixelFormat::Rgb565), 0x001F);
        assert_eq!(from_native(0x001F, PixelFormat::Rgb565), 0xFF0000FF);
    }
}
