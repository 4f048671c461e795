//! Drawing on the active layer.
//!
//! [`Display`] resolves pixel coordinates to framebuffer addresses of the
//! active layer and hands the pixel work to the blit engine. Single pixels
//! are read and written by the CPU; everything larger goes through the
//! blitter.
//!
//! Pixel addresses are `bytes_per_pixel × (y × width + x)` from the active
//! layer's base, where `width` is the logical width of the instance.
//! [`Display::read_pixel`] and [`Display::write_pixel`] do not check the
//! coordinates against the window; the `embedded-graphics` integration clips
//! to the logical area before calling them.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{Dimensions, DrawTarget, OriginDimensions, Point, Size};
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::Pixel;

use crate::bitmap::BitmapHeader;
use crate::blit::{BlitEngine, BlitSource, InputColorMode};
use crate::color;
use crate::error::{Error, Result};
use crate::hal::{Blitter, Compositor, FrameMemory};
use crate::layer::{LayerManager, Window};
use crate::{Color, PixelFormat};

/// Drawing surface over the compositor's active layer.
#[derive(Debug)]
pub struct Display<C, B, M> {
    layers: LayerManager<C>,
    blit: BlitEngine<B>,
    memory: M,
}

impl<C, B, M> Display<C, B, M>
where
    C: Compositor,
    B: Blitter,
    M: FrameMemory,
{
    /// Assembles a display from its parts.
    pub const fn new(layers: LayerManager<C>, blit: BlitEngine<B>, memory: M) -> Self {
        Self {
            layers,
            blit,
            memory,
        }
    }

    /// Layer manager.
    pub const fn layers(&self) -> &LayerManager<C> {
        &self.layers
    }

    /// Exclusive access to the layer manager.
    pub fn layers_mut(&mut self) -> &mut LayerManager<C> {
        &mut self.layers
    }

    /// Blit engine.
    pub const fn blit(&self) -> &BlitEngine<B> {
        &self.blit
    }

    /// Exclusive access to the blit engine.
    pub fn blit_mut(&mut self) -> &mut BlitEngine<B> {
        &mut self.blit
    }

    /// Framebuffer memory.
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Exclusive access to the framebuffer memory.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Shared access to the compositor.
    pub const fn compositor(&self) -> &C {
        self.layers.compositor()
    }

    /// Exclusive access to the compositor.
    pub fn compositor_mut(&mut self) -> &mut C {
        self.layers.compositor_mut()
    }

    /// Logical width in pixels.
    pub const fn width(&self) -> u32 {
        self.layers.context().width
    }

    /// Logical height in pixels.
    pub const fn height(&self) -> u32 {
        self.layers.context().height
    }

    /// Pixel format of the instance.
    pub const fn pixel_format(&self) -> PixelFormat {
        self.layers.context().pixel_format
    }

    /// Configures layer `index`; see [`LayerManager::configure_layer`].
    ///
    /// # Errors
    ///
    /// As [`LayerManager::configure_layer`].
    pub fn configure_layer(
        &mut self,
        index: usize,
        window: Window,
        format: PixelFormat,
        address: u32,
    ) -> Result<()> {
        self.layers
            .configure_layer(index, window, format, address, &self.memory)
    }

    fn address(&self, x: u32, y: u32, bytes_per_pixel: u32) -> Result<u32> {
        let base = self.layers.active()?.address;
        let index = y.wrapping_mul(self.width()).wrapping_add(x);
        Ok(base.wrapping_add(bytes_per_pixel.wrapping_mul(index)))
    }

    /// Reads the native pixel word at (`x`, `y`) in the active layer's
    /// format.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the active layer is not configured.
    pub fn read_pixel(&self, x: u32, y: u32) -> Result<u32> {
        let format = self.layers.active()?.format;
        let address = self.address(x, y, format.bytes_per_pixel())?;
        Ok(match format {
            PixelFormat::Argb8888 => self.memory.read_u32(address),
            PixelFormat::Rgb565 => u32::from(self.memory.read_u16(address)),
        })
    }

    /// Writes the native pixel word `color` at (`x`, `y`) in the active
    /// layer's format.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the active layer is not configured.
    pub fn write_pixel(&mut self, x: u32, y: u32, color: u32) -> Result<()> {
        let format = self.layers.active()?.format;
        let address = self.address(x, y, format.bytes_per_pixel())?;
        match format {
            PixelFormat::Argb8888 => self.memory.write_u32(address, color),
            PixelFormat::Rgb565 => self.memory.write_u16(address, color as u16),
        }
        Ok(())
    }

    /// Draws a horizontal line of `length` pixels from (`x`, `y`), clamped to
    /// the right edge of the logical area.
    ///
    /// # Errors
    ///
    /// As [`BlitEngine::fill`], or [`Error::WrongParam`] if the active layer
    /// is not configured.
    pub fn draw_hline(&mut self, x: u32, y: u32, length: u32, color: u32) -> Result<()> {
        let length = length.min(self.width().saturating_sub(x));
        if length == 0 {
            return Ok(());
        }
        let format = self.pixel_format();
        let dst = self.address(x, y, format.bytes_per_pixel())?;
        self.blit.fill(dst, length, 1, 0, color, format)
    }

    /// Draws a vertical line of `length` pixels from (`x`, `y`), clamped to
    /// the bottom edge of the logical area.
    ///
    /// # Errors
    ///
    /// As [`draw_hline`](Self::draw_hline).
    pub fn draw_vline(&mut self, x: u32, y: u32, length: u32, color: u32) -> Result<()> {
        let length = length.min(self.height().saturating_sub(y));
        if length == 0 {
            return Ok(());
        }
        let format = self.pixel_format();
        let dst = self.address(x, y, format.bytes_per_pixel())?;
        self.blit
            .fill(dst, 1, length, self.width().saturating_sub(1), color, format)
    }

    /// Fills the `width` × `height` rectangle at (`x`, `y`) with the native
    /// pixel word `color`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the rectangle leaves the logical area or the
    /// active layer is not configured, otherwise as [`BlitEngine::fill`].
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: u32) -> Result<()> {
        if !self.contains(x, y, width, height) {
            return Err(Error::WrongParam);
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        let format = self.pixel_format();
        let dst = self.address(x, y, format.bytes_per_pixel())?;
        self.blit
            .fill(dst, width, height, self.width() - width, color, format)
    }

    /// Fills the whole logical area with `color`.
    ///
    /// # Errors
    ///
    /// As [`fill_rect`](Self::fill_rect).
    pub fn clear_to(&mut self, color: u32) -> Result<()> {
        self.fill_rect(0, 0, self.width(), self.height(), color)
    }

    /// Copies a `width` × `height` block of pixels in the instance format
    /// from `data` to (`x`, `y`), one converted line at a time.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the block leaves the logical area, `data` is
    /// too short or the active layer is not configured, otherwise as
    /// [`BlitEngine::convert_and_copy`].
    pub fn fill_rgb_rect(
        &mut self,
        x: u32,
        y: u32,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<()> {
        let format = self.pixel_format();
        let bpp = format.bytes_per_pixel();
        if !self.contains(x, y, width, height) {
            return Err(Error::WrongParam);
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        let row_len = (width * bpp) as usize;
        if data.len() < row_len * height as usize {
            return Err(Error::WrongParam);
        }
        for (row, line) in (0..height).zip(data.chunks_exact(row_len)) {
            let dst = self.address(x, y + row, bpp)?;
            self.blit.convert_and_copy(
                BlitSource::Buffer(line),
                dst,
                width,
                InputColorMode::from(format),
                format.into(),
            )?;
        }
        Ok(())
    }

    /// Draws the raster image in `bytes` with its top-left corner at
    /// (`x`, `y`).
    ///
    /// The image is stored bottom-up; each row is converted from the image's
    /// pixel size (4 bytes ARGB8888, 2 bytes RGB565, otherwise RGB888) into
    /// the instance format.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the header or pixel data is shorter than the
    /// header describes or the active layer is not configured, otherwise as
    /// [`BlitEngine::convert_and_copy`].
    pub fn draw_bitmap(&mut self, x: u32, y: u32, bytes: &[u8]) -> Result<()> {
        let header = BitmapHeader::parse(bytes)?;
        if bytes.len() < header.image_len()? {
            return Err(Error::WrongParam);
        }
        let input = header.input_mode();
        let format = self.pixel_format();
        let bpp = format.bytes_per_pixel();
        let mut dst = self.address(x, y, bpp)?;
        let stride = self.width() * bpp;
        for row in 0..header.height {
            let line = header.row(bytes, row)?;
            self.blit.convert_and_copy(
                BlitSource::Buffer(line),
                dst,
                header.width,
                input,
                format.into(),
            )?;
            dst = dst.wrapping_add(stride);
        }
        Ok(())
    }

    fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        x.checked_add(width).is_some_and(|r| r <= self.width())
            && y.checked_add(height).is_some_and(|b| b <= self.height())
    }
}

fn native(color: Color, format: PixelFormat) -> u32 {
    color::to_native(color::to_argb8888(color), format)
}

impl<C, B, M> OriginDimensions for Display<C, B, M>
where
    C: Compositor,
    B: Blitter,
    M: FrameMemory,
{
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl<C, B, M> DrawTarget for Display<C, B, M>
where
    C: Compositor,
    B: Blitter,
    M: FrameMemory,
{
    type Color = Rgb888;

    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<()>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let format = self.layers.active()?.format;
        let (width, height) = (self.width(), self.height());
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                continue;
            }
            let word = native(color, format);
            self.write_pixel(x as u32, y as u32, word)?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<()> {
        let area = area.intersection(&self.bounding_box());
        if area.size.width == 0 || area.size.height == 0 {
            return Ok(());
        }
        let word = native(color, self.pixel_format());
        self.fill_rect(
            area.top_left.x as u32,
            area.top_left.y as u32,
            area.size.width,
            area.size.height,
            word,
        )
    }

    fn clear(&mut self, color: Self::Color) -> Result<()> {
        let word = native(color, self.pixel_format());
        self.clear_to(word)
    }
}
