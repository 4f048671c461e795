//! Blit/convert engine.
//!
//! Drives the 2D DMA engine for the two operations the display needs:
//! constant-colour rectangle fills (register to memory) and single-line
//! copies with pixel format conversion (memory to memory).
//!
//! The engine is reprogrammed for every job and runs one job at a time. After
//! starting a job the caller is blocked in a bounded completion poll; what
//! happens when the budget runs out is decided by the
//! [`TimeoutPolicy`].

use crate::color;
use crate::config::{PollBudgets, TimeoutPolicy};
use crate::error::{Error, Result};
use crate::hal::Blitter;
use crate::poll::spin_until;
use crate::PixelFormat;

/// Output colour mode of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorMode {
    /// 32-bit ARGB8888.
    Argb8888,
    /// 16-bit RGB565.
    Rgb565,
}

impl ColorMode {
    /// Bytes per output pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            ColorMode::Argb8888 => 4,
            ColorMode::Rgb565 => 2,
        }
    }
}

impl From<PixelFormat> for ColorMode {
    fn from(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Argb8888 => ColorMode::Argb8888,
            PixelFormat::Rgb565 => ColorMode::Rgb565,
        }
    }
}

/// Input colour mode of a memory-to-memory job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputColorMode {
    /// 32-bit ARGB8888.
    Argb8888,
    /// 24-bit RGB888, stored blue first.
    Rgb888,
    /// 16-bit RGB565.
    Rgb565,
}

impl InputColorMode {
    /// Bytes per input pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            InputColorMode::Argb8888 => 4,
            InputColorMode::Rgb888 => 3,
            InputColorMode::Rgb565 => 2,
        }
    }

    /// Input mode for a raster with `bytes_per_pixel` bytes per pixel:
    /// 4 is ARGB8888, 2 is RGB565 and everything else is read as RGB888.
    #[must_use]
    pub const fn from_bytes_per_pixel(bytes_per_pixel: u32) -> Self {
        match bytes_per_pixel {
            4 => InputColorMode::Argb8888,
            2 => InputColorMode::Rgb565,
            _ => InputColorMode::Rgb888,
        }
    }

    /// Decodes one little-endian input pixel into ARGB8888.
    ///
    /// Formats without an alpha channel decode fully opaque. Returns `None`
    /// if `bytes` is shorter than one pixel.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<u32> {
        match self {
            InputColorMode::Argb8888 => {
                let b: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
                Some(u32::from_le_bytes(b))
            }
            InputColorMode::Rgb888 => {
                let b = bytes.get(..3)?;
                Some(color::OPAQUE | u32::from(b[2]) << 16 | u32::from(b[1]) << 8 | u32::from(b[0]))
            }
            InputColorMode::Rgb565 => {
                let b: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
                Some(color::rgb565_to_argb8888(u16::from_le_bytes(b)))
            }
        }
    }
}

impl From<PixelFormat> for InputColorMode {
    fn from(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Argb8888 => InputColorMode::Argb8888,
            PixelFormat::Rgb565 => InputColorMode::Rgb565,
        }
    }
}

/// Handling of the source alpha channel in a memory-to-memory job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlphaMode {
    /// Pass the source alpha through.
    #[default]
    NoModify,
    /// Replace the source alpha with the configured input alpha.
    Replace,
}

/// Transfer mode of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Constant colour into memory.
    RegisterToMemory,
    /// Memory into memory with pixel format conversion.
    MemoryToMemoryPfc,
}

/// Foreground layer setup of a memory-to-memory job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLayer {
    /// Source colour mode.
    pub color_mode: InputColorMode,
    /// Source alpha handling.
    pub alpha_mode: AlphaMode,
    /// Alpha used by [`AlphaMode::Replace`].
    pub alpha: u8,
    /// Pixels skipped at the end of each source line.
    pub offset: u32,
}

/// Complete engine programming for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlitConfig {
    /// Transfer mode.
    pub mode: TransferMode,
    /// Output colour mode.
    pub output: ColorMode,
    /// Pixels skipped at the end of each destination line.
    pub output_offset: u32,
    /// Foreground layer, absent for fills.
    pub input: Option<InputLayer>,
}

/// Source of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitSource<'a> {
    /// Constant ARGB8888 colour; the engine encodes it in the output mode.
    Color(u32),
    /// Pixels in CPU memory.
    Buffer(&'a [u8]),
    /// Pixels in framebuffer memory.
    Address(u32),
}

/// One transfer, built per call and discarded after it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitJob<'a> {
    /// Output colour mode.
    pub output: ColorMode,
    /// Input colour mode, absent for fills.
    pub input: Option<InputColorMode>,
    /// Source alpha handling.
    pub alpha_mode: AlphaMode,
    /// Source pixels or colour.
    pub source: BlitSource<'a>,
    /// Destination address.
    pub destination: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in lines.
    pub height: u32,
    /// Pixels skipped at the end of each destination line.
    pub output_offset: u32,
}

impl BlitJob<'_> {
    /// Engine programming for this job.
    #[must_use]
    pub fn config(&self) -> BlitConfig {
        let mode = match self.input {
            Some(_) => TransferMode::MemoryToMemoryPfc,
            None => TransferMode::RegisterToMemory,
        };
        BlitConfig {
            mode,
            output: self.output,
            output_offset: self.output_offset,
            input: self.input.map(|color_mode| InputLayer {
                color_mode,
                alpha_mode: self.alpha_mode,
                alpha: 0xFF,
                offset: 0,
            }),
        }
    }
}

/// Synchronous front end of the 2D DMA engine.
#[derive(Debug)]
pub struct BlitEngine<B> {
    blitter: B,
    budgets: PollBudgets,
    policy: TimeoutPolicy,
}

impl<B: Blitter> BlitEngine<B> {
    /// Wraps `blitter`.
    pub const fn new(blitter: B, budgets: PollBudgets, policy: TimeoutPolicy) -> Self {
        Self {
            blitter,
            budgets,
            policy,
        }
    }

    /// Shared access to the blitter.
    pub const fn blitter(&self) -> &B {
        &self.blitter
    }

    /// Exclusive access to the blitter.
    pub fn blitter_mut(&mut self) -> &mut B {
        &mut self.blitter
    }

    /// Current timeout policy.
    pub const fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Changes the timeout policy.
    pub fn set_policy(&mut self, policy: TimeoutPolicy) {
        self.policy = policy;
    }

    /// Fills `width` × `height` pixels at `dst` with `color`, skipping
    /// `line_offset` pixels after each line.
    ///
    /// `color` is a native pixel word of `format`. RGB565 colours are
    /// expanded to ARGB8888 before they are handed to the engine, which
    /// encodes them back into the output mode.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the engine rejects the job,
    /// [`Error::Timeout`] if it does not complete within the fill budget and
    /// the policy is [`TimeoutPolicy::Escalate`].
    pub fn fill(
        &mut self,
        dst: u32,
        width: u32,
        height: u32,
        line_offset: u32,
        color: u32,
        format: PixelFormat,
    ) -> Result<()> {
        let input_color = match format {
            PixelFormat::Rgb565 => color::rgb565_to_argb8888(color as u16),
            PixelFormat::Argb8888 => color,
        };
        let budget = if width == 1 || height == 1 {
            self.budgets.line_fill
        } else {
            self.budgets.area_fill
        };
        let job = BlitJob {
            output: format.into(),
            input: None,
            alpha_mode: AlphaMode::NoModify,
            source: BlitSource::Color(input_color),
            destination: dst,
            width,
            height,
            output_offset: line_offset,
        };
        self.submit(&job, budget)
    }

    /// Copies one line of `width` pixels from `src` to `dst`, converting
    /// from `input` to `output`. Source alpha is passed through.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the engine rejects the job,
    /// [`Error::Timeout`] if it does not complete within the conversion
    /// budget and the policy is [`TimeoutPolicy::Escalate`].
    pub fn convert_and_copy(
        &mut self,
        src: BlitSource<'_>,
        dst: u32,
        width: u32,
        input: InputColorMode,
        output: ColorMode,
    ) -> Result<()> {
        let job = BlitJob {
            output,
            input: Some(input),
            alpha_mode: AlphaMode::NoModify,
            source: src,
            destination: dst,
            width,
            height: 1,
            output_offset: 0,
        };
        self.submit(&job, self.budgets.convert_line)
    }

    /// Programs and starts `job`, then polls for completion for at most
    /// `budget` iterations.
    ///
    /// # Errors
    ///
    /// See [`fill`](Self::fill).
    pub fn submit(&mut self, job: &BlitJob<'_>, budget: u32) -> Result<()> {
        self.blitter
            .configure(&job.config())
            .map_err(Error::periph)?;
        self.blitter
            .start(job.source, job.destination, job.width, job.height)
            .map_err(Error::periph)?;
        let blitter = &mut self.blitter;
        match spin_until(budget, || blitter.is_complete()) {
            Ok(_) => Ok(()),
            Err(err) => match self.policy {
                TimeoutPolicy::BestEffort => {
                    warn!(
                        "blit to {:#x} ({} x {}) did not complete within {} polls",
                        job.destination,
                        job.width,
                        job.height,
                        budget
                    );
                    Ok(())
                }
                TimeoutPolicy::Escalate => Err(err),
            },
        }
    }

    /// Disables the engine.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the engine refuses.
    pub fn deinit(&mut self) -> Result<()> {
        self.blitter.deinit().map_err(Error::periph)
    }
}
