//! Layer compositing, blit engine and bring-up sequencing for MIPI-DSI
//! display pipelines.
//!
//! ## How a DSI Display Pipeline Works
//!
//! A DSI panel is not a memory you write pixels into. The SoC streams video to
//! it continuously and talks to its controller chip over the same serial link
//! in between frames. Three IP blocks cooperate:
//!
//! - **Compositor** – scans one or more framebuffers out of memory, blends the
//!   layers and produces the timed video stream (sync, porches, active area)
//! - **Blitter** – a 2D DMA engine that fills rectangles with a constant
//!   colour and copies lines while converting between pixel formats
//! - **Command host** – the DSI host controller; it carries the video stream
//!   and the DCS command packets that configure the panel controller
//!
//! ### Shadow registers and reloads
//! Every compositor layer register has a *shadow* copy. Writes only touch the
//! shadow set; a *reload* copies the whole set into the active registers at
//! once, either immediately or at the next vertical blanking period. This is
//! what makes multi-register changes (window, address and format of a layer)
//! land atomically inside one frame. [`layer::LayerManager`] exposes this
//! through a [`layer::ReloadMode`]:
//!
//! 1. `Immediate` – every layer mutation is committed as it happens.
//! 2. `VerticalBlanking` – mutations are armed for the next frame boundary.
//! 3. `None` – mutations stay in the shadow registers until
//!    [`layer::LayerManager::reload`] is called.
//!
//! ### Bring-up
//! Before the first pixel reaches the glass the board has to go through a
//! strict sequence: the external memory bank is parked, the panel is reset,
//! the three display domains are clocked and reset, the command host and the
//! pixel clock are configured, the compositor timing and layer 0 are set up,
//! the link is started and finally the panel controller is identified and
//! initialised over DCS. [`bringup::Pipeline::bring_up`] runs that sequence
//! and stops at the first failing stage, reporting which stage it was.
//!
//! ### Dual-core hand-off
//! On dual-core parts the secondary core waits in stop mode until the primary
//! core has brought the display and memory up. [`boot::BootSequencer`]
//! releases it through one hardware semaphore and confirms the wake-up
//! through the secondary core's clock-ready flag, with bounded waits on both
//! sides.
//!
//! ## Hardware Access
//!
//! All register access lives behind the traits in [`hal`]. The pipeline never
//! touches a peripheral directly, so the same code runs against a real SoC or
//! against the software models in `sim` (feature `sim`), which is how the
//! tests and benchmarks in this crate exercise it.
//!
//! ## Drawing
//!
//! [`display::Display`] implements `embedded_graphics::DrawTarget` on top of
//! the active layer, with rectangle fills routed through the blitter:
//!
//! ```rust,no_run
//! # #[cfg(feature = "sim")]
//! # {
//! use dsi_pipeline::bringup::{DefaultHooks, Pipeline};
//! use dsi_pipeline::config::PipelineConfig;
//! use dsi_pipeline::panel::DcsPanel;
//! use dsi_pipeline::sim::SimBoard;
//! use embedded_graphics::pixelcolor::Rgb888;
//! use embedded_graphics::prelude::*;
//! use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
//!
//! let board = SimBoard::new(&PipelineConfig::default());
//! let mut pipeline = Pipeline::new(
//!     board.peripherals(),
//!     DcsPanel::default(),
//!     DefaultHooks,
//!     PipelineConfig::default(),
//! );
//! pipeline.bring_up().unwrap();
//!
//! let display = pipeline.display_mut();
//! Rectangle::new(Point::new(10, 10), Size::new(100, 50))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
//!     .draw(display)
//!     .unwrap();
//! # }
//! ```
//!
//! ## Available Feature Flags
//!
//! ### `defmt` Feature
//! Routes the crate's internal logging to `defmt` and derives `defmt::Format`
//! for the public types.
//!
//! ### `log` Feature
//! Routes the crate's internal logging to the `log` facade. Ignored when
//! `defmt` is also enabled.
//!
//! ### `sim` Feature
//! Builds the `sim` module: software models of every hardware trait, sharing
//! one event log for ordering assertions. Requires `std`.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

#[cfg(any(test, feature = "sim"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod bitmap;
pub mod blit;
pub mod boot;
pub mod bringup;
pub mod channel;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod hal;
pub mod layer;
pub mod panel;
pub mod poll;
pub mod regs;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod touch;

pub use error::{Error, Result};

/// Colour type used by the `embedded-graphics` integration.
pub type Color = embedded_graphics::pixelcolor::Rgb888;

/// Number of compositor layers.
pub const LAYER_COUNT: usize = 2;

/// Framebuffer pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 16-bit packed RGB565.
    Rgb565,
    /// 32-bit ARGB8888.
    #[default]
    Argb8888,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Argb8888 => 4,
        }
    }

    /// Format code of the compositor's pixel format register.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            PixelFormat::Argb8888 => 0,
            PixelFormat::Rgb565 => 2,
        }
    }
}

/// Computes the size in bytes of a `width` × `height` framebuffer.
///
/// This is a const function that can be used to size static framebuffers:
///
/// ```rust
/// use dsi_pipeline::{compute_buffer_size, PixelFormat};
///
/// const SIZE: usize = compute_buffer_size(800, 480, PixelFormat::Rgb565);
/// assert_eq!(SIZE, 768_000);
/// ```
#[must_use]
pub const fn compute_buffer_size(width: u32, height: u32, format: PixelFormat) -> usize {
    (width * height * format.bytes_per_pixel()) as usize
}
