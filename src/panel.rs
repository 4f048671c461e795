//! Panel controller drivers.
//!
//! A driver speaks to its controller through a [`PanelBus`] only. The
//! single-parameter commands below are sent as zero-length writes whose
//! parameter is the first payload byte, and the multi-byte commands as long
//! writes of their full parameter list.

use embedded_hal::delay::DelayNs;

use crate::channel::PanelBus;
use crate::error::{Error, Result};
use crate::PixelFormat;

/// Panel scan orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    /// Rows along the short edge.
    Portrait,
    /// Rows along the long edge.
    #[default]
    Landscape,
}

/// MIPI DCS command codes.
pub mod dcs {
    /// Exit sleep mode.
    pub const SLPOUT: u16 = 0x11;
    /// Display off.
    pub const DISPOFF: u16 = 0x28;
    /// Display on.
    pub const DISPON: u16 = 0x29;
    /// Column address set.
    pub const CASET: u16 = 0x2A;
    /// Page address set.
    pub const PASET: u16 = 0x2B;
    /// Tearing effect line on.
    pub const TEON: u16 = 0x35;
    /// Memory data access control.
    pub const MADCTL: u16 = 0x36;
    /// Interface pixel format.
    pub const COLMOD: u16 = 0x3A;
    /// Set tear scan line.
    pub const WRTESCN: u16 = 0x44;
    /// Write display brightness.
    pub const WRDISBV: u16 = 0x51;
    /// Write control display.
    pub const WRCTRLD: u16 = 0x53;
    /// Read ID1.
    pub const RDID1: u16 = 0xDA;

    /// COLMOD value for 24-bit pixels.
    pub const COLMOD_RGB888: u8 = 0x77;
    /// COLMOD value for 16-bit pixels.
    pub const COLMOD_RGB565: u8 = 0x55;
    /// MADCTL value for portrait scanning.
    pub const MADCTL_PORTRAIT: u8 = 0x00;
    /// MADCTL value for landscape scanning (row/column exchange, column
    /// address order reversed).
    pub const MADCTL_LANDSCAPE: u8 = 0x60;
    /// WRCTRLD value enabling brightness control, dimming and backlight.
    pub const WRCTRLD_BL_ON: u8 = 0x2C;
}

/// Operations the bring-up sequence needs from a panel controller.
pub trait PanelDriver {
    /// Reads the controller identifier.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn read_id<B: PanelBus>(&mut self, bus: &mut B) -> Result<u8>;

    /// Runs the controller initialisation sequence.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn init<B: PanelBus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        format: PixelFormat,
        orientation: Orientation,
    ) -> Result<()>;

    /// Sets the column window `start..=end`.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn set_column_address<B: PanelBus>(&mut self, bus: &mut B, start: u16, end: u16) -> Result<()>;

    /// Sets the page window `start..=end`.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn set_page_address<B: PanelBus>(&mut self, bus: &mut B, start: u16, end: u16) -> Result<()>;

    /// Sets the line on which the tearing effect signal is raised.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn set_tear_scanline<B: PanelBus>(&mut self, bus: &mut B, line: u16) -> Result<()>;

    /// Turns the display on.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn display_on<B: PanelBus>(&mut self, bus: &mut B) -> Result<()>;

    /// Turns the display off.
    ///
    /// # Errors
    ///
    /// Whatever the bus reports.
    fn display_off<B: PanelBus>(&mut self, bus: &mut B) -> Result<()>;

    /// Sets the backlight to `percent` (0-100).
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] above 100, otherwise whatever the bus reports.
    fn set_brightness<B: PanelBus>(&mut self, bus: &mut B, percent: u8) -> Result<()>;

    /// Last brightness set, in percent.
    fn brightness(&self) -> u8;
}

/// Driver using only standard MIPI DCS commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DcsPanel {
    brightness: u8,
    sleep_out_ms: u32,
}

impl Default for DcsPanel {
    fn default() -> Self {
        Self::new(120)
    }
}

impl DcsPanel {
    /// Driver waiting `sleep_out_ms` after leaving sleep mode.
    #[must_use]
    pub const fn new(sleep_out_ms: u32) -> Self {
        Self {
            brightness: 100,
            sleep_out_ms,
        }
    }

    fn write_param<B: PanelBus>(bus: &mut B, register: u16, param: u8) -> Result<()> {
        bus.write_register(register, &[param], 0)
    }

    fn write_range<B: PanelBus>(bus: &mut B, register: u16, start: u16, end: u16) -> Result<()> {
        let [s_hi, s_lo] = start.to_be_bytes();
        let [e_hi, e_lo] = end.to_be_bytes();
        bus.write_register(register, &[s_hi, s_lo, e_hi, e_lo], 4)
    }
}

impl PanelDriver for DcsPanel {
    fn read_id<B: PanelBus>(&mut self, bus: &mut B) -> Result<u8> {
        let mut id = [0u8; 1];
        bus.read_register(dcs::RDID1, &mut id, 1)?;
        Ok(id[0])
    }

    fn init<B: PanelBus, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        format: PixelFormat,
        orientation: Orientation,
    ) -> Result<()> {
        Self::write_param(bus, dcs::SLPOUT, 0)?;
        delay.delay_ms(self.sleep_out_ms);
        let colmod = match format {
            PixelFormat::Argb8888 => dcs::COLMOD_RGB888,
            PixelFormat::Rgb565 => dcs::COLMOD_RGB565,
        };
        Self::write_param(bus, dcs::COLMOD, colmod)?;
        let madctl = match orientation {
            Orientation::Portrait => dcs::MADCTL_PORTRAIT,
            Orientation::Landscape => dcs::MADCTL_LANDSCAPE,
        };
        Self::write_param(bus, dcs::MADCTL, madctl)?;
        Self::write_param(bus, dcs::WRDISBV, 0xFF)?;
        Self::write_param(bus, dcs::WRCTRLD, dcs::WRCTRLD_BL_ON)?;
        Self::write_param(bus, dcs::TEON, 0)?;
        self.brightness = 100;
        Ok(())
    }

    fn set_column_address<B: PanelBus>(&mut self, bus: &mut B, start: u16, end: u16) -> Result<()> {
        Self::write_range(bus, dcs::CASET, start, end)
    }

    fn set_page_address<B: PanelBus>(&mut self, bus: &mut B, start: u16, end: u16) -> Result<()> {
        Self::write_range(bus, dcs::PASET, start, end)
    }

    fn set_tear_scanline<B: PanelBus>(&mut self, bus: &mut B, line: u16) -> Result<()> {
        bus.write_register(dcs::WRTESCN, &line.to_be_bytes(), 2)
    }

    fn display_on<B: PanelBus>(&mut self, bus: &mut B) -> Result<()> {
        Self::write_param(bus, dcs::DISPON, 0)
    }

    fn display_off<B: PanelBus>(&mut self, bus: &mut B) -> Result<()> {
        Self::write_param(bus, dcs::DISPOFF, 0)
    }

    fn set_brightness<B: PanelBus>(&mut self, bus: &mut B, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(Error::WrongParam);
        }
        let level = (u32::from(percent) * 255 / 100) as u8;
        Self::write_param(bus, dcs::WRDISBV, level)?;
        self.brightness = percent;
        Ok(())
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}
