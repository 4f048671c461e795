//! Pipeline configuration.
//!
//! [`PipelineConfig::default`] describes an 800 × 480 DSI panel driven over
//! two data lanes in video burst mode, with its framebuffer at the start of
//! external SDRAM. Every value can be overridden before constructing the
//! [`Pipeline`](crate::bringup::Pipeline).

use crate::hal::FlowControl;
use crate::panel::Orientation;
use crate::regs::LowPowerCommands;
use crate::PixelFormat;

/// Panel timing in pixel clocks (horizontal) and lines (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelTiming {
    /// Horizontal sync width.
    pub hsync: u32,
    /// Horizontal back porch.
    pub hbp: u32,
    /// Horizontal front porch.
    pub hfp: u32,
    /// Vertical sync height.
    pub vsync: u32,
    /// Vertical back porch.
    pub vbp: u32,
    /// Vertical front porch.
    pub vfp: u32,
}

impl PanelTiming {
    /// Timing of OTM8009A-class 800 × 480 panels.
    pub const OTM8009A: Self = Self {
        hsync: 2,
        hbp: 34,
        hfp: 34,
        vsync: 1,
        vbp: 15,
        vfp: 16,
    };
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self::OTM8009A
    }
}

/// Accumulated synchronisation counters of the compositor.
///
/// Each counter is the running sum of the timing intervals up to and including
/// its own, minus one, which is the encoding the compositor's timing registers
/// expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompositorTiming {
    /// Horizontal sync width minus one.
    pub horizontal_sync: u32,
    /// Vertical sync height minus one.
    pub vertical_sync: u32,
    /// Accumulated horizontal back porch.
    pub accumulated_hbp: u32,
    /// Accumulated vertical back porch.
    pub accumulated_vbp: u32,
    /// Accumulated active width.
    pub accumulated_active_width: u32,
    /// Accumulated active height.
    pub accumulated_active_height: u32,
    /// Total width.
    pub total_width: u32,
    /// Total height.
    pub total_height: u32,
    /// Background colour as RGB888.
    pub background: u32,
}

impl CompositorTiming {
    /// Derives the counters for a `width` × `height` active area.
    #[must_use]
    pub const fn from_panel(timing: &PanelTiming, width: u32, height: u32) -> Self {
        Self {
            horizontal_sync: timing.hsync - 1,
            vertical_sync: timing.vsync - 1,
            accumulated_hbp: timing.hsync + timing.hbp - 1,
            accumulated_vbp: timing.vsync + timing.vbp - 1,
            accumulated_active_width: timing.hsync + width + timing.hbp - 1,
            accumulated_active_height: timing.vsync + height + timing.vbp - 1,
            total_width: timing.hsync + width + timing.hbp + timing.hfp - 1,
            total_height: timing.vsync + height + timing.vbp + timing.vfp - 1,
            background: 0,
        }
    }
}

/// Host side link parameters of the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsiHostConfig {
    /// Number of data lanes.
    pub lanes: u8,
    /// Escape clock divider applied to the lane byte clock.
    pub tx_escape_clock_div: u8,
    /// D-PHY PLL loop division factor.
    pub pll_ndiv: u16,
    /// D-PHY PLL input division factor.
    pub pll_idf: u8,
    /// D-PHY PLL output division factor.
    pub pll_odf: u8,
    /// Lane byte clock in kHz.
    pub lane_byte_clock_khz: u32,
    /// Pixel clock in kHz.
    pub pixel_clock_khz: u32,
}

impl Default for DsiHostConfig {
    fn default() -> Self {
        Self {
            lanes: 2,
            tx_escape_clock_div: 4,
            pll_ndiv: 100,
            pll_idf: 5,
            pll_odf: 1,
            lane_byte_clock_khz: 62_500,
            pixel_clock_khz: 27_429,
        }
    }
}

impl DsiHostConfig {
    /// Converts a horizontal interval from pixel clocks to lane byte clocks.
    #[must_use]
    pub const fn to_lane_cycles(&self, pixels: u32) -> u32 {
        pixels * self.lane_byte_clock_khz / self.pixel_clock_khz
    }
}

/// Video mode timing of the command channel.
///
/// Horizontal values are in lane byte clocks, vertical values in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsiVideoConfig {
    /// Virtual channel carrying the video stream.
    pub virtual_channel: u8,
    /// Colour coding of the stream.
    pub color_coding: PixelFormat,
    /// Pixels per video packet.
    pub packet_size: u32,
    /// Chunks per line, zero for a single chunk.
    pub number_of_chunks: u32,
    /// Null packet size.
    pub null_packet_size: u32,
    /// Horizontal sync active.
    pub horizontal_sync_active: u32,
    /// Horizontal back porch.
    pub horizontal_back_porch: u32,
    /// Total line length.
    pub horizontal_line: u32,
    /// Vertical sync active.
    pub vertical_sync_active: u32,
    /// Vertical back porch.
    pub vertical_back_porch: u32,
    /// Vertical front porch.
    pub vertical_front_porch: u32,
    /// Active lines.
    pub vertical_active: u32,
    /// Largest low-power packet during blanking, in bytes.
    pub lp_largest_packet_size: u8,
    /// Largest low-power packet during the active area, in bytes.
    pub lp_vact_largest_packet_size: u8,
}

impl DsiVideoConfig {
    /// Derives video timing for a `width` × `height` panel, scaling the
    /// horizontal values by the lane byte clock to pixel clock ratio.
    #[must_use]
    pub const fn from_panel(
        timing: &PanelTiming,
        host: &DsiHostConfig,
        width: u32,
        height: u32,
        format: PixelFormat,
        virtual_channel: u8,
    ) -> Self {
        Self {
            virtual_channel,
            color_coding: format,
            packet_size: width,
            number_of_chunks: 0,
            null_packet_size: 0xFFF,
            horizontal_sync_active: host.to_lane_cycles(timing.hsync),
            horizontal_back_porch: host.to_lane_cycles(timing.hbp),
            horizontal_line: host
                .to_lane_cycles(width + timing.hsync + timing.hbp + timing.hfp),
            vertical_sync_active: timing.vsync,
            vertical_back_porch: timing.vbp,
            vertical_front_porch: timing.vfp,
            vertical_active: height,
            lp_largest_packet_size: 4,
            lp_vact_largest_packet_size: 4,
        }
    }
}

/// Fractional PLL feeding the compositor pixel clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelClockConfig {
    /// Reference oscillator in kHz.
    pub reference_khz: u32,
    /// Pre-divider.
    pub m: u32,
    /// Multiplier.
    pub n: u32,
    /// P output divider.
    pub p: u32,
    /// Q output divider.
    pub q: u32,
    /// R output divider, the one driving the pixel clock.
    pub r: u32,
    /// Fractional part of the multiplier.
    pub frac_n: u32,
}

impl Default for PixelClockConfig {
    fn default() -> Self {
        Self {
            reference_khz: 25_000,
            m: 5,
            n: 132,
            p: 2,
            q: 2,
            r: 24,
            frac_n: 0,
        }
    }
}

impl PixelClockConfig {
    /// Pixel clock produced by the integer part of the PLL, in kHz.
    #[must_use]
    pub const fn output_khz(&self) -> u32 {
        self.reference_khz / self.m * self.n / self.r
    }
}

/// Completion poll budgets of the blit engine, in polling iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudgets {
    /// Fills one pixel wide or one pixel high.
    pub line_fill: u32,
    /// All other fills.
    pub area_fill: u32,
    /// Single line format conversions.
    pub convert_line: u32,
}

impl Default for PollBudgets {
    fn default() -> Self {
        Self {
            line_fill: 25_000,
            area_fill: 100_000,
            convert_line: 50_000,
        }
    }
}

/// What a blit does when its completion poll runs out of budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPolicy {
    /// Log a warning and report success.
    #[default]
    BestEffort,
    /// Report [`Error::Timeout`](crate::Error::Timeout).
    Escalate,
}

/// Complete configuration of one display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineConfig {
    /// Active width in pixels.
    pub width: u32,
    /// Active height in pixels.
    pub height: u32,
    /// Pixel format of layer 0 and of the video stream.
    pub pixel_format: PixelFormat,
    /// Panel scan orientation.
    pub orientation: Orientation,
    /// Framebuffer address of layer 0.
    pub layer0_address: u32,
    /// Identifier the panel must answer with.
    pub panel_id: u8,
    /// Panel timing.
    pub panel_timing: PanelTiming,
    /// Command channel link parameters.
    pub host: DsiHostConfig,
    /// Pixel clock PLL.
    pub pixel_clock: PixelClockConfig,
    /// Virtual channel of the panel.
    pub virtual_channel: u8,
    /// Panel reset low pulse in milliseconds.
    pub reset_low_ms: u32,
    /// Settle time after releasing reset in milliseconds.
    pub reset_settle_ms: u32,
    /// Preemption priority of the display interrupts.
    pub irq_preempt_priority: u8,
    /// Sub priority of the display interrupts.
    pub irq_sub_priority: u8,
    /// Transmission mode per command packet class.
    pub low_power_commands: LowPowerCommands,
    /// Acknowledgement policy of the command link.
    pub flow_control: FlowControl,
    /// Line the panel raises its tearing effect signal on.
    pub tear_scan_line: Option<u16>,
    /// Layer 0 line pitch override in pixels.
    pub line_pitch: Option<u32>,
    /// Iteration ceiling of the dual-core boot waits.
    pub boot_ceiling: u32,
    /// Blit completion poll budgets.
    pub poll_budgets: PollBudgets,
    /// Blit timeout handling.
    pub timeout_policy: TimeoutPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            pixel_format: PixelFormat::Argb8888,
            orientation: Orientation::Landscape,
            layer0_address: 0xD000_0000,
            panel_id: 0x40,
            panel_timing: PanelTiming::OTM8009A,
            host: DsiHostConfig::default(),
            pixel_clock: PixelClockConfig::default(),
            virtual_channel: 0,
            reset_low_ms: 20,
            reset_settle_ms: 10,
            irq_preempt_priority: 9,
            irq_sub_priority: 0xF,
            low_power_commands: LowPowerCommands::high_speed(),
            flow_control: FlowControl::BusTurnAround,
            tear_scan_line: Some(533),
            line_pitch: None,
            boot_ceiling: 0xFFFF,
            poll_budgets: PollBudgets::default(),
            timeout_policy: TimeoutPolicy::BestEffort,
        }
    }
}

impl PipelineConfig {
    /// Compositor counters for this configuration.
    #[must_use]
    pub const fn compositor_timing(&self) -> CompositorTiming {
        CompositorTiming::from_panel(&self.panel_timing, self.width, self.height)
    }

    /// Command channel video timing for this configuration.
    #[must_use]
    pub const fn video(&self) -> DsiVideoConfig {
        DsiVideoConfig::from_panel(
            &self.panel_timing,
            &self.host,
            self.width,
            self.height,
            self.pixel_format,
            self.virtual_channel,
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_compositor_timing_800x480() {
        let t = CompositorTiming::from_panel(&PanelTiming::OTM8009A, 800, 480);
        assert_eq!(t.horizontal_sync, 1);
        assert_eq!(t.vertical_sync, 0);
        assert_eq!(t.accumulated_hbp, 35);
        assert_eq!(t.accumulated_vbp, 15);
        assert_eq!(t.accumulated_active_width, 835);
        assert_eq!(t.accumulated_active_height, 495);
        assert_eq!(t.total_width, 869);
        assert_eq!(t.total_height, 511);
    }

    #[test]
    fn test_video_timing_scaled_by_clock_ratio() {
        let config = PipelineConfig::default();
        let video = config.video();
        assert_eq!(video.horizontal_sync_active, 4);
        assert_eq!(video.horizontal_back_porch, 77);
        assert_eq!(video.horizontal_line, 1982);
        assert_eq!(video.vertical_sync_active, 1);
        assert_eq!(video.vertical_back_porch, 15);
        assert_eq!(video.vertical_front_porch, 16);
        assert_eq!(video.vertical_active, 480);
        assert_eq!(video.packet_size, 800);
        assert_eq!(video.color_coding, PixelFormat::Argb8888);
    }

    #[test]
    fn test_pixel_clock_output() {
        assert_eq!(PixelClockConfig::default().output_khz(), 27_500);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!((config.width, config.height), (800, 480));
        assert_eq!(config.layer0_address, 0xD000_0000);
        assert_eq!(config.panel_id, 0x40);
        assert_eq!(config.tear_scan_line, Some(533));
        assert_eq!(config.boot_ceiling, 0xFFFF);
        assert_eq!(config.timeout_policy, TimeoutPolicy::BestEffort);
        assert_eq!(config.low_power_commands, LowPowerCommands::high_speed());
        assert!(config.poll_budgets.line_fill < config.poll_budgets.area_fill);
    }
}
