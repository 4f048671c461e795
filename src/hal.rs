//! Hardware seam.
//!
//! Every IP block the pipeline touches is reached through one of the traits in
//! this module. A board support crate implements them on top of its register
//! access layer; the [`sim`](crate::sim) module implements them in software
//! for tests and benchmarks.
//!
//! The traits are deliberately thin: they mirror the operations a vendor HAL
//! exposes and leave all sequencing, validation and error classification to
//! the pipeline components.

use crate::blit::{BlitConfig, BlitSource};
use crate::config::{CompositorTiming, DsiHostConfig, DsiVideoConfig, PixelClockConfig};
use crate::layer::ReloadKind;
use crate::regs::{LayerRegisters, LowPowerCommands};

/// Failure reported by a hardware trait implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// The operation was rejected.
    Error,
    /// The block was busy with another request.
    Busy,
    /// The block did not respond in time.
    Timeout,
}

/// Result type returned by hardware trait implementations.
pub type HalResult<T = ()> = core::result::Result<T, HalError>;

/// Clock and reset domain of one display IP block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// Layer compositor (display controller).
    Compositor,
    /// 2D blit engine.
    Blitter,
    /// Serial command-channel host.
    CommandHost,
}

impl Domain {
    /// The three display domains in bring-up order.
    pub const ALL: [Domain; 3] = [Domain::Compositor, Domain::Blitter, Domain::CommandHost];

    /// Interrupt line owned by the domain.
    #[must_use]
    pub const fn irq(self) -> Irq {
        match self {
            Domain::Compositor => Irq::Compositor,
            Domain::Blitter => Irq::Blitter,
            Domain::CommandHost => Irq::CommandHost,
        }
    }
}

/// Interrupt line of a display IP block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Irq {
    /// Compositor line interrupt.
    Compositor,
    /// Blit engine transfer interrupt.
    Blitter,
    /// Command host interrupt.
    CommandHost,
}

/// Data transfer acknowledgement policy of the command link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    /// No acknowledge.
    None,
    /// Bus turn-around acknowledge after each transaction.
    #[default]
    BusTurnAround,
}

/// MIPI DSI data type of a command packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// DCS short write, no parameter.
    ShortWriteP0 = 0x05,
    /// DCS short write, one parameter.
    ShortWriteP1 = 0x15,
    /// DCS read request.
    ShortRead = 0x06,
    /// DCS long write.
    LongWrite = 0x39,
}

impl PacketType {
    /// Data type code carried in the packet header.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Clock gating, peripheral reset and the pixel clock tree.
pub trait ClockControl {
    /// Ungates the bus clock of `domain`.
    fn enable_clock(&mut self, domain: Domain);
    /// Gates the bus clock of `domain`.
    fn disable_clock(&mut self, domain: Domain);
    /// Holds `domain` in peripheral reset.
    fn assert_reset(&mut self, domain: Domain);
    /// Releases `domain` from peripheral reset.
    fn release_reset(&mut self, domain: Domain);
    /// Programs the fractional PLL that feeds the compositor pixel clock.
    fn configure_pixel_clock(&mut self, config: &PixelClockConfig) -> HalResult;
}

/// Interrupt controller access for the display interrupt lines.
pub trait InterruptControl {
    /// Sets preemption and sub priority of `irq`.
    fn set_priority(&mut self, irq: Irq, preempt: u8, sub: u8);
    /// Unmasks `irq`.
    fn enable(&mut self, irq: Irq);
    /// Masks `irq`.
    fn disable(&mut self, irq: Irq);
}

/// External memory controller holding the framebuffers.
pub trait MemoryController {
    /// Disables the memory bank so the core never issues speculative
    /// accesses to an unconfigured device.
    fn disable_bank(&mut self);
    /// Brings the external memory up.
    fn init(&mut self) -> HalResult;
    /// Shuts the external memory down.
    fn deinit(&mut self) -> HalResult;
}

/// Layer compositor with shadow registers.
///
/// [`write_layer`](Compositor::write_layer) only updates the shadow copy of a
/// layer; nothing is visible until [`reload`](Compositor::reload) copies the
/// shadow set into the active registers.
pub trait Compositor {
    /// Programs the synchronisation counters and enables the controller.
    fn init(&mut self, timing: &CompositorTiming) -> HalResult;
    /// Disables the controller.
    fn deinit(&mut self) -> HalResult;
    /// Writes the shadow registers of layer `index`.
    fn write_layer(&mut self, index: usize, regs: &LayerRegisters) -> HalResult;
    /// Requests a shadow register reload.
    fn reload(&mut self, kind: ReloadKind) -> HalResult;
}

/// 2D blit engine.
pub trait Blitter {
    /// Programs transfer mode, colour modes, offsets and alpha handling.
    fn configure(&mut self, config: &BlitConfig) -> HalResult;
    /// Starts one transfer of `width` × `height` pixels into `dst`.
    fn start(&mut self, source: BlitSource<'_>, dst: u32, width: u32, height: u32) -> HalResult;
    /// Returns `true` once the transfer started last has finished.
    fn is_complete(&mut self) -> bool;
    /// Disables the engine.
    fn deinit(&mut self) -> HalResult;
}

/// MIPI DSI host controller.
pub trait DsiHost {
    /// Configures lanes, escape clock divider and the D-PHY PLL.
    fn init(&mut self, config: &DsiHostConfig) -> HalResult;
    /// Programs video mode timing.
    fn configure_video(&mut self, config: &DsiVideoConfig) -> HalResult;
    /// Starts the link.
    fn start(&mut self) -> HalResult;
    /// Stops the link.
    fn stop(&mut self) -> HalResult;
    /// Shuts the host down.
    fn deinit(&mut self) -> HalResult;
    /// Selects low-power or high-speed transmission per packet class.
    fn configure_command_mode(&mut self, commands: LowPowerCommands) -> HalResult;
    /// Selects the acknowledgement policy.
    fn configure_flow_control(&mut self, flow: FlowControl) -> HalResult;
    /// Forces the receiver into low-power mode during turn-around.
    fn force_rx_low_power(&mut self, enable: bool) -> HalResult;
    /// Enables or disables the video wrapper feeding the link.
    fn set_wrapper_enabled(&mut self, enable: bool) -> HalResult;
    /// Sends a short packet carrying `register` and one parameter byte.
    fn short_write(
        &mut self,
        channel: u8,
        packet: PacketType,
        register: u16,
        parameter: u8,
    ) -> HalResult;
    /// Sends a long packet carrying `register` followed by `payload`.
    fn long_write(
        &mut self,
        channel: u8,
        packet: PacketType,
        register: u16,
        payload: &[u8],
    ) -> HalResult;
    /// Issues a read request for `register` and fills `buffer` with the
    /// response.
    fn read(
        &mut self,
        channel: u8,
        packet: PacketType,
        register: u16,
        buffer: &mut [u8],
    ) -> HalResult;
}

/// CPU view of framebuffer memory.
pub trait FrameMemory {
    /// Reads a 16-bit pixel word.
    fn read_u16(&self, address: u32) -> u16;
    /// Reads a 32-bit pixel word.
    fn read_u32(&self, address: u32) -> u32;
    /// Writes a 16-bit pixel word.
    fn write_u16(&mut self, address: u32, value: u16);
    /// Writes a 32-bit pixel word.
    fn write_u32(&mut self, address: u32, value: u32);
    /// Returns `true` if `len` bytes starting at `address` are backed by
    /// memory.
    fn region_fits(&self, address: u32, len: usize) -> bool;
}

/// Hardware semaphore block used for the inter-core handshake.
pub trait HwSemaphore {
    /// Ungates the semaphore block clock.
    fn enable_clock(&mut self);
    /// One-step take; returns `true` if the semaphore was free and is now
    /// owned by the caller.
    fn fast_take(&mut self, id: u8) -> bool;
    /// Releases semaphore `id` for `process`.
    fn release(&mut self, id: u8, process: u8);
}

/// Readiness flag of the secondary core's clock domain.
pub trait CoreReadyFlag {
    /// Samples the flag.
    fn is_set(&self) -> bool;
}
