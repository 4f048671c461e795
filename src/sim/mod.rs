//! Software models of the hardware traits.
//!
//! Every model is a cheap handle around shared state: cloning one gives a
//! second handle onto the same device, so a test can hand one clone to the
//! pipeline and keep another for fault injection and inspection. All models
//! of one board append to a shared [`EventLog`], which makes the order of
//! hardware accesses observable.
//!
//! ```rust
//! use dsi_pipeline::bringup::{DefaultHooks, Pipeline};
//! use dsi_pipeline::config::PipelineConfig;
//! use dsi_pipeline::panel::DcsPanel;
//! use dsi_pipeline::sim::{Event, SimBoard};
//!
//! let config = PipelineConfig::default();
//! let board = SimBoard::new(&config);
//! board.host.set_panel_id(0x00);
//! let mut pipeline =
//!     Pipeline::new(board.peripherals(), DcsPanel::default(), DefaultHooks, config);
//! assert!(pipeline.bring_up().is_err());
//! assert!(board.log.contains(&Event::LinkStarted));
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::config::PixelClockConfig;
use crate::hal::{Domain, FlowControl, Irq, PacketType};
use crate::layer::ReloadKind;
use crate::regs::LowPowerCommands;

mod blitter;
mod board;
mod compositor;
mod dsi;
mod memory;

pub use blitter::SimBlitter;
pub use board::{
    SimBoard, SimClocks, SimCoreFlag, SimDelay, SimInterrupts, SimMemoryController, SimPin,
    SimPinError, SimPlatform, SimSemaphore,
};
pub use compositor::SimCompositor;
pub use dsi::SimDsiHost;
pub use memory::SimMemory;

/// One observable hardware access.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // command host
    HostInit,
    VideoConfigured,
    LinkStarted,
    LinkStopped,
    HostDeinit,
    CommandMode(LowPowerCommands),
    FlowControl(FlowControl),
    ForceRxLowPower(bool),
    Wrapper(bool),
    ShortWrite {
        channel: u8,
        packet: PacketType,
        register: u16,
        parameter: u8,
    },
    LongWrite {
        channel: u8,
        register: u16,
        payload: Vec<u8>,
    },
    Read {
        channel: u8,
        register: u16,
        length: usize,
    },
    // compositor
    CompositorInit,
    CompositorDeinit,
    LayerWritten(usize),
    Reload(ReloadKind),
    VerticalBlank,
    // blitter
    BlitConfigured,
    BlitStarted {
        destination: u32,
        width: u32,
        height: u32,
        output_offset: u32,
    },
    BlitterDeinit,
    // external memory
    MemoryBankDisabled,
    MemoryInit,
    MemoryDeinit,
    // board
    ResetPin(bool),
    DelayMs(u32),
    DelayNs(u32),
    ClockEnabled(Domain),
    ClockDisabled(Domain),
    ResetAsserted(Domain),
    ResetReleased(Domain),
    PixelClock(PixelClockConfig),
    IrqPriority(Irq, u8, u8),
    IrqEnabled(Irq),
    IrqDisabled(Irq),
    // dual-core handshake
    SemaphoreClock,
    SemaphoreTaken(u8),
    SemaphoreReleased(u8, u8),
}

/// Shared, append-only record of hardware accesses.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event`.
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    /// Snapshot of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Forgets every event.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Returns `true` if `event` has been recorded.
    #[must_use]
    pub fn contains(&self, event: &Event) -> bool {
        self.0.borrow().contains(event)
    }

    /// Position of the first occurrence of `event`.
    #[must_use]
    pub fn index_of(&self, event: &Event) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == event)
    }

    /// Number of events matching `f`.
    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| f(e)).count()
    }
}
