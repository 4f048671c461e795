use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use super::{Event, EventLog, SimBlitter, SimCompositor, SimDsiHost, SimMemory};
use crate::bringup::{Peripherals, Platform};
use crate::config::{PipelineConfig, PixelClockConfig};
use crate::hal::{
    ClockControl, CoreReadyFlag, Domain, HalError, HalResult, HwSemaphore, InterruptControl, Irq,
    MemoryController,
};
use crate::{compute_buffer_size, LAYER_COUNT};

/// Clock gates, peripheral resets and the pixel clock PLL.
#[derive(Debug, Clone)]
pub struct SimClocks {
    log: EventLog,
    fail_pixel_clock: Rc<Cell<bool>>,
}

impl SimClocks {
    /// Clocks recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_pixel_clock: Rc::default(),
        }
    }

    /// Makes the pixel clock PLL fail to lock.
    pub fn set_fail_pixel_clock(&self, fail: bool) {
        self.fail_pixel_clock.set(fail);
    }
}

impl ClockControl for SimClocks {
    fn enable_clock(&mut self, domain: Domain) {
        self.log.push(Event::ClockEnabled(domain));
    }

    fn disable_clock(&mut self, domain: Domain) {
        self.log.push(Event::ClockDisabled(domain));
    }

    fn assert_reset(&mut self, domain: Domain) {
        self.log.push(Event::ResetAsserted(domain));
    }

    fn release_reset(&mut self, domain: Domain) {
        self.log.push(Event::ResetReleased(domain));
    }

    fn configure_pixel_clock(&mut self, config: &PixelClockConfig) -> HalResult {
        if self.fail_pixel_clock.get() {
            return Err(HalError::Timeout);
        }
        self.log.push(Event::PixelClock(*config));
        Ok(())
    }
}

/// Interrupt controller.
#[derive(Debug, Clone)]
pub struct SimInterrupts {
    log: EventLog,
}

impl SimInterrupts {
    /// Interrupt controller recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl InterruptControl for SimInterrupts {
    fn set_priority(&mut self, irq: Irq, preempt: u8, sub: u8) {
        self.log.push(Event::IrqPriority(irq, preempt, sub));
    }

    fn enable(&mut self, irq: Irq) {
        self.log.push(Event::IrqEnabled(irq));
    }

    fn disable(&mut self, irq: Irq) {
        self.log.push(Event::IrqDisabled(irq));
    }
}

/// External memory controller.
#[derive(Debug, Clone)]
pub struct SimMemoryController {
    log: EventLog,
    fail_init: Rc<Cell<bool>>,
}

impl SimMemoryController {
    /// Memory controller recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_init: Rc::default(),
        }
    }

    /// Makes `init` fail.
    pub fn set_fail_init(&self, fail: bool) {
        self.fail_init.set(fail);
    }
}

impl MemoryController for SimMemoryController {
    fn disable_bank(&mut self) {
        self.log.push(Event::MemoryBankDisabled);
    }

    fn init(&mut self) -> HalResult {
        if self.fail_init.get() {
            return Err(HalError::Error);
        }
        self.log.push(Event::MemoryInit);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult {
        self.log.push(Event::MemoryDeinit);
        Ok(())
    }
}

/// Error of a [`SimPin`] with failure injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin.
#[derive(Debug, Clone)]
pub struct SimPin {
    log: EventLog,
    high: Rc<Cell<bool>>,
    fail: Rc<Cell<bool>>,
}

impl SimPin {
    /// Pin recording into `log`, initially high.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            high: Rc::new(Cell::new(true)),
            fail: Rc::default(),
        }
    }

    /// Current level.
    #[must_use]
    pub fn is_high(&self) -> bool {
        self.high.get()
    }

    /// Makes every level change fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    fn drive(&self, high: bool) -> Result<(), SimPinError> {
        if self.fail.get() {
            return Err(SimPinError);
        }
        self.high.set(high);
        self.log.push(Event::ResetPin(high));
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

/// Delay provider that returns at once and records the requested delay.
#[derive(Debug, Clone)]
pub struct SimDelay {
    log: EventLog,
}

impl SimDelay {
    /// Delay recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::DelayNs(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(Event::DelayMs(ms));
    }
}

/// Hardware semaphore block.
#[derive(Debug, Clone)]
pub struct SimSemaphore {
    log: EventLog,
    held: Rc<Cell<bool>>,
    owner: Rc<Cell<Option<u8>>>,
}

impl SimSemaphore {
    /// Semaphore block recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            held: Rc::default(),
            owner: Rc::default(),
        }
    }

    /// Simulates the semaphore being held by the other core.
    pub fn set_held(&self, held: bool) {
        self.held.set(held);
    }

    /// Semaphore currently taken by this core.
    #[must_use]
    pub fn owner(&self) -> Option<u8> {
        self.owner.get()
    }
}

impl HwSemaphore for SimSemaphore {
    fn enable_clock(&mut self) {
        self.log.push(Event::SemaphoreClock);
    }

    fn fast_take(&mut self, id: u8) -> bool {
        if self.held.get() || self.owner.get().is_some() {
            return false;
        }
        self.owner.set(Some(id));
        self.log.push(Event::SemaphoreTaken(id));
        true
    }

    fn release(&mut self, id: u8, process: u8) {
        if self.owner.get() == Some(id) {
            self.owner.set(None);
        }
        self.log.push(Event::SemaphoreReleased(id, process));
    }
}

/// Clock-ready flag of the secondary core.
///
/// Counts every sample; [`toggle_after`](Self::toggle_after) schedules one
/// transition.
#[derive(Debug, Clone, Default)]
pub struct SimCoreFlag {
    value: Rc<Cell<bool>>,
    samples: Rc<Cell<u32>>,
    toggle_at: Rc<Cell<Option<u32>>>,
}

impl SimCoreFlag {
    /// Flag starting at `value`.
    #[must_use]
    pub fn new(value: bool) -> Self {
        let flag = Self::default();
        flag.value.set(value);
        flag
    }

    /// Sets the flag.
    pub fn set(&self, value: bool) {
        self.value.set(value);
    }

    /// The next `samples` samples see the current value, every later one
    /// the opposite.
    pub fn toggle_after(&self, samples: u32) {
        self.toggle_at.set(Some(self.samples.get() + samples));
    }

    /// Number of samples taken so far.
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples.get()
    }
}

impl CoreReadyFlag for SimCoreFlag {
    fn is_set(&self) -> bool {
        let taken = self.samples.get();
        if self.toggle_at.get() == Some(taken) {
            self.value.set(!self.value.get());
            self.toggle_at.set(None);
        }
        self.samples.set(taken + 1);
        self.value.get()
    }
}

/// [`Platform`] built from the software models.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimPlatform;

impl Platform for SimPlatform {
    type Clocks = SimClocks;
    type Interrupts = SimInterrupts;
    type ExternalMemory = SimMemoryController;
    type Compositor = SimCompositor;
    type Blitter = SimBlitter;
    type Host = SimDsiHost;
    type Memory = SimMemory;
    type ResetPin = SimPin;
    type Delay = SimDelay;
}

/// A complete simulated board sharing one event log.
///
/// The fields are handles onto the devices handed out by
/// [`peripherals`](Self::peripherals), for fault injection and inspection.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct SimBoard {
    pub log: EventLog,
    pub clocks: SimClocks,
    pub interrupts: SimInterrupts,
    pub memory_controller: SimMemoryController,
    pub compositor: SimCompositor,
    pub blitter: SimBlitter,
    pub host: SimDsiHost,
    pub memory: SimMemory,
    pub reset_pin: SimPin,
    pub delay: SimDelay,
}

impl SimBoard {
    /// Board for `config`: framebuffer memory for every layer at the
    /// layer 0 address and a panel answering the configured id.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        let log = EventLog::new();
        let size =
            compute_buffer_size(config.width, config.height, config.pixel_format) * LAYER_COUNT;
        let memory = SimMemory::new(config.layer0_address, size);
        let host = SimDsiHost::new(&log);
        host.set_panel_id(config.panel_id);
        Self {
            clocks: SimClocks::new(&log),
            interrupts: SimInterrupts::new(&log),
            memory_controller: SimMemoryController::new(&log),
            compositor: SimCompositor::new(&log),
            blitter: SimBlitter::new(&log, &memory),
            host,
            memory,
            reset_pin: SimPin::new(&log),
            delay: SimDelay::new(&log),
            log,
        }
    }

    /// Peripherals to hand to a [`Pipeline`](crate::bringup::Pipeline).
    #[must_use]
    pub fn peripherals(&self) -> Peripherals<SimPlatform> {
        Peripherals {
            clocks: self.clocks.clone(),
            interrupts: self.interrupts.clone(),
            external_memory: self.memory_controller.clone(),
            compositor: self.compositor.clone(),
            blitter: self.blitter.clone(),
            host: self.host.clone(),
            memory: self.memory.clone(),
            reset_pin: self.reset_pin.clone(),
            delay: self.delay.clone(),
        }
    }
}
