use std::cell::RefCell;
use std::rc::Rc;

use super::{Event, EventLog};
use crate::config::CompositorTiming;
use crate::hal::{Compositor, HalError, HalResult};
use crate::layer::ReloadKind;
use crate::regs::LayerRegisters;
use crate::LAYER_COUNT;

#[derive(Debug, Default)]
struct State {
    shadow: [LayerRegisters; LAYER_COUNT],
    active: [LayerRegisters; LAYER_COUNT],
    reload_armed: bool,
    timing: Option<CompositorTiming>,
    fail_init: bool,
    fail_writes: bool,
}

/// Compositor with separate shadow and active register sets.
///
/// An immediate reload copies the shadow set at once; a vertical blanking
/// reload copies it at the next [`vertical_blank`](Self::vertical_blank).
#[derive(Debug, Clone)]
pub struct SimCompositor {
    log: EventLog,
    state: Rc<RefCell<State>>,
}

impl SimCompositor {
    /// Compositor recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            state: Rc::default(),
        }
    }

    /// Registers of layer `index` the scan-out currently uses.
    #[must_use]
    pub fn active(&self, index: usize) -> LayerRegisters {
        self.state.borrow().active[index]
    }

    /// Registers of layer `index` waiting for a reload.
    #[must_use]
    pub fn shadow(&self, index: usize) -> LayerRegisters {
        self.state.borrow().shadow[index]
    }

    /// Timing programmed by the last `init`.
    #[must_use]
    pub fn timing(&self) -> Option<CompositorTiming> {
        self.state.borrow().timing
    }

    /// Runs one vertical blanking period.
    pub fn vertical_blank(&self) {
        self.log.push(Event::VerticalBlank);
        let mut state = self.state.borrow_mut();
        if state.reload_armed {
            state.active = state.shadow;
            state.reload_armed = false;
        }
    }

    /// Makes `init` fail.
    pub fn set_fail_init(&self, fail: bool) {
        self.state.borrow_mut().fail_init = fail;
    }

    /// Makes layer writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl Compositor for SimCompositor {
    fn init(&mut self, timing: &CompositorTiming) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(HalError::Error);
        }
        state.timing = Some(*timing);
        self.log.push(Event::CompositorInit);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult {
        let mut state = self.state.borrow_mut();
        state.shadow = [LayerRegisters::default(); LAYER_COUNT];
        state.active = state.shadow;
        state.reload_armed = false;
        state.timing = None;
        self.log.push(Event::CompositorDeinit);
        Ok(())
    }

    fn write_layer(&mut self, index: usize, regs: &LayerRegisters) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(HalError::Error);
        }
        *state.shadow.get_mut(index).ok_or(HalError::Error)? = *regs;
        self.log.push(Event::LayerWritten(index));
        Ok(())
    }

    fn reload(&mut self, kind: ReloadKind) -> HalResult {
        let mut state = self.state.borrow_mut();
        match kind {
            ReloadKind::Immediate => {
                state.active = state.shadow;
                state.reload_armed = false;
            }
            ReloadKind::VerticalBlanking => state.reload_armed = true,
        }
        self.log.push(Event::Reload(kind));
        Ok(())
    }
}
