use std::cell::RefCell;
use std::rc::Rc;

use super::{Event, EventLog, SimMemory};
use crate::blit::{AlphaMode, BlitConfig, BlitSource, ColorMode, TransferMode};
use crate::color;
use crate::hal::{Blitter, HalError, HalResult};
use crate::PixelFormat;

#[derive(Debug, Default)]
struct State {
    config: Option<BlitConfig>,
    latency: u32,
    pending: u32,
    stalled: bool,
    fail_start: bool,
    transfers: u32,
}

/// Blitter executing every transfer in software when it is started.
///
/// Completion is reported after a configurable number of polls, or never if
/// the engine is stalled. The pixels are written either way.
#[derive(Debug, Clone)]
pub struct SimBlitter {
    log: EventLog,
    memory: SimMemory,
    state: Rc<RefCell<State>>,
}

impl SimBlitter {
    /// Blitter writing into `memory` and recording into `log`.
    #[must_use]
    pub fn new(log: &EventLog, memory: &SimMemory) -> Self {
        Self {
            log: log.clone(),
            memory: memory.clone(),
            state: Rc::default(),
        }
    }

    /// Number of polls that report the transfer as still running.
    pub fn set_latency(&self, polls: u32) {
        self.state.borrow_mut().latency = polls;
    }

    /// Stops completion from ever being reported.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.borrow_mut().stalled = stalled;
    }

    /// Makes `start` fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.state.borrow_mut().fail_start = fail;
    }

    /// Programming of the last transfer.
    #[must_use]
    pub fn config(&self) -> Option<BlitConfig> {
        self.state.borrow().config
    }

    /// Number of transfers started.
    #[must_use]
    pub fn transfers(&self) -> u32 {
        self.state.borrow().transfers
    }

    fn store(&self, address: u32, argb: u32, output: ColorMode) {
        match output {
            ColorMode::Argb8888 => self.memory.store(address, &argb.to_le_bytes()),
            ColorMode::Rgb565 => {
                let word = color::to_native(argb, PixelFormat::Rgb565) as u16;
                self.memory.store(address, &word.to_le_bytes());
            }
        }
    }

    fn execute(
        &self,
        config: &BlitConfig,
        source: BlitSource<'_>,
        dst: u32,
        width: u32,
        height: u32,
    ) -> HalResult {
        let out_bpp = config.output.bytes_per_pixel();
        let stride = (width + config.output_offset) * out_bpp;
        let input = match config.mode {
            TransferMode::RegisterToMemory => None,
            TransferMode::MemoryToMemoryPfc => Some(config.input.ok_or(HalError::Error)?),
        };
        for row in 0..height {
            for col in 0..width {
                let argb = match (input, source) {
                    (_, BlitSource::Color(argb)) => argb,
                    (Some(input), BlitSource::Buffer(bytes)) => {
                        let bpp = input.color_mode.bytes_per_pixel();
                        let index = (row * (width + input.offset) + col) * bpp;
                        bytes
                            .get(index as usize..)
                            .and_then(|pixel| input.color_mode.decode(pixel))
                            .ok_or(HalError::Error)?
                    }
                    (Some(input), BlitSource::Address(src)) => {
                        let bpp = input.color_mode.bytes_per_pixel();
                        let index = (row * (width + input.offset) + col) * bpp;
                        let pixel = self.memory.load(src + index, bpp as usize);
                        input.color_mode.decode(&pixel).ok_or(HalError::Error)?
                    }
                    (None, _) => return Err(HalError::Error),
                };
                let argb = match input {
                    Some(input) if input.alpha_mode == AlphaMode::Replace => {
                        (argb & 0x00FF_FFFF) | (u32::from(input.alpha) << 24)
                    }
                    _ => argb,
                };
                self.store(dst + row * stride + col * out_bpp, argb, config.output);
            }
        }
        Ok(())
    }
}

impl Blitter for SimBlitter {
    fn configure(&mut self, config: &BlitConfig) -> HalResult {
        self.state.borrow_mut().config = Some(*config);
        self.log.push(Event::BlitConfigured);
        Ok(())
    }

    fn start(&mut self, source: BlitSource<'_>, dst: u32, width: u32, height: u32) -> HalResult {
        let config = {
            let state = self.state.borrow();
            if state.fail_start {
                return Err(HalError::Error);
            }
            state.config.ok_or(HalError::Error)?
        };
        self.log.push(Event::BlitStarted {
            destination: dst,
            width,
            height,
            output_offset: config.output_offset,
        });
        self.execute(&config, source, dst, width, height)?;
        let mut state = self.state.borrow_mut();
        state.pending = state.latency;
        state.transfers += 1;
        Ok(())
    }

    fn is_complete(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.stalled {
            return false;
        }
        if state.pending > 0 {
            state.pending -= 1;
            return false;
        }
        true
    }

    fn deinit(&mut self) -> HalResult {
        self.state.borrow_mut().config = None;
        self.log.push(Event::BlitterDeinit);
        Ok(())
    }
}
