use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use super::{Event, EventLog};
use crate::config::{DsiHostConfig, DsiVideoConfig};
use crate::hal::{DsiHost, FlowControl, HalError, HalResult, PacketType};
use crate::panel::dcs;
use crate::regs::LowPowerCommands;

#[derive(Debug)]
struct State {
    panel_id: u8,
    registers: BTreeMap<u16, Vec<u8>>,
    host: Option<DsiHostConfig>,
    video: Option<DsiVideoConfig>,
    running: bool,
    wrapper: bool,
    fail_init: bool,
    fail_start: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_register: Option<u16>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            panel_id: 0x40,
            registers: BTreeMap::new(),
            host: None,
            video: None,
            running: false,
            wrapper: true,
            fail_init: false,
            fail_start: false,
            fail_reads: false,
            fail_writes: false,
            fail_register: None,
        }
    }
}

impl State {
    fn rejects(&self, register: u16) -> bool {
        self.fail_register == Some(register)
    }
}

/// DSI host with a panel model behind it.
///
/// The panel keeps the last value written to every register, answers the
/// identification register with its id and any other read with the stored
/// value, zero padded.
#[derive(Debug, Clone)]
pub struct SimDsiHost {
    log: EventLog,
    state: Rc<RefCell<State>>,
}

impl SimDsiHost {
    /// Host recording into `log`, with a panel answering id `0x40`.
    #[must_use]
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            state: Rc::default(),
        }
    }

    /// Changes the id the panel answers with.
    pub fn set_panel_id(&self, id: u8) {
        self.state.borrow_mut().panel_id = id;
    }

    /// Makes `init` and `configure_video` fail.
    pub fn set_fail_init(&self, fail: bool) {
        self.state.borrow_mut().fail_init = fail;
    }

    /// Makes `start` fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.state.borrow_mut().fail_start = fail;
    }

    /// Makes every read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    /// Makes every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// Makes every access to `register` fail.
    pub fn set_fail_register(&self, register: Option<u16>) {
        self.state.borrow_mut().fail_register = register;
    }

    /// Last value written to `register`.
    #[must_use]
    pub fn register(&self, register: u16) -> Option<Vec<u8>> {
        self.state.borrow().registers.get(&register).cloned()
    }

    /// Video timing programmed by the last `configure_video`.
    #[must_use]
    pub fn video(&self) -> Option<DsiVideoConfig> {
        self.state.borrow().video
    }

    /// Returns `true` while the link is started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Returns `true` while the video wrapper is enabled.
    #[must_use]
    pub fn wrapper_enabled(&self) -> bool {
        self.state.borrow().wrapper
    }

    fn write(&self, register: u16, payload: &[u8], event: Event) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_writes || state.rejects(register) {
            return Err(HalError::Error);
        }
        state.registers.insert(register, payload.to_vec());
        self.log.push(event);
        Ok(())
    }
}

impl DsiHost for SimDsiHost {
    fn init(&mut self, config: &DsiHostConfig) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(HalError::Error);
        }
        state.host = Some(*config);
        self.log.push(Event::HostInit);
        Ok(())
    }

    fn configure_video(&mut self, config: &DsiVideoConfig) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(HalError::Error);
        }
        state.video = Some(*config);
        self.log.push(Event::VideoConfigured);
        Ok(())
    }

    fn start(&mut self) -> HalResult {
        let mut state = self.state.borrow_mut();
        if state.fail_start {
            return Err(HalError::Error);
        }
        state.running = true;
        self.log.push(Event::LinkStarted);
        Ok(())
    }

    fn stop(&mut self) -> HalResult {
        self.state.borrow_mut().running = false;
        self.log.push(Event::LinkStopped);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult {
        let mut state = self.state.borrow_mut();
        state.running = false;
        state.host = None;
        state.video = None;
        self.log.push(Event::HostDeinit);
        Ok(())
    }

    fn configure_command_mode(&mut self, commands: LowPowerCommands) -> HalResult {
        self.log.push(Event::CommandMode(commands));
        Ok(())
    }

    fn configure_flow_control(&mut self, flow: FlowControl) -> HalResult {
        self.log.push(Event::FlowControl(flow));
        Ok(())
    }

    fn force_rx_low_power(&mut self, enable: bool) -> HalResult {
        self.log.push(Event::ForceRxLowPower(enable));
        Ok(())
    }

    fn set_wrapper_enabled(&mut self, enable: bool) -> HalResult {
        self.state.borrow_mut().wrapper = enable;
        self.log.push(Event::Wrapper(enable));
        Ok(())
    }

    fn short_write(
        &mut self,
        channel: u8,
        packet: PacketType,
        register: u16,
        parameter: u8,
    ) -> HalResult {
        self.write(
            register,
            &[parameter],
            Event::ShortWrite {
                channel,
                packet,
                register,
                parameter,
            },
        )
    }

    fn long_write(
        &mut self,
        channel: u8,
        _packet: PacketType,
        register: u16,
        payload: &[u8],
    ) -> HalResult {
        self.write(
            register,
            payload,
            Event::LongWrite {
                channel,
                register,
                payload: payload.to_vec(),
            },
        )
    }

    fn read(
        &mut self,
        channel: u8,
        _packet: PacketType,
        register: u16,
        buffer: &mut [u8],
    ) -> HalResult {
        let state = self.state.borrow();
        if state.fail_reads || state.rejects(register) {
            return Err(HalError::Error);
        }
        buffer.fill(0);
        if register == dcs::RDID1 {
            if let Some(first) = buffer.first_mut() {
                *first = state.panel_id;
            }
        } else if let Some(value) = state.registers.get(&register) {
            for (dst, src) in buffer.iter_mut().zip(value) {
                *dst = *src;
            }
        }
        self.log.push(Event::Read {
            channel,
            register,
            length: buffer.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_back_written_register() {
        let log = EventLog::new();
        let mut host = SimDsiHost::new(&log);
        host.long_write(0, PacketType::LongWrite, 0x2A, &[0, 0, 3, 0x1F])
            .unwrap();
        let mut buffer = [0xAA; 6];
        host.read(0, PacketType::ShortRead, 0x2A, &mut buffer).unwrap();
        assert_eq!(buffer, [0, 0, 3, 0x1F, 0, 0]);
        assert_eq!(host.register(0x2A).unwrap(), [0, 0, 3, 0x1F]);
    }

    #[test]
    fn test_failing_register() {
        let log = EventLog::new();
        let mut host = SimDsiHost::new(&log);
        host.set_fail_register(Some(0x29));
        assert_eq!(
            host.short_write(0, PacketType::ShortWriteP1, 0x29, 0),
            Err(HalError::Error)
        );
        assert!(host.short_write(0, PacketType::ShortWriteP1, 0x28, 0).is_ok());
        assert_eq!(log.events().len(), 1);
    }

    #[test]
    fn test_link_state() {
        let log = EventLog::new();
        let mut host = SimDsiHost::new(&log);
        host.start().unwrap();
        assert!(host.is_running());
        host.set_wrapper_enabled(false).unwrap();
        assert!(!host.wrapper_enabled());
        host.deinit().unwrap();
        assert!(!host.is_running());
    }
}
