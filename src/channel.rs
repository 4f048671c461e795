//! Command channel to the panel controller.
//!
//! Panel commands travel as MIPI DCS packets over the command host. A write
//! of at most one byte goes out as a short packet, anything longer as a long
//! packet; reads are short read requests answered by the controller.
//!
//! The short-write byte is `payload[length]`: a zero-length write sends
//! `payload[0]` and a one-byte write sends `payload[1]`. Panel drivers built
//! for this channel rely on that selection, so it is kept exactly; an index
//! past the end of `payload` is reported as [`Error::WrongParam`].
//!
//! ```rust
//! use dsi_pipeline::channel::{encode_write, Transaction};
//!
//! let tx = encode_write(0, 0x29, &[0x00], 0).unwrap();
//! assert_eq!(tx, Transaction::ShortWrite { channel: 0, register: 0x29, parameter: 0x00 });
//!
//! let tx = encode_write(0, 0x2A, &[0x00, 0x00, 0x03, 0x1F], 4).unwrap();
//! assert!(matches!(
//!     tx,
//!     Transaction::LongWrite { register: 0x2A, payload, .. } if payload.len() == 4
//! ));
//! ```

use crate::config::{DsiHostConfig, DsiVideoConfig};
use crate::error::{Error, Result};
use crate::hal::{DsiHost, FlowControl, PacketType};
use crate::regs::LowPowerCommands;

/// One command channel transaction, as it goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction<'a> {
    /// Short write with a single parameter byte.
    ShortWrite {
        /// Virtual channel.
        channel: u8,
        /// Command register.
        register: u16,
        /// Parameter byte.
        parameter: u8,
    },
    /// Long write with an arbitrary payload.
    LongWrite {
        /// Virtual channel.
        channel: u8,
        /// Command register.
        register: u16,
        /// Payload following the register.
        payload: &'a [u8],
    },
    /// Read request expecting `length` bytes.
    ShortRead {
        /// Virtual channel.
        channel: u8,
        /// Command register.
        register: u16,
        /// Number of bytes expected back.
        length: usize,
    },
}

/// Selects the wire encoding of a write of `length` bytes.
///
/// # Errors
///
/// [`Error::WrongParam`] if the selected bytes lie outside `payload`.
pub fn encode_write(
    channel: u8,
    register: u16,
    payload: &[u8],
    length: usize,
) -> Result<Transaction<'_>> {
    if length <= 1 {
        let parameter = *payload.get(length).ok_or(Error::WrongParam)?;
        Ok(Transaction::ShortWrite {
            channel,
            register,
            parameter,
        })
    } else {
        let payload = payload.get(..length).ok_or(Error::WrongParam)?;
        Ok(Transaction::LongWrite {
            channel,
            register,
            payload,
        })
    }
}

/// Builds the read request for `length` bytes of `register`.
#[must_use]
pub const fn encode_read(channel: u8, register: u16, length: usize) -> Transaction<'static> {
    Transaction::ShortRead {
        channel,
        register,
        length,
    }
}

/// Register level access to a panel controller.
///
/// Panel drivers are written against this trait only, so they work over any
/// transport that keeps the short/long write selection of
/// [`encode_write`].
pub trait PanelBus {
    /// Writes `length` bytes of `payload` to `register`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] for a malformed payload, [`Error::BusFailure`]
    /// when the transport fails.
    fn write_register(&mut self, register: u16, payload: &[u8], length: usize) -> Result<()>;

    /// Reads `length` bytes of `register` into `buffer`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if `buffer` is shorter than `length`,
    /// [`Error::BusFailure`] when the transport fails.
    fn read_register(&mut self, register: u16, buffer: &mut [u8], length: usize) -> Result<()>;
}

/// Command channel over a DSI host.
///
/// Besides panel transactions the channel owns the link setup the bring-up
/// sequence needs: host and video configuration, start/stop and the command
/// mode policy. Link setup failures are [`Error::PeriphFailure`], transaction
/// failures [`Error::BusFailure`].
#[derive(Debug)]
pub struct CommandChannel<H> {
    host: H,
    virtual_channel: u8,
}

impl<H: DsiHost> CommandChannel<H> {
    /// Wraps `host`; [`PanelBus`] traffic goes to `virtual_channel`.
    pub const fn new(host: H, virtual_channel: u8) -> Self {
        Self {
            host,
            virtual_channel,
        }
    }

    /// Virtual channel used for [`PanelBus`] traffic.
    pub const fn virtual_channel(&self) -> u8 {
        self.virtual_channel
    }

    /// Shared access to the host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Exclusive access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Releases the host.
    pub fn release(self) -> H {
        self.host
    }

    /// Writes `length` bytes of `payload` to `register` on `channel`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the selected bytes lie outside `payload`,
    /// [`Error::BusFailure`] if the host reports a failure.
    pub fn write(
        &mut self,
        channel: u8,
        register: u16,
        payload: &[u8],
        length: usize,
    ) -> Result<()> {
        let transaction = encode_write(channel, register, payload, length)?;
        self.transfer(transaction, &mut [])
    }

    /// Reads `length` bytes of `register` on `channel` into `buffer`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if `buffer` is shorter than `length`,
    /// [`Error::BusFailure`] if the host reports a failure.
    pub fn read(
        &mut self,
        channel: u8,
        register: u16,
        buffer: &mut [u8],
        length: usize,
    ) -> Result<()> {
        self.transfer(encode_read(channel, register, length), buffer)
    }

    /// Puts `transaction` on the wire; a read lands in the front of `buffer`.
    fn transfer(&mut self, transaction: Transaction<'_>, buffer: &mut [u8]) -> Result<()> {
        match transaction {
            Transaction::ShortWrite {
                channel,
                register,
                parameter,
            } => {
                trace!(
                    "dcs short write ch {} reg {:#x} param {:#x}",
                    channel,
                    register,
                    parameter
                );
                self.host
                    .short_write(channel, PacketType::ShortWriteP1, register, parameter)
                    .map_err(Error::bus)
            }
            Transaction::LongWrite {
                channel,
                register,
                payload,
            } => {
                trace!(
                    "dcs long write ch {} reg {:#x} len {}",
                    channel,
                    register,
                    payload.len()
                );
                self.host
                    .long_write(channel, PacketType::LongWrite, register, payload)
                    .map_err(Error::bus)
            }
            Transaction::ShortRead {
                channel,
                register,
                length,
            } => {
                let buffer = buffer.get_mut(..length).ok_or(Error::WrongParam)?;
                trace!("dcs read ch {} reg {:#x} len {}", channel, register, length);
                self.host
                    .read(channel, PacketType::ShortRead, register, buffer)
                    .map_err(Error::bus)
            }
        }
    }

    /// Configures lanes, escape clock and D-PHY PLL, then the video timing.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host rejects either step.
    pub fn init(&mut self, host: &DsiHostConfig, video: &DsiVideoConfig) -> Result<()> {
        self.host.init(host).map_err(Error::periph)?;
        self.host.configure_video(video).map_err(Error::periph)
    }

    /// Starts the link.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host refuses.
    pub fn start(&mut self) -> Result<()> {
        self.host.start().map_err(Error::periph)
    }

    /// Stops the link.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host refuses.
    pub fn stop(&mut self) -> Result<()> {
        self.host.stop().map_err(Error::periph)
    }

    /// Shuts the host down.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host refuses.
    pub fn deinit(&mut self) -> Result<()> {
        self.host.deinit().map_err(Error::periph)
    }

    /// Applies the command mode policy that must be in place before the
    /// first panel command: low-power selection per packet class, flow
    /// control and forced RX low power.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host rejects any step.
    pub fn configure_command_mode(
        &mut self,
        commands: LowPowerCommands,
        flow: FlowControl,
    ) -> Result<()> {
        self.host
            .configure_command_mode(commands)
            .map_err(Error::periph)?;
        self.host.configure_flow_control(flow).map_err(Error::periph)?;
        self.host.force_rx_low_power(true).map_err(Error::periph)
    }

    /// Enables or disables the video wrapper.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host refuses.
    pub fn set_wrapper_enabled(&mut self, enable: bool) -> Result<()> {
        self.host.set_wrapper_enabled(enable).map_err(Error::periph)
    }
}

impl<H: DsiHost> PanelBus for CommandChannel<H> {
    fn write_register(&mut self, register: u16, payload: &[u8], length: usize) -> Result<()> {
        self.write(self.virtual_channel, register, payload, length)
    }

    fn read_register(&mut self, register: u16, buffer: &mut [u8], length: usize) -> Result<()> {
        self.read(self.virtual_channel, register, buffer, length)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;

    use super::*;
    use crate::sim::{Event, EventLog, SimDsiHost};

    fn channel() -> (CommandChannel<SimDsiHost>, EventLog) {
        let log = EventLog::new();
        let host = SimDsiHost::new(&log);
        (CommandChannel::new(host, 0), log)
    }

    #[test]
    fn test_zero_length_is_short_write_of_first_byte() {
        let (mut ch, log) = channel();
        ch.write(0, 0x29, &[0xAB, 0xCD], 0).unwrap();
        assert_eq!(
            log.events(),
            vec![Event::ShortWrite {
                channel: 0,
                packet: PacketType::ShortWriteP1,
                register: 0x29,
                parameter: 0xAB,
            }]
        );
    }

    #[test]
    fn test_one_byte_is_short_write_of_second_byte() {
        let (mut ch, log) = channel();
        ch.write(0, 0x3A, &[0x11, 0x77], 1).unwrap();
        assert_eq!(
            log.events(),
            vec![Event::ShortWrite {
                channel: 0,
                packet: PacketType::ShortWriteP1,
                register: 0x3A,
                parameter: 0x77,
            }]
        );
    }

    #[test]
    fn test_one_byte_without_second_byte_is_rejected() {
        let (mut ch, log) = channel();
        assert_eq!(ch.write(0, 0x3A, &[0x77], 1), Err(Error::WrongParam));
        assert_eq!(ch.write(0, 0x29, &[], 0), Err(Error::WrongParam));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_long_write_keeps_register_and_payload() {
        let (mut ch, log) = channel();
        ch.write(1, 0x2B, &[0x00, 0x00, 0x01, 0xDF, 0xEE], 4).unwrap();
        assert_eq!(
            log.events(),
            vec![Event::LongWrite {
                channel: 1,
                register: 0x2B,
                payload: vec![0x00, 0x00, 0x01, 0xDF],
            }]
        );
        ch.write(1, 0x44, &[0x02, 0x15], 2).unwrap();
        assert_eq!(
            log.events()[1],
            Event::LongWrite {
                channel: 1,
                register: 0x44,
                payload: vec![0x02, 0x15],
            }
        );
    }

    #[test]
    fn test_long_write_past_payload_is_rejected() {
        let (mut ch, log) = channel();
        assert_eq!(ch.write(0, 0x2A, &[1, 2, 3], 4), Err(Error::WrongParam));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_transport_failure_is_bus_failure() {
        let (mut ch, _log) = channel();
        ch.host().set_fail_writes(true);
        assert_eq!(ch.write(0, 0x29, &[0], 0), Err(Error::BusFailure));
        assert_eq!(ch.write(0, 0x2A, &[0, 0, 3, 0x1F], 4), Err(Error::BusFailure));
        ch.host().set_fail_writes(false);
        ch.host().set_fail_reads(true);
        let mut id = [0u8; 1];
        assert_eq!(ch.read(0, 0xDA, &mut id, 1), Err(Error::BusFailure));
    }

    #[test]
    fn test_read_fills_buffer() {
        let (mut ch, log) = channel();
        ch.host().set_panel_id(0x40);
        let mut id = [0u8; 2];
        ch.read(0, 0xDA, &mut id, 1).unwrap();
        assert_eq!(id[0], 0x40);
        assert_eq!(
            log.events(),
            vec![Event::Read {
                channel: 0,
                register: 0xDA,
                length: 1,
            }]
        );
        assert_eq!(ch.read(0, 0xDA, &mut id, 3), Err(Error::WrongParam));
    }

    #[test]
    fn test_read_request_encoding() {
        assert_eq!(
            encode_read(1, 0xDA, 1),
            Transaction::ShortRead {
                channel: 1,
                register: 0xDA,
                length: 1,
            }
        );
        let (mut ch, log) = channel();
        ch.host().set_fail_reads(true);
        assert_eq!(ch.read(0, 0xDA, &mut [0u8; 1], 1), Err(Error::BusFailure));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_panel_bus_uses_virtual_channel() {
        let log = EventLog::new();
        let mut ch = CommandChannel::new(SimDsiHost::new(&log), 2);
        ch.write_register(0x51, &[0x80], 0).unwrap();
        assert_eq!(
            log.events(),
            vec![Event::ShortWrite {
                channel: 2,
                packet: PacketType::ShortWriteP1,
                register: 0x51,
                parameter: 0x80,
            }]
        );
    }

    #[test]
    fn test_command_mode_policy_order() {
        let (mut ch, log) = channel();
        ch.configure_command_mode(LowPowerCommands::high_speed(), FlowControl::BusTurnAround)
            .unwrap();
        assert_eq!(
            log.events(),
            vec![
                Event::CommandMode(LowPowerCommands::high_speed()),
                Event::FlowControl(FlowControl::BusTurnAround),
                Event::ForceRxLowPower(true),
            ]
        );
    }

    #[test]
    fn test_link_setup_failure_is_periph_failure() {
        let (mut ch, _log) = channel();
        ch.host().set_fail_init(true);
        let config = crate::config::PipelineConfig::default();
        assert_eq!(ch.init(&config.host, &config.video()), Err(Error::PeriphFailure));
    }
}
