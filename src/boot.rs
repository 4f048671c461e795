//! Dual-core boot handshake.
//!
//! The secondary core parks itself in stop mode at reset and waits on a
//! hardware semaphore. The primary core first confirms it is parked, brings
//! the shared resources up, then takes and immediately releases the
//! semaphore: that release is the notification the secondary core wakes on.
//! Both waits sample the secondary core's clock-ready flag with the bounded
//! spin of [`poll::spin_while`](crate::poll::spin_while).

use crate::bringup::{BringupHooks, Pipeline, Platform};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::hal::{CoreReadyFlag, HwSemaphore};
use crate::panel::PanelDriver;
use crate::poll::{spin_until, spin_while};

/// Semaphore the secondary core waits on.
pub const HANDSHAKE_SEMAPHORE: u8 = 0;

/// Process id used for the release.
pub const HANDSHAKE_PROCESS: u8 = 0;

/// Progress of the one-shot handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootHandshake {
    /// Waiting for the display pipeline.
    #[default]
    Disarmed,
    /// The pipeline is running; the secondary core may be released.
    Armed,
    /// The notification has been sent.
    Consumed,
}

/// Primary-core side of the handshake.
#[derive(Debug)]
pub struct BootSequencer<S, F> {
    semaphore: S,
    flag: F,
    ceiling: u32,
    state: BootHandshake,
}

impl<S: HwSemaphore, F: CoreReadyFlag> BootSequencer<S, F> {
    /// Sequencer whose waits give up after `ceiling` decrements.
    pub const fn new(semaphore: S, flag: F, ceiling: u32) -> Self {
        Self {
            semaphore,
            flag,
            ceiling,
            state: BootHandshake::Disarmed,
        }
    }

    /// Sequencer using the [`boot_ceiling`](PipelineConfig::boot_ceiling)
    /// of `config`.
    pub const fn from_config(semaphore: S, flag: F, config: &PipelineConfig) -> Self {
        Self::new(semaphore, flag, config.boot_ceiling)
    }

    /// Iteration ceiling of both waits.
    pub const fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Current handshake state.
    pub const fn state(&self) -> BootHandshake {
        self.state
    }

    /// Shared access to the ready flag.
    pub const fn flag(&self) -> &F {
        &self.flag
    }

    /// Shared access to the semaphore.
    pub const fn semaphore(&self) -> &S {
        &self.semaphore
    }

    /// Waits until the secondary core has entered stop mode.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if the ready flag is still set after the ceiling.
    pub fn wait_secondary_stopped(&self) -> Result<()> {
        spin_while(self.ceiling, || self.flag.is_set())
            .map(|_| ())
            .inspect_err(|_| warn!("secondary core did not enter stop mode"))
    }

    /// Arms the handshake once `pipeline` is running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the pipeline is not running or the
    /// handshake is not [`BootHandshake::Disarmed`].
    pub fn arm<P, D, H>(&mut self, pipeline: &Pipeline<P, D, H>) -> Result<()>
    where
        P: Platform,
        D: PanelDriver,
        H: BringupHooks,
    {
        if !pipeline.is_running() || self.state != BootHandshake::Disarmed {
            return Err(Error::InvalidState);
        }
        self.state = BootHandshake::Armed;
        Ok(())
    }

    /// Sends the notification and waits for the secondary core to resume.
    ///
    /// The handshake is consumed once the semaphore has been released, even
    /// if the wait afterwards times out.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless armed, [`Error::PeriphFailure`] if the
    /// semaphore is held elsewhere, [`Error::Timeout`] if the ready flag is
    /// still clear after the ceiling.
    pub fn release_secondary(&mut self) -> Result<()> {
        if self.state != BootHandshake::Armed {
            return Err(Error::InvalidState);
        }
        self.semaphore.enable_clock();
        if !self.semaphore.fast_take(HANDSHAKE_SEMAPHORE) {
            error!("handshake semaphore {} is held", HANDSHAKE_SEMAPHORE);
            return Err(Error::PeriphFailure);
        }
        self.semaphore.release(HANDSHAKE_SEMAPHORE, HANDSHAKE_PROCESS);
        self.state = BootHandshake::Consumed;
        debug!("secondary core notified");
        spin_until(self.ceiling, || self.flag.is_set())
            .map(|_| ())
            .inspect_err(|_| warn!("secondary core did not resume"))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;

    use super::*;
    use crate::bringup::DefaultHooks;
    use crate::config::PipelineConfig;
    use crate::panel::DcsPanel;
    use crate::sim::{Event, EventLog, SimBoard, SimCoreFlag, SimPlatform, SimSemaphore};

    fn sequencer(
        flag: &SimCoreFlag,
        ceiling: u32,
    ) -> (BootSequencer<SimSemaphore, SimCoreFlag>, EventLog) {
        let log = EventLog::new();
        (
            BootSequencer::new(SimSemaphore::new(&log), flag.clone(), ceiling),
            log,
        )
    }

    fn running_pipeline() -> Pipeline<SimPlatform, DcsPanel, DefaultHooks> {
        let config = PipelineConfig::default();
        let board = SimBoard::new(&config);
        let mut pipeline =
            Pipeline::new(board.peripherals(), DcsPanel::default(), DefaultHooks, config);
        pipeline.bring_up().unwrap();
        pipeline
    }

    #[test]
    fn test_wait_stopped_times_out_after_ceiling() {
        let flag = SimCoreFlag::new(true);
        let (boot, _log) = sequencer(&flag, 100);
        assert_eq!(boot.wait_secondary_stopped(), Err(Error::Timeout));
        // one initial sample plus one per decrement
        assert_eq!(flag.samples(), 101);
    }

    #[test]
    fn test_wait_stopped_succeeds_on_last_sample() {
        let flag = SimCoreFlag::new(true);
        flag.toggle_after(100);
        let (boot, _log) = sequencer(&flag, 100);
        assert_eq!(boot.wait_secondary_stopped(), Ok(()));
        assert_eq!(flag.samples(), 101);
    }

    #[test]
    fn test_ceiling_from_config() {
        let log = EventLog::new();
        let config = PipelineConfig {
            boot_ceiling: 7,
            ..PipelineConfig::default()
        };
        let flag = SimCoreFlag::new(true);
        let boot = BootSequencer::from_config(SimSemaphore::new(&log), flag.clone(), &config);
        assert_eq!(boot.ceiling(), 7);
        assert_eq!(boot.wait_secondary_stopped(), Err(Error::Timeout));
        assert_eq!(flag.samples(), 8);

        let boot = BootSequencer::from_config(
            SimSemaphore::new(&log),
            SimCoreFlag::new(false),
            &PipelineConfig::default(),
        );
        assert_eq!(boot.ceiling(), 0xFFFF);
    }

    #[test]
    fn test_wait_stopped_immediate() {
        let flag = SimCoreFlag::new(false);
        let (boot, _log) = sequencer(&flag, 0xFFFF);
        assert_eq!(boot.wait_secondary_stopped(), Ok(()));
        assert_eq!(flag.samples(), 1);
    }

    #[test]
    fn test_arm_requires_running_pipeline() {
        let flag = SimCoreFlag::new(false);
        let (mut boot, _log) = sequencer(&flag, 10);
        let config = PipelineConfig::default();
        let board = SimBoard::new(&config);
        let idle =
            Pipeline::new(board.peripherals(), DcsPanel::default(), DefaultHooks, config);
        assert_eq!(boot.arm(&idle), Err(Error::InvalidState));
        assert_eq!(boot.state(), BootHandshake::Disarmed);
        assert_eq!(boot.release_secondary(), Err(Error::InvalidState));

        let pipeline = running_pipeline();
        boot.arm(&pipeline).unwrap();
        assert_eq!(boot.state(), BootHandshake::Armed);
        assert_eq!(boot.arm(&pipeline), Err(Error::InvalidState));
    }

    #[test]
    fn test_release_is_take_then_release() {
        let flag = SimCoreFlag::new(false);
        flag.toggle_after(3);
        let (mut boot, log) = sequencer(&flag, 10);
        boot.arm(&running_pipeline()).unwrap();
        boot.release_secondary().unwrap();
        assert_eq!(
            log.events(),
            vec![
                Event::SemaphoreClock,
                Event::SemaphoreTaken(HANDSHAKE_SEMAPHORE),
                Event::SemaphoreReleased(HANDSHAKE_SEMAPHORE, HANDSHAKE_PROCESS),
            ]
        );
        assert_eq!(boot.state(), BootHandshake::Consumed);
        assert_eq!(flag.samples(), 4);
    }

    #[test]
    fn test_release_is_one_shot() {
        let flag = SimCoreFlag::new(false);
        let (mut boot, _log) = sequencer(&flag, 5);
        boot.arm(&running_pipeline()).unwrap();
        // the secondary core never resumes
        assert_eq!(boot.release_secondary(), Err(Error::Timeout));
        assert_eq!(flag.samples(), 6);
        assert_eq!(boot.state(), BootHandshake::Consumed);
        assert_eq!(boot.release_secondary(), Err(Error::InvalidState));
        assert_eq!(boot.arm(&running_pipeline()), Err(Error::InvalidState));
    }

    #[test]
    fn test_held_semaphore_keeps_handshake_armed() {
        let flag = SimCoreFlag::new(false);
        let (mut boot, log) = sequencer(&flag, 5);
        boot.semaphore().set_held(true);
        boot.arm(&running_pipeline()).unwrap();
        assert_eq!(boot.release_secondary(), Err(Error::PeriphFailure));
        assert_eq!(boot.state(), BootHandshake::Armed);
        assert!(!log.contains(&Event::SemaphoreReleased(0, 0)));
        assert_eq!(flag.samples(), 0);
    }
}
