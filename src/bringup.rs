//! Pipeline bring-up orchestrator.
//!
//! [`Pipeline`] owns every display peripheral and brings them up in a fixed
//! order of [`Stage`]s. The first failing stage aborts the sequence: nothing
//! is rolled back, the instance records where it stopped and refuses a new
//! attempt until [`Pipeline::deinit`] has run.
//!
//! The board specific parts of the sequence (link parameters, pixel clock,
//! compositor timing and the default layer) go through [`BringupHooks`],
//! whose default methods program the values of the [`PipelineConfig`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::blit::BlitEngine;
use crate::channel::CommandChannel;
use crate::config::PipelineConfig;
use crate::display::Display;
use crate::error::{Error, Result};
use crate::hal::{
    Blitter, ClockControl, Compositor, DsiHost, Domain, FrameMemory, InterruptControl,
    MemoryController,
};
use crate::layer::{LayerManager, PipelineContext, ReloadKind, ReloadMode, Window};
use crate::panel::PanelDriver;
use crate::PixelFormat;

/// The set of peripheral types one board provides.
pub trait Platform {
    /// Clock and reset control.
    type Clocks: ClockControl;
    /// Interrupt controller.
    type Interrupts: InterruptControl;
    /// External memory controller.
    type ExternalMemory: MemoryController;
    /// Layer compositor.
    type Compositor: Compositor;
    /// 2D blit engine.
    type Blitter: Blitter;
    /// DSI host.
    type Host: DsiHost;
    /// CPU view of the framebuffer memory.
    type Memory: FrameMemory;
    /// Panel reset line.
    type ResetPin: OutputPin;
    /// Delay provider.
    type Delay: DelayNs;
}

/// Owned peripherals of one board.
#[allow(missing_docs)]
pub struct Peripherals<P: Platform> {
    pub clocks: P::Clocks,
    pub interrupts: P::Interrupts,
    pub external_memory: P::ExternalMemory,
    pub compositor: P::Compositor,
    pub blitter: P::Blitter,
    pub host: P::Host,
    pub memory: P::Memory,
    pub reset_pin: P::ResetPin,
    pub delay: P::Delay,
}

/// Placement of the layer configured during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerSetup {
    /// Window on the screen.
    pub window: Window,
    /// Pixel format.
    pub format: PixelFormat,
    /// Framebuffer address.
    pub address: u32,
}

/// Integrator overridable steps of the bring-up sequence.
pub trait BringupHooks {
    /// Configures lanes, escape clock divider, D-PHY PLL and video timing of
    /// the command host.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the host rejects the configuration.
    fn configure_command_host<H: DsiHost>(
        &mut self,
        channel: &mut CommandChannel<H>,
        config: &PipelineConfig,
    ) -> Result<()> {
        channel.init(&config.host, &config.video())
    }

    /// Programs the pixel clock PLL.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the PLL does not lock.
    fn configure_pixel_clock<C: ClockControl>(
        &mut self,
        clocks: &mut C,
        config: &PipelineConfig,
    ) -> Result<()> {
        clocks
            .configure_pixel_clock(&config.pixel_clock)
            .map_err(Error::periph)
    }

    /// Programs the compositor synchronisation counters.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the compositor rejects them.
    fn init_compositor<C: Compositor>(
        &mut self,
        compositor: &mut C,
        config: &PipelineConfig,
    ) -> Result<()> {
        compositor
            .init(&config.compositor_timing())
            .map_err(Error::periph)
    }

    /// Layer 0 as configured at the end of the compositor stage.
    fn default_layer(&mut self, config: &PipelineConfig) -> LayerSetup {
        LayerSetup {
            window: Window::new(0, 0, config.width, config.height),
            format: config.pixel_format,
            address: config.layer0_address,
        }
    }
}

/// Hooks programming exactly the values of the [`PipelineConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl BringupHooks for DefaultHooks {}

/// Step of the bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// External memory bank disabled.
    MemoryBank,
    /// Panel hardware reset pulse.
    PanelReset,
    /// Display IP clocks and interrupts.
    PeripheralClocks,
    /// Command host link parameters.
    CommandHost,
    /// Pixel clock tree.
    PixelClock,
    /// Compositor timing, external memory and layer 0.
    Compositor,
    /// Link start and command mode policy.
    LinkStart,
    /// Panel identification and initialisation.
    PanelProbe,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 8] = [
        Stage::MemoryBank,
        Stage::PanelReset,
        Stage::PeripheralClocks,
        Stage::CommandHost,
        Stage::PixelClock,
        Stage::Compositor,
        Stage::LinkStart,
        Stage::PanelProbe,
    ];
}

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Not brought up, or torn down.
    #[default]
    Idle,
    /// Brought up successfully.
    Running,
    /// Bring-up aborted.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Its error.
        error: Error,
    },
}

/// Drawing surface of a [`Pipeline`] on platform `P`.
pub type PipelineDisplay<P> =
    Display<<P as Platform>::Compositor, <P as Platform>::Blitter, <P as Platform>::Memory>;

/// One display pipeline and the peripherals it owns.
pub struct Pipeline<P: Platform, D, H> {
    clocks: P::Clocks,
    interrupts: P::Interrupts,
    external_memory: P::ExternalMemory,
    channel: CommandChannel<P::Host>,
    display: PipelineDisplay<P>,
    reset_pin: P::ResetPin,
    delay: P::Delay,
    panel: D,
    hooks: H,
    config: PipelineConfig,
    state: State,
}

impl<P, D, H> Pipeline<P, D, H>
where
    P: Platform,
    D: PanelDriver,
    H: BringupHooks,
{
    /// Takes ownership of `peripherals`; nothing is touched until
    /// [`bring_up`](Self::bring_up).
    pub fn new(peripherals: Peripherals<P>, panel: D, hooks: H, config: PipelineConfig) -> Self {
        let layers = LayerManager::new(
            peripherals.compositor,
            PipelineContext::new(config.width, config.height, config.pixel_format),
            config.compositor_timing(),
        );
        let blit = BlitEngine::new(
            peripherals.blitter,
            config.poll_budgets,
            config.timeout_policy,
        );
        Self {
            clocks: peripherals.clocks,
            interrupts: peripherals.interrupts,
            external_memory: peripherals.external_memory,
            channel: CommandChannel::new(peripherals.host, config.virtual_channel),
            display: Display::new(layers, blit, peripherals.memory),
            reset_pin: peripherals.reset_pin,
            delay: peripherals.delay,
            panel,
            hooks,
            config,
            state: State::Idle,
        }
    }

    /// Runs the bring-up sequence.
    ///
    /// On success the reload mode is [`ReloadMode::Immediate`] and the state
    /// [`State::Running`]. On failure the state is [`State::Failed`] and the
    /// hardware is left where the failing stage stopped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless the pipeline is [`State::Idle`],
    /// otherwise the error of the failing stage.
    pub fn bring_up(&mut self) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::InvalidState);
        }
        for stage in Stage::ALL {
            debug!("bring-up stage {:?}", stage);
            if let Err(error) = self.run(stage) {
                error!("bring-up failed in stage {:?}: {:?}", stage, error);
                self.state = State::Failed { stage, error };
                return Err(error);
            }
        }
        self.display.layers_mut().context_mut().reload_mode = ReloadMode::Immediate;
        self.state = State::Running;
        info!("display pipeline running");
        Ok(())
    }

    fn run(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::MemoryBank => {
                self.external_memory.disable_bank();
                Ok(())
            }
            Stage::PanelReset => self.reset_panel(),
            Stage::PeripheralClocks => {
                self.enable_peripherals();
                Ok(())
            }
            Stage::CommandHost => self
                .hooks
                .configure_command_host(&mut self.channel, &self.config),
            Stage::PixelClock => self
                .hooks
                .configure_pixel_clock(&mut self.clocks, &self.config),
            Stage::Compositor => self.init_compositor(),
            Stage::LinkStart => {
                self.channel.start()?;
                self.channel.configure_command_mode(
                    self.config.low_power_commands,
                    self.config.flow_control,
                )
            }
            Stage::PanelProbe => self.probe_panel(),
        }
    }

    fn reset_panel(&mut self) -> Result<()> {
        self.reset_pin.set_low().map_err(|_| Error::PeriphFailure)?;
        self.delay.delay_ms(self.config.reset_low_ms);
        self.reset_pin.set_high().map_err(|_| Error::PeriphFailure)?;
        self.delay.delay_ms(self.config.reset_settle_ms);
        Ok(())
    }

    fn enable_peripherals(&mut self) {
        for domain in Domain::ALL {
            self.clocks.enable_clock(domain);
            self.clocks.assert_reset(domain);
            self.clocks.release_reset(domain);
        }
        for domain in Domain::ALL {
            self.interrupts.set_priority(
                domain.irq(),
                self.config.irq_preempt_priority,
                self.config.irq_sub_priority,
            );
            self.interrupts.enable(domain.irq());
        }
        self.display.layers_mut().context_mut().callbacks_valid = true;
    }

    fn init_compositor(&mut self) -> Result<()> {
        self.hooks
            .init_compositor(self.display.compositor_mut(), &self.config)?;
        self.external_memory.init().map_err(Error::periph)?;
        let setup = self.hooks.default_layer(&self.config);
        self.display
            .configure_layer(0, setup.window, setup.format, setup.address)?;
        self.display.layers_mut().commit(ReloadKind::Immediate)
    }

    fn probe_panel(&mut self) -> Result<()> {
        let id = self.panel.read_id(&mut self.channel)?;
        if id != self.config.panel_id {
            warn!(
                "panel answered id {:#x}, expected {:#x}",
                id,
                self.config.panel_id
            );
            return Err(Error::UnknownComponent);
        }
        self.panel
            .init(
                &mut self.channel,
                &mut self.delay,
                self.config.pixel_format,
                self.config.orientation,
            )
            .map_err(|_| Error::ComponentFailure)?;
        if let Some(pitch) = self.config.line_pitch {
            self.channel.set_wrapper_enabled(false)?;
            self.display.layers_mut().set_pitch(0, pitch)?;
            self.display.layers_mut().commit(ReloadKind::Immediate)?;
            self.channel.set_wrapper_enabled(true)?;
        }
        let last_column = last_index(self.config.width)?;
        let last_page = last_index(self.config.height)?;
        self.panel
            .set_column_address(&mut self.channel, 0, last_column)?;
        self.panel.set_page_address(&mut self.channel, 0, last_page)?;
        if let Some(line) = self.config.tear_scan_line {
            self.panel.set_tear_scanline(&mut self.channel, line)?;
        }
        self.panel.display_on(&mut self.channel)
    }

    /// Tears the pipeline down and returns it to [`State::Idle`], from any
    /// state.
    ///
    /// Shuts down the command host, compositor and blitter, masks the display
    /// interrupts, holds and gates the three clock domains, shuts the external
    /// memory down and resets the layer state.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if a block refuses to shut down; the remaining
    /// steps are skipped and the state is unchanged.
    pub fn deinit(&mut self) -> Result<()> {
        self.channel.deinit()?;
        self.display
            .compositor_mut()
            .deinit()
            .map_err(Error::periph)?;
        self.display.blit_mut().deinit()?;
        for domain in Domain::ALL {
            self.interrupts.disable(domain.irq());
            self.clocks.assert_reset(domain);
            self.clocks.disable_clock(domain);
        }
        self.external_memory.deinit().map_err(Error::periph)?;
        self.display.layers_mut().reset();
        self.state = State::Idle;
        info!("display pipeline shut down");
        Ok(())
    }

    /// Turns the panel on.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the panel does not accept the command.
    pub fn display_on(&mut self) -> Result<()> {
        self.panel
            .display_on(&mut self.channel)
            .map_err(|_| Error::PeriphFailure)
    }

    /// Turns the panel off.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the panel does not accept the command.
    pub fn display_off(&mut self) -> Result<()> {
        self.panel
            .display_off(&mut self.channel)
            .map_err(|_| Error::PeriphFailure)
    }

    /// Sets the panel backlight to `percent`.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the panel does not accept the value.
    pub fn set_brightness(&mut self, percent: u8) -> Result<()> {
        self.panel
            .set_brightness(&mut self.channel, percent)
            .map_err(|_| Error::PeriphFailure)
    }

    /// Last backlight level set, in percent.
    pub fn brightness(&self) -> u8 {
        self.panel.brightness()
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> State {
        self.state
    }

    /// Returns `true` once bring-up has succeeded.
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Configuration the pipeline was built with.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drawing surface.
    pub const fn display(&self) -> &PipelineDisplay<P> {
        &self.display
    }

    /// Exclusive access to the drawing surface.
    pub fn display_mut(&mut self) -> &mut PipelineDisplay<P> {
        &mut self.display
    }

    /// Command channel to the panel.
    pub const fn channel(&self) -> &CommandChannel<P::Host> {
        &self.channel
    }

    /// Exclusive access to the command channel.
    pub fn channel_mut(&mut self) -> &mut CommandChannel<P::Host> {
        &mut self.channel
    }

    /// Panel driver.
    pub const fn panel(&self) -> &D {
        &self.panel
    }
}

fn last_index(extent: u32) -> Result<u16> {
    extent
        .checked_sub(1)
        .and_then(|last| u16::try_from(last).ok())
        .ok_or(Error::WrongParam)
}
