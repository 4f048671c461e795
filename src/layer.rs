//! Layer and reload manager.
//!
//! [`LayerManager`] caches the configuration of every compositor layer,
//! encodes it into shadow registers and decides, from the current
//! [`ReloadMode`], when the shadow set is committed to the active registers.

use crate::config::CompositorTiming;
use crate::error::{Error, Result};
use crate::hal::{Compositor, FrameMemory};
use crate::regs::{
    BlendingFactors, ColorKey, LayerControl, LayerRegisters, LineLength, WindowPosition,
};
use crate::{PixelFormat, LAYER_COUNT};

/// When layer mutations reach the active registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReloadMode {
    /// Mutations stay in the shadow registers until
    /// [`LayerManager::reload`].
    #[default]
    None,
    /// Every mutation is committed as it happens.
    Immediate,
    /// Every mutation arms a reload at the next vertical blanking period.
    VerticalBlanking,
}

/// Kind of shadow register reload requested from the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReloadKind {
    /// Copy the shadow set now.
    Immediate,
    /// Copy the shadow set at the next vertical blanking period.
    VerticalBlanking,
}

/// Layer window in pixels; `x1` and `y1` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Window {
    /// Left edge.
    pub x0: u32,
    /// Top edge.
    pub y0: u32,
    /// Right edge, exclusive.
    pub x1: u32,
    /// Bottom edge, exclusive.
    pub y1: u32,
}

impl Window {
    /// Window spanning `x0..x1` × `y0..y1`.
    #[must_use]
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Window of `width` × `height` pixels at (`x`, `y`), or `None` if an
    /// edge lies beyond `u32::MAX`.
    #[must_use]
    pub const fn from_size(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        match (x.checked_add(width), y.checked_add(height)) {
            (Some(x1), Some(y1)) => Some(Self::new(x, y, x1, y1)),
            _ => None,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Returns `true` if the window is non-empty and lies inside a
    /// `width` × `height` area.
    #[must_use]
    pub const fn fits(&self, width: u32, height: u32) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1 && self.x1 <= width && self.y1 <= height
    }
}

/// Blending factor selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlendFactor {
    /// Constant alpha.
    ConstantAlpha,
    /// Pixel alpha multiplied by constant alpha.
    #[default]
    PixelAlphaTimesConstantAlpha,
}

impl BlendFactor {
    /// Encoding in the layer's own factor field.
    #[must_use]
    pub const fn bf1(self) -> u8 {
        match self {
            BlendFactor::ConstantAlpha => 4,
            BlendFactor::PixelAlphaTimesConstantAlpha => 6,
        }
    }

    /// Encoding in the lower layers' factor field, which applies one minus
    /// the selected factor.
    #[must_use]
    pub const fn bf2(self) -> u8 {
        match self {
            BlendFactor::ConstantAlpha => 5,
            BlendFactor::PixelAlphaTimesConstantAlpha => 7,
        }
    }
}

/// Cached configuration of one compositor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layer {
    /// Window on the screen.
    pub window: Window,
    /// Pixel format of the framebuffer.
    pub format: PixelFormat,
    /// Framebuffer start address.
    pub address: u32,
    /// Constant alpha.
    pub alpha: u8,
    /// Alpha of the default colour shown outside the framebuffer.
    pub default_alpha: u8,
    /// Factor applied to this layer.
    pub blend1: BlendFactor,
    /// Factor applied to the layers below.
    pub blend2: BlendFactor,
    /// Layer enable.
    pub visible: bool,
    /// RGB888 colour rendered transparent.
    pub color_key: Option<u32>,
    /// Framebuffer width in pixels.
    pub image_width: u32,
    /// Framebuffer height in lines.
    pub image_height: u32,
    /// Distance between line starts in pixels, if not the image width.
    pub pitch: Option<u32>,
}

impl Layer {
    /// Opaque, visible layer showing a framebuffer the size of `window`.
    #[must_use]
    pub const fn new(window: Window, format: PixelFormat, address: u32) -> Self {
        Self {
            window,
            format,
            address,
            alpha: 255,
            default_alpha: 0,
            blend1: BlendFactor::PixelAlphaTimesConstantAlpha,
            blend2: BlendFactor::PixelAlphaTimesConstantAlpha,
            visible: true,
            color_key: None,
            image_width: window.width(),
            image_height: window.height(),
            pitch: None,
        }
    }

    /// Size of the framebuffer in bytes.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        (self.image_width * self.image_height * self.format.bytes_per_pixel()) as usize
    }

    /// Encodes the layer into its shadow register set; window positions are
    /// offset by the accumulated back porches of `timing`.
    #[must_use]
    pub fn registers(&self, timing: &CompositorTiming) -> LayerRegisters {
        let bpp = self.format.bytes_per_pixel();
        let mut control = LayerControl::default();
        control.set_enable(self.visible);
        control.set_color_key_enable(self.color_key.is_some());
        let mut blending = BlendingFactors::default();
        blending.set_bf1(self.blend1.bf1());
        blending.set_bf2(self.blend2.bf2());
        LayerRegisters {
            control,
            horizontal: WindowPosition::span(
                self.window.x0,
                self.window.x1,
                timing.accumulated_hbp,
            ),
            vertical: WindowPosition::span(
                self.window.y0,
                self.window.y1,
                timing.accumulated_vbp,
            ),
            color_key: ColorKey::from_rgb(self.color_key.unwrap_or(0)),
            pixel_format: self.format.code(),
            constant_alpha: u32::from(self.alpha),
            default_color: u32::from(self.default_alpha) << 24,
            blending,
            address: self.address,
            line_length: LineLength::new(
                self.image_width * bpp,
                self.pitch.unwrap_or(self.image_width) * bpp,
            ),
            line_count: self.image_height,
        }
    }
}

/// Per display state shared by the layer manager and the drawing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineContext {
    /// Pixel format of the instance.
    pub pixel_format: PixelFormat,
    /// Logical width in pixels.
    pub width: u32,
    /// Logical height in pixels.
    pub height: u32,
    /// Bytes per pixel of `pixel_format`.
    pub bytes_per_pixel: u32,
    /// Layer the drawing calls target.
    pub active_layer: usize,
    /// Current reload mode.
    pub reload_mode: ReloadMode,
    /// Bring-up hooks have run and their peripherals are live.
    pub callbacks_valid: bool,
}

impl PipelineContext {
    /// Fresh context for a `width` × `height` display in `format`.
    #[must_use]
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            pixel_format: format,
            width,
            height,
            bytes_per_pixel: format.bytes_per_pixel(),
            active_layer: 0,
            reload_mode: ReloadMode::None,
            callbacks_valid: false,
        }
    }
}

/// Owner of the compositor's layer state.
#[derive(Debug)]
pub struct LayerManager<C> {
    compositor: C,
    context: PipelineContext,
    timing: CompositorTiming,
    panel_width: u32,
    panel_height: u32,
    layers: [Option<Layer>; LAYER_COUNT],
}

impl<C: Compositor> LayerManager<C> {
    /// Layer manager for a panel of `timing`'s resolution.
    pub fn new(compositor: C, context: PipelineContext, timing: CompositorTiming) -> Self {
        Self {
            compositor,
            panel_width: context.width,
            panel_height: context.height,
            context,
            timing,
            layers: [None; LAYER_COUNT],
        }
    }

    /// Shared access to the compositor.
    pub const fn compositor(&self) -> &C {
        &self.compositor
    }

    /// Exclusive access to the compositor.
    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    /// Current context.
    pub const fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.context
    }

    /// Compositor counters the window positions are encoded against.
    pub const fn timing(&self) -> &CompositorTiming {
        &self.timing
    }

    /// Cached configuration of layer `index`, if it has been configured.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index).and_then(Option::as_ref)
    }

    /// Configuration of the active layer.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the active layer has not been configured.
    pub fn active(&self) -> Result<&Layer> {
        self.layer(self.context.active_layer).ok_or(Error::WrongParam)
    }

    /// Index of the layer the drawing calls target.
    pub const fn active_layer(&self) -> usize {
        self.context.active_layer
    }

    /// Selects the layer the drawing calls target.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if `index` is not a layer.
    pub fn set_active_layer(&mut self, index: usize) -> Result<()> {
        if index >= LAYER_COUNT {
            return Err(Error::WrongParam);
        }
        self.context.active_layer = index;
        Ok(())
    }

    /// Current reload mode.
    pub const fn reload_mode(&self) -> ReloadMode {
        self.context.reload_mode
    }

    /// Configures layer `index` to show the framebuffer at `address` in
    /// `window`, then commits it according to the reload mode.
    ///
    /// `memory` is consulted to check that the whole framebuffer is backed.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] for an invalid index, a window outside the
    /// logical area or an undersized framebuffer, before any register is
    /// written. [`Error::PeriphFailure`] if the compositor rejects the write.
    pub fn configure_layer(
        &mut self,
        index: usize,
        window: Window,
        format: PixelFormat,
        address: u32,
        memory: &impl FrameMemory,
    ) -> Result<()> {
        if index >= LAYER_COUNT || !window.fits(self.context.width, self.context.height) {
            return Err(Error::WrongParam);
        }
        let layer = Layer::new(window, format, address);
        if !memory.region_fits(address, layer.buffer_size()) {
            return Err(Error::WrongParam);
        }
        debug!(
            "layer {} at {:#x}: {} x {} at ({}, {})",
            index,
            address,
            window.width(),
            window.height(),
            window.x0,
            window.y0
        );
        self.write(index, &layer)?;
        self.layers[index] = Some(layer);
        self.apply_mode()
    }

    /// Shows or hides layer `index`.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if layer `index` is not configured,
    /// [`Error::PeriphFailure`] if the compositor rejects the write.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.update(index, |layer| layer.visible = visible)
    }

    /// Sets the constant alpha of layer `index`.
    ///
    /// # Errors
    ///
    /// As [`set_visible`](Self::set_visible).
    pub fn set_transparency(&mut self, index: usize, alpha: u8) -> Result<()> {
        self.update(index, |layer| layer.alpha = alpha)
    }

    /// Points layer `index` at a new framebuffer.
    ///
    /// # Errors
    ///
    /// As [`set_visible`](Self::set_visible).
    pub fn set_address(&mut self, index: usize, address: u32) -> Result<()> {
        self.update(index, |layer| layer.address = address)
    }

    /// Moves and resizes layer `index` to `width` × `height` pixels at
    /// (`x`, `y`). The logical size of the instance follows the new window.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if layer `index` is not configured or the window
    /// does not fit the panel, [`Error::PeriphFailure`] if the compositor
    /// rejects the write.
    pub fn set_window(
        &mut self,
        index: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let window = Window::from_size(x, y, width, height)
            .filter(|window| window.fits(self.panel_width, self.panel_height))
            .ok_or(Error::WrongParam)?;
        self.update(index, |layer| {
            layer.window = window;
            layer.image_width = width;
            layer.image_height = height;
        })?;
        self.context.width = width;
        self.context.height = height;
        Ok(())
    }

    /// Enables colour keying of layer `index` with the RGB888 `key`, or
    /// disables it with `None`.
    ///
    /// # Errors
    ///
    /// As [`set_visible`](Self::set_visible).
    pub fn set_color_key(&mut self, index: usize, key: Option<u32>) -> Result<()> {
        self.update(index, |layer| layer.color_key = key.map(|k| k & 0x00FF_FFFF))
    }

    /// Disables colour keying of layer `index`.
    ///
    /// # Errors
    ///
    /// As [`set_visible`](Self::set_visible).
    pub fn reset_color_key(&mut self, index: usize) -> Result<()> {
        self.set_color_key(index, None)
    }

    /// Sets the distance between line starts of layer `index` to `pixels`.
    ///
    /// # Errors
    ///
    /// As [`set_visible`](Self::set_visible).
    pub fn set_pitch(&mut self, index: usize, pixels: u32) -> Result<()> {
        self.update(index, |layer| layer.pitch = Some(pixels))
    }

    /// Stores `mode`; `Immediate` and `VerticalBlanking` also commit
    /// everything buffered so far.
    ///
    /// # Errors
    ///
    /// [`Error::PeriphFailure`] if the compositor rejects the reload.
    pub fn reload(&mut self, mode: ReloadMode) -> Result<()> {
        match mode {
            ReloadMode::None => {}
            ReloadMode::Immediate => self.commit(ReloadKind::Immediate)?,
            ReloadMode::VerticalBlanking => self.commit(ReloadKind::VerticalBlanking)?,
        }
        self.context.reload_mode = mode;
        Ok(())
    }

    /// Requests a reload of `kind` regardless of the mode.
    pub(crate) fn commit(&mut self, kind: ReloadKind) -> Result<()> {
        self.compositor.reload(kind).map_err(Error::periph)
    }

    /// Forgets every layer and returns to a fresh context.
    pub(crate) fn reset(&mut self) {
        self.layers = [None; LAYER_COUNT];
        self.context = PipelineContext::new(
            self.panel_width,
            self.panel_height,
            self.context.pixel_format,
        );
    }

    fn update(&mut self, index: usize, f: impl FnOnce(&mut Layer)) -> Result<()> {
        let mut layer = *self.layer(index).ok_or(Error::WrongParam)?;
        f(&mut layer);
        self.write(index, &layer)?;
        self.layers[index] = Some(layer);
        self.apply_mode()
    }

    fn write(&mut self, index: usize, layer: &Layer) -> Result<()> {
        let regs = layer.registers(&self.timing);
        self.compositor
            .write_layer(index, &regs)
            .map_err(Error::periph)
    }

    fn apply_mode(&mut self) -> Result<()> {
        match self.context.reload_mode {
            ReloadMode::None => Ok(()),
            ReloadMode::Immediate => self.commit(ReloadKind::Immediate),
            ReloadMode::VerticalBlanking => self.commit(ReloadKind::VerticalBlanking),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::PanelTiming;
    use crate::sim::{Event, EventLog, SimCompositor, SimMemory};

    const BASE: u32 = 0xD000_0000;

    fn manager(mode: ReloadMode) -> (LayerManager<SimCompositor>, SimMemory, EventLog) {
        let log = EventLog::new();
        let memory = SimMemory::new(BASE, 800 * 480 * 4 * 2);
        let timing = CompositorTiming::from_panel(&PanelTiming::OTM8009A, 800, 480);
        let mut manager = LayerManager::new(
            SimCompositor::new(&log),
            PipelineContext::new(800, 480, PixelFormat::Argb8888),
            timing,
        );
        manager.context_mut().reload_mode = mode;
        (manager, memory, log)
    }

    fn full() -> Window {
        Window::new(0, 0, 800, 480)
    }

    #[test]
    fn test_window_geometry() {
        let w = Window::from_size(10, 20, 100, 50).unwrap();
        assert_eq!(w, Window::new(10, 20, 110, 70));
        assert_eq!(Window::from_size(u32::MAX, 0, 2, 2), None);
        assert_eq!(Window::from_size(0, 1, 2, u32::MAX), None);
        assert_eq!(w.width(), 100);
        assert_eq!(w.height(), 50);
        assert!(w.fits(800, 480));
        assert!(!Window::new(0, 0, 801, 480).fits(800, 480));
        assert!(!Window::new(10, 0, 10, 480).fits(800, 480));
    }

    #[test]
    fn test_layer_registers() {
        let timing = CompositorTiming::from_panel(&PanelTiming::OTM8009A, 800, 480);
        let layer = Layer::new(full(), PixelFormat::Argb8888, BASE);
        let regs = layer.registers(&timing);
        assert!(regs.control.enable());
        assert!(!regs.control.color_key_enable());
        assert_eq!(regs.horizontal.start(), 36);
        assert_eq!(regs.horizontal.stop(), 835);
        assert_eq!(regs.vertical.start(), 16);
        assert_eq!(regs.vertical.stop(), 495);
        assert_eq!(regs.pixel_format, 0);
        assert_eq!(regs.constant_alpha, 255);
        assert_eq!(regs.default_color, 0);
        assert_eq!(regs.blending.bf1(), 6);
        assert_eq!(regs.blending.bf2(), 7);
        assert_eq!(regs.address, BASE);
        assert_eq!(regs.line_length.line_length(), 3207);
        assert_eq!(regs.line_length.pitch(), 3200);
        assert_eq!(regs.line_count, 480);

        let mut keyed = Layer::new(Window::new(0, 0, 400, 240), PixelFormat::Rgb565, BASE);
        keyed.color_key = Some(0x00FF_00FF);
        keyed.pitch = Some(800);
        let regs = keyed.registers(&timing);
        assert!(regs.control.color_key_enable());
        assert_eq!(regs.color_key.red(), 0xFF);
        assert_eq!(regs.color_key.green(), 0);
        assert_eq!(regs.pixel_format, 2);
        assert_eq!(regs.line_length.line_length(), 807);
        assert_eq!(regs.line_length.pitch(), 1600);
    }

    #[test]
    fn test_configure_layer_validates_before_touching_hardware() {
        let (mut manager, memory, log) = manager(ReloadMode::Immediate);
        assert_eq!(
            manager.configure_layer(2, full(), PixelFormat::Argb8888, BASE, &memory),
            Err(Error::WrongParam)
        );
        assert_eq!(
            manager.configure_layer(
                0,
                Window::new(0, 0, 801, 480),
                PixelFormat::Argb8888,
                BASE,
                &memory
            ),
            Err(Error::WrongParam)
        );
        // framebuffer runs past the end of memory
        let near_end = BASE + 800 * 480 * 4 * 2 - 16;
        assert_eq!(
            manager.configure_layer(0, full(), PixelFormat::Argb8888, near_end, &memory),
            Err(Error::WrongParam)
        );
        assert!(log.events().is_empty());
        assert!(manager.layer(0).is_none());
    }

    #[test]
    fn test_immediate_mode_is_synchronous() {
        let (mut manager, memory, _log) = manager(ReloadMode::Immediate);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        assert_eq!(manager.compositor().active(0).address, BASE);

        manager.set_transparency(0, 128).unwrap();
        assert_eq!(manager.compositor().active(0).constant_alpha, 128);
        manager.set_visible(0, false).unwrap();
        assert!(!manager.compositor().active(0).control.enable());
        manager.set_address(0, BASE + 0x1000).unwrap();
        assert_eq!(manager.compositor().active(0).address, BASE + 0x1000);
        manager.set_color_key(0, Some(0xFF12_3456)).unwrap();
        assert!(manager.compositor().active(0).control.color_key_enable());
        assert_eq!(manager.compositor().active(0).color_key, ColorKey::from_rgb(0x12_3456));
        manager.reset_color_key(0).unwrap();
        assert!(!manager.compositor().active(0).control.color_key_enable());
        manager.set_pitch(0, 1024).unwrap();
        assert_eq!(manager.compositor().active(0).line_length.pitch(), 4096);
        manager.set_window(0, 100, 50, 200, 100).unwrap();
        let active = manager.compositor().active(0);
        assert_eq!(active.horizontal.start(), 100 + 35 + 1);
        assert_eq!(active.horizontal.stop(), 300 + 35);
        assert_eq!(active.line_count, 100);
    }

    #[test]
    fn test_none_mode_buffers_until_reload() {
        let (mut manager, memory, log) = manager(ReloadMode::None);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        manager.set_transparency(0, 10).unwrap();
        manager.set_address(0, BASE + 0x40).unwrap();
        assert_eq!(manager.compositor().active(0), LayerRegisters::default());
        assert_eq!(manager.compositor().shadow(0).constant_alpha, 10);
        assert_eq!(log.count(|e| matches!(e, Event::Reload(_))), 0);

        // a vertical blank with nothing armed changes nothing
        manager.compositor().vertical_blank();
        assert_eq!(manager.compositor().active(0), LayerRegisters::default());

        manager.reload(ReloadMode::Immediate).unwrap();
        assert_eq!(manager.compositor().active(0).constant_alpha, 10);
        assert_eq!(manager.compositor().active(0).address, BASE + 0x40);
        assert_eq!(manager.reload_mode(), ReloadMode::Immediate);
    }

    #[test]
    fn test_vertical_blanking_mode_lands_at_frame_boundary() {
        let (mut manager, memory, _log) = manager(ReloadMode::VerticalBlanking);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        manager.set_transparency(0, 77).unwrap();
        manager.set_window(0, 100, 50, 200, 100).unwrap();
        assert_eq!(manager.compositor().active(0), LayerRegisters::default());

        manager.compositor().vertical_blank();
        let active = manager.compositor().active(0);
        assert_eq!(active.constant_alpha, 77);
        assert_eq!(active.horizontal.start(), 100 + 35 + 1);
        assert_eq!(active.horizontal.stop(), 300 + 35);
        assert_eq!(active.line_count, 100);
    }

    #[test]
    fn test_reload_none_only_stores_mode() {
        let (mut manager, _memory, log) = manager(ReloadMode::Immediate);
        manager.reload(ReloadMode::None).unwrap();
        assert_eq!(manager.reload_mode(), ReloadMode::None);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_reload_vertical_blanking_commits_buffered_set() {
        let (mut manager, memory, log) = manager(ReloadMode::None);
        manager
            .configure_layer(1, Window::new(0, 0, 100, 100), PixelFormat::Rgb565, BASE, &memory)
            .unwrap();
        manager.reload(ReloadMode::VerticalBlanking).unwrap();
        assert!(log.contains(&Event::Reload(ReloadKind::VerticalBlanking)));
        assert_eq!(manager.compositor().active(1), LayerRegisters::default());
        manager.compositor().vertical_blank();
        assert_eq!(manager.compositor().active(1).pixel_format, 2);
        assert_eq!(manager.reload_mode(), ReloadMode::VerticalBlanking);
    }

    #[test]
    fn test_mutators_validate_index() {
        let (mut manager, memory, _log) = manager(ReloadMode::Immediate);
        assert_eq!(manager.set_visible(0, true), Err(Error::WrongParam));
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        assert_eq!(manager.set_transparency(1, 0), Err(Error::WrongParam));
        assert_eq!(manager.set_address(5, 0), Err(Error::WrongParam));
        assert_eq!(manager.set_pitch(2, 800), Err(Error::WrongParam));
        assert_eq!(manager.set_active_layer(2), Err(Error::WrongParam));
        manager.set_active_layer(1).unwrap();
        assert_eq!(manager.active_layer(), 1);
        assert_eq!(manager.active(), Err(Error::WrongParam));
    }

    #[test]
    fn test_set_window_updates_logical_size() {
        let (mut manager, memory, _log) = manager(ReloadMode::Immediate);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        manager.set_window(0, 0, 0, 400, 240).unwrap();
        assert_eq!(manager.context().width, 400);
        assert_eq!(manager.context().height, 240);
        assert_eq!(manager.layer(0).unwrap().image_width, 400);
        // the panel, not the shrunken logical area, bounds the window
        manager.set_window(0, 0, 0, 800, 480).unwrap();
        assert_eq!(manager.context().width, 800);
        assert_eq!(manager.set_window(0, 1, 0, 800, 480), Err(Error::WrongParam));
    }

    #[test]
    fn test_compositor_failure_is_periph_failure() {
        let (mut manager, memory, _log) = manager(ReloadMode::Immediate);
        manager.compositor().set_fail_writes(true);
        assert_eq!(
            manager.configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory),
            Err(Error::PeriphFailure)
        );
    }

    #[test]
    fn test_rejected_write_leaves_layer_unchanged() {
        let (mut manager, memory, _log) = manager(ReloadMode::Immediate);
        manager.compositor().set_fail_writes(true);
        assert_eq!(
            manager.configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory),
            Err(Error::PeriphFailure)
        );
        assert!(manager.layer(0).is_none());

        manager.compositor().set_fail_writes(false);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        manager.compositor().set_fail_writes(true);
        assert_eq!(manager.set_address(0, BASE + 0x40), Err(Error::PeriphFailure));
        assert_eq!(manager.layer(0).map(|layer| layer.address), Some(BASE));
    }

    #[test]
    fn test_set_window_rejects_overflowing_geometry() {
        let (mut manager, memory, log) = manager(ReloadMode::Immediate);
        manager
            .configure_layer(0, full(), PixelFormat::Argb8888, BASE, &memory)
            .unwrap();
        log.clear();
        assert_eq!(manager.set_window(0, u32::MAX, 0, 2, 2), Err(Error::WrongParam));
        assert_eq!(manager.set_window(0, 0, 1, 2, u32::MAX), Err(Error::WrongParam));
        assert!(log.events().is_empty());
        assert_eq!(manager.context().width, 800);
        assert_eq!(manager.context().height, 480);
    }
}
