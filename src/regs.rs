//! Register images of the compositor and command host.
//!
//! Each word is a [`bitfield`] over the raw `u32` the hardware expects, so a
//! HAL implementation can store it into the peripheral unchanged.

use bitfield::bitfield;

use crate::layer::ReloadKind;

bitfield! {
    /// Layer control word.
    ///
    /// - Bit 4: colour look-up table enable
    /// - Bit 1: colour keying enable
    /// - Bit 0: layer enable
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct LayerControl(u32);
    impl Debug;
    pub clut_enable, set_clut_enable: 4;
    pub color_key_enable, set_color_key_enable: 1;
    pub enable, set_enable: 0;
}

bitfield! {
    /// Window position word, used for both the horizontal and the vertical
    /// axis.
    ///
    /// Both positions include the accumulated back porch of their axis.
    ///
    /// - Bits 27-16: stop position (inclusive)
    /// - Bits 11-0: start position
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct WindowPosition(u32);
    impl Debug;
    pub stop, set_stop: 27, 16;
    pub start, set_start: 11, 0;
}

impl WindowPosition {
    /// Encodes the half-open pixel range `from..to` on an axis whose
    /// accumulated back porch is `back_porch`.
    #[must_use]
    pub fn span(from: u32, to: u32, back_porch: u32) -> Self {
        let mut word = Self(0);
        word.set_start(from + back_porch + 1);
        word.set_stop(to + back_porch);
        word
    }
}

bitfield! {
    /// Colour key word (RGB888).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct ColorKey(u32);
    impl Debug;
    pub u8, red, set_red: 23, 16;
    pub u8, green, set_green: 15, 8;
    pub u8, blue, set_blue: 7, 0;
}

impl ColorKey {
    /// Builds a key from a colour, ignoring its alpha byte.
    #[must_use]
    pub const fn from_rgb(color: u32) -> Self {
        Self(color & 0x00FF_FFFF)
    }
}

bitfield! {
    /// Blending factors word.
    ///
    /// - Bits 10-8: factor applied to the layer
    /// - Bits 2-0: factor applied to the layers below
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct BlendingFactors(u32);
    impl Debug;
    pub u8, bf1, set_bf1: 10, 8;
    pub u8, bf2, set_bf2: 2, 0;
}

bitfield! {
    /// Framebuffer line length word.
    ///
    /// - Bits 28-16: pitch in bytes between two line starts
    /// - Bits 12-0: bytes per line plus seven
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct LineLength(u32);
    impl Debug;
    pub pitch, set_pitch: 28, 16;
    pub line_length, set_line_length: 12, 0;
}

impl LineLength {
    /// Encodes a line of `line_bytes` bytes repeated every `pitch_bytes`.
    #[must_use]
    pub fn new(line_bytes: u32, pitch_bytes: u32) -> Self {
        let mut word = Self(0);
        word.set_line_length(line_bytes + 7);
        word.set_pitch(pitch_bytes);
        word
    }
}

bitfield! {
    /// Shadow reload request word.
    ///
    /// - Bit 1: reload at the next vertical blanking period
    /// - Bit 0: reload immediately
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct ShadowReload(u32);
    impl Debug;
    pub vertical_blanking, set_vertical_blanking: 1;
    pub immediate, set_immediate: 0;
}

impl From<ReloadKind> for ShadowReload {
    fn from(kind: ReloadKind) -> Self {
        let mut word = Self(0);
        match kind {
            ReloadKind::Immediate => word.set_immediate(true),
            ReloadKind::VerticalBlanking => word.set_vertical_blanking(true),
        }
        word
    }
}

bitfield! {
    /// Command mode configuration word of the command host.
    ///
    /// A set bit sends the packet class in low-power mode, a clear bit in
    /// high-speed mode.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct LowPowerCommands(u32);
    impl Debug;
    pub max_read_packet, set_max_read_packet: 24;
    pub dcs_long_write, set_dcs_long_write: 19;
    pub dcs_short_read_p0, set_dcs_short_read_p0: 18;
    pub dcs_short_write_p1, set_dcs_short_write_p1: 17;
    pub dcs_short_write_p0, set_dcs_short_write_p0: 16;
    pub generic_long_write, set_generic_long_write: 14;
    pub generic_short_read_p2, set_generic_short_read_p2: 13;
    pub generic_short_read_p1, set_generic_short_read_p1: 12;
    pub generic_short_read_p0, set_generic_short_read_p0: 11;
    pub generic_short_write_p2, set_generic_short_write_p2: 10;
    pub generic_short_write_p1, set_generic_short_write_p1: 9;
    pub generic_short_write_p0, set_generic_short_write_p0: 8;
}

impl LowPowerCommands {
    const ALL: u32 = 0x010F_7F00;

    /// Every packet class in high-speed mode.
    #[must_use]
    pub const fn high_speed() -> Self {
        Self(0)
    }

    /// Every packet class in low-power mode.
    #[must_use]
    pub const fn low_power() -> Self {
        Self(Self::ALL)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LowPowerCommands {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LowPowerCommands({=u32:#x})", self.0);
    }
}

/// Shadow register set of one compositor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerRegisters {
    /// Control word.
    pub control: LayerControl,
    /// Horizontal window position.
    pub horizontal: WindowPosition,
    /// Vertical window position.
    pub vertical: WindowPosition,
    /// Colour key.
    pub color_key: ColorKey,
    /// Pixel format code.
    pub pixel_format: u32,
    /// Constant alpha.
    pub constant_alpha: u32,
    /// Default colour (ARGB8888), shown outside the framebuffer.
    pub default_color: u32,
    /// Blending factors.
    pub blending: BlendingFactors,
    /// Framebuffer start address.
    pub address: u32,
    /// Line length and pitch.
    pub line_length: LineLength,
    /// Number of lines.
    pub line_count: u32,
}

#[cfg(feature = "defmt")]
impl defmt::Format for LayerRegisters {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LayerRegisters {{ control: {=u32:#x}, whpcr: {=u32:#x}, wvpcr: {=u32:#x}, cfbar: {=u32:#x} }}",
            self.control.0,
            self.horizontal.0,
            self.vertical.0,
            self.address
        );
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_window_position_span() {
        let word = WindowPosition::span(0, 800, 35);
        assert_eq!(word.start(), 36);
        assert_eq!(word.stop(), 835);
        assert_eq!(word.0, (835 << 16) | 36);
    }

    #[test]
    fn test_layer_control_bits() {
        let mut control = LayerControl(0);
        control.set_enable(true);
        assert_eq!(control.0, 0b1);
        control.set_color_key_enable(true);
        assert_eq!(control.0, 0b11);
        control.set_enable(false);
        assert_eq!(control.0, 0b10);
    }

    #[test]
    fn test_color_key_channels() {
        let key = ColorKey::from_rgb(0xAA12_3456);
        assert_eq!(key.0, 0x0012_3456);
        assert_eq!(key.red(), 0x12);
        assert_eq!(key.green(), 0x34);
        assert_eq!(key.blue(), 0x56);
    }

    #[test]
    fn test_blending_factors() {
        let mut blend = BlendingFactors(0);
        blend.set_bf1(6);
        blend.set_bf2(7);
        assert_eq!(blend.0, 0x0607);
    }

    #[test]
    fn test_line_length() {
        let word = LineLength::new(800 * 4, 800 * 4);
        assert_eq!(word.line_length(), 3207);
        assert_eq!(word.pitch(), 3200);
    }

    #[test]
    fn test_shadow_reload_from_kind() {
        assert_eq!(ShadowReload::from(ReloadKind::Immediate).0, 0b01);
        assert_eq!(ShadowReload::from(ReloadKind::VerticalBlanking).0, 0b10);
    }

    #[test]
    fn test_low_power_commands() {
        let all = LowPowerCommands::low_power();
        assert!(all.dcs_long_write());
        assert!(all.generic_short_write_p0());
        assert!(all.max_read_packet());
        let mut only = LowPowerCommands::high_speed();
        only.set_dcs_short_write_p1(true);
        assert_eq!(only.0, 1 << 17);
        assert!(!only.dcs_long_write());
    }
}
