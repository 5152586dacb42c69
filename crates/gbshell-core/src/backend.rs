//! Interfaces of the two subsystems the frontend drives: the emulation core
//! and the audio output device.

use std::path::Path;

use crate::error::LoadError;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// Packed RGB888 pixels, row-major.
pub type FrameBuffer = [u8; SCREEN_WIDTH * SCREEN_HEIGHT * 3];

/// Logical joypad buttons in the order the core expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoypadState {
    pub down: bool,
    pub up: bool,
    pub left: bool,
    pub right: bool,
    pub start: bool,
    pub select: bool,
    pub b: bool,
    pub a: bool,
}

/// One of the four APU channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioChannel {
    Pulse1,
    Pulse2,
    Wave,
    Noise,
}

impl AudioChannel {
    pub const ALL: [Self; 4] = [Self::Pulse1, Self::Pulse2, Self::Wave, Self::Noise];

    /// 1-based channel number.
    pub fn number(self) -> u8 {
        match self {
            Self::Pulse1 => 1,
            Self::Pulse2 => 2,
            Self::Wave => 3,
            Self::Noise => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }
}

/// The machine being emulated. Implementations share sample state with the
/// audio callback; callers hold the audio gate while mutating it.
pub trait EmulationCore {
    /// Accept a new program. On error the previously inserted program, if
    /// any, must be left in place.
    fn insert_program(&mut self, path: &Path) -> Result<(), LoadError>;

    fn power_on(&mut self);

    /// Stop or restart sample and frame production.
    fn set_paused(&mut self, paused: bool);

    fn set_input_state(&mut self, state: JoypadState);

    fn frame_buffer(&self) -> &FrameBuffer;

    fn set_speed_multiplier(&mut self, multiplier: f32);

    fn enable_audio_channel(&mut self, channel: AudioChannel, enabled: bool);

    /// `volume` in `0.0..=1.0`.
    fn set_master_volume(&mut self, volume: f32);

    fn set_mono_output(&mut self, mono: bool);

    fn set_sample_rate(&mut self, rate: u32);
}

/// Host audio output. `lock`/`unlock` keep the playback callback from running
/// in between; they are paired by [`crate::gate::AudioGate`].
pub trait AudioDevice {
    fn lock(&self);

    fn unlock(&self);

    fn set_sample_rate(&self, rate: u32);

    fn pause(&self);

    fn resume(&self);
}
