//! Runtime reconfiguration of a running session.
//!
//! Every change the audio callback can observe happens while the
//! [`AudioGate`] is held, and only for the duration of the change itself.
//! Config writes happen after the gate is released.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

use log::{debug, info};

use crate::backend::{
    AudioChannel, AudioDevice, EmulationCore, FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH,
};
use crate::bridge::{FrameBridge, InputMapping};
use crate::config::ConfigStore;
use crate::error::ControlError;
use crate::gate::AudioGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowScale {
    X2,
    X3,
    #[default]
    X4,
    X5,
    X6,
}

impl WindowScale {
    pub const ALL: [Self; 5] = [Self::X2, Self::X3, Self::X4, Self::X5, Self::X6];

    pub fn factor(self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X3 => 3,
            Self::X4 => 4,
            Self::X5 => 5,
            Self::X6 => 6,
        }
    }

    pub fn from_factor(factor: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.factor() == factor)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::X2 => "2x2",
            Self::X3 => "3x3",
            Self::X4 => "4x4",
            Self::X5 => "5x5",
            Self::X6 => "6x6",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameSpeed {
    Quarter,
    Half,
    #[default]
    Normal,
    Double,
    Triple,
    Quadruple,
}

impl GameSpeed {
    pub const ALL: [Self; 6] = [
        Self::Quarter,
        Self::Half,
        Self::Normal,
        Self::Double,
        Self::Triple,
        Self::Quadruple,
    ];

    pub fn multiplier(self) -> f32 {
        match self {
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::Double => 2.0,
            Self::Triple => 3.0,
            Self::Quadruple => 4.0,
        }
    }

    pub fn from_multiplier(multiplier: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.multiplier() == multiplier)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Quarter => "x1/4",
            Self::Half => "x1/2",
            Self::Normal => "x1",
            Self::Double => "x2",
            Self::Triple => "x3",
            Self::Quadruple => "x4",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

/// Pixel size of the scaled LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub fn for_scale(scale: WindowScale) -> Self {
        Self {
            width: SCREEN_WIDTH as u32 * scale.factor(),
            height: SCREEN_HEIGHT as u32 * scale.factor(),
        }
    }
}

/// Session state that is not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeParameters {
    pub window_scale: WindowScale,
    pub game_speed: GameSpeed,
    pub paused: bool,
}

pub const SUPPORTED_SAMPLE_RATES: [u32; 6] = [8000, 11025, 22050, 24000, 44100, 48000];
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundSettings {
    /// Indexed by channel number minus one.
    pub channels: [bool; 4],
    /// Percent, `0..=100`.
    pub volume: u8,
    pub muted: bool,
    /// Restored on unmute.
    pub saved_volume: u8,
    pub mono: bool,
    pub sample_rate: u32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            channels: [true; 4],
            volume: 100,
            muted: false,
            saved_volume: 100,
            mono: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SoundSettings {
    pub fn channel_enabled(&self, channel: AudioChannel) -> bool {
        self.channels[usize::from(channel.number() - 1)]
    }
}

fn volume_fraction(percent: u8) -> f32 {
    f32::from(percent) / 100.0
}

pub struct RuntimeController<C, D, K>
where
    C: EmulationCore,
    D: AudioDevice,
{
    core: C,
    gate: AudioGate<D>,
    config: ConfigStore,
    params: RuntimeParameters,
    sound: SoundSettings,
    mapping: InputMapping<K>,
    keys_pressed: HashSet<K>,
    bridge: FrameBridge,
}

impl<C, D, K> RuntimeController<C, D, K>
where
    C: EmulationCore,
    D: AudioDevice,
    K: Eq + Hash,
{
    pub fn new(core: C, device: D, config: ConfigStore, mapping: InputMapping<K>) -> Self {
        Self {
            core,
            gate: AudioGate::new(device),
            config,
            params: RuntimeParameters::default(),
            sound: SoundSettings::default(),
            mapping,
            keys_pressed: HashSet::new(),
            bridge: FrameBridge::new(),
        }
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn device(&self) -> &D {
        self.gate.device()
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Direct access for scheme and directory edits, which do not touch
    /// emulator state.
    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn parameters(&self) -> RuntimeParameters {
        self.params
    }

    pub fn sound(&self) -> SoundSettings {
        self.sound
    }

    pub fn display_size(&self) -> DisplaySize {
        DisplaySize::for_scale(self.params.window_scale)
    }

    /// Insert and boot `path`, then record it as the most recent program.
    ///
    /// A rejected program changes nothing. A config write failure is reported
    /// after the program is already running.
    pub fn load_program(&mut self, path: &Path) -> Result<(), ControlError> {
        {
            let _gate = self.gate.acquire();
            self.core.insert_program(path)?;
            self.core.power_on();
        }
        info!("Loaded {}", path.display());

        self.config.add_recent_path(path)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.config.set_last_rom_dir(dir)?;
        }
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        let gate = self.gate.acquire();
        self.params.paused = paused;
        self.core.set_paused(paused);
        if paused {
            gate.pause();
        } else {
            gate.resume();
        }
        drop(gate);
        info!("Emulation {}", if paused { "paused" } else { "resumed" });
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.params.paused);
    }

    /// Power-cycle the loaded program. The APU state the callback reads is
    /// reset too, so this is gated like every other mutation.
    pub fn reset(&mut self) {
        let _gate = self.gate.acquire();
        self.core.power_on();
        debug!("Reset");
    }

    pub fn set_window_scale(&mut self, scale: WindowScale) -> DisplaySize {
        let _gate = self.gate.acquire();
        self.params.window_scale = scale;
        let size = DisplaySize::for_scale(scale);
        debug!("Window scale {} ({}x{})", scale.label(), size.width, size.height);
        size
    }

    pub fn set_game_speed(&mut self, speed: GameSpeed) {
        let _gate = self.gate.acquire();
        self.params.game_speed = speed;
        self.core.set_speed_multiplier(speed.multiplier());
        debug!("Game speed {}", speed.label());
    }

    pub fn set_channel_enabled(&mut self, channel: AudioChannel, enabled: bool) {
        let _gate = self.gate.acquire();
        self.sound.channels[usize::from(channel.number() - 1)] = enabled;
        self.core.enable_audio_channel(channel, enabled);
        debug!(
            "Sound channel {} {}",
            channel.number(),
            if enabled { "on" } else { "off" }
        );
    }

    /// Set the master volume. A non-zero volume while muted unmutes.
    pub fn set_volume(&mut self, percent: u8) -> Result<(), ControlError> {
        if percent > 100 {
            return Err(ControlError::VolumeOutOfRange(percent));
        }
        let _gate = self.gate.acquire();
        if self.sound.muted && percent > 0 {
            self.sound.muted = false;
        }
        self.sound.volume = percent;
        self.core.set_master_volume(volume_fraction(percent));
        debug!("Volume {percent}%");
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) {
        if muted == self.sound.muted {
            return;
        }
        let _gate = self.gate.acquire();
        if muted {
            self.sound.saved_volume = self.sound.volume;
            self.sound.volume = 0;
        } else {
            self.sound.volume = self.sound.saved_volume;
        }
        self.sound.muted = muted;
        self.core.set_master_volume(volume_fraction(self.sound.volume));
        debug!("Mute {}", if muted { "on" } else { "off" });
    }

    pub fn set_mono(&mut self, mono: bool) {
        let _gate = self.gate.acquire();
        self.sound.mono = mono;
        self.core.set_mono_output(mono);
    }

    /// Change the output rate on both the core and the device in one step.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<(), ControlError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&rate) {
            return Err(ControlError::UnsupportedSampleRate(rate));
        }
        let gate = self.gate.acquire();
        self.sound.sample_rate = rate;
        self.core.set_sample_rate(rate);
        gate.set_sample_rate(rate);
        drop(gate);
        info!("Sample rate {rate} Hz");
        Ok(())
    }

    /// Run `f` on the core with the gate held. For cores that are stepped by
    /// the frontend instead of running on their own thread.
    pub fn run_core<R>(&mut self, f: impl FnOnce(&mut C) -> R) -> R {
        let _gate = self.gate.acquire();
        f(&mut self.core)
    }

    /// Track a key press or release for the next tick.
    pub fn record_key(&mut self, code: K, pressed: bool) {
        if pressed {
            self.keys_pressed.insert(code);
        } else {
            self.keys_pressed.remove(&code);
        }
    }

    /// Forget every held key, e.g. when the window loses focus.
    pub fn release_keys(&mut self) {
        self.keys_pressed.clear();
    }

    pub fn keys_pressed(&self) -> &HashSet<K> {
        &self.keys_pressed
    }

    /// One display refresh: push input, pull the frame.
    pub fn tick(&mut self) -> &FrameBuffer {
        self.bridge
            .tick(&mut self.core, &self.mapping, &self.keys_pressed)
    }

    /// Frames shown since the last call; polled once a second for the fps
    /// readout.
    pub fn take_frame_count(&mut self) -> u32 {
        self.bridge.take_frame_count()
    }
}
