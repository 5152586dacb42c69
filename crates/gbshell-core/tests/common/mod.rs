#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gbshell_core::backend::{
    AudioChannel, AudioDevice, EmulationCore, FrameBuffer, JoypadState, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};
use gbshell_core::bridge::InputMapping;
use gbshell_core::error::LoadError;

/// Everything the controller asked of the core or the device, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Lock,
    Unlock,
    DeviceRate(u32),
    DevicePause,
    DeviceResume,
    Insert(PathBuf),
    PowerOn,
    CorePaused(bool),
    Input(JoypadState),
    Speed(f32),
    Channel(u8, bool),
    Volume(f32),
    Mono(bool),
    CoreRate(u32),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(log: &Log) -> Vec<Event> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Core that records calls and rejects programs whose file name starts with
/// `bad`.
pub struct RecordingCore {
    log: Log,
    frame: Box<FrameBuffer>,
    pub program: Option<PathBuf>,
}

impl RecordingCore {
    pub fn new(log: Log) -> Self {
        let mut frame = Box::new([0u8; SCREEN_WIDTH * SCREEN_HEIGHT * 3]);
        frame[0] = 0xAB;
        Self {
            log,
            frame,
            program: None,
        }
    }
}

impl EmulationCore for RecordingCore {
    fn insert_program(&mut self, path: &Path) -> Result<(), LoadError> {
        self.log.borrow_mut().push(Event::Insert(path.to_path_buf()));
        let rejected = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("bad"));
        if rejected {
            return Err(LoadError::new(path, "unsupported cartridge"));
        }
        self.program = Some(path.to_path_buf());
        Ok(())
    }

    fn power_on(&mut self) {
        self.log.borrow_mut().push(Event::PowerOn);
    }

    fn set_paused(&mut self, paused: bool) {
        self.log.borrow_mut().push(Event::CorePaused(paused));
    }

    fn set_input_state(&mut self, state: JoypadState) {
        self.log.borrow_mut().push(Event::Input(state));
    }

    fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame
    }

    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.log.borrow_mut().push(Event::Speed(multiplier));
    }

    fn enable_audio_channel(&mut self, channel: AudioChannel, enabled: bool) {
        self.log
            .borrow_mut()
            .push(Event::Channel(channel.number(), enabled));
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.log.borrow_mut().push(Event::Volume(volume));
    }

    fn set_mono_output(&mut self, mono: bool) {
        self.log.borrow_mut().push(Event::Mono(mono));
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.log.borrow_mut().push(Event::CoreRate(rate));
    }
}

/// Device that records lock traffic and fails on overlapping locks.
pub struct InstrumentedDevice {
    log: Log,
    locked: Cell<bool>,
    pub locks: Cell<usize>,
}

impl InstrumentedDevice {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            locked: Cell::new(false),
            locks: Cell::new(0),
        }
    }

    fn assert_locked(&self, what: &str) {
        assert!(self.locked.get(), "{what} called without the gate held");
    }
}

impl AudioDevice for InstrumentedDevice {
    fn lock(&self) {
        assert!(!self.locked.replace(true), "overlapping audio lock");
        self.locks.set(self.locks.get() + 1);
        self.log.borrow_mut().push(Event::Lock);
    }

    fn unlock(&self) {
        assert!(self.locked.replace(false), "unlock without lock");
        self.log.borrow_mut().push(Event::Unlock);
    }

    fn set_sample_rate(&self, rate: u32) {
        self.assert_locked("set_sample_rate");
        self.log.borrow_mut().push(Event::DeviceRate(rate));
    }

    fn pause(&self) {
        self.assert_locked("pause");
        self.log.borrow_mut().push(Event::DevicePause);
    }

    fn resume(&self) {
        self.assert_locked("resume");
        self.log.borrow_mut().push(Event::DeviceResume);
    }
}

/// W/A/S/D for the d-pad, Return/Shift for start/select, K/L for B/A.
pub fn wasd_mapping() -> InputMapping<&'static str> {
    InputMapping {
        down: "S",
        up: "W",
        left: "A",
        right: "D",
        start: "Return",
        select: "Shift",
        b: "K",
        a: "L",
    }
}
