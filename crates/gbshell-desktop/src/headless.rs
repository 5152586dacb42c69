//! Window-less session loop, driven at the Game Boy refresh rate.

use crate::audio::StereoFrame;
use crossbeam_channel::{Sender, select, tick};
use gbshell_core::RuntimeController;
use gbshell_core::backend::{
    AudioChannel, AudioDevice, EmulationCore, FrameBuffer, JoypadState, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};
use gbshell_core::controller::DEFAULT_SAMPLE_RATE;
use gbshell_core::error::LoadError;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GB_FPS: f64 = 59.7275;
pub const FRAME_TIME: Duration = Duration::from_nanos((1e9_f64 / GB_FPS) as u64);

/// Stand-in for an emulation core: accepts any readable, non-empty file,
/// shows a blank screen and emits silence at the emulated rate.
pub struct PlaceholderCore {
    samples: Sender<StereoFrame>,
    frame: Box<FrameBuffer>,
    program: Option<PathBuf>,
    powered: bool,
    paused: bool,
    speed: f32,
    sample_rate: u32,
    input: JoypadState,
    carry: f64,
    dropped: u64,
}

impl PlaceholderCore {
    pub fn new(samples: Sender<StereoFrame>) -> Self {
        Self {
            samples,
            frame: Box::new([0xFF; SCREEN_WIDTH * SCREEN_HEIGHT * 3]),
            program: None,
            powered: false,
            paused: false,
            speed: 1.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            input: JoypadState::default(),
            carry: 0.0,
            dropped: 0,
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    pub fn input(&self) -> JoypadState {
        self.input
    }

    /// Frames that did not fit in the sample channel.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    /// Emulate one video frame's worth of time.
    pub fn run_frame(&mut self) {
        if !self.powered || self.paused {
            return;
        }
        let exact = f64::from(self.sample_rate) / GB_FPS * f64::from(self.speed) + self.carry;
        let count = exact.floor();
        self.carry = exact - count;

        for _ in 0..count as u64 {
            if self.samples.try_send([0.0, 0.0]).is_err() {
                self.dropped += 1;
            }
        }
    }
}

impl EmulationCore for PlaceholderCore {
    fn insert_program(&mut self, path: &Path) -> Result<(), LoadError> {
        let meta = std::fs::metadata(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        if !meta.is_file() {
            return Err(LoadError::new(path, "not a file"));
        }
        if meta.len() == 0 {
            return Err(LoadError::new(path, "file is empty"));
        }
        self.program = Some(path.to_path_buf());
        self.powered = false;
        Ok(())
    }

    fn power_on(&mut self) {
        self.powered = self.program.is_some();
        self.carry = 0.0;
        self.frame.fill(0xFF);
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_input_state(&mut self, state: JoypadState) {
        self.input = state;
    }

    fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame
    }

    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed = multiplier;
    }

    // The output is silent, so mixing settings only get logged.
    fn enable_audio_channel(&mut self, channel: AudioChannel, enabled: bool) {
        debug!("channel {} enabled: {enabled}", channel.number());
    }

    fn set_master_volume(&mut self, volume: f32) {
        debug!("master volume {volume:.2}");
    }

    fn set_mono_output(&mut self, mono: bool) {
        debug!("mono output: {mono}");
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
    }
}

/// Tick the session until `frames` refreshes have been shown (forever when
/// `None`), logging the frame rate once a second. Returns the refresh count.
pub fn run_session<D: AudioDevice>(
    controller: &mut RuntimeController<PlaceholderCore, D, String>,
    frames: Option<u64>,
) -> u64 {
    let refresh = tick(FRAME_TIME);
    let fps = tick(Duration::from_secs(1));
    let mut shown = 0u64;

    while frames.is_none_or(|limit| shown < limit) {
        select! {
            recv(refresh) -> _ => {
                controller.run_core(PlaceholderCore::run_frame);
                let frame = controller.tick();
                debug!("frame {shown}: first pixel {:02x}", frame[0]);
                shown += 1;
            }
            recv(fps) -> _ => {
                info!("{} fps", controller.take_frame_count());
            }
        }
    }

    let dropped = controller.core().dropped_samples();
    if dropped > 0 {
        info!("{dropped} audio frames dropped");
    }
    shown
}
