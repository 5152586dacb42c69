use crossbeam_channel::{Receiver, Sender};
use gbshell_core::backend::AudioDevice;
use gbshell_core::callback_lock::CallbackLock;
use gbshell_core::controller::DEFAULT_SAMPLE_RATE;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Stereo frame handed from the core to the playback callback.
pub type StereoFrame = [f32; 2];

/// Bounded sample channel. Producers drop frames when it is full.
pub fn sample_channel(capacity_frames: usize) -> (Sender<StereoFrame>, Receiver<StereoFrame>) {
    crossbeam_channel::bounded(capacity_frames)
}

/// Output device with no host stream: a worker thread stands in for the
/// playback callback and drains samples at the configured rate.
pub struct DetachedDevice {
    lock: Arc<CallbackLock>,
    rate: Arc<AtomicU32>,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

const DRAIN_PERIOD: Duration = Duration::from_millis(10);

impl DetachedDevice {
    pub fn open(samples: Receiver<StereoFrame>) -> Self {
        let lock = Arc::new(CallbackLock::new());
        let rate = Arc::new(AtomicU32::new(DEFAULT_SAMPLE_RATE));
        let paused = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let lock = Arc::clone(&lock);
            let rate = Arc::clone(&rate);
            let paused = Arc::clone(&paused);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let ticker = crossbeam_channel::tick(DRAIN_PERIOD);
                while !stop.load(Ordering::Acquire) {
                    if ticker.recv().is_err() {
                        break;
                    }
                    if paused.load(Ordering::Acquire) {
                        continue;
                    }
                    let wanted = rate.load(Ordering::Acquire) as usize / 100;
                    let drained = lock.run_callback(|| samples.try_iter().take(wanted).count());
                    if drained < wanted {
                        debug!("audio underrun: {drained}/{wanted} frames");
                    }
                }
            })
        };

        info!("Opened detached audio output");
        Self {
            lock,
            rate,
            paused,
            stop,
            worker: Some(worker),
        }
    }
}

impl AudioDevice for DetachedDevice {
    fn lock(&self) {
        self.lock.lock();
    }

    fn unlock(&self) {
        self.lock.unlock();
    }

    fn set_sample_rate(&self, rate: u32) {
        self.rate.store(rate, Ordering::Release);
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }
}

impl Drop for DetachedDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(feature = "cpal-audio")]
pub use host::CpalDevice;

#[cfg(feature = "cpal-audio")]
mod host {
    use super::StereoFrame;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use crossbeam_channel::Receiver;
    use gbshell_core::backend::AudioDevice;
    use gbshell_core::callback_lock::CallbackLock;
    use log::{error, info, warn};
    use std::cell::RefCell;
    use std::sync::Arc;

    /// Default host output device. The playback callback pulls frames from
    /// the sample channel while the callback lock is free.
    pub struct CpalDevice {
        device: cpal::Device,
        sample_format: cpal::SampleFormat,
        config: RefCell<cpal::StreamConfig>,
        stream: RefCell<cpal::Stream>,
        lock: Arc<CallbackLock>,
        samples: Receiver<StereoFrame>,
    }

    impl CpalDevice {
        pub fn open(samples: Receiver<StereoFrame>, rate: u32) -> Option<Self> {
            let host = cpal::default_host();
            let device = host.default_output_device()?;
            let supported = match device.default_output_config() {
                Ok(c) => c,
                Err(e) => {
                    error!("no supported output config: {e}");
                    return None;
                }
            };
            let sample_format = supported.sample_format();
            let mut config: cpal::StreamConfig = supported.into();
            config.sample_rate = cpal::SampleRate(rate);

            let lock = Arc::new(CallbackLock::new());
            let stream = build_stream(&device, sample_format, &config, &lock, &samples)?;
            if let Err(e) = stream.play() {
                error!("failed to start audio stream: {e}");
                return None;
            }
            info!(
                "Opened audio output at {} Hz, {} channel(s)",
                config.sample_rate.0, config.channels
            );

            Some(Self {
                device,
                sample_format,
                config: RefCell::new(config),
                stream: RefCell::new(stream),
                lock,
                samples,
            })
        }
    }

    fn build_stream(
        device: &cpal::Device,
        sample_format: cpal::SampleFormat,
        config: &cpal::StreamConfig,
        lock: &Arc<CallbackLock>,
        samples: &Receiver<StereoFrame>,
    ) -> Option<cpal::Stream> {
        let channels = config.channels as usize;
        let err_fn = |err| error!("cpal stream error: {err}");

        let result = match sample_format {
            cpal::SampleFormat::F32 => {
                let lock = Arc::clone(lock);
                let samples = samples.clone();
                device.build_output_stream(
                    config,
                    move |data: &mut [f32], _| {
                        lock.run_callback(|| {
                            for frame in data.chunks_mut(channels) {
                                let [left, right] = samples.try_recv().unwrap_or([0.0, 0.0]);
                                frame[0] = left;
                                if channels > 1 {
                                    frame[1] = right;
                                }
                            }
                        })
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let lock = Arc::clone(lock);
                let samples = samples.clone();
                device.build_output_stream(
                    config,
                    move |data: &mut [i16], _| {
                        lock.run_callback(|| {
                            for frame in data.chunks_mut(channels) {
                                let [left, right] = samples.try_recv().unwrap_or([0.0, 0.0]);
                                frame[0] = (left.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                                if channels > 1 {
                                    frame[1] = (right.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                                }
                            }
                        })
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                error!("unsupported sample format {other:?}");
                return None;
            }
        };

        match result {
            Ok(stream) => Some(stream),
            Err(e) => {
                error!("failed to build audio stream: {e}");
                None
            }
        }
    }

    impl AudioDevice for CpalDevice {
        fn lock(&self) {
            self.lock.lock();
        }

        fn unlock(&self) {
            self.lock.unlock();
        }

        /// Rebuild the stream at `rate`; the old stream keeps playing if the
        /// host rejects it.
        fn set_sample_rate(&self, rate: u32) {
            let mut config = self.config.borrow().clone();
            config.sample_rate = cpal::SampleRate(rate);
            let Some(stream) = build_stream(
                &self.device,
                self.sample_format,
                &config,
                &self.lock,
                &self.samples,
            ) else {
                warn!("keeping {} Hz output", self.config.borrow().sample_rate.0);
                return;
            };
            if let Err(e) = stream.play() {
                warn!("failed to restart audio stream at {rate} Hz: {e}");
                return;
            }
            *self.stream.borrow_mut() = stream;
            *self.config.borrow_mut() = config;
        }

        fn pause(&self) {
            if let Err(e) = self.stream.borrow().pause() {
                warn!("failed to pause audio stream: {e}");
            }
        }

        fn resume(&self) {
            if let Err(e) = self.stream.borrow().play() {
                warn!("failed to resume audio stream: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_device_drains_samples() {
        let (tx, rx) = sample_channel(4096);
        let device = DetachedDevice::open(rx);
        for _ in 0..2000 {
            tx.try_send([0.0, 0.0]).unwrap();
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !tx.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(DRAIN_PERIOD);
        }
        assert!(tx.is_empty());
        drop(device);
    }

    #[test]
    fn locked_device_holds_samples() {
        let (tx, rx) = sample_channel(64);
        let device = DetachedDevice::open(rx);
        device.lock();
        for _ in 0..64 {
            tx.try_send([0.0, 0.0]).unwrap();
        }
        std::thread::sleep(DRAIN_PERIOD * 5);
        assert_eq!(tx.len(), 64);
        device.unlock();
    }
}
