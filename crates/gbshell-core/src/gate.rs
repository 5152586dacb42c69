use std::cell::Cell;
use std::ops::Deref;

use log::trace;

use crate::backend::AudioDevice;

/// Scoped ownership of the audio device's callback lock.
///
/// Only one [`GateGuard`] may exist at a time; a second `acquire` while one is
/// alive is a bug and panics rather than deadlocking the device.
#[derive(Debug)]
pub struct AudioGate<D: AudioDevice> {
    device: D,
    held: Cell<bool>,
}

impl<D: AudioDevice> AudioGate<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            held: Cell::new(false),
        }
    }

    /// Block the audio callback until the returned guard is dropped.
    pub fn acquire(&self) -> GateGuard<'_, D> {
        assert!(
            !self.held.replace(true),
            "audio gate acquired while already held"
        );
        self.device.lock();
        trace!("audio gate acquired");
        GateGuard { gate: self }
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }

    /// Device access for calls that do not touch callback state.
    pub fn device(&self) -> &D {
        &self.device
    }

    fn release(&self) {
        assert!(self.held.replace(false), "audio gate released while not held");
        self.device.unlock();
        trace!("audio gate released");
    }
}

#[must_use = "the audio gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GateGuard<'a, D: AudioDevice> {
    gate: &'a AudioGate<D>,
}

impl<D: AudioDevice> Deref for GateGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.gate.device
    }
}

impl<D: AudioDevice> Drop for GateGuard<'_, D> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Trace(RefCell<Vec<&'static str>>);

    impl AudioDevice for Trace {
        fn lock(&self) {
            self.0.borrow_mut().push("lock");
        }
        fn unlock(&self) {
            self.0.borrow_mut().push("unlock");
        }
        fn set_sample_rate(&self, _rate: u32) {
            self.0.borrow_mut().push("rate");
        }
        fn pause(&self) {}
        fn resume(&self) {}
    }

    #[test]
    fn guard_locks_and_unlocks_once() {
        let gate = AudioGate::new(Trace::default());
        {
            let guard = gate.acquire();
            assert!(gate.is_held());
            guard.set_sample_rate(48_000);
        }
        assert!(!gate.is_held());
        assert_eq!(*gate.device().0.borrow(), ["lock", "rate", "unlock"]);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn fallible(gate: &AudioGate<Trace>) -> Result<(), ()> {
            let _guard = gate.acquire();
            Err(())
        }

        let gate = AudioGate::new(Trace::default());
        assert!(fallible(&gate).is_err());
        assert!(!gate.is_held());
        assert_eq!(*gate.device().0.borrow(), ["lock", "unlock"]);
    }

    #[test]
    #[should_panic(expected = "already held")]
    fn double_acquire_panics() {
        let gate = AudioGate::new(Trace::default());
        let _first = gate.acquire();
        let _second = gate.acquire();
    }

    #[test]
    fn gate_can_be_reacquired_after_release() {
        let gate = AudioGate::new(Trace::default());
        drop(gate.acquire());
        drop(gate.acquire());
        assert_eq!(
            *gate.device().0.borrow(),
            ["lock", "unlock", "lock", "unlock"]
        );
    }
}
