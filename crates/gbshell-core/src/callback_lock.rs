use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Device-side half of the audio gate for devices whose playback callback
/// runs on its own thread.
///
/// `lock` waits for an in-flight callback to return and then holds every
/// later callback off until `unlock`.
#[derive(Debug, Default)]
pub struct CallbackLock {
    locked: Mutex<bool>,
    unlocked: Condvar,
}

impl CallbackLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock(&self) {
        let mut locked = self.state();
        debug_assert!(!*locked, "callback lock is not reentrant");
        *locked = true;
    }

    pub fn unlock(&self) {
        let mut locked = self.state();
        debug_assert!(*locked, "callback lock released while not held");
        *locked = false;
        drop(locked);
        self.unlocked.notify_all();
    }

    pub fn is_locked(&self) -> bool {
        *self.state()
    }

    /// Run one playback callback. Waits while the lock is held and keeps it
    /// from being taken until `f` returns.
    pub fn run_callback<R>(&self, f: impl FnOnce() -> R) -> R {
        let locked = self.state();
        let _running = self
            .unlocked
            .wait_while(locked, |locked| *locked)
            .unwrap_or_else(PoisonError::into_inner);
        f()
    }
}
