pub mod callbacks;
pub mod dispatch;
pub mod error;
pub mod gamepad;
#[cfg(test)]
pub mod gamepad_test;
pub mod manager;
pub mod names;
pub mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock the given mutex, recovering the data if a previous holder panicked.
/// A panicking callback must not make the session unusable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
