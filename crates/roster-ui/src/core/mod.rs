//! Framework-agnostic controller building blocks.

pub mod actions;
pub mod collection;
pub mod confirm;
pub mod export;
pub mod filters;
pub mod schedule;
pub mod selection;
pub mod toast;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
