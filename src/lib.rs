//! checkconnect library
//!
//! Configuration resolution, the structured logging pipeline and the
//! singleton lifecycle guard shared by the command-line and GUI front ends.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod i18n;
pub mod logger;
pub mod logging;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
