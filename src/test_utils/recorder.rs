use std::sync::{Arc, Mutex, MutexGuard};

use alloy::rpc::types::Log;

use crate::{DecodedLog, WatchConfig, WatchError};

/// Items that carry the log they were made from.
pub trait AsLog {
    fn as_log(&self) -> &Log;
}

impl AsLog for Log {
    fn as_log(&self) -> &Log {
        self
    }
}

impl AsLog for DecodedLog {
    fn as_log(&self) -> &Log {
        &self.log
    }
}

/// Collects what a watch delivers and reports.
///
/// ```ignore
/// let recorder = Recorder::new();
/// let handle = watcher.watch(criteria, recorder.config())?;
/// // ...
/// assert_eq!(recorder.batches().len(), 1);
/// ```
#[derive(Debug)]
pub struct Recorder<T> {
    batches: Arc<Mutex<Vec<Vec<T>>>>,
    errors: Arc<Mutex<Vec<WatchError>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self { batches: self.batches.clone(), errors: self.errors.clone() }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self { batches: Arc::default(), errors: Arc::default() }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A config whose handlers record into this recorder.
    #[must_use]
    pub fn config(&self) -> WatchConfig<T> {
        let batches = self.batches.clone();
        let errors = self.errors.clone();
        WatchConfig::new(move |logs| lock(&batches).push(logs))
            .on_error(move |err| lock(&errors).push(err))
    }

    /// Every delivery so far, one entry per `on_logs` call.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<T>> {
        lock(&self.batches).clone()
    }

    /// Every delivered item, flattened across deliveries.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        lock(&self.batches).iter().flatten().cloned().collect()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<WatchError> {
        lock(&self.errors).clone()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
