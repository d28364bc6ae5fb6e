//! Debouncer
//!
//! Collapses rapid edit bursts into a single analysis task per key.
//! `execute_later` extends the pending window by bumping the key's
//! version so earlier timers discard themselves on wake; `execute_now`
//! cancels any pending timer and runs immediately; `shutdown` rejects
//! further submissions and orphans pending timers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Inner {
    versions: Mutex<HashMap<String, u64>>,
    shut: AtomicBool,
}

impl Inner {
    fn bump(&self, key: &str) -> u64 {
        let mut versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        let version = versions.entry(key.to_string()).or_insert(0);
        *version += 1;
        *version
    }

    fn current(&self, key: &str) -> u64 {
        let versions = self.versions.lock().unwrap_or_else(|e| e.into_inner());
        versions.get(key).copied().unwrap_or(0)
    }
}

pub struct Debouncer {
    delay: Duration,
    inner: Arc<Inner>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            inner: Arc::new(Inner {
                versions: Mutex::new(HashMap::new()),
                shut: AtomicBool::new(false),
            }),
        }
    }

    /// Schedule `task` after the debounce delay. A newer submission for
    /// the same key supersedes this one.
    pub fn execute_later<F, Fut>(&self, key: &str, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.inner.shut.load(Ordering::SeqCst) {
            return;
        }
        let version = self.inner.bump(key);
        let key = key.to_string();
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inner.shut.load(Ordering::SeqCst) || inner.current(&key) != version {
                return;
            }
            task().await;
        });
    }

    /// Cancel any pending timer for the key and run immediately.
    pub async fn execute_now<F, Fut>(&self, key: &str, task: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.inner.shut.load(Ordering::SeqCst) {
            return;
        }
        self.inner.bump(key);
        task().await;
    }

    /// Reject further submissions; pending timers wake and discard.
    pub fn shutdown(&self) {
        self.inner.shut.store(true, Ordering::SeqCst);
        let mut versions = self
            .inner
            .versions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        versions.clear();
    }
}
