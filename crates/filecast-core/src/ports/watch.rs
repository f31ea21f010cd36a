//! Change hints
//!
//! Adapters that can observe their back-end (inotify for the local
//! filesystem, push channels for some remotes) expose a [`ChangeHint`]. A hint
//! only means "something in this directory may have changed, poll now"; it
//! is not a guaranteed-delivery event stream.

use tokio::sync::mpsc;

// ============================================================================
// WatchHandle
// ============================================================================

/// RAII handle for an active back-end watch
///
/// When this handle is dropped, the associated watch is stopped and its
/// resources are released.
///
/// ```ignore
/// let hint = adapter.change_hints(&dir).await?;
/// // ... watch is active ...
/// drop(hint); // watch is stopped
/// ```
pub struct WatchHandle {
    /// Callback to invoke when the handle is dropped to stop the watch
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    /// Creates a new WatchHandle with the given stop callback
    ///
    /// The callback will be invoked exactly once when the handle is dropped.
    pub fn new(stop_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop_fn: Some(Box::new(stop_fn)),
        }
    }

    /// Explicitly stops the watch, consuming the handle
    pub fn stop(mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.stop_fn.is_some())
            .finish()
    }
}

// ============================================================================
// ChangeHint
// ============================================================================

/// Stream of "poll now" hints for one directory
#[derive(Debug)]
pub struct ChangeHint {
    /// Receives one `()` per coalesced burst of back-end changes
    pub receiver: mpsc::Receiver<()>,
    /// Keeps the underlying watch alive
    pub handle: WatchHandle,
}

impl ChangeHint {
    /// Build a hint channel; the sender side is handed to the watcher
    ///
    /// Capacity is one: a burst of changes collapses into a single pending
    /// hint, which is all a poller needs.
    pub fn channel(handle_for: impl FnOnce(mpsc::Sender<()>) -> WatchHandle) -> Self {
        let (tx, receiver) = mpsc::channel(1);
        let handle = handle_for(tx);
        Self { receiver, handle }
    }

    /// Like [`ChangeHint::channel`] for watchers whose setup can fail
    pub fn try_channel<E>(
        handle_for: impl FnOnce(mpsc::Sender<()>) -> Result<WatchHandle, E>,
    ) -> Result<Self, E> {
        let (tx, receiver) = mpsc::channel(1);
        let handle = handle_for(tx)?;
        Ok(Self { receiver, handle })
    }
}
