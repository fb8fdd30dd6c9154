//! Change subscriptions.

use tokio::task::JoinHandle;

/// A live change listener registered with
/// [`VariableStore::on_changed`](super::VariableStore::on_changed).
///
/// The listener stops when this handle is dropped.
#[derive(Debug)]
#[must_use = "dropping a subscription stops the listener"]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) const fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Returns true while the listener is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the listener.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
