//! One-shot readiness signal and listener task guard

use std::sync::Mutex;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Resolves its receiver exactly once; later `fire` calls are no-ops.
#[derive(Debug)]
pub struct ReadySignal {
  sender: Mutex<Option<oneshot::Sender<()>>>,
}

impl ReadySignal {
  /// Signal and the receiver it resolves.
  pub fn new() -> (Self, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    (
      Self {
        sender: Mutex::new(Some(tx)),
      },
      rx,
    )
  }

  /// Resolves the receiver. Returns `true` only for the call that did so.
  pub fn fire(&self) -> bool {
    let sender = self
      .sender
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .take();
    match sender {
      // A dropped receiver still consumes the signal.
      Some(tx) => {
        let _ = tx.send(());
        true
      }
      None => false,
    }
  }

  /// `fire` has been called.
  pub fn has_fired(&self) -> bool {
    self
      .sender
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .is_none()
  }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub struct ListenerGuard<T>(pub JoinHandle<T>);

impl<T> Drop for ListenerGuard<T> {
  fn drop(&mut self) {
    self.0.abort();
  }
}
