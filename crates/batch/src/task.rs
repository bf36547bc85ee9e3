use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A flag shared between a work item and the pool that owns its slot.
///
/// Blocking work cannot be interrupted from outside, so a timed-out work item
/// is asked to stop and then awaited: its slot stays taken until every
/// thread it started has returned.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl Cancel {
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag is read, so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        Ok(())
    }
}

/// Run synchronous, CPU- or disk-heavy work on the blocking thread pool.
///
/// A panic inside `f` is resumed on the calling task so it reaches the worker
/// pool boundary like any other crash in the work item.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(e).or_raise(|| ErrorKind::WorkerCrash("blocking task cancelled".to_string())),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value() {
        assert_eq!(blocking(|| 21 * 2).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let cancel = Cancel::default();
        let waiter = tokio::spawn({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        });
        assert!(cancel.check().is_ok());
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert_eq!(*cancel.check().unwrap_err(), ErrorKind::Cancelled);
        // Already cancelled: resolves immediately.
        cancel.cancelled().await;
    }

    #[tokio::test]
    async fn panics_propagate_to_the_caller() {
        let handle = tokio::spawn(blocking(|| -> u8 { panic!("boom") }));
        let err = handle.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(panic_message(err.into_panic().as_ref()), "boom");
    }
}
