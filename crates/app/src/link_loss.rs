//! Set-once link-loss signal shared between a liveness monitor and the
//! session loop.
//!
//! A fresh [`LinkLoss`] is created for every connection attempt. It has a
//! single transition (clear → set) and is never reset.

use std::sync::Arc;

use tokio::sync::watch;

/// Writer/reader handle for one connection's link-loss flag.
#[derive(Debug, Clone)]
pub struct LinkLoss {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for LinkLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkLoss {
    #[must_use]
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Mark the link as lost. Returns `true` only for the call that
    /// performed the transition.
    pub fn set(&self) -> bool {
        self.flag.send_if_modified(|lost| {
            if *lost {
                false
            } else {
                *lost = true;
                true
            }
        })
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolve once the flag is set (immediately if it already is).
    pub async fn lost(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a closed
        // channel while this future is alive.
        let _ = rx.wait_for(|lost| *lost).await;
    }
}
