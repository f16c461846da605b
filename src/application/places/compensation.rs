//! Compensating actions for multi-step writes
//!
//! A workflow records one undo step for every external side effect it
//! performs. If a later step fails, [`CompensationLog::unwind`] runs the
//! recorded steps newest-first. Undo failures are logged and counted,
//! never returned: an orphaned object is an accepted cost, a failed
//! request because of one is not.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::application::ports::ImageStore;
use crate::shared::{with_timeout, DomainError};

/// An undo step for a side effect that already happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    DeleteImage { key: String },
}

/// Stack of undo steps for one workflow invocation.
pub struct CompensationLog {
    images: Arc<dyn ImageStore>,
    timeout: Duration,
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new(images: Arc<dyn ImageStore>, timeout: Duration) -> Self {
        Self {
            images,
            timeout,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The workflow committed; forget every recorded step.
    pub fn complete(self) {
        debug!(steps = self.len(), "Compensation log discarded");
    }

    /// The workflow aborted; undo recorded steps in reverse order.
    pub async fn unwind(self) {
        if self.is_empty() {
            return;
        }
        info!(steps = self.len(), "Unwinding compensation log");

        for step in self.steps.into_iter().rev() {
            match step {
                Compensation::DeleteImage { key } => {
                    discard_image(self.images.as_ref(), &key, self.timeout, "delete_image").await;
                }
            }
        }
    }
}

/// Best-effort removal of a stored image.
///
/// `action` labels the metric and log line (`delete_image` for rollback,
/// `image_cleanup` for post-commit cleanup).
pub async fn discard_image(
    images: &dyn ImageStore,
    key: &str,
    limit: Duration,
    action: &'static str,
) -> bool {
    let result = with_timeout(limit, "image delete", images.delete(key), DomainError::Storage).await;

    match result {
        Ok(()) => {
            metrics::counter!("compensations_total", "action" => action, "outcome" => "ok")
                .increment(1);
            debug!(key, action, "Image removed");
            true
        }
        Err(e) => {
            metrics::counter!("compensations_total", "action" => action, "outcome" => "failed")
                .increment(1);
            warn!(key, action, error = %e, "Failed to remove image; object is orphaned");
            false
        }
    }
}
