//! Observer → worker control surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Stop requests and live target adjustments for a running session.
///
/// Shared between the worker and the observer through an `Arc`.
#[derive(Debug)]
pub struct Controls {
    run: Mutex<CancellationToken>,
    reviews: Mutex<CancellationToken>,
    max_reviews: AtomicUsize,
    pending_target: Mutex<Option<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controls {
    #[must_use]
    pub fn new(max_reviews: usize) -> Self {
        let run = CancellationToken::new();
        let reviews = run.child_token();
        Self {
            run: Mutex::new(run),
            reviews: Mutex::new(reviews),
            max_reviews: AtomicUsize::new(max_reviews),
            pending_target: Mutex::new(None),
        }
    }

    /// Fresh tokens and target for a new run.
    pub(crate) fn reset(&self, max_reviews: usize) {
        let run = CancellationToken::new();
        *lock(&self.reviews) = run.child_token();
        *lock(&self.run) = run;
        self.max_reviews.store(max_reviews, Ordering::SeqCst);
        *lock(&self.pending_target) = None;
    }

    /// Cancel the whole run.
    pub fn stop(&self) {
        lock(&self.run).cancel();
    }

    /// Cancel review extraction for the current listing only.
    pub fn request_reviews_stop(&self) {
        lock(&self.reviews).cancel();
    }

    /// Change the review target. Applies to the in-flight listing at its next
    /// cycle and to every later listing. Returns `false` when `target` is zero.
    pub fn adjust_target(&self, target: usize) -> bool {
        if target == 0 {
            return false;
        }
        self.max_reviews.store(target, Ordering::SeqCst);
        *lock(&self.pending_target) = Some(target);
        true
    }

    #[must_use]
    pub fn max_reviews(&self) -> usize {
        self.max_reviews.load(Ordering::SeqCst)
    }

    pub(crate) fn take_pending_target(&self) -> Option<usize> {
        lock(&self.pending_target).take()
    }

    /// Start review extraction for a new listing: a fresh review token that
    /// also observes the run token.
    pub(crate) fn begin_reviews(&self) -> CancellationToken {
        let token = lock(&self.run).child_token();
        *lock(&self.reviews) = token.clone();
        *lock(&self.pending_target) = None;
        token
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        lock(&self.run).is_cancelled()
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(10)
    }
}
