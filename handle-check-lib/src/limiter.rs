//! Concurrency limiting for in-flight fetches.
//!
//! A counting admission gate over a tokio semaphore. Fetches hold their slot
//! for the whole retry lifecycle, backoff sleeps included, so the cap bounds
//! total outstanding server-visible load rather than just open sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gate of fixed capacity.
///
/// `acquire` suspends the caller until a slot frees; dropping the returned
/// [`Permit`] releases it. The gate also records the observed in-flight
/// high-water mark, which runs report as `peak_in_flight`.
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// An acquired limiter slot. The slot is returned when this is dropped.
pub struct Permit {
    limiter: Arc<Limiter>,
    _permit: OwnedSemaphorePermit,
}

impl Limiter {
    /// Create a limiter admitting at most `capacity` concurrent holders.
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Wait for a free slot.
    pub async fn acquire(self: &Arc<Self>) -> Permit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore closed");

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Permit {
            limiter: self.clone(),
            _permit: permit,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
