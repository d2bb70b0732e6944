use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::ratelimit::DestinationKey;
use crate::types::{ErrorKind, Result};

/// How long a waiter sleeps before re-checking the token balance.
///
/// The bucket is a polling design: waiters are not queued and race on each
/// retry, so no FIFO fairness is guaranteed under sustained contention.
/// The interval bounds the extra latency a waiter can see beyond the exact
/// refill point.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mutable bucket state, guarded by a single mutex so that the
/// refill-check-deduct sequence is one atomic critical section.
#[derive(Debug)]
struct BucketState {
    /// Current token balance, always within `[0, capacity]`
    tokens: f64,
    /// When the balance was last replenished
    last_refill: Instant,
}

/// A token bucket rate limiter for a single destination.
///
/// The bucket holds up to `capacity` tokens and regains `fill_rate` tokens
/// per second. [`TokenBucket::acquire`] suspends the caller until the
/// requested amount can be deducted in full.
///
/// A capacity of `0` disables the limiter entirely: every acquisition
/// succeeds immediately. This is how destinations without a configured
/// throttle are represented.
///
/// The lock is never held across an await point. The only suspension point
/// is the polling sleep, so a caller that abandons a pending `acquire`
/// (e.g. through an external timeout) leaves the balance exactly as if the
/// call had never started.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens the bucket can hold. `0` disables throttling.
    capacity: f64,
    /// Tokens restored per second
    fill_rate: f64,
    /// Destination this bucket throttles, used in errors and logging
    destination: Option<DestinationKey>,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a new bucket, initially full
    #[must_use]
    pub fn new(capacity: f64, fill_rate: f64) -> Self {
        Self {
            capacity,
            fill_rate,
            destination: None,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Create a new bucket labeled with the destination it throttles
    #[must_use]
    pub fn labeled(destination: DestinationKey, capacity: f64, fill_rate: f64) -> Self {
        Self {
            destination: Some(destination),
            ..Self::new(capacity, fill_rate)
        }
    }

    /// Create a permanently-open bucket that never throttles
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Whether this bucket gates anything at all
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.capacity <= 0.0
    }

    /// Maximum number of tokens the bucket can hold
    #[must_use]
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Suspend until `amount` tokens are available, then deduct them.
    ///
    /// An `amount` of zero or less is a no-op success. On a disabled bucket
    /// (capacity `0`) every acquisition succeeds immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ExceedsCapacity`] if `amount` is larger than the
    /// bucket can ever hold, or is not a finite number; waiting for a refill
    /// could never satisfy such a request, so it fails fast instead of
    /// spinning forever.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub async fn acquire(&self, amount: f64) -> Result<()> {
        // A non-finite amount can never be satisfied and would otherwise
        // slip past both guards below and spin forever
        if !amount.is_finite() {
            return Err(ErrorKind::ExceedsCapacity {
                requested: amount,
                capacity: self.capacity,
                destination: self.destination.clone(),
            });
        }
        if amount <= 0.0 || self.is_disabled() {
            return Ok(());
        }
        if amount > self.capacity {
            return Err(ErrorKind::ExceedsCapacity {
                requested: amount,
                capacity: self.capacity,
                destination: self.destination.clone(),
            });
        }

        let mut waited = false;
        loop {
            {
                let mut state = self.state.lock().unwrap();
                self.refill(&mut state);
                if state.tokens >= amount {
                    state.tokens -= amount;
                    return Ok(());
                }
            }
            if !waited {
                waited = true;
                if let Some(destination) = &self.destination {
                    log::debug!("Throttling request to `{destination}`, waiting for refill");
                }
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Current token balance after replenishment.
    ///
    /// The returned value is already stale by the time the caller sees it;
    /// use it for introspection, not for gating.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    #[must_use]
    pub fn balance(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        state.tokens
    }

    /// Add the tokens accrued since the last refill, capped at capacity
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = self
            .capacity
            .min(state.tokens + elapsed.as_secs_f64() * self.fill_rate);
        state.last_refill = now;
    }
}
