//! The salt search loop.
//!
//! A single sequential search: hash the message, score leading zero bits,
//! bump the salt, repeat. Progress is reported only on a new best score or
//! on a coarse heartbeat so observers are not flooded by a loop that may
//! run millions of iterations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::message::CandidateMessage;

/// Salt interval between liveness heartbeats.
pub const HEARTBEAT_INTERVAL: u64 = 10_000;

/// Iterations between cooperative yields back to the runtime.
const YIELD_INTERVAL: u64 = 1024;

/// Counts leading zero bits across a digest, scanning bytes in order.
///
/// The scan stops at the first byte contributing fewer than 8 leading zero
/// bits; zero bits deeper in the digest do not count. Matches the faucet
/// verifier exactly.
pub fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut total = 0;
    for zeros in digest.iter().map(|b| b.leading_zeros()) {
        total += zeros;
        if zeros < 8 {
            break;
        }
    }
    total
}

/// A progress observation from an in-flight search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressReport {
    /// A salt scored strictly better than every salt before it.
    Best {
        salt: u64,
        zero_bits: u32,
        /// `floor(zero_bits * 100 / min_difficulty)`.
        percent: u32,
    },
    /// Liveness signal: the search is still advancing without a new best.
    Heartbeat { salt: u64 },
}

/// Generation-stamped cancellation token.
///
/// A token is cancelled once the shared attempt counter has moved past the
/// generation it was minted for, so a superseded search can never outlive
/// the attempt that replaced it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl CancelToken {
    pub fn new(current: Arc<AtomicU64>, generation: u64) -> Self {
        Self {
            current,
            generation,
        }
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            generation: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

/// Best-so-far tracking for one mining run.
#[derive(Debug, Default)]
struct MiningProgress {
    best_zero_bits: u32,
    best_salt: u64,
    last_reported_salt: u64,
}

/// Grind salts until the message hashes with at least `min_difficulty` bits
/// of leading zeros.
///
/// Returns `Some(salt)` on success and `None` only when `cancel` fires;
/// the search itself has no failure mode and is unbounded by design, so
/// wall-clock exposure is the caller's responsibility.
///
/// The salt starts at zero and advances by an in-place carry-propagating
/// byte increment, keeping the loop allocation-free. Every
/// [`YIELD_INTERVAL`] iterations the loop yields to the runtime so
/// progress delivery and other tasks are not starved.
pub async fn mine<F>(
    message: &mut CandidateMessage,
    min_difficulty: u32,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Option<u64>
where
    F: FnMut(ProgressReport),
{
    let mut progress = MiningProgress::default();
    let mut salt: u64 = 0;

    loop {
        let digest = Sha256::digest(message.bytes());
        let zero_bits = leading_zero_bits(&digest);

        if zero_bits >= min_difficulty {
            return Some(salt);
        }

        if zero_bits > progress.best_zero_bits {
            progress.best_zero_bits = zero_bits;
            progress.best_salt = salt;
            progress.last_reported_salt = salt;
            on_progress(ProgressReport::Best {
                salt,
                zero_bits,
                percent: zero_bits * 100 / min_difficulty,
            });
        } else if salt % HEARTBEAT_INTERVAL == 0 {
            progress.last_reported_salt = salt;
            on_progress(ProgressReport::Heartbeat { salt });
        }

        if cancel.is_cancelled() {
            return None;
        }

        if salt % YIELD_INTERVAL == 0 {
            tokio::task::yield_now().await;
        }

        message.increment_salt();
        salt = salt.wrapping_add(1);
    }
}
