//! Retry policy for chat-completions calls: exponential backoff with optional
//! jitter, `retry-after` honoring and a total delay budget.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_SHIFT: usize = 6;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static JITTER_SEED: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_retries: usize,
    /// Zero disables the budget.
    pub(crate) budget_ms: u64,
    pub(crate) jitter: bool,
}

impl RetryPolicy {
    /// Delay to wait before retrying after `attempt` failed, or `None` when the
    /// attempt limit or the delay budget is exhausted.
    pub(crate) fn next_delay_ms(
        &self,
        attempt: usize,
        elapsed_ms: u64,
        retry_after_ms: Option<u64>,
    ) -> Option<u64> {
        if attempt >= self.max_retries {
            return None;
        }
        let mut delay_ms = backoff_ms(attempt);
        if self.jitter {
            delay_ms = jittered(delay_ms);
        }
        if let Some(retry_after_ms) = retry_after_ms {
            delay_ms = delay_ms.max(retry_after_ms);
        }
        if self.budget_ms > 0 && elapsed_ms.saturating_add(delay_ms) > self.budget_ms {
            return None;
        }
        Some(delay_ms)
    }
}

fn backoff_ms(attempt: usize) -> u64 {
    BASE_BACKOFF_MS.saturating_mul(1_u64 << attempt.min(MAX_BACKOFF_SHIFT))
}

/// Spreads `base` over `[base / 2, base]`.
fn jittered(base: u64) -> u64 {
    let low = base / 2;
    let span = base - low + 1;
    let seed = JITTER_SEED.fetch_add(1, Ordering::Relaxed);
    let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17);
    low + mixed % span
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || status >= 500
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Reads `retry-after` as delta seconds or an HTTP date.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds.saturating_mul(1_000));
    }
    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    Some(u64::try_from(delay_ms).unwrap_or(0))
}

pub(crate) fn next_request_id() -> String {
    let sequence = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("tfia-{}-{sequence}", Utc::now().timestamp_millis())
}
