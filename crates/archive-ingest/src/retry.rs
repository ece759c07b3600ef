use chrono::{DateTime, Duration, Utc};

/// Whether another attempt is allowed after `attempt_count` failures
/// against `max_attempts`. A non-positive `max_attempts` disables retries
/// entirely — the first failure dead-letters the job.
pub fn should_retry(attempt_count: i32, max_attempts: i32) -> bool {
    if max_attempts <= 0 {
        return false;
    }
    attempt_count < max_attempts
}

/// Exponential backoff: `base * 2^(attempt-1)`, clamped to `max_seconds`.
/// `attempt_count` below 1 is treated as 1, matching the original's
/// `max(1, attempt_count)` guard.
pub fn compute_backoff_seconds(attempt_count: i32, base_seconds: i64, max_seconds: i64) -> i64 {
    let safe_attempt = attempt_count.max(1) as u32;
    let safe_base = base_seconds.max(1);
    let safe_max = max_seconds.max(safe_base);

    let backoff = safe_base.saturating_mul(1i64.checked_shl(safe_attempt.saturating_sub(1)).unwrap_or(i64::MAX));
    backoff.min(safe_max)
}

pub fn compute_retry_after(attempt_count: i32, base_seconds: i64, max_seconds: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(compute_backoff_seconds(attempt_count, base_seconds, max_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt_until_capped() {
        assert_eq!(compute_backoff_seconds(1, 30, 1800), 30);
        assert_eq!(compute_backoff_seconds(2, 30, 1800), 60);
        assert_eq!(compute_backoff_seconds(3, 30, 1800), 120);
        assert_eq!(compute_backoff_seconds(10, 30, 1800), 1800);
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        assert!(should_retry(2, 5));
        assert!(!should_retry(5, 5));
        assert!(!should_retry(0, 0));
    }
}
