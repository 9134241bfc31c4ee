/// Upper bound for a single backoff sleep.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Exponential backoff for the given 1-based attempt, capped at [`MAX_BACKOFF_MS`].
///
/// A zero base disables backoff entirely.
pub fn next_backoff_ms(base_delay_ms: u64, attempt: usize) -> u64 {
    if base_delay_ms == 0 {
        return 0;
    }
    let shift = attempt.saturating_sub(1).min(6) as u32;
    base_delay_ms
        .saturating_mul(1_u64 << shift)
        .min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::{next_backoff_ms, MAX_BACKOFF_MS};

    #[test]
    fn unit_backoff_doubles_per_attempt() {
        assert_eq!(next_backoff_ms(100, 1), 100);
        assert_eq!(next_backoff_ms(100, 2), 200);
        assert_eq!(next_backoff_ms(100, 3), 400);
    }

    #[test]
    fn unit_zero_base_disables_backoff() {
        assert_eq!(next_backoff_ms(0, 5), 0);
    }

    #[test]
    fn regression_backoff_is_capped() {
        assert_eq!(next_backoff_ms(10_000, 50), MAX_BACKOFF_MS);
        assert_eq!(next_backoff_ms(u64::MAX, 7), MAX_BACKOFF_MS);
    }
}
