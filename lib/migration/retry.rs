use std::future::Future;
use std::time::Duration;

use super::types::RetryPolicy;

/// Why a retried operation gave up, and after how many attempts.
///
/// `exhausted_retryable` distinguishes "ran out of attempts on a transient error"
/// from "hit a fatal error"; callers log and account for the two differently.
#[derive(Debug)]
pub struct RetryTerminal<E> {
    pub error: E,
    pub attempts: u32,
    pub exhausted_retryable: bool,
}

/// Drives one async operation to success or a terminal failure under `retry_policy`.
///
/// `op` receives the 1-based attempt number; `is_retryable` classifies each error.
/// Only transient errors consume further attempts, and the backoff between attempts
/// uses per-`seed` deterministic jitter so parallel workers drift apart instead of
/// thundering in lockstep.
pub async fn run_with_retry<T, E, F, Fut, R>(
    retry_policy: &RetryPolicy,
    seed: u64,
    mut op: F,
    mut is_retryable: R,
) -> Result<(T, u32), RetryTerminal<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&E) -> bool,
{
    let max_attempts = retry_policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => error,
        };

        let retryable = is_retryable(&error);
        if !retryable || attempt == max_attempts {
            return Err(RetryTerminal {
                error,
                attempts: attempt,
                exhausted_retryable: retryable,
            });
        }

        let delay = compute_backoff_delay(retry_policy, attempt, seed);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delay to sleep after failed attempt `attempt` (1-based), before the next attempt.
pub fn compute_backoff_delay(policy: &RetryPolicy, attempt: u32, seed: u64) -> Duration {
    let total_ms = exponential_delay_ms(policy, attempt).saturating_add(jitter_ms(
        policy, attempt, seed,
    ));
    Duration::from_millis(total_ms.min(u64::MAX as u128) as u64)
}

fn exponential_delay_ms(policy: &RetryPolicy, attempt: u32) -> u128 {
    if policy.initial_backoff.is_zero() {
        return 0;
    }

    // 2^20 doublings already dwarf any sane cap; clamping keeps the shift in range.
    let doublings = u32::min(attempt.saturating_sub(1), 20);
    policy
        .initial_backoff
        .as_millis()
        .saturating_mul(1u128 << doublings)
        .min(policy.max_backoff.as_millis())
}

fn jitter_ms(policy: &RetryPolicy, attempt: u32, seed: u64) -> u128 {
    let cap = policy.jitter.as_millis();
    if cap == 0 {
        return 0;
    }

    // Murmur-style finalizer over (seed, attempt); equal inputs give equal delays,
    // which keeps tests and reruns reproducible.
    let mut x = seed ^ (attempt as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;

    (x as u128) % (cap + 1)
}
