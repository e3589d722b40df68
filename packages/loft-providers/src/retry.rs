use std::time::Duration;

use color_eyre::Result;

/// Transient failure signatures worth retrying. Anything else propagates
/// immediately.
const RETRYABLE_PATTERNS: [&str; 9] = [
	"connection reset",
	"connection refused",
	"timed out",
	"timeout",
	"rate limit",
	"too many requests",
	"502",
	"503",
	"504",
];

pub fn is_retryable(message: &str) -> bool {
	let lowered = message.to_lowercase();

	RETRYABLE_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// Exponential backoff: initial * multiplier^(attempt-1), capped.
pub fn backoff_delay(cfg: &loft_config::Retry, attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	let factor = (cfg.backoff_multiplier as u64).saturating_pow(exponent);
	let delay = cfg.initial_delay_ms.saturating_mul(factor).min(cfg.max_delay_ms);

	Duration::from_millis(delay)
}

/// Runs `op`, retrying transient failures with exponential backoff up to
/// `cfg.max_attempts` extra attempts. Non-retryable errors short-circuit.
pub async fn retry_with_backoff<T, F, Fut>(
	cfg: &loft_config::Retry,
	label: &str,
	mut op: F,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut attempt = 0;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) => {
				attempt += 1;

				if attempt > cfg.max_attempts || !is_retryable(&err.to_string()) {
					return Err(err);
				}

				let delay = backoff_delay(cfg, attempt);

				tracing::warn!(
					%label,
					attempt,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Retrying after transient error."
				);
				tokio::time::sleep(delay).await;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg() -> loft_config::Retry {
		loft_config::Retry {
			max_attempts: 3,
			initial_delay_ms: 1_000,
			max_delay_ms: 30_000,
			backoff_multiplier: 2,
		}
	}

	#[test]
	fn recognizes_transient_signatures() {
		assert!(is_retryable("Connection reset by peer"));
		assert!(is_retryable("HTTP status server error (503 Service Unavailable)"));
		assert!(is_retryable("request timed out"));
		assert!(!is_retryable("invalid api key"));
		assert!(!is_retryable("404 not found"));
	}

	#[test]
	fn backoff_doubles_then_caps() {
		let cfg = cfg();

		assert_eq!(backoff_delay(&cfg, 1), Duration::from_millis(1_000));
		assert_eq!(backoff_delay(&cfg, 2), Duration::from_millis(2_000));
		assert_eq!(backoff_delay(&cfg, 3), Duration::from_millis(4_000));
		assert_eq!(backoff_delay(&cfg, 10), Duration::from_millis(30_000));
	}

	#[tokio::test]
	async fn retries_transient_errors_until_success() {
		let mut cfg = cfg();

		cfg.initial_delay_ms = 1;
		cfg.max_delay_ms = 1;

		let mut calls = 0;
		let result = retry_with_backoff(&cfg, "test", || {
			calls += 1;

			let attempt = calls;

			async move {
				if attempt < 3 {
					Err(color_eyre::eyre::eyre!("connection reset"))
				} else {
					Ok(attempt)
				}
			}
		})
		.await;

		assert_eq!(result.expect("retry failed"), 3);
		assert_eq!(calls, 3);
	}

	#[tokio::test]
	async fn non_retryable_errors_short_circuit() {
		let cfg = cfg();
		let mut calls = 0;
		let result: Result<()> = retry_with_backoff(&cfg, "test", || {
			calls += 1;

			async { Err(color_eyre::eyre::eyre!("invalid api key")) }
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls, 1);
	}
}
