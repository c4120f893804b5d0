// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bounded retry with linear backoff for blocking calls to external services.

use crate::config::FetchConfig;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Backoff added per failed attempt
    pub step: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// Single attempt, no sleeping
    pub fn none() -> Self {
        Self::linear(1, Duration::ZERO)
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::linear(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    /// Delay before attempt `attempt + 1`, after `attempt` failures
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The closure receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, what: &str, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display + fmt::Debug,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(what, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        what,
                        attempt,
                        max_attempts = self.max_attempts,
                        "{} failed: {}, retrying in {:?}",
                        what,
                        err,
                        delay
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    warn!(what, attempt, "{} failed, giving up: {}", what, err);
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryExhausted<E: fmt::Display + fmt::Debug> {
    pub attempts: u32,
    pub last: E,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    }

    #[test]
    fn test_succeeds_on_second_attempt() {
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let mut calls = 0;
        let result: Result<u32, RetryExhausted<String>> = policy.run("flaky", |attempt| {
            calls += 1;
            if attempt < 2 {
                Err("boom".to_string())
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_exhaustion_reports_attempts() {
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let result: Result<(), _> = policy.run("always", |_| Err("down".to_string()));
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "down");
        assert_eq!(err.to_string(), "gave up after 3 attempt(s): down");
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::linear(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }
}
