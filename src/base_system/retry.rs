//! 重试/退避策略。
//!
//! 所有分块共用同一个 `RetryPolicy`：次数和延迟在一次运行中固定不变。

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Constant,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Constant,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.base_delay);
        let wait = match self.backoff {
            Backoff::Constant => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(attempt.saturating_add(1)),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        wait.min(cap)
    }

    /// 执行 `op`，失败时记录原因并按策略等待后重试。
    ///
    /// `op` receives the zero-based attempt index. At least one attempt is
    /// always made. Errors rejected by `retryable` are returned immediately;
    /// when every attempt fails the last error is returned. No delay follows
    /// the final failure.
    pub fn run<T, E, F, P>(&self, what: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) => {
                    if attempt + 1 >= attempts {
                        warn!(
                            target: "retry",
                            "giving up on {} after {} attempts ({})",
                            what,
                            attempts,
                            err
                        );
                        return Err(err);
                    }
                    warn!(
                        target: "retry",
                        "retrying {}/{} {} ({})",
                        attempt + 1,
                        attempts,
                        what,
                        err
                    );
                    let delay = self.delay_for(attempt);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
