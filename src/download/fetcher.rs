//! 带重试的分块请求。

use crate::base_system::retry::RetryPolicy;
use crate::error::DownloadError;
use crate::network::RangeSource;

use super::models::ChunkRange;

pub struct RetryingFetcher<'a, S: RangeSource + ?Sized> {
    source: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: RangeSource + ?Sized> RetryingFetcher<'a, S> {
    pub fn new(source: &'a S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch `range`, retrying transport failures within the policy budget.
    ///
    /// Non-transport errors are returned at once; exhausting the budget
    /// returns the last transport error.
    pub fn fetch(&self, url: &str, range: ChunkRange) -> Result<Vec<u8>, DownloadError> {
        let what = format!("{range} of {url}");
        self.policy.run(
            &what,
            |_| self.source.fetch_range(url, range),
            DownloadError::is_retryable,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::models::ResourceDescriptor;
    use std::cell::Cell;
    use std::time::Duration;

    struct Flaky {
        failures: u32,
        calls: Cell<u32>,
        fatal: bool,
    }

    impl RangeSource for Flaky {
        fn probe(&self, url: &str) -> Result<ResourceDescriptor, DownloadError> {
            Ok(ResourceDescriptor {
                url: url.to_string(),
                total_size: 0,
            })
        }

        fn fetch_range(&self, url: &str, range: ChunkRange) -> Result<Vec<u8>, DownloadError> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if self.fatal {
                return Err(DownloadError::SizeUnavailable {
                    url: url.to_string(),
                    reason: "fatal".into(),
                });
            }
            if n < self.failures {
                return Err(DownloadError::transport(url, format!("reset #{n}")));
            }
            Ok(vec![7; range.len() as usize])
        }

        fn fetch_text(&self, _url: &str) -> Result<String, DownloadError> {
            Ok(String::new())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    const RANGE: ChunkRange = ChunkRange { from: 0, to: 4 };

    #[test]
    fn recovers_after_transient_failures() {
        let source = Flaky {
            failures: 3,
            calls: Cell::new(0),
            fatal: false,
        };
        let bytes = RetryingFetcher::new(&source, policy(5))
            .fetch("http://a/f1", RANGE)
            .unwrap();
        assert_eq!(bytes, vec![7; 4]);
        assert_eq!(source.calls.get(), 4);
    }

    #[test]
    fn exhausts_budget_and_returns_last_error() {
        let source = Flaky {
            failures: u32::MAX,
            calls: Cell::new(0),
            fatal: false,
        };
        let err = RetryingFetcher::new(&source, policy(4))
            .fetch("http://a/f1", RANGE)
            .unwrap_err();
        assert_eq!(source.calls.get(), 4);
        assert!(err.to_string().contains("reset #3"), "{err}");
    }

    #[test]
    fn non_transport_errors_are_not_retried() {
        let source = Flaky {
            failures: 0,
            calls: Cell::new(0),
            fatal: true,
        };
        let err = RetryingFetcher::new(&source, policy(10))
            .fetch("http://a/f1", RANGE)
            .unwrap_err();
        assert_eq!(source.calls.get(), 1);
        assert!(matches!(err, DownloadError::SizeUnavailable { .. }));
    }
}
