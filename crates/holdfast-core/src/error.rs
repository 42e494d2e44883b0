//! Error types.

use std::error::Error;
use std::path::PathBuf;

/// Failure returned by [`RetryExecutor`](crate::retry::RetryExecutor).
///
/// Exactly one failure is ever reported per retried call: the one that
/// ended the sequence. Failures absorbed by earlier retries are dropped.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E>
where
    E: Error + 'static,
{
    /// Every attempt failed. Carries the failure of the final attempt,
    /// which may differ from what went wrong first.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last: E,
    },

    /// The policy declined to retry this failure. Returned unchanged and
    /// without waiting.
    #[error(transparent)]
    NonRetryable(E),

    /// Cancelled while an attempt or a backoff wait was pending.
    #[error("cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of attempts that ran to completion.
        attempts: u32,
        /// Most recent failure before cancellation, if any.
        last: Option<E>,
    },
}

impl<E: Error + 'static> RetryError<E> {
    /// The underlying failure, if there is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::NonRetryable(err) => Some(err),
            Self::Cancelled { last, .. } => last,
        }
    }

    /// Borrow the underlying failure, if there is one.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::NonRetryable(err) => Some(err),
            Self::Cancelled { last, .. } => last.as_ref(),
        }
    }

    /// Attempts made before giving up. `None` for a non-retryable failure,
    /// which always ends the sequence on the attempt that produced it.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => Some(*attempts),
            Self::NonRetryable(_) => None,
        }
    }

    /// The attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// The policy refused to retry.
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, Self::NonRetryable(_))
    }

    /// The sequence was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Failure loading a retry policy from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read retry config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid.
    #[error("invalid retry config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value found.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_exhausted_exposes_last_failure_as_source() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last: io::Error::other("third failure"),
        };

        assert_eq!(err.to_string(), "gave up after 3 attempts: third failure");
        assert_eq!(err.source().unwrap().to_string(), "third failure");
        assert_eq!(err.attempts(), Some(3));
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_non_retryable_is_transparent() {
        let err = RetryError::NonRetryable(io::Error::new(io::ErrorKind::InvalidInput, "bad"));

        assert_eq!(err.to_string(), "bad");
        assert!(err.is_non_retryable());
        assert_eq!(err.attempts(), None);
        assert_eq!(err.into_inner().unwrap().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_cancelled_without_failure() {
        let err: RetryError<io::Error> = RetryError::Cancelled {
            attempts: 0,
            last: None,
        };

        assert!(err.is_cancelled());
        assert!(err.inner().is_none());
        assert!(err.into_inner().is_none());
    }

    #[test]
    fn test_invalid_env_message() {
        let err = ConfigError::InvalidEnv {
            key: "HOLDFAST_RETRY_MAX_RETRIES",
            value: "lots".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "invalid value \"lots\" for HOLDFAST_RETRY_MAX_RETRIES"
        );
    }
}
