//! Error types for sonarsearch.

use std::time::Duration;
use thiserror::Error;

/// Error type for sonarsearch operations.
///
/// Every query-level failure is reported through this type and carried on the
/// query's response; none of them take down a dispatcher worker.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty query string
    #[error("query cannot be blank")]
    BlankQuery,

    /// Malformed IPv4 address or CIDR block
    #[error("invalid IPv4 address or CIDR: {0}")]
    InvalidAddress(String),

    /// IPv6 input
    #[error("IPv6 is not supported: {0}")]
    UnsupportedAddressFamily(String),

    /// No index entry for the derived key
    #[error("no results found for {0}")]
    NotFound(String),

    /// A single cursor step exceeded its wall-clock budget
    #[error("timeout retrieving entry for {query} (budget {budget:?})")]
    ScanTimeout { query: String, budget: Duration },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reverse-range query spans more addresses than policy allows
    #[error("range {cidr} is too large: /{prefix_len} is broader than /{min_prefix_len}")]
    LargeRangeRejected {
        cidr: String,
        prefix_len: u8,
        min_prefix_len: u8,
    },

    /// Dataset line that does not parse as a record
    #[error("malformed dataset record: {0:?}")]
    MalformedRecord(String),

    /// Index file line with an unparsable offset
    #[error("invalid index entry: {0:?}")]
    InvalidIndexEntry(String),

    /// Remote index transport or status failure
    #[error("remote index error: {0}")]
    Remote(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The dispatcher has shut down and accepts no more queries
    #[error("dispatcher is closed")]
    DispatcherClosed,

    /// A job panicked inside a worker
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Whether this error should be surfaced to operators.
    ///
    /// Timeouts and dataset IO failures point at storage trouble rather
    /// than bad input.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            Error::ScanTimeout { .. } | Error::Io(_) | Error::MalformedRecord(_) | Error::Remote(_)
        )
    }
}

/// Result type alias for sonarsearch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operational_errors() {
        let timeout = Error::ScanTimeout {
            query: "acme.com".to_string(),
            budget: Duration::from_millis(100),
        };
        assert!(timeout.is_operational());
        assert!(Error::Io(std::io::Error::other("disk gone")).is_operational());
        assert!(!Error::BlankQuery.is_operational());
        assert!(!Error::NotFound("acme".to_string()).is_operational());
    }

    #[test]
    fn test_display() {
        let err = Error::LargeRangeRejected {
            cidr: "10.0.0.0/8".to_string(),
            prefix_len: 8,
            min_prefix_len: 16,
        };
        assert_eq!(
            err.to_string(),
            "range 10.0.0.0/8 is too large: /8 is broader than /16"
        );
        assert_eq!(Error::BlankQuery.to_string(), "query cannot be blank");
    }
}
