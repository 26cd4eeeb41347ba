use strum_macros::{AsRefStr, Display};

/// Broad classification of a failed fetch, used for logs and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Malformed,
    Task,
}

/// Errors produced while fetching a single endpoint.
///
/// These never reach callers of the cache; they are logged, counted and
/// turned into an empty product list.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    #[error("undecodable body from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
    #[error("fetch task for {endpoint} did not complete: {reason}")]
    Task { endpoint: String, reason: String },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Connection { .. } | FetchError::Status { .. } => ErrorKind::Transport,
            FetchError::Malformed { .. } | FetchError::Decode { .. } => ErrorKind::Malformed,
            FetchError::Task { .. } => ErrorKind::Task,
        }
    }

    /// Whether the failed listing is stored as empty.
    ///
    /// Only a well-formed JSON body of the wrong shape is; a body that is not
    /// JSON at all is retried on the next call.
    pub fn caches_as_empty(&self) -> bool {
        matches!(self, FetchError::Malformed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let status = FetchError::Status {
            endpoint: "/api/fences?category=granite".to_string(),
            status: 502,
        };
        assert_eq!(status.kind(), ErrorKind::Transport);
        assert_eq!(status.kind().to_string(), "transport");

        let malformed = FetchError::Malformed {
            endpoint: "/api/fences?category=granite".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(malformed.kind().as_ref(), "malformed");
        assert!(malformed.caches_as_empty());

        let decode = FetchError::Decode {
            endpoint: "/api/fences?category=granite".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(decode.kind(), ErrorKind::Malformed);
        assert!(!decode.caches_as_empty());
        assert!(!status.caches_as_empty());
    }
}
