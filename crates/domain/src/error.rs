/// Shared error type used across all LinkBridge crates.
///
/// Directory lookups and link writes both report failures through this
/// type. A missing account is never an error: lookups return `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("auth: {0}")]
    Auth(String),

    /// The directory answered, but reported a failure (non-2xx status or
    /// a GraphQL `errors` array).
    #[error("directory: {0}")]
    Directory(String),

    /// The directory answered with a payload we could not interpret.
    #[error("decode: {0}")]
    Decode(String),

    /// A write would attach one side of the pair to a second counterpart.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure happened before the remote side gave a usable
    /// answer (network, timeout). Used only for log classification.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
