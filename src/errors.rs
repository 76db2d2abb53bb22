//! Error types surfaced by address parsing, the protocol registry and the
//! resolution subsystems.

use thiserror::Error;

/// Errors produced while tokenizing the text or binary form of an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown protocol code {0}")]
    UnknownProtocolCode(u64),
    #[error("unknown protocol name `{0}`")]
    UnknownProtocolName(String),
    #[error("address ends inside a component")]
    Truncated,
    #[error("unexpected data after the last component")]
    TrailingGarbage,
    #[error("protocol `{0}` requires a value")]
    MissingValue(String),
    #[error("protocol `{0}` takes no value")]
    UnexpectedValue(String),
    #[error("address does not start with `/`")]
    MissingLeadingSlash,
    #[error("value length {0} exceeds the component size cap")]
    ValueTooLong(usize),
    #[error("varint exceeds 63 bits")]
    VarintOverflow,
    #[error("address ends inside a varint")]
    VarintTruncated,
    #[error("non-minimal varint encoding")]
    VarintNonMinimal,
}

/// A value failed the validation rules of its protocol's codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid IP address")]
    InvalidIp,
    #[error("port is not a decimal number in [0, 65535]")]
    PortOutOfRange,
    #[error("prefix length is not a decimal number in [0, 255]")]
    PrefixOutOfRange,
    #[error("invalid base32")]
    BadBase32,
    #[error("invalid base58")]
    BadBase58,
    #[error("invalid base64")]
    BadBase64,
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("invalid multihash")]
    InvalidMultihash,
    #[error("invalid CID")]
    InvalidCid,
    #[error("empty name")]
    EmptyName,
    #[error("name contains `/`")]
    InvalidDomain,
    #[error("value is not valid UTF-8")]
    InvalidUtf8,
}

/// Protocol registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("protocol `{0}` is already registered")]
    Duplicate(String),
    #[error("protocol `{0}` is not registered")]
    NotFound(String),
    #[error("`{0}` is not a valid protocol name")]
    InvalidName(String),
}

/// Failure of a single DNS query issued through a [`NameResolver`].
///
/// [`NameResolver`]: crate::resolver::NameResolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("name does not exist")]
    NxDomain,
    #[error("query timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// Errors produced while expanding name-based components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("resolution timed out")]
    ResolutionTimeout,
    #[error("resolution failed")]
    ResolutionFailed(#[source] DnsError),
    #[error("recursion limit reached")]
    RecursionLimit,
    #[error("resolution cancelled")]
    Cancelled,
}

/// The umbrella error type of the crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid `{proto}` value: {kind}")]
    Codec {
        proto: String,
        #[source]
        kind: CodecError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("component index {index} out of range for {len} components")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("peer id mismatch")]
    PeerIdMismatch,
}

impl Error {
    /// Attach the protocol name a codec failure was encountered under.
    pub(crate) fn codec(proto: &str, kind: CodecError) -> Self {
        Error::Codec {
            proto: proto.to_string(),
            kind,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
