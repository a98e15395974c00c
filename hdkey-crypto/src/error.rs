use crate::bip32::DerivationError;
use crate::path::ChildNumber;
use thiserror::Error;

/// Errors that can occur while decoding Base58Check payloads.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum Base58CheckError {
    /// The input is not valid base58.
    #[error("Failed to decode base58 payload")]
    FailedToDecode,

    /// The decoded payload is too short to carry a checksum.
    #[error("Invalid base58check format")]
    InvalidFormat,

    /// The trailing checksum does not match the payload.
    #[error("Invalid base58check checksum")]
    InvalidChecksum,
}

/// Errors that can occur while decoding seed paths, walking derivation paths or
/// encoding addresses.
#[derive(Debug, Error)]
pub enum Error {
    /// A seed path did not have exactly three segments.
    #[error("path must have 3 levels ie 0/0/0, got {path:?}")]
    MalformedPath {
        /// The rejected path.
        path: String,
    },

    /// A seed path segment is not an unsigned 32-bit decimal.
    #[error("seed path segment {segment:?} is not a valid u32")]
    SegmentParse {
        /// The rejected segment.
        segment: String,
    },

    /// A derivation path segment does not match `digits[']`.
    #[error("invalid childpath segment {segment}")]
    InvalidSegment {
        /// The rejected segment.
        segment: String,
    },

    /// The digits of a derivation path segment do not fit an integer.
    #[error("child key {segment:?} is not an int")]
    NotAnInteger {
        /// The rejected segment.
        segment: String,
    },

    /// The segment parsed but does not denote a valid child index.
    #[error("child index {segment:?} is out of range")]
    IndexOutOfRange {
        /// The rejected segment.
        segment: String,
    },

    /// The key rejected a child index. The walk stops at the first failure.
    #[error("failed to derive child {child} from key")]
    ChildDerivationFailed {
        /// The child that could not be derived.
        child: ChildNumber,
        /// Reason reported by the key.
        #[source]
        cause: DerivationError,
    },

    /// The key could not produce its public key.
    #[error("failed to convert key to public key")]
    PublicKey(#[source] DerivationError),

    /// The compressed public key is not a valid curve point.
    #[error("failed to parse public key {key}")]
    PublicKeyParse {
        /// Hex encoding of the rejected bytes.
        key: String,
    },

    /// The encoded address is not between 26 and 34 characters long.
    #[error("incorrect bitcoin address size {} for {address}", .address.len())]
    InvalidAddressLength {
        /// The rejected address.
        address: String,
    },

    /// The key carries no network metadata to infer the address network from.
    #[error("network cannot be inferred from a key without network metadata")]
    UnknownNetwork,
}
