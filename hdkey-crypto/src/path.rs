//! Derivation path grammar and path walking.
//!
//! A path is `segment ("/" segment)*` where `segment = digits [']`. The empty
//! string is the empty path and walking it returns the root unchanged.
use crate::bip32::ExtendedKey;
use crate::error::Error;
use std::fmt;
use std::str::FromStr;

const HARDENED_BIT: u32 = 1 << 31;
const HARDENED_MARKER: char = '\'';
const SEPARATOR: char = '/';

/// A child number for a derived key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ChildNumber(u32);

impl ChildNumber {
    /// Is a hard derivation.
    #[must_use]
    pub const fn is_hardened(&self) -> bool {
        self.0 & HARDENED_BIT == HARDENED_BIT
    }

    /// Is a normal derivation.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        self.0 & HARDENED_BIT == 0
    }

    /// Creates a new hard derivation.
    #[must_use]
    pub const fn hardened_from_u32(index: u32) -> Self {
        Self(index | HARDENED_BIT)
    }

    /// Creates a new soft derivation.
    #[must_use]
    pub const fn non_hardened_from_u32(index: u32) -> Self {
        Self(index)
    }

    /// Creates a child number from its raw 32-bit value, hardened if `>= 2^31`.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the index without the hardened bit.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.0 & !HARDENED_BIT
    }

    /// Returns the raw 32-bit value including the hardened bit.
    #[must_use]
    pub const fn to_u32(&self) -> u32 {
        self.0
    }

    /// Returns BIP32 byte sequence.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<ChildNumber> for u32 {
    fn from(child: ChildNumber) -> Self {
        child.0
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}{HARDENED_MARKER}", self.index())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Returns true if `segment` is one or more ASCII digits optionally followed by
/// a single hardening marker.
fn is_valid_segment(segment: &str) -> bool {
    let digits = segment.strip_suffix(HARDENED_MARKER).unwrap_or(segment);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

impl FromStr for ChildNumber {
    type Err = Error;

    fn from_str(segment: &str) -> Result<Self, Error> {
        if !is_valid_segment(segment) {
            return Err(Error::InvalidSegment { segment: segment.into() });
        }
        let (digits, hardened) = segment
            .strip_suffix(HARDENED_MARKER)
            .map_or((segment, false), |digits| (digits, true));

        let value: i64 =
            digits.parse().map_err(|_| Error::NotAnInteger { segment: segment.into() })?;
        let index = u32::try_from(value)
            .map_err(|_| Error::IndexOutOfRange { segment: segment.into() })?;

        if !hardened {
            return Ok(Self(index));
        }
        if index & HARDENED_BIT != 0 {
            return Err(Error::IndexOutOfRange { segment: segment.into() });
        }
        Ok(Self(index | HARDENED_BIT))
    }
}

/// BIP32 key derivation path without the leading `m`.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath {
    path: Vec<ChildNumber>,
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self, Error> {
        if path.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { path: path.split(SEPARATOR).map(str::parse).collect::<Result<_, _>>()? })
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(path: Vec<ChildNumber>) -> Self {
        Self { path }
    }
}

impl AsRef<[ChildNumber]> for DerivationPath {
    fn as_ref(&self) -> &[ChildNumber] {
        &self.path
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, child) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{child}")?;
        }
        Ok(())
    }
}

impl DerivationPath {
    /// Returns an iterator of child numbers.
    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.path.iter()
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Returns true for the empty path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Walks the path from `root`, deriving one child per segment left to right.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChildDerivationFailed`] for the first child the key rejects.
    pub fn derive<K: ExtendedKey>(&self, root: &K) -> Result<K, Error> {
        self.path.iter().try_fold(root.clone(), |key, child| {
            tracing::trace!(%child, "deriving child key");
            key.child(*child)
                .map_err(|cause| Error::ChildDerivationFailed { child: *child, cause })
        })
    }
}

/// Returns the key located at `path` below `root`.
///
/// Segments must be integers or hardened integers followed by `'`. Each segment
/// is validated right before its child is derived, so the first failure in path
/// order is the one reported.
///
/// # Errors
///
/// Returns `Err` if a segment is invalid or a child cannot be derived.
pub fn derive_child_from_key<K: ExtendedKey>(root: &K, path: &str) -> Result<K, Error> {
    if path.is_empty() {
        return Ok(root.clone());
    }
    path.split(SEPARATOR).try_fold(root.clone(), |key, segment| {
        let child: ChildNumber = segment.parse()?;
        tracing::trace!(%child, "deriving child key");
        key.child(child).map_err(|cause| Error::ChildDerivationFailed { child, cause })
    })
}
