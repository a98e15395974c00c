//! BIP32 implementation over secp256k1.
//!
//! [`ExtendedKey`] is the seam the path walker and the address encoder depend on.
//! [`ExtendedPrivateKey`] and [`ExtendedPublicKey`] implement it and round trip
//! through the standard `xprv`/`xpub`/`tprv`/`tpub` text serialization.
use crate::address::base58check;
use crate::bip39::Mnemonic;
use crate::error::Base58CheckError;
use crate::path::ChildNumber;
use crate::Network;
use hmac::{Hmac, Mac};
use k256::Secp256k1;
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

type SigningKey = ecdsa::SigningKey<Secp256k1>;
type VerifyingKey = ecdsa::VerifyingKey<Secp256k1>;

const MASTER_KEY_DOMAIN: &[u8] = b"Bitcoin seed";
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;
const SERIALIZED_LEN: usize = 78;
const ZERO_VERSION: [u8; 4] = [0; 4];

/// Errors reported by an [`ExtendedKey`].
#[derive(Debug, Error)]
pub enum DerivationError {
    /// Public keys can only derive normal children.
    #[error("can't derive hardened child {0} from a public key")]
    HardenedFromPublic(ChildNumber),

    /// The child index produced an invalid key.
    #[error("child {0} produced an invalid key")]
    InvalidChild(ChildNumber),

    /// Depth is stored in a single byte.
    #[error("maximum derivation depth exceeded")]
    DepthExceeded,

    /// Master key generation needs between 16 and 64 bytes of seed.
    #[error("invalid seed length {0}, expected 16 to 64 bytes")]
    InvalidSeedLength(usize),

    /// The bytes do not form a valid secp256k1 secret key.
    #[error("invalid secret key")]
    InvalidSecretKey,

    /// The bytes do not form a valid secp256k1 public key.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The serialized key failed Base58Check decoding.
    #[error(transparent)]
    Encoding(#[from] Base58CheckError),

    /// A serialized extended key is always 78 bytes long.
    #[error("invalid extended key length {0}, expected 78 bytes")]
    InvalidLength(usize),

    /// The version bytes are not a known extended key version.
    #[error("unknown extended key version {}", hex::encode(.0))]
    UnknownVersion([u8; 4]),

    /// The HMAC key was rejected.
    #[error("invalid hmac key length")]
    HmacKeyLength,
}

/// A node of a BIP32 key tree.
///
/// Implementations must be free of side effects: deriving a child never changes
/// the parent.
pub trait ExtendedKey: Clone {
    /// Derives the child key at `child`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the child can't be derived from this key.
    fn child(&self, child: ChildNumber) -> Result<Self, DerivationError>;

    /// Returns the SEC1 compressed public key of this node.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the public key can't be computed.
    fn compressed_public_key(&self) -> Result<[u8; 33], DerivationError>;

    /// Returns true if the key holds a private key.
    fn has_private_key(&self) -> bool;

    /// Network metadata carried by the key, `None` for address only keys.
    fn network(&self) -> Option<Network> {
        None
    }

    /// Returns true if the key carries metadata for `network`.
    fn is_for_network(&self, network: Network) -> bool {
        self.network() == Some(network)
    }
}

/// Depth, parent and chain code shared by private and public extended keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct KeyInfo {
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: ChildNumber,
    chain_code: [u8; 32],
}

impl KeyInfo {
    fn master(chain_code: [u8; 32]) -> Self {
        Self {
            depth: 0,
            parent_fingerprint: [0; 4],
            child_number: ChildNumber::from_raw(0),
            chain_code,
        }
    }

    fn child(
        &self,
        parent_public_key: &[u8],
        child: ChildNumber,
        chain_code: [u8; 32],
    ) -> Result<Self, DerivationError> {
        Ok(Self {
            depth: self.depth.checked_add(1).ok_or(DerivationError::DepthExceeded)?,
            parent_fingerprint: fingerprint(parent_public_key),
            child_number: child,
            chain_code,
        })
    }

    /// Returns the 64-byte HMAC-SHA512 of `data || child` keyed with the chain code.
    fn hmac(&self, data: &[&[u8]], child: ChildNumber) -> Result<[u8; 64], DerivationError> {
        let child = child.to_bytes();
        let mut input = data.to_vec();
        input.push(&child[..]);
        hmac_sha512(&self.chain_code[..], &input)
    }
}

/// Returns the HMAC-SHA512 of the concatenated `data` keyed with `key`.
fn hmac_sha512(key: &[u8], data: &[&[u8]]) -> Result<[u8; 64], DerivationError> {
    let mut hmac: Hmac<Sha512> =
        Hmac::new_from_slice(key).map_err(|_| DerivationError::HmacKeyLength)?;
    for data in data {
        hmac.update(data);
    }
    let mut result = [0; 64];
    result.copy_from_slice(&hmac.finalize().into_bytes());
    Ok(result)
}

fn fingerprint(public_key: &[u8]) -> [u8; 4] {
    let hash = base58check::hash160(public_key);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn split_hmac(result: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut tweak = [0; 32];
    let mut chain_code = [0; 32];
    tweak.copy_from_slice(&result[..32]);
    chain_code.copy_from_slice(&result[32..]);
    (tweak, chain_code)
}

fn compress(public_key: &VerifyingKey) -> [u8; 33] {
    let mut bytes = [0; 33];
    bytes.copy_from_slice(public_key.to_encoded_point(true).as_bytes());
    bytes
}

/// The 78 byte BIP32 serialization.
struct RawExtendedKey {
    version: [u8; 4],
    info: KeyInfo,
    key_data: [u8; 33],
}

impl RawExtendedKey {
    fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(SERIALIZED_LEN);
        bytes.extend_from_slice(&self.version);
        bytes.push(self.info.depth);
        bytes.extend_from_slice(&self.info.parent_fingerprint);
        bytes.extend_from_slice(&self.info.child_number.to_bytes());
        bytes.extend_from_slice(&self.info.chain_code);
        bytes.extend_from_slice(&self.key_data);
        base58check::encode(&bytes)
    }

    fn decode(s: &str) -> Result<Self, DerivationError> {
        let bytes = base58check::decode(s)?;
        if bytes.len() != SERIALIZED_LEN {
            return Err(DerivationError::InvalidLength(bytes.len()));
        }
        let mut version = [0; 4];
        let mut parent_fingerprint = [0; 4];
        let mut child_number = [0; 4];
        let mut chain_code = [0; 32];
        let mut key_data = [0; 33];
        version.copy_from_slice(&bytes[0..4]);
        parent_fingerprint.copy_from_slice(&bytes[5..9]);
        child_number.copy_from_slice(&bytes[9..13]);
        chain_code.copy_from_slice(&bytes[13..45]);
        key_data.copy_from_slice(&bytes[45..78]);
        Ok(Self {
            version,
            info: KeyInfo {
                depth: bytes[4],
                parent_fingerprint,
                child_number: ChildNumber::from_raw(u32::from_be_bytes(child_number)),
                chain_code,
            },
            key_data,
        })
    }
}

/// Secret key and chain code used for hierarchical key derivation.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    network: Network,
    info: KeyInfo,
    secret_key: SigningKey,
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("network", &self.network)
            .field("depth", &self.info.depth)
            .field("child_number", &self.info.child_number)
            .finish_non_exhaustive()
    }
}

impl ExtendedPrivateKey {
    /// Derives a BIP32 master key from a seed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the seed is not 16 to 64 bytes long or yields an invalid key.
    pub fn new_master(seed: &[u8], network: Network) -> Result<Self, DerivationError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(DerivationError::InvalidSeedLength(seed.len()));
        }
        let result = hmac_sha512(MASTER_KEY_DOMAIN, &[seed])?;
        let (secret_key, chain_code) = split_hmac(&result);
        let secret_key =
            SigningKey::from_slice(&secret_key).map_err(|_| DerivationError::InvalidSecretKey)?;
        Ok(Self { network, info: KeyInfo::master(chain_code), secret_key })
    }

    /// Derives a master key from a mnemonic using the BIP39 seed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the seed yields an invalid key.
    pub fn from_mnemonic(
        mnemonic: &Mnemonic,
        password: &str,
        network: Network,
    ) -> Result<Self, DerivationError> {
        let seed = mnemonic.to_seed(password);
        Self::new_master(&seed[..], network)
    }

    /// Network the key is serialized for.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Number of derivations from the master key.
    #[must_use]
    pub const fn depth(&self) -> u8 {
        self.info.depth
    }

    /// First four bytes of the parent's public key hash.
    #[must_use]
    pub const fn parent_fingerprint(&self) -> &[u8; 4] {
        &self.info.parent_fingerprint
    }

    /// The child number this key was derived with.
    #[must_use]
    pub const fn child_number(&self) -> ChildNumber {
        self.info.child_number
    }

    /// The chain code used to derive child keys.
    #[must_use]
    pub const fn chain_code(&self) -> &[u8; 32] {
        &self.info.chain_code
    }

    /// The secret key used to sign messages.
    #[must_use]
    pub const fn secret_key(&self) -> &SigningKey {
        &self.secret_key
    }

    /// First four bytes of this key's public key hash.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&compress(self.secret_key.verifying_key()))
    }

    /// Returns the extended public key of this node.
    #[must_use]
    pub fn public_key(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            network: Some(self.network),
            info: self.info,
            public_key: *self.secret_key.verifying_key(),
        }
    }

    fn bip32_derive(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        let parent_public_key = compress(self.secret_key.verifying_key());
        let result = if child.is_hardened() {
            let secret_key = self.secret_key.to_bytes();
            self.info.hmac(&[&[0u8][..], &secret_key[..]], child)?
        } else {
            self.info.hmac(&[&parent_public_key[..]], child)?
        };
        let (tweak, chain_code) = split_hmac(&result);

        // IL must be a valid scalar and the sum must not be zero
        let tweak =
            SigningKey::from_slice(&tweak).map_err(|_| DerivationError::InvalidChild(child))?;
        let scalar =
            tweak.as_nonzero_scalar().as_ref() + self.secret_key.as_nonzero_scalar().as_ref();
        let scalar: Option<k256::NonZeroScalar> = Option::from(k256::NonZeroScalar::new(scalar));
        let secret_key = SigningKey::from(scalar.ok_or(DerivationError::InvalidChild(child))?);

        Ok(Self {
            network: self.network,
            info: self.info.child(&parent_public_key, child, chain_code)?,
            secret_key,
        })
    }
}

impl ExtendedKey for ExtendedPrivateKey {
    fn child(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        self.bip32_derive(child)
    }

    fn compressed_public_key(&self) -> Result<[u8; 33], DerivationError> {
        Ok(compress(self.secret_key.verifying_key()))
    }

    fn has_private_key(&self) -> bool {
        true
    }

    fn network(&self) -> Option<Network> {
        Some(self.network)
    }
}

impl FromStr for ExtendedPrivateKey {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, DerivationError> {
        let raw = RawExtendedKey::decode(s)?;
        let network = if raw.version == Network::Main.xprv_version() {
            Network::Main
        } else if raw.version == Network::Test.xprv_version() {
            Network::Test
        } else {
            return Err(DerivationError::UnknownVersion(raw.version));
        };
        if raw.key_data[0] != 0 {
            return Err(DerivationError::InvalidSecretKey);
        }
        let secret_key = SigningKey::from_slice(&raw.key_data[1..])
            .map_err(|_| DerivationError::InvalidSecretKey)?;
        Ok(Self { network, info: raw.info, secret_key })
    }
}

impl fmt::Display for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut key_data = [0; 33];
        key_data[1..].copy_from_slice(&self.secret_key.to_bytes());
        let raw =
            RawExtendedKey { version: self.network.xprv_version(), info: self.info, key_data };
        f.write_str(&raw.encode())
    }
}

/// Public key and chain code used for hierarchical key derivation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtendedPublicKey {
    network: Option<Network>,
    info: KeyInfo,
    public_key: VerifyingKey,
}

impl ExtendedPublicKey {
    /// Constructs an address only key from a SEC1 public key and a chain code.
    ///
    /// The key carries no network metadata and serializes with zero version bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `public_key` is not a valid secp256k1 point.
    pub fn new(public_key: &[u8], chain_code: [u8; 32]) -> Result<Self, DerivationError> {
        let public_key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| DerivationError::InvalidPublicKey)?;
        Ok(Self { network: None, info: KeyInfo::master(chain_code), public_key })
    }

    /// Number of derivations from the master key.
    #[must_use]
    pub const fn depth(&self) -> u8 {
        self.info.depth
    }

    /// First four bytes of the parent's public key hash.
    #[must_use]
    pub const fn parent_fingerprint(&self) -> &[u8; 4] {
        &self.info.parent_fingerprint
    }

    /// The child number this key was derived with.
    #[must_use]
    pub const fn child_number(&self) -> ChildNumber {
        self.info.child_number
    }

    /// The chain code used to derive child keys.
    #[must_use]
    pub const fn chain_code(&self) -> &[u8; 32] {
        &self.info.chain_code
    }

    /// The public key used to verify messages.
    #[must_use]
    pub const fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// First four bytes of this key's public key hash.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&compress(&self.public_key))
    }

    fn bip32_derive(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        if child.is_hardened() {
            return Err(DerivationError::HardenedFromPublic(child));
        }
        let parent_public_key = compress(&self.public_key);
        let result = self.info.hmac(&[&parent_public_key[..]], child)?;
        let (tweak, chain_code) = split_hmac(&result);

        let tweak = k256::NonZeroScalar::try_from(&tweak[..])
            .map_err(|_| DerivationError::InvalidChild(child))?;
        let mut point = k256::ProjectivePoint::GENERATOR * tweak.as_ref();
        point += k256::ProjectivePoint::from(self.public_key.as_affine());
        let public_key = VerifyingKey::from_affine(point.to_affine())
            .map_err(|_| DerivationError::InvalidChild(child))?;

        Ok(Self {
            network: self.network,
            info: self.info.child(&parent_public_key, child, chain_code)?,
            public_key,
        })
    }
}

impl ExtendedKey for ExtendedPublicKey {
    fn child(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        self.bip32_derive(child)
    }

    fn compressed_public_key(&self) -> Result<[u8; 33], DerivationError> {
        Ok(compress(&self.public_key))
    }

    fn has_private_key(&self) -> bool {
        false
    }

    fn network(&self) -> Option<Network> {
        self.network
    }
}

impl FromStr for ExtendedPublicKey {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, DerivationError> {
        let raw = RawExtendedKey::decode(s)?;
        let network = if raw.version == Network::Main.xpub_version() {
            Some(Network::Main)
        } else if raw.version == Network::Test.xpub_version() {
            Some(Network::Test)
        } else if raw.version == ZERO_VERSION {
            None
        } else {
            return Err(DerivationError::UnknownVersion(raw.version));
        };
        let public_key = VerifyingKey::from_sec1_bytes(&raw.key_data)
            .map_err(|_| DerivationError::InvalidPublicKey)?;
        Ok(Self { network, info: raw.info, public_key })
    }
}

impl fmt::Display for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.network.map_or(ZERO_VERSION, Network::xpub_version);
        let raw = RawExtendedKey { version, info: self.info, key_data: compress(&self.public_key) };
        f.write_str(&raw.encode())
    }
}
