//! Hierarchical deterministic key derivation for bitcoin style keys.
//!
//! The crate covers three tightly coupled pieces:
//!
//! - [`seed`]: packing a `u64` counter into a three level hardened path and back.
//! - [`path`]: parsing `/` delimited derivation paths and walking them against an
//!   [`ExtendedKey`].
//! - [`address`]: rendering the public key of a derived key as a Base58Check
//!   pay-to-pubkey-hash address.
//!
//! [`KeyDerivationService`] composes them.
#![deny(missing_docs)]

pub mod address;
pub mod bip32;
pub use bip39;
mod error;
pub mod path;
pub mod seed;
pub mod service;

pub use address::Address;
pub use bip32::{DerivationError, ExtendedKey, ExtendedPrivateKey, ExtendedPublicKey};
pub use error::{Base58CheckError, Error};
pub use path::{derive_child_from_key, ChildNumber, DerivationPath};
pub use seed::{path_to_seed, seed_to_path};
pub use service::KeyDerivationService;

/// Bitcoin network a key or an address belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Network {
    /// Bitcoin mainnet.
    Main,
    /// Bitcoin testnet. Regtest shares the same version bytes.
    Test,
}

impl Network {
    /// Returns [`Network::Main`] if `mainnet` is set and [`Network::Test`] otherwise.
    #[must_use]
    pub const fn from_mainnet(mainnet: bool) -> Self {
        if mainnet {
            Self::Main
        } else {
            Self::Test
        }
    }

    /// Returns true for [`Network::Main`].
    #[must_use]
    pub const fn is_mainnet(self) -> bool {
        matches!(self, Self::Main)
    }

    /// Version byte prefixed to a pay-to-pubkey-hash address.
    #[must_use]
    pub const fn address_version(self) -> u8 {
        match self {
            Self::Main => 0x00,
            Self::Test => 0x6f,
        }
    }

    /// Version bytes of a serialized extended private key (`xprv` / `tprv`).
    #[must_use]
    pub const fn xprv_version(self) -> [u8; 4] {
        match self {
            Self::Main => [0x04, 0x88, 0xad, 0xe4],
            Self::Test => [0x04, 0x35, 0x83, 0x94],
        }
    }

    /// Version bytes of a serialized extended public key (`xpub` / `tpub`).
    #[must_use]
    pub const fn xpub_version(self) -> [u8; 4] {
        match self {
            Self::Main => [0x04, 0x88, 0xb2, 0x1e],
            Self::Test => [0x04, 0x35, 0x87, 0xcf],
        }
    }
}
