//! Derivation of keys and addresses from a borrowed root key.
use crate::address::Address;
use crate::bip32::ExtendedKey;
use crate::error::Error;
use crate::path::derive_child_from_key;
use crate::seed::{path_to_seed, seed_to_path};
use crate::Network;

/// Derives keys, addresses and seed paths below a root key.
#[derive(Clone, Copy, Debug)]
pub struct KeyDerivationService<'a, K> {
    root: &'a K,
}

impl<'a, K: ExtendedKey> KeyDerivationService<'a, K> {
    /// Creates a service deriving from `root`.
    pub const fn new(root: &'a K) -> Self {
        Self { root }
    }

    /// The root key.
    pub const fn root(&self) -> &'a K {
        self.root
    }

    /// Returns the key at `path` below the root.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the path is invalid or a child can't be derived.
    pub fn derive(&self, path: &str) -> Result<K, Error> {
        tracing::debug!(path, "deriving key");
        derive_child_from_key(self.root, path)
    }

    /// Returns the address of the key at `path` below the root.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the key can't be derived or encoded.
    pub fn derive_address(&self, path: &str, mainnet: bool) -> Result<Address, Error> {
        tracing::debug!(path, mainnet, "deriving address");
        Address::from_extended_key(&derive_child_from_key(self.root, path)?, mainnet)
    }

    /// Returns the address of the key at `path`, using the root's network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNetwork`] if the root carries no network metadata.
    pub fn derive_address_for_root_network(&self, path: &str) -> Result<Address, Error> {
        if self.root.network().is_none() {
            return Err(Error::UnknownNetwork);
        }
        self.derive_address(path, self.root.is_for_network(Network::Main))
    }

    /// Returns the key at the seed path of `seed`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a child can't be derived.
    pub fn derive_seed(&self, seed: u64) -> Result<K, Error> {
        let path = seed_to_path(seed);
        tracing::debug!(seed, %path, "deriving seed key");
        derive_child_from_key(self.root, &path)
    }

    /// Returns the address of the key at the seed path of `seed`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the key can't be derived or encoded.
    pub fn derive_seed_address(&self, seed: u64, mainnet: bool) -> Result<Address, Error> {
        Address::from_extended_key(&self.derive_seed(seed)?, mainnet)
    }

    /// Returns the seed path of `seed`.
    #[must_use]
    pub fn path_from_seed(&self, seed: u64) -> String {
        seed_to_path(seed)
    }

    /// Returns the seed `path` was generated from.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `path` is not a seed path.
    pub fn seed_from_path(&self, path: &str) -> Result<u64, Error> {
        path_to_seed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bip32::{ExtendedPrivateKey, ExtendedPublicKey};
    use crate::path::ChildNumber;

    const TPRV: &str = "tprv8ZgxMBicQKsPcv8v71iiXGDnZ4p6hMc9qiHNdE6p8B79eFrTXVXv35vek8t44ENCbuczHU6co5PqwuAB9YLaDtXuZQrrwacq32BcU7C1TrC";

    fn root() -> ExtendedPrivateKey {
        TPRV.parse().unwrap()
    }

    #[test]
    fn derive_addresses() {
        let root = root();
        let service = KeyDerivationService::new(&root);
        let tests = [
            ("0'/0'/3'", "mpdFaJf2cAHNfoxKU63o4QXx6NDbzR6E7d"),
            ("0'", "moayMJYrSjfjuiLYxKhhDRUVqDEQWwXzpV"),
            ("0", "n2U89ELbUhJWucd9679coQ4W82H4Pme7oX"),
            ("0/1'/2/0'", "mkcX3WP4TCLiMU6JXttPnjUJTtjdVsdxBT"),
            ("0/1/2/5", "mjGdCkFd57WJJVzTwFpTRf25XhUDRP3xca"),
            ("", "mxsF6UV2djMa4dqtYNn2TQ2ZfxEWYD5qKq"),
        ];
        for (path, expected) in tests {
            let address = service.derive_address(path, false).unwrap();
            assert_eq!(address.address(), expected, "{path}");
            let address = service.derive_address_for_root_network(path).unwrap();
            assert_eq!(address.address(), expected, "{path}");
        }
        let address = service.derive_address("0", true).unwrap();
        assert_eq!(address.address(), "1MxArBFcffsG8W9XNYBEyUrBG2gMXKpFSC");
    }

    #[test]
    fn derive_keys() {
        let root = root();
        let service = KeyDerivationService::new(&root);
        assert_eq!(
            service.derive("0'").unwrap().to_string(),
            "tprv8cyDvT3NY5NP5bw1NEZ62JgnwtxcJaUxyZdpJChDfSvMLfmGCs9zCeTeiBwgHgVPG1KQXCaRZZT8am6oBEGE427dx1My9PEca7ReBohmqQ9"
        );
        assert_eq!(service.derive("").unwrap().to_string(), TPRV);
        assert_eq!(service.root().to_string(), TPRV);
    }

    #[test]
    fn public_root_matches_private_root() {
        let root = root();
        let public = root.public_key();
        let private = KeyDerivationService::new(&root);
        let service = KeyDerivationService::new(&public);
        for path in ["0", "0/1/2/5", "7/2147483647"] {
            assert_eq!(
                service.derive_address(path, false).unwrap(),
                private.derive_address(path, false).unwrap(),
                "{path}"
            );
        }
        assert!(matches!(
            service.derive("0/1'"),
            Err(Error::ChildDerivationFailed { child, .. })
                if child == ChildNumber::hardened_from_u32(1)
        ));
    }

    #[test]
    fn address_only_root_has_no_network() {
        let root = root();
        let public_key = root.compressed_public_key().unwrap();
        let zeroed = ExtendedPublicKey::new(&public_key, *root.chain_code()).unwrap();
        let service = KeyDerivationService::new(&zeroed);
        assert!(matches!(service.derive_address_for_root_network("0"), Err(Error::UnknownNetwork)));
        assert_eq!(
            service.derive_address("0", false).unwrap().address(),
            "n2U89ELbUhJWucd9679coQ4W82H4Pme7oX"
        );
    }

    #[test]
    fn seed_derivation() {
        let root = root();
        let service = KeyDerivationService::new(&root);
        assert_eq!(service.path_from_seed(0), "2147483648/2147483648/2147483648");
        assert_eq!(service.seed_from_path("2147483648/2147483648/2147483648").unwrap(), 0);

        let key = service.derive_seed(0).unwrap();
        assert_eq!(key.to_string(), service.derive("0'/0'/0'").unwrap().to_string());
        assert_eq!(
            service.derive_seed_address(0, false).unwrap(),
            service.derive_address("0'/0'/0'", false).unwrap()
        );

        let seed = 172_732_732;
        let path = service.path_from_seed(seed);
        assert_eq!(service.seed_from_path(&path).unwrap(), seed);
        assert_eq!(
            service.derive_seed_address(seed, true).unwrap(),
            service.derive_address(&path, true).unwrap()
        );
    }

    #[test]
    fn invalid_paths() {
        let root = root();
        let service = KeyDerivationService::new(&root);
        let err = service.derive("T").unwrap_err();
        assert_eq!(err.to_string(), "invalid childpath segment T");
        let err = service.derive_address("0/1/f/4/e", false).unwrap_err();
        assert_eq!(err.to_string(), "invalid childpath segment f");
        assert!(matches!(service.seed_from_path("0/0"), Err(Error::MalformedPath { .. })));
    }
}
