//! Pay-to-pubkey-hash addresses.
use crate::bip32::ExtendedKey;
use crate::error::Error;
use crate::Network;
use std::fmt;

pub mod base58check;

const MIN_ADDRESS_LEN: usize = 26;
const MAX_ADDRESS_LEN: usize = 34;

/// Address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Address {
    public_key: Vec<u8>,
    address: String,
}

impl Address {
    /// Formats the public key as a Base58Check address.
    ///
    /// The payload is the network version byte followed by `hash160(public_key)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddressLength`] if the encoding is not between 26
    /// and 34 characters long.
    pub fn from_public_key_bytes(public_key: &[u8], mainnet: bool) -> Result<Self, Error> {
        let mut payload = Vec::with_capacity(21);
        payload.push(Network::from_mainnet(mainnet).address_version());
        payload.extend_from_slice(&base58check::hash160(public_key));
        let address = base58check::encode(&payload);
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
            return Err(Error::InvalidAddressLength { address });
        }
        Ok(Self { public_key: public_key.to_vec(), address })
    }

    /// Formats the compressed public key of `key` as an address.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the public key can't be computed or encoded.
    pub fn from_extended_key<K: ExtendedKey>(key: &K, mainnet: bool) -> Result<Self, Error> {
        let public_key = key.compressed_public_key().map_err(Error::PublicKey)?;
        if !key.has_private_key() {
            return Self::from_public_key_bytes(&public_key, mainnet);
        }
        let verifying_key = ecdsa::VerifyingKey::<k256::Secp256k1>::from_sec1_bytes(&public_key)
            .map_err(|_| Error::PublicKeyParse { key: hex::encode(public_key) })?;
        Self::from_public_key_bytes(verifying_key.to_encoded_point(true).as_bytes(), mainnet)
    }

    /// Returns the public key the address was derived from.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Returns the address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.address
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bip32::{DerivationError, ExtendedPrivateKey};
    use crate::path::ChildNumber;
    use rand::RngCore;

    const TPRV: &str = "tprv8ZgxMBicQKsPcv8v71iiXGDnZ4p6hMc9qiHNdE6p8B79eFrTXVXv35vek8t44ENCbuczHU6co5PqwuAB9YLaDtXuZQrrwacq32BcU7C1TrC";

    #[derive(Clone)]
    struct BrokenKey {
        public_key: Option<[u8; 33]>,
    }

    impl ExtendedKey for BrokenKey {
        fn child(&self, child: ChildNumber) -> Result<Self, DerivationError> {
            Err(DerivationError::InvalidChild(child))
        }

        fn compressed_public_key(&self) -> Result<[u8; 33], DerivationError> {
            self.public_key.ok_or(DerivationError::InvalidPublicKey)
        }

        fn has_private_key(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_root_address() {
        let root: ExtendedPrivateKey = TPRV.parse().unwrap();
        let address = Address::from_extended_key(&root, false).unwrap();
        assert_eq!(address.address(), "mxsF6UV2djMa4dqtYNn2TQ2ZfxEWYD5qKq");
        assert_eq!(address.public_key(), &root.compressed_public_key().unwrap()[..]);
        let address = Address::from_extended_key(&root, true).unwrap();
        assert_eq!(address.to_string(), "1JMHoRQ3phvKHXNGpooedUpEoxdoczA1hc");
        assert_eq!(String::from(address), "1JMHoRQ3phvKHXNGpooedUpEoxdoczA1hc");
    }

    #[test]
    fn test_public_key_address() {
        let pubkey = "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2";
        let pubkey = hex::decode(pubkey).unwrap();
        let address = Address::from_public_key_bytes(&pubkey, true).unwrap();
        assert_eq!(address.address(), "15mKKb2eos1hWa6tisdPwwDC1a5J1y9nma");
    }

    #[test]
    fn test_public_key_errors() {
        let err = Address::from_extended_key(&BrokenKey { public_key: None }, true).unwrap_err();
        assert!(matches!(err, Error::PublicKey(DerivationError::InvalidPublicKey)));

        let err =
            Address::from_extended_key(&BrokenKey { public_key: Some([5; 33]) }, true).unwrap_err();
        assert!(matches!(err, Error::PublicKeyParse { key } if key == "05".repeat(33)));
    }

    #[test]
    fn test_address_length() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let mut seed = [0; 32];
            rng.fill_bytes(&mut seed);
            let key = ExtendedPrivateKey::new_master(&seed, Network::Main).unwrap();
            for mainnet in [true, false] {
                let address = Address::from_extended_key(&key, mainnet).unwrap();
                assert!((26..=34).contains(&address.address().len()), "{address}");
                let prefix = address.address().chars().next().unwrap();
                if mainnet {
                    assert_eq!(prefix, '1');
                } else {
                    assert!(prefix == 'm' || prefix == 'n', "{address}");
                }
            }
        }
    }
}
