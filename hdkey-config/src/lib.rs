use anyhow::Result;
use hdkey_crypto::{ChildNumber, DerivationPath, Network};

const MAINNET_PREFIXES: &[char] = &['1'];
const TESTNET_PREFIXES: &[char] = &['m', 'n'];

/// Network parameters used to derive keys and render addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WalletConfig {
    /// Network name as accepted by [`config`].
    pub network: &'static str,
    /// Version bytes used for addresses and serialized keys.
    pub bitcoin_network: Network,
    /// BIP44 coin type.
    pub coin: u32,
    /// First characters of an address on this network.
    pub address_prefixes: &'static [char],
}

impl WalletConfig {
    /// Returns true if addresses are rendered for mainnet.
    #[must_use]
    pub const fn mainnet(&self) -> bool {
        self.bitcoin_network.is_mainnet()
    }

    /// The first receiving address of the first account, `44'/coin'/0'/0/0`.
    #[must_use]
    pub fn default_path(&self) -> DerivationPath {
        DerivationPath::from(vec![
            ChildNumber::hardened_from_u32(44),
            ChildNumber::hardened_from_u32(self.coin),
            ChildNumber::hardened_from_u32(0),
            ChildNumber::non_hardened_from_u32(0),
            ChildNumber::non_hardened_from_u32(0),
        ])
    }
}

/// Retrieve the [`WalletConfig`] from the provided `network`
///
/// # Errors
/// Returns `Err` if the network is not supported
pub fn config(network: &str) -> Result<WalletConfig> {
    let (network, bitcoin_network, bip44_id, address_prefixes) = match network {
        "mainnet" => ("mainnet", Network::Main, 0, MAINNET_PREFIXES),
        "testnet" => ("testnet", Network::Test, 1, TESTNET_PREFIXES),
        "regtest" => ("regtest", Network::Test, 1, TESTNET_PREFIXES),
        _ => anyhow::bail!("unsupported network: {}", network),
    };
    Ok(WalletConfig { network, bitcoin_network, coin: bip44_id, address_prefixes })
}
