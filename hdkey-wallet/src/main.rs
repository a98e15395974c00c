use anyhow::{Context, Result};
use clap::Parser;
use hdkey_config::WalletConfig;
use hdkey_crypto::bip39::{Language, Mnemonic};
use hdkey_crypto::{
    Address, ExtendedKey, ExtendedPrivateKey, ExtendedPublicKey, KeyDerivationService, Network,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Parser)]
pub struct Opts {
    /// Network used for addresses and new master keys: mainnet, testnet or regtest.
    #[clap(long)]
    pub network: Option<String>,
    /// Serialized extended private or public key used as the root.
    #[clap(long, conflicts_with = "keyfile")]
    pub key: Option<String>,
    /// Existing file holding the BIP39 mnemonic of the master key.
    #[clap(long)]
    pub keyfile: Option<PathBuf>,
    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Parser)]
pub enum Command {
    /// Prints the seed path of a seed.
    Path(SeedOpts),
    /// Prints the seed a seed path was generated from.
    Seed(PathOpts),
    /// Prints the extended key at a path.
    Derive(PathOpts),
    /// Prints the public key and address at a path.
    Address(AddressOpts),
    /// Prints the address at the seed path of a seed.
    SeedAddress(SeedOpts),
}

#[derive(Parser)]
pub struct SeedOpts {
    pub seed: u64,
}

#[derive(Parser)]
pub struct PathOpts {
    pub path: String,
}

#[derive(Parser)]
pub struct AddressOpts {
    /// Defaults to the first receiving address when a network is given.
    pub path: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let opts = Opts::parse();

    let config = opts.network.as_deref().map(hdkey_config::config).transpose()?;

    match &opts.cmd {
        Command::Path(SeedOpts { seed }) => {
            println!("{}", hdkey_crypto::seed_to_path(*seed));
            return Ok(());
        }
        Command::Seed(PathOpts { path }) => {
            println!("{}", hdkey_crypto::path_to_seed(path)?);
            return Ok(());
        }
        _ => {}
    }

    if let Some(key) = opts.key.as_deref() {
        if let Ok(root) = key.parse::<ExtendedPrivateKey>() {
            return run(&root, config.as_ref(), &opts.cmd);
        }
        let root = key
            .parse::<ExtendedPublicKey>()
            .context("key is neither an extended private nor public key")?;
        return run(&root, config.as_ref(), &opts.cmd);
    }

    let keyfile = opts.keyfile.as_deref().context("either --key or --keyfile is required")?;
    let mnemonic = read_mnemonic(keyfile)?;
    let network = config.map_or(Network::Test, |config| config.bitcoin_network);
    let root = ExtendedPrivateKey::from_mnemonic(&mnemonic, "", network)?;
    run(&root, config.as_ref(), &opts.cmd)
}

/// Reads the mnemonic stored in `path`. The file is never created or modified.
fn read_mnemonic(path: &Path) -> Result<Mnemonic> {
    tracing::debug!(path = %path.display(), "reading mnemonic");
    let mnemonic = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mnemonic = Mnemonic::parse_in(Language::English, mnemonic.trim())
        .with_context(|| format!("{} does not hold a valid mnemonic", path.display()))?;
    Ok(mnemonic)
}

fn run<K: ExtendedKey + Display>(
    root: &K,
    config: Option<&WalletConfig>,
    command: &Command,
) -> Result<()> {
    let service = KeyDerivationService::new(root);
    let address_for = |path: &str| -> Result<Address> {
        let address = match config {
            Some(config) => service.derive_address(path, config.mainnet())?,
            None => service
                .derive_address_for_root_network(path)
                .context("pass --network for keys without network metadata")?,
        };
        Ok(address)
    };

    match command {
        // answered in main without loading a key
        Command::Path(_) | Command::Seed(_) => {}
        Command::Derive(PathOpts { path }) => {
            println!("{}", service.derive(path)?);
        }
        Command::Address(AddressOpts { path }) => {
            let path = match (path, config) {
                (Some(path), _) => path.clone(),
                (None, Some(config)) => config.default_path().to_string(),
                (None, None) => String::new(),
            };
            let address = address_for(&path)?;
            println!("{}", hex::encode(address.public_key()));
            println!("{address}");
        }
        Command::SeedAddress(SeedOpts { seed }) => {
            println!("{}", service.path_from_seed(*seed));
            let address = match config {
                Some(config) => service.derive_seed_address(*seed, config.mainnet())?,
                None => address_for(&service.path_from_seed(*seed))?,
            };
            println!("{address}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hdkey-wallet-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_read_mnemonic() {
        let path = temp_file("mnemonic");
        std::fs::write(&path, format!("{MNEMONIC}\n")).unwrap();
        let mnemonic = read_mnemonic(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(mnemonic.to_string(), MNEMONIC);
    }

    #[test]
    fn test_missing_keyfile_is_not_created() {
        let path = temp_file("missing");
        assert!(read_mnemonic(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_mnemonic() {
        let path = temp_file("invalid");
        std::fs::write(&path, "not a mnemonic").unwrap();
        let err = read_mnemonic(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("does not hold a valid mnemonic"));
    }

    #[test]
    fn test_key_options() {
        assert!(Opts::try_parse_from(["hdkey-wallet", "path", "0"]).is_ok());
        assert!(Opts::try_parse_from(["hdkey-wallet", "--keyfile", "words", "derive", "0"]).is_ok());
        assert!(Opts::try_parse_from([
            "hdkey-wallet",
            "--key",
            "xpub",
            "--keyfile",
            "words",
            "derive",
            "0"
        ])
        .is_err());
    }
}
