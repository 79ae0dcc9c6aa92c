use clap::ArgMatches;
use failure::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use web3::signing::SecretKey;
use web3::types::Address;

use crate::apportion;
use crate::distribution::parse_address;
use crate::error::DistributorError;
use crate::store::IpfsStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address of the host network's JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub wrapper_addr: Option<String>,
    #[serde(default)]
    pub distributor_addr: Option<String>,
    /// Operator fee as a decimal percent, e.g. `10.0`.
    #[serde(default)]
    pub operator_fee: f64,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default = "default_ipfs_api")]
    pub ipfs_api: String,
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,
    /// Informational only; the authoritative token list comes from the
    /// distributor contract.
    #[serde(default)]
    pub token_addr: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_owned()
}

fn default_ipfs_api() -> String {
    "http://127.0.0.1:5001".to_owned()
}

fn default_ipfs_gateway() -> String {
    "https://ipfs.io".to_owned()
}

impl Config {
    pub fn default() -> Config {
        toml::from_str("").unwrap()
    }

    pub fn from_path_opt(path: Option<&str>) -> Result<Config, Error> {
        match path {
            Some(inner_path) => Self::from_path(Path::new(inner_path)),
            None => {
                let default_path = Path::new("distributor.config.toml");
                debug!(
                    "No config file path provided. Looking at default path \"{}\"",
                    default_path.to_string_lossy()
                );
                if default_path.is_file() {
                    Self::from_path(default_path)
                } else {
                    debug!("No config file found. Using builtin default config.");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Config, Error> {
        debug!(
            "Loading config file from path \"{}\"",
            path.to_string_lossy()
        );
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply command line overrides on top of the file values.
    pub fn apply_matches(&mut self, matches: &ArgMatches<'_>) -> Result<(), Error> {
        if let Some(rpc_url) = matches.value_of("rpc_url") {
            self.rpc_url = rpc_url.to_owned();
        }
        if let Some(addr) = matches.value_of("distributor_addr") {
            self.distributor_addr = Some(addr.to_owned());
        }
        if let Some(addr) = matches.value_of("wrapper_addr") {
            self.wrapper_addr = Some(addr.to_owned());
        }
        if let Some(fee) = matches.value_of("operator_fee") {
            self.operator_fee = f64::from_str(fee)
                .map_err(|_| format_err!("--fee \"{}\" is not a decimal percent", fee))?;
        }
        if let Some(output) = matches.value_of("output_file") {
            self.output_file = Some(output.to_owned());
        }
        Ok(())
    }

    pub fn distributor_address(&self) -> Result<Address, Error> {
        let raw = self
            .distributor_addr
            .as_ref()
            .ok_or_else(|| DistributorError::ConfigMissing("distributor_addr".to_owned()))?;
        parse_address(raw)
    }

    pub fn wrapper_address(&self) -> Result<Address, Error> {
        let raw = self
            .wrapper_addr
            .as_ref()
            .ok_or_else(|| DistributorError::ConfigMissing("wrapper_addr".to_owned()))?;
        parse_address(raw)
    }

    pub fn fee_basis_points(&self) -> Result<u64, Error> {
        if !(0.0..=100.0).contains(&self.operator_fee) {
            return Err(format_err!(
                "operator_fee must be a percent between 0 and 100, got {}",
                self.operator_fee
            ));
        }
        Ok(apportion::fee_basis_points(self.operator_fee))
    }

    pub fn store(&self) -> Result<IpfsStore, Error> {
        IpfsStore::new(&self.ipfs_api, &self.ipfs_gateway)
    }

    fn raw_private_key(&self) -> Option<String> {
        std::env::var("PRIVATE_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.private_key.clone())
    }

    pub fn has_signer(&self) -> bool {
        self.raw_private_key().is_some()
    }

    /// The operator's signing key, from the `PRIVATE_KEY` environment
    /// variable or the `private_key` config value.
    pub fn signer(&self) -> Result<SecretKey, Error> {
        let raw = self.raw_private_key().ok_or_else(|| {
            DistributorError::SignerRequired(
                "set PRIVATE_KEY or the private_key config value".to_owned(),
            )
        })?;
        SecretKey::from_str(raw.trim_start_matches("0x"))
            .map_err(|err| format_err!("invalid private key: {}", err))
    }
}
