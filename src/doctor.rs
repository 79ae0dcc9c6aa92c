use console::{style, Emoji};
use failure::Error;
use web3::types::Address;

use crate::chain::Chain;
use crate::config::Config;

pub static SUCCESS: Emoji<'_, '_> = Emoji("✅  ", "");
pub static FAILURE: Emoji<'_, '_> = Emoji("❌  ", "");

/// Check connection with the JSON-RPC provider.
async fn check_rpc(chain: &Chain, config: &Config) -> bool {
    println!("Checking JSON-RPC connection:");
    print!("  ");
    match chain.current_block().await {
        Ok(block) => {
            println!(
                "{}{} (at \"{}\", block {})",
                SUCCESS,
                style("Able to connect to JSON-RPC").green(),
                config.rpc_url,
                block
            );
            true
        }
        Err(_) => {
            println!(
                "{}{} (at \"{}\")",
                FAILURE,
                style("Unable to connect to JSON-RPC").red(),
                config.rpc_url
            );
            false
        }
    }
}

/// Check that contract code is deployed at the configured address.
async fn check_contract_code(chain: &Chain, name: &str, address: Result<Address, Error>) -> bool {
    print!("  ");
    let address = match address {
        Ok(address) => address,
        Err(err) => {
            println!("{}{} ({})", FAILURE, style(format!("{} not configured", name)).red(), err);
            return false;
        }
    };
    match chain.web3().eth().code(address, None).await {
        Ok(code) if !code.0.is_empty() => {
            println!(
                "{}{} (at {:?})",
                SUCCESS,
                style(format!("{} deployed", name)).green(),
                address
            );
            true
        }
        _ => {
            println!(
                "{}{} (looking at {:?})",
                FAILURE,
                style(format!("{} not deployed", name)).red(),
                address
            );
            false
        }
    }
}

async fn check_ipfs_gateway(config: &Config) -> bool {
    println!("Checking IPFS gateway:");
    print!("  ");
    let reachable = match config.store() {
        Ok(store) => reqwest::get(store.gateway().clone()).await.is_ok(),
        Err(_) => false,
    };
    if reachable {
        println!(
            "{}{} (at \"{}\")",
            SUCCESS,
            style("IPFS gateway reachable").green(),
            config.ipfs_gateway
        );
    } else {
        println!(
            "{}{} (at \"{}\")",
            FAILURE,
            style("IPFS gateway unreachable").red(),
            config.ipfs_gateway
        );
    }
    reachable
}

fn check_signer(config: &Config) {
    println!("Checking signer:");
    print!("  ");
    match config.signer() {
        Ok(_) => println!("{}{}", SUCCESS, style("Signing key configured").green()),
        Err(err) => println!(
            "{}{} ({})",
            FAILURE,
            style("No usable signing key, write operations will fail").yellow(),
            err
        ),
    }
}

pub async fn run_checks(config: &Config) -> Result<(), Error> {
    let chain = Chain::connect(&config.rpc_url)?;

    let rpc_ok = check_rpc(&chain, config).await;
    if rpc_ok {
        println!("Checking contract deployments:");
        check_contract_code(&chain, "Distributor", config.distributor_address()).await;
        check_contract_code(&chain, "Wrapper", config.wrapper_address()).await;
    } else {
        println!(
            "{}",
            style("Skipping contract checks (no JSON-RPC connection)").yellow()
        );
    }
    check_ipfs_gateway(config).await;
    check_signer(config);
    Ok(())
}
