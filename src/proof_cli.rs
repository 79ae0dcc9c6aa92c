use console::style;
use failure::Error;
use std::fs;
use web3::types::Address;

use crate::chain::Chain;
use crate::config::Config;
use crate::distribution::{hex_address, hex_h256, parse_address, parse_amount, parse_h256, Claim};
use crate::error::DistributorError;
use crate::merkle::DistributionTree;

/// What the operator asked a proof for.
pub enum ProofQuery {
    Index(usize),
    Address {
        recipient: Address,
        token: Option<Address>,
    },
    List,
}

/// The `proof.json` artifact consumed by the claim flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    pub recipient: String,
    pub token: String,
    pub amount: String,
    pub proof: Vec<String>,
    pub merkle_root: String,
    pub tree_index: usize,
}

impl ProofArtifact {
    pub fn to_claim(&self) -> Result<Claim, Error> {
        Ok(Claim {
            recipient: parse_address(&self.recipient)?,
            token: parse_address(&self.token)?,
            amount: parse_amount(&self.amount)?,
        })
    }
}

/// Load the current on-chain round and rebuild its tree, refusing anything
/// that does not hash back to the published root.
async fn load_current_tree(config: &Config) -> Result<DistributionTree, Error> {
    let chain = Chain::connect(&config.rpc_url)?;
    let distributor = chain.distributor(config.distributor_address()?)?;
    let store = config.store()?;

    let onchain_root = distributor.root().await?;
    let onchain_cid = distributor.cid().await?;
    if onchain_cid.is_empty() {
        return Err(DistributorError::ValidationFailure(
            "no distribution has been published yet".to_owned(),
        )
        .into());
    }

    let blob = store.get(&onchain_cid).await?;
    let tree = DistributionTree::load(&blob)?;
    if tree.root() != onchain_root {
        return Err(DistributorError::ValidationFailure(format!(
            "blob {} rebuilds to root {:?}, chain has {:?}",
            onchain_cid,
            tree.root(),
            onchain_root
        ))
        .into());
    }
    Ok(tree)
}

pub async fn run_proof(config: &Config, query: ProofQuery, output: &str) -> Result<(), Error> {
    let tree = load_current_tree(config).await?;

    let value_index = match query {
        ProofQuery::List => {
            println!("{}", style("Published claims:").bold());
            for (index, indexed) in tree.values().iter().enumerate() {
                println!(
                    "  [{}] {} {} {}",
                    index,
                    hex_address(&indexed.claim.recipient),
                    hex_address(&indexed.claim.token),
                    indexed.claim.amount
                );
            }
            return Ok(());
        }
        ProofQuery::Index(index) => {
            if index >= tree.values().len() {
                return Err(DistributorError::ProofNotFound(format!(
                    "index {} out of range ({} claims)",
                    index,
                    tree.values().len()
                ))
                .into());
            }
            index
        }
        ProofQuery::Address { recipient, token } => {
            let matches: Vec<usize> = tree
                .values()
                .iter()
                .enumerate()
                .filter(|(_, indexed)| {
                    indexed.claim.recipient == recipient
                        && token.map_or(true, |t| indexed.claim.token == t)
                })
                .map(|(index, _)| index)
                .collect();
            match matches.len() {
                0 => {
                    return Err(DistributorError::ProofNotFound(format!(
                        "no claim for {}",
                        hex_address(&recipient)
                    ))
                    .into())
                }
                1 => matches[0],
                _ => {
                    return Err(format_err!(
                        "{} has claims for multiple tokens, narrow down with --token",
                        hex_address(&recipient)
                    ))
                }
            }
        }
    };

    let indexed = &tree.values()[value_index];
    let proof = tree.proof(value_index)?;
    let artifact = ProofArtifact {
        recipient: hex_address(&indexed.claim.recipient),
        token: hex_address(&indexed.claim.token),
        amount: indexed.claim.amount.to_string(),
        proof: proof.iter().map(hex_h256).collect(),
        merkle_root: hex_h256(&tree.root()),
        tree_index: indexed.tree_index,
    };
    fs::write(output, serde_json::to_vec_pretty(&artifact)?)?;

    println!("Recipient: {}", artifact.recipient);
    println!("Token: {}", artifact.token);
    println!("Cumulative amount: {}", artifact.amount);
    println!("Merkle root: {}", artifact.merkle_root);
    println!(
        "{} {}",
        style("Proof written to").green(),
        style(output).green()
    );
    Ok(())
}

pub async fn run_claim(config: &Config, proof_file: &str) -> Result<(), Error> {
    let contents = fs::read_to_string(proof_file)?;
    let artifact: ProofArtifact = serde_json::from_str(&contents)?;
    let claim = artifact.to_claim()?;
    let proof = artifact
        .proof
        .iter()
        .map(|raw| parse_h256(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let chain = Chain::connect(&config.rpc_url)?;
    let distributor = chain.distributor(config.distributor_address()?)?;
    let key = config.signer()?;

    info!(
        "submitting claim for {} of token {} to recipient {}",
        claim.amount,
        hex_address(&claim.token),
        hex_address(&claim.recipient)
    );
    let receipt = distributor.claim(&claim, proof, &key).await?;
    println!(
        "{} (tx {:?})",
        style("Claim confirmed").green(),
        receipt.transaction_hash
    );
    Ok(())
}
