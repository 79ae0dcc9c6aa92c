//! One full distribution round: validate the previous round, reconcile and
//! apportion every token, fold cumulatives, build the tree, upload the blob
//! and submit the new root. Everything before `setMerkleRoot` is read-only
//! and pinned to one block height, so an aborted round can simply be re-run.

use failure::Error;
use std::collections::BTreeMap;
use web3::types::{Address, TransactionReceipt, H256, U256};

use crate::chain::{Chain, Distributor};
use crate::config::Config;
use crate::distribution::{
    cumulative_map, fold_cumulative, Claim, DistributionBlob,
};
use crate::error::DistributorError;
use crate::merkle::DistributionTree;
use crate::store::IpfsStore;
use crate::{apportion, recipients, reconcile};

/// Everything a round produced; `receipt` is absent when no signer was
/// configured and the root still has to be submitted manually.
pub struct RoundArtifact {
    pub root: H256,
    pub cid: String,
    pub block_number: u64,
    pub blob: DistributionBlob,
    pub receipt: Option<TransactionReceipt>,
}

/// Download the previous round's blob and check it against the on-chain
/// root before trusting any of its contents.
async fn load_previous_round(
    distributor: &Distributor,
    store: &IpfsStore,
) -> Result<Option<(String, DistributionBlob)>, Error> {
    let onchain_root = distributor.root().await?;
    let onchain_cid = distributor.cid().await?;
    if onchain_cid.is_empty() {
        if !onchain_root.is_zero() {
            return Err(DistributorError::ValidationFailure(
                "distributor has a root but no CID".to_owned(),
            )
            .into());
        }
        info!("no previous round on chain, starting at genesis");
        return Ok(None);
    }

    let blob = store.get(&onchain_cid).await?;
    let tree = DistributionTree::load(&blob)?;
    if tree.root() != onchain_root {
        return Err(DistributorError::ValidationFailure(format!(
            "previous blob {} rebuilds to root {:?}, chain has {:?}",
            onchain_cid,
            tree.root(),
            onchain_root
        ))
        .into());
    }
    info!(
        "previous round at block {} validated against on-chain root",
        blob.block_number
    );
    Ok(Some((onchain_cid, blob)))
}

/// Run one round end to end and return its artifact.
pub async fn run_round(config: &Config) -> Result<RoundArtifact, Error> {
    let chain = Chain::connect(&config.rpc_url)?;
    let distributor = chain.distributor(config.distributor_address()?)?;
    let wrapper = chain.wrapper(config.wrapper_address()?)?;
    let store = config.store()?;
    let fee_basis_points = config.fee_basis_points()?;

    let previous = load_previous_round(&distributor, &store).await?;
    let (prev_cid, prev_blob) = match previous {
        Some((cid, blob)) => (cid, Some(blob)),
        None => (String::new(), None),
    };

    // The logical snapshot: all balance reads and scan upper bounds pin to
    // this height.
    let current_block = chain.current_block().await?;
    let last_processed_block = distributor.last_processed_block().await?;
    let tokens = distributor.tokens().await?;
    if let Some(configured) = &config.token_addr {
        // The contract's token list is authoritative; the config value is a
        // hint for operators only.
        if !tokens.iter().any(|token| {
            crate::distribution::parse_address(configured)
                .map(|parsed| parsed == *token)
                .unwrap_or(false)
        }) {
            warn!(
                "configured token_addr {} is not in the distributor's token list",
                configured
            );
        }
    }
    let total_supply = wrapper.total_supply(current_block).await?;
    info!(
        "running round at block {} with {} tokens, wrapper supply {}",
        current_block,
        tokens.len(),
        total_supply
    );

    let candidates = recipients::build_recipient_set(
        &wrapper,
        prev_blob.as_ref(),
        last_processed_block,
        current_block,
    )
    .await?;
    let balances = wrapper.balances_at(&candidates, current_block).await?;

    let mut allocations: Vec<Claim> = Vec::new();
    for token in &tokens {
        let distributable = reconcile::token_distributable(
            &chain,
            &distributor,
            *token,
            prev_blob.as_ref().map(|blob| blob.block_number),
            current_block,
        )
        .await?;
        info!("token {:?}: distributable {}", token, distributable);
        allocations.extend(apportion::apportion_token(
            *token,
            distributable,
            fee_basis_points,
            total_supply,
            &balances,
        )?);
    }

    let prev_cumulative: BTreeMap<(Address, Address), U256> = match prev_blob.as_ref() {
        Some(blob) => cumulative_map(blob)?,
        None => BTreeMap::new(),
    };
    let claims = fold_cumulative(&prev_cumulative, &allocations)?;
    let tree = DistributionTree::build(&claims)?;
    let blob = tree.dump(prev_cid, current_block)?;

    let cid = store.put(&blob).await?;
    if let Some(path) = &config.output_file {
        std::fs::write(path, serde_json::to_vec_pretty(&blob)?)?;
        info!("distribution blob written to {}", path);
    }

    let receipt = if config.has_signer() {
        let key = config.signer()?;
        Some(distributor.set_merkle_root(tree.root(), &cid, &key).await?)
    } else {
        warn!("no signer configured, submit setMerkleRoot({:?}, {}) manually", tree.root(), cid);
        None
    };

    Ok(RoundArtifact {
        root: tree.root(),
        cid,
        block_number: current_block,
        blob,
        receipt,
    })
}
