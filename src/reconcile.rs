//! Per-token reconciliation of what this round may distribute.
//!
//! The distributor contract's balance at any height equals everything ever
//! sent to it minus everything already claimed. Subtracting the claims made
//! since the previous snapshot from that snapshot's balance isolates the net
//! inflow since the last round, which is exactly the pool the operator is
//! authorised to hand out now.

use failure::Error;
use web3::types::{Address, U256};

use crate::chain::{Chain, Distributor};

/// `current - (snapshot - claims_since)`, clamped to zero.
///
/// Total over all `U256` inputs; a deficit (more claimed than the snapshot
/// held, or an outflow the model does not know about) yields zero instead of
/// underflowing.
pub fn new_distributable(current: U256, snapshot: U256, claims_since: U256) -> Result<U256, Error> {
    let adjusted = current
        .checked_add(claims_since)
        .ok_or_else(|| format_err!("reconciliation arithmetic overflows uint256"))?;
    Ok(adjusted.saturating_sub(snapshot))
}

/// Compute the distributable amount of `token` for this round.
///
/// `prev_block` is the previous round's snapshot height; `None` means the
/// genesis round, where the full current balance is up for distribution.
pub async fn token_distributable(
    chain: &Chain,
    distributor: &Distributor,
    token: Address,
    prev_block: Option<u64>,
    current_block: u64,
) -> Result<U256, Error> {
    let erc20 = chain.erc20(token)?;
    let current = erc20.balance_of(distributor.address(), Some(current_block)).await?;

    let prev_block = match prev_block {
        None => {
            debug!("genesis round: distributable for {:?} is {}", token, current);
            return Ok(current);
        }
        Some(block) => block,
    };

    let snapshot = erc20.balance_of(distributor.address(), Some(prev_block)).await?;
    let claims_since = distributor
        .claimed_since(token, prev_block + 1, current_block)
        .await?;
    let distributable = new_distributable(current, snapshot, claims_since)?;
    debug!(
        "token {:?}: current {} snapshot {} claimed-since {} -> distributable {}",
        token, current, snapshot, claims_since, distributable
    );
    Ok(distributable)
}
