use failure::Error;
use std::collections::BTreeSet;
use web3::types::Address;

use crate::chain::Wrapper;
use crate::distribution::DistributionBlob;

/// Union of previous-round recipients and `Deposit` owners over
/// `[from_block, to_block]`, ordered by address, zero address dropped.
pub async fn build_recipient_set(
    wrapper: &Wrapper,
    prev: Option<&DistributionBlob>,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Address>, Error> {
    let mut set: BTreeSet<Address> = BTreeSet::new();

    if let Some(blob) = prev {
        for claim in blob.claims()? {
            set.insert(claim.recipient);
        }
    }

    for owner in wrapper.deposit_owners(from_block, to_block).await? {
        set.insert(owner);
    }
    set.remove(&Address::zero());

    debug!(
        "recipient set for blocks {}..={}: {} candidates",
        from_block,
        to_block,
        set.len()
    );
    Ok(set.into_iter().collect())
}
