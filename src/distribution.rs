//! Data model of a published distribution round. Claim amounts are lifetime
//! totals; the contract subtracts what was already paid out at claim time.

use failure::Error;
use rustc_hex::{FromHex, ToHex};
use std::collections::BTreeMap;
use web3::types::{Address, H256, U256};

use crate::error::DistributorError;

pub const BLOB_FORMAT: &str = "standard-v1";
pub const LEAF_ENCODING: [&str; 3] = ["address", "address", "uint256"];

/// A recipient's cumulative entitlement of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub recipient: Address,
    pub token: Address,
    pub amount: U256,
}

/// The published, content-addressed artifact of one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBlob {
    pub format: String,
    pub leaf_encoding: Vec<String>,
    pub tree: Vec<String>,
    pub values: Vec<BlobValue>,
    pub prev_tree_cid: String,
    pub block_number: u64,
    pub total_distributed: BTreeMap<String, String>,
}

/// One claim row inside a blob; `tree_index` locates its leaf in `tree`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobValue {
    pub tree_index: usize,
    pub value: (String, String, String),
}

pub fn hex_address(address: &Address) -> String {
    let hex: String = address.as_bytes().to_hex();
    format!("0x{}", hex)
}

pub fn hex_h256(hash: &H256) -> String {
    let hex: String = hash.as_bytes().to_hex();
    format!("0x{}", hex)
}

pub fn parse_address(raw: &str) -> Result<Address, Error> {
    let stripped = raw.trim_start_matches("0x");
    let bytes: Vec<u8> = stripped
        .from_hex()
        .map_err(|_| format_err!("\"{}\" can not be parsed as an address", raw))?;
    if bytes.len() != 20 {
        return Err(format_err!("\"{}\" is not a 20 byte address", raw));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn parse_h256(raw: &str) -> Result<H256, Error> {
    let stripped = raw.trim_start_matches("0x");
    let bytes: Vec<u8> = stripped
        .from_hex()
        .map_err(|_| format_err!("\"{}\" can not be parsed as a 32 byte hash", raw))?;
    if bytes.len() != 32 {
        return Err(format_err!("\"{}\" is not a 32 byte hash", raw));
    }
    Ok(H256::from_slice(&bytes))
}

pub fn parse_amount(raw: &str) -> Result<U256, Error> {
    U256::from_dec_str(raw).map_err(|_| format_err!("\"{}\" is not a decimal uint256", raw))
}

impl Claim {
    pub fn to_wire(&self, tree_index: usize) -> BlobValue {
        BlobValue {
            tree_index,
            value: (
                hex_address(&self.recipient),
                hex_address(&self.token),
                self.amount.to_string(),
            ),
        }
    }
}

impl BlobValue {
    pub fn to_claim(&self) -> Result<Claim, Error> {
        Ok(Claim {
            recipient: parse_address(&self.value.0)?,
            token: parse_address(&self.value.1)?,
            amount: parse_amount(&self.value.2)?,
        })
    }
}

impl DistributionBlob {
    /// The claim rows in their stored (canonically sorted) order.
    pub fn claims(&self) -> Result<Vec<Claim>, Error> {
        self.values.iter().map(|v| v.to_claim()).collect()
    }

    pub fn check_schema(&self) -> Result<(), Error> {
        if self.format != BLOB_FORMAT {
            return Err(DistributorError::ValidationFailure(format!(
                "unknown blob format \"{}\"",
                self.format
            ))
            .into());
        }
        if self.leaf_encoding != LEAF_ENCODING {
            return Err(DistributorError::ValidationFailure(format!(
                "unexpected leaf encoding {:?}",
                self.leaf_encoding
            ))
            .into());
        }
        Ok(())
    }
}

/// Build the `(recipient, token) -> cumulative amount` map of a previous
/// round's blob.
pub fn cumulative_map(blob: &DistributionBlob) -> Result<BTreeMap<(Address, Address), U256>, Error> {
    let mut map = BTreeMap::new();
    for claim in blob.claims()? {
        map.insert((claim.recipient, claim.token), claim.amount);
    }
    Ok(map)
}

/// Fold this round's per-token allocations onto the previous cumulatives.
///
/// Pairs that receive nothing this round carry their prior amount forward
/// unchanged. The result is sorted by `(recipient, token)` on lowercase hex,
/// which for fixed-width hex is the same as byte order.
pub fn fold_cumulative(
    prev: &BTreeMap<(Address, Address), U256>,
    allocations: &[Claim],
) -> Result<Vec<Claim>, Error> {
    let mut folded = prev.clone();
    for allocation in allocations {
        let entry = folded
            .entry((allocation.recipient, allocation.token))
            .or_insert_with(U256::zero);
        *entry = entry
            .checked_add(allocation.amount)
            .ok_or_else(|| format_err!("cumulative amount overflows uint256"))?;
    }
    Ok(folded
        .into_iter()
        .map(|((recipient, token), amount)| Claim {
            recipient,
            token,
            amount,
        })
        .collect())
}

/// Per-token sums of cumulative amounts, keyed by lowercase token hex.
pub fn total_distributed(claims: &[Claim]) -> Result<BTreeMap<String, String>, Error> {
    let mut totals: BTreeMap<Address, U256> = BTreeMap::new();
    for claim in claims {
        let entry = totals.entry(claim.token).or_insert_with(U256::zero);
        *entry = entry
            .checked_add(claim.amount)
            .ok_or_else(|| format_err!("total distributed overflows uint256"))?;
    }
    Ok(totals
        .into_iter()
        .map(|(token, total)| (hex_address(&token), total.to_string()))
        .collect())
}
