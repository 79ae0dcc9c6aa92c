//! Merkle tree over claim triples, compatible with the `standard-v1` dump
//! layout used by the on-chain verifier.
//!
//! Each leaf is the double keccak256 of the ABI-encoded
//! `(address recipient, address token, uint256 amount)` tuple; sibling pairs
//! are sorted byte-wise before hashing so proofs need no direction bits. The
//! node array stores the root at index 0 with the children of node `i` at
//! `2i + 1` and `2i + 2`; leaves fill the tail of the array in reverse order
//! of their ascending hash sort.

use ethabi::Token;
use failure::Error;
use tiny_keccak::{Hasher, Keccak};
use web3::types::H256;

use crate::distribution::{
    hex_h256, parse_h256, Claim, DistributionBlob, BLOB_FORMAT, LEAF_ENCODING,
};
use crate::error::DistributorError;

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    hasher.finalize(&mut output);
    output
}

pub fn leaf_hash(claim: &Claim) -> H256 {
    let encoded = ethabi::encode(&[
        Token::Address(claim.recipient),
        Token::Address(claim.token),
        Token::Uint(claim.amount),
    ]);
    H256(keccak256(&keccak256(&encoded)))
}

fn hash_pair(a: &H256, b: &H256) -> H256 {
    let (low, high) = if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    };
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(low.as_bytes());
    buffer[32..].copy_from_slice(high.as_bytes());
    H256(keccak256(&buffer))
}

/// A claim together with the position of its leaf in the node array.
#[derive(Debug, Clone)]
pub struct IndexedClaim {
    pub tree_index: usize,
    pub claim: Claim,
}

#[derive(Debug, Clone)]
pub struct DistributionTree {
    nodes: Vec<H256>,
    values: Vec<IndexedClaim>,
}

impl DistributionTree {
    /// Build the canonical tree for a list of claims.
    ///
    /// Deterministic for a given input: identical claims always hash to the
    /// identical node array and root.
    pub fn build(claims: &[Claim]) -> Result<Self, Error> {
        if claims.is_empty() {
            return Err(DistributorError::NoClaims.into());
        }

        let mut hashed: Vec<(usize, H256)> = claims
            .iter()
            .enumerate()
            .map(|(value_index, claim)| (value_index, leaf_hash(claim)))
            .collect();
        hashed.sort_by(|a, b| a.1.cmp(&b.1));

        let leaf_count = claims.len();
        let node_count = 2 * leaf_count - 1;
        let mut nodes = vec![H256::zero(); node_count];
        for (sorted_pos, (_, hash)) in hashed.iter().enumerate() {
            nodes[node_count - 1 - sorted_pos] = *hash;
        }
        for index in (0..node_count - leaf_count).rev() {
            let parent = hash_pair(&nodes[2 * index + 1], &nodes[2 * index + 2]);
            nodes[index] = parent;
        }

        let mut values: Vec<IndexedClaim> = claims
            .iter()
            .cloned()
            .map(|claim| IndexedClaim {
                tree_index: 0,
                claim,
            })
            .collect();
        for (sorted_pos, (value_index, _)) in hashed.iter().enumerate() {
            values[*value_index].tree_index = node_count - 1 - sorted_pos;
        }

        Ok(Self { nodes, values })
    }

    pub fn root(&self) -> H256 {
        self.nodes[0]
    }

    pub fn nodes(&self) -> &[H256] {
        &self.nodes
    }

    pub fn values(&self) -> &[IndexedClaim] {
        &self.values
    }

    /// Sibling path for the claim at `value_index` in the external claim
    /// order, not the leaf position inside the node array.
    pub fn proof(&self, value_index: usize) -> Result<Vec<H256>, Error> {
        let indexed = self.values.get(value_index).ok_or_else(|| {
            DistributorError::ProofNotFound(format!("value index {} out of range", value_index))
        })?;

        let mut proof = Vec::new();
        let mut index = indexed.tree_index;
        while index > 0 {
            let sibling = if index % 2 == 0 { index - 1 } else { index + 1 };
            proof.push(self.nodes[sibling]);
            index = (index - 1) / 2;
        }
        Ok(proof)
    }

    pub fn verify(&self, claim: &Claim, proof: &[H256]) -> bool {
        process_proof(leaf_hash(claim), proof) == self.root()
    }

    /// Serialize into the blob layout of one round.
    pub fn dump(&self, prev_tree_cid: String, block_number: u64) -> Result<DistributionBlob, Error> {
        let claims: Vec<Claim> = self.values.iter().map(|v| v.claim.clone()).collect();
        Ok(DistributionBlob {
            format: BLOB_FORMAT.to_owned(),
            leaf_encoding: LEAF_ENCODING.iter().map(|s| (*s).to_owned()).collect(),
            tree: self.nodes.iter().map(hex_h256).collect(),
            values: self
                .values
                .iter()
                .map(|v| v.claim.to_wire(v.tree_index))
                .collect(),
            prev_tree_cid,
            block_number,
            total_distributed: crate::distribution::total_distributed(&claims)?,
        })
    }

    /// Reconstruct a tree from a downloaded blob.
    ///
    /// The tree is rebuilt from the claim rows and compared node-for-node
    /// against the dumped array, so a blob whose `tree` does not commit to
    /// its own `values` is rejected here rather than at proof time.
    pub fn load(blob: &DistributionBlob) -> Result<Self, Error> {
        blob.check_schema()?;
        let claims = blob.claims()?;
        let rebuilt = Self::build(&claims)?;

        let dumped_nodes: Vec<H256> = blob
            .tree
            .iter()
            .map(|raw| parse_h256(raw))
            .collect::<Result<_, _>>()?;
        if rebuilt.nodes != dumped_nodes {
            return Err(DistributorError::ValidationFailure(
                "blob tree nodes do not match its values".to_owned(),
            )
            .into());
        }
        for (rebuilt_value, dumped_value) in rebuilt.values.iter().zip(blob.values.iter()) {
            if rebuilt_value.tree_index != dumped_value.tree_index {
                return Err(DistributorError::ValidationFailure(
                    "blob tree indices do not match its values".to_owned(),
                )
                .into());
            }
        }
        Ok(rebuilt)
    }
}

pub fn process_proof(leaf: H256, proof: &[H256]) -> H256 {
    proof.iter().fold(leaf, |acc, sibling| hash_pair(&acc, sibling))
}
