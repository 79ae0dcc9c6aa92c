use std::collections::BTreeMap;
use web3::types::{Address, U256};

use distributor_client::distribution::{
    cumulative_map, fold_cumulative, hex_address, total_distributed, Claim, DistributionBlob,
};
use distributor_client::merkle::DistributionTree;

fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn claim(recipient: u8, token: u8, amount: u64) -> Claim {
    Claim {
        recipient: addr(recipient),
        token: addr(token),
        amount: U256::from(amount),
    }
}

fn prev_round() -> BTreeMap<(Address, Address), U256> {
    let mut prev = BTreeMap::new();
    prev.insert((addr(0x11), addr(0xaa)), U256::from(250));
    prev.insert((addr(0x22), addr(0xaa)), U256::from(750));
    prev.insert((addr(0x22), addr(0xbb)), U256::from(40));
    prev
}

#[test]
fn allocations_add_onto_previous_cumulatives() {
    let allocations = vec![claim(0x11, 0xaa, 100), claim(0x33, 0xaa, 5)];
    let folded = fold_cumulative(&prev_round(), &allocations).unwrap();

    let lookup: BTreeMap<(Address, Address), U256> = folded
        .iter()
        .map(|c| ((c.recipient, c.token), c.amount))
        .collect();
    assert_eq!(lookup[&(addr(0x11), addr(0xaa))], U256::from(350));
    assert_eq!(lookup[&(addr(0x33), addr(0xaa))], U256::from(5));
}

#[test]
fn untouched_pairs_carry_forward_unchanged() {
    let folded = fold_cumulative(&prev_round(), &[claim(0x11, 0xaa, 100)]).unwrap();

    let lookup: BTreeMap<(Address, Address), U256> = folded
        .iter()
        .map(|c| ((c.recipient, c.token), c.amount))
        .collect();
    assert_eq!(lookup[&(addr(0x22), addr(0xaa))], U256::from(750));
    assert_eq!(lookup[&(addr(0x22), addr(0xbb))], U256::from(40));
}

#[test]
fn cumulative_amounts_never_decrease() {
    let prev = prev_round();
    let folded = fold_cumulative(&prev, &[claim(0x11, 0xaa, 1), claim(0x22, 0xbb, 2)]).unwrap();

    for c in &folded {
        let before = prev
            .get(&(c.recipient, c.token))
            .cloned()
            .unwrap_or_default();
        assert!(c.amount >= before);
    }
}

#[test]
fn folded_claims_are_sorted_by_recipient_then_token() {
    let folded = fold_cumulative(&prev_round(), &[claim(0x33, 0xaa, 5)]).unwrap();

    let keys: Vec<(String, String)> = folded
        .iter()
        .map(|c| (hex_address(&c.recipient), hex_address(&c.token)))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn totals_sum_cumulatives_per_token() {
    let folded = fold_cumulative(&prev_round(), &[claim(0x11, 0xaa, 100)]).unwrap();
    let totals = total_distributed(&folded).unwrap();

    assert_eq!(totals[&hex_address(&addr(0xaa))], "1100");
    assert_eq!(totals[&hex_address(&addr(0xbb))], "40");
}

#[test]
fn empty_round_keeps_the_previous_root() {
    // A round with no new inflow and no new depositors republishes the
    // previous claims verbatim, so the root can not change.
    let prev_claims = fold_cumulative(&prev_round(), &[]).unwrap();
    let prev_tree = DistributionTree::build(&prev_claims).unwrap();

    let next_claims = fold_cumulative(&prev_round(), &[]).unwrap();
    let next_tree = DistributionTree::build(&next_claims).unwrap();

    assert_eq!(prev_tree.root(), next_tree.root());
    assert_eq!(prev_tree.nodes(), next_tree.nodes());
}

#[test]
fn genesis_fold_starts_from_nothing() {
    let folded = fold_cumulative(&BTreeMap::new(), &[claim(0x11, 0xaa, 9)]).unwrap();
    assert_eq!(folded.len(), 1);
    assert_eq!(folded[0].amount, U256::from(9));
}

#[test]
fn blob_json_roundtrip_preserves_claims() {
    let claims = fold_cumulative(&prev_round(), &[claim(0x33, 0xaa, 5)]).unwrap();
    let tree = DistributionTree::build(&claims).unwrap();
    let blob = tree.dump("bafyprev".to_owned(), 77).unwrap();

    let encoded = serde_json::to_vec_pretty(&blob).unwrap();
    let decoded: DistributionBlob = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(decoded.claims().unwrap(), blob.claims().unwrap());
    assert_eq!(decoded.block_number, 77);
    assert_eq!(decoded.prev_tree_cid, "bafyprev");
    assert_eq!(decoded.total_distributed, blob.total_distributed);
}

#[test]
fn blob_wire_format_uses_camel_case_keys() {
    let claims = vec![claim(0x11, 0xaa, 1)];
    let tree = DistributionTree::build(&claims).unwrap();
    let blob = tree.dump(String::new(), 1).unwrap();

    let encoded = String::from_utf8(serde_json::to_vec_pretty(&blob).unwrap()).unwrap();
    assert!(encoded.contains("\"leafEncoding\""));
    assert!(encoded.contains("\"prevTreeCid\""));
    assert!(encoded.contains("\"blockNumber\""));
    assert!(encoded.contains("\"totalDistributed\""));
    assert!(encoded.contains("\"treeIndex\""));
    // Two-space indentation is part of the published format.
    assert!(encoded.contains("\n  \"format\": \"standard-v1\""));
}

#[test]
fn cumulative_map_roundtrips_through_a_blob() {
    let claims = fold_cumulative(&prev_round(), &[]).unwrap();
    let tree = DistributionTree::build(&claims).unwrap();
    let blob = tree.dump(String::new(), 1).unwrap();

    assert_eq!(cumulative_map(&blob).unwrap(), prev_round());
}

#[test]
fn total_distributed_matches_blob_values() {
    let claims = fold_cumulative(&prev_round(), &[claim(0x11, 0xaa, 100)]).unwrap();
    let tree = DistributionTree::build(&claims).unwrap();
    let blob = tree.dump(String::new(), 1).unwrap();

    let mut sums: BTreeMap<String, U256> = BTreeMap::new();
    for value in &blob.values {
        let c = value.to_claim().unwrap();
        let entry = sums.entry(hex_address(&c.token)).or_default();
        *entry += c.amount;
    }
    for (token, total) in &blob.total_distributed {
        assert_eq!(&sums[token].to_string(), total);
    }
}
