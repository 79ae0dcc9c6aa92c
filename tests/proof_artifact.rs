use std::io::Write;
use web3::types::{Address, U256};

use distributor_client::proof_cli::ProofArtifact;

fn artifact() -> ProofArtifact {
    ProofArtifact {
        recipient: format!("0x{}", "22".repeat(20)),
        token: format!("0x{}", "aa".repeat(20)),
        amount: "750000000000000000".to_owned(),
        proof: vec![format!("0x{}", "11".repeat(32))],
        merkle_root: format!("0x{}", "33".repeat(32)),
        tree_index: 2,
    }
}

#[test]
fn artifact_parses_back_into_a_claim() {
    let claim = artifact().to_claim().unwrap();
    assert_eq!(claim.recipient, Address::repeat_byte(0x22));
    assert_eq!(claim.token, Address::repeat_byte(0xaa));
    assert_eq!(
        claim.amount,
        U256::from_dec_str("750000000000000000").unwrap()
    );
}

#[test]
fn artifact_survives_a_file_roundtrip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&serde_json::to_vec_pretty(&artifact()).unwrap())
        .unwrap();

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let parsed: ProofArtifact = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed.amount, artifact().amount);
    assert_eq!(parsed.tree_index, 2);
    assert_eq!(parsed.proof, artifact().proof);
}

#[test]
fn artifact_rejects_a_malformed_amount() {
    let mut broken = artifact();
    broken.amount = "0xnot-decimal".to_owned();
    assert!(broken.to_claim().is_err());
}

#[test]
fn artifact_wire_format_uses_camel_case_keys() {
    let encoded = String::from_utf8(serde_json::to_vec_pretty(&artifact()).unwrap()).unwrap();
    assert!(encoded.contains("\"merkleRoot\""));
    assert!(encoded.contains("\"treeIndex\""));
}
