use web3::types::{Address, U256};

use distributor_client::apportion::{apportion_token, fee_basis_points, mul_div};
use distributor_client::reconcile::new_distributable;

fn eth(value: u64) -> U256 {
    U256::from(value) * U256::exp10(18)
}

#[test]
fn fee_percent_folds_to_basis_points() {
    assert_eq!(fee_basis_points(0.0), 0);
    assert_eq!(fee_basis_points(10.0), 1000);
    assert_eq!(fee_basis_points(2.5), 250);
    assert_eq!(fee_basis_points(0.019), 1);
    assert_eq!(fee_basis_points(100.0), 10_000);
}

#[test]
fn mul_div_truncates() {
    assert_eq!(
        mul_div(U256::from(10), U256::from(3), U256::from(4)).unwrap(),
        U256::from(7)
    );
    assert!(mul_div(U256::from(1), U256::from(1), U256::zero()).is_err());
}

#[test]
fn mul_div_survives_wide_products() {
    let max = U256::MAX;
    assert_eq!(mul_div(max, max, max).unwrap(), max);
}

#[test]
fn two_recipients_no_fee() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![
        (Address::repeat_byte(0x11), eth(1)),
        (Address::repeat_byte(0x22), eth(3)),
    ];

    let allocations = apportion_token(token, eth(1), 0, eth(4), &balances).unwrap();

    assert_eq!(allocations.len(), 2);
    assert_eq!(
        allocations[0].amount,
        U256::from_dec_str("250000000000000000").unwrap()
    );
    assert_eq!(
        allocations[1].amount,
        U256::from_dec_str("750000000000000000").unwrap()
    );
}

#[test]
fn two_recipients_ten_percent_fee() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![
        (Address::repeat_byte(0x11), eth(1)),
        (Address::repeat_byte(0x22), eth(3)),
    ];

    let allocations =
        apportion_token(token, eth(1), fee_basis_points(10.0), eth(4), &balances).unwrap();

    assert_eq!(
        allocations[0].amount,
        U256::from_dec_str("225000000000000000").unwrap()
    );
    assert_eq!(
        allocations[1].amount,
        U256::from_dec_str("675000000000000000").unwrap()
    );

    let distributed: U256 = allocations
        .iter()
        .fold(U256::zero(), |acc, a| acc + a.amount);
    assert!(distributed <= eth(1));
}

#[test]
fn sole_full_supply_depositor_gets_everything_after_fee() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![(Address::repeat_byte(0x11), eth(4))];

    let allocations =
        apportion_token(token, eth(1), fee_basis_points(10.0), eth(4), &balances).unwrap();

    assert_eq!(allocations.len(), 1);
    assert_eq!(
        allocations[0].amount,
        U256::from_dec_str("900000000000000000").unwrap()
    );
}

#[test]
fn zero_balance_holders_are_skipped() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![
        (Address::repeat_byte(0x11), U256::zero()),
        (Address::repeat_byte(0x22), eth(4)),
    ];

    let allocations = apportion_token(token, eth(1), 0, eth(4), &balances).unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].recipient, Address::repeat_byte(0x22));
}

#[test]
fn rounding_dust_is_bounded_by_candidate_count() {
    let token = Address::repeat_byte(0xaa);
    let balances: Vec<(Address, U256)> = (1u8..=3)
        .map(|byte| (Address::repeat_byte(byte), U256::from(1)))
        .collect();
    let distributable = U256::from(100);

    let allocations = apportion_token(token, distributable, 0, U256::from(3), &balances).unwrap();

    let distributed: U256 = allocations
        .iter()
        .fold(U256::zero(), |acc, a| acc + a.amount);
    assert!(distributed <= distributable);
    assert!(distributable - distributed <= U256::from(balances.len() as u64 - 1));
}

#[test]
fn zero_distributable_allocates_nothing() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![(Address::repeat_byte(0x11), eth(1))];
    let allocations = apportion_token(token, U256::zero(), 0, eth(1), &balances).unwrap();
    assert!(allocations.is_empty());
}

#[test]
fn zero_supply_allocates_nothing() {
    let token = Address::repeat_byte(0xaa);
    let balances = vec![(Address::repeat_byte(0x11), eth(1))];
    let allocations = apportion_token(token, eth(1), 0, U256::zero(), &balances).unwrap();
    assert!(allocations.is_empty());
}

#[test]
fn reconciliation_isolates_net_inflow() {
    // snapshot held 8, 4 were claimed since, contract now holds 10:
    // 6 must have flowed in.
    assert_eq!(
        new_distributable(U256::from(10), U256::from(8), U256::from(4)).unwrap(),
        U256::from(6)
    );
}

#[test]
fn reconciliation_clamps_deficits_to_zero() {
    assert_eq!(
        new_distributable(U256::from(5), U256::from(10), U256::from(2)).unwrap(),
        U256::zero()
    );
    assert_eq!(
        new_distributable(U256::zero(), U256::from(1), U256::zero()).unwrap(),
        U256::zero()
    );
}

#[test]
fn reconciliation_genesis_equivalent() {
    // With a zero snapshot and no claims the full balance is distributable.
    assert_eq!(
        new_distributable(eth(7), U256::zero(), U256::zero()).unwrap(),
        eth(7)
    );
}
