//! Pro-rata apportioning of a token's round distributable across wrapper
//! share holders, minus the operator fee. The fee percent is folded into
//! basis points once; allocation math never sees a float.

use ethereum_types::U512;
use failure::Error;
use std::convert::TryFrom;
use web3::types::{Address, U256};

use crate::distribution::Claim;

pub const FEE_DENOMINATOR: u64 = 10_000;

/// `floor(percent * 100)`, e.g. `10.0` -> 1000 basis points.
pub fn fee_basis_points(percent: f64) -> u64 {
    (percent * 100.0).floor() as u64
}

fn share_precision() -> U256 {
    U256::exp10(18)
}

/// `a * b / denominator` with truncation, widened so the product can not
/// overflow.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, Error> {
    if denominator.is_zero() {
        return Err(format_err!("division by zero in allocation arithmetic"));
    }
    let wide = a.full_mul(b) / U512::from(denominator);
    U256::try_from(wide).map_err(|_| format_err!("allocation arithmetic overflows uint256"))
}

/// Split `new_distributable` of `token` across the holders in `balances`.
///
/// Returns this round's per-recipient allocations (not cumulatives). Holders
/// with a zero balance and allocations that truncate to zero are skipped;
/// rounding dust stays in the distributor contract and is picked up as part
/// of the next round's inflow.
pub fn apportion_token(
    token: Address,
    new_distributable: U256,
    fee_basis_points: u64,
    total_supply: U256,
    balances: &[(Address, U256)],
) -> Result<Vec<Claim>, Error> {
    if new_distributable.is_zero() {
        return Ok(Vec::new());
    }
    if total_supply.is_zero() {
        debug!("wrapper supply is zero, nothing to apportion for {:?}", token);
        return Ok(Vec::new());
    }

    let fee_amount = mul_div(
        new_distributable,
        U256::from(fee_basis_points),
        U256::from(FEE_DENOMINATOR),
    )?;
    let actual = new_distributable
        .checked_sub(fee_amount)
        .ok_or_else(|| format_err!("operator fee exceeds the distributable amount"))?;
    debug!(
        "apportioning {} of token {:?} ({} kept as operator fee)",
        actual, token, fee_amount
    );

    let mut allocations = Vec::new();
    for (recipient, balance) in balances {
        if balance.is_zero() {
            continue;
        }
        let share = mul_div(*balance, share_precision(), total_supply)?;
        let amount = mul_div(actual, share, share_precision())?;
        if amount.is_zero() {
            continue;
        }
        allocations.push(Claim {
            recipient: *recipient,
            token,
            amount,
        });
    }
    Ok(allocations)
}
