//! Fixed-point helpers.
//!
//! Two scales are used throughout the protocol:
//! - `UNIT` (1e18) for balances, rates and ratios
//! - `PRECISE_UNIT` (1e27) for network debt percentages, where the extra nine
//!   digits keep small chains from rounding to zero

use odra::casper_types::{U256, U512};

/// Standard decimal scale (1e18)
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// High precision scale (1e27)
pub const PRECISE_UNIT: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Ratio between the two scales (1e9)
pub const UNIT_TO_PRECISE: u128 = PRECISE_UNIT / UNIT;

pub fn unit() -> U256 {
    U256::from(UNIT)
}

pub fn precise_unit() -> U256 {
    U256::from(PRECISE_UNIT)
}

/// `x * y / UNIT`, truncating.
pub fn multiply_decimal(x: U256, y: U256) -> U256 {
    x * y / unit()
}

/// `x * UNIT / y`, truncating. Division by zero yields zero.
pub fn divide_decimal(x: U256, y: U256) -> U256 {
    if y.is_zero() {
        return U256::zero();
    }
    x * unit() / y
}

/// `x * UNIT / y` rounded up.
pub fn divide_decimal_ceil(x: U256, y: U256) -> U256 {
    if y.is_zero() {
        return U256::zero();
    }
    let numerator = x * unit();
    let quotient = numerator / y;
    if (numerator % y).is_zero() {
        quotient
    } else {
        quotient + U256::one()
    }
}

/// `x * UNIT / y` rounded half up.
pub fn divide_decimal_round(x: U256, y: U256) -> U256 {
    divide_round(x, y, unit())
}

/// `x * y / PRECISE_UNIT` rounded half up; `y` is a precise-unit value and the
/// result is in the scale of `x`.
pub fn multiply_decimal_round_precise(x: U256, y: U256) -> U256 {
    let quotient_times_ten = x * y / (precise_unit() / U256::from(10u8));
    round_tenths(quotient_times_ten)
}

/// `x * PRECISE_UNIT / y` rounded half up, returned in precise units.
pub fn divide_decimal_round_precise(x: U256, y: U256) -> U256 {
    divide_round(x, y, precise_unit())
}

/// Absolute deviation of `current` from `reference`, as a fraction of `reference`
/// in `UNIT` scale. A zero reference has no meaningful deviation and returns zero.
pub fn deviation(current: U256, reference: U256) -> U256 {
    if reference.is_zero() {
        return U256::zero();
    }
    let delta = if current > reference {
        current - reference
    } else {
        reference - current
    };
    divide_decimal(delta, reference)
}

/// Native token amounts (9 decimals, U512 motes) to the 18 decimal internal scale.
pub fn motes_to_units(motes: U512) -> Option<U256> {
    let mut bytes = [0u8; 64];
    motes.to_little_endian(&mut bytes);
    if bytes[32..].iter().any(|b| *b != 0) {
        return None;
    }
    U256::from_little_endian(&bytes[..32]).checked_mul(U256::from(UNIT_TO_PRECISE))
}

/// 18 decimal internal amounts back to motes, truncating the sub-mote remainder.
pub fn units_to_motes(units: U256) -> U512 {
    let motes = units / U256::from(UNIT_TO_PRECISE);
    let mut bytes = [0u8; 32];
    motes.to_little_endian(&mut bytes);
    U512::from_little_endian(&bytes)
}

/// `units` with the sub-mote remainder dropped, i.e. what `units_to_motes` pays out
pub fn whole_motes(units: U256) -> U256 {
    units - units % U256::from(UNIT_TO_PRECISE)
}

fn divide_round(x: U256, y: U256, scale: U256) -> U256 {
    if y.is_zero() {
        return U256::zero();
    }
    let result_times_ten = x * scale * U256::from(10u8) / y;
    round_tenths(result_times_ten)
}

fn round_tenths(value_times_ten: U256) -> U256 {
    let ten = U256::from(10u8);
    let mut value = value_times_ten;
    if value % ten >= U256::from(5u8) {
        value += ten;
    }
    value / ten
}
