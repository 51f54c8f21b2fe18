//! WAD fixed-point arithmetic.
//!
//! Every value is an unsigned 256-bit integer scaled by `10^18`, so `WAD`
//! represents `1.0`. Multiplication and division floor unless the `_up`
//! variant is used. `exp` and `ln` evaluate their series at 36-decimal
//! precision and truncate back to WAD.
//!
//! External amounts (payments, position quantities) use 6 decimals; the
//! `to_wad`/`from_wad` family crosses that boundary. Amounts a trader pays
//! are converted with [`from_wad_round_up`], amounts paid out with
//! [`from_wad`].
//!
//! # Examples
//!
//! ```
//! use clmsr::domain::wad::{self, WAD};
//! use alloy_primitives::U256;
//!
//! let two = WAD * U256::from(2);
//! assert_eq!(wad::mul(two, two).unwrap(), WAD * U256::from(4));
//! assert_eq!(wad::exp(U256::ZERO).unwrap(), WAD);
//! assert_eq!(wad::to_wad(1_500_000), WAD + WAD / U256::from(2));
//! ```

use alloy_primitives::{I256, U256};
use rust_decimal::Decimal;

use super::error::MathError;

/// `1.0` as a raw integer.
pub const WAD_RAW: u128 = 1_000_000_000_000_000_000;

/// `1.0` in WAD.
pub const WAD: U256 = from_u128(WAD_RAW);

/// Scale between 6-decimal amounts and WAD.
pub const SIX_DECIMAL_SCALE: u128 = 1_000_000_000_000;

/// Largest accepted `exp` input, ~133.084 (keeps `exp` inside 256 bits).
pub const MAX_EXP_INPUT: U256 = from_u128(133_084_258_667_509_499_440);

/// `ln(2)` in WAD.
pub const LN2: U256 = from_u128(693_147_180_559_945_309);

// Series precision: 1e36.
const HP: U256 = from_u128(WAD_RAW * WAD_RAW);
const LN2_HP: U256 = from_u128(693_147_180_559_945_309_417_232_121_458_176_568);

// rust_decimal mantissas are limited to 96 bits.
const DECIMAL_MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Build a `U256` from a `u128` in const context.
#[must_use]
pub const fn from_u128(raw: u128) -> U256 {
    U256::from_limbs([raw as u64, (raw >> 64) as u64, 0, 0])
}

/// `a * b / WAD`, floored.
pub fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b)
        .map(|p| p / WAD)
        .ok_or(MathError::Overflow { op: "mul" })
}

/// `a * b / WAD`, rounded up.
pub fn mul_up(a: U256, b: U256) -> Result<U256, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow { op: "mul_up" })?;
    Ok(ceil_div(product, WAD))
}

/// `a * WAD / b`, floored.
pub fn div(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    a.checked_mul(WAD)
        .map(|n| n / b)
        .ok_or(MathError::Overflow { op: "div" })
}

/// `a * WAD / b`, rounded up.
pub fn div_up(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let numerator = a.checked_mul(WAD).ok_or(MathError::Overflow { op: "div_up" })?;
    Ok(ceil_div(numerator, b))
}

pub fn add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow { op: "add" })
}

pub fn sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow { op: "sub" })
}

/// Square root of a WAD value, floored.
pub fn sqrt(x: U256) -> Result<U256, MathError> {
    let scaled = x.checked_mul(WAD).ok_or(MathError::Overflow { op: "sqrt" })?;
    Ok(isqrt(scaled))
}

/// Natural exponential of a non-negative WAD value.
///
/// Range-reduces `x = k·ln2 + r`, evaluates the Taylor series for `e^r`
/// and shifts the result left by `k`.
pub fn exp(x: U256) -> Result<U256, MathError> {
    if x.is_zero() {
        return Ok(WAD);
    }
    if x > MAX_EXP_INPUT {
        return Err(MathError::ExpInputTooLarge {
            input: x,
            max: MAX_EXP_INPUT,
        });
    }

    let x_hp = x * WAD;
    let k = x_hp / LN2_HP;
    let r = x_hp - k * LN2_HP;

    let mut sum = HP;
    let mut term = HP;
    let mut n = 1u64;
    loop {
        term = term * r / (HP * U256::from(n));
        if term.is_zero() {
            break;
        }
        sum += term;
        n += 1;
    }

    // k <= 192 given MAX_EXP_INPUT
    let shift = k.as_limbs()[0] as usize;
    (sum / WAD)
        .checked_shl(shift)
        .ok_or(MathError::Overflow { op: "exp" })
}

/// Natural logarithm of a positive WAD value.
///
/// Negative for inputs below `WAD`; exactly zero at `WAD`.
pub fn ln(x: U256) -> Result<I256, MathError> {
    if x.is_zero() {
        return Err(MathError::InvalidInput {
            reason: "ln of non-positive value",
            value: x.to_string(),
        });
    }
    if x >= WAD {
        return Ok(I256::from_raw(ln_unsigned(x)?));
    }
    let inverse = div(WAD, x)?;
    Ok(-I256::from_raw(ln_unsigned(inverse)?))
}

/// Natural logarithm for `x >= WAD`, where the result is non-negative.
///
/// Splits `x = 2^n · y` with `y` in `[1, 2)` and sums the `atanh` series
/// `ln y = 2 Σ z^(2k+1)/(2k+1)`, `z = (y-1)/(y+1) <= 1/3`.
pub fn ln_unsigned(x: U256) -> Result<U256, MathError> {
    if x < WAD {
        return Err(MathError::InvalidInput {
            reason: "unsigned ln requires x >= 1",
            value: x.to_string(),
        });
    }
    if x == WAD {
        return Ok(U256::ZERO);
    }

    let integer = x / WAD;
    let n = integer.bit_len() - 1;
    let y_hp = (x >> n) * WAD;

    let z = (y_hp - HP) * HP / (y_hp + HP);
    let z2 = z * z / HP;
    let mut term = z;
    let mut sum = z;
    let mut k = 1u64;
    loop {
        term = term * z2 / HP;
        if term.is_zero() {
            break;
        }
        sum += term / U256::from(2 * k + 1);
        k += 1;
    }

    let ln_hp = U256::from(n) * LN2_HP + sum * U256::from(2);
    Ok(ln_hp / WAD)
}

/// `Σ exp(v_i)`.
pub fn sum_exp(values: &[U256]) -> Result<U256, MathError> {
    if values.is_empty() {
        return Err(MathError::EmptyArray);
    }
    values
        .iter()
        .try_fold(U256::ZERO, |acc, v| add(acc, exp(*v)?))
}

/// `ln(Σ exp(v_i))` computed as `m + ln(Σ exp(v_i - m))` with `m = max v_i`.
///
/// Terms whose gap to the maximum exceeds the `exp` domain contribute zero.
pub fn log_sum_exp(values: &[U256]) -> Result<U256, MathError> {
    let max = *values.iter().max().ok_or(MathError::EmptyArray)?;
    let total = values.iter().try_fold(U256::ZERO, |acc, v| {
        let gap = max - *v;
        let term = if gap > MAX_EXP_INPUT {
            U256::ZERO
        } else {
            div(WAD, exp(gap)?)?
        };
        add(acc, term)
    })?;
    add(max, ln_unsigned(total)?)
}

/// Marginal price of one bin: `exp_value / total_sum`.
pub fn price(exp_value: U256, total_sum: U256) -> Result<U256, MathError> {
    div(exp_value, total_sum)
}

/// LMSR cost magnitude `alpha · |ln(sum_after / sum_before)|`.
///
/// Buying grows the sum and selling shrinks it; the caller knows which
/// direction it is pricing, so only the magnitude is returned.
pub fn cost(alpha: U256, sum_before: U256, sum_after: U256) -> Result<U256, MathError> {
    let ratio = if sum_after >= sum_before {
        div(sum_after, sum_before)?
    } else {
        div(sum_before, sum_after)?
    };
    mul(alpha, ln_unsigned(ratio)?)
}

/// 6-decimal amount to WAD.
#[must_use]
pub fn to_wad(amount: u128) -> U256 {
    U256::from(amount) * U256::from(SIX_DECIMAL_SCALE)
}

/// WAD to 6-decimal amount, floored.
pub fn from_wad(value: U256) -> Result<u128, MathError> {
    narrow(value / U256::from(SIX_DECIMAL_SCALE), "from_wad")
}

/// WAD to 6-decimal amount, rounded up.
pub fn from_wad_round_up(value: U256) -> Result<u128, MathError> {
    narrow(
        ceil_div(value, U256::from(SIX_DECIMAL_SCALE)),
        "from_wad_round_up",
    )
}

/// Human-unit decimal to WAD. Digits beyond 18 decimals are truncated.
pub fn from_decimal(value: Decimal) -> Result<U256, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::InvalidInput {
            reason: "negative decimal",
            value: value.to_string(),
        });
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    if scale <= 18 {
        Ok(mantissa * U256::from(10u128.pow(18 - scale)))
    } else {
        Ok(mantissa / U256::from(10u128.pow(scale - 18)))
    }
}

/// WAD to a human-unit decimal, dropping precision only when the value
/// does not fit a 96-bit mantissa at 18 decimals.
pub fn to_decimal(value: U256) -> Result<Decimal, MathError> {
    let limit = U256::from(DECIMAL_MAX_MANTISSA);
    let mut raw = value;
    let mut scale = 18u32;
    while raw > limit && scale > 0 {
        raw /= U256::from(10);
        scale -= 1;
    }
    if raw > limit {
        return Err(MathError::Overflow { op: "to_decimal" });
    }
    let mantissa = narrow(raw, "to_decimal")? as i128;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|d| d.normalize())
        .map_err(|_| MathError::Overflow { op: "to_decimal" })
}

fn ceil_div(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        quotient
    } else {
        quotient + U256::from(1)
    }
}

fn narrow(value: U256, op: &'static str) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow { op });
    }
    let limbs = value.as_limbs();
    Ok(u128::from(limbs[0]) | (u128::from(limbs[1]) << 64))
}

fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::ZERO;
    }
    let mut x = U256::from(1) << ((n.bit_len() + 1) / 2);
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}
