//! Wad/Ray fixed-point arithmetic
//!
//! Amounts and indices are 256-bit unsigned integers. Wad values carry 18
//! decimals, ray values 27. Multiplication and division round half-up (a
//! half-unit is added before the truncating division) so that rounding error
//! does not accumulate against the accounting invariants.

use alloy_primitives::U256;
use thiserror::Error;

/// 1e27 - ray unit
pub const RAY: U256 = U256::from_limbs([11515845246265065472, 54210108, 0, 0]);

/// 0.5e27
pub const HALF_RAY: U256 = U256::from_limbs([5757922623132532736, 27105054, 0, 0]);

/// 1e18 - wad unit
pub const WAD: U256 = U256::from_limbs([1000000000000000000, 0, 0, 0]);

/// 0.5e18
pub const HALF_WAD: U256 = U256::from_limbs([500000000000000000, 0, 0, 0]);

/// 1e9 - conversion factor between wad and ray
pub const WAD_RAY_RATIO: U256 = U256::from_limbs([1000000000, 0, 0, 0]);

/// Basis-point denominator (100.00%)
pub const PERCENTAGE_FACTOR: u64 = 10_000;

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Errors from fixed-point arithmetic.
///
/// Overflow is an invariant violation, not a recoverable condition: the
/// whole operation that triggered it must abort.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Multiply two ray values: round(a * b / RAY), half-up
pub fn ray_mul(a: U256, b: U256) -> Result<U256, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let rounded = product.checked_add(HALF_RAY).ok_or(MathError::Overflow)?;
    Ok(rounded / RAY)
}

/// Divide two ray values: round(a * RAY / b), half-up
pub fn ray_div(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let scaled = a.checked_mul(RAY).ok_or(MathError::Overflow)?;
    let rounded = scaled
        .checked_add(b / U256::from(2u64))
        .ok_or(MathError::Overflow)?;
    Ok(rounded / b)
}

/// Multiply two wad values: round(a * b / WAD), half-up
pub fn wad_mul(a: U256, b: U256) -> Result<U256, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let rounded = product.checked_add(HALF_WAD).ok_or(MathError::Overflow)?;
    Ok(rounded / WAD)
}

/// Divide two wad values: round(a * WAD / b), half-up
pub fn wad_div(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let scaled = a.checked_mul(WAD).ok_or(MathError::Overflow)?;
    let rounded = scaled
        .checked_add(b / U256::from(2u64))
        .ok_or(MathError::Overflow)?;
    Ok(rounded / b)
}

/// Apply a basis-point percentage: round(value * bps / 10_000), half-up
pub fn percent_mul(value: U256, bps: u64) -> Result<U256, MathError> {
    let product = value
        .checked_mul(U256::from(bps))
        .ok_or(MathError::Overflow)?;
    let rounded = product
        .checked_add(U256::from(PERCENTAGE_FACTOR / 2))
        .ok_or(MathError::Overflow)?;
    Ok(rounded / U256::from(PERCENTAGE_FACTOR))
}

/// floor(a * b / c) - no rounding correction
pub fn mul_div(a: U256, b: U256, c: U256) -> Result<U256, MathError> {
    if c.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / c)
}

/// Convert a ray to a wad, rounding half-up
pub fn ray_to_wad(a: U256) -> Result<U256, MathError> {
    let rounded = a
        .checked_add(WAD_RAY_RATIO / U256::from(2u64))
        .ok_or(MathError::Overflow)?;
    Ok(rounded / WAD_RAY_RATIO)
}

/// Convert a wad to a ray (exact)
pub fn wad_to_ray(a: U256) -> Result<U256, MathError> {
    a.checked_mul(WAD_RAY_RATIO).ok_or(MathError::Overflow)
}
