//! OpenSky core - fixed-point math, identifiers, roles
//!
//! Everything else in the workspace builds on these types. Amounts, rates
//! and indices are `U256`; wad = 1e18 decimals, ray = 1e27.

pub mod math;
pub mod roles;
pub mod types;

pub use math::{
    mul_div, percent_mul, ray_div, ray_mul, ray_to_wad, wad_div, wad_mul, wad_to_ray, MathError,
    HALF_RAY, HALF_WAD, PERCENTAGE_FACTOR, RAY, SECONDS_PER_YEAR, WAD, WAD_RAY_RATIO,
};
pub use roles::{RoleRegistry, StaticRoleRegistry};
pub use types::{AccountId, Asset, AuctionId, LoanId, NftId, ReserveId};

pub use alloy_primitives::U256;
