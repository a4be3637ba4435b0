//! Amount types
//!
//! All accounting is done in integer lamports. `Decimal` is only used to
//! present amounts in whole-SOL units for reports.

use rust_decimal::Decimal;

/// Amount in the ledger's base unit.
pub type Lamports = u64;

/// Base units per whole SOL.
pub const LAMPORTS_PER_SOL: Lamports = 1_000_000_000;

const SOL_SCALE: u32 = 9;

/// Convert a lamport amount to whole SOL (exact, 9 decimal places).
pub fn lamports_to_sol(lamports: Lamports) -> Decimal {
    Decimal::from_i128_with_scale(lamports as i128, SOL_SCALE)
}
