// Basic types and protocol constants

use rand::RngCore;
use rand::rngs::OsRng;

/// Amount in quants, the smallest indivisible unit (1/100 of a cent)
pub type Quant = i64;

/// Quants in one PIG
pub const QUANTS_IN_PIG: Quant = 100 * 100;

/// Number of random bytes in a transaction or packet nonce
pub const NONCE_BYTES: usize = 8;

/// Minimum amount a genesis transaction may create
pub const MIN_GENESIS_AMOUNT: Quant = QUANTS_IN_PIG;

/// Lower bound of the regular transaction fee
pub const MIN_TXN_FEE: Quant = 10 * 100;

/// Upper bound of the regular transaction fee
pub const MAX_TXN_FEE: Quant = 1000 * 100;

/// Fraction of the amount charged as fee ("sales tax")
pub const FEE_FRACTION: f64 = 0.02;

/// Currency suffix used when displaying balances
pub const CURRENCY: &str = "PIG";

/// Generate a fresh random nonce string (hex)
pub fn gen_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Format a balance for display, e.g. `15000` -> `"1.50 PIG"`
pub fn format_balance(quants: Quant) -> String {
    let pigs = quants as f64 / QUANTS_IN_PIG as f64;
    let mut text = format!("{:.4}", pigs);
    // Keep at least two decimals, drop trailing zeros beyond that
    while text.ends_with('0') && text.len() - text.find('.').unwrap_or(0) > 3 {
        text.pop();
    }
    format!("{} {}", text, CURRENCY)
}

/// Parse a user-entered balance such as `"1.5"` or `"1.5 pig"` into quants
pub fn parse_balance(text: &str) -> Result<Quant, String> {
    let lower = text.to_ascii_lowercase();
    let number = match lower.find(&CURRENCY.to_ascii_lowercase()) {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    };

    let pigs: f64 = number
        .parse()
        .map_err(|e| format!("Invalid amount '{}': {}", text, e))?;

    if !pigs.is_finite() {
        return Err(format!("Invalid amount '{}'", text));
    }

    Ok((pigs * QUANTS_IN_PIG as f64).round() as Quant)
}
