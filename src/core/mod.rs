// Core ledger data structures

mod hash;
mod signable;
mod transaction;
mod types;

pub use hash::*;
pub use signable::{BlankedSignature, Signable, to_json};
pub use transaction::*;
pub use types::*;
