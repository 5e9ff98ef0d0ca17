//! Core ledger components

pub mod block;
pub mod ledger;
pub mod transaction;
pub mod utxo;

pub use block::Block;
pub use ledger::{ChainIterator, Ledger};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
