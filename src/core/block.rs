use crate::core::Transaction;
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One link of the chain. `prev_hash` is zero only for the genesis block,
/// which terminates backward traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Hash256,
    pub prev_hash: Hash256,
    pub timestamp: i64,
    pub nonce: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build and mine a block on top of `prev_hash`.
    pub fn new(transactions: Vec<Transaction>, prev_hash: Hash256, difficulty: u32) -> Self {
        let mut block = Self {
            hash: Hash256::zero(),
            prev_hash,
            timestamp: Utc::now().timestamp(),
            nonce: 0,
            transactions,
        };
        block.mine(difficulty);
        block
    }

    /// The chain's root block, wrapping the initial coinbase transaction.
    pub fn genesis(coinbase: Transaction, difficulty: u32) -> Self {
        Self::new(vec![coinbase], Hash256::zero(), difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }

    /// Digest over the transaction ids, in block order.
    pub fn hash_transactions(&self) -> Hash256 {
        let mut data = Vec::with_capacity(self.transactions.len() * 32);
        for txn in &self.transactions {
            data.extend_from_slice(txn.id.as_bytes());
        }
        Hash256::hash(&data)
    }

    fn header_hash(&self, tx_digest: &Hash256) -> Hash256 {
        let mut data = Vec::new();
        data.extend_from_slice(self.prev_hash.as_bytes());
        data.extend_from_slice(tx_digest.as_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&self.nonce.to_le_bytes());
        Hash256::hash(&data)
    }

    /// Search nonces until the header hash carries `difficulty` leading
    /// zero bits.
    fn mine(&mut self, difficulty: u32) {
        let tx_digest = self.hash_transactions();

        loop {
            let candidate = self.header_hash(&tx_digest);
            if Self::meets_difficulty(&candidate, difficulty) {
                self.hash = candidate;
                return;
            }
            self.nonce = self.nonce.wrapping_add(1);
        }
    }

    pub fn meets_difficulty(hash: &Hash256, difficulty: u32) -> bool {
        let bytes = hash.as_bytes();
        let full_bytes = (difficulty / 8) as usize;
        let remaining_bits = difficulty % 8;

        for byte in bytes.iter().take(full_bytes) {
            if *byte != 0 {
                return false;
            }
        }

        if remaining_bits > 0 && full_bytes < bytes.len() {
            let mask = 0xFFu8 << (8 - remaining_bits);
            if bytes[full_bytes] & mask != 0 {
                return false;
            }
        }

        true
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| LedgerError::Storage(format!("Failed to serialize block: {}", e)))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| LedgerError::Deserialization(e.to_string()))
    }
}
