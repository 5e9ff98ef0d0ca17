use crate::core::Block;
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use sled::{Batch, Db, Tree};
use std::path::Path;

// One keyspace holds both block records (keyed by hash) and the head pointer.
const TREE_CHAIN: &str = "chain";
const KEY_HEAD: &[u8] = b"head";

/// Handle over the sled store backing a ledger.
#[derive(Debug, Clone)]
pub struct Database {
    db: Db,
    chain: Tree,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open database: {}", e)))?;
        let chain = db
            .open_tree(TREE_CHAIN)
            .map_err(|e| LedgerError::Storage(format!("Failed to open chain tree: {}", e)))?;

        Ok(Self { db, chain })
    }

    /// Current head pointer, or `None` for a store no ledger has been
    /// initialized in. This presence check is what distinguishes a fresh
    /// store from an existing one.
    pub fn head(&self) -> Result<Option<Hash256>> {
        match self
            .chain
            .get(KEY_HEAD)
            .map_err(|e| LedgerError::Storage(format!("Failed to read head pointer: {}", e)))?
        {
            Some(bytes) => {
                let hash = Hash256::from_slice(&bytes)
                    .ok_or_else(|| LedgerError::Storage("Invalid head pointer length".to_string()))?;
                Ok(Some(hash))
            }
            None => Ok(None),
        }
    }

    /// Persist a block record and move the head pointer to it as one
    /// atomic unit. Either both land or neither does.
    pub fn commit_block(&self, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;

        let mut batch = Batch::default();
        batch.insert(block.hash.as_bytes().to_vec(), block_data);
        batch.insert(KEY_HEAD.to_vec(), block.hash.as_bytes().to_vec());

        self.chain
            .apply_batch(batch)
            .map_err(|e| LedgerError::Storage(format!("Failed to commit block: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush database: {}", e)))?;

        log::debug!("💾 Saved block {} as new head", block.hash);
        Ok(())
    }

    /// Single isolated read of one block record.
    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        match self
            .chain
            .get(hash.as_bytes())
            .map_err(|e| LedgerError::Storage(format!("Failed to get block: {}", e)))?
        {
            Some(data) => Ok(Some(Block::deserialize(&data)?)),
            None => Ok(None),
        }
    }
}
