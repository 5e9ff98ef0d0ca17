use crate::config::{Config, GENESIS_MEMO};
use crate::core::{Block, Transaction};
use crate::crypto::hash::Hash256;
use crate::storage::Database;
use crate::{LedgerError, Result};

/// Handle over one persistent chain. Single-writer: concurrent appends
/// from multiple handles race on the head pointer and are not supported.
#[derive(Debug)]
pub struct Ledger {
    tip: Hash256,
    difficulty: u32,
    db: Database,
}

impl Ledger {
    /// Create a fresh ledger: mints the genesis coinbase for
    /// `reward_credential` and commits the genesis block together with the
    /// head pointer. Fails if the store already holds a chain.
    pub fn init(config: &Config, reward_credential: &str) -> Result<Self> {
        let db = Database::open(&config.storage.data_dir)?;
        if db.head()?.is_some() {
            return Err(LedgerError::AlreadyInitialized(
                config.storage.data_dir.clone(),
            ));
        }

        let coinbase = Transaction::new_coinbase(reward_credential, GENESIS_MEMO);
        let genesis = Block::genesis(coinbase, config.mining.pow_difficulty);
        db.commit_block(&genesis)?;
        log::info!("✅ Created genesis block {}", genesis.hash);

        Ok(Self {
            tip: genesis.hash,
            difficulty: config.mining.pow_difficulty,
            db,
        })
    }

    /// Reopen an existing ledger from its persisted head.
    pub fn resume(config: &Config) -> Result<Self> {
        let db = Database::open(&config.storage.data_dir)?;
        let tip = db.head()?.ok_or_else(|| {
            LedgerError::NotInitialized(config.storage.data_dir.clone())
        })?;

        Ok(Self {
            tip,
            difficulty: config.mining.pow_difficulty,
            db,
        })
    }

    /// Verify, mine, and commit a new block holding `transactions`.
    ///
    /// The block links to the *persisted* head; block record and head
    /// update land in one atomic batch. Transactions are checked against
    /// the committed chain first, so a block spending its own sibling
    /// outputs is rejected.
    pub fn append_block(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        for txn in &transactions {
            self.verify_transaction(txn)?;
        }

        let head = self.db.head()?.ok_or_else(|| {
            LedgerError::Storage("Head pointer missing during append".to_string())
        })?;

        let block = Block::new(transactions, head, self.difficulty);
        self.db.commit_block(&block)?;
        self.tip = block.hash;
        log::info!(
            "✅ Appended block {} with {} transaction(s)",
            block.hash,
            block.transactions.len()
        );

        Ok(block)
    }

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> Hash256 {
        self.tip
    }

    /// Cursor walking the chain backward from the current tip.
    pub fn iterator(&self) -> ChainIterator<'_> {
        ChainIterator {
            current_hash: self.tip,
            db: &self.db,
        }
    }
}

/// Backward cursor over the chain, one isolated store read per step.
///
/// Yields the genesis block last. Holds no snapshot across the walk, so
/// it is not consistent against a store mutated mid-traversal.
pub struct ChainIterator<'a> {
    current_hash: Hash256,
    db: &'a Database,
}

impl Iterator for ChainIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_hash.is_zero() {
            return None;
        }

        let block = match self.db.get_block(&self.current_hash) {
            Ok(Some(block)) => block,
            Ok(None) => {
                let missing = self.current_hash;
                self.current_hash = Hash256::zero();
                return Some(Err(LedgerError::Storage(format!(
                    "Missing block {} during iteration",
                    missing
                ))));
            }
            Err(e) => {
                self.current_hash = Hash256::zero();
                return Some(Err(e));
            }
        };

        self.current_hash = block.prev_hash;
        Some(Ok(block))
    }
}
