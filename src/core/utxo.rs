//! UTXO scanning: reconstructs spendable balances by replaying the whole
//! chain head-to-genesis. There is no separate index; correctness relies
//! on descending scan order combined with spent-before-seen bookkeeping.

use crate::core::transaction::OutPoint;
use crate::core::{Ledger, Transaction, TxOutput};
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use std::collections::{HashMap, HashSet};

/// Spent-output bookkeeping scoped to one scan pass.
#[derive(Debug, Default)]
struct SpentIndex {
    consumed: HashMap<Hash256, Vec<u32>>,
}

impl SpentIndex {
    fn mark(&mut self, outpoint: &OutPoint) {
        self.consumed
            .entry(outpoint.txid)
            .or_default()
            .push(outpoint.vout);
    }

    fn is_spent(&self, txid: &Hash256, vout: u32) -> bool {
        self.consumed
            .get(txid)
            .map_or(false, |vouts| vouts.contains(&vout))
    }
}

impl Ledger {
    /// One full replay: every transaction holding at least one unspent
    /// output owned by `credential`, newest first, paired with the indices
    /// of those outputs.
    ///
    /// Spent marks recorded while visiting a spending transaction hide
    /// outputs of transactions encountered later in the walk (older in the
    /// chain), which is what makes the single descending pass sufficient.
    fn scan_unspent(&self, credential: &str) -> Result<Vec<(Transaction, Vec<u32>)>> {
        let mut unspent = Vec::new();
        let mut spent = SpentIndex::default();

        for block in self.iterator() {
            let block = block?;
            for txn in &block.transactions {
                let mut matching = Vec::new();
                for (vout, output) in txn.outputs.iter().enumerate() {
                    let vout = vout as u32;
                    if spent.is_spent(&txn.id, vout) {
                        continue;
                    }
                    if output.can_be_unlocked(credential) {
                        matching.push(vout);
                    }
                }
                if !matching.is_empty() {
                    unspent.push((txn.clone(), matching));
                }

                if !txn.is_coinbase() {
                    for input in &txn.inputs {
                        if input.can_unlock(credential) {
                            spent.mark(&input.previous_output);
                        }
                    }
                }
            }
        }

        Ok(unspent)
    }

    /// Transactions with unspent outputs owned by `credential`.
    ///
    /// Deliberately denormalized: a transaction is repeated once per
    /// matching unspent output, for callers that filter again.
    pub fn find_unspent_transactions(&self, credential: &str) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for (txn, vouts) in self.scan_unspent(credential)? {
            for _ in &vouts {
                transactions.push(txn.clone());
            }
        }
        Ok(transactions)
    }

    /// Every unspent output owned by `credential`. No output is returned
    /// twice, and the sum of values is the credential's spendable balance.
    pub fn find_unspent_outputs(&self, credential: &str) -> Result<Vec<TxOutput>> {
        let mut outputs = Vec::new();
        for (txn, vouts) in self.scan_unspent(credential)? {
            for vout in vouts {
                outputs.push(txn.outputs[vout as usize].clone());
            }
        }
        Ok(outputs)
    }

    /// Greedy first-fit selection of unspent outputs covering `amount`.
    ///
    /// Scans in the same order as [`Self::find_unspent_transactions`] and
    /// stops as soon as the accumulated value reaches `amount`; the result
    /// may overshoot and may fall short - the caller compares.
    pub fn find_spendable_outputs(
        &self,
        credential: &str,
        amount: u64,
    ) -> Result<(u64, HashMap<Hash256, Vec<u32>>)> {
        let mut selection: HashMap<Hash256, Vec<u32>> = HashMap::new();
        let mut accumulated = 0u64;

        'work: for (txn, vouts) in self.scan_unspent(credential)? {
            for vout in vouts {
                if accumulated < amount {
                    accumulated += txn.outputs[vout as usize].value;
                    selection.entry(txn.id).or_default().push(vout);

                    if accumulated >= amount {
                        break 'work;
                    }
                }
            }
        }

        Ok((accumulated, selection))
    }

    /// Spendable balance: sum of all unspent output values.
    pub fn balance(&self, credential: &str) -> Result<u64> {
        let outputs = self.find_unspent_outputs(credential)?;
        Ok(outputs.iter().map(|output| output.value).sum())
    }

    /// Look a transaction up by id, walking the chain from the head.
    pub fn find_transaction(&self, id: &Hash256) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            for txn in block.transactions {
                if &txn.id == id {
                    return Ok(Some(txn));
                }
            }
        }
        Ok(None)
    }

    /// Check a pending transaction against the committed chain: every
    /// input must reference an existing output, be unlockable by the
    /// input's credential, and not already be consumed; input value must
    /// cover output value.
    pub fn verify_transaction(&self, txn: &Transaction) -> Result<()> {
        if txn.is_coinbase() {
            return Ok(());
        }
        if txn.inputs.is_empty() {
            return Err(LedgerError::InvalidInput(
                "transaction has no inputs".to_string(),
            ));
        }

        let spent = self.spent_outpoints()?;
        let mut claimed = HashSet::new();
        let mut total_in = 0u64;

        for input in &txn.inputs {
            let outpoint = input.previous_output;
            if !claimed.insert(outpoint) {
                return Err(LedgerError::DoubleSpend(format!(
                    "{} consumes {}:{} twice",
                    txn.id, outpoint.txid, outpoint.vout
                )));
            }

            let source = self.find_transaction(&outpoint.txid)?.ok_or_else(|| {
                LedgerError::InvalidInput(format!("Unknown source transaction {}", outpoint.txid))
            })?;
            let output = source.outputs.get(outpoint.vout as usize).ok_or_else(|| {
                LedgerError::InvalidInput(format!(
                    "Source transaction {} has no output {}",
                    outpoint.txid, outpoint.vout
                ))
            })?;

            if !output.can_be_unlocked(&input.unlock_credential) {
                return Err(LedgerError::InvalidInput(format!(
                    "Credential cannot unlock output {}:{}",
                    outpoint.txid, outpoint.vout
                )));
            }
            if spent.contains(&outpoint) {
                return Err(LedgerError::DoubleSpend(format!(
                    "Output {}:{} already consumed",
                    outpoint.txid, outpoint.vout
                )));
            }

            total_in += output.value;
        }

        if total_in < txn.total_output_value() {
            return Err(LedgerError::InvalidInput(format!(
                "Outputs ({}) exceed inputs ({})",
                txn.total_output_value(),
                total_in
            )));
        }

        Ok(())
    }

    /// Every outpoint consumed anywhere in the committed chain.
    fn spent_outpoints(&self) -> Result<HashSet<OutPoint>> {
        let mut spent = HashSet::new();
        for block in self.iterator() {
            for txn in block?.transactions {
                if txn.is_coinbase() {
                    continue;
                }
                for input in txn.inputs {
                    spent.insert(input.previous_output);
                }
            }
        }
        Ok(spent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MiningConfig, StorageConfig, COINBASE_REWARD};
    use crate::core::transaction::TxInput;
    use tempfile::TempDir;

    fn test_ledger(dir: &TempDir, beneficiary: &str) -> Ledger {
        let config = Config {
            storage: StorageConfig {
                data_dir: dir.path().join("ledger"),
            },
            mining: MiningConfig { pow_difficulty: 8 },
        };
        Ledger::init(&config, beneficiary).unwrap()
    }

    #[test]
    fn test_genesis_grants_reward() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let ledger = test_ledger(&temp_dir, "Alice");

        assert_eq!(ledger.balance("Alice")?, COINBASE_REWARD);
        assert_eq!(ledger.balance("Bob")?, 0);

        let outputs = ledger.find_unspent_outputs("Alice")?;
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].value, COINBASE_REWARD);

        Ok(())
    }

    #[test]
    fn test_spendable_outputs_early_exit() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let ledger = test_ledger(&temp_dir, "Alice");

        let (accumulated, selection) = ledger.find_spendable_outputs("Alice", 30)?;
        assert!(accumulated >= 30);
        assert_eq!(selection.len(), 1);

        let (short, _) = ledger.find_spendable_outputs("Alice", 1000)?;
        assert_eq!(short, COINBASE_REWARD);

        Ok(())
    }

    #[test]
    fn test_transfer_moves_value_and_hides_source() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = test_ledger(&temp_dir, "Alice");

        let txn = Transaction::new_transaction("Alice", "Bob", 30, &ledger)?;
        ledger.append_block(vec![txn])?;

        let bob = ledger.find_unspent_outputs("Bob")?;
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].value, 30);

        let alice = ledger.find_unspent_outputs("Alice")?;
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].value, COINBASE_REWARD - 30);

        Ok(())
    }

    #[test]
    fn test_unspent_transactions_denormalized_per_output() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = test_ledger(&temp_dir, "Alice");

        // Self-transfer: one transaction carrying two Alice-owned outputs.
        let txn = Transaction::new_transaction("Alice", "Alice", 40, &ledger)?;
        assert_eq!(txn.outputs.len(), 2);
        ledger.append_block(vec![txn])?;

        // Both outputs owned by Alice, so the transaction repeats twice
        // while the outputs stay distinct.
        let transactions = ledger.find_unspent_transactions("Alice")?;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].id, transactions[1].id);

        let outputs = ledger.find_unspent_outputs("Alice")?;
        assert_eq!(outputs.len(), 2);
        assert_eq!(ledger.balance("Alice")?, COINBASE_REWARD);

        Ok(())
    }

    #[test]
    fn test_verify_rejects_double_spend() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = test_ledger(&temp_dir, "Alice");

        let spend = Transaction::new_transaction("Alice", "Bob", 30, &ledger)?;
        let genesis_outpoint = spend.inputs[0].previous_output;
        ledger.append_block(vec![spend])?;

        // Replay an input against the already-consumed genesis output.
        let mut replay = Transaction {
            id: Hash256::zero(),
            inputs: vec![TxInput {
                previous_output: genesis_outpoint,
                unlock_credential: "Alice".to_string(),
            }],
            outputs: vec![TxOutput {
                value: COINBASE_REWARD,
                owner: "Mallory".to_string(),
            }],
        };
        replay.set_id();

        let err = ledger.verify_transaction(&replay).unwrap_err();
        assert!(matches!(err, LedgerError::DoubleSpend(_)));

        Ok(())
    }

    #[test]
    fn test_verify_rejects_foreign_credential() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let ledger = test_ledger(&temp_dir, "Alice");

        let genesis_block = ledger.iterator().next().unwrap()?;
        let genesis_txn = &genesis_block.transactions[0];
        let mut theft = Transaction {
            id: Hash256::zero(),
            inputs: vec![TxInput {
                previous_output: OutPoint::new(genesis_txn.id, 0),
                unlock_credential: "Mallory".to_string(),
            }],
            outputs: vec![TxOutput {
                value: COINBASE_REWARD,
                owner: "Mallory".to_string(),
            }],
        };
        theft.set_id();

        let err = ledger.verify_transaction(&theft).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        Ok(())
    }

    #[test]
    fn test_find_transaction() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = test_ledger(&temp_dir, "Alice");

        let txn = Transaction::new_transaction("Alice", "Bob", 30, &ledger)?;
        let id = txn.id;
        ledger.append_block(vec![txn])?;

        assert!(ledger.find_transaction(&id)?.is_some());
        assert!(ledger.find_transaction(&Hash256::hash(b"missing"))?.is_none());

        Ok(())
    }
}
