use crate::config::COINBASE_REWARD;
use crate::core::Ledger;
use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// A balance transfer: consumes prior outputs, creates new ones.
///
/// The id is a content hash over the inputs and outputs; two structurally
/// identical transactions collide by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_output: OutPoint,
    /// Credential authorized to consume the referenced output. Plaintext
    /// matching stands in for signature verification; coinbase inputs
    /// carry the mint memo here instead.
    pub unlock_credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub owner: String,
}

/// Reference to one output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Coinbase sentinel: no prior output exists.
    pub fn null() -> Self {
        Self {
            txid: Hash256::zero(),
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == u32::MAX
    }
}

impl Transaction {
    /// Content hash over inputs and outputs, in order. The id field itself
    /// does not participate, so the id is reproducible from the stored
    /// transaction body alone.
    pub fn compute_id(&self) -> Hash256 {
        let mut data = Vec::new();

        data.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            data.extend_from_slice(input.previous_output.txid.as_bytes());
            data.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            data.extend_from_slice(&(input.unlock_credential.len() as u32).to_le_bytes());
            data.extend_from_slice(input.unlock_credential.as_bytes());
        }

        data.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_le_bytes());
            data.extend_from_slice(&(output.owner.len() as u32).to_le_bytes());
            data.extend_from_slice(output.owner.as_bytes());
        }

        Hash256::hash(&data)
    }

    pub fn set_id(&mut self) {
        self.id = self.compute_id();
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    /// Minting transaction paying the fixed reward to `beneficiary`.
    pub fn new_coinbase(beneficiary: &str, memo: &str) -> Self {
        let memo = if memo.is_empty() {
            format!("Reward to {}", beneficiary)
        } else {
            memo.to_string()
        };

        let mut txn = Self {
            id: Hash256::zero(),
            inputs: vec![TxInput {
                previous_output: OutPoint::null(),
                unlock_credential: memo,
            }],
            outputs: vec![TxOutput {
                value: COINBASE_REWARD,
                owner: beneficiary.to_string(),
            }],
        };
        txn.set_id();
        txn
    }

    /// Transfer `amount` from one credential to another, funded by a
    /// greedy selection over the ledger's unspent outputs. Produces a
    /// change output back to `from` when the selection overshoots.
    pub fn new_transaction(from: &str, to: &str, amount: u64, ledger: &Ledger) -> Result<Self> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "transfer amount must be positive".to_string(),
            ));
        }

        let (accumulated, selection) = ledger.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = Vec::new();
        for (txid, vouts) in selection {
            for vout in vouts {
                inputs.push(TxInput {
                    previous_output: OutPoint::new(txid, vout),
                    unlock_credential: from.to_string(),
                });
            }
        }

        let mut outputs = vec![TxOutput {
            value: amount,
            owner: to.to_string(),
        }];
        if accumulated > amount {
            outputs.push(TxOutput {
                value: accumulated - amount,
                owner: from.to_string(),
            });
        }

        let mut txn = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
        };
        txn.set_id();
        Ok(txn)
    }
}

impl TxInput {
    pub fn can_unlock(&self, credential: &str) -> bool {
        self.unlock_credential == credential
    }
}

impl TxOutput {
    pub fn can_be_unlocked(&self, credential: &str) -> bool {
        self.owner == credential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinbase_transaction() {
        let txn = Transaction::new_coinbase("Alice", "Genesis block");

        assert!(txn.is_coinbase());
        assert_eq!(txn.inputs.len(), 1);
        assert_eq!(txn.outputs.len(), 1);
        assert_eq!(txn.outputs[0].value, COINBASE_REWARD);
        assert!(txn.outputs[0].can_be_unlocked("Alice"));
    }

    #[test]
    fn test_coinbase_default_memo() {
        let txn = Transaction::new_coinbase("Alice", "");

        assert_eq!(txn.inputs[0].unlock_credential, "Reward to Alice");
    }

    #[test]
    fn test_id_is_pure_function_of_content() {
        let a = Transaction::new_coinbase("Alice", "memo");
        let b = Transaction::new_coinbase("Alice", "memo");

        assert_eq!(a.id, b.id);
        assert_eq!(a.id, a.compute_id());
    }

    #[test]
    fn test_id_is_order_sensitive() {
        let out_a = TxOutput {
            value: 30,
            owner: "Bob".to_string(),
        };
        let out_b = TxOutput {
            value: 70,
            owner: "Alice".to_string(),
        };
        let input = TxInput {
            previous_output: OutPoint::new(Hash256::hash(b"src"), 0),
            unlock_credential: "Alice".to_string(),
        };

        let mut forward = Transaction {
            id: Hash256::zero(),
            inputs: vec![input.clone()],
            outputs: vec![out_a.clone(), out_b.clone()],
        };
        let mut reversed = Transaction {
            id: Hash256::zero(),
            inputs: vec![input],
            outputs: vec![out_b, out_a],
        };
        forward.set_id();
        reversed.set_id();

        assert_ne!(forward.id, reversed.id);
    }

    #[test]
    fn test_non_coinbase_classification() {
        let txn = Transaction {
            id: Hash256::zero(),
            inputs: vec![TxInput {
                previous_output: OutPoint::new(Hash256::hash(b"src"), 0),
                unlock_credential: "Alice".to_string(),
            }],
            outputs: vec![],
        };

        assert!(!txn.is_coinbase());
    }

    #[test]
    fn test_unlock_predicates() {
        let input = TxInput {
            previous_output: OutPoint::new(Hash256::hash(b"src"), 1),
            unlock_credential: "Alice".to_string(),
        };
        let output = TxOutput {
            value: 10,
            owner: "Bob".to_string(),
        };

        assert!(input.can_unlock("Alice"));
        assert!(!input.can_unlock("Bob"));
        assert!(output.can_be_unlocked("Bob"));
        assert!(!output.can_be_unlocked("Alice"));
    }
}
