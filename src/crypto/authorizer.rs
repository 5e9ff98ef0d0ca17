use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};
use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};

/// Capability for proving and checking ownership of a credential.
///
/// The ledger itself only compares credentials; this seam is where a real
/// signature scheme plugs in without the chain-scanning code caring which
/// one. A credential is the opaque string identifying an account - for
/// [`PlainAuthorizer`] it is an arbitrary name, for [`KeypairAuthorizer`]
/// it is the hex-encoded compressed public key.
pub trait Authorizer {
    /// Identity the authorizer proves ownership of.
    fn credential(&self) -> &str;

    /// Produce a proof binding `data` to this authorizer's credential.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Check a proof over `data` against the claimed owner credential.
    fn verify(&self, data: &[u8], proof: &[u8], owner: &str) -> bool;
}

/// Plaintext stand-in scheme: the proof is the credential itself.
///
/// This is the scheme the transaction model's ownership predicates
/// correspond to; it authorizes anyone who can name the credential.
#[derive(Debug, Clone)]
pub struct PlainAuthorizer {
    credential: String,
}

impl PlainAuthorizer {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
        }
    }
}

impl Authorizer for PlainAuthorizer {
    fn credential(&self) -> &str {
        &self.credential
    }

    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.credential.as_bytes().to_vec())
    }

    fn verify(&self, _data: &[u8], proof: &[u8], owner: &str) -> bool {
        proof == owner.as_bytes()
    }
}

/// secp256k1 ECDSA scheme. Signs the SHA-256 digest of the data; the
/// credential is the hex-encoded compressed public key.
pub struct KeypairAuthorizer {
    secret_key: SecretKey,
    credential: String,
}

impl KeypairAuthorizer {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);

        Self {
            secret_key,
            credential: hex::encode(public_key.serialize()),
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| LedgerError::Crypto(format!("Invalid secret key: {}", e)))?;
        let public_key = secret_key.public_key(&secp);

        Ok(Self {
            secret_key,
            credential: hex::encode(public_key.serialize()),
        })
    }

    fn digest(data: &[u8]) -> Message {
        Message::from_digest(*Hash256::hash(data).as_bytes())
    }
}

impl Authorizer for KeypairAuthorizer {
    fn credential(&self) -> &str {
        &self.credential
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let secp = Secp256k1::new();
        let signature = secp.sign_ecdsa(&Self::digest(data), &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }

    fn verify(&self, data: &[u8], proof: &[u8], owner: &str) -> bool {
        let secp = Secp256k1::new();

        let public_key = match hex::decode(owner)
            .ok()
            .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
        {
            Some(key) => key,
            None => return false,
        };
        let signature = match Signature::from_compact(proof) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        secp.verify_ecdsa(&Self::digest(data), &signature, &public_key)
            .is_ok()
    }
}
