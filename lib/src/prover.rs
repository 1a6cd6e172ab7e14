//! Boundary to the external proof system. Circuit execution and proving-key
//! management live outside this crate; everything here is the input document
//! handed over and the Groth16-shaped result handed back.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// DATA STRUCTURES

/// Groth16 proof points as the prover emits them: decimal or 0x-hex strings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ZkProof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
    #[serde(default)]
    pub pub_signals: Vec<String>,
}

/// The circuit-input document, built once per vote attempt and never
/// persisted. Field spellings follow the circuit's input JSON.
#[derive(Serialize, Clone, Debug)]
pub struct CircuitInputs {
    pub registration_root: String,
    /// ASCII "YYMMDD" bytes packed as a big-endian integer.
    pub current_date: u64,
    pub proposal_event_id: String,
    pub nullifier: String,
    pub citizenship: u64,
    pub identity_creation_timestamp: u64,
    /// One 256-bit bitmask word per selected option, 0x-hex.
    pub votes: Vec<String>,
}

impl CircuitInputs {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
#[error("prover: {0}")]
pub struct ProverError(pub String);

pub trait ProofGenerator {
    fn generate(&self, inputs: &CircuitInputs) -> Result<ZkProof, ProverError>;
}

/// Synthesizes random field-sized values in valid Groth16 shape. Not
/// cryptographically meaningful; only acceptable against the permissive
/// dev-mode verifier stub.
pub struct MockProver;

impl ProofGenerator for MockProver {
    fn generate(&self, _inputs: &CircuitInputs) -> Result<ZkProof, ProverError> {
        Ok(ZkProof {
            a: [random_point(), random_point()],
            b: [
                [random_point(), random_point()],
                [random_point(), random_point()],
            ],
            c: [random_point(), random_point()],
            pub_signals: Vec::new(),
        })
    }
}

// 31 random bytes stay below the BN254 field modulus.
fn random_point() -> String {
    let mut bytes = [0u8; 31];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}
