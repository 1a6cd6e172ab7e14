//! Local bookkeeping: the identity and the voted/selection records, kept in
//! one JSON file. The voted record is UI state only; the contract itself
//! rejects double votes, this file never gates a submission.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// DATA STRUCTURES

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// 0x-hex 32-byte secret. Dev-grade storage; platform secure storage is
    /// the integrator's concern.
    pub secret: String,
    /// 0x-hex nullifier derived from the secret.
    pub nullifier: String,
    /// ISO 3166-1 alpha-3 citizenship code.
    pub citizenship: String,
    pub created_at: u64,
}

impl Identity {
    pub fn generate(citizenship: &str, created_at: u64) -> Identity {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        let nullifier = derive_nullifier(&secret);
        Identity {
            secret: format!("0x{}", hex::encode(secret)),
            nullifier: format!("0x{}", hex::encode(nullifier)),
            citizenship: citizenship.to_uppercase(),
            created_at,
        }
    }
}

// Deterministic commitment over the secret, linking one identity across
// votes without revealing it.
fn derive_nullifier(secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);

    let result = hasher.finalize();
    let mut nullifier = [0u8; 32];
    nullifier.copy_from_slice(&result);
    nullifier
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct StoreState {
    identity: Option<Identity>,
    /// "nullifier:contract" -> transaction handle.
    voted: BTreeMap<String, String>,
    /// proposal id -> selected option index, -1 when not voted.
    selections: BTreeMap<u64, i64>,
}

pub struct VoteStore {
    path: PathBuf,
    state: StoreState,
}

impl VoteStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<VoteStore> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreState::default(),
            Err(err) => return Err(err),
        };
        Ok(VoteStore { path, state })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.state.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) -> io::Result<()> {
        self.state.identity = Some(identity);
        self.save()
    }

    pub fn has_voted(&self, nullifier: &str, contract: &str) -> bool {
        self.state.voted.contains_key(&voted_key(nullifier, contract))
    }

    /// Records a successful submission: the voted mark and the cached
    /// selection for the proposal. Written at most once per submission.
    pub fn record_vote(
        &mut self,
        nullifier: &str,
        contract: &str,
        tx: &str,
        proposal_id: u64,
        option_index: i64,
    ) -> io::Result<()> {
        self.state
            .voted
            .insert(voted_key(nullifier, contract), tx.to_string());
        self.state.selections.insert(proposal_id, option_index);
        self.save()
    }

    pub fn selected_option(&self, proposal_id: u64) -> i64 {
        self.state.selections.get(&proposal_id).copied().unwrap_or(-1)
    }

    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(&self.state)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&self.path, json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn voted_key(nullifier: &str, contract: &str) -> String {
    format!("{}:{}", nullifier.to_lowercase(), contract.to_lowercase())
}
