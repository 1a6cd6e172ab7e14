//! Core of the anonymous passport-voting client: passive authentication of
//! the passport SOD, the hand-rolled ABI codecs for proposal state and vote
//! calldata, and the submission pipeline that ties proof inputs, proof
//! generation and transaction submission together.

pub mod abi;
pub mod calldata;
pub mod config;
pub mod der;
pub mod error;
pub mod proposal;
pub mod prover;
pub mod relayer;
pub mod rpc;
pub mod sod;
pub mod store;
pub mod tx;
pub mod vote;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

pub use error::{ChainError, MalformedDocument, RelayerRejection, VoteError};
pub use proposal::{decode_proposal_info, ProposalInfo, ProposalStatus};
pub use sod::{verify_dg1_hash, verify_sod_signature, Sod};
pub use vote::{VoteProgress, VoteReceipt, VoteSubmitter};

// DATA STRUCTURES

// Represents a date (year, month, day)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub fn today() -> Date {
        let now = chrono::Utc::now();
        Date {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
        }
    }
}

/// Packs an ISO 3166-1 alpha-3 citizenship code into the integer form the
/// circuit and the whitelist carry: the ASCII bytes read big-endian.
pub fn citizenship_code(alpha3: &str) -> u64 {
    alpha3
        .bytes()
        .take(8)
        .fold(0u64, |acc, b| (acc << 8) | b as u64)
}
