//! On-chain proposal state, decoded from the raw `getProposalInfo` return
//! value by walking ABI words directly.
//!
//! Offsets in the encoding are relative to the struct or sub-struct that
//! holds them, per the ABI dynamic-encoding rules, not to the start of the
//! response. A short or malformed region defaults the field it belongs to;
//! a proposal is never lost to one bad whitelist entry.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::abi;

// PROPOSAL STATE

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProposalStatus {
    #[default]
    None,
    Waiting,
    Started,
    Ended,
    DoNotShow,
}

impl From<u64> for ProposalStatus {
    fn from(value: u64) -> Self {
        match value {
            1 => ProposalStatus::Waiting,
            2 => ProposalStatus::Started,
            3 => ProposalStatus::Ended,
            4 => ProposalStatus::DoNotShow,
            _ => ProposalStatus::None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProposalOption {
    pub index: usize,
    pub name: String,
}

/// Immutable snapshot of one proposal. Rebuilt on every fetch; tallies only
/// change by re-fetching.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProposalInfo {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub options: Vec<ProposalOption>,
    pub start_timestamp: u64,
    pub duration: u64,
    pub status: ProposalStatus,
    pub voting_results: Vec<[u64; 8]>,
    pub multichoice_bitmask: u64,
    pub voting_contract_address: String,
    pub proposal_smt_address: String,
    pub citizenship_whitelist: Vec<u64>,
}

impl ProposalInfo {
    pub fn is_active(&self) -> bool {
        self.status == ProposalStatus::Started
    }

    pub fn end_timestamp(&self) -> u64 {
        self.start_timestamp.saturating_add(self.duration)
    }

    pub fn total_votes(&self) -> u64 {
        self.voting_results
            .iter()
            .flat_map(|row| row.iter())
            .sum()
    }

    /// Whether question `index` allows selecting more than one option.
    pub fn is_multichoice(&self, index: usize) -> bool {
        index < 64 && self.multichoice_bitmask & (1 << index) != 0
    }
}

/// Decodes the hex-encoded `getProposalInfo` return value.
pub fn decode_proposal_info(raw_hex: &str) -> ProposalInfo {
    decode_proposal_info_bytes(&abi::decode_hex(raw_hex).unwrap_or_default())
}

pub fn decode_proposal_info_bytes(data: &[u8]) -> ProposalInfo {
    let mut info = ProposalInfo::default();

    // Head word: offset of the ProposalInfo struct. Offsets are bounded by
    // the response length before any arithmetic builds on them.
    let sb = match abi::usize_at(data, 0) {
        Some(sb) if sb < data.len() => sb,
        _ => {
            warn!("proposal response shorter than its own head");
            return info;
        }
    };

    info.proposal_smt_address = abi::address(data, sb).unwrap_or_default();
    info.status = abi::uint(data, sb + abi::WORD)
        .map(ProposalStatus::from)
        .unwrap_or_default();

    // votingResults: dynamic array of fixed 8-word rows, inline.
    if let Some(res_at) = relative(data, sb, abi::usize_at(data, sb + 3 * abi::WORD)) {
        info.voting_results = decode_results_rows(data, res_at).unwrap_or_default();
    }

    let Some(cb) = relative(data, sb, abi::usize_at(data, sb + 2 * abi::WORD)) else {
        return info;
    };

    info.start_timestamp = abi::uint(data, cb).unwrap_or_default();
    info.duration = abi::uint(data, cb + abi::WORD).unwrap_or_default();
    info.multichoice_bitmask = abi::uint(data, cb + 2 * abi::WORD).unwrap_or_default();

    let accepted_options = relative(data, cb, abi::usize_at(data, cb + 3 * abi::WORD))
        .and_then(|at| abi::uint_array(data, at))
        .unwrap_or_default();

    let description_bytes = relative(data, cb, abi::usize_at(data, cb + 4 * abi::WORD))
        .and_then(|at| abi::bytes_at(data, at))
        .unwrap_or_default();

    // votingWhitelist (addresses) sits at position 5 of the config struct;
    // nothing here consumes it.
    let whitelist_data = relative(data, cb, abi::usize_at(data, cb + 6 * abi::WORD))
        .and_then(|at| abi::bytes_array(data, at))
        .unwrap_or_default();

    let (title, description, option_names) = parse_description(&description_bytes);
    info.title = title;
    info.description = description;
    info.options = build_options(option_names, &accepted_options);

    if let Some(first) = whitelist_data.first() {
        info.citizenship_whitelist = decode_citizenship_whitelist(first);
    }

    info
}

/// Resolves a struct-relative offset, bounded by the data length.
fn relative(data: &[u8], base: usize, offset: Option<usize>) -> Option<usize> {
    let at = base.checked_add(offset?)?;
    if at < data.len() {
        Some(at)
    } else {
        None
    }
}

fn decode_results_rows(data: &[u8], offset: usize) -> Option<Vec<[u64; 8]>> {
    let len = abi::usize_at(data, offset)?;
    let mut rows = Vec::with_capacity(len.min(1024));
    for r in 0..len {
        let row_base = offset + abi::WORD + r * 8 * abi::WORD;
        let mut row = [0u64; 8];
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = abi::uint(data, row_base + c * abi::WORD)?;
        }
        rows.push(row);
    }
    Some(rows)
}

#[derive(Deserialize)]
struct DescriptionDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    options: Vec<String>,
}

/// The description blob is usually a JSON document; anything else falls
/// back to using the raw text with a truncated title.
fn parse_description(bytes: &[u8]) -> (String, String, Vec<String>) {
    if let Ok(doc) = serde_json::from_slice::<DescriptionDoc>(bytes) {
        return (doc.title, doc.description, doc.options);
    }
    let text = String::from_utf8_lossy(bytes).into_owned();
    let title = text.chars().take(100).collect();
    (title, text, Vec::new())
}

fn build_options(names: Vec<String>, accepted_options: &[u64]) -> Vec<ProposalOption> {
    if !names.is_empty() {
        return names
            .into_iter()
            .enumerate()
            .map(|(index, name)| ProposalOption { index, name })
            .collect();
    }
    accepted_options
        .iter()
        .enumerate()
        .map(|(index, _)| ProposalOption {
            index,
            name: format!("Option {}", index + 1),
        })
        .collect()
}

/// The first `votingWhitelistData` entry is ABI-encoded ProposalRules:
/// after the head word, the citizenship array offset sits at struct-relative
/// byte 32. Empty or short data yields an empty whitelist.
fn decode_citizenship_whitelist(entry: &[u8]) -> Vec<u64> {
    let sb = match abi::usize_at(entry, 0) {
        Some(sb) if sb < entry.len() => sb,
        _ => return Vec::new(),
    };
    let Some(arr_at) = relative(entry, sb, abi::usize_at(entry, sb + abi::WORD)) else {
        return Vec::new();
    };
    match abi::uint_array(entry, arr_at) {
        Some(list) => list,
        None => {
            warn!("whitelist rules entry too short, treating as empty");
            Vec::new()
        }
    }
}
