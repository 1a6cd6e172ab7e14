//! Vote calldata encoding: bitmasks, the packed date, the user payload
//! tuple, and the full `execute(...)` transaction data.

use sha3::{Digest, Keccak256};

use crate::abi;
use crate::prover::ZkProof;
use crate::Date;

/// Canonical signature of the deployed voting entrypoint. The selector is
/// derived from it, so a redeployment with a different signature only needs
/// this constant changed.
pub const EXECUTE_SIGNATURE: &str =
    "execute(bytes32,uint256,bytes,uint256[2],uint256[2][2],uint256[2])";

// Head of execute(): 3 static words plus the 8 inlined proof words.
const EXECUTE_PAYLOAD_OFFSET: u64 = 11 * abi::WORD as u64; // 0x160
// Head of the user payload tuple: id, votes offset, 3 inlined struct words.
const PAYLOAD_VOTES_OFFSET: u64 = 5 * abi::WORD as u64; // 0xa0

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// One bitmask word per selected option: element `k` is `1 << selected[k]`.
/// Indices outside the option count are dropped.
pub fn encode_vote_bitmasks(selected: &[usize], option_count: usize) -> Vec<[u8; abi::WORD]> {
    selected
        .iter()
        .filter(|&&index| index < option_count && index < 256)
        .map(|&index| bit_word(index))
        .collect()
}

fn bit_word(index: usize) -> [u8; abi::WORD] {
    let mut w = [0u8; abi::WORD];
    w[abi::WORD - 1 - index / 8] |= 1 << (index % 8);
    w
}

/// Six ASCII decimal digits "YYMMDD". The circuit consumes the byte values
/// themselves as a big-endian integer, not the numeric date.
pub fn encode_date_as_ascii_bytes(date: &Date) -> [u8; 6] {
    let text = format!(
        "{:02}{:02}{:02}",
        date.year % 100,
        date.month % 100,
        date.day % 100
    );
    let mut out = [0u8; 6];
    out.copy_from_slice(text.as_bytes());
    out
}

/// The packed-date integer: the six ASCII bytes read big-endian.
pub fn packed_date(date: &Date) -> u64 {
    encode_date_as_ascii_bytes(date)
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// ABI `encode(uint256, uint256[], (uint256,uint256,uint256))`: the vote
/// payload the voting contract forwards to its rules. The three-field
/// sub-struct is static and inlined, so the head is five words and the
/// votes array starts at 0xa0.
pub fn encode_user_payload(
    proposal_id: u64,
    votes: &[[u8; abi::WORD]],
    nullifier: [u8; abi::WORD],
    citizenship: u64,
    identity_creation_timestamp: u64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity((6 + votes.len()) * abi::WORD);
    abi::push_uint(&mut buf, proposal_id);
    abi::push_uint(&mut buf, PAYLOAD_VOTES_OFFSET);
    abi::push_word(&mut buf, nullifier);
    abi::push_uint(&mut buf, citizenship);
    abi::push_uint(&mut buf, identity_creation_timestamp);
    abi::push_uint(&mut buf, votes.len() as u64);
    for vote in votes {
        abi::push_word(&mut buf, *vote);
    }
    buf
}

/// Full `execute(...)` calldata: selector, inline root and date words, the
/// payload offset, the flattened proof points `a[2] b[2][2] c[2]`, then the
/// length-prefixed payload right-padded to a word boundary.
pub fn encode_execute_calldata(
    registration_root: [u8; abi::WORD],
    date_word: [u8; abi::WORD],
    user_payload: &[u8],
    proof: &ZkProof,
) -> Result<String, &'static str> {
    let points = [
        &proof.a[0],
        &proof.a[1],
        &proof.b[0][0],
        &proof.b[0][1],
        &proof.b[1][0],
        &proof.b[1][1],
        &proof.c[0],
        &proof.c[1],
    ];

    let mut buf = Vec::with_capacity(4 + (12 + user_payload.len() / abi::WORD + 1) * abi::WORD);
    buf.extend_from_slice(&selector(EXECUTE_SIGNATURE));
    abi::push_word(&mut buf, registration_root);
    abi::push_word(&mut buf, date_word);
    abi::push_uint(&mut buf, EXECUTE_PAYLOAD_OFFSET);
    for point in points {
        let word = abi::parse_u256(point).ok_or("proof point is not a decimal or hex integer")?;
        abi::push_word(&mut buf, word);
    }
    abi::push_uint(&mut buf, user_payload.len() as u64);
    abi::push_padded_bytes(&mut buf, user_payload);

    Ok(format!("0x{}", hex::encode(buf)))
}
