//! Hand-rolled ABI word primitives.
//!
//! Readers return `Option` and treat any short read as absent: the proposal
//! decoder maps a missing field to its default instead of aborting the whole
//! decode. All words are big-endian, zero-left-padded to 32 bytes; hex input
//! is accepted with or without a `0x` prefix.

pub const WORD: usize = 32;

pub fn word(data: &[u8], offset: usize) -> Option<[u8; WORD]> {
    let end = offset.checked_add(WORD)?;
    data.get(offset..end)?.try_into().ok()
}

/// Reads a word as an unsigned integer. Values this protocol carries fit in
/// 64 bits; the low 8 bytes are taken.
pub fn uint(data: &[u8], offset: usize) -> Option<u64> {
    let w = word(data, offset)?;
    let mut out = [0u8; 8];
    out.copy_from_slice(&w[24..]);
    Some(u64::from_be_bytes(out))
}

pub fn usize_at(data: &[u8], offset: usize) -> Option<usize> {
    usize::try_from(uint(data, offset)?).ok()
}

/// Reads the low 20 bytes of a word as a 0x-prefixed address.
pub fn address(data: &[u8], offset: usize) -> Option<String> {
    let w = word(data, offset)?;
    Some(format!("0x{}", hex::encode(&w[12..])))
}

/// Length-prefixed `bytes`/`string` at `offset`.
pub fn bytes_at(data: &[u8], offset: usize) -> Option<Vec<u8>> {
    let len = usize_at(data, offset)?;
    let start = offset.checked_add(WORD)?;
    let end = start.checked_add(len)?;
    Some(data.get(start..end)?.to_vec())
}

pub fn uint_array(data: &[u8], offset: usize) -> Option<Vec<u64>> {
    let len = usize_at(data, offset)?;
    let mut out = Vec::with_capacity(len.min(1024));
    for i in 0..len {
        out.push(uint(data, offset.checked_add(WORD * (i + 1))?)?);
    }
    Some(out)
}

pub fn word_array(data: &[u8], offset: usize) -> Option<Vec<[u8; WORD]>> {
    let len = usize_at(data, offset)?;
    let mut out = Vec::with_capacity(len.min(1024));
    for i in 0..len {
        out.push(word(data, offset.checked_add(WORD * (i + 1))?)?);
    }
    Some(out)
}

pub fn address_array(data: &[u8], offset: usize) -> Option<Vec<String>> {
    let len = usize_at(data, offset)?;
    let mut out = Vec::with_capacity(len.min(1024));
    for i in 0..len {
        out.push(address(data, offset.checked_add(WORD * (i + 1))?)?);
    }
    Some(out)
}

/// Dynamic `bytes[]`: a length word, then one offset word per element, each
/// relative to the start of the array's data region (just past the length).
pub fn bytes_array(data: &[u8], offset: usize) -> Option<Vec<Vec<u8>>> {
    let len = usize_at(data, offset)?;
    let region = offset.checked_add(WORD)?;
    let mut out = Vec::with_capacity(len.min(1024));
    for i in 0..len {
        let elem_offset = usize_at(data, region.checked_add(WORD * i)?)?;
        out.push(bytes_at(data, region.checked_add(elem_offset)?)?);
    }
    Some(out)
}

// Encoding side.

pub fn word_from_u64(value: u64) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[24..].copy_from_slice(&value.to_be_bytes());
    w
}

/// Right-aligns up to 32 big-endian bytes into a word.
pub fn word_from_be_bytes(bytes: &[u8]) -> Option<[u8; WORD]> {
    if bytes.len() > WORD {
        return None;
    }
    let mut w = [0u8; WORD];
    w[WORD - bytes.len()..].copy_from_slice(bytes);
    Some(w)
}

pub fn push_word(buf: &mut Vec<u8>, w: [u8; WORD]) {
    buf.extend_from_slice(&w);
}

pub fn push_uint(buf: &mut Vec<u8>, value: u64) {
    push_word(buf, word_from_u64(value));
}

/// Appends raw bytes right-padded with zeros to a 32-byte boundary.
pub fn push_padded_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + padding_for(bytes.len()), 0);
}

pub fn padding_for(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

/// Decodes hex with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(body).ok()
}

pub fn parse_address(input: &str) -> Option<[u8; 20]> {
    decode_hex(input)?.try_into().ok()
}

/// Parses an unsigned 256-bit integer written either as 0x-hex or decimal,
/// the two spellings proof points arrive in.
pub fn parse_u256(input: &str) -> Option<[u8; WORD]> {
    let trimmed = input.trim();
    if let Some(hex_body) = trimmed.strip_prefix("0x") {
        let bytes = hex::decode(hex_body).ok()?;
        return word_from_be_bytes(&bytes);
    }
    if trimmed.is_empty() {
        return None;
    }
    let mut acc = [0u8; WORD];
    for c in trimmed.bytes() {
        let digit = (c as char).to_digit(10)? as u16;
        let mut carry = digit;
        for cell in acc.iter_mut().rev() {
            let v = *cell as u16 * 10 + carry;
            *cell = (v & 0xff) as u8;
            carry = v >> 8;
        }
        if carry != 0 {
            return None;
        }
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_read_back_what_the_writer_pushed() {
        let mut buf = Vec::new();
        push_uint(&mut buf, 7);
        push_uint(&mut buf, u64::MAX);
        assert_eq!(uint(&buf, 0), Some(7));
        assert_eq!(uint(&buf, WORD), Some(u64::MAX));
        assert_eq!(uint(&buf, WORD + 1), None);
    }

    #[test]
    fn addresses_take_the_low_20_bytes() {
        let mut w = [0u8; WORD];
        w[12..].copy_from_slice(&[0x11; 20]);
        let mut buf = Vec::new();
        push_word(&mut buf, w);
        assert_eq!(
            address(&buf, 0).unwrap(),
            format!("0x{}", "11".repeat(20))
        );
    }

    #[test]
    fn bytes_array_resolves_element_offsets_against_the_data_region() {
        // bytes[] with two elements: "ab" and "cdef".
        let mut buf = Vec::new();
        push_uint(&mut buf, 2); // length
        push_uint(&mut buf, 64); // offset of element 0, relative to region
        push_uint(&mut buf, 128); // offset of element 1
        push_uint(&mut buf, 2);
        push_padded_bytes(&mut buf, b"ab");
        push_uint(&mut buf, 4);
        push_padded_bytes(&mut buf, b"cdef");

        let decoded = bytes_array(&buf, 0).unwrap();
        assert_eq!(decoded, vec![b"ab".to_vec(), b"cdef".to_vec()]);
    }

    #[test]
    fn short_input_reads_are_absent_not_fatal() {
        let buf = vec![0u8; 40];
        assert_eq!(uint(&buf, 32), None);
        assert_eq!(bytes_at(&buf, 16), None);
        assert!(uint_array(&[], 0).is_none());
    }

    #[test]
    fn u256_parsing_accepts_decimal_and_hex() {
        assert_eq!(parse_u256("255"), Some(word_from_u64(255)));
        assert_eq!(parse_u256("0xff"), Some(word_from_u64(255)));
        assert_eq!(parse_u256("0"), Some([0u8; WORD]));
        // 2^256 - 1 round trips; 2^256 overflows.
        let max = "0x".to_string() + &"ff".repeat(32);
        assert_eq!(parse_u256(&max), Some([0xff; WORD]));
        let too_big =
            "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert_eq!(parse_u256(too_big), None);
        assert_eq!(parse_u256("12x"), None);
        assert_eq!(parse_u256(""), None);
    }

    #[test]
    fn hex_decoding_tolerates_missing_prefix() {
        assert_eq!(decode_hex("0x0102"), Some(vec![1, 2]));
        assert_eq!(decode_hex("0102"), Some(vec![1, 2]));
        assert_eq!(decode_hex("0xzz"), None);
    }
}
