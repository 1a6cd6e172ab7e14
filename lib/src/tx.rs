//! Development-only transaction signing: an EIP-155 legacy transaction
//! assembled with a minimal RLP encoder and signed with the configured
//! well-known test key. Production submissions go through the relayer; this
//! path exists for local chains with a permissive verifier.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::error::SigningError;

pub struct DevSigner {
    key: SigningKey,
    chain_id: u64,
}

impl DevSigner {
    pub fn from_hex(key_hex: &str, chain_id: u64) -> Result<Self, SigningError> {
        let body = key_hex.trim().strip_prefix("0x").unwrap_or(key_hex.trim());
        let bytes = hex::decode(body).map_err(|_| SigningError::BadKeyHex)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| SigningError::BadKey)?;
        Ok(DevSigner { key, chain_id })
    }

    /// The 0x-prefixed sender address for this key.
    pub fn address(&self) -> String {
        let point = self.key.verifying_key().to_encoded_point(false);
        let digest = Keccak256::digest(&point.as_bytes()[1..]);
        format!("0x{}", hex::encode(&digest[12..]))
    }

    /// Signs a legacy transaction and returns the raw 0x-hex bytes for
    /// `eth_sendRawTransaction`.
    pub fn sign_legacy_tx(
        &self,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: &[u8; 20],
        value: u128,
        data: &[u8],
    ) -> Result<String, SigningError> {
        let base = [
            rlp_uint(nonce as u128),
            rlp_uint(gas_price),
            rlp_uint(gas_limit as u128),
            rlp_bytes(to),
            rlp_uint(value),
            rlp_bytes(data),
        ];

        // EIP-155 preimage: the six fields plus (chain_id, 0, 0).
        let mut preimage_items = base.to_vec();
        preimage_items.push(rlp_uint(self.chain_id as u128));
        preimage_items.push(rlp_uint(0));
        preimage_items.push(rlp_uint(0));
        let preimage = rlp_list(&preimage_items);
        let sighash = Keccak256::digest(&preimage);

        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&sighash)
            .map_err(|_| SigningError::Signature)?;
        let v = self.chain_id * 2 + 35 + recovery_id.to_byte() as u64;

        let bytes = signature.to_bytes();
        let (r, s) = bytes.split_at(32);

        let mut items = base.to_vec();
        items.push(rlp_uint(v as u128));
        items.push(rlp_bytes(strip_leading_zeros(r)));
        items.push(rlp_bytes(strip_leading_zeros(s)));

        Ok(format!("0x{}", hex::encode(rlp_list(&items))))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn rlp_uint(value: u128) -> Vec<u8> {
    if value == 0 {
        return vec![0x80];
    }
    let be = value.to_be_bytes();
    rlp_bytes(strip_leading_zeros(&be))
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return bytes.to_vec();
    }
    let mut out = rlp_length(bytes.len(), 0x80);
    out.extend_from_slice(bytes);
    out
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut out = rlp_length(payload.len(), 0xc0);
    out.extend_from_slice(&payload);
    out
}

fn rlp_length(len: usize, base: u8) -> Vec<u8> {
    if len <= 55 {
        return vec![base + len as u8];
    }
    let be = (len as u64).to_be_bytes();
    let digits = strip_leading_zeros(&be);
    let mut out = vec![base + 55 + digits.len() as u8];
    out.extend_from_slice(digits);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // The first well-known Anvil/Hardhat development account.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn rlp_string_vectors() {
        assert_eq!(rlp_bytes(b""), vec![0x80]);
        assert_eq!(rlp_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(rlp_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(rlp_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
        let long = vec![b'a'; 56];
        let encoded = rlp_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(&encoded[2..], &long[..]);
    }

    #[test]
    fn rlp_uint_vectors() {
        assert_eq!(rlp_uint(0), vec![0x80]);
        assert_eq!(rlp_uint(15), vec![0x0f]);
        assert_eq!(rlp_uint(1024), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn rlp_list_vectors() {
        let encoded = rlp_list(&[rlp_bytes(b"cat"), rlp_bytes(b"dog")]);
        assert_eq!(
            encoded,
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        assert_eq!(rlp_list(&[]), vec![0xc0]);
    }

    #[test]
    fn dev_key_derives_known_address() {
        let signer = DevSigner::from_hex(DEV_KEY, 31337).unwrap();
        assert_eq!(signer.address(), DEV_ADDRESS);
    }

    #[test]
    fn signed_tx_is_a_decodable_nine_item_list() {
        let signer = DevSigner::from_hex(DEV_KEY, 31337).unwrap();
        let raw = signer
            .sign_legacy_tx(0, 1_000_000_000, 500_000, &[0x42; 20], 0, &[0xde, 0xad])
            .unwrap();
        let bytes = crate::abi::decode_hex(&raw).unwrap();

        // List header, then nonce=0 as the first payload byte.
        assert!(bytes[0] >= 0xc0);
        // v encodes the chain id per EIP-155.
        let body = &bytes[if bytes[0] <= 0xf7 { 1 } else { 2 + (bytes[0] - 0xf7) as usize }..];
        assert_eq!(body[0], 0x80); // nonce 0

        // Same inputs sign deterministically (RFC 6979).
        let again = signer
            .sign_legacy_tx(0, 1_000_000_000, 500_000, &[0x42; 20], 0, &[0xde, 0xad])
            .unwrap();
        assert_eq!(raw, again);
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(matches!(
            DevSigner::from_hex("0xzz", 1),
            Err(SigningError::BadKeyHex)
        ));
        assert!(matches!(
            DevSigner::from_hex("0x00", 1),
            Err(SigningError::BadKey)
        ));
    }
}
