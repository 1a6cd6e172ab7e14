//! Minimal DER tag/length/value walker.
//!
//! The grammar this crate consumes (CMS SignedData, LDSSecurityObject, the
//! SubjectPublicKeyInfo of a signer certificate) is small and fixed, so the
//! walker stays hand-rolled instead of pulling in a general ASN.1 stack.
//! Every structural violation is a typed [`MalformedDocument`], never a panic.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::MalformedDocument;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;
pub const TAG_CONTEXT_0: u8 = 0xa0;
pub const TAG_CONTEXT_1: u8 = 0xa1;

/// One decoded element: its tag, its value bytes, and the raw TLV slice
/// including the header (needed to re-serialize signed attributes).
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn inner(&self) -> Reader<'a> {
        Reader::new(self.value)
    }
}

/// Sequential reader over a DER byte region.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Reads the next TLV. Rejects indefinite lengths and lengths that run
    /// past the end of the region.
    pub fn read(&mut self) -> Result<Tlv<'a>, MalformedDocument> {
        let start = self.pos;
        let tag = *self
            .data
            .get(self.pos)
            .ok_or(MalformedDocument("unexpected end of input"))?;
        self.pos += 1;

        let first = *self
            .data
            .get(self.pos)
            .ok_or(MalformedDocument("truncated length"))?;
        self.pos += 1;

        let len = if first < 0x80 {
            first as usize
        } else {
            let n_bytes = (first & 0x7f) as usize;
            if n_bytes == 0 || n_bytes > 4 {
                return Err(MalformedDocument("unsupported length form"));
            }
            let mut len = 0usize;
            for _ in 0..n_bytes {
                let b = *self
                    .data
                    .get(self.pos)
                    .ok_or(MalformedDocument("truncated length"))?;
                self.pos += 1;
                len = (len << 8) | b as usize;
            }
            len
        };

        let end = self
            .pos
            .checked_add(len)
            .ok_or(MalformedDocument("length overflow"))?;
        if end > self.data.len() {
            return Err(MalformedDocument("value runs past end of input"));
        }
        let value = &self.data[self.pos..end];
        let raw = &self.data[start..end];
        self.pos = end;
        Ok(Tlv { tag, value, raw })
    }

    pub fn expect(&mut self, tag: u8, what: &'static str) -> Result<Tlv<'a>, MalformedDocument> {
        let tlv = self.read()?;
        if tlv.tag != tag {
            return Err(MalformedDocument(what));
        }
        Ok(tlv)
    }
}

/// Decodes OID content bytes into dotted-decimal text.
pub fn oid_to_string(bytes: &[u8]) -> Result<String, MalformedDocument> {
    if bytes.is_empty() {
        return Err(MalformedDocument("empty object identifier"));
    }
    let mut out = format!("{}.{}", bytes[0] / 40, bytes[0] % 40);
    let mut arc: u64 = 0;
    for (i, &b) in bytes[1..].iter().enumerate() {
        arc = arc
            .checked_shl(7)
            .ok_or(MalformedDocument("object identifier arc overflow"))?
            | (b & 0x7f) as u64;
        if b & 0x80 == 0 {
            out.push('.');
            out.push_str(&arc.to_string());
            arc = 0;
        } else if i == bytes.len() - 2 {
            return Err(MalformedDocument("truncated object identifier"));
        }
    }
    Ok(out)
}

/// Reads an AlgorithmIdentifier and returns its OID in dotted form.
pub fn read_algorithm_oid(tlv: Tlv<'_>) -> Result<String, MalformedDocument> {
    let mut inner = tlv.inner();
    let oid = inner.expect(TAG_OID, "algorithm identifier without OID")?;
    oid_to_string(oid.value)
}

// Well-known identifiers for the passive-authentication paths.
pub mod oid {
    pub const SHA1: &str = "1.3.14.3.2.26";
    pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
    pub const SHA384: &str = "2.16.840.1.101.3.4.2.2";
    pub const SHA512: &str = "2.16.840.1.101.3.4.2.3";

    pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
    pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
    pub const RSASSA_PSS: &str = "1.2.840.113549.1.1.10";
    pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
    pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
    pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";

    pub const ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";
    pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
    pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
    pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";

    pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
    pub const SECP256R1: &str = "1.2.840.10045.3.1.7";
    pub const SECP384R1: &str = "1.3.132.0.34";

    pub const SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
}

/// A verifying key extracted from a certificate's SubjectPublicKeyInfo.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    Ec { curve_oid: String, point: Vec<u8> },
}

/// Decodes a PEM body (the BEGIN/END fence contents) to DER bytes.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, MalformedDocument> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    if body.is_empty() {
        return Err(MalformedDocument("empty PEM body"));
    }
    BASE64
        .decode(body.as_bytes())
        .map_err(|_| MalformedDocument("PEM body is not valid base64"))
}

/// Walks an X.509 certificate far enough to pull out the subject public key.
/// Chain validation against a CSCA trust store is out of scope here; the
/// caller decides which certificate to trust.
pub fn public_key_from_cert_der(der: &[u8]) -> Result<PublicKey, MalformedDocument> {
    let mut top = Reader::new(der);
    let cert = top.expect(TAG_SEQUENCE, "certificate is not a SEQUENCE")?;
    let mut cert_inner = cert.inner();
    let tbs = cert_inner.expect(TAG_SEQUENCE, "missing TBSCertificate")?;

    let mut fields = tbs.inner();
    if fields.peek_tag() == Some(TAG_CONTEXT_0) {
        fields.read()?; // version
    }
    fields.expect(TAG_INTEGER, "missing serial number")?;
    fields.expect(TAG_SEQUENCE, "missing signature algorithm")?;
    fields.expect(TAG_SEQUENCE, "missing issuer")?;
    fields.expect(TAG_SEQUENCE, "missing validity")?;
    fields.expect(TAG_SEQUENCE, "missing subject")?;
    let spki = fields.expect(TAG_SEQUENCE, "missing subject public key info")?;

    public_key_from_spki(spki)
}

fn public_key_from_spki(spki: Tlv<'_>) -> Result<PublicKey, MalformedDocument> {
    let mut inner = spki.inner();
    let alg = inner.expect(TAG_SEQUENCE, "missing SPKI algorithm")?;
    let mut alg_inner = alg.inner();
    let alg_oid = oid_to_string(alg_inner.expect(TAG_OID, "SPKI algorithm without OID")?.value)?;

    let key_bits = inner.expect(TAG_BIT_STRING, "missing SPKI key bits")?;
    let (&unused, key_bytes) = key_bits
        .value
        .split_first()
        .ok_or(MalformedDocument("empty SPKI bit string"))?;
    if unused != 0 {
        return Err(MalformedDocument("SPKI bit string with unused bits"));
    }

    match alg_oid.as_str() {
        oid::RSA_ENCRYPTION => {
            let mut key = Reader::new(key_bytes);
            let seq = key.expect(TAG_SEQUENCE, "RSA key is not a SEQUENCE")?;
            let mut key_inner = seq.inner();
            let modulus = key_inner.expect(TAG_INTEGER, "RSA key without modulus")?;
            let exponent = key_inner.expect(TAG_INTEGER, "RSA key without exponent")?;
            Ok(PublicKey::Rsa {
                modulus: modulus.value.to_vec(),
                exponent: exponent.value.to_vec(),
            })
        }
        oid::EC_PUBLIC_KEY => {
            let curve = alg_inner.expect(TAG_OID, "EC key without curve parameters")?;
            Ok(PublicKey::Ec {
                curve_oid: oid_to_string(curve.value)?,
                point: key_bytes.to_vec(),
            })
        }
        _ => Err(MalformedDocument("unsupported public key algorithm")),
    }
}
