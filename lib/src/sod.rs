//! Passive authentication of the passport Security Object (SOD).
//!
//! The SOD is a CMS SignedData whose encapsulated content is an
//! LDSSecurityObject: the signed manifest of data-group digests. Verifying
//! it establishes that DG1 (the machine-readable personal data) is the one
//! the issuing authority signed, without any chip interaction.
//!
//! All three entry points are total over byte input: malformed documents
//! come back as [`MalformedDocument`] or `false`, never as a panic.

use rsa::{pss::Pss, BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::der::{self, oid, PublicKey, Reader, Tlv};
use crate::error::MalformedDocument;

// ICAO wraps the CMS structure in a one-byte application envelope.
const ICAO_ENVELOPE_TAG: u8 = 0x77;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    pub fn from_oid(oid_text: &str) -> Option<HashAlg> {
        match oid_text {
            oid::SHA1 => Some(HashAlg::Sha1),
            oid::SHA256 => Some(HashAlg::Sha256),
            oid::SHA384 => Some(HashAlg::Sha384),
            oid::SHA512 => Some(HashAlg::Sha512),
            _ => None,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlg::Sha1 => Sha1::digest(data).to_vec(),
            HashAlg::Sha256 => Sha256::digest(data).to_vec(),
            HashAlg::Sha384 => Sha384::digest(data).to_vec(),
            HashAlg::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignerInfo {
    pub digest_algorithm_oid: String,
    pub signature_algorithm_oid: String,
    pub signature: Vec<u8>,
    /// Raw `[0] IMPLICIT` signedAttrs TLV, exactly as it appears in the
    /// SignerInfo. The signature domain rewrite happens at verify time.
    pub signed_attrs_raw: Option<Vec<u8>>,
}

/// Parse result of a SOD. Derived strictly from the input bytes; consumers
/// use it once and drop it.
#[derive(Debug, Clone)]
pub struct Sod {
    pub data_group_hashes: Vec<(u32, Vec<u8>)>,
    pub hash_algorithm_oid: String,
    pub signer: SignerInfo,
    pub embedded_certificate: Option<Vec<u8>>,
    encapsulated_content: Vec<u8>,
}

impl Sod {
    pub fn parse(sod_bytes: &[u8]) -> Result<Sod, MalformedDocument> {
        let body = strip_icao_envelope(sod_bytes)?;

        let mut top = Reader::new(body);
        let content_info = top.expect(der::TAG_SEQUENCE, "ContentInfo is not a SEQUENCE")?;
        let mut ci = content_info.inner();
        let content_type = ci.expect(der::TAG_OID, "ContentInfo without content type")?;
        if der::oid_to_string(content_type.value)? != oid::SIGNED_DATA {
            return Err(MalformedDocument("content type is not SignedData"));
        }
        let wrapper = ci.expect(der::TAG_CONTEXT_0, "ContentInfo without content")?;
        let signed_data = wrapper
            .inner()
            .expect(der::TAG_SEQUENCE, "SignedData is not a SEQUENCE")?;

        let mut sd = signed_data.inner();
        sd.expect(der::TAG_INTEGER, "SignedData without version")?;
        sd.expect(der::TAG_SET, "SignedData without digest algorithms")?;

        let encap = sd.expect(der::TAG_SEQUENCE, "missing encapContentInfo")?;
        let mut encap_inner = encap.inner();
        encap_inner.expect(der::TAG_OID, "encapContentInfo without type")?;
        let econtent_wrapper =
            encap_inner.expect(der::TAG_CONTEXT_0, "missing encapsulated content")?;
        let econtent = econtent_wrapper
            .inner()
            .expect(der::TAG_OCTET_STRING, "encapsulated content is not an OCTET STRING")?;

        let mut embedded_certificate = None;
        if sd.peek_tag() == Some(der::TAG_CONTEXT_0) {
            let certs = sd.read()?;
            let mut certs_inner = certs.inner();
            if !certs_inner.is_empty() {
                embedded_certificate = Some(certs_inner.read()?.raw.to_vec());
            }
        }
        if sd.peek_tag() == Some(der::TAG_CONTEXT_1) {
            sd.read()?; // crls, unused
        }

        let signer_infos = sd.expect(der::TAG_SET, "missing signerInfos")?;
        let first_signer = signer_infos
            .inner()
            .expect(der::TAG_SEQUENCE, "empty signerInfos")?;
        let signer = parse_signer_info(first_signer)?;

        let lds = parse_lds_security_object(econtent.value)?;

        Ok(Sod {
            data_group_hashes: lds.hashes,
            hash_algorithm_oid: lds.hash_algorithm_oid,
            signer,
            embedded_certificate,
            encapsulated_content: econtent.value.to_vec(),
        })
    }

    /// Recomputes the DG1 digest with the algorithm the SOD names and
    /// compares it against the stored entry for data group 1.
    pub fn dg1_matches(&self, dg1_bytes: &[u8]) -> Result<bool, MalformedDocument> {
        let alg = HashAlg::from_oid(&self.hash_algorithm_oid)
            .ok_or(MalformedDocument("unsupported data-group hash algorithm"))?;
        let stored = self
            .data_group_hashes
            .iter()
            .find(|(number, _)| *number == 1)
            .ok_or(MalformedDocument("no hash entry for DG1"))?;
        Ok(alg.digest(dg1_bytes) == stored.1)
    }

    /// Verifies the SOD signature with the given subject public key.
    /// Returns `false` on any structural anomaly or algorithm mismatch.
    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        let message = match self.signed_bytes() {
            Ok(message) => message,
            Err(_) => return false,
        };
        verify_with_key(key, &message, &self.signer)
    }

    /// The bytes the signer actually signed. With signedAttrs present this
    /// is the attribute set re-tagged from IMPLICIT `[0]` to universal SET
    /// (the CMS signature domain rule); otherwise the raw content.
    fn signed_bytes(&self) -> Result<Vec<u8>, MalformedDocument> {
        match &self.signer.signed_attrs_raw {
            Some(raw) => {
                let mut out = raw.clone();
                match out.first() {
                    Some(&der::TAG_CONTEXT_0) => {
                        out[0] = der::TAG_SET;
                        Ok(out)
                    }
                    _ => Err(MalformedDocument(
                        "signed attributes do not carry the implicit [0] tag",
                    )),
                }
            }
            None => Ok(self.encapsulated_content.clone()),
        }
    }
}

/// Fails-closed convenience wrapper: any parse error or missing DG1 entry
/// is simply a non-match.
pub fn verify_dg1_hash(sod_bytes: &[u8], dg1_bytes: &[u8]) -> bool {
    match Sod::parse(sod_bytes) {
        Ok(sod) => sod.dg1_matches(dg1_bytes).unwrap_or(false),
        Err(_) => false,
    }
}

/// Verifies the SOD signature against a PEM certificate (the document
/// signer certificate selected by the caller). Fails closed.
pub fn verify_sod_signature(sod_bytes: &[u8], cert_pem: &str) -> bool {
    let sod = match Sod::parse(sod_bytes) {
        Ok(sod) => sod,
        Err(_) => return false,
    };
    let der_bytes = match der::pem_to_der(cert_pem) {
        Ok(der_bytes) => der_bytes,
        Err(_) => return false,
    };
    let key = match der::public_key_from_cert_der(&der_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };
    sod.verify_signature(&key)
}

fn strip_icao_envelope(sod_bytes: &[u8]) -> Result<&[u8], MalformedDocument> {
    match sod_bytes.first() {
        Some(&ICAO_ENVELOPE_TAG) => {
            let tlv = Reader::new(sod_bytes).read()?;
            Ok(tlv.value)
        }
        Some(_) => Ok(sod_bytes),
        None => Err(MalformedDocument("empty input")),
    }
}

fn parse_signer_info(signer: Tlv<'_>) -> Result<SignerInfo, MalformedDocument> {
    let mut si = signer.inner();
    si.expect(der::TAG_INTEGER, "SignerInfo without version")?;
    si.read()?; // sid: IssuerAndSerialNumber or [0] subjectKeyIdentifier

    let digest_alg = si.expect(der::TAG_SEQUENCE, "SignerInfo without digest algorithm")?;
    let digest_algorithm_oid = der::read_algorithm_oid(digest_alg)?;

    let mut signed_attrs_raw = None;
    if si.peek_tag() == Some(der::TAG_CONTEXT_0) {
        signed_attrs_raw = Some(si.read()?.raw.to_vec());
    }

    let sig_alg = si.expect(der::TAG_SEQUENCE, "SignerInfo without signature algorithm")?;
    let signature_algorithm_oid = der::read_algorithm_oid(sig_alg)?;
    let signature = si.expect(der::TAG_OCTET_STRING, "SignerInfo without signature")?;

    Ok(SignerInfo {
        digest_algorithm_oid,
        signature_algorithm_oid,
        signature: signature.value.to_vec(),
        signed_attrs_raw,
    })
}

struct LdsSecurityObject {
    hash_algorithm_oid: String,
    hashes: Vec<(u32, Vec<u8>)>,
}

fn parse_lds_security_object(bytes: &[u8]) -> Result<LdsSecurityObject, MalformedDocument> {
    let mut top = Reader::new(bytes);
    let lds = top.expect(der::TAG_SEQUENCE, "LDSSecurityObject is not a SEQUENCE")?;
    let mut inner = lds.inner();
    inner.expect(der::TAG_INTEGER, "LDSSecurityObject without version")?;
    let hash_alg = inner.expect(der::TAG_SEQUENCE, "LDSSecurityObject without hash algorithm")?;
    let hash_algorithm_oid = der::read_algorithm_oid(hash_alg)?;

    let list = inner.expect(der::TAG_SEQUENCE, "missing data group hash list")?;
    let mut entries = list.inner();
    let mut hashes = Vec::new();
    while !entries.is_empty() {
        let entry = entries.expect(der::TAG_SEQUENCE, "data group entry is not a SEQUENCE")?;
        let mut fields = entry.inner();
        let number = fields.expect(der::TAG_INTEGER, "data group entry without number")?;
        let value = fields.expect(der::TAG_OCTET_STRING, "data group entry without hash")?;
        hashes.push((integer_to_u32(number.value)?, value.value.to_vec()));
    }

    Ok(LdsSecurityObject {
        hash_algorithm_oid,
        hashes,
    })
}

fn integer_to_u32(bytes: &[u8]) -> Result<u32, MalformedDocument> {
    if bytes.is_empty() || bytes.len() > 5 {
        return Err(MalformedDocument("integer out of range"));
    }
    let mut value: u64 = 0;
    for &b in bytes {
        value = (value << 8) | b as u64;
    }
    u32::try_from(value).map_err(|_| MalformedDocument("integer out of range"))
}

fn verify_with_key(key: &PublicKey, message: &[u8], signer: &SignerInfo) -> bool {
    let sig_oid = signer.signature_algorithm_oid.as_str();
    match key {
        PublicKey::Rsa { modulus, exponent } => {
            let rsa_key = match RsaPublicKey::new(
                BigUint::from_bytes_be(modulus),
                BigUint::from_bytes_be(exponent),
            ) {
                Ok(rsa_key) => rsa_key,
                Err(_) => return false,
            };
            if sig_oid == oid::RSASSA_PSS {
                let alg = match HashAlg::from_oid(&signer.digest_algorithm_oid) {
                    Some(alg) => alg,
                    None => return false,
                };
                let digest = alg.digest(message);
                // Digest-length salt: what "auto" resolves to on every
                // passport document signer observed in the wild.
                let scheme = match alg {
                    HashAlg::Sha1 => Pss::new::<Sha1>(),
                    HashAlg::Sha256 => Pss::new::<Sha256>(),
                    HashAlg::Sha384 => Pss::new::<Sha384>(),
                    HashAlg::Sha512 => Pss::new::<Sha512>(),
                };
                rsa_key.verify(scheme, &digest, &signer.signature).is_ok()
            } else {
                let alg = match rsa_digest_for(sig_oid, &signer.digest_algorithm_oid) {
                    Some(alg) => alg,
                    None => return false,
                };
                let digest = alg.digest(message);
                let scheme = match alg {
                    HashAlg::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
                    HashAlg::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                    HashAlg::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                    HashAlg::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
                };
                rsa_key.verify(scheme, &digest, &signer.signature).is_ok()
            }
        }
        PublicKey::Ec { curve_oid, point } => {
            let alg = match ecdsa_digest_for(sig_oid, &signer.digest_algorithm_oid) {
                Some(alg) => alg,
                None => return false,
            };
            let digest = alg.digest(message);
            match curve_oid.as_str() {
                oid::SECP256R1 => verify_p256(point, &digest, &signer.signature),
                oid::SECP384R1 => verify_p384(point, &digest, &signer.signature),
                _ => false,
            }
        }
    }
}

fn rsa_digest_for(sig_oid: &str, digest_oid: &str) -> Option<HashAlg> {
    match sig_oid {
        oid::SHA1_WITH_RSA => Some(HashAlg::Sha1),
        oid::SHA256_WITH_RSA => Some(HashAlg::Sha256),
        oid::SHA384_WITH_RSA => Some(HashAlg::Sha384),
        oid::SHA512_WITH_RSA => Some(HashAlg::Sha512),
        oid::RSA_ENCRYPTION => HashAlg::from_oid(digest_oid),
        _ => None,
    }
}

fn ecdsa_digest_for(sig_oid: &str, digest_oid: &str) -> Option<HashAlg> {
    match sig_oid {
        oid::ECDSA_WITH_SHA1 => Some(HashAlg::Sha1),
        oid::ECDSA_WITH_SHA256 => Some(HashAlg::Sha256),
        oid::ECDSA_WITH_SHA384 => Some(HashAlg::Sha384),
        oid::ECDSA_WITH_SHA512 => Some(HashAlg::Sha512),
        _ => HashAlg::from_oid(digest_oid),
    }
}

fn verify_p256(point: &[u8], digest: &[u8], signature: &[u8]) -> bool {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;
    let key = match p256::ecdsa::VerifyingKey::from_sec1_bytes(point) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let sig = match p256::ecdsa::Signature::from_der(signature) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    key.verify_prehash(digest, &sig).is_ok()
}

fn verify_p384(point: &[u8], digest: &[u8], signature: &[u8]) -> bool {
    use p384::ecdsa::signature::hazmat::PrehashVerifier;
    let key = match p384::ecdsa::VerifyingKey::from_sec1_bytes(point) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let sig = match p384::ecdsa::Signature::from_der(signature) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    key.verify_prehash(digest, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use rsa::RsaPrivateKey;

    // DER building helpers, test-side mirror of the walker.

    fn tlv(tag: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = body.len();
        if len < 0x80 {
            out.push(len as u8);
        } else if len <= 0xff {
            out.extend([0x81, len as u8]);
        } else {
            out.extend([0x82, (len >> 8) as u8, len as u8]);
        }
        out.extend_from_slice(body);
        out
    }

    fn oid_der(text: &str) -> Vec<u8> {
        let parts: Vec<u64> = text.split('.').map(|p| p.parse().unwrap()).collect();
        let mut body = vec![(parts[0] * 40 + parts[1]) as u8];
        for &arc in &parts[2..] {
            let mut chunk = vec![(arc & 0x7f) as u8];
            let mut rest = arc >> 7;
            while rest > 0 {
                chunk.push((rest & 0x7f) as u8 | 0x80);
                rest >>= 7;
            }
            chunk.reverse();
            body.extend(chunk);
        }
        tlv(der::TAG_OID, &body)
    }

    fn alg_id(oid_text: &str) -> Vec<u8> {
        tlv(der::TAG_SEQUENCE, &oid_der(oid_text))
    }

    fn int(value: u8) -> Vec<u8> {
        tlv(der::TAG_INTEGER, &[value])
    }

    fn uint_der(bytes: &[u8]) -> Vec<u8> {
        let mut body = bytes.to_vec();
        if body.first().map_or(true, |&b| b & 0x80 != 0) {
            body.insert(0, 0);
        }
        tlv(der::TAG_INTEGER, &body)
    }

    fn lds_security_object(hashes: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut list = Vec::new();
        for (number, hash) in hashes {
            let entry = [int(*number), tlv(der::TAG_OCTET_STRING, hash)].concat();
            list.extend(tlv(der::TAG_SEQUENCE, &entry));
        }
        let body = [
            int(0),
            alg_id(oid::SHA256),
            tlv(der::TAG_SEQUENCE, &list),
        ]
        .concat();
        tlv(der::TAG_SEQUENCE, &body)
    }

    struct SodFixture {
        econtent: Vec<u8>,
        digest_oid: &'static str,
        sig_oid: &'static str,
        signed_attrs: Option<Vec<u8>>,
        signature: Vec<u8>,
        envelope: bool,
    }

    fn build_sod(fx: &SodFixture) -> Vec<u8> {
        let sid = tlv(
            der::TAG_SEQUENCE,
            &[tlv(der::TAG_SEQUENCE, &[]), int(1)].concat(),
        );
        let mut signer_body = [int(1), sid, alg_id(fx.digest_oid)].concat();
        if let Some(attrs) = &fx.signed_attrs {
            signer_body.extend_from_slice(attrs);
        }
        signer_body.extend(alg_id(fx.sig_oid));
        signer_body.extend(tlv(der::TAG_OCTET_STRING, &fx.signature));
        let signer_info = tlv(der::TAG_SEQUENCE, &signer_body);

        let encap = tlv(
            der::TAG_SEQUENCE,
            &[
                oid_der("2.23.136.1.1.1"),
                tlv(
                    der::TAG_CONTEXT_0,
                    &tlv(der::TAG_OCTET_STRING, &fx.econtent),
                ),
            ]
            .concat(),
        );

        let signed_data = tlv(
            der::TAG_SEQUENCE,
            &[
                int(3),
                tlv(der::TAG_SET, &alg_id(fx.digest_oid)),
                encap,
                tlv(der::TAG_SET, &signer_info),
            ]
            .concat(),
        );

        let content_info = tlv(
            der::TAG_SEQUENCE,
            &[oid_der(oid::SIGNED_DATA), tlv(der::TAG_CONTEXT_0, &signed_data)].concat(),
        );

        if fx.envelope {
            tlv(ICAO_ENVELOPE_TAG, &content_info)
        } else {
            content_info
        }
    }

    fn rsa_cert_pem(key: &RsaPrivateKey) -> String {
        let public = key.to_public_key();
        let rsa_pub = tlv(
            der::TAG_SEQUENCE,
            &[
                uint_der(&public.n().to_bytes_be()),
                uint_der(&public.e().to_bytes_be()),
            ]
            .concat(),
        );
        let mut key_bits = vec![0u8];
        key_bits.extend(rsa_pub);
        let spki = tlv(
            der::TAG_SEQUENCE,
            &[alg_id(oid::RSA_ENCRYPTION), tlv(der::TAG_BIT_STRING, &key_bits)].concat(),
        );
        let tbs = tlv(
            der::TAG_SEQUENCE,
            &[
                int(1),
                alg_id(oid::SHA256_WITH_RSA),
                tlv(der::TAG_SEQUENCE, &[]),
                tlv(der::TAG_SEQUENCE, &[]),
                tlv(der::TAG_SEQUENCE, &[]),
                spki,
            ]
            .concat(),
        );
        let cert = tlv(
            der::TAG_SEQUENCE,
            &[tbs, alg_id(oid::SHA256_WITH_RSA), tlv(der::TAG_BIT_STRING, &[0, 0])].concat(),
        );

        use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
        format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            BASE64.encode(&cert)
        )
    }

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    #[test]
    fn dg1_hash_matches_and_bit_flips_break_it() {
        let dg1 = b"P<UTOERIKSSON<<ANNA<MARIA<<<<<";
        let econtent = lds_security_object(&[
            (1, HashAlg::Sha256.digest(dg1)),
            (2, HashAlg::Sha256.digest(b"dg2 payload")),
        ]);
        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::SHA256_WITH_RSA,
            signed_attrs: None,
            signature: vec![0xaa; 128],
            envelope: true,
        });

        assert!(verify_dg1_hash(&sod_bytes, dg1));

        let mut corrupted = dg1.to_vec();
        for bit in 0..corrupted.len() * 8 {
            corrupted[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify_dg1_hash(&sod_bytes, &corrupted), "bit {bit}");
            corrupted[bit / 8] ^= 1 << (bit % 8);
        }
    }

    #[test]
    fn missing_dg1_entry_is_a_typed_error() {
        let econtent = lds_security_object(&[(2, HashAlg::Sha256.digest(b"dg2"))]);
        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::SHA256_WITH_RSA,
            signed_attrs: None,
            signature: vec![0xaa; 128],
            envelope: false,
        });

        let sod = Sod::parse(&sod_bytes).unwrap();
        assert_eq!(
            sod.dg1_matches(b"anything"),
            Err(MalformedDocument("no hash entry for DG1"))
        );
        assert!(!verify_dg1_hash(&sod_bytes, b"anything"));
    }

    #[test]
    fn parse_accepts_enveloped_and_bare_input() {
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(b"dg1"))]);
        for envelope in [true, false] {
            let sod_bytes = build_sod(&SodFixture {
                econtent: econtent.clone(),
                digest_oid: oid::SHA256,
                sig_oid: oid::SHA256_WITH_RSA,
                signed_attrs: None,
                signature: vec![1, 2, 3],
                envelope,
            });
            let sod = Sod::parse(&sod_bytes).unwrap();
            assert_eq!(sod.hash_algorithm_oid, oid::SHA256);
            assert_eq!(sod.data_group_hashes.len(), 1);
            assert_eq!(sod.signer.signature_algorithm_oid, oid::SHA256_WITH_RSA);
        }
    }

    #[test]
    fn parse_never_panics_on_truncations() {
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(b"dg1"))]);
        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::SHA256_WITH_RSA,
            signed_attrs: None,
            signature: vec![1, 2, 3],
            envelope: true,
        });
        for len in 0..sod_bytes.len() {
            let _ = Sod::parse(&sod_bytes[..len]);
        }
    }

    #[test]
    fn rsa_signature_over_econtent_verifies() {
        let key = test_key();
        let dg1 = b"dg1 bytes";
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(dg1))]);
        let digest = HashAlg::Sha256.digest(&econtent);
        let signature = key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest).unwrap();

        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::SHA256_WITH_RSA,
            signed_attrs: None,
            signature,
            envelope: true,
        });

        assert!(verify_sod_signature(&sod_bytes, &rsa_cert_pem(&key)));

        // An unrelated certificate must not verify.
        let other = test_key();
        assert!(!verify_sod_signature(&sod_bytes, &rsa_cert_pem(&other)));
    }

    #[test]
    fn rsa_signature_over_signed_attrs_uses_set_domain() {
        let key = test_key();
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(b"dg1"))]);

        // messageDigest attribute over the content, as CMS signers emit it.
        let attr = tlv(
            der::TAG_SEQUENCE,
            &[
                oid_der("1.2.840.113549.1.9.4"),
                tlv(
                    der::TAG_SET,
                    &tlv(der::TAG_OCTET_STRING, &HashAlg::Sha256.digest(&econtent)),
                ),
            ]
            .concat(),
        );
        let signed_attrs = tlv(der::TAG_CONTEXT_0, &attr);

        // The signature domain is the same content under a universal SET tag.
        let set_form = tlv(der::TAG_SET, &attr);
        let digest = HashAlg::Sha256.digest(&set_form);
        let signature = key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest).unwrap();

        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::SHA256_WITH_RSA,
            signed_attrs: Some(signed_attrs),
            signature,
            envelope: true,
        });

        assert!(verify_sod_signature(&sod_bytes, &rsa_cert_pem(&key)));

        // A wrong leading tag on the captured attributes is rejected
        // explicitly, not silently miscompared.
        let mut sod = Sod::parse(&sod_bytes).unwrap();
        let mut attrs = sod.signer.signed_attrs_raw.take().unwrap();
        attrs[0] = der::TAG_SEQUENCE;
        sod.signer.signed_attrs_raw = Some(attrs);
        assert_eq!(
            sod.signed_bytes(),
            Err(MalformedDocument(
                "signed attributes do not carry the implicit [0] tag"
            ))
        );
        let der_bytes = der::pem_to_der(&rsa_cert_pem(&key)).unwrap();
        let pub_key = der::public_key_from_cert_der(&der_bytes).unwrap();
        assert!(!sod.verify_signature(&pub_key));
    }

    #[test]
    fn rsa_pss_signature_verifies() {
        let key = test_key();
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(b"dg1"))]);
        let digest = HashAlg::Sha256.digest(&econtent);
        let signature = key
            .sign_with_rng(&mut rand::thread_rng(), Pss::new::<Sha256>(), &digest)
            .unwrap();

        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::RSASSA_PSS,
            signed_attrs: None,
            signature,
            envelope: false,
        });

        assert!(verify_sod_signature(&sod_bytes, &rsa_cert_pem(&key)));
    }

    #[test]
    fn p256_signature_verifies() {
        use p256::ecdsa::signature::hazmat::PrehashSigner;

        let signing_key = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let econtent = lds_security_object(&[(1, HashAlg::Sha256.digest(b"dg1"))]);
        let digest = HashAlg::Sha256.digest(&econtent);
        let sig: p256::ecdsa::Signature = signing_key.sign_prehash(&digest).unwrap();

        let sod_bytes = build_sod(&SodFixture {
            econtent,
            digest_oid: oid::SHA256,
            sig_oid: oid::ECDSA_WITH_SHA256,
            signed_attrs: None,
            signature: sig.to_der().as_bytes().to_vec(),
            envelope: true,
        });

        let point = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        let key = PublicKey::Ec {
            curve_oid: oid::SECP256R1.to_string(),
            point,
        };
        let sod = Sod::parse(&sod_bytes).unwrap();
        assert!(sod.verify_signature(&key));

        let wrong = PublicKey::Ec {
            curve_oid: oid::SECP256R1.to_string(),
            point: p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng)
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        };
        assert!(!sod.verify_signature(&wrong));
    }
}
