use thiserror::Error;

// One enum per failure domain. Decode-level problems inside a single
// proposal or whitelist entry are absorbed at the decode site and the
// entity defaulted; everything here crosses a component boundary.

/// A structural violation in DER/CMS input. Carries the walker's context
/// so the caller can tell *where* the document broke, not just that it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed document: {0}")]
pub struct MalformedDocument(pub &'static str);

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("http: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc response carried no result")]
    MissingResult,
    #[error("unexpected rpc payload: {0}")]
    BadResponse(&'static str),
}

/// Relayer refusals, sub-classified by message content. The relayer does
/// not expose an error-code contract, so this is sniffing on the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayerRejection {
    #[error("this identity has already voted")]
    AlreadyVoted,
    #[error("no eligible credential for this voting")]
    NoEligibleCredential,
    #[error("relayer rejected the vote: {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum RelayerError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Rejected(#[from] RelayerRejection),
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing key is not valid hex")]
    BadKeyHex,
    #[error("signing key is not a valid secp256k1 scalar")]
    BadKey,
    #[error("transaction could not be signed")]
    Signature,
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("no local identity is available")]
    IdentityMissing,
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Relayer(#[from] RelayerError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("vote state could not be persisted: {0}")]
    Store(#[from] std::io::Error),
    #[error("calldata could not be encoded: {0}")]
    Codec(&'static str),
    #[error("configuration error: {0}")]
    Config(&'static str),
}
