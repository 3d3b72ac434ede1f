use std::path::PathBuf;

use thiserror::Error;

/// Reason codes for a failed chain verification.
///
/// Each failure mode is reported distinctly so callers can tell an expired
/// certificate apart from an untrusted or revoked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFailure {
    /// The certificate's notAfter lies before the verification time.
    Expired,
    /// The certificate's notBefore lies after the verification time.
    NotYetValid,
    /// No trusted issuer for the certificate could be found.
    Untrusted,
    /// The certificate's serial number appears in the supplied CRL.
    Revoked,
    /// An issuer was found but the signature did not verify.
    BadSignature,
}

impl ChainFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFailure::Expired => "expired",
            ChainFailure::NotYetValid => "not yet valid",
            ChainFailure::Untrusted => "untrusted",
            ChainFailure::Revoked => "revoked",
            ChainFailure::BadSignature => "bad signature",
        }
    }
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by certops operations.
///
/// Decoding and verification failures surface as typed variants and are never
/// silently downgraded. A key/certificate modulus mismatch is deliberately
/// *not* an error: [`crate::verify::match_key_and_certificate`] reports it as
/// a normal boolean outcome.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed PEM armor or DER that could not be parsed at all.
    #[error("failed to decode data: {0}")]
    Decode(String),

    /// Well-formed input of a different kind than expected, e.g. certificate
    /// bytes passed where a key was expected.
    #[error("wrong input kind: expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: String,
    },

    /// Error while encoding a value to DER or PEM.
    #[error("failed to encode data: {0}")]
    Encode(String),

    /// Out-of-range or otherwise unusable parameter (bad bit length, bad
    /// validity span, malformed config entry).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Empty or malformed subject name.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// The passphrase did not decrypt the key.
    #[error("wrong passphrase or corrupted encrypted key")]
    WrongPassphrase,

    /// A signature failed to verify.
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    /// A key or signature algorithm outside the supported RSA set.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Chain verification failed with the given reason.
    #[error("certificate verification failed: {0}")]
    Chain(ChainFailure),

    /// The serial registry counter is corrupt or exhausted.
    #[error("serial number registry unusable: {0}")]
    SerialExhaustion(String),

    /// Filesystem failure while operating the serial registry.
    #[error("serial registry I/O failure on {path}: {source}")]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key generation exceeded the caller's deadline.
    #[error("key generation timed out")]
    Timeout,

    /// Failure inside prime search / key construction.
    #[error("key generation error: {0}")]
    KeyGeneration(String),

    /// Generic filesystem failure, always carrying the offending path.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Self {
        Error::KeyGeneration(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for Error {
    fn from(err: rsa::pkcs1::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for Error {
    fn from(err: pkcs8::spki::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<pem::PemError> for Error {
    fn from(err: pem::PemError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl Error {
    /// Wrap a filesystem error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
