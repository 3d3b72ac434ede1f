//! Hash algorithm selection, certificate fingerprints, and modulus digests.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// Hash algorithms accepted for fingerprints and modulus digests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// The name the external tooling prints, e.g. `SHA256 Fingerprint=`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Hashes `data` and returns the raw digest bytes.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::InvalidParameter(format!(
                "unknown hash algorithm {other:?} (expected md5, sha1, sha256, sha384 or sha512)"
            ))),
        }
    }
}

/// A digest over the complete DER encoding of a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Fingerprints a DER-encoded document.
    pub fn of_der(algorithm: HashAlgorithm, der: &[u8]) -> Self {
        Self {
            algorithm,
            bytes: algorithm.digest(der),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Uppercase hex octets joined by colons, e.g. `DE:AD:BE:EF`.
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for byte in &self.bytes {
            if !first {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
            first = false;
        }
        Ok(())
    }
}

/// The canonical one-line text form of an RSA modulus.
///
/// Modulus comparison hashes this exact text rather than the raw integer
/// bytes, so digests stay comparable with ones computed from the printed
/// `Modulus=` line.
pub fn modulus_line(modulus_hex: &str) -> String {
    format!("Modulus={modulus_hex}\n")
}

/// Digest of the canonical modulus line, as lowercase hex.
pub fn modulus_digest(modulus_hex: &str, algorithm: HashAlgorithm) -> String {
    hex::encode(algorithm.digest(modulus_line(modulus_hex).as_bytes()))
}
