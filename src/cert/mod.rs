pub mod extensions;
pub mod params;

use const_oid::ObjectIdentifier;
use der::{Encode, EncodePem};
use rand_core::{OsRng, RngCore};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::RdnSequence;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::digest::{Fingerprint, HashAlgorithm};
use crate::encoding::{self, DocumentKind};
use crate::error::{Error, Result};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use crate::oid;
use crate::tbs_certificate;
use params::{IssuanceInfo, Validity};

/// RSA signature algorithms understood by this crate.
///
/// Issuance always uses SHA-256; the other variants exist so certificates
/// signed with older digests can still be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1WithRsa,
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
}

impl SignatureAlgorithm {
    /// Maps a signature algorithm OID to a variant, rejecting anything
    /// that is not RSA PKCS#1 v1.5 with a supported digest.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            oid::SHA1_WITH_RSA => Ok(Self::Sha1WithRsa),
            oid::SHA256_WITH_RSA => Ok(Self::Sha256WithRsa),
            oid::SHA384_WITH_RSA => Ok(Self::Sha384WithRsa),
            oid::SHA512_WITH_RSA => Ok(Self::Sha512WithRsa),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "signature algorithm {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1WithRsa => "sha1WithRSAEncryption",
            Self::Sha256WithRsa => "sha256WithRSAEncryption",
            Self::Sha384WithRsa => "sha384WithRSAEncryption",
            Self::Sha512WithRsa => "sha512WithRSAEncryption",
        }
    }

    fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha1WithRsa => oid::SHA1_WITH_RSA,
            Self::Sha256WithRsa => oid::SHA256_WITH_RSA,
            Self::Sha384WithRsa => oid::SHA384_WITH_RSA,
            Self::Sha512WithRsa => oid::SHA512_WITH_RSA,
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        // RFC 4055 2.1: RSA signature algorithm identifiers carry an
        // explicit NULL parameter.
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: Some(der::Any::from(der::asn1::AnyRef::NULL)),
        }
    }
}

/// An X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: <CertificateInner as der::Decode>::from_der(der)?,
        })
    }

    /// Reads a certificate from PEM or DER bytes, rejecting PEM documents
    /// of any other kind.
    pub fn load(input: &[u8]) -> Result<Self> {
        let der = encoding::decode_document(input, DocumentKind::Certificate)?;
        Self::from_der(&der)
    }

    /// Reads every certificate out of a PEM bundle, or a single
    /// certificate from DER bytes.
    pub fn load_bundle(input: &[u8]) -> Result<Vec<Self>> {
        if !encoding::is_pem(input) {
            return Ok(vec![Self::from_der(input)?]);
        }
        encoding::pem_blocks(input)?
            .into_iter()
            .map(|(kind, der)| {
                if kind != DocumentKind::Certificate {
                    return Err(Error::WrongKind {
                        expected: DocumentKind::Certificate.label(),
                        found: kind.label().to_string(),
                    });
                }
                Self::from_der(&der)
            })
            .collect()
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(self.inner.to_pem(der::pem::LineEnding::LF)?)
    }

    /// X.509 version as a number (1, 2 or 3).
    pub fn version(&self) -> u8 {
        match self.inner.tbs_certificate.version {
            Version::V1 => 1,
            Version::V2 => 2,
            Version::V3 => 3,
        }
    }

    /// Serial number as uppercase hex without leading zero octets.
    pub fn serial_hex(&self) -> String {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        let start = bytes
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(bytes.len().saturating_sub(1));
        hex::encode_upper(&bytes[start..])
    }

    pub fn subject(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &RdnSequence {
        &self.inner.tbs_certificate.issuer
    }

    pub fn not_before(&self) -> OffsetDateTime {
        tbs_certificate::decode_time(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> OffsetDateTime {
        tbs_certificate::decode_time(&self.inner.tbs_certificate.validity.not_after)
    }

    pub fn validity(&self) -> Validity {
        Validity {
            not_before: self.not_before(),
            not_after: self.not_after(),
        }
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The certified RSA public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(self.public_key_info())
    }

    /// Modulus of the certified key, uppercase hex.
    pub fn modulus_hex(&self) -> Result<String> {
        Ok(self.public_key()?.modulus_hex())
    }

    /// Bit length of the certified key.
    pub fn key_bits(&self) -> Result<usize> {
        Ok(self.public_key()?.modulus_bits())
    }

    /// Name of the signature algorithm, or its dotted OID when unknown.
    pub fn signature_algorithm_name(&self) -> String {
        let oid = &self.inner.signature_algorithm.oid;
        oid::signature_algorithm_name(oid)
            .map(str::to_string)
            .unwrap_or_else(|| oid.to_string())
    }

    /// Digest over the complete DER encoding.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Result<Fingerprint> {
        Ok(Fingerprint::of_der(algorithm, &self.to_der()?))
    }

    /// True when subject and issuer encode to the same name.
    pub fn is_self_signed(&self) -> Result<bool> {
        Ok(self.subject().to_der()? == self.issuer().to_der()?)
    }

    pub fn extensions(&self) -> Vec<params::ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|ext| params::ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Issues a certificate where issuer and subject are the same entity,
    /// signed by that entity's own key.
    pub fn self_signed(info: &IssuanceInfo, key: &KeyPair, validity: &Validity) -> Result<Self> {
        let mut issuer = SelfIssuer {
            name: info.subject.clone(),
            key,
        };
        issuer.issue(info, validity)
    }
}

/// Joins a leaf certificate and an intermediate CA certificate into one
/// PEM bundle, leaf first.
///
/// Deliberately permissive: the two documents are not checked to chain to
/// each other. Run chain verification on the output to validate it.
pub fn concat_chain(leaf_pem: &str, intermediate_pem: &str) -> String {
    let mut out = String::with_capacity(leaf_pem.len() + intermediate_pem.len() + 1);
    out.push_str(leaf_pem);
    if !leaf_pem.is_empty() && !leaf_pem.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(intermediate_pem);
    out
}

// Issuer impl for the self-signed path: the subject signs for itself and
// the serial is drawn at random.
struct SelfIssuer<'a> {
    name: RdnSequence,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> RdnSequence {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn next_serial(&mut self, _subject: &RdnSequence) -> Result<Vec<u8>> {
        Ok(random_serial())
    }

    fn own_serial(&self) -> Option<Vec<u8>> {
        None
    }
}

/// 16 random octets shaped into a positive INTEGER with no leading zero.
fn random_serial() -> Vec<u8> {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    bytes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_algorithm_oid_roundtrip() {
        for alg in [
            SignatureAlgorithm::Sha1WithRsa,
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
        }
        assert!(matches!(
            SignatureAlgorithm::from_oid(&crate::oid::RSA_ENCRYPTION),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn rsa_algorithm_identifier_carries_null_parameters() {
        let id: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithRsa.into();
        assert!(id.parameters.is_some());
    }

    #[test]
    fn random_serials_are_positive_and_distinct() {
        let a = random_serial();
        let b = random_serial();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert!(a[0] & 0x80 == 0);
        assert!(a[0] != 0);
    }

    #[test]
    fn concat_chain_adds_missing_newline_glue() {
        let joined = concat_chain("LEAF", "INTERMEDIATE\n");
        assert_eq!(joined, "LEAF\nINTERMEDIATE\n");
        let joined = concat_chain("LEAF\n", "INTERMEDIATE\n");
        assert_eq!(joined, "LEAF\nINTERMEDIATE\n");
    }
}
