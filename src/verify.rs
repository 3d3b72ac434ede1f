//! Signature, validity window and chain verification.

use const_oid::AssociatedOid;
use der::Encode;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use time::OffsetDateTime;
use x509_cert::crl::CertificateList;

use crate::cert::{Certificate, SignatureAlgorithm};
use crate::csr::CertificateRequest;
use crate::digest::{self, HashAlgorithm};
use crate::encoding::{self, DocumentKind};
use crate::error::{ChainFailure, Error, Result};
use crate::key::KeyPair;

/// Where a certificate stands relative to its validity window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidityStatus {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub expired: bool,
    pub not_yet_valid: bool,
}

impl ValidityStatus {
    pub fn is_valid(&self) -> bool {
        !self.expired && !self.not_yet_valid
    }
}

/// Classifies `cert` against its own validity window at `as_of`.
pub fn check_validity(cert: &Certificate, as_of: OffsetDateTime) -> ValidityStatus {
    let not_before = cert.not_before();
    let not_after = cert.not_after();
    ValidityStatus {
        not_before,
        not_after,
        expired: as_of > not_after,
        not_yet_valid: as_of < not_before,
    }
}

/// Checks the self-signature of a certification request against the
/// public key embedded in it.
pub fn verify_csr_signature(request: &CertificateRequest) -> Result<()> {
    let algorithm = SignatureAlgorithm::from_oid(&request.inner.algorithm.oid)?;
    let public = request.public_key()?;
    let message = request.inner.info.to_der()?;
    let signature = request
        .inner
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Decode("request signature has unused bits".into()))?;
    verify_rsa_signature(public.inner(), algorithm, &message, signature)
        .map_err(|_| Error::SignatureVerification("request self-signature does not verify".into()))
}

/// Checks that `signer`'s key produced `cert`'s signature.
pub fn verify_certificate_signature(cert: &Certificate, signer: &Certificate) -> Result<()> {
    let algorithm = SignatureAlgorithm::from_oid(&cert.inner.signature_algorithm.oid)?;
    let public = signer.public_key()?;
    let message = cert.inner.tbs_certificate.to_der()?;
    let signature = cert
        .inner
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Decode("certificate signature has unused bits".into()))?;
    verify_rsa_signature(public.inner(), algorithm, &message, signature)
}

fn verify_rsa_signature(
    public: &RsaPublicKey,
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    match algorithm {
        SignatureAlgorithm::Sha1WithRsa => verify_with::<Sha1>(public, message, signature),
        SignatureAlgorithm::Sha256WithRsa => verify_with::<Sha256>(public, message, signature),
        SignatureAlgorithm::Sha384WithRsa => verify_with::<Sha384>(public, message, signature),
        SignatureAlgorithm::Sha512WithRsa => verify_with::<Sha512>(public, message, signature),
    }
}

fn verify_with<D>(public: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()>
where
    D: Digest + AssociatedOid,
{
    let verifying_key = VerifyingKey::<D>::new(public.clone());
    let signature = Signature::try_from(signature)
        .map_err(|e| Error::SignatureVerification(e.to_string()))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|e| Error::SignatureVerification(e.to_string()))
}

/// Verifies `cert` against the trust anchors in `roots`.
///
/// Checks run in a fixed order and each failure carries one reason code:
/// the validity window first (`Expired`, `NotYetValid`), then trust. With
/// no roots given, only a self-signed certificate that verifies against
/// its own key passes; anything else is `Untrusted`. With roots, the
/// issuer is located by name (`Untrusted` when absent) and the signature
/// checked against its key (`BadSignature` when it fails). A CRL, when
/// supplied and issued by the same name, rejects listed serials as
/// `Revoked`.
pub fn verify_chain(
    cert: &Certificate,
    roots: &[Certificate],
    crl: Option<&CertificateList>,
    as_of: OffsetDateTime,
) -> Result<()> {
    let status = check_validity(cert, as_of);
    if status.expired {
        return Err(Error::Chain(ChainFailure::Expired));
    }
    if status.not_yet_valid {
        return Err(Error::Chain(ChainFailure::NotYetValid));
    }

    if roots.is_empty() {
        if !cert.is_self_signed()? {
            return Err(Error::Chain(ChainFailure::Untrusted));
        }
        match verify_certificate_signature(cert, cert) {
            Ok(()) => {}
            Err(Error::SignatureVerification(_)) => {
                return Err(Error::Chain(ChainFailure::BadSignature));
            }
            Err(other) => return Err(other),
        }
    } else {
        let issuer_der = cert.issuer().to_der()?;
        let mut issuer_found = false;
        let mut verified = false;
        for root in roots {
            if root.subject().to_der()? != issuer_der {
                continue;
            }
            issuer_found = true;
            match verify_certificate_signature(cert, root) {
                Ok(()) => {
                    verified = true;
                    break;
                }
                // Another root with the same name may hold the right key.
                Err(Error::SignatureVerification(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        if !issuer_found {
            return Err(Error::Chain(ChainFailure::Untrusted));
        }
        if !verified {
            return Err(Error::Chain(ChainFailure::BadSignature));
        }
    }

    if let Some(crl) = crl {
        if is_revoked(cert, crl)? {
            return Err(Error::Chain(ChainFailure::Revoked));
        }
    }
    Ok(())
}

/// True when `crl` was issued by `cert`'s issuer and lists its serial.
fn is_revoked(cert: &Certificate, crl: &CertificateList) -> Result<bool> {
    if crl.tbs_cert_list.issuer.to_der()? != cert.issuer().to_der()? {
        return Ok(false);
    }
    let Some(revoked) = &crl.tbs_cert_list.revoked_certificates else {
        return Ok(false);
    };
    let serial = cert.inner.tbs_certificate.serial_number.as_bytes();
    Ok(revoked
        .iter()
        .any(|entry| entry.serial_number.as_bytes() == serial))
}

/// Reads a certificate revocation list from PEM or DER bytes.
pub fn load_crl(input: &[u8]) -> Result<CertificateList> {
    let der = encoding::decode_document(input, DocumentKind::Crl)?;
    Ok(<CertificateList as der::Decode>::from_der(&der)?)
}

/// Outcome of comparing a certificate's key with a private key.
///
/// Produced by [`match_key_and_certificate`], which reports rather than
/// errors: a mismatch, or a certificate whose key is not RSA, is an
/// ordinary `false`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCertMatch {
    /// MD5 digest of the certificate's modulus line, `None` when the
    /// certificate does not certify an RSA key.
    pub certificate_digest: Option<String>,
    /// MD5 digest of the private key's modulus line.
    pub key_digest: String,
    pub matches: bool,
}

/// Compares the modulus digests of `cert` and `key`.
pub fn match_key_and_certificate(cert: &Certificate, key: &KeyPair) -> KeyCertMatch {
    let key_digest = digest::modulus_digest(&key.modulus_hex(), HashAlgorithm::Md5);
    let certificate_digest = cert
        .modulus_hex()
        .ok()
        .map(|modulus| digest::modulus_digest(&modulus, HashAlgorithm::Md5));
    let matches = certificate_digest.as_deref() == Some(key_digest.as_str());
    KeyCertMatch {
        certificate_digest,
        key_digest,
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{DistinguishedName, IssuanceInfo, Validity};
    use time::Duration;

    fn quick_cert(key: &KeyPair, days: i64) -> Certificate {
        let subject = DistinguishedName::builder()
            .common_name("unit.test".to_string())
            .build()
            .to_rdn_sequence()
            .unwrap();
        let info = IssuanceInfo::builder()
            .subject(subject)
            .subject_public_key_info(key.public_key().to_spki().unwrap())
            .build();
        Certificate::self_signed(&info, key, &Validity::for_days(days).unwrap()).unwrap()
    }

    #[test]
    fn validity_classification() {
        let key = KeyPair::generate(512).unwrap();
        let cert = quick_cert(&key, 30);
        let now = OffsetDateTime::now_utc();

        let current = check_validity(&cert, now);
        assert!(current.is_valid());

        let early = check_validity(&cert, now - Duration::days(1));
        assert!(early.not_yet_valid);
        assert!(!early.expired);

        let late = check_validity(&cert, now + Duration::days(31));
        assert!(late.expired);
        assert!(!late.not_yet_valid);
    }

    #[test]
    fn self_signed_verifies_against_itself() {
        let key = KeyPair::generate(512).unwrap();
        let cert = quick_cert(&key, 30);
        verify_certificate_signature(&cert, &cert).unwrap();
        verify_chain(&cert, &[], None, OffsetDateTime::now_utc()).unwrap();
    }

    #[test]
    fn expired_wins_over_untrusted() {
        let key = KeyPair::generate(512).unwrap();
        let cert = quick_cert(&key, 1);
        let later = OffsetDateTime::now_utc() + Duration::days(10);
        // No roots at all, but the expiry is what gets reported.
        let err = verify_chain(&cert, &[], None, later).unwrap_err();
        assert!(matches!(err, Error::Chain(ChainFailure::Expired)));
    }

    #[test]
    fn key_cert_match_reports_without_erroring() {
        let key = KeyPair::generate(512).unwrap();
        let cert = quick_cert(&key, 30);

        let hit = match_key_and_certificate(&cert, &key);
        assert!(hit.matches);
        assert_eq!(hit.certificate_digest.as_deref(), Some(hit.key_digest.as_str()));

        let other = KeyPair::generate(512).unwrap();
        let miss = match_key_and_certificate(&cert, &other);
        assert!(!miss.matches);
        assert!(miss.certificate_digest.is_some());
        assert_ne!(miss.certificate_digest.as_deref(), Some(miss.key_digest.as_str()));
    }
}
