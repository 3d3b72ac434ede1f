//! Certificate issuance: the [`Issuer`] trait and the file-backed CA.

use const_oid::ObjectIdentifier;
use der::Encode;
use der::asn1::BitString;
use der::flagset::FlagSet;
use sha1::{Digest, Sha1};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::RdnSequence;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    KeyUsages, SubjectKeyIdentifier,
};
use crate::cert::params::{name_to_string, ExtensionParam, IssuanceInfo, Validity};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::csr::CertificateRequest;
use crate::error::{Error, Result};
use crate::key::KeyPair;
use crate::serial::{serial_to_bytes, SerialRegistry};
use crate::tbs_certificate::TbsCertificate;
use crate::verify;

/// An entity able to sign certificates: a name, a key, and a serial
/// number source.
pub trait Issuer {
    /// Name placed in the issuer field of issued certificates.
    fn issuer_name(&self) -> RdnSequence;

    /// Key that signs issued certificates.
    fn signing_key(&self) -> &KeyPair;

    /// Reserves the serial for the certificate about to be issued.
    /// `subject` is available for record keeping.
    fn next_serial(&mut self, subject: &RdnSequence) -> Result<Vec<u8>>;

    /// Serial of the issuer's own certificate, recorded in the authority
    /// key identifier. `None` when the issuer has no certificate of its
    /// own (the self-signed case).
    fn own_serial(&self) -> Option<Vec<u8>>;

    /// Builds, signs and assembles a certificate for `info`.
    ///
    /// Issued certificates carry BasicConstraints (critical), subject and
    /// authority key identifiers, and, when usages are requested, KeyUsage
    /// and ExtendedKeyUsage. Extensions requested through `info` ride
    /// along unless the issuer computed the same OID itself.
    fn issue(&mut self, info: &IssuanceInfo, validity: &Validity) -> Result<Certificate> {
        let issuer_dn = self.issuer_name();
        let serial = self.next_serial(&info.subject)?;
        let aki_serial = self.own_serial().unwrap_or_else(|| serial.clone());

        let issuer_spki = self.signing_key().public_key().to_spki()?;
        let issuer_key_id = Sha1::digest(issuer_spki.subject_public_key.raw_bytes());
        let subject_key_id =
            Sha1::digest(info.subject_public_key_info.subject_public_key.raw_bytes());

        let basic_constraints = BasicConstraints {
            is_ca: info.is_ca,
            max_path_length: None,
        };
        let subject_key_identifier = SubjectKeyIdentifier {
            key_identifier: subject_key_id.to_vec(),
        };
        let authority_key_identifier = AuthorityKeyIdentifier {
            key_identifier: issuer_key_id.to_vec(),
            authority_cert_issuer: Some(issuer_dn.clone()),
            authority_cert_serial_number: Some(aki_serial),
        };

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(&basic_constraints, true)?,
            ExtensionParam::from_extension(&subject_key_identifier, false)?,
            ExtensionParam::from_extension(&authority_key_identifier, false)?,
        ];

        let mut key_usage_flags: FlagSet<KeyUsages> = FlagSet::empty();
        if info.is_ca {
            key_usage_flags |= KeyUsages::KeyCertSign;
            key_usage_flags |= KeyUsages::CRLSign;
        }
        for usage in &info.usages {
            match usage {
                ExtendedKeyUsageOption::ClientAuth
                | ExtendedKeyUsageOption::ServerAuth
                | ExtendedKeyUsageOption::EmailProtection => {
                    key_usage_flags |= KeyUsages::DigitalSignature;
                    key_usage_flags |= KeyUsages::KeyEncipherment;
                }
                ExtendedKeyUsageOption::CodeSigning
                | ExtendedKeyUsageOption::TimeStamping
                | ExtendedKeyUsageOption::OcspSigning => {
                    key_usage_flags |= KeyUsages::DigitalSignature;
                }
            }
        }
        if !key_usage_flags.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                &KeyUsage(key_usage_flags),
                true,
            )?);
        }
        if !info.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: info.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(&extended_key_usage, false)?);
        }

        let computed: Vec<ObjectIdentifier> = extensions.iter().map(|ext| ext.oid).collect();
        let combined: Vec<ExtensionParam> = info
            .extensions
            .iter()
            .filter(|ext| !computed.contains(&ext.oid))
            .cloned()
            .chain(extensions)
            .collect();

        let tbs = TbsCertificate {
            serial_number: serial,
            signature_algorithm: SignatureAlgorithm::Sha256WithRsa,
            issuer: issuer_dn,
            validity: validity.clone(),
            subject: info.subject.clone(),
            subject_public_key_info: info.subject_public_key_info.clone(),
            extensions: combined,
        };

        let tbs_inner = tbs.to_inner()?;
        let signature = self.signing_key().sign(&tbs_inner.to_der()?);

        Ok(Certificate {
            inner: CertificateInner {
                tbs_certificate: tbs_inner,
                signature_algorithm: SignatureAlgorithm::Sha256WithRsa.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }
}

/// A certificate authority: its certificate, its key, and the registry
/// that hands out serials.
#[derive(Debug)]
pub struct CaIssuer {
    cert: Certificate,
    key: KeyPair,
    registry: SerialRegistry,
}

impl CaIssuer {
    /// Pairs a CA certificate with its signing key and serial registry.
    ///
    /// Fails when the certificate does not certify the supplied key, so a
    /// mixed-up CA directory is caught before anything gets signed.
    pub fn new(cert: Certificate, key: KeyPair, registry: SerialRegistry) -> Result<Self> {
        if cert.modulus_hex()? != key.modulus_hex() {
            return Err(Error::InvalidParameter(
                "CA certificate does not match the CA key".into(),
            ));
        }
        Ok(Self {
            cert,
            key,
            registry,
        })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Verifies the request's self-signature, then issues a certificate
    /// for its subject and key.
    pub fn issue_from_request(
        &mut self,
        request: &CertificateRequest,
        validity: &Validity,
        usages: &[ExtendedKeyUsageOption],
    ) -> Result<Certificate> {
        verify::verify_csr_signature(request)?;
        let info = IssuanceInfo::builder()
            .subject(request.subject().clone())
            .subject_public_key_info(request.public_key_info().clone())
            .usages(usages.to_vec())
            .extensions(request.requested_extensions()?)
            .build();
        self.issue(&info, validity)
    }
}

impl Issuer for CaIssuer {
    fn issuer_name(&self) -> RdnSequence {
        self.cert.subject().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn next_serial(&mut self, subject: &RdnSequence) -> Result<Vec<u8>> {
        let serial = self.registry.allocate(&name_to_string(subject))?;
        Ok(serial_to_bytes(serial))
    }

    fn own_serial(&self) -> Option<Vec<u8>> {
        Some(
            self.cert
                .inner
                .tbs_certificate
                .serial_number
                .as_bytes()
                .to_vec(),
        )
    }
}
