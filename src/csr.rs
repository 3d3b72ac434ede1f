//! PKCS#10 certification requests.

use der::asn1::{BitString, OctetString};
use der::{Decode, Encode, EncodePem};
use x509_cert::attr::{Attribute, Attributes};
use x509_cert::ext::Extensions;
use x509_cert::name::RdnSequence;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::Certificate;
use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
use crate::cert::params::{DistinguishedName, ExtensionParam};
use crate::encoding::{self, DocumentKind};
use crate::error::{Error, Result};
use crate::key::{KeyPair, PublicKey};
use crate::oid;
use crate::verify;

/// A certification request: subject, public key, optional requested
/// extensions, all under a self-signature by the subject's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Builds and self-signs a request for `subject`, optionally asking
    /// for DNS subject alternative names.
    pub fn build(
        subject: &DistinguishedName,
        key_pair: &KeyPair,
        alt_names: &[String],
    ) -> Result<Self> {
        let mut extensions = Vec::new();
        if !alt_names.is_empty() {
            let san = SubjectAltName {
                names: alt_names.to_vec(),
            };
            extensions.push(ExtensionParam::from_extension(&san, false)?);
        }
        Self::build_with_extensions(subject.to_rdn_sequence()?, key_pair, extensions)
    }

    /// Builds and self-signs a request from an already-encoded subject
    /// name and raw requested extensions.
    pub fn build_with_extensions(
        subject: RdnSequence,
        key_pair: &KeyPair,
        extensions: Vec<ExtensionParam>,
    ) -> Result<Self> {
        let public_key = key_pair.public_key().to_spki()?;
        Self::assemble(subject, public_key, key_pair, extensions)
    }

    /// Re-creates a request from an issued certificate.
    ///
    /// Subject, public key and any subject alternative names are carried
    /// over from the certificate; `key_pair` provides the signature. When
    /// `key_pair` is not the key the certificate certifies, the resulting
    /// self-signature cannot verify and the conversion fails instead of
    /// emitting a broken request.
    pub fn from_certificate(cert: &Certificate, key_pair: &KeyPair) -> Result<Self> {
        let carried: Vec<ExtensionParam> = cert
            .extensions()
            .into_iter()
            .filter(|ext| ext.oid == SubjectAltName::OID)
            .collect();
        let request = Self::assemble(
            cert.subject().clone(),
            cert.public_key_info().clone(),
            key_pair,
            carried,
        )?;
        verify::verify_csr_signature(&request).map_err(|_| {
            Error::SignatureVerification(
                "supplied key does not match the certificate's public key".into(),
            )
        })?;
        Ok(request)
    }

    fn assemble(
        subject: RdnSequence,
        public_key: SubjectPublicKeyInfoOwned,
        key_pair: &KeyPair,
        extensions: Vec<ExtensionParam>,
    ) -> Result<Self> {
        if subject.0.is_empty() {
            return Err(Error::InvalidSubject("subject has no attributes".into()));
        }

        let attributes = if extensions.is_empty() {
            Attributes::default()
        } else {
            let list = extensions
                .iter()
                .map(|ext| {
                    Ok(x509_cert::ext::Extension {
                        extn_id: ext.oid,
                        critical: ext.critical,
                        extn_value: OctetString::new(ext.value.clone())?,
                    })
                })
                .collect::<Result<Extensions>>()?;
            let attribute = Attribute {
                oid: oid::EXTENSION_REQUEST,
                values: vec![der::Any::encode_from(&list)?].try_into()?,
            };
            Attributes::try_from(vec![attribute])?
        };

        let info = CertReqInfo {
            version: Version::V1,
            subject,
            public_key,
            attributes,
        };
        let signature = key_pair.sign(&info.to_der()?);

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: SignatureAlgorithm::Sha256WithRsa.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    /// Parses a DER-encoded request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    /// Reads a request from PEM or DER bytes, rejecting PEM documents of
    /// any other kind. The legacy `NEW CERTIFICATE REQUEST` label is
    /// accepted.
    pub fn load(input: &[u8]) -> Result<Self> {
        let der = encoding::decode_document(input, DocumentKind::CertificateRequest)?;
        Self::from_der(&der)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(self.inner.to_pem(der::pem::LineEnding::LF)?)
    }

    pub fn subject(&self) -> &RdnSequence {
        &self.inner.info.subject
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.info.public_key
    }

    /// The requested RSA public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(self.public_key_info())
    }

    /// Modulus of the requested key, uppercase hex.
    pub fn modulus_hex(&self) -> Result<String> {
        Ok(self.public_key()?.modulus_hex())
    }

    /// Bit length of the requested key.
    pub fn key_bits(&self) -> Result<usize> {
        Ok(self.public_key()?.modulus_bits())
    }

    /// Extensions asked for through the PKCS#9 `extensionRequest`
    /// attribute, empty when the attribute is absent.
    pub fn requested_extensions(&self) -> Result<Vec<ExtensionParam>> {
        for attr in self.inner.info.attributes.iter() {
            if attr.oid != oid::EXTENSION_REQUEST {
                continue;
            }
            let value = attr.values.iter().next().ok_or_else(|| {
                Error::Decode("extensionRequest attribute has no value".into())
            })?;
            let list: Extensions = value.decode_as()?;
            return Ok(list
                .iter()
                .map(|ext| ExtensionParam {
                    oid: ext.extn_id,
                    critical: ext.critical,
                    value: ext.extn_value.as_bytes().to_vec(),
                })
                .collect());
        }
        Ok(Vec::new())
    }

    /// DNS subject alternative names requested by this CSR.
    pub fn subject_alt_names(&self) -> Result<Vec<String>> {
        for ext in self.requested_extensions()? {
            if ext.oid == SubjectAltName::OID {
                return Ok(ext.to_extension::<SubjectAltName>()?.names);
            }
        }
        Ok(Vec::new())
    }
}
