//! PEM/DER ingestion and emission.
//!
//! Every operation in this crate accepts either PEM armor or raw DER. This
//! module normalizes both to DER while enforcing that the armor label matches
//! the kind of document the caller expects: well-formed input of the wrong
//! kind (say, a certificate handed to a key operation) is reported as
//! [`Error::WrongKind`], distinct from malformed armor or truncated DER,
//! which is [`Error::Decode`].

use crate::error::{Error, Result};

/// The document kinds this crate understands, keyed by their PEM label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PKCS#1 `RSA PRIVATE KEY`.
    RsaPrivateKey,
    /// PKCS#8 `PRIVATE KEY`.
    PrivateKey,
    /// PKCS#8 `ENCRYPTED PRIVATE KEY`.
    EncryptedPrivateKey,
    /// SPKI `PUBLIC KEY`.
    PublicKey,
    /// PKCS#1 `RSA PUBLIC KEY`.
    RsaPublicKey,
    /// PKCS#10 `CERTIFICATE REQUEST`.
    CertificateRequest,
    /// X.509 `CERTIFICATE`.
    Certificate,
    /// `X509 CRL`.
    Crl,
}

impl DocumentKind {
    /// Canonical PEM label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::RsaPrivateKey => "RSA PRIVATE KEY",
            DocumentKind::PrivateKey => "PRIVATE KEY",
            DocumentKind::EncryptedPrivateKey => "ENCRYPTED PRIVATE KEY",
            DocumentKind::PublicKey => "PUBLIC KEY",
            DocumentKind::RsaPublicKey => "RSA PUBLIC KEY",
            DocumentKind::CertificateRequest => "CERTIFICATE REQUEST",
            DocumentKind::Certificate => "CERTIFICATE",
            DocumentKind::Crl => "X509 CRL",
        }
    }

    /// Whether `label` identifies this kind. Accepts the legacy
    /// `NEW CERTIFICATE REQUEST` alias some tools still emit.
    pub fn matches_label(&self, label: &str) -> bool {
        label == self.label()
            || (*self == DocumentKind::CertificateRequest && label == "NEW CERTIFICATE REQUEST")
    }

    /// Map a PEM label back to a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "RSA PRIVATE KEY" => Some(DocumentKind::RsaPrivateKey),
            "PRIVATE KEY" => Some(DocumentKind::PrivateKey),
            "ENCRYPTED PRIVATE KEY" => Some(DocumentKind::EncryptedPrivateKey),
            "PUBLIC KEY" => Some(DocumentKind::PublicKey),
            "RSA PUBLIC KEY" => Some(DocumentKind::RsaPublicKey),
            "CERTIFICATE REQUEST" | "NEW CERTIFICATE REQUEST" => {
                Some(DocumentKind::CertificateRequest)
            }
            "CERTIFICATE" => Some(DocumentKind::Certificate),
            "X509 CRL" => Some(DocumentKind::Crl),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the input carries PEM armor.
pub fn is_pem(input: &[u8]) -> bool {
    // Armor may be preceded by explanatory text, as in `openssl x509 -text`.
    input
        .windows(b"-----BEGIN ".len())
        .any(|w| w == b"-----BEGIN ")
}

/// Convert DER-encoded data into a PEM-encoded string with the kind's label.
pub fn der_to_pem(der: &[u8], kind: DocumentKind) -> String {
    let block = pem::Pem::new(kind.label(), der);
    pem::encode_config(
        &block,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Decode a single document, PEM or DER, into DER bytes of the given kind.
///
/// PEM input must carry the matching label; raw input must at least look like
/// a DER SEQUENCE. Structural validation is left to the typed decoders
/// layered above.
pub fn decode_document(input: &[u8], kind: DocumentKind) -> Result<Vec<u8>> {
    if is_pem(input) {
        let block = pem::parse(input)?;
        if !kind.matches_label(block.tag()) {
            return Err(Error::WrongKind {
                expected: kind.label(),
                found: block.tag().to_string(),
            });
        }
        return Ok(block.contents().to_vec());
    }
    der_prefix_check(input)?;
    Ok(input.to_vec())
}

/// Identify a PEM document and return its kind and DER body.
///
/// Returns `Ok(None)` for input without armor (presumed DER). Unknown labels
/// are a decode failure: the file is not one of the formats this tool
/// handles.
pub fn classify(input: &[u8]) -> Result<Option<(DocumentKind, Vec<u8>)>> {
    if !is_pem(input) {
        der_prefix_check(input)?;
        return Ok(None);
    }
    let block = pem::parse(input)?;
    match DocumentKind::from_label(block.tag()) {
        Some(kind) => Ok(Some((kind, block.contents().to_vec()))),
        None => Err(Error::Decode(format!(
            "unsupported PEM label {:?}",
            block.tag()
        ))),
    }
}

/// Parse every PEM block in a bundle (CA files, concatenated chains),
/// keeping the order of appearance.
pub fn pem_blocks(input: &[u8]) -> Result<Vec<(DocumentKind, Vec<u8>)>> {
    let blocks = pem::parse_many(input)?;
    if blocks.is_empty() {
        return Err(Error::Decode("no PEM blocks found".to_string()));
    }
    blocks
        .into_iter()
        .map(|block| match DocumentKind::from_label(block.tag()) {
            Some(kind) => Ok((kind, block.contents().to_vec())),
            None => Err(Error::Decode(format!(
                "unsupported PEM label {:?}",
                block.tag()
            ))),
        })
        .collect()
}

fn der_prefix_check(input: &[u8]) -> Result<()> {
    // All supported kinds encode as a top-level SEQUENCE.
    if input.first() != Some(&0x30) {
        return Err(Error::Decode(
            "input is neither PEM armor nor DER".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_roundtrip_preserves_der() {
        let der = vec![0x30, 0x03, 0x02, 0x01, 0x05];
        let pem_text = der_to_pem(&der, DocumentKind::Certificate);
        assert!(pem_text.starts_with("-----BEGIN CERTIFICATE-----"));
        let decoded = decode_document(pem_text.as_bytes(), DocumentKind::Certificate).unwrap();
        assert_eq!(decoded, der);
    }

    #[test]
    fn wrong_label_is_wrong_kind_not_decode() {
        let der = vec![0x30, 0x03, 0x02, 0x01, 0x05];
        let pem_text = der_to_pem(&der, DocumentKind::Certificate);
        let err = decode_document(pem_text.as_bytes(), DocumentKind::RsaPrivateKey).unwrap_err();
        match err {
            Error::WrongKind { expected, found } => {
                assert_eq!(expected, "RSA PRIVATE KEY");
                assert_eq!(found, "CERTIFICATE");
            }
            other => panic!("expected WrongKind, got {other:?}"),
        }
    }

    #[test]
    fn broken_armor_is_a_decode_error() {
        let text = "-----BEGIN CERTIFICATE-----\nnot base64 at all !!\n";
        let err = decode_document(text.as_bytes(), DocumentKind::Certificate).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_document(b"\x01\x02\x03", DocumentKind::Certificate).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn legacy_request_label_accepted() {
        let der = vec![0x30, 0x00];
        let block = pem::Pem::new("NEW CERTIFICATE REQUEST", der.clone());
        let text = pem::encode(&block);
        let decoded =
            decode_document(text.as_bytes(), DocumentKind::CertificateRequest).unwrap();
        assert_eq!(decoded, der);
    }

    #[test]
    fn classify_reports_kind() {
        let der = vec![0x30, 0x00];
        let text = der_to_pem(&der, DocumentKind::PrivateKey);
        let (kind, body) = classify(text.as_bytes()).unwrap().unwrap();
        assert_eq!(kind, DocumentKind::PrivateKey);
        assert_eq!(body, der);
        assert!(classify(&der).unwrap().is_none());
    }
}
