//! Construction of the "to be signed" portion of a certificate.

use der::Encode;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::Result;

/// The unsigned body of an X.509 certificate.
///
/// Collected field by field by an issuer, then lowered to
/// [`TbsCertificateInner`] for DER encoding and signing.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: RdnSequence,
    pub validity: Validity,
    pub subject: RdnSequence,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Lowers into the encodable form.
    pub fn to_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: encode_time(self.validity.not_before)?,
            not_after: encode_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(self.serial_number.as_slice())?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        })
    }

    /// DER encoding of the TBS structure; this is the byte string the
    /// issuer signs.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_inner()?.to_der()?)
    }
}

/// Encodes a timestamp per RFC 5280 4.1.2.5: dates through 2049 use
/// UTCTime, 2050 and later use GeneralizedTime.
pub fn encode_time(at: OffsetDateTime) -> Result<Time> {
    if at.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_system_time(at.into())?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_system_time(
            at.into(),
        )?))
    }
}

/// Reads either time form back into an [`OffsetDateTime`].
pub fn decode_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
