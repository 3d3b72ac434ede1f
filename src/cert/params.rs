use std::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use time::{Duration, OffsetDateTime};
use x509_cert::name::RdnSequence;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::{ExtendedKeyUsage, ExtendedKeyUsageOption};
use crate::error::{Error, Result};
use crate::oid;

/// Everything an issuer needs to know about the certificate it is asked
/// to produce: who it names, which key it certifies, and which extensions
/// it should carry.
#[derive(Clone, Debug, Builder)]
pub struct IssuanceInfo {
    pub subject: RdnSequence,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Structured subject or issuer name.
///
/// Every component is optional; at least one must be present before the
/// name can be turned into an X.501 name. Field order in the emitted name
/// is CN, OU, O, L, ST, C.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none()
            && self.country.is_none()
            && self.state.is_none()
            && self.locality.is_none()
            && self.organization.is_none()
            && self.organization_unit.is_none()
    }

    /// Converts to an X.501 `RDNSequence`.
    ///
    /// Absent components are omitted rather than emitted as empty strings.
    /// Fails with [`Error::InvalidSubject`] when no component is set.
    pub fn to_rdn_sequence(&self) -> Result<RdnSequence> {
        let components = [
            ("CN", &self.common_name),
            ("OU", &self.organization_unit),
            ("O", &self.organization),
            ("L", &self.locality),
            ("ST", &self.state),
            ("C", &self.country),
        ];
        let parts: Vec<String> = components
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| format!("{key}={}", escape_dn_value(v)))
            })
            .collect();
        if parts.is_empty() {
            return Err(Error::InvalidSubject(
                "subject has no attributes".into(),
            ));
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| Error::InvalidSubject(format!("cannot encode subject: {e}")))
    }

    /// Reads the known components out of an X.501 name. Attribute types
    /// this struct does not model are skipped.
    pub fn from_rdn_sequence(name: &RdnSequence) -> Self {
        let mut dn = Self::default();
        for rdn in name.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = decode_directory_string(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    oid::COMMON_NAME => dn.common_name = Some(value),
                    oid::COUNTRY => dn.country = Some(value),
                    oid::STATE_OR_PROVINCE => dn.state = Some(value),
                    oid::LOCALITY => dn.locality = Some(value),
                    oid::ORGANIZATION => dn.organization = Some(value),
                    oid::ORGANIZATIONAL_UNIT => dn.organization_unit = Some(value),
                    _ => {}
                }
            }
        }
        dn
    }
}

/// Renders a name the way the inspection commands print it:
/// `CN = example.com, O = Example Corp`.
pub fn name_to_string(name: &RdnSequence) -> String {
    let mut parts = Vec::new();
    for rdn in name.0.iter() {
        for attr in rdn.0.iter() {
            let key = oid::dn_attribute_short_name(&attr.oid)
                .map(str::to_string)
                .unwrap_or_else(|| attr.oid.to_string());
            let value =
                decode_directory_string(&attr.value).unwrap_or_else(|| "<unprintable>".into());
            parts.push(format!("{key} = {value}"));
        }
    }
    parts.join(", ")
}

/// Decodes a directory string attribute value, accepting the three string
/// types seen in practice.
fn decode_directory_string(value: &der::Any) -> Option<String> {
    if let Ok(s) = value.decode_as::<Utf8StringRef<'_>>() {
        return Some(s.as_str().to_string());
    }
    if let Ok(s) = value.decode_as::<PrintableStringRef<'_>>() {
        return Some(s.as_str().to_string());
    }
    if let Ok(s) = value.decode_as::<Ia5StringRef<'_>>() {
        return Some(s.as_str().to_string());
    }
    None
}

/// Escapes an attribute value for inclusion in an RFC 4514 string.
fn escape_dn_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 2);
    for (i, &c) in chars.iter().enumerate() {
        let escape = match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => true,
            '#' if i == 0 => true,
            ' ' if i == 0 || i == chars.len() - 1 => true,
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Certificate validity period, `notBefore` through `notAfter`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// A window opening now and closing `days` days later.
    pub fn for_days(days: i64) -> Result<Self> {
        if days < 1 {
            return Err(Error::InvalidParameter(format!(
                "validity days must be positive, got {days}"
            )));
        }
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            not_before: now,
            not_after: now + Duration::days(days),
        })
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// A raw X.509 extension: OID, criticality and DER-encoded value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dn_roundtrip_keeps_components() {
        let dn = DistinguishedName::builder()
            .common_name("example.com".to_string())
            .organization("Example Corp".to_string())
            .country("FR".to_string())
            .build();
        let name = dn.to_rdn_sequence().unwrap();
        let back = DistinguishedName::from_rdn_sequence(&name);
        assert_eq!(back.common_name.as_deref(), Some("example.com"));
        assert_eq!(back.organization.as_deref(), Some("Example Corp"));
        assert_eq!(back.country.as_deref(), Some("FR"));
        assert_eq!(back.state, None);
    }

    #[test]
    fn empty_dn_is_rejected() {
        let dn = DistinguishedName::default();
        assert!(dn.is_empty());
        assert!(matches!(
            dn.to_rdn_sequence(),
            Err(Error::InvalidSubject(_))
        ));
    }

    #[test]
    fn dn_values_with_separators_survive() {
        let dn = DistinguishedName::builder()
            .common_name("Ops, Internal".to_string())
            .build();
        let name = dn.to_rdn_sequence().unwrap();
        let back = DistinguishedName::from_rdn_sequence(&name);
        assert_eq!(back.common_name.as_deref(), Some("Ops, Internal"));
    }

    #[test]
    fn name_to_string_uses_short_attribute_names() {
        let dn = DistinguishedName::builder()
            .common_name("example.com".to_string())
            .organization("Example Corp".to_string())
            .build();
        let name = dn.to_rdn_sequence().unwrap();
        let printed = name_to_string(&name);
        assert!(printed.contains("CN = example.com"));
        assert!(printed.contains("O = Example Corp"));
    }

    #[test]
    fn validity_window_bounds() {
        let validity = Validity::for_days(30).unwrap();
        assert!(validity.contains(OffsetDateTime::now_utc()));
        assert!(!validity.contains(OffsetDateTime::now_utc() + Duration::days(31)));
        assert!(matches!(
            Validity::for_days(0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            Validity::for_days(-5),
            Err(Error::InvalidParameter(_))
        ));
    }
}
