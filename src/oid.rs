//! Object identifiers used across the crate.
//!
//! Distinguished-name attribute types, the RSA signature algorithm family,
//! and the PKCS#9 extensionRequest attribute. Non-RSA algorithm identifiers
//! are intentionally absent: operations that meet them report
//! [`crate::error::Error::UnsupportedAlgorithm`].

use const_oid::ObjectIdentifier;

// X.520 attribute types (RFC 4519).
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
pub const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const STATE_OR_PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

// PKCS#1 algorithm identifiers.
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub const MD5_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.4");
pub const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
pub const SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
pub const SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
pub const SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

// PKCS#9 attribute carrying requested extensions inside a CSR.
pub const EXTENSION_REQUEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// Short display name for a DN attribute type, `None` when unrecognized.
pub fn dn_attribute_short_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    match *oid {
        COMMON_NAME => Some("CN"),
        COUNTRY => Some("C"),
        LOCALITY => Some("L"),
        STATE_OR_PROVINCE => Some("ST"),
        ORGANIZATION => Some("O"),
        ORGANIZATIONAL_UNIT => Some("OU"),
        _ => None,
    }
}

/// Human-readable name for a signature algorithm OID, `None` when
/// unrecognized.
pub fn signature_algorithm_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    match *oid {
        MD5_WITH_RSA => Some("md5WithRSAEncryption"),
        SHA1_WITH_RSA => Some("sha1WithRSAEncryption"),
        SHA256_WITH_RSA => Some("sha256WithRSAEncryption"),
        SHA384_WITH_RSA => Some("sha384WithRSAEncryption"),
        SHA512_WITH_RSA => Some("sha512WithRSAEncryption"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_with_rsa_matches_the_db_constant() {
        assert_eq!(
            SHA256_WITH_RSA,
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
        );
    }

    #[test]
    fn dn_short_names() {
        assert_eq!(dn_attribute_short_name(&COMMON_NAME), Some("CN"));
        assert_eq!(
            dn_attribute_short_name(&ObjectIdentifier::new_unwrap("2.5.4.97")),
            None
        );
    }
}
