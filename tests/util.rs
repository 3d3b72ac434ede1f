use certops::cert::Certificate;
use certops::cert::params::{DistinguishedName, IssuanceInfo, Validity};
use certops::issuer::CaIssuer;
use certops::key::KeyPair;
use certops::serial::SerialRegistry;
use std::path::Path;

// 512-bit keys keep the prime search fast; size-sensitive tests generate
// their own.
pub fn rsa_key() -> KeyPair {
    KeyPair::generate(512).unwrap()
}

pub fn dn(common_name: &str) -> DistinguishedName {
    DistinguishedName::builder()
        .common_name(common_name.to_string())
        .build()
}

pub fn self_signed(common_name: &str, key: &KeyPair, is_ca: bool, days: i64) -> Certificate {
    let info = IssuanceInfo::builder()
        .subject(dn(common_name).to_rdn_sequence().unwrap())
        .subject_public_key_info(key.public_key().to_spki().unwrap())
        .is_ca(is_ca)
        .build();
    Certificate::self_signed(&info, key, &Validity::for_days(days).unwrap()).unwrap()
}

pub fn test_ca(serial_file: &Path) -> CaIssuer {
    let ca_key = rsa_key();
    let ca_cert = self_signed("Test Root CA", &ca_key, true, 3650);
    CaIssuer::new(ca_cert, ca_key, SerialRegistry::new(serial_file)).unwrap()
}
