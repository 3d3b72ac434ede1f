mod util;

use certops::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use certops::cert::params::{DistinguishedName, Validity, name_to_string};
use certops::cert::{Certificate, SignatureAlgorithm};
use certops::csr::CertificateRequest;
use certops::error::{ChainFailure, Error};
use certops::key::KeyPair;
use certops::tbs_certificate::encode_time;
use certops::verify;
use der::asn1::BitString;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use x509_cert::Version;
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};

/// The everyday flow at full key size: generate a key, request a
/// certificate for a host name, self-sign it, and confirm the pieces
/// belong together.
#[test]
fn end_to_end_2048() {
    let key = KeyPair::generate(2048).unwrap();
    assert_eq!(key.modulus_bits(), 2048);

    let request = CertificateRequest::build(
        &util::dn("example.com"),
        &key,
        &["example.com".to_string(), "www.example.com".to_string()],
    )
    .unwrap();
    verify::verify_csr_signature(&request).unwrap();
    assert_eq!(
        request.subject_alt_names().unwrap(),
        vec!["example.com", "www.example.com"]
    );

    let cert = util::self_signed("example.com", &key, false, 365);
    assert_eq!(cert.version(), 3);
    assert!(cert.is_self_signed().unwrap());
    assert!(name_to_string(cert.subject()).contains("CN = example.com"));
    verify::verify_chain(&cert, &[], None, OffsetDateTime::now_utc()).unwrap();

    let outcome = verify::match_key_and_certificate(&cert, &key);
    assert!(outcome.matches);

    let unrelated = KeyPair::generate(2048).unwrap();
    assert!(!verify::match_key_and_certificate(&cert, &unrelated).matches);
}

/// A CA issues from a request: the serial registry hands out distinct
/// serials, the issuer name is the CA's, and the chain verifies against
/// the CA as trust anchor.
#[test]
fn ca_issues_from_requests() {
    let dir = TempDir::new().unwrap();
    let mut ca = util::test_ca(&dir.path().join("serials.txt"));
    let ca_cert = ca.certificate().clone();

    let first_key = util::rsa_key();
    let first_request =
        CertificateRequest::build(&util::dn("one.myca.local"), &first_key, &[]).unwrap();
    let first = ca
        .issue_from_request(&first_request, &Validity::for_days(365).unwrap(), &[])
        .unwrap();

    let second_key = util::rsa_key();
    let second_request =
        CertificateRequest::build(&util::dn("two.myca.local"), &second_key, &[]).unwrap();
    let second = ca
        .issue_from_request(&second_request, &Validity::for_days(365).unwrap(), &[])
        .unwrap();

    assert_ne!(first.serial_hex(), second.serial_hex());
    assert_eq!(
        name_to_string(first.issuer()),
        name_to_string(ca_cert.subject())
    );
    assert!(!first.is_self_signed().unwrap());

    verify::verify_chain(&first, &[ca_cert.clone()], None, OffsetDateTime::now_utc()).unwrap();
    verify::verify_chain(&second, &[ca_cert], None, OffsetDateTime::now_utc()).unwrap();

    // PEM round-trip of an issued certificate.
    let reloaded = Certificate::load(first.to_pem().unwrap().as_bytes()).unwrap();
    assert_eq!(reloaded.serial_hex(), first.serial_hex());
}

/// Issued certificates carry the expected extension set: basic
/// constraints, key identifiers chaining subject to issuer, and an EKU
/// when usages were requested.
#[test]
fn issued_certificate_extensions() {
    let dir = TempDir::new().unwrap();
    let mut ca = util::test_ca(&dir.path().join("serials.txt"));
    let ca_cert = ca.certificate().clone();

    let key = util::rsa_key();
    let request = CertificateRequest::build(&util::dn("server.myca.local"), &key, &[]).unwrap();
    let cert = ca
        .issue_from_request(
            &request,
            &Validity::for_days(365).unwrap(),
            &[ExtendedKeyUsageOption::ServerAuth],
        )
        .unwrap();

    let extensions = cert.extensions();
    let find = |oid| extensions.iter().find(|ext| ext.oid == oid);

    let bc = find(BasicConstraints::OID).expect("basic constraints present");
    assert!(bc.critical);
    assert!(!bc.to_extension::<BasicConstraints>().unwrap().is_ca);

    let ski = find(SubjectKeyIdentifier::OID).expect("subject key identifier present");
    let ski = ski.to_extension::<SubjectKeyIdentifier>().unwrap();

    let aki = find(AuthorityKeyIdentifier::OID).expect("authority key identifier present");
    let aki = aki.to_extension::<AuthorityKeyIdentifier>().unwrap();
    assert_ne!(aki.key_identifier, ski.key_identifier);

    // The AKI key id must equal the CA's own SKI.
    let ca_ski = ca_cert
        .extensions()
        .iter()
        .find(|ext| ext.oid == SubjectKeyIdentifier::OID)
        .unwrap()
        .to_extension::<SubjectKeyIdentifier>()
        .unwrap();
    assert_eq!(aki.key_identifier, ca_ski.key_identifier);

    let eku = find(ExtendedKeyUsage::OID).expect("extended key usage present");
    let eku = eku.to_extension::<ExtendedKeyUsage>().unwrap();
    assert_eq!(eku.usage, vec![ExtendedKeyUsageOption::ServerAuth]);
}

/// An expired certificate reports the expiry, not the missing trust
/// anchor, whether or not roots are supplied.
#[test]
fn expired_beats_untrusted() {
    let key = util::rsa_key();
    let cert = util::self_signed("short.lived", &key, false, 1);
    let later = OffsetDateTime::now_utc() + Duration::days(30);

    let err = verify::verify_chain(&cert, &[], None, later).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::Expired)));

    let other_ca = util::self_signed("Unrelated CA", &util::rsa_key(), true, 3650);
    let err = verify::verify_chain(&cert, &[other_ca], None, later).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::Expired)));
}

/// A certificate that chains to nothing in the root set is untrusted; a
/// root with the right name but the wrong key is a bad signature.
#[test]
fn untrusted_and_bad_signature_reasons() {
    let dir = TempDir::new().unwrap();
    let mut ca = util::test_ca(&dir.path().join("serials.txt"));

    let key = util::rsa_key();
    let request = CertificateRequest::build(&util::dn("leaf.myca.local"), &key, &[]).unwrap();
    let leaf = ca
        .issue_from_request(&request, &Validity::for_days(365).unwrap(), &[])
        .unwrap();

    let now = OffsetDateTime::now_utc();

    // No roots: a CA-signed leaf cannot self-verify.
    let err = verify::verify_chain(&leaf, &[], None, now).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::Untrusted)));

    // A root with a different name.
    let stranger = util::self_signed("Some Other CA", &util::rsa_key(), true, 3650);
    let err = verify::verify_chain(&leaf, &[stranger], None, now).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::Untrusted)));

    // Same name as the real CA, different key.
    let impostor = util::self_signed("Test Root CA", &util::rsa_key(), true, 3650);
    let err = verify::verify_chain(&leaf, &[impostor], None, now).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::BadSignature)));
}

/// A CRL naming the leaf's serial turns a good chain into `Revoked`;
/// a CRL from some other issuer is ignored.
#[test]
fn crl_revokes_by_serial() {
    let dir = TempDir::new().unwrap();
    let mut ca = util::test_ca(&dir.path().join("serials.txt"));
    let ca_cert = ca.certificate().clone();

    let key = util::rsa_key();
    let request = CertificateRequest::build(&util::dn("revoked.myca.local"), &key, &[]).unwrap();
    let leaf = ca
        .issue_from_request(&request, &Validity::for_days(365).unwrap(), &[])
        .unwrap();

    let now = OffsetDateTime::now_utc();
    let crl_for = |issuer: &Certificate| CertificateList {
        tbs_cert_list: TbsCertList {
            version: Version::V2,
            signature: SignatureAlgorithm::Sha256WithRsa.into(),
            issuer: issuer.subject().clone(),
            this_update: encode_time(now).unwrap(),
            next_update: None,
            revoked_certificates: Some(vec![RevokedCert {
                serial_number: leaf.inner.tbs_certificate.serial_number.clone(),
                revocation_date: encode_time(now).unwrap(),
                crl_entry_extensions: None,
            }]),
            crl_extensions: None,
        },
        signature_algorithm: SignatureAlgorithm::Sha256WithRsa.into(),
        signature: BitString::from_bytes(&[]).unwrap(),
    };

    let crl = crl_for(&ca_cert);
    let err = verify::verify_chain(&leaf, &[ca_cert.clone()], Some(&crl), now).unwrap_err();
    assert!(matches!(err, Error::Chain(ChainFailure::Revoked)));

    let unrelated = util::self_signed("Some Other CA", &util::rsa_key(), true, 3650);
    let foreign_crl = crl_for(&unrelated);
    verify::verify_chain(&leaf, &[ca_cert], Some(&foreign_crl), now).unwrap();
}

/// Re-requesting a certificate needs the matching private key; any
/// other key is rejected before a request is produced.
#[test]
fn csr_from_certificate_requires_matching_key() {
    let key = util::rsa_key();
    let cert = util::self_signed("renew.me", &key, false, 30);

    let request = CertificateRequest::from_certificate(&cert, &key).unwrap();
    assert_eq!(
        name_to_string(request.subject()),
        name_to_string(cert.subject())
    );
    assert_eq!(
        request.modulus_hex().unwrap(),
        cert.modulus_hex().unwrap()
    );

    let wrong_key = util::rsa_key();
    let err = CertificateRequest::from_certificate(&cert, &wrong_key).unwrap_err();
    assert!(matches!(err, Error::SignatureVerification(_)));
}

/// Wrong document kinds and truncated DER produce the two distinct
/// decode-side errors.
#[test]
fn wrong_kind_and_truncated_input() {
    let key = util::rsa_key();
    let cert = util::self_signed("kind.check", &key, false, 30);
    let cert_pem = cert.to_pem().unwrap();

    let err = KeyPair::load(cert_pem.as_bytes(), None).unwrap_err();
    assert!(matches!(err, Error::WrongKind { .. }));

    let err = Certificate::load(key.to_pkcs8_pem().unwrap().as_bytes()).unwrap_err();
    assert!(matches!(err, Error::WrongKind { .. }));

    let mut truncated = cert.to_der().unwrap();
    truncated.truncate(truncated.len() / 2);
    let err = Certificate::load(&truncated).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

/// The CA constructor refuses a key that does not belong to the CA
/// certificate.
#[test]
fn ca_rejects_foreign_key() {
    let dir = TempDir::new().unwrap();
    let ca_key = util::rsa_key();
    let ca_cert = util::self_signed("Mismatch CA", &ca_key, true, 3650);

    let err = certops::issuer::CaIssuer::new(
        ca_cert,
        util::rsa_key(),
        certops::serial::SerialRegistry::new(dir.path().join("serials.txt")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

/// Subjects that only the raw name model can hold survive issuance:
/// a request whose DN came from config-style fields with separator
/// characters round-trips through issue and back.
#[test]
fn dn_values_survive_issuance() {
    let dir = TempDir::new().unwrap();
    let mut ca = util::test_ca(&dir.path().join("serials.txt"));

    let key = util::rsa_key();
    let subject = DistinguishedName::builder()
        .common_name("users, внутренний".to_string())
        .organization("Acme + Sons".to_string())
        .build();
    let request = CertificateRequest::build(&subject, &key, &[]).unwrap();
    let cert = ca
        .issue_from_request(&request, &Validity::for_days(30).unwrap(), &[])
        .unwrap();

    let back = DistinguishedName::from_rdn_sequence(cert.subject());
    assert_eq!(back.common_name.as_deref(), Some("users, внутренний"));
    assert_eq!(back.organization.as_deref(), Some("Acme + Sons"));
}
