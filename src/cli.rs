//! The `certops` command surface.
//!
//! One subcommand per operation, typed end to end: an unknown command or a
//! malformed flag never reaches the library, it dies in the parser.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cert::extensions::SubjectAltName;
use crate::cert::params::{
    DistinguishedName, ExtensionParam, IssuanceInfo, Validity, name_to_string,
};
use crate::cert::{self, Certificate};
use crate::config::CsrConfig;
use crate::csr::CertificateRequest;
use crate::digest::{self, HashAlgorithm};
use crate::error::{Error, Result};
use crate::fs as cfs;
use crate::issuer::CaIssuer;
use crate::key::{EncryptionCipher, KeyPair};
use crate::serial::SerialRegistry;
use crate::verify;

#[derive(Parser)]
#[command(name = "certops")]
#[command(about = "Inspect, convert and issue RSA keys, requests and certificates", long_about = None)]
pub enum Command {
    /// Decode a private key and run the RSA consistency checks.
    CheckRsaKey(KeyArguments),

    /// Print the modulus bit length of a private key.
    CheckRsaKeyLength(KeyArguments),

    /// Show subject, key size and self-signature status of a request.
    CheckCsr(RequestArguments),

    /// Show serial, names, validity, key size and signature algorithm.
    CheckCertificate(CertificateArguments),

    /// Print the bit length of the certified public key.
    CheckCertificateKeyLength(CertificateArguments),

    /// Print a digest fingerprint of the certificate's DER encoding.
    FingerprintCertificate(FingerprintArguments),

    /// Show the validity window and where a point in time falls in it.
    CheckValidityDateCertificate(ValidityDateArguments),

    /// Print the issuer name.
    CheckIssuerCertificate(CertificateArguments),

    /// Print the subject name.
    CheckSubjectCertificate(CertificateArguments),

    /// Print the modulus of a certificate's public key.
    ModulusCertificate(CertificateArguments),

    /// Print the modulus of a private key.
    ModulusRsaKey(KeyArguments),

    /// Print the modulus of a certification request's public key.
    ModulusRequest(RequestArguments),

    /// Print the public key as SPKI PEM (`PUBLIC KEY`).
    PrintRsaPublicPart(KeyArguments),

    /// Print the public key as PKCS#1 PEM (`RSA PUBLIC KEY`).
    PrintRsaPublicPartRsaFormat(KeyArguments),

    /// Wrap a private key under a passphrase.
    EncryptRsaKey(EncryptKeyArguments),

    /// Remove the passphrase from an encrypted private key.
    DecryptRsaKey(DecryptKeyArguments),

    /// Re-encode a private key into another container format.
    ConvertRsaKey(ConvertKeyArguments),

    /// Generate a fresh RSA key pair.
    GenerateRsaKey(GenerateKeyArguments),

    /// Build a certification request from subject flags.
    GenerateCsr(GenerateCsrArguments),

    /// Build a certification request from a config file.
    GenerateCsrFromConfigFile(CsrFromConfigArguments),

    /// Re-request the subject and key of an existing certificate.
    GenerateCsrFromCrt(CsrFromCertArguments),

    /// Issue a self-signed certificate.
    GenerateSelfSignedCertificate(SelfSignedArguments),

    /// Issue a certificate from a request, signed by a CA.
    GenerateSignedCertificate(SignedCertArguments),

    /// Join a leaf and an intermediate CA certificate into one bundle.
    ConcatCertifToIntermediateCaCertificate(ConcatArguments),

    /// Verify a certificate against trust anchors and optionally a CRL.
    VerifyCertificate(VerifyArguments),

    /// Check whether a certificate and a private key belong together.
    MatchCertificateAndPrivateKey(MatchArguments),
}

#[derive(Parser, Clone)]
pub struct KeyArguments {
    /// Path to the private key, PEM or DER.
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,
}

#[derive(Parser, Clone)]
pub struct CertificateArguments {
    /// Path to the certificate, PEM or DER.
    certificate: PathBuf,
}

#[derive(Parser, Clone)]
pub struct RequestArguments {
    /// Path to the certification request, PEM or DER.
    request: PathBuf,
}

#[derive(Parser, Clone)]
pub struct FingerprintArguments {
    /// Path to the certificate, PEM or DER.
    certificate: PathBuf,

    /// Digest to fingerprint with: md5, sha1, sha256, sha384 or sha512.
    #[clap(long, default_value = "sha256")]
    hash: String,
}

#[derive(Parser, Clone)]
pub struct ValidityDateArguments {
    /// Path to the certificate, PEM or DER.
    certificate: PathBuf,

    /// RFC 3339 timestamp to evaluate at instead of the current time.
    #[clap(long)]
    as_of: Option<String>,
}

#[derive(Parser, Clone)]
pub struct EncryptKeyArguments {
    /// Path to the plaintext private key.
    key: PathBuf,

    /// Passphrase to wrap the key under.
    #[clap(long)]
    passphrase: String,

    /// Cipher to wrap with: aes128 or aes256.
    #[clap(long, default_value = "aes256")]
    cipher: String,

    /// Where to write the encrypted key.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct DecryptKeyArguments {
    /// Path to the encrypted private key.
    key: PathBuf,

    /// Passphrase the key is currently wrapped under.
    #[clap(long)]
    passphrase: String,

    /// Where to write the plaintext key.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct ConvertKeyArguments {
    /// Path to the private key, PEM or DER.
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,

    /// Target encoding: pem-pkcs1, pem-pkcs8, der-pkcs1 or der-pkcs8.
    #[clap(long)]
    format: String,

    /// Where to write the converted key.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct GenerateKeyArguments {
    /// Modulus size in bits.
    #[clap(long)]
    bits: usize,

    /// Encrypt the generated key under this passphrase.
    #[clap(long)]
    passphrase: Option<String>,

    /// Cipher for --passphrase: aes128 or aes256.
    #[clap(long)]
    cipher: Option<String>,

    /// Where to write the key.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct SubjectArguments {
    /// Subject common name (CN).
    #[clap(long)]
    common_name: Option<String>,

    /// Subject country (C).
    #[clap(long)]
    country: Option<String>,

    /// Subject state or province (ST).
    #[clap(long)]
    state: Option<String>,

    /// Subject locality (L).
    #[clap(long)]
    locality: Option<String>,

    /// Subject organization (O).
    #[clap(long)]
    organization: Option<String>,

    /// Subject organizational unit (OU).
    #[clap(long)]
    organization_unit: Option<String>,
}

impl SubjectArguments {
    fn to_distinguished_name(&self) -> DistinguishedName {
        DistinguishedName {
            common_name: self.common_name.clone(),
            country: self.country.clone(),
            state: self.state.clone(),
            locality: self.locality.clone(),
            organization: self.organization.clone(),
            organization_unit: self.organization_unit.clone(),
        }
    }
}

#[derive(Parser, Clone)]
pub struct GenerateCsrArguments {
    /// Private key the request is for.
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,

    #[clap(flatten)]
    subject: SubjectArguments,

    /// DNS subject alternative name; repeatable.
    #[clap(long = "alt-name")]
    alt_names: Vec<String>,

    /// Where to write the request.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct CsrFromConfigArguments {
    /// Private key the request is for.
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,

    /// Path to the [subject]/[alt_names] config file.
    #[clap(long)]
    config: PathBuf,

    /// Where to write the request.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct CsrFromCertArguments {
    /// Certificate to re-request.
    certificate: PathBuf,

    /// Private key matching the certificate.
    #[clap(long)]
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,

    /// Where to write the request.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct SelfSignedArguments {
    /// Private key to certify and sign with.
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,

    #[clap(flatten)]
    subject: SubjectArguments,

    /// DNS subject alternative name; repeatable.
    #[clap(long = "alt-name")]
    alt_names: Vec<String>,

    /// Validity in days.
    #[clap(long)]
    days: i64,

    /// Mark the certificate as a CA.
    #[clap(long)]
    ca: bool,

    /// Where to write the certificate.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct SignedCertArguments {
    /// Certification request to honor.
    request: PathBuf,

    /// The CA certificate.
    #[clap(long)]
    ca_cert: PathBuf,

    /// The CA private key.
    #[clap(long)]
    ca_key: PathBuf,

    /// Passphrase for an encrypted CA key.
    #[clap(long)]
    passphrase: Option<String>,

    /// Validity in days.
    #[clap(long)]
    days: i64,

    /// Serial registry file; created on first use.
    #[clap(long)]
    serial_file: PathBuf,

    /// Where to write the certificate.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct ConcatArguments {
    /// Leaf certificate PEM.
    certificate: PathBuf,

    /// Intermediate CA certificate PEM.
    #[clap(long)]
    intermediate: PathBuf,

    /// Where to write the bundle.
    #[clap(long)]
    out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct VerifyArguments {
    /// Certificate to verify, PEM or DER.
    certificate: PathBuf,

    /// Trust anchors: a PEM bundle or a single DER certificate.
    #[clap(long)]
    ca_file: Option<PathBuf>,

    /// Certificate revocation list to honor.
    #[clap(long)]
    crl: Option<PathBuf>,

    /// RFC 3339 timestamp to verify at instead of the current time.
    #[clap(long)]
    as_of: Option<String>,
}

#[derive(Parser, Clone)]
pub struct MatchArguments {
    /// Path to the certificate, PEM or DER.
    certificate: PathBuf,

    /// Private key to compare against.
    #[clap(long)]
    key: PathBuf,

    /// Passphrase for an encrypted private key.
    #[clap(long)]
    passphrase: Option<String>,
}

enum KeyFormat {
    PemPkcs1,
    PemPkcs8,
    DerPkcs1,
    DerPkcs8,
}

impl FromStr for KeyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pem-pkcs1" => Ok(KeyFormat::PemPkcs1),
            "pem-pkcs8" => Ok(KeyFormat::PemPkcs8),
            "der-pkcs1" => Ok(KeyFormat::DerPkcs1),
            "der-pkcs8" => Ok(KeyFormat::DerPkcs8),
            other => Err(Error::InvalidParameter(format!(
                "unknown key format \"{other}\", expected pem-pkcs1, pem-pkcs8, der-pkcs1 or der-pkcs8"
            ))),
        }
    }
}

/// Runs one subcommand and returns the process exit code.
pub fn execute(cmd: Command) -> Result<i32> {
    match cmd {
        Command::CheckRsaKey(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            pair.validate()?;
            println!("RSA key ok");
            println!("Key size: {} bits", pair.modulus_bits());
            println!("Public exponent: {}", pair.public_exponent());
            Ok(exitcode::OK)
        }

        Command::CheckRsaKeyLength(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            println!("{}", pair.modulus_bits());
            Ok(exitcode::OK)
        }

        Command::CheckCsr(arg) => {
            let request = load_request(&arg.request)?;
            println!("subject={}", name_to_string(request.subject()));
            println!("Key size: {} bits", request.key_bits()?);
            verify::verify_csr_signature(&request)?;
            println!("verify OK");
            Ok(exitcode::OK)
        }

        Command::CheckCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            println!("serial={}", cert.serial_hex());
            println!("subject={}", name_to_string(cert.subject()));
            println!("issuer={}", name_to_string(cert.issuer()));
            println!("notBefore={}", format_time(cert.not_before())?);
            println!("notAfter={}", format_time(cert.not_after())?);
            println!("Key size: {} bits", cert.key_bits()?);
            println!("Signature algorithm: {}", cert.signature_algorithm_name());
            Ok(exitcode::OK)
        }

        Command::CheckCertificateKeyLength(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            println!("{}", cert.key_bits()?);
            Ok(exitcode::OK)
        }

        Command::FingerprintCertificate(arg) => {
            let algorithm = HashAlgorithm::from_str(&arg.hash)?;
            let cert = load_certificate(&arg.certificate)?;
            println!("{} Fingerprint={}", algorithm.name(), cert.fingerprint(algorithm)?);
            Ok(exitcode::OK)
        }

        Command::CheckValidityDateCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            let as_of = parse_as_of(arg.as_of.as_deref())?;
            let status = verify::check_validity(&cert, as_of);
            println!("notBefore={}", format_time(status.not_before)?);
            println!("notAfter={}", format_time(status.not_after)?);
            if status.expired {
                println!("status: expired");
            } else if status.not_yet_valid {
                println!("status: not yet valid");
            } else {
                println!("status: valid");
            }
            Ok(exitcode::OK)
        }

        Command::CheckIssuerCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            println!("issuer={}", name_to_string(cert.issuer()));
            Ok(exitcode::OK)
        }

        Command::CheckSubjectCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            println!("subject={}", name_to_string(cert.subject()));
            Ok(exitcode::OK)
        }

        Command::ModulusCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            print!("{}", digest::modulus_line(&cert.modulus_hex()?));
            Ok(exitcode::OK)
        }

        Command::ModulusRsaKey(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            print!("{}", digest::modulus_line(&pair.modulus_hex()));
            Ok(exitcode::OK)
        }

        Command::ModulusRequest(arg) => {
            let request = load_request(&arg.request)?;
            print!("{}", digest::modulus_line(&request.modulus_hex()?));
            Ok(exitcode::OK)
        }

        Command::PrintRsaPublicPart(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            print!("{}", pair.public_key().to_public_key_pem()?);
            Ok(exitcode::OK)
        }

        Command::PrintRsaPublicPartRsaFormat(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            print!("{}", pair.public_key().to_pkcs1_pem()?);
            Ok(exitcode::OK)
        }

        Command::EncryptRsaKey(arg) => {
            let cipher = EncryptionCipher::from_str(&arg.cipher)?;
            let pair = load_key(&arg.key, None)?;
            let pem = pair.to_encrypted_pkcs8_pem(&arg.passphrase, cipher)?;
            cfs::write_atomic_private(&arg.out, pem.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::DecryptRsaKey(arg) => {
            let pair = load_key(&arg.key, Some(arg.passphrase.as_str()))?;
            cfs::write_atomic_private(&arg.out, pair.to_pkcs8_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::ConvertRsaKey(arg) => {
            let format = KeyFormat::from_str(&arg.format)?;
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let bytes = match format {
                KeyFormat::PemPkcs1 => pair.to_pkcs1_pem()?.into_bytes(),
                KeyFormat::PemPkcs8 => pair.to_pkcs8_pem()?.into_bytes(),
                KeyFormat::DerPkcs1 => pair.to_pkcs1_der()?,
                KeyFormat::DerPkcs8 => pair.to_pkcs8_der()?,
            };
            cfs::write_atomic_private(&arg.out, &bytes)?;
            Ok(exitcode::OK)
        }

        Command::GenerateRsaKey(arg) => {
            if arg.cipher.is_some() && arg.passphrase.is_none() {
                return Err(Error::InvalidParameter(
                    "--cipher requires --passphrase".into(),
                ));
            }
            let pair = KeyPair::generate(arg.bits)?;
            let bytes = match &arg.passphrase {
                Some(pass) => {
                    let cipher = match &arg.cipher {
                        Some(name) => EncryptionCipher::from_str(name)?,
                        None => EncryptionCipher::default(),
                    };
                    pair.to_encrypted_pkcs8_pem(pass, cipher)?.into_bytes()
                }
                None => pair.to_pkcs1_pem()?.into_bytes(),
            };
            cfs::write_atomic_private(&arg.out, &bytes)?;
            Ok(exitcode::OK)
        }

        Command::GenerateCsr(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let subject = arg.subject.to_distinguished_name();
            let request = CertificateRequest::build(&subject, &pair, &arg.alt_names)?;
            cfs::write_atomic(&arg.out, request.to_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::GenerateCsrFromConfigFile(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let config = CsrConfig::load(&arg.config)?;
            let request = CertificateRequest::build(&config.subject, &pair, &config.alt_names)?;
            cfs::write_atomic(&arg.out, request.to_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::GenerateCsrFromCrt(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let request = CertificateRequest::from_certificate(&cert, &pair)?;
            cfs::write_atomic(&arg.out, request.to_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::GenerateSelfSignedCertificate(arg) => {
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let subject = arg.subject.to_distinguished_name().to_rdn_sequence()?;
            let mut extensions = Vec::new();
            if !arg.alt_names.is_empty() {
                let san = SubjectAltName {
                    names: arg.alt_names.clone(),
                };
                extensions.push(ExtensionParam::from_extension(&san, false)?);
            }
            let info = IssuanceInfo::builder()
                .subject(subject)
                .subject_public_key_info(pair.public_key().to_spki()?)
                .is_ca(arg.ca)
                .extensions(extensions)
                .build();
            let cert = Certificate::self_signed(&info, &pair, &Validity::for_days(arg.days)?)?;
            cfs::write_atomic(&arg.out, cert.to_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::GenerateSignedCertificate(arg) => {
            let ca_cert = load_certificate(&arg.ca_cert)?;
            let ca_key = load_key(&arg.ca_key, arg.passphrase.as_deref())?;
            let registry = SerialRegistry::new(&arg.serial_file);
            let mut issuer = CaIssuer::new(ca_cert, ca_key, registry)?;
            let request = load_request(&arg.request)?;
            let cert = issuer.issue_from_request(&request, &Validity::for_days(arg.days)?, &[])?;
            cfs::write_atomic(&arg.out, cert.to_pem()?.as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::ConcatCertifToIntermediateCaCertificate(arg) => {
            let leaf = cfs::read_to_string(&arg.certificate)?;
            let intermediate = cfs::read_to_string(&arg.intermediate)?;
            cfs::write_atomic(&arg.out, cert::concat_chain(&leaf, &intermediate).as_bytes())?;
            Ok(exitcode::OK)
        }

        Command::VerifyCertificate(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            let roots = match &arg.ca_file {
                Some(path) => Certificate::load_bundle(&cfs::read(path)?)?,
                None => Vec::new(),
            };
            let crl = match &arg.crl {
                Some(path) => Some(verify::load_crl(&cfs::read(path)?)?),
                None => None,
            };
            let as_of = parse_as_of(arg.as_of.as_deref())?;
            verify::verify_chain(&cert, &roots, crl.as_ref(), as_of)?;
            println!("{}: OK", arg.certificate.display());
            Ok(exitcode::OK)
        }

        Command::MatchCertificateAndPrivateKey(arg) => {
            let cert = load_certificate(&arg.certificate)?;
            let pair = load_key(&arg.key, arg.passphrase.as_deref())?;
            let outcome = verify::match_key_and_certificate(&cert, &pair);
            match &outcome.certificate_digest {
                Some(digest) => println!("Certificate modulus digest: {digest}"),
                None => println!("Certificate modulus digest: unavailable (not an RSA key)"),
            }
            println!("Private key modulus digest: {}", outcome.key_digest);
            if outcome.matches {
                println!("Match: yes");
                Ok(exitcode::OK)
            } else {
                println!("Match: no");
                Ok(1)
            }
        }
    }
}

fn load_key(path: &Path, passphrase: Option<&str>) -> Result<KeyPair> {
    KeyPair::load(&cfs::read(path)?, passphrase)
}

fn load_certificate(path: &Path) -> Result<Certificate> {
    Certificate::load(&cfs::read(path)?)
}

fn load_request(path: &Path) -> Result<CertificateRequest> {
    CertificateRequest::load(&cfs::read(path)?)
}

fn parse_as_of(value: Option<&str>) -> Result<OffsetDateTime> {
    match value {
        Some(text) => OffsetDateTime::parse(text, &Rfc3339)
            .map_err(|e| Error::InvalidParameter(format!("bad --as-of timestamp: {e}"))),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn format_time(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc3339).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format_names_parse() {
        assert!(matches!("pem-pkcs1".parse(), Ok(KeyFormat::PemPkcs1)));
        assert!(matches!("DER-PKCS8".parse(), Ok(KeyFormat::DerPkcs8)));
        assert!(matches!(
            "pkcs12".parse::<KeyFormat>(),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn subject_flags_become_a_name() {
        let args = SubjectArguments {
            common_name: Some("example.com".into()),
            country: Some("FR".into()),
            state: None,
            locality: None,
            organization: None,
            organization_unit: None,
        };
        let dn = args.to_distinguished_name();
        assert_eq!(dn.common_name.as_deref(), Some("example.com"));
        assert_eq!(dn.country.as_deref(), Some("FR"));
        assert!(dn.state.is_none());
    }

    #[test]
    fn as_of_parses_rfc3339_only() {
        assert!(parse_as_of(Some("2031-01-01T00:00:00Z")).is_ok());
        assert!(parse_as_of(None).is_ok());
        assert!(matches!(
            parse_as_of(Some("next tuesday")),
            Err(Error::InvalidParameter(_))
        ));
    }
}
