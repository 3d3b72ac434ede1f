//! # certops - RSA PKI operations in pure Rust
//!
//! certops inspects, converts, issues and verifies RSA private keys, PKCS#10
//! certification requests and X.509 certificates. It is built entirely on the
//! rustcrypto crates; the `certops` binary exposes the same operations as
//! typed subcommands, with no openssl anywhere in the path.
//!
//! ## Supported documents
//!
//! - **Private keys**: PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`),
//!   plus PBES2-encrypted PKCS#8 (`ENCRYPTED PRIVATE KEY`)
//! - **Public keys**: SPKI (`PUBLIC KEY`) and PKCS#1 (`RSA PUBLIC KEY`)
//! - **Requests**: PKCS#10, including the legacy `NEW CERTIFICATE REQUEST`
//!   armor label
//! - **Certificates and CRLs**: X.509 v3, PEM or DER
//!
//! ## Quick Start
//!
//! ### Generating a self-signed certificate
//!
//! ```rust,no_run
//! use certops::cert::Certificate;
//! use certops::cert::params::{DistinguishedName, IssuanceInfo, Validity};
//! use certops::key::KeyPair;
//!
//! # fn main() -> Result<(), certops::error::Error> {
//! let key_pair = KeyPair::generate(2048)?;
//!
//! let subject = DistinguishedName::builder()
//!     .common_name("example.com".to_string())
//!     .organization("Example Corp".to_string())
//!     .country("US".to_string())
//!     .build();
//!
//! let info = IssuanceInfo::builder()
//!     .subject(subject.to_rdn_sequence()?)
//!     .subject_public_key_info(key_pair.public_key().to_spki()?)
//!     .build();
//!
//! let certificate = Certificate::self_signed(&info, &key_pair, &Validity::for_days(365)?)?;
//! println!("{}", certificate.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Running a small CA
//!
//! ```rust,no_run
//! use certops::cert::Certificate;
//! use certops::cert::params::{DistinguishedName, IssuanceInfo, Validity};
//! use certops::csr::CertificateRequest;
//! use certops::issuer::CaIssuer;
//! use certops::key::KeyPair;
//! use certops::serial::SerialRegistry;
//!
//! # fn main() -> Result<(), certops::error::Error> {
//! // The CA: a self-signed certificate marked as a CA.
//! let ca_key = KeyPair::generate(2048)?;
//! let ca_name = DistinguishedName::builder()
//!     .common_name("Example Root CA".to_string())
//!     .build();
//! let ca_info = IssuanceInfo::builder()
//!     .subject(ca_name.to_rdn_sequence()?)
//!     .subject_public_key_info(ca_key.public_key().to_spki()?)
//!     .is_ca(true)
//!     .build();
//! let ca_cert = Certificate::self_signed(&ca_info, &ca_key, &Validity::for_days(3650)?)?;
//!
//! // A server asks for a certificate.
//! let server_key = KeyPair::generate(2048)?;
//! let server_name = DistinguishedName::builder()
//!     .common_name("server.example.com".to_string())
//!     .build();
//! let request =
//!     CertificateRequest::build(&server_name, &server_key, &["server.example.com".to_string()])?;
//!
//! // The CA verifies the request and issues, drawing serials from a
//! // locked on-disk registry.
//! let registry = SerialRegistry::new("ca-serials.txt");
//! let mut ca = CaIssuer::new(ca_cert, ca_key, registry)?;
//! let server_cert = ca.issue_from_request(&request, &Validity::for_days(365)?, &[])?;
//! println!("{}", server_cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Failures carry their cause; a document of the wrong kind is reported
//! differently from one that does not parse at all:
//!
//! ```rust
//! use certops::{error::Error, key::KeyPair};
//!
//! match KeyPair::load(b"not a key document", None) {
//!     Ok(_) => println!("key imported"),
//!     Err(Error::Decode(msg)) => println!("failed to decode key: {}", msg),
//!     Err(Error::WrongKind { expected, found }) => {
//!         println!("expected {}, found {}", expected, found)
//!     }
//!     Err(e) => println!("other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key generation, import/export and passphrase wrapping
//! - [`cert`]: certificate parsing, inspection and self-signed issuance
//! - [`csr`]: PKCS#10 certification requests
//! - [`issuer`]: CA operations and the issuance engine
//! - [`verify`]: signature, validity window and chain verification
//! - [`serial`]: the on-disk serial number registry
//! - [`encoding`]: PEM/DER ingestion and emission
//! - [`digest`]: fingerprints and modulus digests
//! - [`config`]: the request config-file format
//! - [`cli`]: the `certops` command surface
//! - [`error`]: error types shared across the crate

pub mod cert;
pub mod cli;
pub mod config;
pub mod csr;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod fs;
pub mod issuer;
pub mod key;
pub mod oid;
pub mod serial;
pub mod tbs_certificate;
pub mod verify;
