//! Config-file input for certification requests.
//!
//! The file is a small two-section format:
//!
//! ```text
//! [subject]
//! common_name = example.com
//! organization = Example Corp
//!
//! [alt_names]
//! dns.1 = example.com
//! dns.2 = www.example.com
//! ```
//!
//! Parsing is strict: unknown sections, unknown keys and malformed lines
//! are errors rather than silently ignored.

use std::path::Path;

use crate::cert::params::DistinguishedName;
use crate::error::{Error, Result};
use crate::fs as cfs;

/// Subject and alternative names read from a request config file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CsrConfig {
    pub subject: DistinguishedName,
    /// DNS names in file order.
    pub alt_names: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Subject,
    AltNames,
}

impl CsrConfig {
    /// Reads and parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&cfs::read_to_string(path)?)
    }

    /// Parses config-file text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut section = Section::None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[') {
                let Some(name) = name.strip_suffix(']') else {
                    return Err(Error::InvalidParameter(format!(
                        "line {line_no}: unterminated section header"
                    )));
                };
                section = match name.trim() {
                    "subject" => Section::Subject,
                    "alt_names" => Section::AltNames,
                    other => {
                        return Err(Error::InvalidParameter(format!(
                            "line {line_no}: unknown section \"{other}\""
                        )));
                    }
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::InvalidParameter(format!(
                    "line {line_no}: expected key = value"
                )));
            };
            let key = key.trim();
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "line {line_no}: empty value for \"{key}\""
                )));
            }

            match section {
                Section::None => {
                    return Err(Error::InvalidParameter(format!(
                        "line {line_no}: \"{key}\" appears before any section"
                    )));
                }
                Section::Subject => {
                    config.set_subject_field(key, value, line_no)?;
                }
                Section::AltNames => {
                    // Keys follow the openssl convention: dns.1, dns.2, ...
                    if key != "dns" && !key.starts_with("dns.") {
                        return Err(Error::InvalidParameter(format!(
                            "line {line_no}: unknown alt_names key \"{key}\""
                        )));
                    }
                    config.alt_names.push(value.to_string());
                }
            }
        }

        Ok(config)
    }

    fn set_subject_field(&mut self, key: &str, value: &str, line_no: usize) -> Result<()> {
        let field = match key {
            "common_name" => &mut self.subject.common_name,
            "country" => &mut self.subject.country,
            "state" => &mut self.subject.state,
            "locality" => &mut self.subject.locality,
            "organization" => &mut self.subject.organization,
            "organization_unit" => &mut self.subject.organization_unit,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "line {line_no}: unknown subject key \"{other}\""
                )));
            }
        };
        if field.is_some() {
            return Err(Error::InvalidParameter(format!(
                "line {line_no}: duplicate subject key \"{key}\""
            )));
        }
        *field = Some(value.to_string());
        Ok(())
    }
}
