//! File-backed serial number registry for CA issuance.
//!
//! The registry is a plain text file. Line 1 holds the next serial to
//! issue, in uppercase hex. Every line after it records one issued
//! certificate: serial, RFC 3339 timestamp and subject, tab-separated.
//! A lock file next to the registry serializes allocations across
//! threads and processes.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};
use crate::fs as cfs;

/// Allocates monotonically increasing serial numbers backed by a file.
#[derive(Debug, Clone)]
pub struct SerialRegistry {
    path: PathBuf,
}

struct RegistryState {
    next: u64,
    history: Vec<String>,
}

impl SerialRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Reserves the next serial and appends `subject` to the history.
    ///
    /// Runs the read-increment-write cycle under the lock file; two
    /// concurrent callers against the same registry can never receive the
    /// same serial. A missing registry starts counting at 1.
    pub fn allocate(&self, subject: &str) -> Result<u64> {
        let _lock = LockFile::acquire(&self.lock_path())?;

        let state = self.read_state()?;
        let serial = state.next;
        let next = serial.checked_add(1).ok_or_else(|| {
            Error::SerialExhaustion(format!(
                "serial counter in {} cannot go past {serial:X}",
                self.path.display()
            ))
        })?;

        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| Error::InvalidParameter(format!("cannot format timestamp: {e}")))?;
        let mut contents = format!("{next:X}\n");
        for line in &state.history {
            contents.push_str(line);
            contents.push('\n');
        }
        contents.push_str(&format!("{serial:X}\t{timestamp}\t{subject}\n"));

        cfs::write_atomic(&self.path, contents.as_bytes()).map_err(|e| match e {
            Error::Io { path, source } => Error::RegistryIo { path, source },
            other => other,
        })?;
        Ok(serial)
    }

    /// The serial the next allocation will return. Reads without locking;
    /// meant for inspection, not for reservation.
    pub fn peek(&self) -> Result<u64> {
        Ok(self.read_state()?.next)
    }

    fn read_state(&self) -> Result<RegistryState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(RegistryState {
                    next: 1,
                    history: Vec::new(),
                });
            }
            Err(e) => {
                return Err(Error::RegistryIo {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let mut lines = text.lines();
        let first = lines.next().unwrap_or("").trim();
        if first.is_empty() {
            return Ok(RegistryState {
                next: 1,
                history: Vec::new(),
            });
        }
        let next = u64::from_str_radix(first, 16).map_err(|_| {
            Error::SerialExhaustion(format!(
                "corrupt serial counter {first:?} in {}",
                self.path.display()
            ))
        })?;
        let history = lines
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(RegistryState { next, history })
    }
}

/// Exclusive lock held through a create-new file. Released on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    const ATTEMPTS: u32 = 50;
    const RETRY_DELAY: Duration = Duration::from_millis(100);

    fn acquire(path: &Path) -> Result<Self> {
        for _ in 0..Self::ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    thread::sleep(Self::RETRY_DELAY);
                }
                Err(e) => {
                    return Err(Error::RegistryIo {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        }
        Err(Error::RegistryIo {
            path: path.to_path_buf(),
            source: io::Error::new(
                ErrorKind::TimedOut,
                "lock file still held after 5s of retries",
            ),
        })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Big-endian bytes of a serial with leading zero octets trimmed,
/// suitable for a DER INTEGER.
pub fn serial_to_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn fresh_registry_counts_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SerialRegistry::new(dir.path().join("ca.srl"));
        assert_eq!(registry.allocate("CN = first").unwrap(), 1);
        assert_eq!(registry.allocate("CN = second").unwrap(), 2);
        assert_eq!(registry.peek().unwrap(), 3);

        let text = fs::read_to_string(registry.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("3"));
        let history: Vec<_> = lines.collect();
        assert_eq!(history.len(), 2);
        assert!(history[0].starts_with("1\t"));
        assert!(history[0].ends_with("\tCN = first"));
        assert!(history[1].starts_with("2\t"));
    }

    #[test]
    fn counter_is_stored_in_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.srl");
        fs::write(&path, "FF\n").unwrap();
        let registry = SerialRegistry::new(&path);
        assert_eq!(registry.allocate("CN = x").unwrap(), 0xFF);
        assert!(fs::read_to_string(&path).unwrap().starts_with("100\n"));
    }

    #[test]
    fn corrupt_counter_is_reported_as_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.srl");
        fs::write(&path, "not-hex\n").unwrap();
        let registry = SerialRegistry::new(&path);
        assert!(matches!(
            registry.allocate("CN = x"),
            Err(Error::SerialExhaustion(_))
        ));
    }

    #[test]
    fn counter_overflow_is_exhaustion_not_wraparound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.srl");
        fs::write(&path, format!("{:X}\n", u64::MAX)).unwrap();
        let registry = SerialRegistry::new(&path);
        assert!(matches!(
            registry.allocate("CN = x"),
            Err(Error::SerialExhaustion(_))
        ));
    }

    #[test]
    fn unwritable_registry_is_a_registry_io_error() {
        let registry = SerialRegistry::new("/nonexistent/dir/ca.srl");
        assert!(matches!(
            registry.allocate("CN = x"),
            Err(Error::RegistryIo { .. })
        ));
    }

    #[test]
    fn lock_file_is_removed_after_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SerialRegistry::new(dir.path().join("ca.srl"));
        registry.allocate("CN = x").unwrap();
        assert!(!registry.lock_path().exists());
    }

    #[test]
    fn held_lock_blocks_allocation_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SerialRegistry::new(dir.path().join("ca.srl"));
        let lock = LockFile::acquire(&registry.lock_path()).unwrap();

        let contender = {
            let registry = registry.clone();
            thread::spawn(move || registry.allocate("CN = waiting"))
        };
        thread::sleep(Duration::from_millis(300));
        drop(lock);
        assert_eq!(contender.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn concurrent_allocations_never_share_a_serial() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SerialRegistry::new(dir.path().join("ca.srl")));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..5)
                        .map(|i| registry.allocate(&format!("CN = t{t}-{i}")).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for serial in handle.join().unwrap() {
                assert!(seen.insert(serial), "serial {serial} issued twice");
            }
        }
        assert_eq!(seen.len(), 40);
        assert_eq!(registry.peek().unwrap(), 41);
    }

    #[test]
    fn serial_bytes_are_trimmed_big_endian() {
        assert_eq!(serial_to_bytes(1), vec![1]);
        assert_eq!(serial_to_bytes(0x1234), vec![0x12, 0x34]);
        assert_eq!(serial_to_bytes(0), vec![0]);
        assert_eq!(
            serial_to_bytes(u64::MAX),
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }
}
