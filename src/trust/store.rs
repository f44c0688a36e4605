//! Persistent known_hosts table for trust-on-first-use.
//!
//! The table maps each [`ServerIdentity`] to the fingerprint of the certificate it
//! presented the first time it was trusted. It is stored as a small JSON document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "hosts": [
//!     { "host": "db.example.com", "port": 7687, "fingerprint": "sha256:..." }
//!   ]
//! }
//! ```
//!
//! Every mutation re-reads the whole table while holding an in-process mutex and an
//! exclusive advisory lock on `<table>.lock`, writes the new table to a temporary
//! file in the same directory, fsyncs it, and renames it over the old one. Readers
//! therefore see either the old or the new table, never a torn one, and drivers in
//! different processes sharing a table cannot lose each other's pins.
//!
//! Nothing is cached. Deleting the file (or a single entry) un-pins the server on the
//! very next connection attempt.

use super::identity::{CertificateFingerprint, ServerIdentity};
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const FORMAT_VERSION: u32 = 1;

/// One pinned server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRecord {
    /// Pinned server
    pub identity: ServerIdentity,
    /// Fingerprint learned on first use
    pub fingerprint: CertificateFingerprint,
}

/// Result of [`CertificateStore::pin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    /// No record existed; the fingerprint is now stored
    Pinned,
    /// A record existed with the same fingerprint
    Matched,
    /// A record existed with a different fingerprint; the table is unchanged
    Mismatch {
        /// Fingerprint currently on record
        pinned: CertificateFingerprint,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct KnownHostsFile {
    version: u32,
    #[serde(default)]
    hosts: Vec<HostEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HostEntry {
    host: String,
    port: u16,
    fingerprint: String,
}

type Table = BTreeMap<ServerIdentity, CertificateFingerprint>;

/// Handle to a known_hosts table on disk.
///
/// Opening a handle performs no I/O; the file and its directory are created lazily
/// on the first write. Share one handle per driver via `Arc`.
#[derive(Debug)]
pub struct CertificateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CertificateStore {
    /// Create a handle for the table at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default table location: `$HOME/.neo4j/known_hosts`
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .ok_or_else(|| {
                Error::Config(
                    "cannot locate home directory for known_hosts; set known_hosts_path".into(),
                )
            })?;
        Ok(PathBuf::from(home).join(".neo4j").join("known_hosts"))
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the pinned fingerprint for `identity`.
    ///
    /// A missing table is an empty table, not an error.
    pub fn get(&self, identity: &ServerIdentity) -> Result<Option<CertificateFingerprint>> {
        Ok(self.load()?.get(identity).copied())
    }

    /// Store `fingerprint` for `identity`, replacing any existing record.
    pub fn put(&self, identity: &ServerIdentity, fingerprint: &CertificateFingerprint) -> Result<()> {
        self.update(|table| {
            let previous = table.insert(identity.clone(), *fingerprint);
            ((), previous != Some(*fingerprint))
        })
    }

    /// Atomically pin `fingerprint` for `identity` unless a record already exists.
    ///
    /// The lookup and the write happen under the same lock, so two concurrent
    /// first connections presenting different certificates cannot both be pinned.
    pub fn pin(
        &self,
        identity: &ServerIdentity,
        fingerprint: &CertificateFingerprint,
    ) -> Result<PinOutcome> {
        self.update(|table| match table.get(identity) {
            None => {
                table.insert(identity.clone(), *fingerprint);
                (PinOutcome::Pinned, true)
            }
            Some(pinned) if pinned == fingerprint => (PinOutcome::Matched, false),
            Some(pinned) => (PinOutcome::Mismatch { pinned: *pinned }, false),
        })
    }

    /// Remove the record for `identity`. Returns whether a record existed.
    pub fn forget(&self, identity: &ServerIdentity) -> Result<bool> {
        self.update(|table| {
            let existed = table.remove(identity).is_some();
            (existed, existed)
        })
    }

    /// All records, ordered by identity
    pub fn records(&self) -> Result<Vec<TrustRecord>> {
        Ok(self
            .load()?
            .into_iter()
            .map(|(identity, fingerprint)| TrustRecord {
                identity,
                fingerprint,
            })
            .collect())
    }

    fn load(&self) -> Result<Table> {
        match fs::read(&self.path) {
            Ok(data) => parse_table(&data).map_err(|reason| Error::store(&self.path, reason)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Table::new()),
            Err(e) => Err(Error::store(&self.path, e)),
        }
    }

    /// Read-modify-write under both locks. `op` returns its result and whether the
    /// table changed; unchanged tables are not rewritten.
    fn update<T>(&self, op: impl FnOnce(&mut Table) -> (T, bool)) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::store(&self.path, "store lock poisoned"))?;

        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::store(&self.path, e))?;

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| Error::store(&self.path, e))?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| Error::store(&self.path, e))?;

        let mut table = self.load()?;
        let (result, changed) = op(&mut table);
        if changed {
            self.write_table(&dir, &table)
                .map_err(|e| Error::store(&self.path, e))?;
            tracing::debug!(path = %self.path.display(), entries = table.len(), "known_hosts updated");
        }

        // Dropping `lock_file` releases the advisory lock
        drop(lock_file);
        Ok(result)
    }

    fn write_table(&self, dir: &Path, table: &Table) -> io::Result<()> {
        let file = KnownHostsFile {
            version: FORMAT_VERSION,
            hosts: table
                .iter()
                .map(|(identity, fingerprint)| HostEntry {
                    host: identity.host.clone(),
                    port: identity.port,
                    fingerprint: fingerprint.to_string(),
                })
                .collect(),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &file)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        sync_dir(dir)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "known_hosts".into());
        name.push(".lock");
        self.parent_dir().join(name)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Parse a serialized known_hosts table.
///
/// Blank input is an empty table. Unknown versions, malformed fingerprints and
/// duplicate identities are rejected rather than guessed at.
pub fn parse_records(data: &[u8]) -> std::result::Result<Vec<TrustRecord>, String> {
    Ok(parse_table(data)?
        .into_iter()
        .map(|(identity, fingerprint)| TrustRecord {
            identity,
            fingerprint,
        })
        .collect())
}

fn parse_table(data: &[u8]) -> std::result::Result<Table, String> {
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Table::new());
    }

    let file: KnownHostsFile =
        serde_json::from_slice(data).map_err(|e| format!("malformed known_hosts: {}", e))?;
    if file.version != FORMAT_VERSION {
        return Err(format!(
            "unsupported known_hosts version {} (expected {})",
            file.version, FORMAT_VERSION
        ));
    }

    let mut table = Table::new();
    for entry in file.hosts {
        let fingerprint: CertificateFingerprint = entry
            .fingerprint
            .parse()
            .map_err(|e| format!("entry {}:{}: {}", entry.host, entry.port, e))?;
        let identity = ServerIdentity::new(entry.host, entry.port);
        if table.insert(identity.clone(), fingerprint).is_some() {
            return Err(format!("duplicate entry for {}", identity));
        }
    }
    Ok(table)
}
