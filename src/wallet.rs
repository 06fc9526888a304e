//! An unlocked vault: ordered entries plus the passphrase that seals them.
//!
//! A [`Wallet`] lives for one session. `load` replaces the in-memory entries
//! with the decrypted vault, mutations work on memory only, and `save`
//! re-encrypts and atomically replaces the file. Dropping the wallet wipes
//! the passphrase and every entry.

use crate::crypto::{self, Cipher};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::store::{self, VaultFile};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

pub struct Wallet {
    name: String,
    path: PathBuf,
    passphrase: Zeroizing<String>,
    /// KDF salt of the vault file; `None` until loaded or first saved, and for
    /// legacy single-line vaults (which are salted with the wallet name).
    salt: Option<String>,
    entries: Vec<Entry>,
}

impl Wallet {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            passphrase: Zeroizing::new(passphrase.into()),
            salt: None,
            entries: Vec::new(),
        }
    }

    /// Wallet stored at `<dir>/<name>.vault`.
    pub fn in_dir(dir: &Path, name: &str, passphrase: impl Into<String>) -> Self {
        Self::new(name, store::vault_path(dir, name), passphrase)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decrypts the vault file and replaces the entries with its content.
    pub fn load(&mut self) -> Result<()> {
        let file = store::read_vault(&self.path)?;
        let salt = file.salt.clone().unwrap_or_else(|| self.name.clone());

        let plaintext = crypto::decrypt(&file.envelope, &self.passphrase, &salt)?;
        let entries: Vec<Entry> = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::MalformedVault(e.to_string()))?;

        check_ids(&entries)?;

        if file.salt.is_none() {
            debug!(wallet = %self.name, "legacy vault layout, salted with wallet name");
        }
        debug!(wallet = %self.name, entries = entries.len(), "vault loaded");

        self.entries.zeroize();
        self.entries = entries;
        self.salt = file.salt;
        Ok(())
    }

    /// Encrypts the entries and atomically replaces the vault file.
    pub fn save(&mut self) -> Result<()> {
        let salt = match &self.salt {
            Some(salt) => salt.clone(),
            None => {
                let salt = crypto::generate_salt();
                info!(wallet = %self.name, path = %self.path.display(), "generated new vault salt");
                self.salt = Some(salt.clone());
                salt
            }
        };

        let json = Zeroizing::new(
            serde_json::to_vec(&self.entries).map_err(|e| Error::MalformedVault(e.to_string()))?,
        );
        let envelope = Cipher::new(&self.passphrase, &salt).seal(&json)?;

        store::write_vault(
            &self.path,
            &VaultFile {
                salt: Some(salt),
                envelope,
            },
        )?;
        debug!(wallet = %self.name, entries = self.entries.len(), "vault saved");
        Ok(())
    }

    /// Entries in stored order whose group equals `group` (if non-empty) and
    /// where `pattern` (if non-empty) occurs case-insensitively in name, uri,
    /// user or comment.
    pub fn search(&self, pattern: &str, group: &str) -> Vec<Entry> {
        let pattern = pattern.to_lowercase();
        self.entries
            .iter()
            .filter(|e| group.is_empty() || e.group == group)
            .filter(|e| pattern.is_empty() || e.matches(&pattern))
            .cloned()
            .collect()
    }

    pub fn add_entry(&mut self, entry: Entry) -> Result<()> {
        entry.validate()?;
        if self.position(&entry.id).is_some() {
            return Err(Error::DuplicateEntry(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn update_entry(&mut self, entry: Entry) -> Result<()> {
        entry.validate()?;
        let idx = self
            .position(&entry.id)
            .ok_or_else(|| Error::EntryNotFound(entry.id.clone()))?;
        let mut old = std::mem::replace(&mut self.entries[idx], entry);
        old.zeroize();
        Ok(())
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))?;
        let mut old = self.entries.remove(idx);
        old.zeroize();
        Ok(())
    }

    /// Distinct non-empty groups in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for entry in &self.entries {
            if !entry.group.is_empty() && seen.insert(entry.group.as_str()) {
                groups.push(entry.group.clone());
            }
        }
        groups
    }

    /// Merges a JSON array of entries. Records without an id get a fresh one;
    /// records whose id is already present are skipped. Nothing is merged if
    /// any record is invalid. Returns the number of entries added.
    pub fn import(&mut self, data: &[u8]) -> Result<usize> {
        let records: Vec<Entry> =
            serde_json::from_slice(data).map_err(|e| Error::MalformedImport(e.to_string()))?;

        let mut known: HashSet<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        let mut fresh = Vec::new();
        let mut skipped = 0usize;

        for mut record in records {
            if record.id.is_empty() {
                record.generate_id();
            }
            record
                .validate()
                .map_err(|e| Error::MalformedImport(e.to_string()))?;

            if known.insert(record.id.clone()) {
                fresh.push(record);
            } else {
                skipped += 1;
                record.zeroize();
            }
        }

        if skipped > 0 {
            warn!(wallet = %self.name, skipped, "skipped imported entries with existing ids");
        }
        let added = fresh.len();
        self.entries.extend(fresh);
        debug!(wallet = %self.name, added, "import merged");
        Ok(added)
    }

    /// Plaintext JSON array of all entries, secrets included.
    pub fn export(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.entries).map_err(|e| Error::MalformedVault(e.to_string()))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

fn check_ids(entries: &[Entry]) -> Result<()> {
    let mut ids = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(Error::MalformedVault("entry without id".to_string()));
        }
        if !ids.insert(entry.id.as_str()) {
            return Err(Error::MalformedVault(format!(
                "duplicate entry id {}",
                entry.id
            )));
        }
    }
    Ok(())
}

impl Drop for Wallet {
    fn drop(&mut self) {
        self.entries.zeroize();
    }
}
