use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Расширение файла хранилища.
pub const VAULT_EXTENSION: &str = "vault";

/// Содержимое файла хранилища.
///
/// Формат: первая строка — соль (base64), вторая — конверт
/// `base64(nonce || ciphertext || tag)`. Файлы старого формата содержат
/// только конверт, для них `salt == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub salt: Option<String>,
    pub envelope: String,
}

impl VaultFile {
    pub fn parse(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [envelope] => Ok(Self {
                salt: None,
                envelope: envelope.to_string(),
            }),
            [salt, envelope] => Ok(Self {
                salt: Some(salt.to_string()),
                envelope: envelope.to_string(),
            }),
            [] => Err(Error::MalformedVault("vault file is empty".to_string())),
            _ => Err(Error::MalformedVault(format!(
                "expected 1 or 2 lines, found {}",
                lines.len()
            ))),
        }
    }

    pub fn render(&self) -> String {
        match &self.salt {
            Some(salt) => format!("{salt}\n{}\n", self.envelope),
            None => format!("{}\n", self.envelope),
        }
    }
}

/// `<dir>/<name>.vault`
pub fn vault_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{VAULT_EXTENSION}"))
}

pub fn read_vault(path: &Path) -> Result<VaultFile> {
    let content = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
    VaultFile::parse(&content)
}

/// Атомарная запись: временный файл в той же директории (0600), fsync, rename.
/// При ошибке на диске остаётся прежнее содержимое.
pub fn write_vault(path: &Path, vault: &VaultFile) -> Result<()> {
    write_private(path, vault.render().as_bytes())
}

/// Записать файл, доступный только владельцу.
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::storage(&dir, e))?;
    set_perms_restrictive(tmp.path()).map_err(|e| Error::storage(tmp.path(), e))?;
    tmp.write_all(data).map_err(|e| Error::storage(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::storage(path, e))?;
    tmp.persist(path).map_err(|e| Error::storage(path, e.error))?;

    debug!(path = %path.display(), bytes = data.len(), "wrote private file");
    Ok(())
}

#[cfg(unix)]
fn set_perms_restrictive(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_perms_restrictive(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_two_line_layout() {
        let vault = VaultFile::parse("c2FsdA==\nZW52ZWxvcGU=\n").unwrap();
        assert_eq!(vault.salt.as_deref(), Some("c2FsdA=="));
        assert_eq!(vault.envelope, "ZW52ZWxvcGU=");
    }

    #[test]
    fn parse_legacy_single_line() {
        let vault = VaultFile::parse("ZW52ZWxvcGU=").unwrap();
        assert_eq!(vault.salt, None);
        assert_eq!(vault.envelope, "ZW52ZWxvcGU=");
    }

    #[test]
    fn parse_rejects_empty_and_extra_lines() {
        assert!(matches!(VaultFile::parse("\n\n"), Err(Error::MalformedVault(_))));
        assert!(matches!(VaultFile::parse("a\nb\nc"), Err(Error::MalformedVault(_))));
    }

    #[test]
    fn render_parse_preserves_layout() {
        let vault = VaultFile {
            salt: Some("c2FsdA==".into()),
            envelope: "ZW52".into(),
        };
        assert_eq!(VaultFile::parse(&vault.render()).unwrap(), vault);
    }

    #[test]
    fn vault_path_uses_extension() {
        let p = vault_path(Path::new("/tmp/wallets"), "default");
        assert_eq!(p, PathBuf::from("/tmp/wallets/default.vault"));
    }

    #[test]
    fn write_creates_parent_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("w.vault");
        let first = VaultFile {
            salt: None,
            envelope: "one".into(),
        };
        let second = VaultFile {
            salt: Some("s".into()),
            envelope: "two".into(),
        };
        write_vault(&path, &first).unwrap();
        write_vault(&path, &second).unwrap();
        assert_eq!(read_vault(&path).unwrap(), second);

        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_rename_leaves_target_and_neighbours_intact() {
        let dir = TempDir::new().unwrap();
        let kept = dir.path().join("kept.vault");
        let previous = VaultFile {
            salt: Some("c2FsdA==".into()),
            envelope: "old".into(),
        };
        write_vault(&kept, &previous).unwrap();

        // rename() cannot replace a directory with a file
        let blocked = dir.path().join("blocked.vault");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), b"inner").unwrap();

        let next = VaultFile {
            salt: Some("c2FsdA==".into()),
            envelope: "new".into(),
        };
        let err = write_vault(&blocked, &next).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));

        assert_eq!(read_vault(&kept).unwrap(), previous);
        assert_eq!(fs::read(blocked.join("inner")).unwrap(), b"inner");
        // no temp file left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn parent_that_is_a_file_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("wallets");
        fs::write(&parent, b"plain file").unwrap();

        let err = write_private(&parent.join("w.vault"), b"data").unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert_eq!(fs::read(&parent).unwrap(), b"plain file");
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("w.vault");
        write_private(&path, b"data").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = read_vault(&dir.path().join("absent.vault")).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
    }
}
