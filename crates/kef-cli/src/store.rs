use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kef_core::EnvelopeStore;
use tempfile::NamedTempFile;

const SUFFIX: &str = "kef";

/// Directory-backed envelope store: one `<id>.kef` file per entry, written
/// atomically with owner-only permissions.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("cannot create vault directory {}", root.display()))?;
        Ok(FsStore { root })
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{SUFFIX}"))
    }
}

fn set_secure_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

impl EnvelopeStore for FsStore {
    fn read(&self, id: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, id: &str, envelope: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        set_secure_permissions(tmp.path())?;
        tmp.write_all(envelope)?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(self.entry_path(id)).map_err(|err| err.error)?;
        Ok(())
    }

    fn list(&self) -> std::io::Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SUFFIX) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn delete(&mut self, id: &str) -> std::io::Result<bool> {
        match fs::remove_file(self.entry_path(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn wipe(&mut self) -> std::io::Result<()> {
        for id in self.list()? {
            self.delete(&id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::open(dir.path().join("vault")).unwrap();
        assert!(store.list().unwrap().is_empty());

        store.write("seed", &[1, 2, 3]).unwrap();
        store.write("multisig", &[9]).unwrap();
        assert_eq!(store.read("seed").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.read("nope").unwrap(), None);
        assert_eq!(store.list().unwrap(), vec!["multisig".to_string(), "seed".to_string()]);

        // Overwrite replaces atomically.
        store.write("seed", &[7, 7]).unwrap();
        assert_eq!(store.read("seed").unwrap(), Some(vec![7, 7]));

        assert!(store.delete("seed").unwrap());
        assert!(!store.delete("seed").unwrap());
        store.wipe().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::open(dir.path()).unwrap();
        store.write("seed", &[0xAA]).unwrap();
        let mode = fs::metadata(dir.path().join("seed.kef")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
