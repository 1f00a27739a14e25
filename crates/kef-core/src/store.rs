use std::collections::BTreeMap;
use std::io;

/// Host-side persistence contract for envelopes. Flash and SD-card backends
/// live with the host; the codec itself never touches storage.
pub trait EnvelopeStore {
    fn read(&self, id: &str) -> io::Result<Option<Vec<u8>>>;
    fn write(&mut self, id: &str, envelope: &[u8]) -> io::Result<()>;
    fn list(&self) -> io::Result<Vec<String>>;
    /// Returns whether the entry existed.
    fn delete(&mut self, id: &str) -> io::Result<bool>;
    fn wipe(&mut self) -> io::Result<()>;
}

/// In-memory store for tests and simulators.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvelopeStore for MemoryStore {
    fn read(&self, id: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(id).cloned())
    }

    fn write(&mut self, id: &str, envelope: &[u8]) -> io::Result<()> {
        self.entries.insert(id.to_string(), envelope.to_vec());
        Ok(())
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn delete(&mut self, id: &str) -> io::Result<bool> {
        Ok(self.entries.remove(id).is_some())
    }

    fn wipe(&mut self) -> io::Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_lifecycle() {
        let mut store = MemoryStore::new();
        store.write("seed", &[1, 2, 3]).unwrap();
        store.write("wallet", &[4, 5]).unwrap();
        assert_eq!(store.read("seed").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.read("missing").unwrap(), None);
        assert_eq!(store.list().unwrap(), vec!["seed".to_string(), "wallet".to_string()]);
        assert!(store.delete("seed").unwrap());
        assert!(!store.delete("seed").unwrap());
        store.wipe().unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
