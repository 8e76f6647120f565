use std::path::PathBuf;

use crate::eid::Eid;

/// Flat file store rooted at a directory. Holds `config.yaml` and the
/// persisted chat session.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        let path = self.base_dir.join(ident);

        path.is_file()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        let path = self.base_dir.join(ident);

        std::fs::read(&path)
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self.base_dir.join(format!(".{}-{ident}", Eid::new()));

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(tmp.path().join("data").to_str().unwrap()).unwrap();

        assert!(!store.exists("chat.json"));
        store.write("chat.json", b"[]").unwrap();
        assert!(store.exists("chat.json"));
        assert_eq!(store.read("chat.json").unwrap(), b"[]");

        // temp file renamed into place
        let names: Vec<String> = std::fs::read_dir(&store.base_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["chat.json".to_string()]);

        store.write("chat.json", b"[{}]").unwrap();
        assert_eq!(store.read("chat.json").unwrap(), b"[{}]");
        assert!(store.read("other.json").is_err());
    }
}
