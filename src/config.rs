use std::path::{Path, PathBuf};

/// Overrides the data directory when the host does not pass one on `init`.
pub const DATA_DIR_ENV: &str = "SKANNI_DATA_DIR";
pub const STORE_FILE_NAME: &str = "skanni_storage.sqlite";

#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(test)]
pub fn test_env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Where the key-value database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Resolve the data directory: host-provided path (plain or `file://`),
    /// then `SKANNI_DATA_DIR`, then the Android app directories, then the
    /// system temp dir.
    pub fn from_host(data_dir: Option<&str>) -> Self {
        if let Some(dir) = data_dir.map(str::trim).filter(|d| !d.is_empty()) {
            let path = parse_file_uri_path(dir).unwrap_or_else(|| PathBuf::from(dir));
            return Self { data_dir: path };
        }
        Self {
            data_dir: preferred_data_dir(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }
}

pub fn parse_file_uri_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.starts_with('/') {
        return Some(PathBuf::from(uri));
    }
    None
}

pub fn preferred_data_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
        if !custom.trim().is_empty() {
            candidates.push(PathBuf::from(custom));
        }
    }
    candidates.push(PathBuf::from("/data/user/0/aeska.skanni/files"));
    candidates.push(PathBuf::from("/data/data/aeska.skanni/files"));

    for dir in candidates {
        if is_dir(&dir) {
            return dir;
        }
    }
    std::env::temp_dir()
}

fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
