use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Debug log written when `--debug` is given without `--log-file`.
pub const LOG_FILE: &str = "dtgrid.log";

/// Files removed by `--clear-cache`
const CACHE_FILES: &[&str] = &[LOG_FILE];

/// Manages the cache directory (debug logs)
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Remove every known cache file. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                match fs::remove_file(&file_path) {
                    Ok(()) => removed += 1,
                    Err(e) => eprintln!("Warning: Could not remove cache file {}: {}", filename, e),
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_all_removes_log() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::with_dir(dir.path().join("dtgrid"));
        cache.ensure_cache_dir().unwrap();
        fs::write(cache.cache_file(LOG_FILE), "line\n").unwrap();
        fs::write(cache.cache_file("other.txt"), "keep").unwrap();

        assert_eq!(cache.clear_all().unwrap(), 1);
        assert!(!cache.cache_file(LOG_FILE).exists());
        assert!(cache.cache_file("other.txt").exists());
        assert_eq!(cache.clear_all().unwrap(), 0);
    }
}
