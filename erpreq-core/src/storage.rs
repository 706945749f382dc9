use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::models::RequirementsStore;

/// How long to wait for another process to release the lock
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Saves and loads the store as a single YAML document, guarded by an
/// advisory lock file so concurrent CLI invocations don't interleave writes
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let mut lock_name = file_path.clone().into_os_string();
        lock_name.push(".lock");
        Self {
            file_path,
            lock_file_path: PathBuf::from(lock_name),
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Polls `try_lock` until it succeeds or the timeout expires
    fn wait_for_lock<F>(&self, lock_file: &File, try_lock: F) -> Result<()>
    where
        F: Fn(&File) -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be writing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire an exclusive lock for writing.
    /// The returned handle must be held for the duration of the write.
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_exclusive(f))?;

        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        Ok(lock_file)
    }

    /// Acquire a shared lock for reading, if a lock file exists
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(&lock_file, |f| FileExt::try_lock_shared(f))?;
        Ok(Some(lock_file))
    }

    /// Loads the store, creating an empty file on first use
    pub fn load(&self) -> Result<RequirementsStore> {
        if !self.file_path.exists() {
            let default_store = RequirementsStore::new();
            self.save(&default_store)?;
            return Ok(default_store);
        }

        let _lock = self.acquire_read_lock()?;

        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))
    }

    /// Saves the store.
    ///
    /// The document is written to a temporary sibling and renamed into place,
    /// so a failed write leaves the previous contents intact.
    pub fn save(&self, store: &RequirementsStore) -> Result<()> {
        // Lock is released when dropped
        let _lock = self.acquire_write_lock()?;
        self.write_locked(store)
    }

    /// Reloads, mutates and writes the store under one exclusive lock.
    ///
    /// Concurrent writers queue on the lock, so each sees the previous one's
    /// changes. If `update_fn` fails nothing is written.
    pub fn update_atomically<F>(&self, update_fn: F) -> Result<RequirementsStore>
    where
        F: FnOnce(&mut RequirementsStore) -> Result<()>,
    {
        let _lock = self.acquire_write_lock()?;

        let mut store = if self.file_path.exists() {
            let file = File::open(&self.file_path)
                .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
            serde_yaml::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))?
        } else {
            RequirementsStore::new()
        };

        update_fn(&mut store)?;
        self.write_locked(&store)?;
        Ok(store)
    }

    /// Writes the store; the caller must hold the write lock
    fn write_locked(&self, store: &RequirementsStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(store)?;
        let mut tmp_name = self.file_path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, yaml)
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.file_path)
            .with_context(|| format!("Failed to replace {:?}", self.file_path))?;

        Ok(())
    }
}
