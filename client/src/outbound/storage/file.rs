//! Durable storage persisted as a JSON map inside one directory.
//!
//! The directory is opened once through `cap-std`; every access stays inside
//! it. Writes go to a temporary file that is renamed over the store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use cap_std::{ambient_authority, fs::Dir};

use crate::domain::ports::{ClientStorage, ClientStorageError};

const STORE_FILE: &str = "storage.json";
const STAGING_FILE: &str = "storage.json.tmp";

type Entries = BTreeMap<String, String>;

/// Key/value store surviving process restarts.
pub struct FileStorage {
    dir: Dir,
    guard: Mutex<()>,
}

impl FileStorage {
    /// Open (creating if needed) the store rooted at `path`.
    pub fn open(path: &Path) -> Result<Self, ClientStorageError> {
        Dir::create_ambient_dir_all(path, ambient_authority()).map_err(|err| {
            ClientStorageError::io(format!("create {}: {err}", path.display()))
        })?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|err| ClientStorageError::io(format!("open {}: {err}", path.display())))?;
        Ok(Self {
            dir,
            guard: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, ClientStorageError> {
        self.guard
            .lock()
            .map_err(|_| ClientStorageError::io("durable storage lock poisoned"))
    }

    fn read_entries(&self) -> Result<Entries, ClientStorageError> {
        match self.dir.read_to_string(STORE_FILE) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| ClientStorageError::corrupt(format!("{STORE_FILE}: {err}"))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(ClientStorageError::io(format!("read {STORE_FILE}: {err}"))),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), ClientStorageError> {
        let payload = serde_json::to_vec_pretty(entries)
            .map_err(|err| ClientStorageError::corrupt(format!("encode entries: {err}")))?;
        self.dir
            .write(STAGING_FILE, payload)
            .map_err(|err| ClientStorageError::io(format!("write {STAGING_FILE}: {err}")))?;
        self.dir
            .rename(STAGING_FILE, &self.dir, STORE_FILE)
            .map_err(|err| ClientStorageError::io(format!("replace {STORE_FILE}: {err}")))
    }

    fn update(&self, apply: impl FnOnce(&mut Entries) -> bool) -> Result<(), ClientStorageError> {
        let _guard = self.lock()?;
        let mut entries = self.read_entries()?;
        if apply(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientStorageError> {
        let _guard = self.lock()?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientStorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), ClientStorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), ClientStorageError> {
        self.update(|entries| {
            let changed = !entries.is_empty();
            entries.clear();
            changed
        })
    }
}
