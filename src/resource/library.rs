//! Talk file library
//!
//! Maps talk file names to their bytes. Each name gets a stable numeric id
//! in insertion order; the id selects the file's conversation history slot.

use std::fs;
use std::path::Path;

/// Extension of talk files in a content directory
pub const TALK_EXTENSION: &str = "tlk";

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Cannot read content directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Too many talk files (limit {0})")]
    Full(usize),
}

#[derive(Debug, Clone, Default)]
pub struct TalkLibrary {
    files: Vec<(String, Vec<u8>)>,
}

impl TalkLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, returning its id
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> u16 {
        if let Some(id) = self.id_of(name) {
            self.files[id as usize].1 = bytes;
            return id;
        }
        self.files.push((name.to_ascii_uppercase(), bytes));
        (self.files.len() - 1) as u16
    }

    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Case-insensitive lookup of a file id
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.files
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|i| i as u16)
    }

    /// Id and bytes of the named file
    pub fn get(&self, name: &str) -> Option<(u16, &[u8])> {
        let id = self.id_of(name)?;
        Some((id, self.files[id as usize].1.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(n, _)| n.as_str())
    }

    /// Load every `.tlk` file in `dir`, in name order so ids are stable
    /// across runs. Returns the number of files loaded.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, LibraryError> {
        let dir = dir.as_ref();
        let io_err = |source| LibraryError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_talk = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case(TALK_EXTENSION));
            if is_talk && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("Skipping talk file with unreadable name {:?}", path);
                continue;
            };
            if self.id_of(stem).is_none() && self.files.len() > u16::MAX as usize {
                return Err(LibraryError::Full(u16::MAX as usize));
            }
            let bytes = fs::read(&path).map_err(io_err)?;
            log::debug!("Loaded talk file {} ({} bytes)", stem, bytes.len());
            self.insert(stem, bytes);
            loaded += 1;
        }
        Ok(loaded)
    }
}
