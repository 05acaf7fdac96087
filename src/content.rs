use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReaderError;
use crate::logging;
use crate::models::Chapter;

pub const EMPTY_LIBRARY: &str = "No chapters found.";
pub const EMPTY_LIBRARY_HINT: &str =
    "Generate the chapter file first: npm run download && npm run split && npm run modernize";

/// Chapters of the book in reading order. Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ChapterStore {
    chapters: Vec<Chapter>,
}

impl ChapterStore {
    pub fn new(mut chapters: Vec<Chapter>) -> Self {
        chapters.sort_by_key(|c| c.id);
        chapters.dedup_by_key(|c| c.id);
        Self { chapters }
    }

    /// Load chapters from a JSON array. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ReaderError> {
        match Self::try_load(path) {
            Err(ReaderError::ContentMissing(missing)) => {
                logging::warn(format!(
                    "No chapters file at {}, starting with an empty library",
                    missing.display()
                ));
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Like [`ChapterStore::load`] but reports a missing file as `ContentMissing`.
    pub fn try_load(path: &Path) -> Result<Self, ReaderError> {
        if !path.exists() {
            return Err(ReaderError::ContentMissing(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let chapters: Vec<Chapter> = serde_json::from_str(&json)?;
        logging::info(format!(
            "Loaded {} chapters from {}",
            chapters.len(),
            path.display()
        ));
        Ok(Self::new(chapters))
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, id: u32) -> Result<&Chapter, ReaderError> {
        self.chapters
            .binary_search_by_key(&id, |c| c.id)
            .map(|idx| &self.chapters[idx])
            .map_err(|_| ReaderError::ChapterNotFound(id))
    }

    pub fn first_id(&self) -> Option<u32> {
        self.chapters.first().map(|c| c.id)
    }

    pub fn next_id(&self, id: u32) -> Option<u32> {
        self.chapters.iter().map(|c| c.id).find(|&other| other > id)
    }

    pub fn prev_id(&self, id: u32) -> Option<u32> {
        self.chapters.iter().rev().map(|c| c.id).find(|&other| other < id)
    }
}

/// Illustration lookup by the `chapter<id>.png` naming scheme.
#[derive(Debug, Clone)]
pub struct Illustrations {
    dir: PathBuf,
}

impl Illustrations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, chapter_id: u32) -> PathBuf {
        self.dir.join(format!("chapter{chapter_id}.png"))
    }

    /// Path of the illustration when it exists; a missing file is logged and hidden.
    pub fn resolve(&self, chapter_id: u32) -> Option<PathBuf> {
        let path = self.path_for(chapter_id);
        if path.is_file() {
            Some(path)
        } else {
            logging::debug(format!("Image failed to load: {}", path.display()));
            None
        }
    }
}
