// ============================================================
// Layer 4 — Poem Loader
// ============================================================
// Loads plain-text poem collections from disk.
//
// The corpus path may be:
//   - a single .txt file
//   - a directory; every .txt file directly inside it is read,
//     in file-name order so the corpus is stable across runs
//
// Each file is cleaned and split into poems by the
// Preprocessor (two blank lines separate poems).
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::document::Poem;
use crate::domain::traits::PoemSource;

pub struct PoemLoader {
    path:         PathBuf,
    preprocessor: Preprocessor,
}

impl PoemLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path:         path.into(),
            preprocessor: Preprocessor::new(),
        }
    }

    fn text_files(&self) -> Result<Vec<PathBuf>> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)
            .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("txt") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_file(&self, path: &Path) -> Result<Vec<Poem>> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;

        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(self
            .preprocessor
            .split_poems(&raw)
            .into_iter()
            .map(|text| Poem::new(source.clone(), text))
            .collect())
    }
}

impl PoemSource for PoemLoader {
    fn load_all(&self) -> Result<Vec<Poem>> {
        if !self.path.exists() {
            tracing::warn!(
                "Corpus path '{}' does not exist, returning an empty corpus",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let mut poems = Vec::new();
        for path in self.text_files()? {
            match self.load_file(&path) {
                Ok(found) => {
                    tracing::debug!("Loaded {} poems from '{}'", found.len(), path.display());
                    poems.extend(found);
                }
                // One unreadable file (e.g. not UTF-8) should not sink the corpus
                Err(e) => tracing::warn!("Skipping '{}': {e:#}", path.display()),
            }
        }

        tracing::info!("Loaded {} poems from '{}'", poems.len(), self.path.display());
        Ok(poems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_txt_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second\n\n\nthird").unwrap();
        fs::write(dir.path().join("a.txt"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let poems = PoemLoader::new(dir.path()).load_all().unwrap();
        let texts: Vec<&str> = poems.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(poems[0].source, "a.txt");
    }

    #[test]
    fn test_single_file_path() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("sonnets.txt");
        fs::write(&file, "one\n\n\ntwo").unwrap();
        assert_eq!(PoemLoader::new(&file).load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_path_gives_empty_corpus() {
        let poems = PoemLoader::new("/definitely/not/here").load_all().unwrap();
        assert!(poems.is_empty());
    }
}
