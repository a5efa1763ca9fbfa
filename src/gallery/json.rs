//! Directory-backed JSON store: one `<subject>.json` file per subject.

use crate::gallery::{GalleryStore, Model, SubjectId};
use crate::util::{IdMatchError, IdMatchResult};
use std::fs;
use std::path::{Path, PathBuf};

fn store_err(context: &str, err: impl std::fmt::Display) -> IdMatchError {
    IdMatchError::Store {
        reason: format!("{context}: {err}"),
    }
}

/// Stores each subject as a pretty-printed JSON array of models.
#[derive(Clone, Debug)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> IdMatchResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| store_err("create store directory", err))?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subject_path(&self, subject: SubjectId) -> PathBuf {
        self.root.join(format!("{subject}.json"))
    }
}

impl GalleryStore for JsonDirStore {
    fn subjects(&self) -> IdMatchResult<Vec<SubjectId>> {
        let entries = fs::read_dir(&self.root).map_err(|err| store_err("list store", err))?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| store_err("list store", err))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            // Files that are not named after a subject id are ignored.
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<SubjectId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn read_subject(&self, subject: SubjectId) -> IdMatchResult<Vec<Model>> {
        let path = self.subject_path(subject);
        let text = fs::read_to_string(&path)
            .map_err(|err| store_err(&format!("read {}", path.display()), err))?;
        // Deserializing a model validates it.
        serde_json::from_str(&text)
            .map_err(|err| store_err(&format!("parse {}", path.display()), err))
    }

    fn write_subject(&self, subject: SubjectId, models: &[Model]) -> IdMatchResult<()> {
        let path = self.subject_path(subject);
        let json = serde_json::to_string_pretty(models)
            .map_err(|err| store_err("serialize models", err))?;
        fs::write(&path, json).map_err(|err| store_err(&format!("write {}", path.display()), err))
    }

    fn remove_subject(&self, subject: SubjectId) -> IdMatchResult<()> {
        let path = self.subject_path(subject);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(store_err(&format!("remove {}", path.display()), err)),
        }
    }
}
