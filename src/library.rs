//! Read-only script library backed by a JSON file.
//!
//! The file holds an array of `{id, name, text}` records. The library is the
//! lookup the server and CLI hand to [`ScriptCompiler`](crate::compiler::ScriptCompiler).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use crate::compiler::{Script, ScriptLookup};
use crate::store::{read_json, write_json, StoreError};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("duplicate script id {id} ('{first}' and '{second}')")]
    DuplicateId {
        id: i64,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    /// Source file, if loaded from disk. `reload` re-reads it.
    path: Option<PathBuf>,
    scripts: IndexMap<i64, Script>,
}

impl ScriptLibrary {
    /// Build a library from in-memory scripts. Ids must be unique.
    pub fn from_scripts(scripts: Vec<Script>) -> Result<Self, LibraryError> {
        Ok(Self {
            path: None,
            scripts: index_scripts(scripts)?,
        })
    }

    /// Load the library file at `path`.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let scripts = index_scripts(read_json(path)?)?;
        tracing::info!(path = %path.display(), count = scripts.len(), "loaded script library");
        Ok(Self {
            path: Some(path.to_path_buf()),
            scripts,
        })
    }

    /// Like `load`, but a missing file gives an empty library.
    pub fn load_or_empty(path: &Path) -> Result<Self, LibraryError> {
        match Self::load(path) {
            Err(LibraryError::Store(e)) if e.is_not_found() => {
                tracing::warn!(path = %path.display(), "script library not found, starting empty");
                Ok(Self {
                    path: Some(path.to_path_buf()),
                    scripts: IndexMap::new(),
                })
            }
            other => other,
        }
    }

    /// Re-read the backing file. On error the current contents are kept.
    /// Returns the new script count.
    pub fn reload(&mut self) -> Result<usize, LibraryError> {
        let Some(path) = self.path.clone() else {
            return Ok(self.len());
        };
        let reloaded = Self::load(&path)?;
        self.scripts = reloaded.scripts;
        Ok(self.len())
    }

    /// Write scripts to `path` in the library file format.
    pub fn write_file(path: &Path, scripts: &[Script]) -> Result<(), LibraryError> {
        write_json(path, &scripts)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Script> {
        self.scripts.get(&id)
    }
}

impl ScriptLookup for ScriptLibrary {
    fn find_by_id(&self, id: i64) -> Option<Script> {
        self.get(id).cloned()
    }
}

fn index_scripts(scripts: Vec<Script>) -> Result<IndexMap<i64, Script>, LibraryError> {
    let mut map: IndexMap<i64, Script> = IndexMap::with_capacity(scripts.len());
    for script in scripts {
        if let Some(existing) = map.get(&script.id) {
            return Err(LibraryError::DuplicateId {
                id: script.id,
                first: existing.name.clone(),
                second: script.name,
            });
        }
        map.insert(script.id, script);
    }
    Ok(map)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compiler::ScriptCompiler;

    fn script(id: i64, name: &str, text: &str) -> Script {
        Script {
            id,
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bugwars_test_library_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_indexes_by_id() {
        let dir = scratch("order");
        let path = dir.join("scripts.json");
        let scripts = vec![script(9, "zig", "move"), script(2, "zag", "jump")];
        ScriptLibrary::write_file(&path, &scripts).unwrap();

        let library = ScriptLibrary::load(&path).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.find_by_id(9).unwrap().name, "zig");
        assert_eq!(library.find_by_id(2).unwrap().name, "zag");
        assert!(library.find_by_id(3).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ScriptLibrary::from_scripts(vec![script(1, "a", "move"), script(1, "b", "jump")])
            .unwrap_err();
        assert!(matches!(err, LibraryError::DuplicateId { id: 1, .. }));
        assert!(err.to_string().contains("'a' and 'b'"));

        let library = ScriptLibrary::from_scripts(vec![
            script(1, "a", "move"),
            script(2, "b", "jump"),
            script(3, "c", "turnleft"),
        ])
        .unwrap();
        assert_eq!(library.len(), 3);
        assert_eq!(library.get(3).unwrap().name, "c");

        let err = ScriptLibrary::from_scripts(vec![
            script(5, "first", "move"),
            script(6, "other", "move"),
            script(5, "again", "jump"),
        ])
        .unwrap_err();
        assert!(
            matches!(&err, LibraryError::DuplicateId { id: 5, first, second } if first == "first" && second == "again")
        );
    }

    #[test]
    fn missing_file_can_start_empty() {
        let dir = scratch("missing");
        let path = dir.join("scripts.json");
        assert!(ScriptLibrary::load(&path).is_err());
        let library = ScriptLibrary::load_or_empty(&path).unwrap();
        assert!(library.is_empty());
        assert_eq!(library.path(), Some(path.as_path()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reload_picks_up_edits_and_keeps_old_contents_on_error() {
        let dir = scratch("reload");
        let path = dir.join("scripts.json");
        ScriptLibrary::write_file(&path, &[script(1, "one", "move")]).unwrap();
        let mut library = ScriptLibrary::load(&path).unwrap();

        ScriptLibrary::write_file(&path, &[script(1, "one", "jump"), script(2, "two", "move")])
            .unwrap();
        assert_eq!(library.reload().unwrap(), 2);
        assert_eq!(library.get(1).unwrap().text, "jump");

        std::fs::write(&path, "not json").unwrap();
        assert!(library.reload().is_err());
        assert_eq!(library.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn library_drives_the_compiler() {
        let library =
            ScriptLibrary::from_scripts(vec![script(7, "runner", "move jump turnleft")]).unwrap();
        let code = ScriptCompiler::new(&library).compile(7).unwrap();
        assert_eq!(code.as_slice(), &[1, 0, 2, 0, 3, 0]);
    }
}
