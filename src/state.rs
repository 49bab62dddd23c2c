use parking_lot::RwLock;

use crate::compiler::{Diagnostic, ScriptCompiler};
use crate::dsl::codegen::Bytecode;
use crate::library::{LibraryError, ScriptLibrary};

// ── Application State ──────────────────────────────────────────────

/// State shared across HTTP handlers and the CLI.
pub struct AppState {
    pub library: RwLock<ScriptLibrary>,
}

impl AppState {
    pub fn new(library: ScriptLibrary) -> Self {
        Self {
            library: RwLock::new(library),
        }
    }

    /// Read-only access to the library. Holds the read guard for the duration of `f`.
    pub fn with_library<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ScriptLibrary) -> R,
    {
        let guard = self.library.read();
        f(&guard)
    }

    /// Compile a stored script under a single read guard.
    pub fn compile(&self, id: i64) -> Result<Bytecode, Diagnostic> {
        self.with_library(|library| ScriptCompiler::new(library).compile(id))
    }

    /// Re-read the library file. Returns the new script count.
    pub fn reload_library(&self) -> Result<usize, LibraryError> {
        let count = self.library.write().reload()?;
        tracing::info!(count, "script library reloaded");
        Ok(count)
    }
}
