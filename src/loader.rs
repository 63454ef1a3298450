//! This module provides the `ScriptLoader` struct, responsible for reading Automython scripts
//! (`.theory` files) from disk.

use crate::ast::Node;
use crate::parser::parse;
use crate::types::{InterpreterError, SCRIPT_EXTENSION};
use std::fs;
use std::path::Path;

pub struct ScriptLoader;

impl ScriptLoader {
    /// Returns true if `path` has the script extension, ignoring case.
    pub fn is_script_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
    }

    /// Reads the source text of a script.
    ///
    /// # Returns
    ///
    /// * `Err(InterpreterError::FileError)` if the path is not a `.theory` file or cannot be read.
    pub fn load_script(path: &Path) -> Result<String, InterpreterError> {
        if !Self::is_script_path(path) {
            return Err(InterpreterError::FileError(format!(
                "Wrong file type {}, expected a .{} file",
                path.display(),
                SCRIPT_EXTENSION
            )));
        }

        fs::read_to_string(path).map_err(|e| {
            InterpreterError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    /// Reads and parses a script without evaluating it.
    pub fn load_statements(path: &Path) -> Result<Vec<Node>, InterpreterError> {
        let source = Self::load_script(path)?;
        let stripped = source.lines().map(str::trim).collect::<Vec<_>>().join("\n");
        parse(&stripped)
    }
}
