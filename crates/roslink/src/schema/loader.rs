// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filesystem definition provider.
//!
//! Scans search paths for the ROS package layout:
//!
//! ```text
//! <root>/<pkg>/msg/<Name>.msg   -> pkg/Name
//! <root>/<pkg>/srv/<Name>.srv   -> pkg/Name
//! ```

use super::resolver::MessageDefinitionProvider;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Max directory depth walked below each search path.
const MAX_SCAN_DEPTH: usize = 8;

/// Loads `.msg` / `.srv` definitions from disk.
#[derive(Debug, Default)]
pub struct MessageLoader {
    search_paths: RwLock<Vec<PathBuf>>,
    definitions: RwLock<HashMap<String, String>>,
}

impl MessageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_search_path(&self, path: impl Into<PathBuf>) {
        self.search_paths.write().push(path.into());
    }

    /// Rescan all search paths, replacing the loaded definitions.
    ///
    /// Returns the number of definitions found.
    pub fn update_definitions(&self) -> io::Result<usize> {
        let mut found = HashMap::new();
        for root in self.search_paths.read().iter() {
            scan_dir(root, 0, &mut found)?;
        }
        let count = found.len();
        log::debug!("[MessageLoader] loaded {} definitions", count);
        *self.definitions.write() = found;
        Ok(count)
    }

    /// Register a definition directly (e.g. received from a peer).
    pub fn add_definition(&self, type_name: impl Into<String>, definition: impl Into<String>) {
        self.definitions
            .write()
            .insert(type_name.into(), definition.into());
    }

    /// Sorted list of known type names.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl MessageDefinitionProvider for MessageLoader {
    fn definition(&self, type_name: &str) -> Option<String> {
        self.definitions.read().get(type_name).cloned()
    }

    fn has_definition(&self, type_name: &str) -> bool {
        self.definitions.read().contains_key(type_name)
    }
}

fn scan_dir(dir: &Path, depth: usize, found: &mut HashMap<String, String>) -> io::Result<()> {
    if depth > MAX_SCAN_DEPTH {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_dir(&path, depth + 1, found)?;
            continue;
        }
        if let Some(type_name) = type_name_for(&path) {
            let text = fs::read_to_string(&path)?;
            found.insert(type_name, text);
        }
    }
    Ok(())
}

/// `<pkg>/msg/<Name>.msg` -> `pkg/Name`.
fn type_name_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    let kind_dir = match ext {
        "msg" => "msg",
        "srv" => "srv",
        _ => return None,
    };
    let stem = path.file_stem()?.to_str()?;
    let parent = path.parent()?;
    if parent.file_name()?.to_str()? != kind_dir {
        return None;
    }
    let package = parent.parent()?.file_name()?.to_str()?;
    Some(format!("{}/{}", package, stem))
}
