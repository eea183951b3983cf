//! Persistent macro store
//!
//! Macros live in a single JSON file together with the pad's grid
//! dimensions. A missing file is not an error: the store starts from a
//! built-in default set and writes it out on first save.

use anyhow::Context;
use hidp::{HidError, MacroStep};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MIN_COLUMNS: u8 = 1;
pub const MAX_COLUMNS: u8 = 8;
pub const MIN_ROWS: u8 = 1;
pub const MAX_ROWS: u8 = 6;

/// One pad button definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    pub sequence: Vec<MacroStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    columns: u8,
    rows: u8,
    macros: Vec<MacroDef>,
}

/// In-memory macro set with JSON persistence
#[derive(Debug, Clone)]
pub struct MacroStore {
    path: PathBuf,
    columns: u8,
    rows: u8,
    macros: Vec<MacroDef>,
}

impl MacroStore {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist yet (the defaults are then written out)
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "no macro store, creating defaults");
            let store = Self {
                path,
                columns: 4,
                rows: 3,
                macros: default_macros(),
            };
            store.save()?;
            return Ok(store);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read macro store {}", path.display()))?;
        let file: StoreFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid macro store {}", path.display()))?;
        debug!(
            path = %path.display(),
            macros = file.macros.len(),
            "macro store loaded"
        );
        Ok(Self {
            path,
            columns: file.columns.clamp(MIN_COLUMNS, MAX_COLUMNS),
            rows: file.rows.clamp(MIN_ROWS, MAX_ROWS),
            macros: file.macros,
        })
    }

    /// Default store location: `$XDG_CONFIG_HOME/macropad/macros.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("macropad")
            .join("macros.json")
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = StoreFile {
            columns: self.columns,
            rows: self.rows,
            macros: self.macros.clone(),
        };
        let raw = serde_json::to_string_pretty(&file).context("failed to serialize macro store")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "macro store saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn list(&self) -> &[MacroDef] {
        &self.macros
    }

    /// Look up a macro's step sequence by id
    pub fn sequence(&self, id: &str) -> hidp::Result<Vec<MacroStep>> {
        self.macros
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.sequence.clone())
            .ok_or_else(|| HidError::MacroNotFound(id.to_string()))
    }

    /// Insert or replace the macro with the same id
    pub fn upsert(&mut self, def: MacroDef) {
        match self.macros.iter_mut().find(|m| m.id == def.id) {
            Some(existing) => *existing = def,
            None => self.macros.push(def),
        }
    }

    /// Remove a macro; removing an unknown id is a no-op
    pub fn remove(&mut self, id: &str) {
        let before = self.macros.len();
        self.macros.retain(|m| m.id != id);
        if self.macros.len() == before {
            warn!(id, "remove of unknown macro ignored");
        }
    }

    pub fn set_grid(&mut self, columns: u8, rows: u8) {
        self.columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.rows = rows.clamp(MIN_ROWS, MAX_ROWS);
    }
}

fn combo(id: &str, name: &str, icon: &str, color: &str, key: u8, modifiers: u8) -> MacroDef {
    MacroDef {
        id: id.into(),
        name: name.into(),
        icon: icon.into(),
        color: color.into(),
        sequence: vec![MacroStep::Key {
            key_code: key.into(),
            modifiers: modifiers.into(),
        }],
    }
}

/// The out-of-the-box macro set: common editing shortcuts plus media keys
fn default_macros() -> Vec<MacroDef> {
    vec![
        combo("copy", "Copy", "content_copy", "#2196F3", 0x06, 0x01),
        combo("paste", "Paste", "content_paste", "#2196F3", 0x19, 0x01),
        combo("cut", "Cut", "content_cut", "#2196F3", 0x1B, 0x01),
        combo("undo", "Undo", "undo", "#9C27B0", 0x1D, 0x01),
        combo("redo", "Redo", "redo", "#9C27B0", 0x1C, 0x01),
        combo("save", "Save", "save", "#4CAF50", 0x16, 0x01),
        combo("select_all", "Select All", "select_all", "#FF9800", 0x04, 0x01),
        combo("find", "Find", "search", "#FF9800", 0x09, 0x01),
        combo("new_tab", "New Tab", "tab", "#607D8B", 0x17, 0x01),
        combo("close_tab", "Close Tab", "close", "#607D8B", 0x1A, 0x01),
        combo("mute", "Mute", "volume_off", "#F44336", 0x7F, 0x00),
        combo("play_pause", "Play/Pause", "play_arrow", "#F44336", 0xCD, 0x00),
    ]
}
