//! Editor Preferences
//!
//! Client-side editor state: active language, theme, font size and the
//! result of the last run. Language, theme and font size are mirrored to a
//! durable key/value store under these keys:
//!
//! - `editor-language`
//! - `editor-theme`
//! - `editor-font-size`
//! - `editor-code-{language}` (in-progress code per language)
//!
//! # Usage
//!
//! ```rust,ignore
//! use snippetbox::preferences::{EditorPreferences, FileStore};
//!
//! let store = FileStore::open(dir.join("editor.json"))?;
//! let mut prefs = EditorPreferences::load(store);
//! prefs.attach_editor(Box::new(editor));
//! prefs.set_language("rust")?;
//! ```

mod editor;
mod storage;

pub use editor::*;
pub use storage::{FileStore, KeyValueStore, MemoryStore, PreferenceError};
