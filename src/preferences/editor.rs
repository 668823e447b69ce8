use crate::model::RecordExecution;

use super::storage::{KeyValueStore, PreferenceError};

pub const LANGUAGE_KEY: &str = "editor-language";
pub const THEME_KEY: &str = "editor-theme";
pub const FONT_SIZE_KEY: &str = "editor-font-size";

pub const DEFAULT_LANGUAGE: &str = "javascript";
pub const DEFAULT_THEME: &str = "vs-dark";
pub const DEFAULT_FONT_SIZE: u32 = 16;

pub fn code_key(language: &str) -> String {
    format!("editor-code-{}", language)
}

/// The live code editor the preferences are bound to.
pub trait EditorHandle {
    fn value(&self) -> String;
    fn set_value(&mut self, code: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub language: String,
    pub code: String,
    pub output: String,
    pub error: Option<String>,
}

/// Editor preferences and run state, owned by the UI root.
///
/// Every mutation writes through to the key/value store before returning.
pub struct EditorPreferences<S: KeyValueStore> {
    store: S,
    language: String,
    font_size: u32,
    theme: String,
    output: String,
    error: Option<String>,
    is_running: bool,
    editor: Option<Box<dyn EditorHandle>>,
    last_execution: Option<ExecutionResult>,
}

impl<S: KeyValueStore> EditorPreferences<S> {
    pub fn load(store: S) -> Self {
        let language = store
            .get(LANGUAGE_KEY)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let theme = store.get(THEME_KEY).unwrap_or_else(|| DEFAULT_THEME.to_string());
        let font_size = store
            .get(FONT_SIZE_KEY)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_FONT_SIZE);

        tracing::debug!(language = %language, theme = %theme, font_size, "loaded editor preferences");

        EditorPreferences {
            store,
            language,
            font_size,
            theme,
            output: String::new(),
            error: None,
            is_running: false,
            editor: None,
            last_execution: None,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn last_execution(&self) -> Option<&ExecutionResult> {
        self.last_execution.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.store.set(key, value)
    }

    /// Live editor content, or empty when no editor is attached.
    pub fn current_code(&self) -> String {
        self.editor.as_ref().map(|e| e.value()).unwrap_or_default()
    }

    /// Saves the outgoing language's code, switches, and loads the incoming
    /// language's saved code into the editor. Clears the last run.
    pub fn set_language(&mut self, language: &str) -> Result<(), PreferenceError> {
        if let Some(editor) = self.editor.as_ref() {
            let current = editor.value();
            let key = code_key(&self.language);
            self.save(&key, &current)?;
        }

        self.language = language.to_string();
        self.output.clear();
        self.error = None;
        self.last_execution = None;
        self.save(LANGUAGE_KEY, language)?;

        let saved = self.store.get(&code_key(language)).unwrap_or_default();
        if let Some(editor) = self.editor.as_mut() {
            editor.set_value(&saved);
        }

        tracing::debug!(language, "switched editor language");
        Ok(())
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<(), PreferenceError> {
        self.theme = theme.to_string();
        self.save(THEME_KEY, theme)
    }

    pub fn set_font_size(&mut self, font_size: u32) -> Result<(), PreferenceError> {
        if font_size == 0 {
            return Err(PreferenceError::InvalidFontSize(font_size));
        }
        self.font_size = font_size;
        self.save(FONT_SIZE_KEY, &font_size.to_string())
    }

    /// Binds the editor. The first handle attached receives the saved code
    /// for the current language.
    pub fn attach_editor(&mut self, mut handle: Box<dyn EditorHandle>) {
        if self.editor.is_none() {
            if let Some(saved) = self.store.get(&code_key(&self.language)) {
                handle.set_value(&saved);
            }
        }
        self.editor = Some(handle);
    }

    pub fn begin_run(&mut self) {
        self.is_running = true;
        self.output.clear();
        self.error = None;
    }

    pub fn finish_run(&mut self, result: ExecutionResult) {
        self.output = result.output.clone();
        self.error = result.error.clone();
        self.is_running = false;
        self.last_execution = Some(result);
    }

    /// The last finished run, shaped for the execution log.
    pub fn execution_record(&self) -> Option<RecordExecution> {
        self.last_execution.as_ref().map(|result| RecordExecution {
            language: result.language.clone(),
            code: result.code.clone(),
            output: Some(result.output.clone()).filter(|o| !o.is_empty()),
            error: result.error.clone(),
        })
    }
}
