//! Binding between the workbench and the text-editing widget.
//!
//! The widget is opaque: it receives an [`EditorView`] and reports back
//! through [`EditorEvent`]s. Nothing else crosses the boundary.
//! 編輯器元件的介面：提供顯示資料並接收變更事件。

use editore_settings::{EditorSettings, Theme};

/// Language id used when the extension is unknown or missing.
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Editor language for a file name, derived from its extension.
pub fn language_for_name(name: &str) -> &'static str {
    let Some((_, extension)) = name.rsplit_once('.') else {
        return DEFAULT_LANGUAGE;
    };
    match extension.to_ascii_lowercase().as_str() {
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "json" => "json",
        "html" | "htm" => "html",
        "css" => "css",
        "md" => "markdown",
        _ => DEFAULT_LANGUAGE,
    }
}

/// Everything the widget needs to render.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub content: String,
    pub language: &'static str,
    pub theme: &'static str,
    pub options: EditorSettings,
}

impl EditorView {
    pub fn new(
        content: impl Into<String>,
        file_name: Option<&str>,
        theme: Theme,
        options: &EditorSettings,
    ) -> Self {
        Self {
            content: content.into(),
            language: file_name.map_or(DEFAULT_LANGUAGE, language_for_name),
            theme: theme.editor_theme(),
            options: options.clone(),
        }
    }
}

/// Signals emitted by the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Mounted,
    Changed(String),
}

/// Text-editing widget collaborator.
pub trait TextEditor {
    fn show(&mut self, view: &EditorView);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(language_for_name("app.js"), "javascript");
        assert_eq!(language_for_name("types.D.TS"), "typescript");
        assert_eq!(language_for_name("page.htm"), "html");
        assert_eq!(language_for_name("README.md"), "markdown");
        assert_eq!(language_for_name("Makefile"), "javascript");
        assert_eq!(language_for_name("archive.tar.gz"), "javascript");
    }

    #[test]
    fn view_carries_theme_name() {
        let view = EditorView::new("x", None, Theme::Light, &EditorSettings::default());
        assert_eq!(view.theme, "light");
        assert_eq!(view.language, DEFAULT_LANGUAGE);
    }
}
