use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Setting key that replaces the whole editor object instead of one field.
pub const REPLACE_ALL_KEY: &str = "json";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("invalid value for editor setting {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("editor settings replacement must be a JSON object")]
    NotAnObject,
}

/// Everything the user can configure, persisted under separate keys.
/// 使用者偏好設定集合，分別儲存在不同的鍵值中。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Preferences {
    pub editor: EditorSettings,
    pub theme: Theme,
    pub live_mode: bool,
}

impl Preferences {
    pub fn sanitize(&mut self) {
        self.editor.sanitize();
    }
}

/// Colour scheme, stored as the `isDarkMode` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_dark_flag(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Dark)
    }

    /// Theme name understood by the editor widget.
    pub fn editor_theme(self) -> &'static str {
        match self {
            Theme::Dark => "vs-dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Editor widget options, persisted as one camelCase JSON object.
///
/// Keys this type does not model are kept in `extra` so a user-supplied object
/// survives a load/save cycle untouched.
/// 編輯器選項；未定義的欄位保留於 `extra`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_on")]
    pub word_wrap: String,
    #[serde(default, deserialize_with = "minimap_from_flag_or_object")]
    pub minimap: MinimapSettings,
    #[serde(default = "default_on")]
    pub line_numbers: String,
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,
    #[serde(default = "default_cursor_style")]
    pub cursor_style: String,
    #[serde(default = "default_cursor_blinking")]
    pub cursor_blinking: String,
    #[serde(default = "default_true")]
    pub smooth_scrolling: bool,
    #[serde(default = "default_true")]
    pub bracket_pair_colorization: bool,
    #[serde(default = "default_always")]
    pub auto_closing_brackets: String,
    #[serde(default)]
    pub format_on_save: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimapSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for MinimapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extra: Map::new(),
        }
    }
}

fn default_font_size() -> u32 {
    14
}

fn default_tab_size() -> u32 {
    2
}

fn default_on() -> String {
    "on".to_string()
}

fn default_always() -> String {
    "always".to_string()
}

fn default_cursor_style() -> String {
    "line".to_string()
}

fn default_cursor_blinking() -> String {
    "expand".to_string()
}

fn default_true() -> bool {
    true
}

// the settings panel writes a bare boolean, stored objects carry `enabled`
fn minimap_from_flag_or_object<'de, D>(deserializer: D) -> Result<MinimapSettings, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Object(MinimapSettings),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flag(enabled) => MinimapSettings {
            enabled,
            extra: Map::new(),
        },
        Raw::Object(settings) => settings,
    })
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            word_wrap: default_on(),
            minimap: MinimapSettings::default(),
            line_numbers: default_on(),
            tab_size: default_tab_size(),
            cursor_style: default_cursor_style(),
            cursor_blinking: default_cursor_blinking(),
            smooth_scrolling: true,
            bracket_pair_colorization: true,
            auto_closing_brackets: default_always(),
            format_on_save: false,
            extra: Map::new(),
        }
    }
}

impl EditorSettings {
    /// Clamps numeric options and restores blank string options.
    /// 修正超出範圍的數值與空白字串。
    pub fn sanitize(&mut self) {
        self.font_size = self.font_size.clamp(8, 72);
        self.tab_size = self.tab_size.clamp(1, 16);
        for (field, fallback) in [
            (&mut self.word_wrap, default_on as fn() -> String),
            (&mut self.line_numbers, default_on),
            (&mut self.cursor_style, default_cursor_style),
            (&mut self.cursor_blinking, default_cursor_blinking),
            (&mut self.auto_closing_brackets, default_always),
        ] {
            if field.trim().is_empty() {
                *field = fallback();
            }
        }
    }

    /// Updates a single setting by its camelCase key, or replaces the whole
    /// object (defaults merged underneath) when `key` is `"json"`.
    /// 依鍵值更新單一設定；鍵為 `"json"` 時以預設值為底整體取代。
    pub fn apply(&mut self, key: &str, value: Value) -> Result<(), PreferencesError> {
        let merged = if key == REPLACE_ALL_KEY {
            let Value::Object(replacement) = value else {
                return Err(PreferencesError::NotAnObject);
            };
            let mut base = to_object(&EditorSettings::default());
            base.extend(replacement);
            base
        } else {
            let mut current = to_object(self);
            current.insert(key.to_string(), value);
            current
        };
        let mut next: EditorSettings = serde_json::from_value(Value::Object(merged))
            .map_err(|source| PreferencesError::InvalidValue {
                key: key.to_string(),
                source,
            })?;
        next.sanitize();
        *self = next;
        Ok(())
    }
}

fn to_object(settings: &EditorSettings) -> Map<String, Value> {
    match serde_json::to_value(settings) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_first_launch_values() {
        let settings = EditorSettings::default();
        assert_eq!(settings.font_size, 14);
        assert_eq!(settings.tab_size, 2);
        assert_eq!(settings.word_wrap, "on");
        assert!(settings.minimap.enabled);
        assert_eq!(Theme::default().editor_theme(), "vs-dark");
        assert!(!Preferences::default().live_mode);
    }

    #[test]
    fn apply_single_key_keeps_other_fields() {
        let mut settings = EditorSettings::default();
        settings.apply("tabSize", json!(4)).unwrap();
        settings.apply("minimap", json!(false)).unwrap();
        assert_eq!(settings.tab_size, 4);
        assert!(!settings.minimap.enabled);
        assert_eq!(settings.font_size, 14);
    }

    #[test]
    fn apply_json_merges_defaults_underneath() {
        let mut settings = EditorSettings::default();
        settings.apply("fontSize", json!(20)).unwrap();
        settings
            .apply(REPLACE_ALL_KEY, json!({"wordWrap": "off", "renderWhitespace": "all"}))
            .unwrap();
        assert_eq!(settings.font_size, 14, "replacement resets to defaults");
        assert_eq!(settings.word_wrap, "off");
        assert_eq!(settings.extra.get("renderWhitespace"), Some(&json!("all")));
    }

    #[test]
    fn invalid_values_are_rejected_without_change() {
        let mut settings = EditorSettings::default();
        let err = settings.apply("fontSize", json!("huge")).unwrap_err();
        assert!(matches!(err, PreferencesError::InvalidValue { .. }));
        assert_eq!(settings, EditorSettings::default());
        assert!(matches!(
            settings.apply(REPLACE_ALL_KEY, json!([1, 2])),
            Err(PreferencesError::NotAnObject)
        ));
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut settings = EditorSettings::default();
        settings.apply("fontSize", json!(400)).unwrap();
        settings.apply("cursorStyle", json!("  ")).unwrap();
        assert_eq!(settings.font_size, 72);
        assert_eq!(settings.cursor_style, "line");
    }

    #[test]
    fn theme_flag_round_trip() {
        assert_eq!(Theme::from_dark_flag(false), Theme::Light);
        assert!(Theme::Light.toggled().is_dark());
    }
}
