//! Write-through persistence of workbench state into a [`KeyValueStore`].
//! （將工作台狀態逐項寫入鍵值儲存，並於啟動時逐項還原。）
//!
//! Each piece of state owns one key. Writes are best effort: a failing store
//! is logged and otherwise ignored. Restores fall back per key, so one
//! malformed value never discards the others.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use editore_project::{FileTree, NodeId, Session, SessionManager, DEFAULT_EDITOR_CONTENT};
use editore_settings::{EditorSettings, KeyValueStore, Preferences, Theme};

pub const FILES_KEY: &str = "editore_files";
pub const OPEN_TABS_KEY: &str = "editore_open_tabs";
pub const ACTIVE_TAB_KEY: &str = "editore_active_tab";
pub const CONTENT_KEY: &str = "editore_content";
pub const EDITOR_SETTINGS_KEY: &str = "editorSettings";
pub const DARK_MODE_KEY: &str = "isDarkMode";
pub const LIVE_MODE_KEY: &str = "isLiveMode";

/// Every key the workbench owns.
pub const ALL_KEYS: [&str; 7] = [
    FILES_KEY,
    OPEN_TABS_KEY,
    ACTIVE_TAB_KEY,
    CONTENT_KEY,
    EDITOR_SETTINGS_KEY,
    DARK_MODE_KEY,
    LIVE_MODE_KEY,
];

/// State read back on startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState {
    pub tree: FileTree,
    pub sessions: SessionManager,
    pub preferences: Preferences,
}

impl Default for RestoredState {
    fn default() -> Self {
        Self {
            tree: FileTree::sample(),
            sessions: SessionManager::new(),
            preferences: Preferences::default(),
        }
    }
}

/// Serializes workbench state to its fixed keys.
/// 以固定鍵值保存工作台狀態的轉接器。
#[derive(Debug)]
pub struct PersistenceAdapter<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn save_tree(&mut self, tree: &FileTree) {
        debug!(nodes = tree.len(), revision = tree.revision(), "saving files");
        self.write_json(FILES_KEY, tree);
    }

    /// Writes the open tabs, the active tab id and the displayed text.
    /// The active key is removed while no tab is active.
    pub fn save_sessions(&mut self, sessions: &SessionManager) {
        debug!(tabs = sessions.sessions().len(), "saving tabs");
        self.write_json(OPEN_TABS_KEY, sessions.sessions());
        match sessions.active_id() {
            Some(active) => self.write_raw(ACTIVE_TAB_KEY, active.as_str()),
            None => self.remove(ACTIVE_TAB_KEY),
        }
        self.write_raw(CONTENT_KEY, sessions.displayed_content());
    }

    pub fn save_preferences(&mut self, preferences: &Preferences) {
        self.write_json(EDITOR_SETTINGS_KEY, &preferences.editor);
        self.write_json(DARK_MODE_KEY, &preferences.theme.is_dark());
        self.write_json(LIVE_MODE_KEY, &preferences.live_mode);
    }

    pub fn save_all(
        &mut self,
        tree: &FileTree,
        sessions: &SessionManager,
        preferences: &Preferences,
    ) {
        self.save_tree(tree);
        self.save_sessions(sessions);
        self.save_preferences(preferences);
    }

    /// Reads every key, substituting the documented default for any key that
    /// is absent or malformed.
    /// 逐項讀取；缺漏或格式錯誤的鍵值改用預設值。
    pub fn restore(&self) -> RestoredState {
        let tree = self
            .read_json::<FileTree>(FILES_KEY)
            .unwrap_or_else(FileTree::sample);

        let tabs = self.read_json::<Vec<Session>>(OPEN_TABS_KEY).unwrap_or_default();
        let active = self
            .read_raw(ACTIVE_TAB_KEY)
            .filter(|raw| !raw.trim().is_empty())
            .map(NodeId::from_string);
        let displayed = self
            .read_raw(CONTENT_KEY)
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR_CONTENT.to_string());
        let sessions = SessionManager::restore(&tree, tabs, active, displayed);

        let mut preferences = Preferences {
            editor: self
                .read_json::<EditorSettings>(EDITOR_SETTINGS_KEY)
                .unwrap_or_default(),
            theme: self
                .read_json::<bool>(DARK_MODE_KEY)
                .map(Theme::from_dark_flag)
                .unwrap_or_default(),
            live_mode: self.read_json::<bool>(LIVE_MODE_KEY).unwrap_or(false),
        };
        preferences.sanitize();

        debug!(
            nodes = tree.len(),
            tabs = sessions.sessions().len(),
            "restored workbench state"
        );
        RestoredState {
            tree,
            sessions,
            preferences,
        }
    }

    /// Removes every owned key; the next restore yields the defaults.
    pub fn clear(&mut self) {
        for key in ALL_KEYS {
            self.remove(key);
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(encoded) => self.write_raw(key, &encoded),
            Err(err) => warn!(key, error = %err, "failed to encode value, skipping write"),
        }
    }

    fn write_raw(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(key, error = %err, "storage write failed");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            warn!(key, error = %err, "storage remove failed");
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "storage read failed, using default");
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "malformed stored value, using default");
                None
            }
        }
    }
}
