//! User preferences and the durable key-value boundary of the Editore workbench.
//! Editore 的偏好設定與持久化鍵值儲存。

pub mod preferences;
pub mod storage;

pub use preferences::{
    EditorSettings, MinimapSettings, Preferences, PreferencesError, Theme, REPLACE_ALL_KEY,
};
pub use storage::{DirectoryStore, KeyValueStore, MemoryStore, StorageError};
