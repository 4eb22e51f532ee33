//! The Editore workbench: one owned object holding the project tree, the open
//! tabs, preferences and run output, persisted write-through to a key-value
//! store. Editor widgets, script runners, preview sources and archive writers
//! plug in as borrowed collaborators.
//! Editore 工作台：集中管理專案樹、分頁、偏好設定與執行輸出。

pub mod editor;
pub mod persistence;
pub mod preview;
pub mod workbench;

pub use editor::{language_for_name, EditorEvent, EditorView, TextEditor, DEFAULT_LANGUAGE};
pub use persistence::{
    PersistenceAdapter, RestoredState, ACTIVE_TAB_KEY, ALL_KEYS, CONTENT_KEY, DARK_MODE_KEY,
    EDITOR_SETTINGS_KEY, FILES_KEY, LIVE_MODE_KEY, OPEN_TABS_KEY,
};
pub use preview::{
    styled_document, PreviewError, PreviewPane, PreviewSource, PreviewState,
    PREVIEW_FAILURE_MESSAGE,
};
pub use workbench::{ExportedArchive, Workbench, WorkbenchConfig};
