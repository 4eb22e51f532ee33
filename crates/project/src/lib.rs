//! Virtual file system primitives for the Editore workbench: the file tree,
//! open editing sessions, naming policy and export listings.
//! Editore 虛擬檔案系統核心：專案樹、編輯分頁、命名規則與匯出。

pub mod archive;
pub mod export;
pub mod naming;
pub mod session;
pub mod tree;

pub use archive::{ArchiveError, ArchiveWriter, ZipArchiveWriter};
pub use export::{
    archive_name, export_file, export_project, export_subtree, ArchiveEntry,
    PROJECT_ARCHIVE_NAME,
};
pub use naming::{
    resolve_create_name, resolve_duplicate_name, CopyName, DuplicateScope, EntryKind, NodeId,
    DEFAULT_EXTENSION,
};
pub use session::{Session, SessionManager, DEFAULT_EDITOR_CONTENT};
pub use tree::{
    DepthFirst, FileTree, Node, NodeKind, NodeSnapshot, TreeDiff, TreeRestoreError,
    NEW_FILE_CONTENT,
};
