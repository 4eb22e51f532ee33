//! Flattens tree content into `(path, content)` listings for download.
//! 將專案樹攤平為（路徑, 內容）清單以供下載。
//!
//! Sibling names are not required to be unique, so two nodes can map to the
//! same path. A listing holds each path once: the entry stays where the path
//! first appeared and carries the content of its last occurrence.
//! 路徑重複時保留首次出現的位置，內容取最後一個。

use std::collections::HashMap;

use crate::naming::NodeId;
use crate::tree::{FileTree, NodeKind};

/// Archive name used when the whole project is exported.
pub const PROJECT_ARCHIVE_NAME: &str = "project.zip";

/// One file inside an export listing. `path` joins ancestor names with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: String,
}

/// Lists every file below `root`, depth-first in display order. The root's own
/// name is the first path segment; folders contribute no entry of their own.
/// 以深度優先順序列出子樹內所有檔案。
pub fn export_subtree(tree: &FileTree, root: &NodeId) -> Vec<ArchiveEntry> {
    collect(tree, std::slice::from_ref(root))
}

/// Lists every file in the tree.
pub fn export_project(tree: &FileTree) -> Vec<ArchiveEntry> {
    collect(tree, tree.roots())
}

/// Single-file download entry; `None` unless `id` is a file.
pub fn export_file(tree: &FileTree, id: &NodeId) -> Option<ArchiveEntry> {
    let node = tree.get(id)?;
    let content = node.content()?;
    Some(ArchiveEntry {
        path: node.name().to_string(),
        content: content.to_string(),
    })
}

/// Download name for an export rooted at `root` (`project.zip` for the whole tree).
pub fn archive_name(tree: &FileTree, root: Option<&NodeId>) -> String {
    match root.and_then(|id| tree.get(id)) {
        Some(node) => format!("{}.zip", node.name()),
        None => PROJECT_ARCHIVE_NAME.to_string(),
    }
}

fn collect(tree: &FileTree, starts: &[NodeId]) -> Vec<ArchiveEntry> {
    let mut entries: Vec<ArchiveEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut stack: Vec<(&NodeId, String)> = starts
        .iter()
        .rev()
        .map(|id| (id, String::new()))
        .collect();

    while let Some((id, prefix)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let path = format!("{prefix}{}", node.name());
        match node.kind() {
            NodeKind::File { content } => match positions.get(&path) {
                Some(&index) => entries[index].content = content.clone(),
                None => {
                    positions.insert(path.clone(), entries.len());
                    entries.push(ArchiveEntry {
                        path,
                        content: content.clone(),
                    });
                }
            },
            NodeKind::Folder { children, .. } => {
                let folder_prefix = format!("{path}/");
                stack.extend(
                    children
                        .iter()
                        .rev()
                        .map(|child| (child, folder_prefix.clone())),
                );
            }
        }
    }
    entries
}
