use std::collections::HashMap;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::naming::{
    is_blank, resolve_create_name, resolve_duplicate_name, DuplicateScope, EntryKind, NodeId,
};

/// Content stub given to newly created files.
pub const NEW_FILE_CONTENT: &str = "// New file content";

/// Payload of a node: file text or folder children.
/// 節點內容：檔案文字或資料夾子節點。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File { content: String },
    Folder { children: Vec<NodeId>, expanded: bool },
}

impl NodeKind {
    pub fn entry_kind(&self) -> EntryKind {
        match self {
            NodeKind::File { .. } => EntryKind::File,
            NodeKind::Folder { .. } => EntryKind::Folder,
        }
    }
}

/// A node stored in the arena, linked to its parent by id.
/// 儲存在 arena 中的節點，以識別碼連結父節點。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn entry_kind(&self) -> EntryKind {
        self.kind.entry_kind()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// File text, `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    /// Child ids in display order; empty for files.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder { children, .. } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { expanded: true, .. })
    }
}

/// Captures differences after a tree mutation. An empty diff means the
/// request was a no-op.
/// 紀錄樹狀結構變動後的差異；空差異代表未變動。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub updated: Vec<NodeId>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Errors raised while rebuilding a tree from a snapshot.
/// 由快照重建專案樹時的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeRestoreError {
    #[error("node id {0} appears more than once")]
    DuplicateId(NodeId),
}

/// The canonical file/folder hierarchy, stored as an arena keyed by id.
///
/// Every mutation is total: invalid input (blank names, unknown ids, a file
/// used as a parent) leaves the tree untouched and yields an empty
/// [`TreeDiff`]. Nodes are only ever attached under freshly generated ids, so
/// a node can never become its own ancestor.
/// 以識別碼為鍵的 arena 專案樹；所有操作皆不會失敗。
#[derive(Debug, Clone)]
pub struct FileTree {
    revision: u64,
    roots: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
    duplicate_scope: DuplicateScope,
    new_file_content: String,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for FileTree {
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots && self.nodes == other.nodes
    }
}

impl FileTree {
    /// Constructs a tree with no entries.
    /// 建立沒有任何節點的空樹。
    pub fn empty() -> Self {
        Self {
            revision: 0,
            roots: Vec::new(),
            nodes: HashMap::new(),
            duplicate_scope: DuplicateScope::default(),
            new_file_content: NEW_FILE_CONTENT.to_string(),
        }
    }

    /// The three-entry hierarchy shown on first launch.
    /// 首次啟動時顯示的範例專案樹。
    pub fn sample() -> Self {
        let snapshot = vec![
            NodeSnapshot::File {
                id: NodeId::from("1"),
                name: "app.js".into(),
                content: "// Welcome to app.js".into(),
            },
            NodeSnapshot::File {
                id: NodeId::from("2"),
                name: "main.js".into(),
                content: "// Main file content".into(),
            },
            NodeSnapshot::Folder {
                id: NodeId::from("3"),
                name: "src".into(),
                expanded: true,
                children: vec![NodeSnapshot::File {
                    id: NodeId::from("4"),
                    name: "utils.js".into(),
                    content: "// Utility functions".into(),
                }],
            },
        ];
        Self::from_snapshot(&snapshot).unwrap_or_default()
    }

    pub fn with_duplicate_scope(mut self, scope: DuplicateScope) -> Self {
        self.duplicate_scope = scope;
        self
    }

    pub fn with_new_file_content(mut self, content: impl Into<String>) -> Self {
        self.new_file_content = content.into();
        self
    }

    pub fn duplicate_scope(&self) -> DuplicateScope {
        self.duplicate_scope
    }

    pub fn set_duplicate_scope(&mut self, scope: DuplicateScope) {
        self.duplicate_scope = scope;
    }

    /// Monotonic counter bumped by every effective mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    /// `/`-joined names from the root entry down to `id`.
    /// 由根節點到指定節點、以 `/` 串接的路徑。
    pub fn path_of(&self, id: &NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = self.nodes.get(id);
        while let Some(node) = cursor {
            segments.push(node.name.as_str());
            cursor = node.parent.as_ref().and_then(|pid| self.nodes.get(pid));
        }
        if segments.is_empty() {
            return None;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Depth-first, display-order traversal of every node.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Ids of `id` and all of its descendants, in depth-first order.
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        if !self.nodes.contains_key(id) {
            return collected;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            collected.push(current.clone());
            stack.extend(self.children(current).iter().rev());
        }
        collected
    }

    /// Inserts a new entry as the last child of `parent` (or as the last root).
    ///
    /// Blank names, a missing parent or a file parent make this a no-op.
    /// Creating inside a folder expands it.
    /// 在指定資料夾（或根層）末端新增節點。
    pub fn create_node(
        &mut self,
        parent: Option<&NodeId>,
        kind: EntryKind,
        proposed_name: &str,
    ) -> TreeDiff {
        let mut diff = TreeDiff::default();
        let Some(name) = resolve_create_name(kind, proposed_name) else {
            return diff;
        };
        if let Some(parent_id) = parent {
            if !self.nodes.get(parent_id).is_some_and(Node::is_folder) {
                return diff;
            }
        }

        let id = self.fresh_id();
        let node_kind = match kind {
            EntryKind::File => NodeKind::File {
                content: self.new_file_content.clone(),
            },
            EntryKind::Folder => NodeKind::Folder {
                children: Vec::new(),
                expanded: true,
            },
        };
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                name,
                parent: parent.cloned(),
                kind: node_kind,
            },
        );

        match parent {
            Some(parent_id) => {
                if let Some(Node {
                    kind: NodeKind::Folder { children, expanded },
                    ..
                }) = self.nodes.get_mut(parent_id)
                {
                    children.push(id.clone());
                    *expanded = true;
                }
                diff.updated.push(parent_id.clone());
            }
            None => self.roots.push(id.clone()),
        }

        debug!(node = %id, ?kind, parent = ?parent.map(NodeId::as_str), "created node");
        diff.added.push(id);
        self.bump();
        diff
    }

    /// Removes `id` and every descendant; `diff.removed` lists them all.
    /// 刪除節點及其所有子孫。
    pub fn delete_node(&mut self, id: &NodeId) -> TreeDiff {
        let mut diff = TreeDiff::default();
        let Some(node) = self.nodes.get(id) else {
            return diff;
        };
        let parent = node.parent.clone();
        let removed = self.subtree_ids(id);

        match &parent {
            Some(parent_id) => {
                if let Some(Node {
                    kind: NodeKind::Folder { children, .. },
                    ..
                }) = self.nodes.get_mut(parent_id)
                {
                    children.retain(|child| child != id);
                }
                diff.updated.push(parent_id.clone());
            }
            None => self.roots.retain(|root| root != id),
        }
        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }

        debug!(node = %id, removed = removed.len(), "deleted subtree");
        diff.removed = removed;
        self.bump();
        diff
    }

    /// Renames a node. Files without a `.` get the default extension; folders
    /// take the name verbatim. Renaming to the current name is a no-op.
    /// 重新命名節點；檔案名稱缺少副檔名時自動補上。
    pub fn rename_node(&mut self, id: &NodeId, new_name: &str) -> TreeDiff {
        let mut diff = TreeDiff::default();
        if is_blank(new_name) {
            return diff;
        }
        let Some(node) = self.nodes.get_mut(id) else {
            return diff;
        };
        let Some(resolved) = resolve_create_name(node.entry_kind(), new_name) else {
            return diff;
        };
        if node.name == resolved {
            return diff;
        }
        debug!(node = %id, from = %node.name, to = %resolved, "renamed node");
        node.name = resolved;
        diff.updated.push(id.clone());
        self.bump();
        diff
    }

    /// Deep-copies the subtree rooted at `id` and inserts it right after the
    /// original. The copy root gets a collision-safe `_copyN` name; every
    /// copied node gets a fresh id, descendants keep their names.
    /// 複製整個子樹並插入於原節點之後。
    pub fn duplicate_node(&mut self, id: &NodeId) -> TreeDiff {
        let mut diff = TreeDiff::default();
        let Some(original) = self.nodes.get(id) else {
            return diff;
        };
        let parent = original.parent.clone();
        let copy_name = {
            let kind = original.entry_kind();
            match self.duplicate_scope {
                DuplicateScope::Tree => resolve_duplicate_name(
                    self.nodes.values().map(|node| node.name.as_str()),
                    kind,
                    &original.name,
                ),
                DuplicateScope::Siblings => resolve_duplicate_name(
                    self.siblings_of(parent.as_ref())
                        .iter()
                        .filter_map(|sibling| self.nodes.get(sibling))
                        .map(|node| node.name.as_str()),
                    kind,
                    &original.name,
                ),
            }
        };

        let source_ids = self.subtree_ids(id);
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(source_ids.len());
        for source in &source_ids {
            let fresh = self.fresh_id();
            remap.insert(source.clone(), fresh);
        }

        let mut copies = Vec::with_capacity(source_ids.len());
        for source in &source_ids {
            let Some(node) = self.nodes.get(source) else {
                continue;
            };
            let is_root = source == id;
            let kind = match &node.kind {
                NodeKind::File { content } => NodeKind::File {
                    content: content.clone(),
                },
                NodeKind::Folder { children, expanded } => NodeKind::Folder {
                    children: children
                        .iter()
                        .filter_map(|child| remap.get(child).cloned())
                        .collect(),
                    expanded: *expanded,
                },
            };
            copies.push(Node {
                id: remap[source].clone(),
                name: if is_root {
                    copy_name.clone()
                } else {
                    node.name.clone()
                },
                parent: if is_root {
                    parent.clone()
                } else {
                    node.parent.as_ref().and_then(|p| remap.get(p).cloned())
                },
                kind,
            });
        }

        let copy_root = remap[id].clone();
        for copy in copies {
            diff.added.push(copy.id.clone());
            self.nodes.insert(copy.id.clone(), copy);
        }

        let siblings = match &parent {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(Node {
                    kind: NodeKind::Folder { children, .. },
                    ..
                }) => children,
                _ => &mut self.roots,
            },
            None => &mut self.roots,
        };
        let position = siblings
            .iter()
            .position(|sibling| sibling == id)
            .map(|idx| idx + 1)
            .unwrap_or(siblings.len());
        siblings.insert(position, copy_root.clone());
        if let Some(parent_id) = parent {
            diff.updated.push(parent_id);
        }

        debug!(source = %id, copy = %copy_root, name = %copy_name, "duplicated subtree");
        self.bump();
        diff
    }

    /// Flips the expanded flag of a folder.
    pub fn toggle_expanded(&mut self, id: &NodeId) -> TreeDiff {
        let mut diff = TreeDiff::default();
        if let Some(Node {
            kind: NodeKind::Folder { expanded, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            *expanded = !*expanded;
            diff.updated.push(id.clone());
            self.bump();
        }
        diff
    }

    /// Overwrites a file's text; no-op for folders, unknown ids or identical text.
    /// 覆寫檔案內容。
    pub fn set_content(&mut self, id: &NodeId, text: &str) -> TreeDiff {
        let mut diff = TreeDiff::default();
        if let Some(Node {
            kind: NodeKind::File { content },
            ..
        }) = self.nodes.get_mut(id)
        {
            if content != text {
                *content = text.to_string();
                diff.updated.push(id.clone());
                self.bump();
            }
        }
        diff
    }

    /// Nested, serialisable form of the whole tree.
    /// 轉換為可序列化的巢狀快照。
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.roots
            .iter()
            .filter_map(|root| self.snapshot_of(root))
            .collect()
    }

    /// Nested form of the subtree rooted at `id`.
    pub fn snapshot_of(&self, id: &NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(id)?;
        Some(match &node.kind {
            NodeKind::File { content } => NodeSnapshot::File {
                id: node.id.clone(),
                name: node.name.clone(),
                content: content.clone(),
            },
            NodeKind::Folder { children, expanded } => NodeSnapshot::Folder {
                id: node.id.clone(),
                name: node.name.clone(),
                expanded: *expanded,
                children: children
                    .iter()
                    .filter_map(|child| self.snapshot_of(child))
                    .collect(),
            },
        })
    }

    /// Rebuilds a tree from its nested form, rejecting repeated ids.
    /// 由巢狀快照重建專案樹；重複的識別碼視為錯誤。
    pub fn from_snapshot(entries: &[NodeSnapshot]) -> Result<Self, TreeRestoreError> {
        let mut tree = Self::empty();
        for entry in entries {
            tree.attach_snapshot(entry, None)?;
        }
        Ok(tree)
    }

    fn attach_snapshot(
        &mut self,
        entry: &NodeSnapshot,
        parent: Option<&NodeId>,
    ) -> Result<(), TreeRestoreError> {
        let id = entry.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(TreeRestoreError::DuplicateId(id));
        }
        let (name, kind, children) = match entry {
            NodeSnapshot::File { name, content, .. } => (
                name.clone(),
                NodeKind::File {
                    content: content.clone(),
                },
                &[][..],
            ),
            NodeSnapshot::Folder {
                name,
                expanded,
                children,
                ..
            } => (
                name.clone(),
                NodeKind::Folder {
                    children: children.iter().map(|c| c.id().clone()).collect(),
                    expanded: *expanded,
                },
                children.as_slice(),
            ),
        };
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                name,
                parent: parent.cloned(),
                kind,
            },
        );
        if parent.is_none() {
            self.roots.push(id.clone());
        }
        for child in children {
            self.attach_snapshot(child, Some(&id))?;
        }
        Ok(())
    }

    fn siblings_of(&self, parent: Option<&NodeId>) -> &[NodeId] {
        match parent {
            Some(parent_id) => self.children(parent_id),
            None => &self.roots,
        }
    }

    fn fresh_id(&self) -> NodeId {
        loop {
            let candidate = NodeId::generate();
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Serialize for FileTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<NodeSnapshot>::deserialize(deserializer)?;
        FileTree::from_snapshot(&entries).map_err(D::Error::custom)
    }
}

/// Depth-first iterator over a [`FileTree`].
pub struct DepthFirst<'a> {
    tree: &'a FileTree,
    stack: Vec<&'a NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.tree.nodes.get(id) {
                self.stack.extend(node.children().iter().rev());
                return Some(node);
            }
        }
        None
    }
}

/// Nested wire form of a node, matching the stored `files` payload:
/// `{"id","name","type":"file","content"}` or
/// `{"id","name","type":"folder","isOpen","children"}`.
/// 節點的巢狀儲存格式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
    File {
        id: NodeId,
        name: String,
        #[serde(default, deserialize_with = "null_as_default")]
        content: String,
    },
    Folder {
        id: NodeId,
        name: String,
        #[serde(default, rename = "isOpen", deserialize_with = "null_as_default")]
        expanded: bool,
        #[serde(default, deserialize_with = "null_as_default")]
        children: Vec<NodeSnapshot>,
    },
}

impl NodeSnapshot {
    pub fn id(&self) -> &NodeId {
        match self {
            NodeSnapshot::File { id, .. } | NodeSnapshot::Folder { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeSnapshot::File { name, .. } | NodeSnapshot::Folder { name, .. } => name,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
