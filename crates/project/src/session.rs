use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::naming::{EntryKind, NodeId};
use crate::tree::{FileTree, Node};

/// Text shown in the editor while no tab is active.
pub const DEFAULT_EDITOR_CONTENT: &str = "// Start coding here...";

/// An open editing tab bound to a tree node by id.
/// 以識別碼對應樹狀節點的編輯分頁。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default = "default_session_kind")]
    pub kind: EntryKind,
}

fn default_session_kind() -> EntryKind {
    EntryKind::File
}

impl Session {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id().clone(),
            name: node.name().to_string(),
            content: node.content().unwrap_or_default().to_string(),
            kind: node.entry_kind(),
        }
    }
}

/// Owns the open-tab list, the active tab and the displayed editor text.
///
/// Once a session is open its content is authoritative: edits go to the
/// session first and are mirrored into the tree.
/// 管理開啟中的分頁、作用中分頁以及編輯器顯示內容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionManager {
    sessions: Vec<Session>,
    active: Option<NodeId>,
    displayed: String,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            displayed: DEFAULT_EDITOR_CONTENT.to_string(),
        }
    }

    /// Rebuilds a manager from persisted parts.
    ///
    /// An active id that matches no session is dropped; when a session is
    /// active its content becomes the displayed text.
    /// 由儲存的資料重建分頁狀態。
    pub fn from_parts(sessions: Vec<Session>, active: Option<NodeId>, displayed: String) -> Self {
        let active = active.filter(|id| sessions.iter().any(|session| &session.id == id));
        let displayed = active
            .as_ref()
            .and_then(|id| sessions.iter().find(|session| &session.id == id))
            .map(|session| session.content.clone())
            .unwrap_or(displayed);
        Self {
            sessions,
            active,
            displayed,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Session> {
        self.sessions.iter().find(|session| &session.id == id)
    }

    pub fn active_id(&self) -> Option<&NodeId> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Current editor text: the active session's content or the last text
    /// shown when nothing is active.
    pub fn displayed_content(&self) -> &str {
        &self.displayed
    }

    /// Opens (or re-activates) the tab for a file node. Folders are ignored.
    /// 開啟檔案分頁；若已開啟則切換為作用中。
    pub fn open_file(&mut self, node: &Node) -> bool {
        if node.is_folder() {
            return false;
        }
        if self.get(node.id()).is_none() {
            debug!(tab = %node.id(), name = node.name(), "opening tab");
            self.sessions.push(Session::from_node(node));
        }
        self.activate(node.id())
    }

    /// Makes an open session active and shows its content.
    pub fn activate(&mut self, id: &NodeId) -> bool {
        let Some(content) = self.get(id).map(|session| session.content.clone()) else {
            return false;
        };
        self.displayed = content;
        self.active = Some(id.clone());
        true
    }

    /// Closes one tab, falling back to the last remaining tab when it was active.
    /// 關閉分頁；若為作用中分頁則改為最後一個分頁。
    pub fn close_tab(&mut self, id: &NodeId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|session| &session.id != id);
        if self.sessions.len() == before {
            return false;
        }
        if self.active.as_ref() == Some(id) {
            self.fall_back();
        }
        true
    }

    /// Closes every tab whose id was removed from the tree. Returns the count.
    /// 依據刪除的節點清單關閉對應的分頁。
    pub fn cascade_close(&mut self, removed: &[NodeId]) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|session| !removed.contains(&session.id));
        let closed = before - self.sessions.len();
        if closed > 0
            && self
                .active
                .as_ref()
                .is_some_and(|active| removed.contains(active))
        {
            self.fall_back();
        }
        closed
    }

    /// Writes `text` into the active session and mirrors it into the tree
    /// node with the same id, keeping both equal.
    ///
    /// Without an active session only the displayed text changes.
    /// 更新作用中分頁內容並同步寫回專案樹。
    pub fn edit_active_content(&mut self, tree: &mut FileTree, text: &str) -> bool {
        self.displayed = text.to_string();
        let Some(active) = self.active.clone() else {
            return false;
        };
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == active) else {
            return false;
        };
        session.content = text.to_string();
        tree.set_content(&active, text);
        true
    }

    /// Mirrors a node rename into its open session without reordering.
    pub fn sync_name(&mut self, id: &NodeId, name: &str) -> bool {
        match self.sessions.iter_mut().find(|session| &session.id == id) {
            Some(session) if session.name != name => {
                session.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    /// Like [`SessionManager::from_parts`], but first drops sessions whose id
    /// no longer resolves to a file in `tree`, and repeats of an id already
    /// seen (the first one wins).
    /// 還原分頁時先移除已不存在於專案樹的分頁與重複的分頁。
    pub fn restore(
        tree: &FileTree,
        mut sessions: Vec<Session>,
        active: Option<NodeId>,
        displayed: String,
    ) -> Self {
        let before = sessions.len();
        let mut seen = HashSet::new();
        sessions.retain(|session| {
            tree.get(&session.id).is_some_and(|node| !node.is_folder())
                && seen.insert(session.id.clone())
        });
        if sessions.len() != before {
            debug!(
                dropped = before - sessions.len(),
                "dropping orphaned or repeated tabs on restore"
            );
        }
        Self::from_parts(sessions, active, displayed)
    }

    fn fall_back(&mut self) {
        match self.sessions.last() {
            Some(last) => {
                self.active = Some(last.id.clone());
                self.displayed = last.content.clone();
            }
            None => {
                self.active = None;
                self.displayed = DEFAULT_EDITOR_CONTENT.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> NodeId {
        NodeId::from(value)
    }

    fn open(manager: &mut SessionManager, tree: &FileTree, value: &str) {
        let node = tree.get(&id(value)).unwrap();
        assert!(manager.open_file(node));
    }

    #[test]
    fn opening_twice_keeps_one_tab() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        open(&mut manager, &tree, "1");
        open(&mut manager, &tree, "2");
        open(&mut manager, &tree, "1");
        assert_eq!(manager.sessions().len(), 2);
        assert_eq!(manager.active_id(), Some(&id("1")));
        assert_eq!(manager.displayed_content(), "// Welcome to app.js");
    }

    #[test]
    fn folders_do_not_open() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        assert!(!manager.open_file(tree.get(&id("3")).unwrap()));
        assert!(manager.is_empty());
    }

    #[test]
    fn closing_active_tab_activates_last_in_list() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        open(&mut manager, &tree, "1");
        open(&mut manager, &tree, "4");
        open(&mut manager, &tree, "2");
        manager.activate(&id("4"));

        assert!(manager.close_tab(&id("4")));
        assert_eq!(manager.active_id(), Some(&id("2")));
        assert_eq!(manager.displayed_content(), "// Main file content");
    }

    #[test]
    fn closing_inactive_tab_keeps_active() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        open(&mut manager, &tree, "1");
        open(&mut manager, &tree, "2");
        assert!(manager.close_tab(&id("1")));
        assert_eq!(manager.active_id(), Some(&id("2")));
        assert!(!manager.close_tab(&id("1")));
    }

    #[test]
    fn edit_without_active_tab_only_changes_display() {
        let mut tree = FileTree::sample();
        let mut manager = SessionManager::new();
        assert!(!manager.edit_active_content(&mut tree, "scratch"));
        assert_eq!(manager.displayed_content(), "scratch");
        assert_eq!(tree, FileTree::sample());
    }

    #[test]
    fn cascade_close_falls_back_once() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        open(&mut manager, &tree, "1");
        open(&mut manager, &tree, "4");
        let closed = manager.cascade_close(&[id("3"), id("4")]);
        assert_eq!(closed, 1);
        assert_eq!(manager.active_id(), Some(&id("1")));
    }

    #[test]
    fn rename_sync_preserves_order() {
        let tree = FileTree::sample();
        let mut manager = SessionManager::new();
        open(&mut manager, &tree, "1");
        open(&mut manager, &tree, "2");
        assert!(manager.sync_name(&id("1"), "server.js"));
        let names: Vec<_> = manager.sessions().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["server.js", "main.js"]);
        assert_eq!(manager.sessions()[0].id, id("1"));
    }

    #[test]
    fn from_parts_drops_unknown_active_and_surfaces_content() {
        let session = Session {
            id: id("1"),
            name: "app.js".into(),
            content: "//restored".into(),
            kind: EntryKind::File,
        };
        let manager = SessionManager::from_parts(
            vec![session.clone()],
            Some(id("1")),
            "stale".into(),
        );
        assert_eq!(manager.displayed_content(), "//restored");

        let manager = SessionManager::from_parts(vec![session], Some(id("9")), "kept".into());
        assert_eq!(manager.active_id(), None);
        assert_eq!(manager.displayed_content(), "kept");
    }

    #[test]
    fn restore_drops_orphans_before_resolving_active() {
        let tree = FileTree::sample();
        let tab = |value: &str, content: &str| Session {
            id: id(value),
            name: format!("{value}.js"),
            content: content.into(),
            kind: EntryKind::File,
        };
        let manager = SessionManager::restore(
            &tree,
            vec![tab("1", "//one"), tab("gone", "//x"), tab("3", "//folder")],
            Some(id("gone")),
            "//x".into(),
        );
        let ids: Vec<_> = manager.sessions().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![id("1")]);
        assert_eq!(manager.active_id(), None);
        assert_eq!(manager.displayed_content(), "//x");
    }

    #[test]
    fn restore_keeps_one_tab_per_file() {
        let tree = FileTree::sample();
        let tab = |value: &str, content: &str| Session {
            id: id(value),
            name: format!("{value}.js"),
            content: content.into(),
            kind: EntryKind::File,
        };
        let mut manager = SessionManager::restore(
            &tree,
            vec![tab("1", "//first"), tab("1", "//again"), tab("2", "//two")],
            Some(id("1")),
            String::new(),
        );
        let ids: Vec<_> = manager.sessions().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![id("1"), id("2")]);
        assert_eq!(manager.displayed_content(), "//first");

        assert!(manager.close_tab(&id("1")));
        assert!(manager.get(&id("1")).is_none());
        assert_eq!(manager.active_id(), Some(&id("2")));
        assert_eq!(manager.displayed_content(), "//two");
    }

    #[test]
    fn session_reads_stored_tab_payload() {
        let payload = r#"{"id":"1","name":"app.js","content":"//a","type":"file","path":"app.js"}"#;
        let session: Session = serde_json::from_str(payload).unwrap();
        assert_eq!(session.kind, EntryKind::File);
        assert_eq!(session.content, "//a");
    }
}
