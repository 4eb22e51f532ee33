use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, info};

use editore_project::{
    archive_name, export_file, export_project, export_subtree, ArchiveEntry, ArchiveError,
    ArchiveWriter, DuplicateScope, EntryKind, FileTree, NodeId, SessionManager, TreeDiff,
    NEW_FILE_CONTENT,
};
use editore_runexec::{
    evaluate, CapturedConsole, LiveEvaluator, OutputEntry, OutputLog, ScriptRunner,
    DEFAULT_LIVE_DELAY,
};
use editore_settings::{KeyValueStore, Preferences, PreferencesError, Theme};

use crate::editor::{EditorEvent, EditorView, TextEditor};
use crate::persistence::{PersistenceAdapter, RestoredState};
use crate::preview::{PreviewPane, PreviewSource, PreviewState};

/// Host-level knobs that are not user preferences.
/// 工作台層級的設定（非使用者偏好）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbenchConfig {
    /// Quiet period between the last edit and a live evaluation.
    pub live_delay: Duration,
    pub duplicate_scope: DuplicateScope,
    /// Content of files created from the tree view.
    pub new_file_content: String,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            live_delay: DEFAULT_LIVE_DELAY,
            duplicate_scope: DuplicateScope::default(),
            new_file_content: NEW_FILE_CONTENT.to_string(),
        }
    }
}

/// A packaged download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArchive {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The owned editor state: project tree, open tabs, preferences and run
/// output, written through to `S` after every effective change.
///
/// Collaborators (script runner, editor widget, preview source, archive
/// writer) are borrowed per call and never stored.
/// 工作台狀態的唯一擁有者；每次變動後立即寫入持久化儲存。
#[derive(Debug)]
pub struct Workbench<S: KeyValueStore> {
    config: WorkbenchConfig,
    tree: FileTree,
    sessions: SessionManager,
    preferences: Preferences,
    persistence: PersistenceAdapter<S>,
    live: LiveEvaluator,
    output: String,
    history: OutputLog,
}

impl<S: KeyValueStore> Workbench<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, WorkbenchConfig::default())
    }

    /// Restores state from `store`, falling back per key to the defaults.
    pub fn with_config(store: S, config: WorkbenchConfig) -> Self {
        let persistence = PersistenceAdapter::new(store);
        let RestoredState {
            tree,
            sessions,
            preferences,
        } = persistence.restore();
        let tree = configure_tree(tree, &config);
        info!(
            nodes = tree.len(),
            tabs = sessions.sessions().len(),
            live_mode = preferences.live_mode,
            "workbench ready"
        );
        Self {
            live: LiveEvaluator::new(config.live_delay),
            config,
            tree,
            sessions,
            preferences,
            persistence,
            output: String::new(),
            history: OutputLog::new(),
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn displayed_content(&self) -> &str {
        self.sessions.displayed_content()
    }

    /// Latest run output, lines joined with `\n`.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn history(&self) -> &OutputLog {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn live_pending(&self) -> bool {
        self.live.is_pending()
    }

    // ---- tree ----

    pub fn create_node(
        &mut self,
        parent: Option<&NodeId>,
        kind: EntryKind,
        name: &str,
    ) -> TreeDiff {
        let diff = self.tree.create_node(parent, kind, name);
        self.persist_tree(&diff);
        diff
    }

    /// Deletes a node and closes every tab inside the removed subtree.
    pub fn delete_node(&mut self, id: &NodeId) -> TreeDiff {
        let diff = self.tree.delete_node(id);
        if diff.is_empty() {
            return diff;
        }
        let closed = self.sessions.cascade_close(&diff.removed);
        debug!(node = %id, removed = diff.removed.len(), closed, "deleted node");
        self.persistence.save_tree(&self.tree);
        if closed > 0 {
            self.persistence.save_sessions(&self.sessions);
        }
        diff
    }

    /// Renames a node and mirrors the final name into its open tab.
    pub fn rename_node(&mut self, id: &NodeId, new_name: &str) -> TreeDiff {
        let diff = self.tree.rename_node(id, new_name);
        if diff.is_empty() {
            return diff;
        }
        let renamed = self
            .tree
            .get(id)
            .map(|node| node.name().to_string())
            .unwrap_or_default();
        self.persistence.save_tree(&self.tree);
        if self.sessions.sync_name(id, &renamed) {
            self.persistence.save_sessions(&self.sessions);
        }
        diff
    }

    pub fn duplicate_node(&mut self, id: &NodeId) -> TreeDiff {
        let diff = self.tree.duplicate_node(id);
        self.persist_tree(&diff);
        diff
    }

    pub fn toggle_expanded(&mut self, id: &NodeId) -> TreeDiff {
        let diff = self.tree.toggle_expanded(id);
        self.persist_tree(&diff);
        diff
    }

    // ---- tabs ----

    /// Opens the file `id` in a tab, or re-activates its tab.
    pub fn open_file(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        let opened = self.sessions.open_file(node);
        if opened {
            self.persistence.save_sessions(&self.sessions);
        }
        opened
    }

    pub fn activate(&mut self, id: &NodeId) -> bool {
        let activated = self.sessions.activate(id);
        if activated {
            self.persistence.save_sessions(&self.sessions);
        }
        activated
    }

    pub fn close_tab(&mut self, id: &NodeId) -> bool {
        let closed = self.sessions.close_tab(id);
        if closed {
            self.persistence.save_sessions(&self.sessions);
        }
        closed
    }

    /// Applies an edit from the editor widget. With live mode on, the text is
    /// also scheduled for evaluation after the configured delay.
    pub fn edit(&mut self, text: &str, now: Instant) {
        if self.sessions.edit_active_content(&mut self.tree, text) {
            self.persistence.save_tree(&self.tree);
        }
        self.persistence.save_sessions(&self.sessions);
        if self.preferences.live_mode {
            self.live.schedule(text, now);
        }
    }

    pub fn handle_editor_event<E: TextEditor + ?Sized>(
        &mut self,
        event: EditorEvent,
        editor: &mut E,
        now: Instant,
    ) {
        match event {
            EditorEvent::Mounted => {
                debug!("editor mounted");
                editor.show(&self.editor_view());
            }
            EditorEvent::Changed(text) => self.edit(&text, now),
        }
    }

    pub fn editor_view(&self) -> EditorView {
        EditorView::new(
            self.sessions.displayed_content(),
            self.sessions.active().map(|session| session.name.as_str()),
            self.preferences.theme,
            &self.preferences.editor,
        )
    }

    // ---- preferences ----

    pub fn set_theme(&mut self, theme: Theme) {
        if self.preferences.theme != theme {
            self.preferences.theme = theme;
            self.persistence.save_preferences(&self.preferences);
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.preferences.theme.toggled());
        self.preferences.theme
    }

    /// Turning live mode off drops any pending evaluation.
    pub fn set_live_mode(&mut self, enabled: bool) {
        if !enabled {
            self.live.cancel();
        }
        if self.preferences.live_mode != enabled {
            self.preferences.live_mode = enabled;
            self.persistence.save_preferences(&self.preferences);
        }
    }

    /// Updates one editor setting, or all of them with the `"json"` key.
    pub fn apply_editor_setting(&mut self, key: &str, value: Value) -> Result<(), PreferencesError> {
        self.preferences.editor.apply(key, value)?;
        self.persistence.save_preferences(&self.preferences);
        Ok(())
    }

    // ---- evaluation ----

    /// Evaluates the displayed content now and replaces the output.
    pub fn run_active<R: ScriptRunner + ?Sized>(&mut self, runner: &mut R) -> &str {
        let source = self.sessions.displayed_content().to_string();
        self.live.cancel();
        self.evaluate_source(runner, &source);
        &self.output
    }

    /// Fires the pending live evaluation if its delay has elapsed. Returns
    /// whether the runner was invoked.
    pub fn poll_live<R: ScriptRunner + ?Sized>(&mut self, runner: &mut R, now: Instant) -> bool {
        match self.live.poll(now) {
            Some(source) => {
                self.evaluate_source(runner, &source);
                true
            }
            None => false,
        }
    }

    /// Evaluates one console expression and appends it to the history with
    /// its input. Blank input is ignored and the run output is left alone.
    /// 執行主控台輸入並連同輸入內容記錄於歷史。
    pub fn eval_console<R: ScriptRunner + ?Sized>(
        &mut self,
        runner: &mut R,
        input: &str,
    ) -> Option<&OutputEntry> {
        if input.trim().is_empty() {
            return None;
        }
        let mut console = CapturedConsole::new();
        let result = runner
            .run(input, &mut console)
            .map(|()| console.into_lines().join("\n"))
            .map_err(|err| err.to_string());
        debug!(failed = result.is_err(), "console input evaluated");
        self.history.record_console(input, result, unix_millis());
        self.history.latest()
    }

    fn evaluate_source<R: ScriptRunner + ?Sized>(&mut self, runner: &mut R, source: &str) {
        self.output = evaluate(runner, source).join("\n");
        self.history.record(self.output.clone(), unix_millis());
        debug!(bytes = self.output.len(), "evaluation finished");
    }

    // ---- export ----

    /// Single-file download entry.
    pub fn download_file(&self, id: &NodeId) -> Option<ArchiveEntry> {
        export_file(&self.tree, id)
    }

    /// Packages the project (`root = None`) or one subtree into an archive.
    /// Returns `Ok(None)` when `root` does not resolve.
    pub fn export_archive<W: ArchiveWriter + ?Sized>(
        &self,
        root: Option<&NodeId>,
        writer: &mut W,
    ) -> Result<Option<ExportedArchive>, ArchiveError> {
        let entries = match root {
            Some(id) if !self.tree.contains(id) => return Ok(None),
            Some(id) => export_subtree(&self.tree, id),
            None => export_project(&self.tree),
        };
        let bytes = writer.write_archive(&entries)?;
        Ok(Some(ExportedArchive {
            name: archive_name(&self.tree, root),
            bytes,
        }))
    }

    // ---- preview ----

    pub fn load_preview<'p, P: PreviewSource + ?Sized>(
        &self,
        pane: &'p mut PreviewPane,
        source: &mut P,
    ) -> &'p PreviewState {
        pane.load(source, self.preferences.theme)
    }

    // ---- reset ----

    /// Clears every stored key and returns to first-launch state.
    pub fn reset(&mut self) {
        self.persistence.clear();
        let RestoredState {
            tree,
            sessions,
            preferences,
        } = RestoredState::default();
        self.tree = configure_tree(tree, &self.config);
        self.sessions = sessions;
        self.preferences = preferences;
        self.live.cancel();
        self.output.clear();
        info!("workbench reset to defaults");
    }

    fn persist_tree(&mut self, diff: &TreeDiff) {
        if !diff.is_empty() {
            self.persistence.save_tree(&self.tree);
        }
    }
}

fn configure_tree(tree: FileTree, config: &WorkbenchConfig) -> FileTree {
    tree.with_duplicate_scope(config.duplicate_scope)
        .with_new_file_content(config.new_file_content.clone())
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use editore_settings::MemoryStore;

    fn id(value: &str) -> NodeId {
        NodeId::from(value)
    }

    #[test]
    fn rename_updates_open_tab_name() {
        let mut bench = Workbench::new(MemoryStore::new());
        bench.open_file(&id("2"));
        bench.rename_node(&id("2"), "server");
        assert_eq!(bench.sessions().get(&id("2")).unwrap().name, "server.js");
        assert_eq!(bench.editor_view().language, "javascript");
    }

    #[test]
    fn blank_rename_writes_nothing() {
        let mut bench = Workbench::new(MemoryStore::new());
        assert!(bench.rename_node(&id("1"), "   ").is_empty());
        assert!(bench.store().is_empty());
    }

    #[test]
    fn live_mode_off_cancels_pending_run() {
        let mut bench = Workbench::new(MemoryStore::new());
        bench.set_live_mode(true);
        bench.open_file(&id("1"));
        bench.edit("// typing", Instant::now());
        assert!(bench.live_pending());
        bench.set_live_mode(false);
        assert!(!bench.live_pending());
    }

    struct Doubler;

    impl ScriptRunner for Doubler {
        fn run(
            &mut self,
            source: &str,
            console: &mut dyn editore_runexec::Console,
        ) -> Result<(), editore_runexec::ScriptError> {
            let value: i64 = source.trim().parse().map_err(|_| {
                editore_runexec::ScriptError::Thrown(format!("{source} is not a number"))
            })?;
            console.log(&[Value::from(value * 2)]);
            Ok(())
        }
    }

    #[test]
    fn console_input_is_recorded_with_its_expression() {
        let mut bench = Workbench::new(MemoryStore::new());
        let mut runner = Doubler;
        assert!(bench.eval_console(&mut runner, "   ").is_none());

        let entry = bench.eval_console(&mut runner, "21").cloned().unwrap();
        assert_eq!(entry.text, "42");
        assert_eq!(entry.input.as_deref(), Some("21"));
        assert_eq!(entry.kind, editore_runexec::OutputKind::Log);

        let entry = bench.eval_console(&mut runner, "x").cloned().unwrap();
        assert_eq!(entry.kind, editore_runexec::OutputKind::Error);
        assert_eq!(entry.text, "x is not a number");
        assert_eq!(bench.history().len(), 2);
        assert_eq!(bench.output(), "", "console input leaves run output alone");
    }

    #[test]
    fn config_applies_to_restored_tree() {
        let config = WorkbenchConfig {
            duplicate_scope: DuplicateScope::Siblings,
            new_file_content: String::new(),
            ..WorkbenchConfig::default()
        };
        let mut bench = Workbench::with_config(MemoryStore::new(), config);
        assert_eq!(bench.tree().duplicate_scope(), DuplicateScope::Siblings);
        let created = bench.create_node(None, EntryKind::File, "blank").added[0].clone();
        assert_eq!(bench.tree().get(&created).unwrap().content(), Some(""));
    }
}
