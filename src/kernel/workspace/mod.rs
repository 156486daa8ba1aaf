//! 工作区会话：标签页、活动标签、按文件去抖的自动保存
//!
//! - 每个标签对应一条已持久化的文件记录，外加内存中的 `is_dirty`
//! - 自动保存是截止时间轮询：`mark_dirty` 只重置该文件自己的截止时间，
//!   `poll_autosave` 由宿主 tick 或异步驱动调用，到期即落盘
//! - 切换 / 关闭标签前先落盘，内容只有 autosave 与 replace 两条写入路径

mod events;
mod tab;

pub use events::{EventHub, WorkspaceEvent};
pub use tab::Tab;

use crate::kernel::services::ports::settings::DEFAULT_AUTOSAVE_DELAY_MS;
use crate::kernel::services::ports::storage::{Result, StoreError};
use crate::kernel::services::ports::{BufferHost, OpenTabSync, TemplateProvider};
use crate::kernel::storage::PersistentStore;
use crate::models::{
    unique_name, with_extension, FilePatch, FileRecord, FolderPatch, FolderRecord, ItemId,
    NewFile,
};
use rustc_hash::FxHashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub struct WorkspaceManager {
    store: Arc<PersistentStore>,
    templates: Arc<dyn TemplateProvider>,
    buffers: Arc<dyn BufferHost>,
    tabs: Vec<Tab>,
    active: Option<ItemId>,
    autosave_delay: Duration,
    pending_saves: FxHashMap<ItemId, Instant>,
    events: EventHub,
}

impl WorkspaceManager {
    pub fn new(
        store: Arc<PersistentStore>,
        templates: Arc<dyn TemplateProvider>,
        buffers: Arc<dyn BufferHost>,
    ) -> Self {
        Self {
            store,
            templates,
            buffers,
            tabs: Vec::new(),
            active: None,
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
            pending_saves: FxHashMap::default(),
            events: EventHub::new(),
        }
    }

    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<PersistentStore> {
        &self.store
    }

    pub fn autosave_delay(&self) -> Duration {
        self.autosave_delay
    }

    pub fn subscribe(&mut self) -> Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, file_id: &ItemId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id() == file_id)
    }

    pub fn active_file_id(&self) -> Option<&ItemId> {
        self.active.as_ref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.as_ref().and_then(|id| self.tab(id))
    }

    pub fn autosave_deadline(&self, file_id: &ItemId) -> Option<Instant> {
        self.pending_saves.get(file_id).copied()
    }

    /// Earliest pending autosave, if any.
    pub fn next_autosave_deadline(&self) -> Option<Instant> {
        self.pending_saves.values().min().copied()
    }

    // ---------------------------------------------------------------
    // lifecycle
    // ---------------------------------------------------------------

    /// Opens every stored file as a tab and restores the active one.
    ///
    /// Files without a language or version get the given defaults, persisted.
    /// `None` when the workspace has no files.
    pub fn init(&mut self, default_language: &str, default_version: &str) -> Result<Option<Tab>> {
        let files = self.store.get_all_files()?;
        let mut tabs = Vec::with_capacity(files.len());
        for mut file in files {
            if file.language.is_empty() || file.version.is_empty() {
                let patch = FilePatch {
                    language: file
                        .language
                        .is_empty()
                        .then(|| default_language.to_string()),
                    version: file
                        .version
                        .is_empty()
                        .then(|| default_version.to_string()),
                    ..FilePatch::default()
                };
                if let Some(updated) = self.store.update_file(&file.id, patch)? {
                    tracing::debug!(id = %file.id, language = %updated.language, "defaulted file language");
                    file = updated;
                }
            }
            tabs.push(Tab::new(file));
        }

        for tab in &self.tabs {
            self.buffers.dispose(tab.id());
        }
        self.pending_saves.clear();
        self.tabs = tabs;

        let state = self.store.get_workspace_state()?;
        let active = state
            .active_file_id
            .filter(|id| self.tab_index(id).is_some())
            .or_else(|| self.tabs.first().map(|t| t.id().clone()));
        self.active = active.clone();
        if let Some(tab) = self.active_tab() {
            self.buffers.get_or_create(&tab.file);
        }

        tracing::info!(tabs = self.tabs.len(), active = ?self.active, "workspace initialized");
        self.events.emit(WorkspaceEvent::TabsChanged);
        self.events.emit(WorkspaceEvent::TabSwitched(active));
        Ok(self.active_tab().cloned())
    }

    /// Creates a file seeded with the language starter and switches to it.
    ///
    /// The name defaults to the language's conventional file name and gets
    /// a `_1`, `_2`, … suffix when a sibling tab already uses it.
    pub fn create_new_file(
        &mut self,
        language: &str,
        version: &str,
        name: Option<&str>,
        parent_id: Option<&ItemId>,
    ) -> Result<Tab> {
        let base = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.templates.default_file_name(language),
        };
        let name = self.sibling_unique_name(&base, parent_id, None);
        let content = self
            .templates
            .starter(language, version)
            .unwrap_or_default();

        let file = self.store.create_file(
            NewFile::new(name)
                .with_language(language, version)
                .with_content(content),
            parent_id,
        )?;
        let tab = Tab::new(file);
        let id = tab.id().clone();
        self.tabs.push(tab.clone());

        self.events.emit(WorkspaceEvent::TabCreated(id.clone()));
        self.events.emit(WorkspaceEvent::TabsChanged);
        self.switch_to_tab(&id)?;
        Ok(tab)
    }

    /// Activates `file_id`, flushing the outgoing tab first. `None` if no
    /// tab is open for it.
    pub fn switch_to_tab(&mut self, file_id: &ItemId) -> Result<Option<Tab>> {
        let Some(index) = self.tab_index(file_id) else {
            return Ok(None);
        };
        if let Some(current) = self.active.clone() {
            if &current != file_id {
                self.flush(&current)?;
            }
        }

        self.active = Some(file_id.clone());
        self.buffers.get_or_create(&self.tabs[index].file);
        self.persist_active()?;

        tracing::debug!(id = %file_id, "tab switched");
        self.events
            .emit(WorkspaceEvent::TabSwitched(Some(file_id.clone())));
        Ok(Some(self.tabs[index].clone()))
    }

    /// Flushes, deletes the file and drops the tab. When it was active, the
    /// tab now at the same position (clamped) takes over.
    ///
    /// Returns the active tab afterwards; an unknown id changes nothing.
    pub fn close_tab(&mut self, file_id: &ItemId) -> Result<Option<Tab>> {
        let Some(index) = self.tab_index(file_id) else {
            return Ok(self.active_tab().cloned());
        };

        self.flush(file_id)?;
        self.store.delete_file(file_id)?;
        self.pending_saves.remove(file_id);
        let tab = self.tabs.remove(index);
        self.buffers.dispose(tab.id());

        tracing::info!(id = %file_id, name = %tab.name(), "tab closed");
        self.events.emit(WorkspaceEvent::TabClosed(file_id.clone()));
        self.events.emit(WorkspaceEvent::TabsChanged);

        if self.active.as_ref() == Some(file_id) {
            let next = self.tab_at_clamped(index);
            self.activate_after_removal(next)?;
        }
        Ok(self.active_tab().cloned())
    }

    pub fn rename_tab(&mut self, file_id: &ItemId, new_name: &str) -> Result<Option<Tab>> {
        let Some(index) = self.tab_index(file_id) else {
            return Ok(None);
        };
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == self.tabs[index].name() {
            return Ok(Some(self.tabs[index].clone()));
        }

        let parent = self.tabs[index].file.parent_id.clone();
        let name = self.sibling_unique_name(new_name, parent.as_ref(), Some(file_id));
        let Some(record) = self.store.update_file(file_id, FilePatch::rename(name))? else {
            tracing::warn!(id = %file_id, "renamed tab has no stored file");
            return Ok(None);
        };

        let tab = &mut self.tabs[index];
        tab.file.name = record.name;
        tab.file.path = record.path;
        tab.file.updated_at = record.updated_at;
        self.events.emit(WorkspaceEvent::TabUpdated(file_id.clone()));
        Ok(Some(tab.clone()))
    }

    // ---------------------------------------------------------------
    // editing / autosave
    // ---------------------------------------------------------------

    /// Records an edit and re-arms this tab's autosave deadline.
    pub fn mark_dirty(&mut self, file_id: &ItemId, content: impl Into<String>) -> bool {
        self.mark_dirty_at(file_id, content, Instant::now())
    }

    /// [`mark_dirty`](Self::mark_dirty) with an explicit edit time.
    pub fn mark_dirty_at(
        &mut self,
        file_id: &ItemId,
        content: impl Into<String>,
        now: Instant,
    ) -> bool {
        let Some(tab) = self.tabs.iter_mut().find(|t| t.id() == file_id) else {
            return false;
        };
        tab.file.content = content.into();
        tab.file.is_user_modified = true;
        tab.is_dirty = true;
        self.pending_saves
            .insert(file_id.clone(), now + self.autosave_delay);
        self.events.emit(WorkspaceEvent::TabUpdated(file_id.clone()));
        true
    }

    /// Flushes every tab whose autosave deadline is at or before `now`.
    pub fn poll_autosave(&mut self, now: Instant) -> Result<usize> {
        let due: Vec<ItemId> = self
            .pending_saves
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        if due.is_empty() {
            return Ok(0);
        }

        let mut flushed = 0usize;
        for id in &due {
            if let Some(deadline) = self.pending_saves.get(id) {
                let overshoot = now.duration_since(*deadline);
                if overshoot.as_millis() > 50 {
                    tracing::debug!(
                        id = %id,
                        overshoot_ms = overshoot.as_millis() as u64,
                        "autosave overshoot"
                    );
                }
            }
            if self.flush(id)? {
                flushed += 1;
            }
        }
        tracing::debug!(flushed, "autosave tick");
        Ok(flushed)
    }

    /// Writes the tab if dirty. `true` when something was persisted.
    pub fn save_tab(&mut self, file_id: &ItemId) -> Result<bool> {
        self.flush(file_id)
    }

    pub fn save_current_tab(&mut self) -> Result<bool> {
        match self.active.clone() {
            Some(id) => self.flush(&id),
            None => Ok(false),
        }
    }

    pub fn save_all(&mut self) -> Result<usize> {
        let dirty: Vec<ItemId> = self
            .tabs
            .iter()
            .filter(|t| t.is_dirty)
            .map(|t| t.id().clone())
            .collect();
        let mut saved = 0usize;
        for id in &dirty {
            if self.flush(id)? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Switches language/version and swaps the name's extension. Supplied
    /// content replaces the body and resets `is_user_modified`.
    pub fn update_tab_language(
        &mut self,
        file_id: &ItemId,
        language: &str,
        version: &str,
        new_content: Option<&str>,
    ) -> Result<Option<Tab>> {
        let Some(index) = self.tab_index(file_id) else {
            return Ok(None);
        };

        let renamed = with_extension(self.tabs[index].name(), self.templates.extension(language));
        let parent = self.tabs[index].file.parent_id.clone();
        let name = self.sibling_unique_name(&renamed, parent.as_ref(), Some(file_id));
        let mut patch = FilePatch {
            name: Some(name),
            language: Some(language.to_string()),
            version: Some(version.to_string()),
            ..FilePatch::default()
        };
        if let Some(content) = new_content {
            patch.content = Some(content.to_string());
            patch.is_user_modified = Some(false);
        }

        let Some(record) = self.store.update_file(file_id, patch)? else {
            tracing::warn!(id = %file_id, "tab has no stored file");
            return Ok(None);
        };

        let tab = &mut self.tabs[index];
        tab.file.name = record.name;
        tab.file.path = record.path;
        tab.file.language = record.language;
        tab.file.version = record.version;
        tab.file.updated_at = record.updated_at;
        if let Some(content) = new_content {
            tab.file.content = content.to_string();
            tab.file.is_user_modified = false;
            tab.is_dirty = false;
            self.pending_saves.remove(file_id);
            self.buffers.set_content(file_id, content);
        }

        tracing::info!(id = %file_id, language, version, "tab language changed");
        self.events.emit(WorkspaceEvent::TabUpdated(file_id.clone()));
        Ok(Some(tab.clone()))
    }

    /// Whether the tab holds real user work. A flagged tab whose content
    /// still equals the starter (ignoring surrounding whitespace) is
    /// corrected to unmodified.
    pub fn is_tab_user_modified(&mut self, file_id: &ItemId) -> Result<bool> {
        let Some(index) = self.tab_index(file_id) else {
            return Ok(false);
        };
        let tab = &self.tabs[index];
        if !tab.file.is_user_modified {
            return Ok(false);
        }
        let Some(starter) = self.templates.starter(&tab.file.language, &tab.file.version) else {
            return Ok(true);
        };
        if starter.trim() != tab.content().trim() {
            return Ok(true);
        }

        self.tabs[index].file.is_user_modified = false;
        self.store.update_file(
            file_id,
            FilePatch {
                is_user_modified: Some(false),
                ..FilePatch::default()
            },
        )?;
        tracing::debug!(id = %file_id, "content matches starter, cleared modified flag");
        Ok(false)
    }

    /// Adopts content already persisted by someone else (search & replace).
    pub fn sync_external_content(&mut self, file_id: &ItemId, content: &str) -> bool {
        let Some(tab) = self.tabs.iter_mut().find(|t| t.id() == file_id) else {
            return false;
        };
        tab.file.content = content.to_string();
        tab.is_dirty = false;
        self.pending_saves.remove(file_id);
        self.buffers.set_content(file_id, content);
        self.events.emit(WorkspaceEvent::TabUpdated(file_id.clone()));
        true
    }

    // ---------------------------------------------------------------
    // folders
    // ---------------------------------------------------------------

    pub fn create_folder(&mut self, name: &str, parent_id: Option<&ItemId>) -> Result<FolderRecord> {
        self.store.create_folder(name, parent_id)
    }

    /// Renames a folder; open tabs beneath it pick up their new paths.
    pub fn rename_folder(&mut self, folder_id: &ItemId, new_name: &str) -> Result<Option<FolderRecord>> {
        let updated = self
            .store
            .update_folder(folder_id, FolderPatch::rename(new_name))?;
        if updated.is_some() {
            self.reconcile_with_store()?;
        }
        Ok(updated)
    }

    pub fn move_folder(
        &mut self,
        folder_id: &ItemId,
        parent_id: Option<&ItemId>,
    ) -> Result<Option<FolderRecord>> {
        let patch = FolderPatch {
            parent_id: Some(parent_id.cloned()),
            ..FolderPatch::default()
        };
        let updated = self.store.update_folder(folder_id, patch)?;
        if updated.is_some() {
            self.reconcile_with_store()?;
        }
        Ok(updated)
    }

    /// Deletes a folder subtree; tabs of deleted files are dropped unsaved.
    pub fn delete_folder(&mut self, folder_id: &ItemId) -> Result<bool> {
        let deleted = self.store.delete_folder(folder_id)?;
        if deleted {
            self.reconcile_with_store()?;
        }
        Ok(deleted)
    }

    // ---------------------------------------------------------------
    // internals
    // ---------------------------------------------------------------

    fn tab_index(&self, file_id: &ItemId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == file_id)
    }

    fn tab_at_clamped(&self, index: usize) -> Option<ItemId> {
        if self.tabs.is_empty() {
            return None;
        }
        Some(self.tabs[index.min(self.tabs.len() - 1)].id().clone())
    }

    fn sibling_unique_name(
        &self,
        name: &str,
        parent_id: Option<&ItemId>,
        exclude: Option<&ItemId>,
    ) -> String {
        unique_name(
            name,
            self.tabs
                .iter()
                .filter(|t| t.parent_id() == parent_id && Some(t.id()) != exclude)
                .map(Tab::name),
        )
    }

    fn flush(&mut self, file_id: &ItemId) -> Result<bool> {
        let Some(index) = self.tab_index(file_id) else {
            self.pending_saves.remove(file_id);
            return Ok(false);
        };
        if !self.tabs[index].is_dirty {
            self.pending_saves.remove(file_id);
            return Ok(false);
        }

        let tab = &self.tabs[index];
        let patch = FilePatch {
            content: Some(tab.file.content.clone()),
            is_user_modified: Some(tab.file.is_user_modified),
            ..FilePatch::default()
        };
        let bytes = tab.file.content.len();
        let record = self.store.update_file(file_id, patch)?;

        let tab = &mut self.tabs[index];
        match record {
            Some(record) => tab.file.updated_at = record.updated_at,
            None => tracing::warn!(id = %file_id, "flushed tab has no stored file"),
        }
        tab.is_dirty = false;
        self.pending_saves.remove(file_id);

        tracing::debug!(id = %file_id, bytes, "tab flushed");
        self.events.emit(WorkspaceEvent::TabUpdated(file_id.clone()));
        Ok(true)
    }

    fn persist_active(&self) -> Result<()> {
        let mut state = self.store.get_workspace_state()?;
        state.active_file_id = self.active.clone();
        self.store.save_workspace_state(&state)
    }

    fn activate_after_removal(&mut self, next: Option<ItemId>) -> Result<()> {
        self.active = next.clone();
        if let Some(tab) = self.active_tab() {
            self.buffers.get_or_create(&tab.file);
        }
        self.persist_active()?;
        self.events.emit(WorkspaceEvent::TabSwitched(next));
        Ok(())
    }

    /// Re-reads file records after a folder change: paths are refreshed and
    /// tabs whose file no longer exists are dropped.
    fn reconcile_with_store(&mut self) -> Result<()> {
        let records: FxHashMap<ItemId, FileRecord> = self
            .store
            .get_all_files()?
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();
        let active_index = self.active.as_ref().and_then(|id| self.tab_index(id));

        let mut kept = Vec::with_capacity(self.tabs.len());
        let mut removed = Vec::new();
        let mut moved = Vec::new();
        for (index, mut tab) in std::mem::take(&mut self.tabs).into_iter().enumerate() {
            match records.get(tab.id()) {
                Some(record) => {
                    if tab.file.path != record.path {
                        tab.file.path = record.path.clone();
                        tab.file.parent_id = record.parent_id.clone();
                        moved.push(tab.id().clone());
                    }
                    kept.push(tab);
                }
                None => removed.push((index, tab)),
            }
        }
        self.tabs = kept;

        for id in moved {
            self.events.emit(WorkspaceEvent::TabUpdated(id));
        }
        if removed.is_empty() {
            return Ok(());
        }

        let mut active_removed = false;
        let mut removed_before_active = 0usize;
        for (index, tab) in &removed {
            if tab.is_dirty {
                tracing::warn!(id = %tab.id(), "discarding unsaved tab of deleted file");
            }
            self.pending_saves.remove(tab.id());
            self.buffers.dispose(tab.id());
            if Some(*index) == active_index {
                active_removed = true;
            } else if active_index.is_some_and(|a| *index < a) {
                removed_before_active += 1;
            }
            self.events.emit(WorkspaceEvent::TabClosed(tab.id().clone()));
        }
        self.events.emit(WorkspaceEvent::TabsChanged);
        tracing::info!(closed = removed.len(), "tabs closed with their folder");

        if active_removed {
            let position = active_index.unwrap_or(0) - removed_before_active;
            let next = self.tab_at_clamped(position);
            self.activate_after_removal(next)?;
        }
        Ok(())
    }
}

impl OpenTabSync for Mutex<WorkspaceManager> {
    fn flush_if_dirty(&self, file_id: &ItemId) -> Result<bool> {
        self.lock()
            .map_err(|_| StoreError::StorageUnavailable("workspace lock poisoned".into()))?
            .save_tab(file_id)
    }

    fn flush_all_dirty(&self) -> Result<usize> {
        self.lock()
            .map_err(|_| StoreError::StorageUnavailable("workspace lock poisoned".into()))?
            .save_all()
    }

    fn sync_external_content(&self, file_id: &ItemId, content: &str) -> bool {
        match self.lock() {
            Ok(mut workspace) => workspace.sync_external_content(file_id, content),
            Err(_) => {
                tracing::warn!(id = %file_id, "workspace lock poisoned, tab not synced");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/workspace/mod.rs"]
mod tests;
