use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::model::{FavoriteEntity, FavoriteId, FavoritesDocument};
use crate::paths;
use crate::storage::{state_file_path, DocumentStore};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by [`FavoritesStore::subscribe`], used to detach the
/// observer again.
/// 訂閱變更通知時取得的代號，用於之後取消訂閱。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ChangeObserver = Box<dyn Fn() + Send>;

/// The authoritative favorites tree for one workspace at a time, with
/// its mutation API, persistence, and change notification.
///
/// Persistence and path failures never surface to callers: loads
/// degrade to an empty document and saves are skipped, with a warning
/// on the `log` facade in both cases. Invalid mutations (cyclic moves,
/// blank names, unknown ids) are silent no-ops. Observers receive no
/// payload and are invoked on the mutating thread; marshaling to a UI
/// context is the caller's concern.
/// 單一工作區的最愛樹狀資料，含操作介面、持久化與變更通知。
pub struct FavoritesStore {
    document: FavoritesDocument,
    workspace_dir: Option<PathBuf>,
    file_store: Option<DocumentStore>,
    observers: Vec<(SubscriptionId, ChangeObserver)>,
}

impl Default for FavoritesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesStore {
    /// Constructs an empty store bound to no workspace.
    /// 建立尚未綁定工作區的空儲存庫。
    pub fn new() -> Self {
        Self {
            document: FavoritesDocument::new(),
            workspace_dir: None,
            file_store: None,
            observers: Vec::new(),
        }
    }

    /// Loads favorites for the workspace identified by `workspace_path`
    /// (the workspace's identifying file). A missing or unreadable
    /// persisted file yields an empty document. Notifies observers.
    /// 載入指定工作區的最愛清單；檔案缺漏或毀損時以空文件開始。
    pub fn load_for_workspace(&mut self, workspace_path: impl AsRef<Path>) {
        let workspace_path = workspace_path.as_ref();
        self.workspace_dir = workspace_path.parent().map(Path::to_path_buf);
        self.file_store = state_file_path(workspace_path).map(DocumentStore::new);
        self.document = FavoritesDocument::new();

        if let Some(file_store) = &self.file_store {
            match file_store.load() {
                Ok(Some(document)) => {
                    debug!(
                        "loaded {} favorite roots from {}",
                        document.roots.len(),
                        file_store.path().display()
                    );
                    self.document = document;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "failed to load favorites from {}, starting empty: {err}",
                        file_store.path().display()
                    );
                }
            }
        }

        self.notify();
    }

    /// Writes the current document to disk. Failures are logged and
    /// swallowed; favorites must never interrupt the user's workflow.
    /// 將目前文件寫入磁碟；失敗時僅記錄警告。
    pub fn save(&self) {
        let Some(file_store) = &self.file_store else {
            return;
        };
        if let Err(err) = file_store.save(&self.document) {
            warn!(
                "failed to save favorites to {}: {err}",
                file_store.path().display()
            );
        }
    }

    /// Discards the in-memory document and forgets the workspace,
    /// without writing. Notifies observers.
    /// 捨棄記憶體中的文件並忘記工作區路徑，不進行寫入。
    pub fn clear(&mut self) {
        self.document = FavoritesDocument::new();
        self.workspace_dir = None;
        self.file_store = None;
        self.notify();
    }

    /// The directory of the currently loaded workspace, if any.
    /// 目前載入工作區的根目錄。
    pub fn workspace_dir(&self) -> Option<&Path> {
        self.workspace_dir.as_deref()
    }

    /// Root entities ordered by sort key, then name case-insensitively.
    /// 取得根層級項目（依排序鍵與名稱排序）。
    pub fn get_root_items(&self) -> Vec<FavoriteEntity> {
        self.document.sorted_roots().into_iter().cloned().collect()
    }

    /// Ordered children of a folder; empty for unknown ids or files.
    /// 取得資料夾的排序子項目；識別碼無效時回傳空集合。
    pub fn get_children(&self, folder: FavoriteId) -> Vec<FavoriteEntity> {
        match self.document.find(folder) {
            Some(entity) => entity.sorted_children().into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn get_item(&self, id: FavoriteId) -> Option<&FavoriteEntity> {
        self.document.find(id)
    }

    pub fn has_favorites(&self) -> bool {
        !self.document.roots.is_empty()
    }

    /// Resolves a stored path to absolute form against the current
    /// workspace.
    /// 依目前工作區將儲存的路徑還原為絕對路徑。
    pub fn to_absolute_path(&self, stored: &Path) -> PathBuf {
        match &self.workspace_dir {
            Some(root) => paths::to_absolute(stored, root),
            None => stored.to_path_buf(),
        }
    }

    fn to_relative_path(&self, absolute: &Path) -> PathBuf {
        match &self.workspace_dir {
            Some(root) => paths::to_relative(absolute, root),
            None => absolute.to_path_buf(),
        }
    }

    /// Whether the file is favorited anywhere in the document. Both the
    /// stored form and the resolved absolute form of every file entity
    /// are compared, case-insensitively.
    /// 檢查檔案是否已存在於最愛清單的任何位置。
    pub fn is_file_favorited(&self, absolute: &Path) -> bool {
        let relative = self.to_relative_path(absolute);
        self.document.files().into_iter().any(|entity| {
            let Some(stored) = entity.file_path() else {
                return false;
            };
            paths_match(stored, &relative) || paths_match(&self.to_absolute_path(stored), absolute)
        })
    }

    /// Adds a file as a new root entity. Returns `None` without mutating
    /// when the file is already favorited anywhere in the tree.
    /// 將檔案加入根層級；若任一處已收藏則不做任何事。
    pub fn add_file(&mut self, absolute: &Path) -> Option<FavoriteEntity> {
        self.add_file_at(absolute, None)
    }

    /// Adds a file as the last child of `folder`. Same dedup rule as
    /// [`FavoritesStore::add_file`].
    /// 將檔案加入指定資料夾末端；重複收藏時不做任何事。
    pub fn add_file_to_folder(
        &mut self,
        absolute: &Path,
        folder: FavoriteId,
    ) -> Option<FavoriteEntity> {
        self.add_file_at(absolute, Some(folder))
    }

    fn add_file_at(
        &mut self,
        absolute: &Path,
        folder: Option<FavoriteId>,
    ) -> Option<FavoriteEntity> {
        if self.is_file_favorited(absolute) {
            return None;
        }
        let mut entity = FavoriteEntity::new_file(self.to_relative_path(absolute));
        let siblings = self.siblings_mut(folder)?;
        entity.sort_order = siblings.len() as i32;
        siblings.push(entity.clone());
        self.save();
        self.notify();
        Some(entity)
    }

    /// Creates an empty folder at the root level.
    /// 在根層級建立空資料夾。
    pub fn create_folder(&mut self, name: &str) -> Option<FavoriteEntity> {
        self.create_folder_at(name, None)
    }

    /// Creates an empty folder inside `parent`.
    /// 在指定資料夾內建立空資料夾。
    pub fn create_folder_in(&mut self, name: &str, parent: FavoriteId) -> Option<FavoriteEntity> {
        self.create_folder_at(name, Some(parent))
    }

    fn create_folder_at(&mut self, name: &str, parent: Option<FavoriteId>) -> Option<FavoriteEntity> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut entity = FavoriteEntity::new_folder(name);
        let siblings = self.siblings_mut(parent)?;
        entity.sort_order = siblings.len() as i32;
        siblings.push(entity.clone());
        self.save();
        self.notify();
        Some(entity)
    }

    /// Updates an entity's display name. Blank names and unknown ids
    /// are no-ops.
    /// 更新顯示名稱；空白名稱或無效識別碼時不做任何事。
    pub fn rename(&mut self, id: FavoriteId, new_name: &str) {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return;
        }
        let Some(entity) = self.document.find_mut(id) else {
            return;
        };
        if entity.name == new_name {
            return;
        }
        entity.name = new_name.to_string();
        self.save();
        self.notify();
    }

    /// Removes an entity from wherever it resides; folders take their
    /// entire subtree with them. Unknown ids are no-ops.
    /// 移除項目；資料夾會連同整棵子樹一併移除。
    pub fn remove(&mut self, id: FavoriteId) {
        if self.document.detach(id).is_none() {
            return;
        }
        self.save();
        self.notify();
    }

    /// Reparents an entity as the last child of `target` (or as the last
    /// root when `target` is `None`). A move that would make a folder a
    /// child of its own subtree is rejected, as is a non-folder target.
    /// Returns whether the tree changed.
    /// 搬移項目至指定資料夾或根層級末端；會造成循環的搬移一律拒絕。
    pub fn move_item(&mut self, id: FavoriteId, target: Option<FavoriteId>) -> bool {
        if let Some(target_id) = target {
            match self.document.find(target_id) {
                Some(entity) if entity.is_folder() => {}
                _ => return false,
            }
            // Walk the item's own subtree for the target; that covers
            // the self-move case as well.
            match self.document.find(id) {
                Some(item) if !item.contains(target_id) => {}
                _ => return false,
            }
        }

        let Some(mut item) = self.document.detach(id) else {
            return false;
        };
        if let Some(siblings) = self.siblings_mut(target) {
            item.sort_order = siblings.len() as i32;
            siblings.push(item);
            self.save();
            self.notify();
            return true;
        }
        // Unreachable: the target was validated before the detach and
        // lies outside the detached subtree.
        self.document.roots.push(item);
        false
    }

    /// Imports a directory on disk: creates a folder named after it,
    /// adds every file inside, and recurses so subdirectories become
    /// nested folders. Already-favorited files are skipped by the usual
    /// dedup rule.
    /// 匯入磁碟上的目錄：建立同名資料夾並遞迴加入其中的檔案。
    pub fn import_directory(&mut self, absolute_dir: &Path) -> Option<FavoriteEntity> {
        let name = absolute_dir.file_name()?.to_string_lossy().into_owned();
        let folder = self.create_folder(&name)?;
        self.import_into(absolute_dir, folder.id);
        self.document.find(folder.id).cloned()
    }

    fn import_into(&mut self, dir: &Path, folder: FavoriteId) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("failed to read directory {}: {err}", dir.display());
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                let Some(name) = path.file_name().map(|base| base.to_string_lossy().into_owned())
                else {
                    continue;
                };
                if let Some(subfolder) = self.create_folder_in(&name, folder) {
                    self.import_into(&path, subfolder.id);
                }
            } else if path.is_file() {
                let _ = self.add_file_to_folder(&path, folder);
            }
        }
    }

    /// Registers a change observer. Observers fire after every
    /// successful mutation and after load/clear, with no payload;
    /// subscribers re-pull state through the getters.
    /// 註冊變更觀察者；通知不含內容，訂閱端自行重新讀取。
    pub fn subscribe(&mut self, observer: impl Fn() + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Detaches a previously registered observer.
    /// 取消先前註冊的觀察者。
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(existing, _)| *existing != id);
    }

    fn notify(&self) {
        for (_, observer) in &self.observers {
            observer();
        }
    }

    fn siblings_mut(&mut self, parent: Option<FavoriteId>) -> Option<&mut Vec<FavoriteEntity>> {
        match parent {
            None => Some(&mut self.document.roots),
            Some(id) => self
                .document
                .find_mut(id)
                .and_then(FavoriteEntity::folder_children_mut),
        }
    }
}

fn paths_match(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn open_store(workspace_dir: &Path) -> FavoritesStore {
        let mut store = FavoritesStore::new();
        store.load_for_workspace(workspace_dir.join("demo.ws"));
        store
    }

    #[test]
    fn add_file_deduplicates_across_path_forms() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let first = store.add_file(&dir.path().join("src/a.txt"));
        assert!(first.is_some());
        assert_eq!(first.unwrap().file_path(), Some(Path::new("src/a.txt")));

        assert!(store.add_file(&dir.path().join("src/a.txt")).is_none());
        assert!(store.add_file(&dir.path().join("SRC/A.TXT")).is_none());
        assert_eq!(store.get_root_items().len(), 1);
    }

    #[test]
    fn files_outside_the_workspace_are_stored_absolute() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let outside = Path::new("/shared/tools/readme.md");
        let entity = store.add_file(outside).unwrap();
        assert_eq!(entity.file_path(), Some(outside));
        assert!(store.is_file_favorited(outside));
    }

    #[test]
    fn folder_scenario_orders_children_by_insertion() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let notes = store.create_folder("Notes").unwrap();
        store
            .add_file_to_folder(&dir.path().join("a.txt"), notes.id)
            .unwrap();
        let children = store.get_children(notes.id);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "a.txt");
        assert_eq!(children[0].sort_order, 0);

        store
            .add_file_to_folder(&dir.path().join("b.txt"), notes.id)
            .unwrap();
        let children = store.get_children(notes.id);
        assert_eq!(
            children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["a.txt", "b.txt"]
        );
        assert_eq!(
            children.iter().map(|c| c.sort_order).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn removing_a_folder_removes_its_entire_subtree() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let keep = store.add_file(&dir.path().join("keep.txt")).unwrap();
        let outer = store.create_folder("outer").unwrap();
        let inner = store.create_folder_in("inner", outer.id).unwrap();
        let nested = store
            .add_file_to_folder(&dir.path().join("nested.txt"), inner.id)
            .unwrap();

        store.remove(outer.id);
        let roots = store.get_root_items();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, keep.id);
        assert!(store.get_item(inner.id).is_none());
        assert!(store.get_item(nested.id).is_none());
        assert!(store.get_children(inner.id).is_empty());
        assert!(!store.is_file_favorited(&dir.path().join("nested.txt")));
    }

    #[test]
    fn moving_a_folder_into_its_own_descendant_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let outer = store.create_folder("outer").unwrap();
        let inner = store.create_folder_in("inner", outer.id).unwrap();

        assert!(!store.move_item(outer.id, Some(inner.id)));
        assert!(!store.move_item(outer.id, Some(outer.id)));

        let roots = store.get_root_items();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, outer.id);
        assert_eq!(store.get_children(outer.id)[0].id, inner.id);
    }

    #[test]
    fn move_appends_at_the_destination_end() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let first = store.add_file(&dir.path().join("one.txt")).unwrap();
        let second = store.add_file(&dir.path().join("two.txt")).unwrap();
        let folder = store.create_folder("bucket").unwrap();

        assert!(store.move_item(first.id, Some(folder.id)));
        assert!(store.move_item(second.id, Some(folder.id)));
        let children = store.get_children(folder.id);
        assert_eq!(children[0].id, first.id);
        assert_eq!(children[1].id, second.id);

        assert!(store.move_item(first.id, None));
        let roots = store.get_root_items();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().any(|root| root.id == first.id));
        assert_eq!(store.get_children(folder.id).len(), 1);
    }

    #[test]
    fn move_into_a_file_target_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let file = store.add_file(&dir.path().join("a.txt")).unwrap();
        let folder = store.create_folder("bucket").unwrap();
        assert!(!store.move_item(folder.id, Some(file.id)));
        assert_eq!(store.get_root_items().len(), 2);
    }

    #[test]
    fn malformed_persisted_file_yields_an_empty_usable_document() {
        let dir = tempdir().unwrap();
        let state_path = state_file_path(&dir.path().join("demo.ws")).unwrap();
        fs::create_dir_all(state_path.parent().unwrap()).unwrap();
        fs::write(&state_path, "{{ definitely not json").unwrap();

        let mut store = open_store(dir.path());
        assert!(!store.has_favorites());

        store.add_file(&dir.path().join("a.txt")).unwrap();
        let reloaded = open_store(dir.path());
        assert_eq!(reloaded.get_root_items().len(), 1);
    }

    #[test]
    fn mutations_persist_across_store_instances() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());

        let notes = store.create_folder("Notes").unwrap();
        store
            .add_file_to_folder(&dir.path().join("a.txt"), notes.id)
            .unwrap();
        store.add_file(&dir.path().join("root.txt")).unwrap();

        let reloaded = open_store(dir.path());
        let roots = reloaded.get_root_items();
        assert_eq!(roots.len(), 2);
        assert_eq!(reloaded.get_children(notes.id)[0].name, "a.txt");
    }

    #[test]
    fn clear_forgets_the_workspace_without_writing() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());
        store.add_file(&dir.path().join("a.txt")).unwrap();

        store.clear();
        assert!(!store.has_favorites());
        assert!(store.workspace_dir().is_none());
        // The previously saved document is untouched by clear.
        let reloaded = open_store(dir.path());
        assert_eq!(reloaded.get_root_items().len(), 1);
    }

    #[test]
    fn observers_fire_on_load_mutations_and_clear() {
        let dir = tempdir().unwrap();
        let mut store = FavoritesStore::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&counter);
        let subscription = store.subscribe(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        store.load_for_workspace(dir.path().join("demo.ws"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        store.add_file(&dir.path().join("a.txt")).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // Rejected mutations notify nobody.
        assert!(store.create_folder("   ").is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        store.clear();
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        store.unsubscribe(subscription);
        store.load_for_workspace(dir.path().join("demo.ws"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn blank_folder_names_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());
        assert!(store.create_folder("   ").is_none());
        assert!(!store.has_favorites());
    }

    #[test]
    fn rename_trims_and_ignores_blank_names() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path());
        let folder = store.create_folder("Notes").unwrap();

        store.rename(folder.id, "  Journal  ");
        assert_eq!(store.get_item(folder.id).unwrap().name, "Journal");

        store.rename(folder.id, "   ");
        assert_eq!(store.get_item(folder.id).unwrap().name, "Journal");
    }

    #[test]
    fn import_directory_mirrors_the_disk_layout() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.rs"), "fn a() {}").unwrap();
        fs::write(src.join("sub/b.rs"), "fn b() {}").unwrap();

        let mut store = open_store(dir.path());
        let imported = store.import_directory(&src).unwrap();
        assert_eq!(imported.name, "src");

        let children = store.get_children(imported.id);
        assert_eq!(children.len(), 2);
        let file = children.iter().find(|c| !c.is_folder()).unwrap();
        assert_eq!(file.name, "a.rs");
        let sub = children.iter().find(|c| c.is_folder()).unwrap();
        assert_eq!(sub.name, "sub");
        assert_eq!(store.get_children(sub.id)[0].name, "b.rs");
    }
}
