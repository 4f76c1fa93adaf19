use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current favorites document format version.
pub const DOCUMENT_FORMAT_VERSION: u32 = 2;

/// Unique identifier assigned to each favorite entity.
/// 每個最愛項目的唯一識別碼。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteId(Uuid);

impl FavoriteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FavoriteId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// The kind of favorite entity.
/// 最愛項目的類型。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FavoriteKind {
    File {
        /// Workspace-relative when derivable, absolute otherwise.
        #[serde(rename = "filePath")]
        path: PathBuf,
    },
    Folder {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<FavoriteEntity>,
    },
}

impl FavoriteKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, FavoriteKind::Folder { .. })
    }
}

/// A pinned file or folder stored inside the favorites document.
/// 儲存在最愛文件中的檔案或資料夾項目。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntity {
    pub id: FavoriteId,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(flatten)]
    pub kind: FavoriteKind,
}

impl FavoriteEntity {
    /// Creates a file entity whose name defaults to the file's base name.
    /// 建立檔案項目；名稱預設為檔案的基底名稱。
    pub fn new_file(stored_path: PathBuf) -> Self {
        let name = stored_path
            .file_name()
            .map(|base| base.to_string_lossy().into_owned())
            .unwrap_or_else(|| stored_path.to_string_lossy().into_owned());
        Self {
            id: FavoriteId::new(),
            name,
            sort_order: 0,
            kind: FavoriteKind::File { path: stored_path },
        }
    }

    /// Creates an empty folder entity.
    /// 建立不含子項目的資料夾項目。
    pub fn new_folder(name: impl Into<String>) -> Self {
        Self {
            id: FavoriteId::new(),
            name: name.into(),
            sort_order: 0,
            kind: FavoriteKind::Folder {
                children: Vec::new(),
            },
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Returns the stored path for file entities.
    /// 取得檔案項目儲存的路徑。
    pub fn file_path(&self) -> Option<&Path> {
        match &self.kind {
            FavoriteKind::File { path } => Some(path),
            FavoriteKind::Folder { .. } => None,
        }
    }

    /// Children in storage order; empty for file entities.
    /// 依儲存順序取得子項目；檔案項目回傳空集合。
    pub fn children(&self) -> &[FavoriteEntity] {
        match &self.kind {
            FavoriteKind::Folder { children } => children,
            FavoriteKind::File { .. } => &[],
        }
    }

    /// Mutable child collection, available only on folders.
    /// 僅資料夾項目可取得的可變子項目集合。
    pub fn folder_children_mut(&mut self) -> Option<&mut Vec<FavoriteEntity>> {
        match &mut self.kind {
            FavoriteKind::Folder { children } => Some(children),
            FavoriteKind::File { .. } => None,
        }
    }

    /// Children ordered by sort key with a case-insensitive name tie-break.
    /// 依排序鍵與名稱（不分大小寫）排序的子項目。
    pub fn sorted_children(&self) -> Vec<&FavoriteEntity> {
        let mut ordered: Vec<&FavoriteEntity> = self.children().iter().collect();
        ordered.sort_by(|a, b| sibling_order(a, b));
        ordered
    }

    /// Whether `id` names this entity or any descendant of it.
    /// 判斷 `id` 是否為此項目本身或其任一子孫。
    pub fn contains(&self, id: FavoriteId) -> bool {
        if self.id == id {
            return true;
        }
        self.children().iter().any(|child| child.contains(id))
    }
}

/// Total sibling order: sort key first, case-insensitive name as tie-break.
/// 同層排序規則：先比排序鍵，再以名稱（不分大小寫）決定。
pub fn sibling_order(a: &FavoriteEntity, b: &FavoriteEntity) -> Ordering {
    a.sort_order
        .cmp(&b.sort_order)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// The persisted favorites root: format version plus the owned root entities.
/// 持久化的最愛文件：格式版本與其擁有的根項目。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoritesDocument {
    pub version: u32,
    #[serde(rename = "items", default)]
    pub roots: Vec<FavoriteEntity>,
}

impl Default for FavoritesDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesDocument {
    /// Constructs an empty document with the current format version.
    /// 建立採用最新格式版本的空文件。
    pub fn new() -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            roots: Vec::new(),
        }
    }

    /// Root entities ordered by the sibling order.
    /// 依同層排序規則排序的根項目。
    pub fn sorted_roots(&self) -> Vec<&FavoriteEntity> {
        let mut ordered: Vec<&FavoriteEntity> = self.roots.iter().collect();
        ordered.sort_by(|a, b| sibling_order(a, b));
        ordered
    }

    /// Finds an entity anywhere in the tree.
    /// 在整棵樹中尋找項目。
    pub fn find(&self, id: FavoriteId) -> Option<&FavoriteEntity> {
        find_in(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: FavoriteId) -> Option<&mut FavoriteEntity> {
        find_in_mut(&mut self.roots, id)
    }

    /// Removes an entity (and its subtree) from wherever it resides,
    /// returning it.
    /// 自所在位置移除項目（含子樹）並回傳。
    pub fn detach(&mut self, id: FavoriteId) -> Option<FavoriteEntity> {
        detach_from(&mut self.roots, id)
    }

    /// Every file entity in the tree, in depth-first order.
    /// 以深度優先順序列出樹中所有檔案項目。
    pub fn files(&self) -> Vec<&FavoriteEntity> {
        let mut out = Vec::new();
        collect_files(&self.roots, &mut out);
        out
    }
}

fn find_in(siblings: &[FavoriteEntity], id: FavoriteId) -> Option<&FavoriteEntity> {
    for entity in siblings {
        if entity.id == id {
            return Some(entity);
        }
        if let Some(found) = find_in(entity.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(siblings: &mut [FavoriteEntity], id: FavoriteId) -> Option<&mut FavoriteEntity> {
    for entity in siblings {
        if entity.id == id {
            return Some(entity);
        }
        if let FavoriteKind::Folder { children } = &mut entity.kind {
            if let Some(found) = find_in_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn detach_from(siblings: &mut Vec<FavoriteEntity>, id: FavoriteId) -> Option<FavoriteEntity> {
    if let Some(index) = siblings.iter().position(|entity| entity.id == id) {
        return Some(siblings.remove(index));
    }
    for entity in siblings.iter_mut() {
        if let FavoriteKind::Folder { children } = &mut entity.kind {
            if let Some(found) = detach_from(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_files<'a>(siblings: &'a [FavoriteEntity], out: &mut Vec<&'a FavoriteEntity>) {
    for entity in siblings {
        match &entity.kind {
            FavoriteKind::File { .. } => out.push(entity),
            FavoriteKind::Folder { children } => collect_files(children, out),
        }
    }
}
