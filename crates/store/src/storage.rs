use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::{
    FavoriteEntity, FavoriteId, FavoriteKind, FavoritesDocument, DOCUMENT_FORMAT_VERSION,
};

/// Hidden state directory created next to the workspace file.
pub const STATE_DIR_NAME: &str = ".favtree";
/// File name of the persisted favorites document.
pub const DOCUMENT_FILE_NAME: &str = "favorites.json";

/// Resolves the persisted-file location for a workspace, keyed by the
/// workspace name:
/// `<workspace-dir>/.favtree/<workspace-name>/favorites.json`.
/// 依工作區名稱推導最愛文件的儲存位置。
pub fn state_file_path(workspace_path: &Path) -> Option<PathBuf> {
    let workspace_dir = workspace_path.parent()?;
    let workspace_name = workspace_path.file_stem()?;
    Some(
        workspace_dir
            .join(STATE_DIR_NAME)
            .join(workspace_name)
            .join(DOCUMENT_FILE_NAME),
    )
}

/// Persists `FavoritesDocument` snapshots to disk using JSON + atomic
/// writes.
/// 以 JSON 搭配原子寫入方式儲存最愛文件。
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    /// Constructs a store bound to the provided path.
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing path used for persistence.
    /// 取得此儲存器使用的檔案路徑。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document from disk, returning `Ok(None)` when the file
    /// is absent. Version-1 files (the legacy flat schema) are migrated
    /// to the current nested form on the fly.
    /// 從磁碟載入文件；若檔案不存在則回傳 `Ok(None)`，舊版扁平格式會即時升級。
    pub fn load(&self) -> Result<Option<FavoritesDocument>, DocumentStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_document(&contents).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DocumentStoreError::Io(err)),
        }
    }

    /// Saves the document atomically, creating parent directories as
    /// needed. Always writes the current format version.
    /// 以原子方式寫入文件，必要時建立上層目錄。
    pub fn save(&self, document: &FavoritesDocument) -> Result<(), DocumentStoreError> {
        let payload = serde_json::to_vec_pretty(document)
            .map_err(|err| DocumentStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload).map_err(DocumentStoreError::Io)
    }
}

/// Errors emitted by [`DocumentStore`].
/// [`DocumentStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("favorites IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid favorites payload: {0}")]
    Invalid(String),
    #[error("unsupported favorites document version {0}")]
    UnsupportedVersion(u64),
}

fn parse_document(contents: &str) -> Result<FavoritesDocument, DocumentStoreError> {
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(|err| DocumentStoreError::Invalid(err.to_string()))?;
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| DocumentStoreError::Invalid("missing version field".to_string()))?;

    if version == 1 {
        let legacy: LegacyDocument = serde_json::from_value(value)
            .map_err(|err| DocumentStoreError::Invalid(err.to_string()))?;
        return Ok(legacy.into_document());
    }
    if version == u64::from(DOCUMENT_FORMAT_VERSION) {
        return serde_json::from_value(value)
            .map_err(|err| DocumentStoreError::Invalid(err.to_string()));
    }
    Err(DocumentStoreError::UnsupportedVersion(version))
}

/// Version-1 on-disk shape: a flat item list without folders.
#[derive(Debug, Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    items: Vec<LegacyItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyItem {
    id: FavoriteId,
    name: String,
    file_path: PathBuf,
    #[serde(default)]
    sort_order: i32,
}

impl LegacyDocument {
    fn into_document(self) -> FavoritesDocument {
        let roots = self
            .items
            .into_iter()
            .map(|item| FavoriteEntity {
                id: item.id,
                name: item.name,
                sort_order: item.sort_order,
                kind: FavoriteKind::File {
                    path: item.file_path,
                },
            })
            .collect();
        FavoritesDocument {
            version: DOCUMENT_FORMAT_VERSION,
            roots,
        }
    }
}

/// Writes data through a temporary sibling file followed by a rename,
/// creating parent directories first.
/// 先寫入臨時檔再改名，寫入前確保上層目錄存在。
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)
}
