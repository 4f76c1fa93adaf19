//! Workspace-scoped favorites primitives for FavTree.
//! 管理 FavTree 最愛清單、路徑轉換與持久化的核心模組。

pub mod model;
pub mod paths;
pub mod storage;
pub mod store;

pub use model::{
    FavoriteEntity, FavoriteId, FavoriteKind, FavoritesDocument, DOCUMENT_FORMAT_VERSION,
};
pub use storage::{
    state_file_path, DocumentStore, DocumentStoreError, DOCUMENT_FILE_NAME, STATE_DIR_NAME,
};
pub use store::{FavoritesStore, SubscriptionId};
