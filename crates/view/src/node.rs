use std::path::PathBuf;

use favtree_store::{FavoriteEntity, FavoriteId, FavoritesStore};

/// View-facing wrapper paired 1:1 with one favorite entity.
///
/// Wrappers exist so a host tree can attach per-node view state (the
/// `expanded` flag here, anything else in the host) that survives data
/// refreshes: the reconciler reuses the wrapper whenever its entity is
/// still present instead of rebuilding it.
#[derive(Debug)]
pub struct ViewNode {
    id: FavoriteId,
    pub label: String,
    pub kind: ViewNodeKind,
    /// View-only state; never derived from the store.
    pub expanded: bool,
    disposed: bool,
}

/// Per-kind payload of a wrapper node.
#[derive(Debug)]
pub enum ViewNodeKind {
    File { absolute_path: PathBuf },
    Folder { children: Vec<ViewNode> },
}

impl ViewNode {
    pub fn file(id: FavoriteId, label: impl Into<String>, absolute_path: PathBuf) -> Self {
        Self {
            id,
            label: label.into(),
            kind: ViewNodeKind::File { absolute_path },
            expanded: false,
            disposed: false,
        }
    }

    pub fn folder(id: FavoriteId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            kind: ViewNodeKind::Folder {
                children: Vec::new(),
            },
            expanded: false,
            disposed: false,
        }
    }

    /// Identity of the wrapped entity.
    pub fn id(&self) -> FavoriteId {
        self.id
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ViewNodeKind::Folder { .. })
    }

    /// Resolved absolute path for file wrappers.
    pub fn absolute_path(&self) -> Option<&PathBuf> {
        match &self.kind {
            ViewNodeKind::File { absolute_path } => Some(absolute_path),
            ViewNodeKind::Folder { .. } => None,
        }
    }

    pub fn children(&self) -> &[ViewNode] {
        match &self.kind {
            ViewNodeKind::Folder { children } => children,
            ViewNodeKind::File { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ViewNode>> {
        match &mut self.kind {
            ViewNodeKind::Folder { children } => Some(children),
            ViewNodeKind::File { .. } => None,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Marks the wrapper (and, for folders, its whole subtree) as
    /// released. Hosts holding weak references observe the flag.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let ViewNodeKind::Folder { children } = &mut self.kind {
            for child in children.iter_mut() {
                child.dispose();
            }
            children.clear();
        }
    }
}

/// Default wrapper factory: file paths resolve to absolute form through
/// the store's current workspace.
pub fn node_for_entity(store: &FavoritesStore, entity: &FavoriteEntity) -> ViewNode {
    match entity.file_path() {
        Some(stored) => ViewNode::file(
            entity.id,
            entity.name.as_str(),
            store.to_absolute_path(stored),
        ),
        None => ViewNode::folder(entity.id, entity.name.as_str()),
    }
}
