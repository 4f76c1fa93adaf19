//! Drag-and-drop move protocol.
//!
//! Two payload kinds are recognized on a drop target (a folder wrapper,
//! or the favorites root): wrapper references dragged from inside the
//! tree, which move entities, and filesystem paths dragged in from
//! outside, which add files. The host maps its native drag formats onto
//! [`DropPayload`] and renders the affordance [`drop_effect`] reports.

use std::path::PathBuf;

use favtree_store::{FavoriteId, FavoritesStore};

/// A recognized drop payload, already decoded from the host's native
/// drag format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    /// Existing favorites dragged within the tree.
    Nodes(Vec<FavoriteId>),
    /// Filesystem paths dragged in from outside the favorites tree.
    Paths(Vec<PathBuf>),
}

/// Visual affordance the host should render while hovering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
    Copy,
}

/// Result of handling a drop.
///
/// `consumed` signals UI ownership to the host: it is true whenever the
/// payload kind was recognized, even if no individual item changed
/// state (all already favorited, all self-drops). `affected` counts the
/// entities that actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropOutcome {
    pub consumed: bool,
    pub affected: usize,
}

/// Affordance for a payload: internal drags move, external drops copy.
pub fn drop_effect(payload: &DropPayload) -> DropEffect {
    match payload {
        DropPayload::Nodes(_) => DropEffect::Move,
        DropPayload::Paths(_) => DropEffect::Copy,
    }
}

/// Applies a drop onto `target` (a folder id, or `None` for the root).
///
/// Node payloads skip a wrapper dropped onto itself and move the rest;
/// the store rejects cyclic moves on its own. Path payloads ignore
/// anything that is not an existing file — bulk folder import is an
/// explicit command, not a drop behavior — and add the rest, subject to
/// the store's dedup rule.
pub fn handle_drop(
    store: &mut FavoritesStore,
    payload: &DropPayload,
    target: Option<FavoriteId>,
) -> DropOutcome {
    let mut affected = 0;
    match payload {
        DropPayload::Nodes(ids) => {
            for &id in ids {
                if Some(id) == target {
                    continue;
                }
                if store.move_item(id, target) {
                    affected += 1;
                }
            }
        }
        DropPayload::Paths(paths) => {
            for path in paths {
                if !path.is_file() {
                    continue;
                }
                let added = match target {
                    Some(folder) => store.add_file_to_folder(path, folder),
                    None => store.add_file(path),
                };
                if added.is_some() {
                    affected += 1;
                }
            }
        }
    }
    DropOutcome {
        consumed: true,
        affected,
    }
}
