//! Index-aligned tree reconciliation.
//!
//! Given the authoritative ordered children of a node and the wrapper
//! collection a view currently displays, [`reconcile`] applies the
//! minimal structural edits so the view matches the model: wrappers for
//! removed entities are disposed, wrappers for new entities are
//! constructed through the caller's factory, and surviving wrappers are
//! moved in place rather than rebuilt, so their view-only state
//! (expansion and anything else the host hangs off them) is preserved.
//! Wrappers whose relative order is unchanged never move at all.

use std::collections::HashSet;

use favtree_store::{FavoriteEntity, FavoriteId, FavoritesStore};

use crate::node::{node_for_entity, ViewNode, ViewNodeKind};

/// Synchronizes `view` with `authoritative`, recursing into folder
/// wrappers. `make` constructs a wrapper for an entity that has none
/// yet; children of newly made folder wrappers are filled in by the
/// recursion, so factories may return empty folders.
pub fn reconcile(
    view: &mut Vec<ViewNode>,
    authoritative: &[FavoriteEntity],
    make: &mut dyn FnMut(&FavoriteEntity) -> ViewNode,
) {
    let present: HashSet<FavoriteId> = authoritative.iter().map(|entity| entity.id).collect();

    // Back-to-front so removal indices stay valid.
    for index in (0..view.len()).rev() {
        if !present.contains(&view[index].id()) {
            let mut removed = view.remove(index);
            removed.dispose();
        }
    }

    for (target, entity) in authoritative.iter().enumerate() {
        match view.iter().position(|node| node.id() == entity.id) {
            Some(current) if current == target => {}
            Some(current) => {
                let node = view.remove(current);
                view.insert(target, node);
            }
            None => {
                view.insert(target, make(entity));
            }
        }
        refresh(&mut view[target], entity, make);
    }
}

/// Convenience entry point for the favorites root: reconciles against
/// the store's current root entities using the default wrapper factory.
pub fn reconcile_roots(view: &mut Vec<ViewNode>, store: &FavoritesStore) {
    let roots = store.get_root_items();
    reconcile(view, &roots, &mut |entity| node_for_entity(store, entity));
}

fn refresh(
    node: &mut ViewNode,
    entity: &FavoriteEntity,
    make: &mut dyn FnMut(&FavoriteEntity) -> ViewNode,
) {
    node.label = entity.name.clone();
    if let ViewNodeKind::Folder { children } = &mut node.kind {
        let ordered: Vec<FavoriteEntity> =
            entity.sorted_children().into_iter().cloned().collect();
        reconcile(children, &ordered, make);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file_entity(name: &str) -> FavoriteEntity {
        FavoriteEntity::new_file(PathBuf::from(name))
    }

    fn make_node(entity: &FavoriteEntity) -> ViewNode {
        match entity.file_path() {
            Some(path) => ViewNode::file(entity.id, entity.name.as_str(), path.to_path_buf()),
            None => ViewNode::folder(entity.id, entity.name.as_str()),
        }
    }

    #[test]
    fn surviving_wrappers_keep_their_view_state() {
        let e1 = file_entity("one.txt");
        let e2 = file_entity("two.txt");
        let e3 = file_entity("three.txt");

        let mut view = Vec::new();
        reconcile(&mut view, &[e1.clone(), e2.clone(), e3.clone()], &mut make_node);
        view[0].expanded = true;
        view[2].expanded = true;

        // Remove the middle entity, insert a new one in its place.
        let e_new = file_entity("new.txt");
        reconcile(&mut view, &[e1.clone(), e_new.clone(), e3.clone()], &mut make_node);

        let ids: Vec<FavoriteId> = view.iter().map(ViewNode::id).collect();
        assert_eq!(ids, vec![e1.id, e_new.id, e3.id]);
        assert!(view[0].expanded);
        assert!(!view[1].expanded);
        assert!(view[2].expanded);
    }

    #[test]
    fn removed_wrappers_are_disposed() {
        let e1 = file_entity("one.txt");
        let e2 = file_entity("two.txt");

        let mut view = Vec::new();
        reconcile(&mut view, &[e1.clone(), e2.clone()], &mut make_node);
        reconcile(&mut view, &[e2.clone()], &mut make_node);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id(), e2.id);
        // The removed wrapper was dropped after disposal; nothing with
        // e1's identity survives in the collection.
        assert!(view.iter().all(|node| node.id() != e1.id));
    }

    #[test]
    fn reordering_moves_wrappers_without_rebuilding() {
        let e1 = file_entity("one.txt");
        let e2 = file_entity("two.txt");
        let e3 = file_entity("three.txt");

        let mut view = Vec::new();
        reconcile(&mut view, &[e1.clone(), e2.clone(), e3.clone()], &mut make_node);
        view[2].expanded = true;

        reconcile(&mut view, &[e3.clone(), e1.clone(), e2.clone()], &mut make_node);
        assert_eq!(
            view.iter().map(ViewNode::id).collect::<Vec<_>>(),
            vec![e3.id, e1.id, e2.id]
        );
        assert!(view[0].expanded);
    }

    #[test]
    fn labels_refresh_on_rename() {
        let mut entity = file_entity("draft.txt");
        let mut view = Vec::new();
        reconcile(&mut view, &[entity.clone()], &mut make_node);

        entity.name = "final.txt".to_string();
        reconcile(&mut view, &[entity.clone()], &mut make_node);
        assert_eq!(view[0].label, "final.txt");
    }

    #[test]
    fn folder_wrappers_reconcile_recursively_and_keep_expansion() {
        let mut folder = FavoriteEntity::new_folder("bucket");
        let child_a = file_entity("a.txt");
        let mut child_b = file_entity("b.txt");
        child_b.sort_order = 1;
        folder
            .folder_children_mut()
            .unwrap()
            .extend([child_a.clone(), child_b.clone()]);

        let mut view = Vec::new();
        reconcile(&mut view, &[folder.clone()], &mut make_node);
        view[0].expanded = true;
        assert_eq!(view[0].children().len(), 2);

        // Drop one child from the model; the folder wrapper survives.
        folder
            .folder_children_mut()
            .unwrap()
            .retain(|child| child.id != child_a.id);
        reconcile(&mut view, &[folder.clone()], &mut make_node);

        assert!(view[0].expanded);
        let children = view[0].children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id(), child_b.id);
    }

    #[test]
    fn reconcile_roots_uses_the_store_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FavoritesStore::new();
        store.load_for_workspace(dir.path().join("demo.ws"));
        let first = store.add_file(&dir.path().join("one.txt")).unwrap();
        let folder = store.create_folder("bucket").unwrap();

        let mut view = Vec::new();
        reconcile_roots(&mut view, &store);
        assert_eq!(
            view.iter().map(ViewNode::id).collect::<Vec<_>>(),
            vec![first.id, folder.id]
        );
        assert!(view[1].is_folder());
    }
}
