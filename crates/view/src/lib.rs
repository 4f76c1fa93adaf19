//! View-side machinery for FavTree trees.
//!
//! This crate owns everything that sits between the authoritative
//! [`favtree_store::FavoritesStore`] and a host tree UI: wrapper nodes
//! that carry view-only state such as expansion, the incremental
//! reconciler that updates a wrapper collection in place without
//! discarding that state, and the drag-and-drop protocol that maps drop
//! payloads onto store mutations. Nothing here touches an execution
//! context; hosts invoke the reconciler from whatever thread receives
//! the store's change notification.

pub mod dragdrop;
pub mod node;
pub mod reconcile;

pub use dragdrop::{drop_effect, handle_drop, DropEffect, DropOutcome, DropPayload};
pub use node::{node_for_entity, ViewNode, ViewNodeKind};
pub use reconcile::{reconcile, reconcile_roots};
