use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RenameMode};

use crate::filter::PathFilter;

/// A trackable file was created, written or renamed into place.
///
/// Both watcher backends produce only this event; deletions are never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

/// Reduce a raw `notify` event to a `ChangeEvent`, or None if it should be ignored.
///
/// Filtering order:
/// 1. Event kind: creates and modifications pass; a rename counts as a
///    modification of its destination; removals and access events are dropped
/// 2. Directories are dropped
/// 3. Trackability (root, excluded dirs, ignorable suffixes, extensions)
pub fn classify_event(event: &notify::Event, root: &Path, filter: &PathFilter) -> Option<ChangeEvent> {
    let path = match event.kind {
        EventKind::Create(CreateKind::Folder) => return None,
        EventKind::Create(_) => event.paths.first()?,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => return None,
        // `Both` carries [from, to]; the destination is what changed.
        EventKind::Modify(ModifyKind::Name(_)) => event.paths.last()?,
        EventKind::Modify(_) => event.paths.first()?,
        _ => return None,
    };

    if path.is_dir() || !filter.is_trackable(path, root) {
        return None;
    }

    Some(ChangeEvent {
        path: path.to_path_buf(),
    })
}
