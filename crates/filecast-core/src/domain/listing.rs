//! Listing order and change detection

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::file_item::FileItem;

/// Field a listing is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Modified,
    Kind,
}

/// Sort key plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub ascending: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            ascending: true,
        }
    }
}

fn compare_names(a: &FileItem, b: &FileItem) -> Ordering {
    a.name()
        .to_lowercase()
        .cmp(&b.name().to_lowercase())
        .then_with(|| a.name().cmp(b.name()))
}

/// Sort a listing: directories always first, then by `order`
///
/// Ties on the sort key fall back to the name so the result is stable across
/// polls.
pub fn sort_listing(items: &mut [FileItem], order: SortOrder) {
    items.sort_by(|a, b| {
        // Directories lead regardless of direction
        match (a.is_directory(), b.is_directory()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let primary = match order.key {
            SortKey::Name => compare_names(a, b),
            SortKey::Size => a.size().cmp(&b.size()),
            SortKey::Modified => a.modified_at().cmp(&b.modified_at()),
            SortKey::Kind => a
                .content_type()
                .map(|c| c.as_str())
                .cmp(&b.content_type().map(|c| c.as_str())),
        };
        let primary = if order.ascending {
            primary
        } else {
            primary.reverse()
        };
        primary.then_with(|| compare_names(a, b))
    });
}

/// Returns true if two listings differ in anything a subscriber can observe
pub fn listings_differ(old: &[FileItem], new: &[FileItem]) -> bool {
    old.len() != new.len() || old.iter().zip(new).any(|(a, b)| !a.same_snapshot(b))
}
