//! Entry traversal and storage comparison
//!
//! [`EntryIter`] walks a container file lazily: the file is opened on the
//! first call to `next` and released when the walk ends, fails, or the
//! iterator is dropped. It yields one item per (entry, reference) pair.

use crate::container::{Attributes, Container, ContainerError, NdArray, OpenMode};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::handle::SeriesStorage;
use crate::storage::{components_path, data_path, entry_path, ROOT_GROUP};
use std::path::PathBuf;
use uuid::Uuid;

/// One (entry, reference) pair with the entry's raw payload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub content_id: Uuid,
    pub owner_ref: String,
    pub data: NdArray,
    pub attributes: Attributes,
}

struct LoadedEntry {
    content_id: Uuid,
    data: NdArray,
    attributes: Attributes,
    references: std::vec::IntoIter<String>,
}

enum WalkState {
    NotStarted,
    Walking {
        container: Container,
        ids: std::vec::IntoIter<String>,
        current: Option<LoadedEntry>,
    },
    Finished,
}

/// Lazy, single-pass walk over every stored (entry, reference) pair
pub struct EntryIter {
    path: PathBuf,
    state: WalkState,
}

impl EntryIter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: WalkState::NotStarted,
        }
    }

    fn fail(&mut self, err: StorageError) -> Option<StorageResult<StoredEntry>> {
        self.state = WalkState::Finished;
        Some(Err(err))
    }
}

impl Iterator for EntryIter {
    type Item = StorageResult<StoredEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                WalkState::NotStarted => {
                    let opened = Container::open(&self.path, OpenMode::ReadOnly)
                        .and_then(|c| c.children(ROOT_GROUP).map(|ids| (c, ids)));
                    match opened {
                        Ok((container, ids)) => {
                            self.state = WalkState::Walking {
                                container,
                                ids: ids.into_iter(),
                                current: None,
                            }
                        }
                        Err(e) => return self.fail(e.into()),
                    }
                }
                WalkState::Walking {
                    container,
                    ids,
                    current,
                } => {
                    if let Some(entry) = current {
                        if let Some(owner_ref) = entry.references.next() {
                            return Some(Ok(StoredEntry {
                                content_id: entry.content_id,
                                owner_ref,
                                data: entry.data.clone(),
                                attributes: entry.attributes.clone(),
                            }));
                        }
                    }

                    match ids.next() {
                        Some(id) => match load_entry(container, &id) {
                            Ok(entry) => *current = Some(entry),
                            Err(e) => return self.fail(e),
                        },
                        None => {
                            self.state = WalkState::Finished;
                            return None;
                        }
                    }
                }
                WalkState::Finished => return None,
            }
        }
    }
}

fn load_entry(container: &Container, id: &str) -> StorageResult<LoadedEntry> {
    let content_id = Uuid::parse_str(id).map_err(|_| {
        ContainerError::InvalidFormat(format!("entry name {} is not a UUID", id))
    })?;

    Ok(LoadedEntry {
        content_id,
        data: container.read_dataset(&data_path(content_id))?,
        attributes: container.attrs(&entry_path(content_id))?.clone(),
        references: container
            .read_strings(&components_path(content_id))?
            .into_iter(),
    })
}

/// Deep comparison of two storages
///
/// Both sides are collected and sorted by owner reference, then compared
/// element by element. The first difference is logged, not raised.
pub fn compare_storages(a: &SeriesStorage, b: &SeriesStorage) -> StorageResult<bool> {
    let mut left = a.entries().collect::<StorageResult<Vec<_>>>()?;
    let mut right = b.entries().collect::<StorageResult<Vec<_>>>()?;

    if left.len() != right.len() {
        tracing::warn!(
            "Storages differ in size: {:?} has {} references, {:?} has {}",
            a.path(),
            left.len(),
            b.path(),
            right.len()
        );
        return Ok(false);
    }

    left.sort_by(|x, y| x.owner_ref.cmp(&y.owner_ref));
    right.sort_by(|x, y| x.owner_ref.cmp(&y.owner_ref));

    for (x, y) in left.iter().zip(&right) {
        let divergence = if x.content_id != y.content_id {
            Some("content id")
        } else if x.owner_ref != y.owner_ref {
            Some("owner reference")
        } else if !x.data.bit_eq(&y.data) {
            Some("data")
        } else if x.attributes != y.attributes {
            Some("attributes")
        } else {
            None
        };

        if let Some(field) = divergence {
            tracing::warn!(
                "Storages differ in {} at {} / {}: {} vs {}",
                field,
                x.owner_ref,
                y.owner_ref,
                x.content_id,
                y.content_id
            );
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{SingleTimeSeries, TimeSeriesData, Values};
    use crate::storage::StorageOptions;
    use chrono::Duration;
    use tempfile::tempdir;

    fn series(values: Vec<f64>) -> TimeSeriesData {
        SingleTimeSeries::new(0, Duration::hours(1), Values::Float(values)).into()
    }

    fn storage(dir: &std::path::Path, name: &str) -> SeriesStorage {
        SeriesStorage::create(StorageOptions::new().path(dir.join(name))).unwrap()
    }

    #[test]
    fn test_walk_yields_one_item_per_reference() {
        let dir = tempdir().unwrap();
        let mut storage = storage(dir.path(), "a.tsv");
        let shared = series(vec![1.0, 2.0]);
        let alone = series(vec![3.0]);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        storage.store(a, "x", &shared).unwrap();
        storage.store(b, "y", &shared).unwrap();
        storage.store(a, "z", &alone).unwrap();

        let items: Vec<StoredEntry> = storage.entries().map(Result::unwrap).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items.iter().filter(|e| e.content_id == shared.uuid()).count(),
            2
        );
        let lone = items.iter().find(|e| e.content_id == alone.uuid()).unwrap();
        assert_eq!(lone.data.data(), &[3.0]);
        assert_eq!(
            lone.attributes.get("data_kind").and_then(|v| v.as_str()),
            Some("CONSTANT")
        );

        // restartable
        assert_eq!(storage.entries().count(), 3);
    }

    #[test]
    fn test_walk_is_lazy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.tsv");
        let mut iter = EntryIter::new(path);
        // nothing opened until the first pull
        let first = iter.next().unwrap();
        assert!(first.is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_compare_storages() {
        let dir = tempdir().unwrap();
        let owner = Uuid::new_v4();
        let shared = series(vec![1.0, f64::NAN]);

        let mut a = storage(dir.path(), "a.tsv");
        let mut b = storage(dir.path(), "b.tsv");
        a.store(owner, "x", &shared).unwrap();
        b.store(owner, "x", &shared).unwrap();
        assert!(a.compare(&b).unwrap());
        assert!(compare_storages(&b, &a).unwrap());

        b.store(owner, "y", &series(vec![1.0])).unwrap();
        assert!(!a.compare(&b).unwrap());

        a.store(owner, "y", &series(vec![2.0])).unwrap();
        assert!(!a.compare(&b).unwrap());
    }
}
