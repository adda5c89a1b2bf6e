//! Reference ledger
//!
//! Each entry keeps an ordered list of owner reference strings in its
//! `components` dataset. The list is never empty while the entry exists:
//! removing the last reference deletes the entry.
//!
//! List updates rewrite the whole list in its reserved region, moving it
//! only when it outgrows the region. None of these operations is atomic; a
//! failure between steps leaves the container as the last completed step
//! left it.

use crate::container::Container;
use crate::series::TimeSeriesData;
use crate::storage::attributes::write_attributes;
use crate::storage::codec::{encode_series, window_axis};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{components_path, data_path, entry_path};
use uuid::Uuid;

/// Name of the reference list dataset inside an entry
pub const COMPONENTS: &str = "components";

/// Store `series` under its content UUID with `reference` as an owner
///
/// If the entry already exists only the reference is added. Returns whether a
/// new entry was created.
pub fn store_entry(
    container: &mut Container,
    series: &TimeSeriesData,
    reference: &str,
) -> StorageResult<bool> {
    let content_id = series.uuid();
    if container.contains(&entry_path(content_id)) {
        append_reference(container, content_id, reference)?;
        return Ok(false);
    }

    let payload = encode_series(series)?;

    container.create_group(&entry_path(content_id))?;
    // One chunk column per window keeps single-window reads local
    let unit_axes: Vec<usize> = window_axis(series).into_iter().collect();
    container.write_dataset_chunked(&data_path(content_id), &payload, &unit_axes)?;
    write_attributes(container, content_id, series)?;
    container.write_strings(&components_path(content_id), &[reference.to_string()])?;

    tracing::debug!(
        "Stored {} entry {} with shape {:?}",
        series.logical_type(),
        content_id,
        payload.shape()
    );
    Ok(true)
}

/// Add `reference` to an existing entry; a reference already present is left alone
///
/// Returns whether the list changed.
pub fn append_reference(
    container: &mut Container,
    content_id: Uuid,
    reference: &str,
) -> StorageResult<bool> {
    let mut references = references(container, content_id)?;
    if references.iter().any(|r| r == reference) {
        tracing::debug!("Reference {} already recorded on {}", reference, content_id);
        return Ok(false);
    }

    references.push(reference.to_string());
    rewrite(container, content_id, &references)?;
    Ok(true)
}

/// Remove `reference` from an entry, deleting the entry if none remain
///
/// Fails with `ReferenceNotFound` unless exactly one copy of `reference` was
/// recorded. Returns whether the entry was deleted.
pub fn remove_reference(
    container: &mut Container,
    content_id: Uuid,
    reference: &str,
) -> StorageResult<bool> {
    let references = references(container, content_id)?;
    let remaining: Vec<String> = references
        .iter()
        .filter(|r| r.as_str() != reference)
        .cloned()
        .collect();

    if references.len() - remaining.len() != 1 {
        return Err(StorageError::ReferenceNotFound {
            content_id,
            reference: reference.to_string(),
        });
    }

    if remaining.is_empty() {
        container.delete(&entry_path(content_id))?;
        tracing::debug!("Deleted entry {} with its last reference", content_id);
        return Ok(true);
    }

    rewrite(container, content_id, &remaining)?;
    Ok(false)
}

/// Owner references recorded on an entry, in insertion order
pub fn references(container: &Container, content_id: Uuid) -> StorageResult<Vec<String>> {
    if !container.contains(&entry_path(content_id)) {
        return Err(StorageError::NotFound(format!("time series {}", content_id)));
    }
    Ok(container.read_strings(&components_path(content_id))?)
}

fn rewrite(container: &mut Container, content_id: Uuid, references: &[String]) -> StorageResult<()> {
    container.replace_strings(&components_path(content_id), references)?;
    Ok(())
}
