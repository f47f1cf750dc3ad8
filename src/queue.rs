//! The conversion queue.
//!
//! Holds the ordered list of [`QueueItem`]s and owns their lifecycle:
//!
//! ```text
//! Pending ──begin──▶ Processing ──complete──▶ Done
//!    ▲                   │
//!    └──────retry─── Error ◀──fail──┘
//! ```
//!
//! Status, progress and failures change only through the crate-internal
//! transition methods used by the orchestrator in [`process`](crate::process).
//! Thumbnails and size estimates are written by their producers through
//! [`Queue::set_thumbnail`] and [`Queue::set_estimate`] and never touch the
//! status.
//!
//! Every mutation is published as a [`QueueEvent`] when an event channel is
//! attached.

use crate::estimate::estimate_output_size;
use crate::imaging::{
    ConvertError, FailureKind, HeicDecoder, SourceFile, create_thumbnail, decode_source,
};
use crate::types::{ConversionResult, ConversionSettings};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::Sender;

/// Opaque item identifier, unique for the lifetime of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl ItemStatus {
    /// Done and Error items are skipped by batch runs.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        })
    }
}

/// Why an item failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl From<&ConvertError> for ItemFailure {
    fn from(err: &ConvertError) -> Self {
        Self {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

/// One file in the queue.
#[derive(Debug, Clone)]
pub struct QueueItem {
    id: ItemId,
    source: SourceFile,
    status: ItemStatus,
    progress: u8,
    error: Option<ItemFailure>,
    thumbnail: Option<Vec<u8>>,
    estimated_size: Option<u64>,
    format_label: &'static str,
    is_heic: bool,
    result: Option<ConversionResult>,
}

impl QueueItem {
    fn new(id: ItemId, source: SourceFile) -> Self {
        Self {
            id,
            format_label: source.format_label(),
            is_heic: source.is_heic(),
            source,
            status: ItemStatus::Pending,
            progress: 0,
            error: None,
            thumbnail: None,
            estimated_size: None,
            result: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&ItemFailure> {
        self.error.as_ref()
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn estimated_size(&self) -> Option<u64> {
        self.estimated_size
    }

    pub fn format_label(&self) -> &'static str {
        self.format_label
    }

    pub fn is_heic(&self) -> bool {
        self.is_heic
    }

    /// The converted output, present once the item is `Done`.
    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }
}

/// Queue change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Added(ItemId),
    Removed(ItemId),
    Updated(ItemId),
    Reordered,
    Cleared,
}

/// Ordered collection of items with a change feed.
#[derive(Debug, Default)]
pub struct Queue {
    items: Vec<QueueItem>,
    next_id: u64,
    events: Option<Sender<QueueEvent>>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that publishes every change on `events`.
    pub fn with_events(events: Sender<QueueEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    fn notify(&self, event: QueueEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening.
            tx.send(event).ok();
        }
    }

    fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Append a file. Files that are not images are refused.
    pub fn add(&mut self, source: SourceFile) -> Option<ItemId> {
        if !source.is_valid_image() {
            tracing::warn!(name = %source.name, mime = %source.mime, "not an image, skipped");
            return None;
        }
        if source.is_large() {
            tracing::warn!(
                name = %source.name,
                bytes = source.size(),
                "file exceeds 50MB, conversion may be slow"
            );
        }

        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.push(QueueItem::new(id, source));
        self.notify(QueueEvent::Added(id));
        Some(id)
    }

    /// Append several files, returning the ids of those accepted.
    pub fn add_all(&mut self, sources: impl IntoIterator<Item = SourceFile>) -> Vec<ItemId> {
        sources
            .into_iter()
            .filter_map(|source| self.add(source))
            .collect()
    }

    pub fn remove(&mut self, id: ItemId) -> Option<QueueItem> {
        let index = self.index_of(id)?;
        let item = self.items.remove(index);
        self.notify(QueueEvent::Removed(id));
        Some(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.notify(QueueEvent::Cleared);
    }

    /// Move the item at `from` to position `to`. Out-of-range indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
            self.notify(QueueEvent::Reordered);
        }
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Put a failed item back to `Pending`. Other states are left alone.
    pub fn retry(&mut self, id: ItemId) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.status != ItemStatus::Error {
            return false;
        }
        item.status = ItemStatus::Pending;
        item.progress = 0;
        item.error = None;
        self.notify(QueueEvent::Updated(id));
        true
    }

    /// Retry every failed item. Returns how many were reset.
    pub fn retry_failed(&mut self) -> usize {
        let failed: Vec<ItemId> = self
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Error)
            .map(|item| item.id)
            .collect();
        failed.into_iter().filter(|&id| self.retry(id)).count()
    }

    pub fn set_thumbnail(&mut self, id: ItemId, png: Vec<u8>) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        item.thumbnail = Some(png);
        self.notify(QueueEvent::Updated(id));
        true
    }

    pub fn set_estimate(&mut self, id: ItemId, bytes: u64) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        item.estimated_size = Some(bytes);
        self.notify(QueueEvent::Updated(id));
        true
    }

    /// Recompute every item's size estimate for `settings`.
    pub fn refresh_estimates(&mut self, settings: &ConversionSettings) {
        let estimates: Vec<(ItemId, u64)> = self
            .items
            .iter()
            .map(|item| (item.id, estimate_output_size(item.source.size(), settings)))
            .collect();
        for (id, bytes) in estimates {
            self.set_estimate(id, bytes);
        }
    }

    /// Generate thumbnails for items that have none, in parallel on the
    /// current rayon pool.
    ///
    /// Items that cannot be decoded keep no thumbnail. Returns how many were
    /// produced.
    pub fn refresh_thumbnails(&mut self, size: u32, heic: Option<&dyn HeicDecoder>) -> usize {
        let produced: Vec<(ItemId, Vec<u8>)> = self
            .items
            .par_iter()
            .filter(|item| item.thumbnail.is_none())
            .filter_map(|item| {
                let thumb = decode_source(&item.source, heic)
                    .and_then(|decoded| create_thumbnail(&decoded, size));
                match thumb {
                    Ok(png) => Some((item.id, png)),
                    Err(e) => {
                        tracing::debug!(name = %item.source.name, error = %e, "no thumbnail");
                        None
                    }
                }
            })
            .collect();

        let count = produced.len();
        for (id, png) in produced {
            self.set_thumbnail(id, png);
        }
        count
    }

    /// Number of `Done` items.
    pub fn completed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Done)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Error)
            .count()
    }

    /// Results of all `Done` items, in queue order.
    pub fn results(&self) -> Vec<ConversionResult> {
        self.items
            .iter()
            .filter_map(|item| item.result.clone())
            .collect()
    }

    // =========================================================================
    // Orchestrator transitions
    // =========================================================================

    /// `Pending → Processing`, progress reset to 0.
    pub(crate) fn begin(&mut self, id: ItemId) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.status != ItemStatus::Pending {
            return false;
        }
        item.status = ItemStatus::Processing;
        item.progress = 0;
        item.error = None;
        item.result = None;
        self.notify(QueueEvent::Updated(id));
        true
    }

    /// Raise progress of a processing item. Lower values are ignored.
    pub(crate) fn advance(&mut self, id: ItemId, progress: u8) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        let progress = progress.min(100);
        if item.status != ItemStatus::Processing || progress <= item.progress {
            return false;
        }
        item.progress = progress;
        self.notify(QueueEvent::Updated(id));
        true
    }

    /// `Processing → Done` with the converted output.
    pub(crate) fn complete(&mut self, id: ItemId, result: ConversionResult) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.status != ItemStatus::Processing {
            return false;
        }
        item.status = ItemStatus::Done;
        item.progress = 100;
        item.result = Some(result);
        self.notify(QueueEvent::Updated(id));
        true
    }

    /// `Processing → Error`, progress back to 0.
    pub(crate) fn fail(&mut self, id: ItemId, error: &ConvertError) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.status != ItemStatus::Processing {
            return false;
        }
        item.status = ItemStatus::Error;
        item.progress = 0;
        item.error = Some(ItemFailure::from(error));
        self.notify(QueueEvent::Updated(id));
        true
    }
}
