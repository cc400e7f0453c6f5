//! Batch conversion over a list of source documents.
//!
//! [`BatchController`] owns the item list and drives conversions through a
//! [`DocumentConverter`]. Items move through four states:
//!
//! ```text
//! Pending ──▶ Converting ──▶ Done { markdown, warnings }
//!                   │
//!                   └──────▶ Failed { message } ──▶ Converting (retry)
//! ```
//!
//! A run selects every `Pending` and `Failed` item in list order and
//! converts them **one at a time**; failed items stay in the batch and are
//! picked up again by the next run. Per-item state is a single enum, so an
//! item can never hold both a result and an error, and `Done` without
//! Markdown is unrepresentable.
//!
//! Processing takes `&mut self`, which statically rules out concurrent runs
//! and concurrent list mutation. Items are still written back by id, not by
//! position, so a selection computed before a removal simply skips the
//! missing item.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::document::{ConversionResult, SourceDocument};
use crate::engine::DocumentConverter;
use crate::error::StructuralWarning;
use crate::export::{markdown_file_name, ExportEntry};
use crate::progress::{NoopBatchCallback, ProgressCallback};

/// Stable identifier for a batch item, unique within one controller.
pub type ItemId = u64;

/// Lifecycle state of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemState {
    /// Queued; no conversion attempted yet.
    Pending,
    /// A conversion is in flight right now.
    Converting,
    /// Converted; the Markdown and any structural warnings live here.
    Done {
        markdown: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<StructuralWarning>,
    },
    /// The last attempt failed; the item is eligible for retry.
    #[serde(rename = "error")]
    Failed { message: String },
}

impl ItemState {
    /// Pending and previously failed items are picked up by the next run.
    pub fn is_runnable(&self) -> bool {
        matches!(self, ItemState::Pending | ItemState::Failed { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ItemState::Done { .. })
    }
}

/// One document in the batch, with its current state.
#[derive(Debug, Clone)]
pub struct BatchItem {
    id: ItemId,
    document: Arc<SourceDocument>,
    state: ItemState,
}

impl BatchItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn document(&self) -> &SourceDocument {
        &self.document
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }
}

/// Outcome counts for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Items actually attempted. Ids whose item was removed between
    /// selection and processing are not counted.
    pub selected: usize,
    pub converted: usize,
    pub failed: usize,
}

/// Owns the batch item list and runs conversions sequentially.
pub struct BatchController {
    converter: Arc<dyn DocumentConverter>,
    callback: ProgressCallback,
    items: Vec<BatchItem>,
    next_id: ItemId,
}

impl BatchController {
    pub fn new(converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            converter,
            callback: Arc::new(NoopBatchCallback),
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Replace the progress observer.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = callback;
        self
    }

    // ── List management ──────────────────────────────────────────────────

    /// Append a document as a `Pending` item and return its id.
    pub fn add(&mut self, document: SourceDocument) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        debug!(id, name = %document.name, size = document.size(), "added batch item");
        self.items.push(BatchItem {
            id,
            document: Arc::new(document),
            state: ItemState::Pending,
        });
        id
    }

    /// Remove an item by id. Returns `false` when no such item exists.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        before != self.items.len()
    }

    /// Drop all items. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&BatchItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // ── Conversion runs ──────────────────────────────────────────────────

    /// Ids of the items the next run would process, in list order.
    pub fn plan_run(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.state.is_runnable())
            .map(|item| item.id)
            .collect()
    }

    /// Convert every `Pending` and `Failed` item, one at a time.
    pub async fn run(&mut self) -> RunSummary {
        let plan = self.plan_run();
        self.run_selected(&plan).await
    }

    /// Convert the given items in order. Ids without a matching item are
    /// dropped silently before the run starts, so callbacks and the summary
    /// agree on the attempted count.
    pub async fn run_selected(&mut self, ids: &[ItemId]) -> RunSummary {
        let mut summary = RunSummary {
            selected: 0,
            converted: 0,
            failed: 0,
        };
        // The item list cannot change while the run holds `&mut self`, so
        // membership resolved here is exact for the whole run.
        let ids: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| self.items.iter().any(|item| item.id == *id))
            .collect();
        if ids.is_empty() {
            debug!("no runnable items, skipping batch run");
            return summary;
        }

        let total = ids.len();
        info!(total, "starting batch run");
        self.callback.on_run_start(total);

        for (index, &id) in ids.iter().enumerate() {
            let document = match self.items.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    item.state = ItemState::Converting;
                    Arc::clone(&item.document)
                }
                None => continue,
            };
            summary.selected += 1;
            self.callback.on_item_start(index, total, &document.name);

            let result = self.converter.convert(&document).await;

            // The item may have been removed while the conversion ran;
            // dropping the result on the floor is the correct outcome then.
            let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
                continue;
            };
            match result {
                ConversionResult::Converted { markdown, warnings } => {
                    summary.converted += 1;
                    self.callback
                        .on_item_done(index, total, &document.name, markdown.len());
                    item.state = ItemState::Done { markdown, warnings };
                }
                ConversionResult::Failed { error } => {
                    summary.failed += 1;
                    self.callback
                        .on_item_error(index, total, &document.name, &error);
                    item.state = ItemState::Failed { message: error };
                }
            }
        }

        info!(
            selected = summary.selected,
            converted = summary.converted,
            failed = summary.failed,
            "batch run finished"
        );
        self.callback.on_run_complete(total, summary.converted);
        summary
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Export entries for every `Done` item, in list order, with file names
    /// rewritten to `.md`.
    pub fn export_entries(&self) -> Vec<ExportEntry> {
        self.items
            .iter()
            .filter_map(|item| match &item.state {
                ItemState::Done { markdown, .. } => Some(ExportEntry {
                    name: markdown_file_name(&item.document.name),
                    content: markdown.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}
