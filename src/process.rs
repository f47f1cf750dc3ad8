//! Batch conversion.
//!
//! Walks the queue in order and converts every `Pending` item with one
//! snapshot of the settings and edit state:
//!
//! ```text
//! Pending → Processing ─decode─▶ 30% ─render+encode─▶ 70% ─▶ Done (100%)
//!                  └──────────── any error ───────────────▶ Error (0%)
//! ```
//!
//! ## Ordering
//!
//! Conversion is sequential. Items finish in queue order and results keep
//! that order; a failing item never stops the batch.
//!
//! ## Skips
//!
//! `Done` and `Error` items are skipped. Failed items come back only through
//! [`Queue::retry`] or [`Queue::retry_failed`], and are then converted with
//! whatever settings the next run snapshots.
//!
//! ## Results
//!
//! Each `Done` item caches its output, so the batch result set is every
//! `Done` item in the queue, including those converted by earlier runs.

use crate::imaging::{ConvertError, HeicDecoder, convert_decoded, decode_source};
use crate::queue::{ItemFailure, ItemId, ItemStatus, Queue};
use crate::types::{ConversionResult, ConversionSettings, EditState};
use std::sync::mpsc::Sender;

/// Progress reported once the source is decoded.
pub const PROGRESS_DECODED: u8 = 30;
/// Progress reported once the output is encoded.
pub const PROGRESS_ENCODED: u8 = 70;

/// Everything a batch run reads and mutates.
#[derive(Debug, Default)]
pub struct BatchContext {
    pub queue: Queue,
    pub settings: ConversionSettings,
    pub edit: EditState,
}

impl BatchContext {
    pub fn new(queue: Queue, settings: ConversionSettings, edit: EditState) -> Self {
        Self {
            queue,
            settings,
            edit,
        }
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted {
        total: usize,
        pending: usize,
    },
    /// `position` counts from the items already `Done` when the batch
    /// started, so it runs up to `total` across retries.
    ItemStarted {
        id: ItemId,
        name: String,
        position: usize,
        total: usize,
    },
    ItemProgress {
        id: ItemId,
        progress: u8,
    },
    ItemDone {
        id: ItemId,
        name: String,
        filename: String,
        bytes: u64,
    },
    ItemFailed {
        id: ItemId,
        name: String,
        failure: ItemFailure,
    },
    ItemSkipped {
        id: ItemId,
        name: String,
        status: ItemStatus,
    },
    BatchFinished {
        completed: usize,
        failed: usize,
        total: usize,
    },
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Items converted by this run.
    pub converted: usize,
    /// Items that failed in this run.
    pub failed: usize,
    /// Items skipped because they were already `Done` or `Error`.
    pub skipped: usize,
    /// All `Done` items, this run or earlier.
    pub completed: usize,
    pub total: usize,
    /// Outputs of all `Done` items, in queue order.
    pub results: Vec<ConversionResult>,
}

/// Runs batches. Holds the optional collaborators shared by every run.
#[derive(Default)]
pub struct Converter {
    heic: Option<Box<dyn HeicDecoder + Send>>,
    events: Option<Sender<ProcessEvent>>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heic_decoder(mut self, decoder: Box<dyn HeicDecoder + Send>) -> Self {
        self.heic = Some(decoder);
        self
    }

    pub fn with_events(mut self, events: Sender<ProcessEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn heic_decoder(&self) -> Option<&dyn HeicDecoder> {
        self.heic.as_deref().map(|d| d as &dyn HeicDecoder)
    }

    fn emit(&self, event: ProcessEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    /// Convert every pending item in `ctx.queue`.
    pub fn run_batch(&self, ctx: &mut BatchContext) -> BatchSummary {
        let settings = ctx.settings;
        let edit = ctx.edit;
        let queue = &mut ctx.queue;

        let total = queue.len();
        let pending = queue
            .items()
            .iter()
            .filter(|item| item.status() == ItemStatus::Pending)
            .count();
        tracing::info!(total, pending, format = %settings.format, "batch started");
        self.emit(ProcessEvent::BatchStarted { total, pending });

        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };
        let mut position = queue.completed_count();

        for id in queue.ids() {
            let Some(item) = queue.get(id) else { continue };
            let name = item.name().to_string();

            if item.status().is_terminal() {
                tracing::debug!(%id, name = %name, status = %item.status(), "skipped");
                self.emit(ProcessEvent::ItemSkipped {
                    id,
                    name,
                    status: item.status(),
                });
                summary.skipped += 1;
                continue;
            }

            if !queue.begin(id) {
                continue;
            }
            position += 1;
            self.emit(ProcessEvent::ItemStarted {
                id,
                name: name.clone(),
                position,
                total,
            });

            match self.convert_item(queue, id, &settings, &edit) {
                Ok(result) => {
                    let filename = result.filename.clone();
                    let bytes = result.data.len() as u64;
                    queue.complete(id, result);
                    summary.converted += 1;
                    self.emit(ProcessEvent::ItemDone {
                        id,
                        name,
                        filename,
                        bytes,
                    });
                }
                Err(e) => {
                    tracing::warn!(%id, name = %name, error = %e, "conversion failed");
                    queue.fail(id, &e);
                    summary.failed += 1;
                    self.emit(ProcessEvent::ItemFailed {
                        id,
                        name,
                        failure: ItemFailure::from(&e),
                    });
                }
            }
        }

        summary.completed = queue.completed_count();
        summary.results = queue.results();
        tracing::info!(
            converted = summary.converted,
            failed = summary.failed,
            completed = summary.completed,
            total,
            "batch finished"
        );
        self.emit(ProcessEvent::BatchFinished {
            completed: summary.completed,
            failed: queue.failed_count(),
            total,
        });
        summary
    }

    fn convert_item(
        &self,
        queue: &mut Queue,
        id: ItemId,
        settings: &ConversionSettings,
        edit: &EditState,
    ) -> Result<ConversionResult, ConvertError> {
        let source = queue
            .get(id)
            .map(|item| item.source().clone())
            .ok_or_else(|| ConvertError::Decode(format!("item {id} left the queue")))?;

        let decoded = decode_source(&source, self.heic_decoder())?;
        self.report(queue, id, PROGRESS_DECODED);

        let result = convert_decoded(&decoded, &source.name, settings, edit)?;
        self.report(queue, id, PROGRESS_ENCODED);

        Ok(result)
    }

    fn report(&self, queue: &mut Queue, id: ItemId, progress: u8) {
        if queue.advance(id, progress) {
            self.emit(ProcessEvent::ItemProgress { id, progress });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatChoice, OutputFormat};
    use crate::imaging::{IntermediateImage, SourceFile};
    use crate::types::{ResizeSettings, Rotation};
    use image::{GenericImageView, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::mpsc;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 77]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn png(name: &str) -> SourceFile {
        SourceFile::new(name, "image/png", png_bytes(20, 10))
    }

    fn corrupt(name: &str) -> SourceFile {
        SourceFile::new(name, "image/jpeg", b"definitely not a jpeg".to_vec())
    }

    fn context(files: Vec<SourceFile>, format: OutputFormat) -> BatchContext {
        let mut queue = Queue::new();
        queue.add_all(files);
        let settings = ConversionSettings {
            format: FormatChoice::Explicit(format),
            ..Default::default()
        };
        BatchContext::new(queue, settings, EditState::default())
    }

    fn statuses(ctx: &BatchContext) -> Vec<ItemStatus> {
        ctx.queue.items().iter().map(|i| i.status()).collect()
    }

    /// Stands in for an external HEIC library.
    struct PngHeic;

    impl HeicDecoder for PngHeic {
        fn to_intermediate(&self, _source: &SourceFile) -> Result<IntermediateImage, ConvertError> {
            Ok(IntermediateImage {
                bytes: png_bytes(8, 6),
                mime: "image/jpeg".into(),
            })
        }
    }

    #[test]
    fn every_item_ends_done_or_error() {
        let mut ctx = context(
            vec![png("a.png"), corrupt("b.jpg"), png("c.png")],
            OutputFormat::Png,
        );
        let summary = Converter::new().run_batch(&mut ctx);

        assert_eq!(
            statuses(&ctx),
            vec![ItemStatus::Done, ItemStatus::Error, ItemStatus::Done]
        );
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn results_keep_queue_order() {
        let mut ctx = context(
            vec![png("z.png"), png("m.png"), png("a.png")],
            OutputFormat::Jpeg,
        );
        let summary = Converter::new().run_batch(&mut ctx);
        let names: Vec<_> = summary.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["z_converted.jpg", "m_converted.jpg", "a_converted.jpg"]
        );
    }

    #[test]
    fn failed_item_records_kind_and_zero_progress() {
        let mut ctx = context(vec![corrupt("b.jpg")], OutputFormat::Png);
        Converter::new().run_batch(&mut ctx);
        let item = &ctx.queue.items()[0];
        assert_eq!(item.progress(), 0);
        assert_eq!(
            item.error().unwrap().kind,
            crate::imaging::FailureKind::Decode
        );
    }

    #[test]
    fn second_run_skips_terminal_items() {
        let mut ctx = context(vec![png("a.png"), corrupt("b.jpg")], OutputFormat::Png);
        let converter = Converter::new();
        converter.run_batch(&mut ctx);
        let first = ctx.queue.items()[0].result().cloned();

        ctx.settings.format = FormatChoice::Explicit(OutputFormat::Bmp);
        let summary = converter.run_batch(&mut ctx);

        assert_eq!(summary.converted, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(ctx.queue.items()[0].result().cloned(), first);
        assert_eq!(summary.results.len(), 1);
    }

    #[test]
    fn retry_reconverts_with_current_settings() {
        let mut ctx = context(vec![png("a.png")], OutputFormat::Png);
        let converter = Converter::new();

        // Force a failure: a zero-width resize is rejected.
        ctx.settings.resize = ResizeSettings {
            enabled: true,
            width: Some(0),
            height: None,
        };
        converter.run_batch(&mut ctx);
        assert_eq!(statuses(&ctx), vec![ItemStatus::Error]);
        assert_eq!(
            ctx.queue.items()[0].error().unwrap().kind,
            crate::imaging::FailureKind::Dimension
        );

        ctx.settings.resize.width = Some(10);
        ctx.settings.format = FormatChoice::Explicit(OutputFormat::Gif);
        assert_eq!(ctx.queue.retry_failed(), 1);
        let summary = converter.run_batch(&mut ctx);

        assert_eq!(summary.converted, 1);
        let result = &summary.results[0];
        assert_eq!(result.filename, "a_converted.gif");
        let out = image::load_from_memory(&result.data).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
    }

    #[test]
    fn edits_apply_to_every_item() {
        let mut ctx = context(vec![png("a.png"), png("b.png")], OutputFormat::Png);
        ctx.edit.rotation = Rotation::Deg90;
        let summary = Converter::new().run_batch(&mut ctx);
        for result in &summary.results {
            let out = image::load_from_memory(&result.data).unwrap();
            assert_eq!(out.dimensions(), (10, 20));
        }
    }

    #[test]
    fn heic_without_decoder_fails_that_item_only() {
        let heic = SourceFile::new("IMG_1.HEIC", "image/heic", vec![0; 32]);
        let mut ctx = context(vec![heic, png("a.png")], OutputFormat::Jpeg);
        Converter::new().run_batch(&mut ctx);
        assert_eq!(statuses(&ctx), vec![ItemStatus::Error, ItemStatus::Done]);
        assert_eq!(
            ctx.queue.items()[0].error().unwrap().kind,
            crate::imaging::FailureKind::UnsupportedFormat
        );
    }

    #[test]
    fn heic_same_as_source_becomes_jpeg() {
        let heic = SourceFile::new("photo.HEIC", "", vec![0; 32]);
        let mut ctx = context(vec![heic], OutputFormat::Jpeg);
        ctx.settings.format = FormatChoice::SameAsSource;
        let summary = Converter::new()
            .with_heic_decoder(Box::new(PngHeic))
            .run_batch(&mut ctx);
        assert_eq!(summary.results[0].filename, "photo_converted.jpg");
    }

    #[test]
    fn events_trace_the_lifecycle() {
        let (tx, rx) = mpsc::channel();
        let mut ctx = context(vec![png("a.png"), corrupt("b.jpg")], OutputFormat::Png);
        Converter::new().with_events(tx).run_batch(&mut ctx);

        let events: Vec<ProcessEvent> = rx.try_iter().collect();
        assert!(matches!(
            events.first(),
            Some(ProcessEvent::BatchStarted {
                total: 2,
                pending: 2
            })
        ));
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::ItemProgress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![PROGRESS_DECODED, PROGRESS_ENCODED]);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ProcessEvent::ItemFailed { name, .. } if name == "b.jpg"))
        );
        assert!(matches!(
            events.last(),
            Some(ProcessEvent::BatchFinished {
                completed: 1,
                failed: 1,
                total: 2
            })
        ));
    }

    fn started_positions(events: &[ProcessEvent]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::ItemStarted {
                    position, total, ..
                } => Some((*position, *total)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn started_items_count_up_to_total() {
        let (tx, rx) = mpsc::channel();
        let mut ctx = context(
            vec![png("a.png"), corrupt("b.jpg"), png("c.png")],
            OutputFormat::Png,
        );
        Converter::new().with_events(tx).run_batch(&mut ctx);

        let events: Vec<ProcessEvent> = rx.try_iter().collect();
        assert_eq!(started_positions(&events), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn started_count_continues_after_done_items() {
        let mut ctx = context(vec![png("a.png"), corrupt("b.jpg")], OutputFormat::Png);
        Converter::new().run_batch(&mut ctx);
        ctx.queue.retry_failed();
        ctx.queue.add(png("c.png"));

        let (tx, rx) = mpsc::channel();
        Converter::new().with_events(tx).run_batch(&mut ctx);

        // a.png is already Done, so b.jpg is the second of three.
        let events: Vec<ProcessEvent> = rx.try_iter().collect();
        assert_eq!(started_positions(&events), vec![(2, 3), (3, 3)]);
    }
}
