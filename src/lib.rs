//! # imgbatch
//!
//! A batch image converter. Files go into a queue, are converted one by one
//! to a single output format with shared edits applied, and the results are
//! delivered as one file or one ZIP archive.
//!
//! # Architecture: Queue, Batch, Delivery
//!
//! ```text
//! 1. Queue     files      →  Queue       (validated items, estimates, thumbnails)
//! 2. Batch     Queue      →  results     (decode → render plan → encode, per item)
//! 3. Deliver   results    →  output dir  (1 file saved, 2+ files zipped)
//! ```
//!
//! The queue is the only mutable state. A batch run takes one snapshot of the
//! [`types::ConversionSettings`] and [`types::EditState`] and walks the queue
//! in order; every item ends `Done` or `Error`, and a failure never stops the
//! rest of the batch.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`queue`] | Ordered list of items with their status, progress, thumbnail and estimate |
//! | [`process`] | Batch orchestrator: converts pending items, emits progress events |
//! | [`imaging`] | Decoding, render plans, per-format encoders, thumbnails |
//! | [`delivery`] | Saves one result directly or packs several into a ZIP |
//! | [`estimate`] | Output size heuristic shown before converting |
//! | [`format`] | Output formats, MIME types, source labels |
//! | [`naming`] | Output filenames (`photo.HEIC` → `photo_converted.jpg`) |
//! | [`types`] | Settings, edits, and results shared across modules |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`store`] | Last-used settings kept between runs |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Polymorphic Encoder Per Format
//!
//! Every [`format::OutputFormat`] maps to one [`imaging::Encoder`]. Raster
//! formats share a render path (crop, resize, flip, rotate, flatten); SVG wraps
//! the source in a vector document and ICO produces a fixed 32×32 icon. Adding
//! a format means adding one encoder, not another branch in the orchestrator.
//!
//! ## Pure-Rust Imaging
//!
//! All decoding and encoding goes through the `image` crate. HEIC/HEIF is the
//! exception: there is no pure-Rust decoder, so it is routed through a
//! [`imaging::HeicDecoder`] collaborator that produces an intermediate image.
//! Without one, HEIC items fail with an unsupported-format error while the
//! rest of the batch converts normally.

pub mod config;
pub mod delivery;
pub mod estimate;
pub mod format;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod queue;
pub mod store;
pub mod types;
