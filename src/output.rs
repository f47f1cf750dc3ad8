//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every queue item is shown by its positional index and filename, with the
//! source format label and sizes as secondary detail. Conversion progress
//! and failures are indented context under the item they belong to.
//!
//! # Output Format
//!
//! ## Queue / estimate
//!
//! ```text
//! Queue (3 files)
//! 001 dawn.jpg [JPG] 4.20 MB → ~2.27 MB
//! 002 IMG_0042.heic [HEIC] 2.10 MB → ~1.13 MB
//!     HEIC: not supported in this build (no HEIC decoder)
//! 003 logo.png [PNG] 0.05 MB → ~0.03 MB
//! ```
//!
//! ## Convert
//!
//! ```text
//! Converting 3 of 3 files
//!     Processing 1/3: dawn.jpg
//!     dawn.jpg → dawn_converted.jpg (2.02 MB)
//!     Processing 2/3: IMG_0042.heic
//!     IMG_0042.heic failed
//!         unsupported format: Unsupported format: IMG_0042.heic: no HEIC decoder available
//!     Processing 3/3: logo.png
//!     logo.png → logo_converted.jpg (0.04 MB)
//! Converted 2/3 files (1 failed)
//! Saved converted_images.zip (2 files, 2.05 MB) → out/converted_images.zip
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function returning `Vec<String>` for
//! testability, and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::delivery::Delivery;
use crate::process::ProcessEvent;
use crate::queue::{ItemStatus, Queue};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Byte count as megabytes with two decimals.
///
/// ```
/// # use imgbatch::output::format_size;
/// assert_eq!(format_size(1_572_864), "1.50 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

// ============================================================================
// Queue
// ============================================================================

/// Format the queue with size estimates.
pub fn format_queue(queue: &Queue) -> Vec<String> {
    let mut lines = vec![format!("Queue ({} files)", queue.len())];

    for (idx, item) in queue.items().iter().enumerate() {
        let mut line = format!(
            "{} {} [{}] {}",
            format_index(idx + 1),
            item.name(),
            item.format_label(),
            format_size(item.source().size())
        );
        if let Some(estimate) = item.estimated_size() {
            line.push_str(&format!(" \u{2192} ~{}", format_size(estimate)));
        }
        lines.push(line);

        if item.is_heic() {
            lines.push(format!(
                "{}HEIC: not supported in this build (no HEIC decoder)",
                indent(1)
            ));
        }
        if let Some(error) = item.error() {
            lines.push(format!("{}{}: {}", indent(1), error.kind, error.reason));
        }
    }
    lines
}

pub fn print_queue(queue: &Queue) {
    for line in format_queue(queue) {
        println!("{}", line);
    }
}

/// Format the thumbnails written by `estimate --thumbnails`.
pub fn format_thumbnails(written: &[String]) -> Vec<String> {
    let mut lines = vec![format!("Thumbnails ({})", written.len())];
    lines.extend(written.iter().map(|name| format!("{}{}", indent(1), name)));
    lines
}

// ============================================================================
// Conversion progress
// ============================================================================

/// Format a single batch event as display lines.
///
/// Per-percentage progress events produce no lines; the CLI reports each
/// item's start and outcome plus the final counter.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { total, pending } => {
            vec![format!("Converting {} of {} files", pending, total)]
        }
        ProcessEvent::ItemStarted {
            name,
            position,
            total,
            ..
        } => vec![format!("{}Processing {}/{}: {}", indent(1), position, total, name)],
        ProcessEvent::ItemProgress { .. } => Vec::new(),
        ProcessEvent::ItemDone {
            name,
            filename,
            bytes,
            ..
        } => vec![format!(
            "{}{} \u{2192} {} ({})",
            indent(1),
            name,
            filename,
            format_size(*bytes)
        )],
        ProcessEvent::ItemFailed { name, failure, .. } => vec![
            format!("{}{} failed", indent(1), name),
            format!("{}{}: {}", indent(2), failure.kind, failure.reason),
        ],
        ProcessEvent::ItemSkipped { name, status, .. } => {
            let why = match status {
                ItemStatus::Done => "already converted",
                ItemStatus::Error => "failed earlier, retry to convert again",
                _ => "not pending",
            };
            vec![format!("{}{} skipped ({})", indent(1), name, why)]
        }
        ProcessEvent::BatchFinished {
            completed,
            failed,
            total,
        } => {
            if *failed > 0 {
                vec![format!(
                    "Converted {}/{} files ({} failed)",
                    completed, total, failed
                )]
            } else {
                vec![format!("Converted {}/{} files", completed, total)]
            }
        }
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Format the outcome of delivery.
pub fn format_delivery(delivery: &Delivery) -> Vec<String> {
    match delivery {
        Delivery::Single {
            filename,
            path,
            bytes,
        } => vec![format!(
            "Saved {} ({}) \u{2192} {}",
            filename,
            format_size(*bytes),
            path.display()
        )],
        Delivery::Archive {
            filename,
            path,
            entries,
            bytes,
        } => vec![format!(
            "Saved {} ({} files, {}) \u{2192} {}",
            filename,
            entries,
            format_size(*bytes),
            path.display()
        )],
    }
}

pub fn print_delivery(delivery: &Delivery) {
    for line in format_delivery(delivery) {
        println!("{}", line);
    }
}
