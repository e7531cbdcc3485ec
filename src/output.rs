//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines; `print_*`
//! wrappers write them to stdout. The binary feeds pipeline events through
//! [`format_pipeline_event`] from a printer thread while the pipeline runs.
//!
//! # Output Format
//!
//! ## Thumbnail run
//!
//! ```text
//! huge.tif 12000x8000 → 6000x4000
//!     Grid: 2 rows x 3 cols
//!     (0, 1) → 2500x2500
//!     (0, 0) → 2500x2500
//!     ...
//! Wrote thumbs/huge.png (6000x4000) in 5123 ms
//! ```
//!
//! ## Plan
//!
//! ```text
//! huge.tif (tiff, 12000x8000)
//!     Grid: 2 rows x 3 cols, tiles up to 5000x5000
//!     Row 1: 5000 + 5000 + 2000, 5000 tall
//!     Row 2: 5000 + 5000 + 2000, 3000 tall
//! ```

use crate::grid::{Grid, TileSize};
use crate::pipeline::{PipelineEvent, SourceDescriptor};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format one pipeline progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Planned {
            source,
            width,
            height,
            rows,
            cols,
            output_width,
            output_height,
        } => vec![
            format!(
                "{} {}x{} → {}x{}",
                file_label(source),
                width,
                height,
                output_width,
                output_height
            ),
            format!("{}Grid: {} rows x {} cols", indent(1), rows, cols),
        ],
        PipelineEvent::TileRescaled {
            row,
            col,
            width,
            height,
        } => vec![format!(
            "{}({}, {}) → {}x{}",
            indent(1),
            row,
            col,
            width,
            height
        )],
        PipelineEvent::Written {
            target,
            width,
            height,
            elapsed_ms,
        } => vec![format!(
            "Wrote {} ({}x{}) in {} ms",
            target.display(),
            width,
            height,
            elapsed_ms
        )],
    }
}

/// Format the grid a source would be cut into, without processing it.
pub fn format_plan(source: &SourceDescriptor, grid: &Grid, tile_size: TileSize) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} ({}, {}x{})",
            file_label(&source.path),
            format!("{:?}", source.format).to_lowercase(),
            source.width,
            source.height
        ),
        format!(
            "{}Grid: {} rows x {} cols, tiles up to {}x{}",
            indent(1),
            grid.rows(),
            grid.cols(),
            tile_size.width,
            tile_size.height
        ),
    ];

    for (i, row) in grid.row_slices().enumerate() {
        let widths: Vec<String> = row.iter().map(|t| t.width.to_string()).collect();
        let height = row.first().map(|t| t.height).unwrap_or(0);
        lines.push(format!(
            "{}Row {}: {}, {} tall",
            indent(1),
            i + 1,
            widths.join(" + "),
            height
        ));
    }
    lines
}

/// Format the result of a single-call operation.
pub fn format_written(target: &Path) -> Vec<String> {
    vec![format!("Wrote {}", target.display())]
}

/// Print plan output to stdout.
pub fn print_plan(source: &SourceDescriptor, grid: &Grid, tile_size: TileSize) {
    for line in format_plan(source, grid, tile_size) {
        println!("{}", line);
    }
}
