#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod assemble;
mod config;
mod diagnostics;
mod lines;
mod output;

use anyhow::Result;

pub use self::assemble::{assemble, run_assembler, ELAPSED_SECONDS, ELEVATION};
pub use self::config::{Config, DropColumns, Encoding};
pub use self::diagnostics::{Diagnostics, LogDiagnostics, MemoryDiagnostics};
pub use self::lines::{
    file_name_for, line_document, line_labels, read_metro_rows, run_builder, serialize_document,
    trip_paths, write_line_documents, MetroRow, TripPath,
};

/// Assembles the feed, then builds every line from the table just written.
pub fn run_pipeline(config: &Config, diagnostics: &mut dyn Diagnostics) -> Result<()> {
    run_assembler(config, diagnostics)?;
    let written = run_builder(config, diagnostics)?;
    diagnostics.info(&format!(
        "Pipeline finished with {} line documents in {}",
        written.len(),
        config.output_dir.display()
    ));
    Ok(())
}
