//! Repairs logs written by firmware that wrapped every record over two lines.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Joins each pair of lines `a`, `b` into `a.trim()` + `,` + `b`. A trailing
/// unpaired line is copied through unchanged. Returns the number of joined
/// rows.
///
/// The result is staged next to `output` and renamed over it at the end, so
/// `input` and `output` may be the same file.
pub fn join_split_lines(input: &Path, output: &Path) -> Result<usize> {
    let reader = File::open(input)
        .map(BufReader::new)
        .map_err(|source| io_error(input, source))?;
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(|source| io_error(output, source))?;
    let mut writer = BufWriter::new(staged);

    let mut joined = 0usize;
    let mut pending: Option<String> = None;
    for line in reader.lines() {
        let line = line.map_err(|source| io_error(input, source))?;
        match pending.take() {
            Some(first) => {
                writeln!(writer, "{},{}", first.trim(), line)
                    .map_err(|source| io_error(output, source))?;
                joined += 1;
            }
            None => pending = Some(line),
        }
    }
    if let Some(last) = pending {
        writeln!(writer, "{last}").map_err(|source| io_error(output, source))?;
    }

    let staged = writer
        .into_inner()
        .map_err(|err| io_error(output, err.into_error()))?;
    staged
        .persist(output)
        .map_err(|err| io_error(output, err.error))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = joined,
        "joined split log lines"
    );
    Ok(joined)
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}
