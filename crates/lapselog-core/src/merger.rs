use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, StringRecord, Writer};
use lapselog_parser::{RawRow, RowCodec, RowError};
use tracing::{debug, info, warn};

use crate::config::{FailureMode, FileOrder, MergeConfig};
use crate::error::{PipelineError, Result};
use crate::report::{FileFailure, FileSummary, MergeReport, RowFailure};

/// Combines every selected logger file in a directory into one CSV.
#[derive(Debug, Clone)]
pub struct LogMerger {
    codec: RowCodec,
    failure_mode: FailureMode,
    file_order: FileOrder,
    skip_header_rows: usize,
}

struct InputFile {
    name: String,
    path: PathBuf,
}

impl LogMerger {
    pub fn new(codec: RowCodec, failure_mode: FailureMode) -> Self {
        Self {
            codec,
            failure_mode,
            file_order: FileOrder::default(),
            skip_header_rows: 0,
        }
    }

    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        Ok(Self::new(config.codec()?, config.failure_mode)
            .with_file_order(config.file_order)
            .with_skip_header_rows(config.skip_header_rows))
    }

    pub fn with_file_order(mut self, file_order: FileOrder) -> Self {
        self.file_order = file_order;
        self
    }

    pub fn with_skip_header_rows(mut self, rows: usize) -> Self {
        self.skip_header_rows = rows;
        self
    }

    pub fn codec(&self) -> &RowCodec {
        &self.codec
    }

    /// Rewrites `output_path` from scratch with the header followed by every
    /// decoded row, file by file in merge order.
    ///
    /// In strict mode the first failure is returned as an error and the output
    /// is left flushed but incomplete; callers must discard it.
    pub fn merge<F>(&self, input_dir: &Path, output_path: &Path, file_filter: F) -> Result<MergeReport>
    where
        F: Fn(&str) -> bool,
    {
        let inputs = self.select_inputs(input_dir, output_path, &file_filter)?;
        debug!(count = inputs.len(), dir = %input_dir.display(), "selected input files");

        // Only replace the previous output once the inputs are known to exist.
        if output_path.exists() {
            info!(output = %output_path.display(), "overwriting existing output");
            fs::remove_file(output_path).map_err(|source| io_error(output_path, source))?;
        }

        let file = File::create(output_path).map_err(|source| io_error(output_path, source))?;
        let mut writer = Writer::from_writer(file);
        let mut report = MergeReport::new(output_path);

        let outcome = self.write_all(&mut writer, output_path, &inputs, &mut report);
        let flushed = writer.flush().map_err(|source| io_error(output_path, source));
        outcome?;
        flushed?;

        info!(
            output = %output_path.display(),
            rows_written = report.rows_written,
            files = report.files.len(),
            rows_failed = report.failures.len(),
            files_failed = report.file_failures.len(),
            "merge complete"
        );
        Ok(report)
    }

    fn select_inputs(
        &self,
        input_dir: &Path,
        output_path: &Path,
        file_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<InputFile>> {
        let dir_error = |source| PipelineError::InputDirectory {
            path: input_dir.to_path_buf(),
            source,
        };
        let output_name = output_path.file_name();
        let same_dir = same_directory(input_dir, output_path);

        let mut inputs = Vec::new();
        for entry in fs::read_dir(input_dir).map_err(dir_error)? {
            let entry = entry.map_err(dir_error)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %path.display(), "skipping file with non UTF-8 name");
                continue;
            };
            if same_dir && output_name == Some(entry.file_name().as_os_str()) {
                continue;
            }
            if file_filter(&name) {
                inputs.push(InputFile { name, path });
            }
        }

        if self.file_order == FileOrder::Name {
            inputs.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(inputs)
    }

    fn write_all<W: Write>(
        &self,
        writer: &mut Writer<W>,
        output_path: &Path,
        inputs: &[InputFile],
        report: &mut MergeReport,
    ) -> Result<()> {
        writer
            .write_record(self.codec.header())
            .map_err(|source| csv_error(output_path, source))?;

        for input in inputs {
            info!(file = %input.name, "processing log file");
            let mut summary = FileSummary {
                file: input.name.clone(),
                rows_written: 0,
                rows_failed: 0,
            };
            let outcome = self.write_file(writer, output_path, input, &mut summary, report);
            report.files.push(summary);
            outcome?;
        }
        Ok(())
    }

    fn write_file<W: Write>(
        &self,
        writer: &mut Writer<W>,
        output_path: &Path,
        input: &InputFile,
        summary: &mut FileSummary,
        report: &mut MergeReport,
    ) -> Result<()> {
        let file = match File::open(&input.path) {
            Ok(file) => file,
            Err(source) => {
                return self.file_failed(report, input, None, source.to_string(), || {
                    io_error(&input.path, source)
                })
            }
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut record = ByteRecord::new();
        let mut index = 0usize;

        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(source) => {
                    let line = source.position().map(|pos| pos.line());
                    return self.file_failed(report, input, line, source.to_string(), || {
                        csv_error(&input.path, source)
                    });
                }
            }
            index += 1;
            if index <= self.skip_header_rows {
                continue;
            }

            let line = record
                .position()
                .map(|pos| pos.line())
                .unwrap_or(index as u64);
            let decoded = match StringRecord::from_byte_record(record.clone()) {
                Ok(text) => {
                    let raw = RawRow::from(&text);
                    self.codec.decode(&raw).map_err(|error| (raw.to_string(), error))
                }
                Err(err) => Err((lossy_row(&record), encoding_error(&err))),
            };

            match decoded {
                Ok(row) => {
                    writer
                        .write_record(&row.to_record())
                        .map_err(|source| csv_error(output_path, source))?;
                    summary.rows_written += 1;
                    report.rows_written += 1;
                }
                Err((raw, error)) => {
                    let failure = RowFailure {
                        file: input.name.clone(),
                        line,
                        raw,
                        error,
                    };
                    summary.rows_failed += 1;
                    match self.failure_mode {
                        FailureMode::Strict => {
                            warn!(%failure, "aborting merge on malformed row");
                            return Err(PipelineError::Row {
                                failure: Box::new(failure),
                                rows_written: report.rows_written,
                            });
                        }
                        FailureMode::Lenient => {
                            warn!(
                                file = %failure.file,
                                line = failure.line,
                                raw = %failure.raw,
                                error = %failure.error,
                                "skipping malformed row"
                            );
                            report.failures.push(failure);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Records a file-level failure in lenient mode; builds the fatal error in
    /// strict mode.
    fn file_failed(
        &self,
        report: &mut MergeReport,
        input: &InputFile,
        line: Option<u64>,
        message: String,
        fatal: impl FnOnce() -> PipelineError,
    ) -> Result<()> {
        match self.failure_mode {
            FailureMode::Strict => Err(fatal()),
            FailureMode::Lenient => {
                warn!(file = %input.name, ?line, %message, "skipping rest of unreadable file");
                report.file_failures.push(FileFailure {
                    file: input.name.clone(),
                    line,
                    message,
                });
                Ok(())
            }
        }
    }
}

/// Merges with settings taken from `config`; validation happens before the
/// input directory or output path is touched.
pub fn merge<F>(
    input_dir: &Path,
    output_path: &Path,
    file_filter: F,
    config: &MergeConfig,
) -> Result<MergeReport>
where
    F: Fn(&str) -> bool,
{
    LogMerger::from_config(config)?.merge(input_dir, output_path, file_filter)
}

fn lossy_row(record: &ByteRecord) -> String {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(",")
}

fn encoding_error(err: &csv::FromUtf8Error) -> RowError {
    RowError::Encoding {
        field: err.utf8_error().field(),
        message: err.utf8_error().to_string(),
    }
}

fn same_directory(input_dir: &Path, output_path: &Path) -> bool {
    let parent = match output_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return false,
    };
    match (fs::canonicalize(input_dir), fs::canonicalize(parent)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn io_error(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> PipelineError {
    PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
