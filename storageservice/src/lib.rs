// Storage service library for the watermark URL tool
//
// This crate reads source tables, streams rewritten records to a sink
// and reports the outcome of a batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use watermark_url_core::{
    detect_time_column, detect_watermark_column, Clock, ColumnSelection, Headers,
    ProcessError, ProcessResult, Record, RecordTransformer,
};

pub mod csv_file;
mod errors;

pub use csv_file::{ensure_supported_format, output_path_for, CsvFileSink, CsvRecordSource};
pub use errors::StorageError;

/// Destination for rewritten records
pub trait RecordSink {
    fn write_headers(&mut self, headers: &Headers) -> Result<(), StorageError>;
    fn write_record(&mut self, record: &Record) -> Result<(), StorageError>;

    /// Flush buffered output
    fn finish(&mut self) -> Result<(), StorageError>;
}

/// Counts for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows_processed: usize,
    pub urls_rewritten: usize,
}

/// Batch service with pluggable sink
pub struct BatchService<S: RecordSink> {
    sink: S,
}

impl<S: RecordSink> BatchService<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Write the header row, then every rewritten record in input order
    ///
    /// `on_progress` receives the number of records written so far. The
    /// first error stops the batch; records already written are flushed
    /// and kept.
    pub fn run<I, C, F>(
        &mut self,
        headers: &Headers,
        records: I,
        transformer: &RecordTransformer<C>,
        mut on_progress: F,
    ) -> Result<BatchSummary, StorageError>
    where
        I: IntoIterator<Item = Result<Record, StorageError>>,
        C: Clock,
        F: FnMut(usize),
    {
        let mut summary = BatchSummary::default();

        let streamed = self.stream(headers, records, transformer, &mut summary, &mut on_progress);
        let finished = self.sink.finish();

        if let Err(e) = &streamed {
            tracing::error!(
                rows_written = summary.rows_processed,
                "Batch stopped: {}",
                e
            );
        }

        streamed?;
        finished?;
        Ok(summary)
    }

    fn stream<I, C, F>(
        &mut self,
        headers: &Headers,
        records: I,
        transformer: &RecordTransformer<C>,
        summary: &mut BatchSummary,
        on_progress: &mut F,
    ) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = Result<Record, StorageError>>,
        C: Clock,
        F: FnMut(usize),
    {
        self.sink.write_headers(headers)?;

        for transformed in transformer.transform_all(records) {
            let transformed = transformed?;
            self.sink.write_record(&transformed.record)?;

            summary.rows_processed += 1;
            summary.urls_rewritten += transformed.rewritten_cells;
            on_progress(summary.rows_processed);
        }

        Ok(())
    }
}

/// Inputs of a file batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Source CSV file
    pub input: PathBuf,

    /// Directory receiving the result file
    pub output_dir: PathBuf,

    /// Timestamp column; detected from the headers when absent
    pub time_column: Option<String>,

    /// Address column; detected from the headers when absent
    pub watermark_column: Option<String>,
}

/// Header row and the columns that would be picked automatically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    pub headers: Headers,
    pub time_column: Option<String>,
    pub watermark_column: Option<String>,
}

/// Read the header row of `input` and guess the time and address columns
pub fn inspect_columns(input: &Path) -> Result<ColumnReport, StorageError> {
    let source = CsvRecordSource::open(input)?;
    let headers = source.headers().clone();

    Ok(ColumnReport {
        time_column: detect_time_column(&headers).map(str::to_string),
        watermark_column: detect_watermark_column(&headers).map(str::to_string),
        headers,
    })
}

/// Pick the configured column, or fall back to detection
fn choose_column<'a>(
    configured: Option<&'a str>,
    detected: Option<&'a str>,
) -> Result<&'a str, ProcessError> {
    configured
        .filter(|name| !name.is_empty())
        .or(detected)
        .ok_or(ProcessError::SelectionMissing)
}

/// Process one CSV file into `<output_dir>/<stem>_处理后.csv`
///
/// Returns the output path and batch counts.
pub fn process_file<C, F>(
    options: &ProcessOptions,
    clock: C,
    on_progress: F,
) -> Result<(PathBuf, BatchSummary), StorageError>
where
    C: Clock,
    F: FnMut(usize),
{
    let source = CsvRecordSource::open(&options.input)?;
    let headers = source.headers().clone();

    let time_column = choose_column(options.time_column.as_deref(), detect_time_column(&headers))?;
    let watermark_column = choose_column(
        options.watermark_column.as_deref(),
        detect_watermark_column(&headers),
    )?;
    let selection = ColumnSelection::resolve(&headers, time_column, watermark_column)?;

    tracing::info!(
        input = %options.input.display(),
        time_column,
        watermark_column,
        "Starting batch"
    );

    let output = output_path_for(&options.input, &options.output_dir);
    let transformer = RecordTransformer::new(selection, clock);
    let mut service = BatchService::new(CsvFileSink::create(&output)?);
    let summary = service.run(&headers, source, &transformer, on_progress)?;

    tracing::info!(
        output = %output.display(),
        rows = summary.rows_processed,
        urls = summary.urls_rewritten,
        "Batch finished"
    );

    Ok((output, summary))
}

/// Run [`process_file`] and turn the outcome into a user-facing status
pub fn process_file_with_status<C, F>(options: &ProcessOptions, clock: C, on_progress: F) -> ProcessResult
where
    C: Clock,
    F: FnMut(usize),
{
    match process_file(options, clock, on_progress) {
        Ok((output, summary)) => batch_success_result(&output, summary),
        Err(e) => storage_error_to_result(&e),
    }
}

/// Convert StorageError to ProcessResult
pub fn storage_error_to_result(error: &StorageError) -> ProcessResult {
    ProcessResult::error(
        error.status_level(),
        error.to_error_code(),
        error.status_message(),
        error.context(),
    )
}

/// Create success ProcessResult for a finished batch
pub fn batch_success_result(output: &Path, summary: BatchSummary) -> ProcessResult {
    ProcessResult::success(
        format!("处理完成，结果保存至: {}", output.display()),
        Some(serde_json::json!({
            "output": output.display().to_string(),
            "rowsProcessed": summary.rows_processed,
            "urlsRewritten": summary.urls_rewritten,
        })),
    )
}
