// CSV file backend

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use watermark_url_core::{CellValue, Headers, Record};

use super::{RecordSink, StorageError};

/// Suffix appended to the input file stem for the result file ("processed")
pub const OUTPUT_SUFFIX: &str = "_处理后";

/// Reject anything that is not a `.csv` file
pub fn ensure_supported_format(path: &Path) -> Result<(), StorageError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        Ok(())
    } else {
        Err(StorageError::UnsupportedFormat(path.to_path_buf()))
    }
}

/// Result file location: `<save_dir>/<input stem>_处理后.csv`
pub fn output_path_for(input: &Path, save_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    save_dir.join(format!("{}{}.csv", stem, OUTPUT_SUFFIX))
}

/// Streams records from a CSV file with a header row
///
/// Empty cells become [`CellValue::Null`]; everything else stays text.
/// Rows may be shorter or longer than the header.
pub struct CsvRecordSource<R = File> {
    headers: Headers,
    records: csv::StringRecordsIntoIter<R>,
}

impl CsvRecordSource<File> {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        ensure_supported_format(path)?;
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(StorageError::Read)?;
        Self::new(reader)
    }
}

impl<R: io::Read> CsvRecordSource<R> {
    pub fn from_reader(reader: R) -> Result<Self, StorageError> {
        Self::new(csv::ReaderBuilder::new().flexible(true).from_reader(reader))
    }

    fn new(mut reader: csv::Reader<R>) -> Result<Self, StorageError> {
        let headers = reader
            .headers()
            .map_err(StorageError::Read)?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(Self {
            headers: Headers(headers),
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl<R: io::Read> Iterator for CsvRecordSource<R> {
    type Item = Result<Record, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        Some(
            row.map(|row| row.iter().map(CellValue::from_raw).collect())
                .map_err(StorageError::Read),
        )
    }
}

// Rows end with CRLF, matching spreadsheet exports
fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.flexible(true).terminator(csv::Terminator::CRLF);
    builder
}

/// Writes records to a CSV file as they arrive
pub struct CsvFileSink<W: io::Write = File> {
    writer: csv::Writer<W>,
}

impl CsvFileSink<File> {
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        let writer = writer_builder()
            .from_path(path)
            .map_err(StorageError::Write)?;
        Ok(Self { writer })
    }
}

impl<W: io::Write> CsvFileSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: writer_builder().from_writer(writer),
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, StorageError> {
        self.writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }
}

impl<W: io::Write> RecordSink for CsvFileSink<W> {
    fn write_headers(&mut self, headers: &Headers) -> Result<(), StorageError> {
        self.writer
            .write_record(headers.names())
            .map_err(StorageError::Write)
    }

    fn write_record(&mut self, record: &Record) -> Result<(), StorageError> {
        self.writer
            .write_record(record.cells.iter().map(|cell| cell.to_string()))
            .map_err(StorageError::Write)
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let path = output_path_for(Path::new("/data/照片清单.csv"), Path::new("/out"));
        assert_eq!(path, PathBuf::from("/out/照片清单_处理后.csv"));
    }

    #[test]
    fn test_supported_format() {
        assert!(ensure_supported_format(Path::new("a.csv")).is_ok());
        assert!(ensure_supported_format(Path::new("a.CSV")).is_ok());
        assert!(matches!(
            ensure_supported_format(Path::new("a.xlsx")),
            Err(StorageError::UnsupportedFormat(_))
        ));
        assert!(ensure_supported_format(Path::new("csv")).is_err());
    }

    #[test]
    fn test_source_reads_headers_and_nulls() {
        let data = "id,时间,地址\n1,2024-03-05 14:22:01,\n2,,上海\n";
        let mut source = CsvRecordSource::from_reader(data.as_bytes()).unwrap();

        assert_eq!(source.headers().names(), ["id", "时间", "地址"]);

        let first = source.next().unwrap().unwrap();
        assert_eq!(first.cells[2], CellValue::Null);

        let second = source.next().unwrap().unwrap();
        assert_eq!(second.cells[1], CellValue::Null);
        assert_eq!(second.cells[2], CellValue::Text("上海".to_string()));

        assert!(source.next().is_none());
    }

    #[test]
    fn test_sink_writes_rows() {
        let mut sink = CsvFileSink::from_writer(Vec::new());
        sink.write_headers(&Headers(vec!["a".to_string(), "b".to_string()]))
            .unwrap();
        sink.write_record(&Record::new(vec!["x,y".into(), CellValue::Null]))
            .unwrap();
        sink.finish().unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "a,b\r\n\"x,y\",\r\n");
    }
}
