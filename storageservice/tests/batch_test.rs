use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use watermark_url_core::{
    CellValue, ColumnSelection, ErrorCode, FixedClock, Headers, Record, RecordTransformer,
    StatusLevel, WatermarkComposer,
};
use watermark_url_storageservice::{
    inspect_columns, process_file, process_file_with_status, BatchService, CsvFileSink,
    ProcessOptions, RecordSink, StorageError,
};

// ========================================
// Helpers
// ========================================

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap(),
    )
}

fn write_input(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options(input: &Path, output_dir: &Path) -> ProcessOptions {
    ProcessOptions {
        input: input.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        time_column: None,
        watermark_column: None,
    }
}

/// Sink that keeps records in memory and fails after `fail_after` rows
#[derive(Default)]
struct MemorySink {
    headers: Option<Headers>,
    records: Vec<Record>,
    fail_after: Option<usize>,
    finished: bool,
}

impl RecordSink for MemorySink {
    fn write_headers(&mut self, headers: &Headers) -> Result<(), StorageError> {
        self.headers = Some(headers.clone());
        Ok(())
    }

    fn write_record(&mut self, record: &Record) -> Result<(), StorageError> {
        if Some(self.records.len()) == self.fail_after {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        self.finished = true;
        Ok(())
    }
}

// ========================================
// process_file
// ========================================

#[test]
fn test_process_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "photos.csv",
        "编号,拍摄时间,水印地址,图片,备注\n\
         1,2024/03/05 14:22:01,浙江省杭州市西湖区文三路一百号科技大厦八楼,https://img.example.com/p/1.jpg,ok\n\
         2,bad,上海,https://img.example.com/p/2.png,\n\
         3,2024-03-06 08:00:00,北京,ftp://img.example.com/p/3.jpg;https://img.example.com/p/4.jpg,\n",
    );

    let mut progress = Vec::new();
    let (output, summary) =
        process_file(&options(&input, dir.path()), clock(), |n| progress.push(n)).unwrap();

    assert_eq!(output, dir.path().join("photos_处理后.csv"));
    assert_eq!(summary.rows_processed, 3);
    assert_eq!(summary.urls_rewritten, 2);
    assert_eq!(progress, vec![1, 2, 3]);

    let written = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.split("\r\n").collect();

    assert_eq!(lines[0], "编号,拍摄时间,水印地址,图片,备注");

    let composer = WatermarkComposer::new(clock());
    let first_url = composer.compose(
        "https://img.example.com/p/1.jpg",
        "2024/03/05 14:22:01",
        "浙江省杭州市西湖区文三路一百号科技大厦八楼",
    );
    assert_eq!(
        lines[1],
        format!(
            "1,2024/03/05 14:22:01,浙江省杭州市西湖区文三路一百号科技大厦八楼,\"{}\",ok",
            first_url
        )
    );
    assert_eq!(lines[2], "2,bad,上海,https://img.example.com/p/2.png,");
    assert_eq!(lines[3], "3,2024-03-06 08:00:00,北京,ftp://img.example.com/p/3.jpg,");
    assert_eq!(lines[4], "");
}

#[test]
fn test_process_file_explicit_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "list.csv",
        "when,where,pic\n2024-03-05 14:22:01,addr,http://x/y.jpg\n",
    );

    let mut opts = options(&input, dir.path());
    opts.time_column = Some("when".to_string());
    opts.watermark_column = Some("where".to_string());

    let (output, summary) = process_file(&opts, clock(), |_| {}).unwrap();
    assert_eq!(summary.urls_rewritten, 1);

    let written = fs::read_to_string(output).unwrap();
    let expected = WatermarkComposer::new(clock()).compose("http://x/y.jpg", "2024-03-05 14:22:01", "addr");
    assert!(written.contains(&expected));
}

#[test]
fn test_process_file_missing_selection() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "list.csv", "a,b\n1,2\n");

    let result = process_file_with_status(&options(&input, dir.path()), clock(), |_| {});

    assert_eq!(result.level, StatusLevel::Warning);
    assert_eq!(result.code, ErrorCode::SelectionMissing);
    assert_eq!(result.message, "请确保所有选项都已选择");
    assert!(!dir.path().join("list_处理后.csv").exists());
}

#[test]
fn test_process_file_unknown_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "list.csv", "时间,地址\n1,2\n");

    let mut opts = options(&input, dir.path());
    opts.time_column = Some("日期".to_string());

    let result = process_file_with_status(&opts, clock(), |_| {});

    assert_eq!(result.code, ErrorCode::ColumnNotFound);
    assert_eq!(result.message, "找不到列: 日期");
}

#[test]
fn test_process_file_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "list.xlsx", "not really a workbook");

    let result = process_file_with_status(&options(&input, dir.path()), clock(), |_| {});

    assert_eq!(result.level, StatusLevel::Error);
    assert_eq!(result.code, ErrorCode::UnsupportedFormat);
    assert!(result.message.starts_with("不支持的文件格式"));
    assert!(!dir.path().join("list_处理后.csv").exists());
}

#[test]
fn test_process_file_missing_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "list.csv", "时间,地址\n1,2\n");

    let result = process_file_with_status(
        &options(&input, &dir.path().join("missing")),
        clock(),
        |_| {},
    );

    assert_eq!(result.code, ErrorCode::WriteError);
    assert!(result.message.starts_with("处理过程中出错: "));
}

#[test]
fn test_inspect_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "list.csv", "编号,上传时间,地址,图片\n");

    let report = inspect_columns(&input).unwrap();

    assert_eq!(report.headers.names().len(), 4);
    assert_eq!(report.time_column.as_deref(), Some("上传时间"));
    assert_eq!(report.watermark_column.as_deref(), Some("地址"));
}

// ========================================
// BatchService
// ========================================

#[test]
fn test_batch_stops_on_sink_error_and_keeps_written_rows() {
    let headers = Headers(vec!["时间".to_string(), "地址".to_string(), "图".to_string()]);
    let selection = ColumnSelection::resolve(&headers, "时间", "地址").unwrap();
    let transformer = RecordTransformer::new(selection, clock());

    let records: Vec<Result<Record, StorageError>> = (0..5)
        .map(|i| {
            Ok(Record::new(vec![
                CellValue::Null,
                CellValue::Text(format!("addr {i}")),
                "https://x/y.jpg".into(),
            ]))
        })
        .collect();

    let mut service = BatchService::new(MemorySink {
        fail_after: Some(2),
        ..MemorySink::default()
    });
    let mut progress = 0;
    let result = service.run(&headers, records, &transformer, |n| progress = n);

    assert!(matches!(result, Err(StorageError::Io(_))));
    assert_eq!(progress, 2);

    let sink = service.into_sink();
    assert!(sink.finished);
    assert_eq!(sink.headers, Some(headers));
    assert_eq!(sink.records.len(), 2);
}

#[test]
fn test_batch_stops_on_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let headers = Headers(vec!["时间".to_string(), "地址".to_string()]);
    let selection = ColumnSelection::resolve(&headers, "时间", "地址").unwrap();
    let transformer = RecordTransformer::new(selection, clock());

    let output = dir.path().join("out.csv");
    let records = vec![
        Ok(Record::new(vec!["t".into(), "a".into()])),
        Err(StorageError::UnsupportedFormat(output.clone())),
        Ok(Record::new(vec!["t".into(), "b".into()])),
    ];

    let mut service = BatchService::new(CsvFileSink::create(&output).unwrap());
    let result = service.run(&headers, records, &transformer, |_| {});

    assert!(result.is_err());
    drop(service);
    assert_eq!(fs::read_to_string(&output).unwrap(), "时间,地址\r\nt,a\r\n");
}
