use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::dataset::Dataset;
use crate::domain::DashboardError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    CSV,
    TSV,
    TXT,
    JSON,
}

impl FileType {
    pub fn detect(path: &Path) -> Result<FileType, DashboardError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileType::CSV),
            "tsv" => Ok(FileType::TSV),
            "txt" => Ok(FileType::TXT),
            "json" => Ok(FileType::JSON),
            _ => Err(DashboardError::UnsupportedFileType(ext)),
        }
    }

    fn separator(&self) -> u8 {
        match self {
            FileType::TSV => b'\t',
            _ => b',',
        }
    }
}

/// Parse file content of the given type into a dataset.
pub fn parse_content(
    name: &str,
    file_type: FileType,
    content: &str,
) -> Result<Dataset, DashboardError> {
    let start_time = Instant::now();
    let dataset = match file_type {
        FileType::JSON => parse_json(name, content)?,
        ft => parse_delimited(name, content, ft.separator())?,
    };
    info!(
        "Parsed {} rows from \"{}\" in {}ms",
        dataset.row_count(),
        name,
        start_time.elapsed().as_millis()
    );
    Ok(dataset)
}

/// Parse CSV/TSV text. The first line is the header, every field is read as
/// text and coerced cell by cell.
pub fn parse_delimited(name: &str, content: &str, separator: u8) -> Result<Dataset, DashboardError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DashboardError::NoRows);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(separator)
                .with_truncate_ragged_lines(true)
        })
        .into_reader_with_file_handle(Cursor::new(content.as_bytes().to_vec()))
        .finish()?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    // Each column is converted in its own task
    let converted: Result<Vec<Vec<Value>>, PolarsError> = columns
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let converted = converted?;

    let nrows = df.height();
    let rows: Vec<Vec<Value>> = (0..nrows)
        .map(|ridx| converted.iter().map(|c| c[ridx].clone()).collect())
        .collect();
    trace!("Delimited input: {} columns, {} rows", columns.len(), rows.len());

    Dataset::new(name, columns, rows)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Value>, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series.into_iter().map(Value::coerce).collect())
}

// null, false, 0, NaN and "" count as missing
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Parse a JSON document. Accepted shapes are an array of objects, or an
/// object whose `data` entry (or first entry) is such an array.
pub fn parse_json(name: &str, content: &str) -> Result<Dataset, DashboardError> {
    let parsed: serde_json::Value = serde_json::from_str(content)?;

    let array = match &parsed {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(map) => match map.get("data") {
            Some(data) if is_truthy(data) => data.as_array(),
            _ => map.values().next().and_then(|v| v.as_array()),
        },
        _ => None,
    }
    .ok_or_else(|| {
        DashboardError::ParseError("JSON must be a top-level array of objects.".to_string())
    })?;

    let records = array
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let obj = item.as_object().ok_or_else(|| {
                DashboardError::ParseError(format!("Element at index {idx} must be an object."))
            })?;
            Ok(obj
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect())
        })
        .collect::<Result<Vec<Vec<(String, Value)>>, DashboardError>>()?;

    Dataset::from_records(name, records)
}

/// Result of a background file read.
#[derive(Debug)]
pub struct LoadEvent {
    pub id: u64,
    pub path: PathBuf,
    pub file_type: FileType,
    pub content: Result<String, DashboardError>,
}

/// Reads files off the UI thread, one at a time.
///
/// Starting a new read makes any read still in flight stale; its completion
/// is dropped when it arrives.
pub struct FileLoader {
    next_id: u64,
    active: Option<u64>,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            next_id: 0,
            active: None,
            tx,
            rx,
        }
    }

    /// Validate the file type and start reading in the background.
    pub fn start(&mut self, path: PathBuf) -> Result<u64, DashboardError> {
        let file_type = FileType::detect(&path)?;
        self.next_id += 1;
        let id = self.next_id;
        if let Some(previous) = self.active.replace(id) {
            debug!("Load {previous} superseded by load {id}");
        }

        let tx = self.tx.clone();
        rayon::spawn(move || {
            let content = read_file(&path);
            // The receiver is gone when the loader was dropped
            let _ = tx.send(LoadEvent {
                id,
                path,
                file_type,
                content,
            });
        });
        Ok(id)
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    /// Return the completion of the active read, if it arrived.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if self.active == Some(event.id) {
                self.active = None;
                return Some(event);
            }
            warn!("Dropping stale load {} for {:?}", event.id, event.path);
        }
        None
    }
}

fn read_file(path: &Path) -> Result<String, DashboardError> {
    let metadata = fs::metadata(path).map_err(|e| map_io_error(path, e))?;
    if !metadata.is_file() {
        return Err(DashboardError::LoadingFailed(format!(
            "{} is not a file!",
            path.display()
        )));
    }
    trace!("Reading {} bytes from {:?}", metadata.len(), path);
    fs::read_to_string(path).map_err(|e| map_io_error(path, e))
}

fn map_io_error(path: &Path, e: std::io::Error) -> DashboardError {
    match e.kind() {
        ErrorKind::NotFound => DashboardError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => DashboardError::PermissionDenied(path.to_path_buf()),
        _ => DashboardError::ReadFailed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn detect_file_types() {
        assert_eq!(FileType::detect(Path::new("a.CSV")).unwrap(), FileType::CSV);
        assert_eq!(FileType::detect(Path::new("a.tsv")).unwrap(), FileType::TSV);
        assert_eq!(FileType::detect(Path::new("a.txt")).unwrap(), FileType::TXT);
        assert_eq!(FileType::detect(Path::new("a.json")).unwrap(), FileType::JSON);
        let err = FileType::detect(Path::new("a.xlsx")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported type \".xlsx\". Use CSV, JSON, or TSV.");
    }

    #[test]
    fn csv_values_are_coerced_per_cell() {
        let ds = parse_delimited("t", "name,amount,flag\nA,10,true\nB,x,false\nC,,\n", b',').unwrap();
        assert_eq!(ds.columns(), &["name", "amount", "flag"]);
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.value(0, 1), &Value::Number(10.0));
        assert_eq!(ds.value(1, 1), &Value::Text("x".into()));
        assert_eq!(ds.value(0, 2), &Value::Bool(true));
        assert_eq!(ds.value(2, 1), &Value::Empty);
    }

    #[test]
    fn csv_quoted_fields() {
        let ds = parse_delimited("t", "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n", b',').unwrap();
        assert_eq!(ds.value(0, 0), &Value::Text("x, y".into()));
        assert_eq!(ds.value(0, 1), &Value::Text("say \"hi\"".into()));
    }

    #[test]
    fn tsv_uses_tab_separator() {
        let ds = parse_content("t.tsv", FileType::TSV, "a\tb\n1\t2\n").unwrap();
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.value(0, 1), &Value::Number(2.0));
    }

    #[test]
    fn ragged_lines_are_truncated() {
        let ds = parse_content("r.csv", FileType::CSV, "a,b\n1,2\n3,4,5\n6,7\n").unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows()[1], vec![Value::Number(3.0), Value::Number(4.0)]);
        assert_eq!(ds.value(2, 1), &Value::Number(7.0));

        let ds = parse_content("r.csv", FileType::CSV, "a,b\n1\n2,3\n").unwrap();
        assert_eq!(ds.rows()[0], vec![Value::Number(1.0), Value::Empty]);
    }

    #[test]
    fn rows_of_empty_fields_are_kept() {
        let ds = parse_delimited("t", "a,b\nx,1\n,\ny,2", b',').unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows()[1], vec![Value::Empty, Value::Empty]);
        assert_eq!(ds.value(2, 0), &Value::Text("y".into()));
    }

    #[test]
    fn header_only_csv_has_no_rows() {
        let err = parse_delimited("t", "a,b\n", b',').unwrap_err();
        assert!(matches!(err, DashboardError::NoRows));
        let err = parse_delimited("t", "   \n", b',').unwrap_err();
        assert!(matches!(err, DashboardError::NoRows));
    }

    #[test]
    fn json_shapes() {
        let ds = parse_json("t", r#"[{"b": 1, "a": "x"}]"#).unwrap();
        // Key order of the document is kept
        assert_eq!(ds.columns(), &["b", "a"]);

        let ds = parse_json("t", r#"{"data": [{"a": 1}, {"a": 2}]}"#).unwrap();
        assert_eq!(ds.row_count(), 2);

        let ds = parse_json("t", r#"{"records": [{"a": 1}]}"#).unwrap();
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn falsy_data_entry_falls_back_to_first_value() {
        for data in ["null", "false", "0", "0.0", r#""""#] {
            let doc = format!(r#"{{"rows": [{{"a": 1}}, {{"a": 2}}], "data": {data}}}"#);
            let ds = parse_json("t", &doc).unwrap();
            assert_eq!(ds.row_count(), 2, "data: {data}");
        }

        // A truthy entry that is not an array is still rejected
        let err = parse_json("t", r#"{"rows": [{"a": 1}], "data": "x"}"#).unwrap_err();
        assert!(matches!(err, DashboardError::ParseError(_)));
    }

    #[test]
    fn json_errors() {
        let err = parse_json("t", r#"{"a": 1}"#).unwrap_err();
        assert_eq!(err.to_string(), "Parse error: JSON must be a top-level array of objects.");
        assert!(matches!(parse_json("t", "[").unwrap_err(), DashboardError::JsonError(_)));
        assert!(matches!(parse_json("t", "[]").unwrap_err(), DashboardError::NoRows));
        assert!(matches!(parse_json("t", "[1, 2]").unwrap_err(), DashboardError::ParseError(_)));
    }

    fn wait_for(loader: &mut FileLoader) -> LoadEvent {
        for _ in 0..500 {
            if let Some(event) = loader.poll() {
                return event;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("load did not finish");
    }

    #[test]
    fn background_read_reports_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a\n1\n").unwrap();

        let mut loader = FileLoader::new();
        let id = loader.start(path).unwrap();
        assert!(loader.is_loading());
        let event = wait_for(&mut loader);
        assert_eq!(event.id, id);
        assert_eq!(event.content.unwrap(), "a\n1\n");
        assert!(!loader.is_loading());
    }

    #[test]
    fn missing_file_is_a_read_failure() {
        let mut loader = FileLoader::new();
        loader.start(PathBuf::from("/does/not/exist.csv")).unwrap();
        let event = wait_for(&mut loader);
        assert!(matches!(event.content, Err(DashboardError::FileNotFound(_))));
    }

    #[test]
    fn superseded_read_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        fs::write(&first, "a\n1\n").unwrap();
        fs::write(&second, "b\n2\n").unwrap();

        let mut loader = FileLoader::new();
        loader.start(first).unwrap();
        let id = loader.start(second.clone()).unwrap();
        let event = wait_for(&mut loader);
        assert_eq!(event.id, id);
        assert_eq!(event.path, second);
    }

    #[test]
    fn unsupported_type_is_rejected_before_reading() {
        let mut loader = FileLoader::new();
        assert!(loader.start(PathBuf::from("data.xls")).is_err());
        assert!(!loader.is_loading());
    }
}
