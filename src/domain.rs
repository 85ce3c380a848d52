use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::samples::SampleKind;
use crate::theme::Theme;

/// Number of table rows shown per page.
pub const PAGE_SIZE: usize = 25;

/// How long a status notification stays visible.
pub const TOAST_DURATION_MS: u64 = 3200;

pub const HELP_TEXT: &str = "\
Data
  o            open a file (csv, tsv, txt, json)
  1 / 2 / 3    load sales / employees / orders sample
  R            reset the dashboard

Table
  /            search all columns
  ← / →        select column
  s            sort by selected column (again to reverse)
  v            hide / show selected column
  n / p        next / previous page
  g / G        first / last page

Charts
  Tab          focus next chart panel
  c            switch chart type of focused panel

Export
  e            export all (csv)
  x / j        export csv / json
  i            export primary chart as png

Misc
  t            next color theme
  ?            this help
  Esc          close popup / cancel input
  q            quit
";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Unsupported type \".{0}\". Use CSV, JSON, or TSV.")]
    UnsupportedFileType(String),

    #[error("Failed to read file: {} not found.", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read file: permission denied for {}.", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Failed to read file.")]
    ReadFailed(#[source] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Parse error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("Parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parse error: No rows found. Check your file format.")]
    NoRows,

    #[error("No data to export.")]
    NoData,

    #[error("No chart available.")]
    NoChart,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("{0}")]
    LoadingFailed(String),

    #[error("Logging setup failed: {0}")]
    LoggingError(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct DashboardConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub export_dir: PathBuf,
    pub preferences_path: Option<PathBuf>,
    pub theme_override: Option<Theme>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: PAGE_SIZE,
            export_dir: PathBuf::from("."),
            preferences_path: None,
            theme_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    OpenFile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Sort,
    ToggleColumn,
    Search,
    OpenFile,
    Load(PathBuf),
    LoadSample(SampleKind),
    Reset,
    ExportAll,
    ExportCsv,
    ExportJson,
    ExportChart,
    NextTheme,
    NextPanel,
    NextChartKind,
}
