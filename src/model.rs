use rand::thread_rng;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::aggregate::{Kpi, build_kpis, format_grouped};
use crate::charts::{ChartPanel, ChartSet};
use crate::dataset::{ColumnClasses, Dataset};
use crate::domain::{CMDMode, DashboardConfig, DashboardError, HELP_TEXT, Message};
use crate::export::{
    CHART_EXPORT_FILE, CHART_HEIGHT, CHART_WIDTH, CSV_EXPORT_FILE, JSON_EXPORT_FILE,
    render_chart_png, to_csv, to_json, write_export,
};
use crate::inputter::{InputResult, Inputter};
use crate::loader::{FileLoader, LoadEvent, parse_content};
use crate::samples::{SampleKind, generate};
use crate::table::{PageButton, TableView};
use crate::theme::{PreferenceStore, Theme};

/// How long the finished progress bar stays on screen.
const PROGRESS_LINGER_MS: u64 = 700;

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    LOADING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    DASHBOARD,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: u16,
    pub text: String,
    pub updated: Instant,
}

impl Progress {
    fn new(percent: u16, text: &str) -> Self {
        Self {
            percent,
            text: text.to_string(),
            updated: Instant::now(),
        }
    }
}

/// Everything derived from one loaded dataset.
///
/// A session is created for every load and disposed before the next one
/// replaces it, or on reset.
pub struct Session {
    dataset: Dataset,
    classes: ColumnClasses,
    kpis: Vec<Kpi>,
    charts: ChartSet,
    table: TableView,
}

impl Session {
    fn new(dataset: Dataset, page_size: usize) -> Self {
        let classes = dataset.classify();
        let kpis = build_kpis(&dataset, &classes);
        let charts = ChartSet::build(&dataset, &classes);
        let table = TableView::new(&dataset, page_size);
        Self {
            dataset,
            classes,
            kpis,
            charts,
            table,
        }
    }

    fn dispose(mut self) {
        debug!("Disposing session for \"{}\"", self.dataset.name());
        self.charts.teardown();
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn classes(&self) -> &ColumnClasses {
        &self.classes
    }

    pub fn charts(&self) -> &ChartSet {
        &self.charts
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub name: String,
    pub sort_arrow: Option<&'static str>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnToggleView {
    pub name: String,
    pub visible: bool,
    pub selected: bool,
}

/// Projection of the model handed to the UI for rendering.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub file_info: String,
    pub has_data: bool,
    pub theme: Theme,
    pub kpis: Vec<Kpi>,
    pub charts: Vec<ChartPanel>,
    pub focused_panel: usize,
    pub headers: Vec<HeaderView>,
    pub column_toggles: Vec<ColumnToggleView>,
    pub rows: Vec<Vec<String>>,
    pub nrows: usize,
    pub pagination_info: String,
    pub page_buttons: Vec<PageButton>,
    pub search_query: String,
    pub progress: Option<Progress>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub status_level: ToastLevel,
    pub last_status_message_update: Instant,
    pub width: usize,
    pub height: usize,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            file_info: String::new(),
            has_data: false,
            theme: Theme::default(),
            kpis: Vec::new(),
            charts: Vec::new(),
            focused_panel: 0,
            headers: Vec::new(),
            column_toggles: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            pagination_info: "No data loaded".to_string(),
            page_buttons: Vec::new(),
            search_query: String::new(),
            progress: None,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            status_level: ToastLevel::Info,
            last_status_message_update: Instant::now(),
            width: 0,
            height: 0,
            last_update: Instant::now(),
        }
    }
}

/// The dashboard controller. Owns the active session and all view state.
pub struct Model {
    config: DashboardConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    session: Option<Session>,
    loader: FileLoader,
    progress: Option<Progress>,
    theme: Theme,
    preferences: PreferenceStore,
    file_info: String,
    selected_column: usize,
    focused_panel: usize,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    popup_message: String,
    status_message: String,
    status_level: ToastLevel,
    last_status_message_update: Instant,
    width: usize,
    height: usize,
    uidata: UIData,
}

impl Model {
    pub fn init(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let preferences = config
            .preferences_path
            .clone()
            .map(PreferenceStore::new)
            .unwrap_or_else(PreferenceStore::default_location);
        let theme = config
            .theme_override
            .unwrap_or_else(|| preferences.load_theme());
        info!("Starting with theme {}", theme.label());

        let mut model = Self {
            config: config.clone(),
            status: Status::EMPTY,
            modus: Modus::DASHBOARD,
            previous_modus: Modus::DASHBOARD,
            session: None,
            loader: FileLoader::new(),
            progress: None,
            theme,
            preferences,
            file_info: String::new(),
            selected_column: 0,
            focused_panel: 0,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            popup_message: String::new(),
            status_message: String::new(),
            status_level: ToastLevel::Info,
            last_status_message_update: Instant::now(),
            width: 0,
            height: 0,
            uidata: UIData::empty(),
        };
        model.update_uidata();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DashboardError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::DASHBOARD => match msg {
                    Message::Quit => self.quit(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.resize(width, height),
                    Message::MoveLeft => self.select_column(-1),
                    Message::MoveRight => self.select_column(1),
                    Message::NextPage => self.with_table(|t, _| t.next_page()),
                    Message::PrevPage => self.with_table(|t, _| t.prev_page()),
                    Message::FirstPage => self.with_table(|t, _| t.set_page(1)),
                    Message::LastPage => self.with_table(|t, _| t.last_page()),
                    Message::Sort => self.sort_selected_column(),
                    Message::ToggleColumn => self.toggle_selected_column(),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::OpenFile => self.enter_cmd_mode(CMDMode::OpenFile),
                    Message::Load(path) => self.start_load(path),
                    Message::LoadSample(kind) => self.load_sample(kind),
                    Message::Reset => self.reset(),
                    Message::ExportAll | Message::ExportCsv => self.export_csv(),
                    Message::ExportJson => self.export_json(),
                    Message::ExportChart => self.export_chart(),
                    Message::NextTheme => self.apply_theme(self.theme.next()),
                    Message::NextPanel => self.focus_next_panel(),
                    Message::NextChartKind => self.cycle_chart_kind(),
                    Message::Exit | Message::RawKey(_) => {}
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.resize(width, height),
                    Message::Exit | Message::Help => self.close_popup(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.resize(width, height),
                    _ => (),
                },
            }
        }
        self.update_uidata();
        Ok(())
    }

    /// Process background work: file read completions and expiring progress.
    pub fn tick(&mut self) {
        let mut changed = false;
        if let Some(event) = self.loader.poll() {
            self.finish_load(event);
            changed = true;
        }
        if let Some(progress) = &self.progress
            && progress.percent >= 100
            && progress.updated.elapsed() > Duration::from_millis(PROGRESS_LINGER_MS)
        {
            self.progress = None;
            changed = true;
        }
        if changed {
            self.update_uidata();
        }
    }

    // -------------------- Loading ---------------------- //

    fn start_load(&mut self, path: PathBuf) {
        info!("Loading {:?}", path);
        match self.loader.start(path) {
            Ok(id) => {
                trace!("Started load {id}");
                self.status = Status::LOADING;
                self.progress = Some(Progress::new(10, "Reading file…"));
            }
            Err(e) => self.report_error(e),
        }
    }

    fn finish_load(&mut self, event: LoadEvent) {
        let name = event
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.progress = Some(Progress::new(50, "Parsing data…"));
        let parsed = event
            .content
            .and_then(|content| parse_content(&name, event.file_type, &content));
        match parsed {
            Ok(dataset) => {
                self.progress = Some(Progress::new(80, "Building visualizations…"));
                let nrows = dataset.row_count();
                self.load_dataset(dataset);
                self.file_info = format!("{name} · {} rows", format_grouped(nrows as f64));
                self.progress = Some(Progress::new(100, "Done!"));
            }
            Err(e) => {
                self.progress = None;
                self.restore_status();
                self.report_error(e);
            }
        }
    }

    fn restore_status(&mut self) {
        self.status = if self.session.is_some() {
            Status::READY
        } else {
            Status::EMPTY
        };
    }

    fn load_sample(&mut self, kind: SampleKind) {
        match generate(kind, &mut thread_rng()) {
            Ok(dataset) => {
                let nrows = dataset.row_count();
                self.load_dataset(dataset);
                self.file_info = format!("{}_sample · {} rows", kind.key(), format_grouped(nrows as f64));
                self.set_status_message(
                    ToastLevel::Success,
                    format!("Loaded \"{}\" sample dataset", kind.key()),
                );
            }
            Err(e) => self.report_error(e),
        }
    }

    /// Replace the active session with one built from `dataset`.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        let start_time = Instant::now();
        if let Some(old) = self.session.take() {
            old.dispose();
        }
        let session = Session::new(dataset, self.config.page_size);
        info!(
            "Session ready: {} rows, {} columns, {} charts in {}ms",
            session.dataset.row_count(),
            session.dataset.column_count(),
            session.charts.len(),
            start_time.elapsed().as_millis()
        );
        self.session = Some(session);
        self.selected_column = 0;
        self.focused_panel = 0;
        self.status = Status::READY;
    }

    fn reset(&mut self) {
        if let Some(old) = self.session.take() {
            old.dispose();
        }
        self.loader.cancel();
        self.progress = None;
        self.file_info.clear();
        self.selected_column = 0;
        self.focused_panel = 0;
        self.status = Status::EMPTY;
        self.set_status_message(ToastLevel::Info, "Dashboard reset");
    }

    // -------------------- Table ---------------------- //

    fn with_table<F: FnOnce(&mut TableView, &Dataset)>(&mut self, f: F) {
        if let Some(session) = self.session.as_mut() {
            f(&mut session.table, &session.dataset);
        }
    }

    fn select_column(&mut self, step: isize) {
        if let Some(session) = &self.session {
            let ncols = session.dataset.column_count();
            self.selected_column = self
                .selected_column
                .saturating_add_signed(step)
                .min(ncols.saturating_sub(1));
        }
    }

    fn sort_selected_column(&mut self) {
        let column = self.selected_column;
        if let Some(session) = self.session.as_mut() {
            let direction = session.table.sort_by(&session.dataset, column);
            debug!("Sorted column {column} {:?}", direction);
        }
    }

    fn toggle_selected_column(&mut self) {
        let column = self.selected_column;
        if let Some(session) = self.session.as_mut() {
            let was_visible = session.table.is_visible(column);
            let visible = session.table.toggle_column(column);
            if was_visible && visible {
                self.set_status_message(ToastLevel::Info, "At least one column must stay visible");
            }
        }
    }

    fn apply_search(&mut self, query: &str) {
        self.with_table(|table, dataset| table.set_query(dataset, query));
    }

    // -------------------- Charts ---------------------- //

    fn focus_next_panel(&mut self) {
        if let Some(session) = &self.session
            && !session.charts.is_empty()
        {
            self.focused_panel = (self.focused_panel + 1) % session.charts.len();
        }
    }

    fn cycle_chart_kind(&mut self) {
        let focused = self.focused_panel;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(id) = session.charts.panels().get(focused).map(|p| p.id) else {
            return;
        };
        if let Some(panel) = session.charts.panel_mut(id) {
            let kind = panel.cycle_kind();
            let message = format!("{}: {}", panel.title, kind.label());
            self.set_status_message(ToastLevel::Info, message);
        }
    }

    // -------------------- Export ---------------------- //

    fn export_csv(&mut self) {
        let result = self.export_table(CSV_EXPORT_FILE, to_csv);
        self.report_export(result, "CSV exported!");
    }

    fn export_json(&mut self) {
        let result = self.export_table(JSON_EXPORT_FILE, to_json);
        self.report_export(result, "JSON exported!");
    }

    fn export_table<F>(&self, file_name: &str, render: F) -> Result<PathBuf, DashboardError>
    where
        F: Fn(&Dataset, &[usize], &[usize]) -> Result<String, DashboardError>,
    {
        let session = self.session.as_ref().ok_or(DashboardError::NoData)?;
        let content = render(
            &session.dataset,
            session.table.rows(),
            session.table.visible_columns(),
        )?;
        write_export(&self.config.export_dir, file_name, content.as_bytes())
    }

    fn export_chart(&mut self) {
        let result = self
            .session
            .as_ref()
            .and_then(|s| s.charts.primary())
            .ok_or(DashboardError::NoChart)
            .and_then(|panel| {
                render_chart_png(panel, &self.theme.palette(), CHART_WIDTH, CHART_HEIGHT)
            })
            .and_then(|png| write_export(&self.config.export_dir, CHART_EXPORT_FILE, &png));
        self.report_export(result, "Chart PNG exported!");
    }

    fn report_export(&mut self, result: Result<PathBuf, DashboardError>, success: &str) {
        match result {
            Ok(path) => {
                self.set_status_message(ToastLevel::Success, format!("{success} ({})", path.display()))
            }
            Err(e) => self.report_error(e),
        }
    }

    // -------------------- Theme ---------------------- //

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.preferences.save_theme(theme) {
            warn!("Could not persist theme: {e}");
        }
        self.set_status_message(ToastLevel::Info, format!("Theme: {}", theme.label()));
    }

    // -------------------- Popup & command line ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.popup_message.clear();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        if mode == CMDMode::Search && self.session.is_none() {
            return;
        }
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        if let (CMDMode::Search, Some(session)) = (mode, &self.session) {
            self.input.set(&session.table.state().search_query);
        }
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.cmd_mode == Some(CMDMode::Search) && self.last_input.changed {
            let query = self.last_input.input.clone();
            self.apply_search(&query);
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                debug!("Search finished with \"{cmd_input}\"");
            }
            Some(CMDMode::OpenFile) if !self.last_input.canceled && !cmd_input.trim().is_empty() => {
                match shellexpand::full(cmd_input.trim()) {
                    Ok(expanded) => self.start_load(PathBuf::from(expanded.as_ref())),
                    Err(e) => self.report_error(DashboardError::LoadingFailed(e.to_string())),
                }
            }
            _ => {}
        }
        self.cmd_mode = None;
    }

    // -------------------- Status ---------------------- //

    fn set_status_message(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_level = level;
        self.last_status_message_update = Instant::now();
    }

    fn report_error(&mut self, e: DashboardError) {
        error!("{e}");
        self.set_status_message(ToastLevel::Error, e.to_string());
    }

    fn resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{}->{}, h:{}->{}", self.width, width, self.height, height);
        self.width = width;
        self.height = height;
    }

    // -------------------- View projection ---------------------- //

    fn update_uidata(&mut self) {
        let mut uidata = UIData::empty();
        uidata.theme = self.theme;
        uidata.file_info = self.file_info.clone();
        uidata.progress = self.progress.clone();
        uidata.show_popup = self.modus == Modus::POPUP;
        uidata.popup_message = self.popup_message.clone();
        uidata.cmdinput = self.last_input.clone();
        uidata.cmd_mode = self.cmd_mode;
        uidata.active_cmdinput = self.active_cmdinput;
        uidata.status_message = self.status_message.clone();
        uidata.status_level = self.status_level;
        uidata.last_status_message_update = self.last_status_message_update;
        uidata.width = self.width;
        uidata.height = self.height;

        if let Some(session) = &self.session {
            let dataset = &session.dataset;
            let table = &session.table;
            let state = table.state();

            uidata.name = dataset.name().to_string();
            uidata.has_data = true;
            uidata.kpis = session.kpis.clone();
            uidata.charts = session.charts.panels().to_vec();
            uidata.focused_panel = self.focused_panel;
            uidata.headers = table
                .visible_columns()
                .iter()
                .map(|&c| HeaderView {
                    name: dataset.columns()[c].clone(),
                    sort_arrow: state
                        .sort
                        .filter(|(sc, _)| *sc == c)
                        .map(|(_, d)| d.arrow()),
                    selected: c == self.selected_column,
                })
                .collect();
            uidata.column_toggles = dataset
                .columns()
                .iter()
                .enumerate()
                .map(|(c, name)| ColumnToggleView {
                    name: name.clone(),
                    visible: table.is_visible(c),
                    selected: c == self.selected_column,
                })
                .collect();
            uidata.rows = table
                .page_rows()
                .iter()
                .map(|&r| {
                    table
                        .visible_columns()
                        .iter()
                        .map(|&c| dataset.value(r, c).to_string())
                        .collect()
                })
                .collect();
            uidata.nrows = table.rows().len();
            let pagination = table.pagination();
            uidata.pagination_info = pagination.info();
            uidata.page_buttons = pagination.strip();
            uidata.search_query = state.search_query.clone();
        }
        uidata.last_update = Instant::now();
        self.uidata = uidata;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::product_revenue;
    use crate::theme::THEME_PREFERENCE_KEY;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::fs;

    struct Fixture {
        model: Model,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default()
            .with_export_dir(dir.path().join("exports"))
            .with_preferences_path(Some(dir.path().join("prefs.json")));
        let model = Model::init(&config).unwrap();
        Fixture { model, dir }
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_keys(model: &mut Model, s: &str) {
        for c in s.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
    }

    fn press(model: &mut Model, code: KeyCode) {
        send(model, Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn wait_for_load(model: &mut Model) {
        for _ in 0..500 {
            model.tick();
            if model.status != Status::LOADING {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("load did not finish");
    }

    #[test]
    fn load_shows_all_rows_and_columns() {
        let Fixture { mut model, .. } = fixture();
        model.load_dataset(product_revenue());
        model.update(None).unwrap();
        let ui = model.get_uidata();
        assert!(ui.has_data);
        assert_eq!(ui.nrows, 3);
        assert_eq!(ui.headers.len(), 2);
        assert_eq!(ui.rows[2], vec!["A".to_string(), "".to_string()]);
        assert_eq!(ui.pagination_info, "Showing 1–3 of 3 rows");
    }

    #[test]
    fn live_search_filters_and_escape_clears() {
        let Fixture { mut model, .. } = fixture();
        model.load_dataset(product_revenue());
        send(&mut model, Message::Search);
        assert!(model.raw_keyevents());
        type_keys(&mut model, "B");
        assert_eq!(model.get_uidata().nrows, 1);
        assert_eq!(model.get_uidata().search_query, "b");
        press(&mut model, KeyCode::Esc);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().nrows, 3);
    }

    #[test]
    fn sort_and_toggle_selected_column() {
        let Fixture { mut model, .. } = fixture();
        model.load_dataset(product_revenue());
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::Sort);
        let ui = model.get_uidata();
        assert_eq!(ui.headers[1].sort_arrow, Some("↑"));
        assert_eq!(ui.rows[0][1], "50");
        assert_eq!(ui.rows[2][1], "");

        send(&mut model, Message::ToggleColumn);
        let ui = model.get_uidata();
        assert_eq!(ui.headers.len(), 1);
        assert!(!ui.column_toggles[1].visible);
        assert!(ui.rows.iter().all(|r| r.len() == 1));

        send(&mut model, Message::ToggleColumn);
        assert_eq!(model.get_uidata().rows[0], vec!["B".to_string(), "50".to_string()]);
    }

    #[test]
    fn export_with_hidden_column() {
        let Fixture { mut model, dir } = fixture();
        model.load_dataset(product_revenue());
        send(&mut model, Message::ToggleColumn);
        send(&mut model, Message::ExportCsv);
        assert_eq!(model.get_uidata().status_level, ToastLevel::Success);
        let csv = fs::read_to_string(dir.path().join("exports").join(CSV_EXPORT_FILE)).unwrap();
        assert_eq!(csv, "Revenue\n100\n50\n");
        // The dataset itself is untouched
        assert_eq!(model.session().unwrap().dataset().column_count(), 2);
    }

    #[test]
    fn export_without_data_reports_error() {
        let Fixture { mut model, dir } = fixture();
        send(&mut model, Message::ExportJson);
        let ui = model.get_uidata();
        assert_eq!(ui.status_level, ToastLevel::Error);
        assert_eq!(ui.status_message, "No data to export.");
        assert!(!dir.path().join("exports").join(JSON_EXPORT_FILE).exists());

        send(&mut model, Message::ExportChart);
        assert_eq!(model.get_uidata().status_message, "No chart available.");
    }

    #[test]
    fn export_chart_writes_png() {
        let Fixture { mut model, dir } = fixture();
        send(&mut model, Message::LoadSample(SampleKind::Sales));
        send(&mut model, Message::ExportChart);
        let png = fs::read(dir.path().join("exports").join(CHART_EXPORT_FILE)).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn reset_disposes_session() {
        let Fixture { mut model, .. } = fixture();
        send(&mut model, Message::LoadSample(SampleKind::Orders));
        assert_eq!(model.status, Status::READY);
        assert_eq!(model.get_uidata().file_info, "orders_sample · 120 rows");
        send(&mut model, Message::Reset);
        assert_eq!(model.status, Status::EMPTY);
        assert!(model.session().is_none());
        let ui = model.get_uidata();
        assert!(!ui.has_data);
        assert!(ui.charts.is_empty());
        assert_eq!(ui.status_message, "Dashboard reset");
    }

    #[test]
    fn file_load_through_command_line() {
        let Fixture { mut model, dir } = fixture();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Product,Revenue\nA,100\nB,50\n").unwrap();
        send(&mut model, Message::OpenFile);
        type_keys(&mut model, path.to_str().unwrap());
        press(&mut model, KeyCode::Enter);
        assert_eq!(model.status, Status::LOADING);
        wait_for_load(&mut model);
        assert_eq!(model.status, Status::READY);
        let ui = model.get_uidata();
        assert_eq!(ui.nrows, 2);
        assert_eq!(ui.file_info, "data.csv · 2 rows");
        assert_eq!(ui.progress.as_ref().map(|p| p.percent), Some(100));
    }

    #[test]
    fn failed_load_keeps_previous_session() {
        let Fixture { mut model, dir } = fixture();
        model.load_dataset(product_revenue());
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"a\": 1}").unwrap();
        send(&mut model, Message::Load(path));
        wait_for_load(&mut model);
        assert_eq!(model.status, Status::READY);
        let ui = model.get_uidata();
        assert_eq!(ui.status_level, ToastLevel::Error);
        assert!(ui.status_message.starts_with("Parse error"));
        assert_eq!(ui.nrows, 3);
        assert!(ui.progress.is_none());
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let Fixture { mut model, .. } = fixture();
        send(&mut model, Message::Load(PathBuf::from("report.xlsx")));
        assert_eq!(model.status, Status::EMPTY);
        assert_eq!(
            model.get_uidata().status_message,
            "Unsupported type \".xlsx\". Use CSV, JSON, or TSV."
        );
    }

    #[test]
    fn theme_switch_is_persisted() {
        let Fixture { mut model, dir } = fixture();
        assert_eq!(model.theme(), Theme::Dark);
        send(&mut model, Message::NextTheme);
        assert_eq!(model.theme(), Theme::Light);
        assert_eq!(model.get_uidata().status_message, "Theme: Arctic Light");
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("prefs.json")).unwrap()).unwrap();
        assert_eq!(saved[THEME_PREFERENCE_KEY], "light");
    }

    #[test]
    fn chart_kind_cycles_on_focused_panel() {
        let Fixture { mut model, .. } = fixture();
        model.load_dataset(product_revenue());
        send(&mut model, Message::NextPanel);
        send(&mut model, Message::NextChartKind);
        let ui = model.get_uidata();
        assert_eq!(ui.focused_panel, 1);
        assert_eq!(ui.charts[1].kind, crate::charts::ChartKind::Bar);
        assert_eq!(ui.status_message, "Distribution: bar");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let Fixture { mut model, .. } = fixture();
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Sort);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
    }
}
