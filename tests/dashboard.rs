use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use datapulse::aggregate::build_kpis;
use datapulse::charts::{ChartData, ChartSet, PanelId};
use datapulse::dataset::Dataset;
use datapulse::domain::{DashboardConfig, Message};
use datapulse::export::{CSV_EXPORT_FILE, to_csv, to_json, write_export};
use datapulse::loader::{FileType, parse_content, parse_json};
use datapulse::model::{Model, Status};
use datapulse::table::TableView;
use datapulse::value::Value;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> Dataset {
    let path = fixture(name);
    let file_type = FileType::detect(&path).unwrap();
    parse_content(name, file_type, &fs::read_to_string(&path).unwrap()).unwrap()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn csv_fixture_is_coerced() {
    let ds = load("sales.csv");
    assert_eq!(ds.row_count(), 6);
    assert_eq!(ds.columns(), &["Month", "Product", "Revenue", "Units", "Region"]);
    assert_eq!(ds.value(3, 1), &text("Gadget, Deluxe"));
    assert_eq!(ds.value(2, 2), &Value::Number(13250.5));
    assert_eq!(ds.value(4, 2), &Value::Empty);

    let classes = ds.classify();
    assert_eq!(classes.numeric, vec![2, 3]);
    assert_eq!(classes.categorical, vec![0, 1, 4]);
}

#[test]
fn tsv_fixture_has_booleans() {
    let ds = load("people.tsv");
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.value(0, 2), &Value::Bool(true));
    assert_eq!(ds.value(1, 2), &Value::Bool(false));
    assert_eq!(ds.value(2, 3), &text("New York"));

    let classes = ds.classify();
    assert_eq!(classes.numeric, vec![1]);
    assert_eq!(classes.categorical, vec![0, 3]);
}

#[test]
fn json_fixture_uses_first_record_schema() {
    let ds = load("orders.json");
    assert_eq!(ds.columns(), &["order", "category", "amount", "qty", "note"]);
    assert_eq!(ds.value(0, 4), &Value::Empty);
    assert_eq!(ds.value(1, 4), &text("gift"));
    assert_eq!(ds.value(1, 2), &Value::Number(12.0));
    assert_eq!(ds.column_index("tags"), None);
}

#[test]
fn wrapped_json_reads_data_entry() {
    let ds = load("wrapped.json");
    assert_eq!(ds.columns(), &["city", "temp"]);
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.value(1, 1), &Value::Number(19.0));
}

#[test]
fn sales_kpis_and_charts() {
    let ds = load("sales.csv");
    let classes = ds.classify();
    let kpis = build_kpis(&ds, &classes);
    let summary: Vec<(&str, &str)> = kpis
        .iter()
        .map(|k| (k.label.as_str(), k.value.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Total Rows", "6"),
            ("Columns", "5"),
            ("Total Revenue", "57.9K"),
            ("Total Units", "231"),
            ("Unique Month", "3"),
        ]
    );

    let charts = ChartSet::build(&ds, &classes);
    assert_eq!(charts.len(), 4);
    let comparison = charts.panel(PanelId::Comparison).unwrap();
    assert_eq!(comparison.subtitle, "Revenue by Month");
    assert_eq!(
        comparison.data,
        ChartData::Categories {
            labels: vec!["Feb".into(), "Jan".into(), "Mar".into()],
            values: vec![Some(22350.5), Some(20500.0), Some(15000.0)],
        }
    );
}

#[test]
fn filtered_csv_export_parses_back() {
    let ds = load("sales.csv");
    let mut view = TableView::new(&ds, 25);
    view.set_query(&ds, "WIDGET A");
    assert_eq!(view.rows().len(), 3);
    view.toggle_column(4);

    let dir = tempfile::tempdir().unwrap();
    let csv = to_csv(&ds, view.rows(), view.visible_columns()).unwrap();
    let path = write_export(dir.path(), CSV_EXPORT_FILE, csv.as_bytes()).unwrap();

    let exported = parse_content(CSV_EXPORT_FILE, FileType::CSV, &fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(exported.columns(), &["Month", "Product", "Revenue", "Units"]);
    assert_eq!(exported.row_count(), 3);
    assert!(exported.column_values(1).all(|v| *v == text("Widget A")));
    assert_eq!(exported.value(1, 2), &Value::Number(13250.5));
}

#[test]
fn quoted_fields_survive_export() {
    let ds = load("sales.csv");
    let view = TableView::new(&ds, 25);
    let csv = to_csv(&ds, view.rows(), view.visible_columns()).unwrap();
    let exported = parse_content("again.csv", FileType::CSV, &csv).unwrap();
    assert_eq!(exported.row_count(), ds.row_count());
    assert_eq!(exported.value(3, 1), &text("Gadget, Deluxe"));
    assert_eq!(exported.value(4, 2), &Value::Empty);

    let json = to_json(&ds, view.rows(), view.visible_columns()).unwrap();
    let from_json = parse_json("again.json", &json).unwrap();
    assert_eq!(from_json.rows(), ds.rows());
}

#[test]
fn empty_row_survives_csv_export() {
    let ds = Dataset::new(
        "gaps",
        vec!["a".into(), "b".into()],
        vec![
            vec![text("x"), Value::Number(1.0)],
            vec![Value::Empty, Value::Empty],
            vec![text("y"), Value::Number(2.0)],
        ],
    )
    .unwrap();
    let view = TableView::new(&ds, 25);
    let csv = to_csv(&ds, view.rows(), view.visible_columns()).unwrap();
    assert_eq!(csv, "a,b\nx,1\n,\ny,2");

    let exported = parse_content("gaps.csv", FileType::CSV, &csv).unwrap();
    assert_eq!(exported.row_count(), 3);
    assert_eq!(exported.rows(), ds.rows());
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
fn newer_load_replaces_older_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig::default()
        .with_export_dir(dir.path().to_path_buf())
        .with_preferences_path(Some(dir.path().join("prefs.json")));
    let mut model = Model::init(&config).unwrap();

    model.update(Some(Message::Load(fixture("sales.csv")))).unwrap();
    model.update(Some(Message::Load(fixture("people.tsv")))).unwrap();
    wait_for_load(&mut model);

    assert_eq!(model.status, Status::READY);
    let session = model.session().unwrap();
    assert_eq!(session.dataset().name(), "people.tsv");
    assert_eq!(model.get_uidata().file_info, "people.tsv · 3 rows");

    // The stale completion never replaces the newer dataset
    std::thread::sleep(Duration::from_millis(50));
    model.tick();
    assert_eq!(model.session().unwrap().dataset().name(), "people.tsv");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig::default()
        .with_preferences_path(Some(dir.path().join("prefs.json")));
    let mut model = Model::init(&config).unwrap();
    model.update(Some(Message::Load(dir.path().join("nope.csv")))).unwrap();
    wait_for_load(&mut model);
    assert_eq!(model.status, Status::EMPTY);
    assert!(model.get_uidata().status_message.starts_with("Failed to read file"));
}
