use tracing::{debug, trace};

use crate::aggregate::{COMPARISON_TOP_N, DISTRIBUTION_TOP_N, frequencies, top_n, weighted_totals};
use crate::dataset::{ColumnClasses, Dataset};

/// Rows plotted by the trend chart.
pub const TREND_ROWS: usize = 50;
/// Rows plotted by the scatter chart.
pub const SCATTER_ROWS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    Line,
    Area,
    Bar,
    HorizontalBar,
    Doughnut,
    Scatter,
}

impl ChartKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "hbar",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Scatter => "scatter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelId {
    Trend,
    Distribution,
    Comparison,
    Scatter,
}

/// Values plotted by a panel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// One value per category label, `None` where a row had no number.
    Categories {
        labels: Vec<String>,
        values: Vec<Option<f64>>,
    },
    Points(Vec<(f64, f64)>),
}

impl ChartData {
    fn categories(entries: Vec<(String, f64)>) -> Self {
        let (labels, values) = entries.into_iter().map(|(l, v)| (l, Some(v))).unzip();
        ChartData::Categories { labels, values }
    }

    /// (min, max) over all plotted y values.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let values: Vec<f64> = match self {
            ChartData::Categories { values, .. } => values.iter().flatten().copied().collect(),
            ChartData::Points(points) => points.iter().map(|p| p.1).collect(),
        };
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }

    pub fn len(&self) -> usize {
        match self {
            ChartData::Categories { labels, .. } => labels.len(),
            ChartData::Points(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPanel {
    pub id: PanelId,
    pub title: String,
    pub subtitle: String,
    pub series_name: String,
    pub kind: ChartKind,
    pub kinds: Vec<ChartKind>,
    pub data: ChartData,
}

impl ChartPanel {
    /// Switch to the next chart kind this panel supports.
    pub fn cycle_kind(&mut self) -> ChartKind {
        let pos = self.kinds.iter().position(|k| *k == self.kind).unwrap_or(0);
        self.kind = self.kinds[(pos + 1) % self.kinds.len()];
        self.kind
    }

    pub fn set_kind(&mut self, kind: ChartKind) -> bool {
        if self.kinds.contains(&kind) {
            self.kind = kind;
            true
        } else {
            false
        }
    }
}

/// The chart panels of the active dataset.
///
/// Panels are owned here and nowhere else; `teardown` drops all of them and
/// `rebuild` always tears down before building.
#[derive(Debug, Default)]
pub struct ChartSet {
    panels: Vec<ChartPanel>,
    builds: u64,
}

impl ChartSet {
    pub fn build(dataset: &Dataset, classes: &ColumnClasses) -> Self {
        let mut set = ChartSet::default();
        set.rebuild(dataset, classes);
        set
    }

    pub fn rebuild(&mut self, dataset: &Dataset, classes: &ColumnClasses) {
        self.teardown();
        self.builds += 1;
        self.panels = [
            trend_panel(dataset, classes),
            distribution_panel(dataset, classes),
            comparison_panel(dataset, classes),
            scatter_panel(dataset, classes),
        ]
        .into_iter()
        .flatten()
        .collect();
        debug!("Built {} chart panels (build #{})", self.panels.len(), self.builds);
    }

    pub fn teardown(&mut self) {
        if !self.panels.is_empty() {
            trace!("Tearing down {} chart panels", self.panels.len());
        }
        self.panels.clear();
    }

    pub fn panels(&self) -> &[ChartPanel] {
        &self.panels
    }

    pub fn panel(&self, id: PanelId) -> Option<&ChartPanel> {
        self.panels.iter().find(|p| p.id == id)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut ChartPanel> {
        self.panels.iter_mut().find(|p| p.id == id)
    }

    /// The chart used for image export.
    pub fn primary(&self) -> Option<&ChartPanel> {
        self.panel(PanelId::Trend)
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

fn trend_panel(dataset: &Dataset, classes: &ColumnClasses) -> Option<ChartPanel> {
    let column = classes.first_numeric()?;
    let name = dataset.columns()[column].clone();
    let sample = &dataset.rows()[..dataset.row_count().min(TREND_ROWS)];
    let labels = sample
        .iter()
        .enumerate()
        .map(|(i, row)| match classes.first_categorical() {
            Some(cat) if !row[cat].is_empty() => row[cat].label(),
            _ => format!("Row {}", i + 1),
        })
        .collect();
    let values = sample.iter().map(|row| row[column].as_number()).collect();
    Some(ChartPanel {
        id: PanelId::Trend,
        title: "Trend".to_string(),
        subtitle: format!("{name} over rows"),
        series_name: name,
        kind: ChartKind::Line,
        kinds: vec![ChartKind::Line, ChartKind::Area, ChartKind::Bar],
        data: ChartData::Categories { labels, values },
    })
}

fn distribution_panel(dataset: &Dataset, classes: &ColumnClasses) -> Option<ChartPanel> {
    let column = classes.first_categorical()?;
    let name = dataset.columns()[column].clone();
    Some(ChartPanel {
        id: PanelId::Distribution,
        title: "Distribution".to_string(),
        subtitle: format!("{name} breakdown"),
        series_name: name,
        kind: ChartKind::Doughnut,
        kinds: vec![ChartKind::Doughnut, ChartKind::Bar, ChartKind::HorizontalBar],
        data: ChartData::categories(top_n(frequencies(dataset, column), DISTRIBUTION_TOP_N)),
    })
}

fn comparison_panel(dataset: &Dataset, classes: &ColumnClasses) -> Option<ChartPanel> {
    let cat = classes.first_categorical()?;
    let num = classes.first_numeric()?;
    let (cat_name, num_name) = (&dataset.columns()[cat], &dataset.columns()[num]);
    Some(ChartPanel {
        id: PanelId::Comparison,
        title: "Comparison".to_string(),
        subtitle: format!("{num_name} by {cat_name}"),
        series_name: num_name.clone(),
        kind: ChartKind::Bar,
        kinds: vec![ChartKind::Bar, ChartKind::HorizontalBar, ChartKind::Line],
        data: ChartData::categories(top_n(weighted_totals(dataset, cat, num), COMPARISON_TOP_N)),
    })
}

fn scatter_panel(dataset: &Dataset, classes: &ColumnClasses) -> Option<ChartPanel> {
    if let &[x, y, ..] = classes.numeric.as_slice() {
        let (x_name, y_name) = (&dataset.columns()[x], &dataset.columns()[y]);
        let points = dataset.rows()[..dataset.row_count().min(SCATTER_ROWS)]
            .iter()
            .filter_map(|row| Some((row[x].as_number()?, row[y].as_number()?)))
            .collect();
        return Some(ChartPanel {
            id: PanelId::Scatter,
            title: "Correlation".to_string(),
            subtitle: format!("{x_name} vs {y_name}"),
            series_name: format!("{x_name} vs {y_name}"),
            kind: ChartKind::Scatter,
            kinds: vec![ChartKind::Scatter],
            data: ChartData::Points(points),
        });
    }
    if let &[_, second, ..] = classes.categorical.as_slice() {
        let name = dataset.columns()[second].clone();
        return Some(ChartPanel {
            id: PanelId::Scatter,
            title: "Correlation".to_string(),
            subtitle: format!("{name} counts"),
            series_name: name,
            kind: ChartKind::Bar,
            kinds: vec![ChartKind::Bar, ChartKind::HorizontalBar],
            data: ChartData::categories(top_n(frequencies(dataset, second), COMPARISON_TOP_N)),
        });
    }
    None
}
