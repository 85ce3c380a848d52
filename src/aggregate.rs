use std::collections::{HashMap, HashSet};

use crate::dataset::{ColumnClasses, Dataset};

/// Number of slices in the distribution chart.
pub const DISTRIBUTION_TOP_N: usize = 8;
/// Number of bars in comparison charts.
pub const COMPARISON_TOP_N: usize = 10;
/// Maximum number of KPI cards.
pub const MAX_KPIS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: usize,
    pub sum: f64,
    pub mean: f64,
    pub count: usize,
}

/// Sum and mean of the numbers in a column. Other values are ignored.
pub fn summarize(dataset: &Dataset, column: usize) -> NumericSummary {
    let (sum, count) = dataset
        .column_values(column)
        .filter_map(|v| v.as_number())
        .fold((0.0, 0), |(sum, count), n| (sum + n, count + 1));
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    NumericSummary {
        column,
        sum,
        mean,
        count,
    }
}

/// Number of distinct values in a column, empty cells included.
pub fn distinct_count(dataset: &Dataset, column: usize) -> usize {
    dataset
        .column_values(column)
        .map(|v| v.key())
        .collect::<HashSet<_>>()
        .len()
}

/// Group rows by the label of `group_column` and fold each group with `f`.
/// Groups keep the order in which they were first seen.
fn group_by<F>(dataset: &Dataset, group_column: usize, mut f: F) -> Vec<(String, f64)>
where
    F: FnMut(usize) -> f64,
{
    let mut group_order: Vec<(String, f64)> = Vec::new();
    let mut groups: HashMap<String, usize> = HashMap::new();
    for (ridx, row) in dataset.rows().iter().enumerate() {
        let label = row[group_column].label();
        let increment = f(ridx);
        match groups.get(&label) {
            Some(&gidx) => group_order[gidx].1 += increment,
            None => {
                groups.insert(label.clone(), group_order.len());
                group_order.push((label, increment));
            }
        }
    }
    group_order
}

/// Frequency of each value of a column.
pub fn frequencies(dataset: &Dataset, column: usize) -> Vec<(String, f64)> {
    group_by(dataset, column, |_| 1.0)
}

/// Sum of `value_column` per value of `group_column`. Non numbers add 0.
pub fn weighted_totals(dataset: &Dataset, group_column: usize, value_column: usize) -> Vec<(String, f64)> {
    group_by(dataset, group_column, |ridx| {
        dataset.value(ridx, value_column).as_number().unwrap_or(0.0)
    })
}

/// Largest `n` entries, ties keep their first seen order.
pub fn top_n(mut entries: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.truncate(n);
    entries
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub sub: String,
}

pub fn build_kpis(dataset: &Dataset, classes: &ColumnClasses) -> Vec<Kpi> {
    let mut kpis = vec![
        Kpi {
            label: "Total Rows".to_string(),
            value: format_grouped(dataset.row_count() as f64),
            sub: "records loaded".to_string(),
        },
        Kpi {
            label: "Columns".to_string(),
            value: dataset.column_count().to_string(),
            sub: "fields detected".to_string(),
        },
    ];

    for &column in classes.numeric.iter().take(2) {
        let summary = summarize(dataset, column);
        kpis.push(Kpi {
            label: format!("Total {}", dataset.columns()[column]),
            value: format_number(summary.sum),
            sub: format!("avg {}", format_number(summary.mean)),
        });
    }

    if let Some(column) = classes.first_categorical() {
        kpis.push(Kpi {
            label: format!("Unique {}", dataset.columns()[column]),
            value: distinct_count(dataset, column).to_string(),
            sub: "distinct values".to_string(),
        });
    }

    kpis.truncate(MAX_KPIS);
    kpis
}

/// Compact number formatting for KPI cards: 1.2K, 3.4M, 5.6B.
pub fn format_number(n: f64) -> String {
    let abs = n.abs();
    if abs >= 1e9 {
        format!("{:.1}B", n / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", n / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", n / 1e3)
    } else if n.fract() == 0.0 {
        format_grouped(n)
    } else {
        format!("{:.2}", n)
    }
}

/// Integral number with thousands separators.
pub fn format_grouped(n: f64) -> String {
    let digits = format!("{:.0}", n.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}
