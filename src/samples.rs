use rand::Rng;
use rand::seq::SliceRandom;

use crate::dataset::Dataset;
use crate::domain::DashboardError;
use crate::value::Value;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
const PRODUCTS: [&str; 5] = ["Widget A", "Widget B", "Widget C", "Gadget X", "Gadget Y"];
const DEPARTMENTS: [&str; 6] = ["Engineering", "Marketing", "Sales", "HR", "Finance", "Design"];
const STATUSES: [&str; 4] = ["Delivered", "Pending", "Shipped", "Cancelled"];
const CATEGORIES: [&str; 4] = ["Electronics", "Apparel", "Books", "Food"];

const EMPLOYEE_ROWS: usize = 80;
const ORDER_ROWS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SampleKind {
    Sales,
    Employees,
    Orders,
}

impl SampleKind {
    pub fn key(&self) -> &'static str {
        match self {
            SampleKind::Sales => "sales",
            SampleKind::Employees => "employees",
            SampleKind::Orders => "orders",
        }
    }
}

fn pick<R: Rng>(rng: &mut R, values: &[&str]) -> Value {
    Value::Text(values.choose(rng).copied().unwrap_or_default().to_string())
}

fn round_to(n: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (n * f).round() / f
}

/// Generate one of the bundled demo datasets.
pub fn generate<R: Rng>(kind: SampleKind, rng: &mut R) -> Result<Dataset, DashboardError> {
    let name = format!("{}_sample.csv", kind.key());
    let (columns, rows): (Vec<&str>, Vec<Vec<Value>>) = match kind {
        SampleKind::Sales => (
            vec!["Month", "Product", "Revenue", "Units", "Region", "Margin"],
            MONTHS
                .iter()
                .flat_map(|m| PRODUCTS[..3].iter().map(move |p| (m, p)))
                .map(|(m, p)| {
                    vec![
                        Value::Text(m.to_string()),
                        Value::Text(p.to_string()),
                        Value::Number(rng.gen_range(5000.0..55000.0_f64).round()),
                        Value::Number(rng.gen_range(20.0..220.0_f64).round()),
                        pick(rng, &REGIONS),
                        Value::Number(round_to(rng.gen_range(0.1..0.5), 2)),
                    ]
                })
                .collect(),
        ),
        SampleKind::Employees => (
            vec!["EmployeeID", "Name", "Department", "Salary", "YearsExp", "Rating", "Remote"],
            (0..EMPLOYEE_ROWS)
                .map(|i| {
                    vec![
                        Value::Text(format!("E{}", 1000 + i)),
                        Value::Text(format!("Employee {}", i + 1)),
                        pick(rng, &DEPARTMENTS),
                        Value::Number(rng.gen_range(40000.0..140000.0_f64).round()),
                        Value::Number(rng.gen_range(1.0..21.0_f64).round()),
                        Value::Number(round_to(rng.gen_range(3.0..5.0), 1)),
                        Value::Text(if rng.gen_bool(0.5) { "Yes" } else { "No" }.to_string()),
                    ]
                })
                .collect(),
        ),
        SampleKind::Orders => (
            vec!["OrderID", "Product", "Category", "Amount", "Quantity", "Status", "Region"],
            (0..ORDER_ROWS)
                .map(|i| {
                    vec![
                        Value::Text(format!("ORD-{}", 10000 + i)),
                        pick(rng, &PRODUCTS),
                        pick(rng, &CATEGORIES),
                        Value::Number(rng.gen_range(10.0..510.0_f64).round()),
                        Value::Number(rng.gen_range(1.0..11.0_f64).round()),
                        pick(rng, &STATUSES),
                        pick(rng, &REGIONS),
                    ]
                })
                .collect(),
        ),
    };
    Dataset::new(name, columns.iter().map(|c| c.to_string()).collect(), rows)
}
