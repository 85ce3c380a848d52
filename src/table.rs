use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

use crate::dataset::Dataset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

/// User controlled view settings. Reset on every dataset load.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub search_query: String,
    pub sort: Option<(usize, SortDirection)>,
    pub visible_columns: Vec<usize>,
    pub current_page: usize,
}

impl ViewState {
    pub fn new(column_count: usize) -> Self {
        Self {
            search_query: String::new(),
            sort: None,
            visible_columns: (0..column_count).collect(),
            current_page: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page: usize,
    pub pages: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl Pagination {
    pub fn new(total: usize, page: usize, page_size: usize) -> Self {
        let pages = std::cmp::max(1, total.div_ceil(page_size));
        let page = page.clamp(1, pages);
        let start = std::cmp::min((page - 1) * page_size, total);
        let end = std::cmp::min(start + page_size, total);
        Self {
            page,
            pages,
            start,
            end,
            total,
        }
    }

    /// "Showing a–b of N rows"
    pub fn info(&self) -> String {
        let first = if self.total > 0 { self.start + 1 } else { 0 };
        format!(
            "Showing {}–{} of {} rows",
            first,
            self.end,
            crate::aggregate::format_grouped(self.total as f64)
        )
    }

    /// Page buttons: previous, up to five pages around the current one, next.
    pub fn strip(&self) -> Vec<PageButton> {
        let mut buttons = Vec::new();
        if self.page > 1 {
            buttons.push(PageButton::Previous(self.page - 1));
        }
        let first = self.page.saturating_sub(2).max(1);
        let last = std::cmp::min(self.pages, self.page + 2);
        for p in first..=last {
            buttons.push(PageButton::Page {
                page: p,
                active: p == self.page,
            });
        }
        if self.page < self.pages {
            buttons.push(PageButton::Next(self.page + 1));
        }
        buttons
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageButton {
    Previous(usize),
    Page { page: usize, active: bool },
    Next(usize),
}

/// Indices of the rows containing `query` (case insensitive) in any column.
pub fn filter_rows(dataset: &Dataset, query: &str) -> Vec<usize> {
    let query = query.to_lowercase();
    if query.is_empty() {
        return (0..dataset.row_count()).collect();
    }
    dataset
        .rows()
        .par_iter()
        .enumerate()
        .filter(|(_, row)| {
            row.iter()
                .any(|v| v.to_string().to_lowercase().contains(&query))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Order rows by one column. Empty cells go last in both directions.
pub fn sort_rows(dataset: &Dataset, rows: &mut [usize], column: usize, direction: SortDirection) {
    rows.sort_by(|&a, &b| {
        let (av, bv) = (dataset.value(a, column), dataset.value(b, column));
        match (av.is_empty(), bv.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match direction {
                SortDirection::Ascending => av.compare(bv),
                SortDirection::Descending => bv.compare(av),
            },
        }
    });
}

/// The row window currently shown for a dataset.
///
/// `rows` maps positions of the filtered and sorted view to dataset row
/// indices. It is recomputed in full whenever the query or sort changes.
#[derive(Debug, Clone)]
pub struct TableView {
    state: ViewState,
    rows: Arc<Vec<usize>>,
    page_size: usize,
}

impl TableView {
    pub fn new(dataset: &Dataset, page_size: usize) -> Self {
        Self {
            state: ViewState::new(dataset.column_count()),
            rows: Arc::new((0..dataset.row_count()).collect()),
            page_size,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Dataset row indices of the filtered row set, in display order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn visible_columns(&self) -> &[usize] {
        &self.state.visible_columns
    }

    pub fn is_visible(&self, column: usize) -> bool {
        self.state.visible_columns.contains(&column)
    }

    pub fn set_query(&mut self, dataset: &Dataset, query: &str) {
        let start_time = Instant::now();
        self.state.search_query = query.to_lowercase();
        self.state.current_page = 1;
        let mut rows = filter_rows(dataset, &self.state.search_query);
        if let Some((column, direction)) = self.state.sort {
            sort_rows(dataset, &mut rows, column, direction);
        }
        trace!(
            "Filter \"{}\" kept {} of {} rows in {}ms",
            self.state.search_query,
            rows.len(),
            dataset.row_count(),
            start_time.elapsed().as_millis()
        );
        self.rows = Arc::new(rows);
    }

    /// Sort by `column`. Sorting the same column again reverses the direction,
    /// a new column starts ascending.
    pub fn sort_by(&mut self, dataset: &Dataset, column: usize) -> SortDirection {
        let direction = match self.state.sort {
            Some((current, direction)) if current == column => direction.reversed(),
            _ => SortDirection::Ascending,
        };
        self.state.sort = Some((column, direction));
        let mut rows = self.rows.to_vec();
        sort_rows(dataset, &mut rows, column, direction);
        self.rows = Arc::new(rows);
        direction
    }

    /// Hide or show a column. The last visible column can not be hidden.
    /// Returns whether the column is visible afterwards.
    pub fn toggle_column(&mut self, column: usize) -> bool {
        let visible = &mut self.state.visible_columns;
        if let Some(pos) = visible.iter().position(|&c| c == column) {
            if visible.len() > 1 {
                visible.remove(pos);
                return false;
            }
            true
        } else {
            let pos = visible.partition_point(|&c| c < column);
            visible.insert(pos, column);
            true
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.rows.len(), self.state.current_page, self.page_size)
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.current_page = self.pagination().pages.min(page).max(1);
    }

    pub fn next_page(&mut self) {
        self.set_page(self.state.current_page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.state.current_page.saturating_sub(1));
    }

    pub fn last_page(&mut self) {
        self.set_page(self.pagination().pages);
    }

    /// Dataset row indices on the current page.
    pub fn page_rows(&self) -> &[usize] {
        let p = self.pagination();
        &self.rows[p.start..p.end]
    }
}
