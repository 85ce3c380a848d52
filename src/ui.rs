use std::time::Duration;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::{Marker, border},
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Cell, Chart, Clear, Dataset, Gauge, GraphType,
        Paragraph, Row, Table, Widget, Wrap,
    },
};

use crate::aggregate::{Kpi, format_number};
use crate::charts::{ChartData, ChartKind, ChartPanel};
use crate::domain::{CMDMode, DashboardConfig, TOAST_DURATION_MS};
use crate::model::{Model, ToastLevel, UIData};
use crate::table::PageButton;
use crate::theme::Palette;

const MAX_COLUMN_WIDTH: u16 = 24;
const KPI_HEIGHT: u16 = 4;
const CHART_HEIGHT: u16 = 12;

fn rgb(c: [u8; 3]) -> Color {
    Color::Rgb(c[0], c[1], c[2])
}

/// Styles derived from the active theme palette.
#[derive(Debug, Clone, Copy)]
struct Styles {
    base: Style,
    surface: Style,
    muted: Style,
    accent: Color,
    series: [Color; 8],
}

impl Styles {
    fn from_palette(p: &Palette) -> Self {
        Self {
            base: Style::new().fg(rgb(p.text)).bg(rgb(p.background)),
            surface: Style::new().fg(rgb(p.text)).bg(rgb(p.surface)),
            muted: Style::new().fg(rgb(p.muted)),
            accent: rgb(p.series[0]),
            series: p.series.map(rgb),
        }
    }

    fn toast(&self, level: ToastLevel) -> Style {
        match level {
            ToastLevel::Info => Style::new().fg(self.accent),
            ToastLevel::Success => Style::new().fg(self.series[2]),
            ToastLevel::Error => Style::new().fg(Color::Red).bold(),
        }
    }
}

pub struct DashboardUI {
    toast_duration: Duration,
}

impl DashboardUI {
    pub fn new(_cfg: &DashboardConfig) -> Self {
        Self {
            toast_duration: Duration::from_millis(TOAST_DURATION_MS),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let styles = Styles::from_palette(&uidata.theme.palette());
        let area = frame.area();
        frame.render_widget(Block::new().style(styles.base), area);

        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        self.draw_header(uidata, &styles, header_area, frame.buffer_mut());
        if uidata.has_data {
            self.draw_dashboard(uidata, &styles, body_area, frame.buffer_mut());
        } else {
            self.draw_empty_state(&styles, body_area, frame.buffer_mut());
        }
        self.draw_footer(uidata, &styles, footer_area, frame);

        if let Some(progress) = &uidata.progress {
            let gauge_area = centered(area, 50, 3);
            Clear.render(gauge_area, frame.buffer_mut());
            Gauge::default()
                .block(Block::bordered().title(" Loading "))
                .gauge_style(Style::new().fg(styles.accent))
                .percent(progress.percent.min(100))
                .label(progress.text.clone())
                .render(gauge_area, frame.buffer_mut());
        }

        if uidata.show_popup {
            let popup_area = centered(area, 60, 36);
            Clear.render(popup_area, frame.buffer_mut());
            Paragraph::new(uidata.popup_message.clone())
                .style(styles.surface)
                .block(
                    Block::bordered()
                        .title(Line::from(" Help ".bold()).centered())
                        .border_set(border::THICK),
                )
                .wrap(Wrap { trim: false })
                .render(popup_area, frame.buffer_mut());
        }
    }

    fn draw_header(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![
            Span::styled(" DataPulse ", Style::new().fg(styles.accent).bold()),
        ];
        if !uidata.file_info.is_empty() {
            spans.push(Span::styled(format!(" {} ", uidata.file_info), styles.muted));
        }
        let theme = Line::from(Span::styled(format!("{} ", uidata.theme.label()), styles.muted))
            .right_aligned();
        Line::from(spans).render(area, buf);
        theme.render(area, buf);
    }

    fn draw_empty_state(&self, styles: &Styles, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from("Drop in a dataset to get started".bold()),
            Line::from(""),
            Line::from(vec![
                Span::styled("o", Style::new().fg(styles.accent).bold()),
                Span::raw(" open a CSV, TSV, TXT or JSON file"),
            ]),
            Line::from(vec![
                Span::styled("1 2 3", Style::new().fg(styles.accent).bold()),
                Span::raw(" load the sales, employees or orders sample"),
            ]),
            Line::from(vec![
                Span::styled("?", Style::new().fg(styles.accent).bold()),
                Span::raw(" help"),
            ]),
        ];
        let inner = centered(area, 60, lines.len() as u16 + 2);
        Paragraph::new(lines)
            .centered()
            .block(Block::bordered().border_set(border::ROUNDED).border_style(styles.muted))
            .render(inner, buf);
    }

    fn draw_dashboard(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        let [kpi_area, chart_area, toggles_area, table_area, pages_area] = Layout::vertical([
            Constraint::Length(if uidata.kpis.is_empty() { 0 } else { KPI_HEIGHT }),
            Constraint::Length(if uidata.charts.is_empty() { 0 } else { CHART_HEIGHT }),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);

        self.draw_kpis(&uidata.kpis, styles, kpi_area, buf);
        self.draw_charts(uidata, styles, chart_area, buf);
        self.draw_column_toggles(uidata, styles, toggles_area, buf);
        self.draw_table(uidata, styles, table_area, buf);
        self.draw_pagination(uidata, styles, pages_area, buf);
    }

    fn draw_kpis(&self, kpis: &[Kpi], styles: &Styles, area: Rect, buf: &mut Buffer) {
        if kpis.is_empty() {
            return;
        }
        let areas = Layout::horizontal(vec![Constraint::Fill(1); kpis.len()]).split(area);
        for (kpi, (area, color)) in kpis.iter().zip(areas.iter().zip(styles.series.iter())) {
            Paragraph::new(vec![
                Line::from(Span::styled(kpi.value.clone(), Style::new().fg(*color).bold())),
                Line::from(Span::styled(kpi.sub.clone(), styles.muted)),
            ])
            .block(
                Block::bordered()
                    .border_set(border::ROUNDED)
                    .border_style(styles.muted)
                    .title(kpi.label.clone()),
            )
            .render(*area, buf);
        }
    }

    fn draw_charts(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        if uidata.charts.is_empty() {
            return;
        }
        let areas = Layout::horizontal(vec![Constraint::Fill(1); uidata.charts.len()]).split(area);
        for (idx, (panel, area)) in uidata.charts.iter().zip(areas.iter()).enumerate() {
            let focused = idx == uidata.focused_panel;
            let block = Block::bordered()
                .border_set(if focused { border::THICK } else { border::ROUNDED })
                .border_style(if focused { Style::new().fg(styles.accent) } else { styles.muted })
                .title(Line::from(panel.title.clone().bold()))
                .title_bottom(Line::from(format!(" {} · {} ", panel.subtitle, panel.kind.label())).right_aligned());
            let inner = block.inner(*area);
            block.render(*area, buf);
            render_panel(panel, styles, inner, buf);
        }
    }

    fn draw_column_toggles(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::styled("Columns: ", styles.muted)];
        for toggle in &uidata.column_toggles {
            let mark = if toggle.visible { "✓" } else { "+" };
            let mut style = if toggle.visible { Style::new() } else { styles.muted };
            if toggle.selected {
                style = style.fg(styles.accent).add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{mark} {}", toggle.name), style));
            spans.push(Span::raw(" "));
        }
        Line::from(spans).render(area, buf);
    }

    fn draw_table(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        let widths: Vec<Constraint> = uidata
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let content = uidata
                    .rows
                    .iter()
                    .filter_map(|r| r.get(idx))
                    .map(|s| s.chars().count())
                    .max()
                    .unwrap_or(0);
                let width = content.max(header.name.chars().count() + 2) as u16;
                Constraint::Length(width.min(MAX_COLUMN_WIDTH))
            })
            .collect();

        let headers: Vec<Cell> = uidata
            .headers
            .iter()
            .map(|h| {
                let text = match h.sort_arrow {
                    Some(arrow) => format!("{} {arrow}", h.name),
                    None => h.name.clone(),
                };
                let style = if h.selected {
                    Style::new().fg(styles.accent).add_modifier(Modifier::BOLD)
                } else {
                    Style::new().add_modifier(Modifier::BOLD)
                };
                Cell::from(text).style(style)
            })
            .collect();

        let rows: Vec<Row> = uidata
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let row = Row::new(row.iter().map(|c| Cell::from(c.clone())));
                if idx % 2 == 1 { row.style(styles.surface) } else { row }
            })
            .collect();

        let title = if uidata.search_query.is_empty() {
            format!(" {} ", uidata.name)
        } else {
            format!(" {} · /{} ", uidata.name, uidata.search_query)
        };
        Widget::render(
            Table::new(rows, widths)
                .column_spacing(1)
                .header(Row::new(headers).underlined())
                .block(
                    Block::bordered()
                        .border_set(border::ROUNDED)
                        .border_style(styles.muted)
                        .title(title),
                ),
            area,
            buf,
        );
    }

    fn draw_pagination(&self, uidata: &UIData, styles: &Styles, area: Rect, buf: &mut Buffer) {
        Line::from(Span::styled(format!(" {}", uidata.pagination_info), styles.muted)).render(area, buf);
        let spans: Vec<Span> = uidata
            .page_buttons
            .iter()
            .map(|b| match b {
                PageButton::Previous(_) => Span::styled(" ‹ ", styles.muted),
                PageButton::Next(_) => Span::styled(" › ", styles.muted),
                PageButton::Page { page, active: true } => {
                    Span::styled(format!(" {page} "), Style::new().fg(styles.accent).reversed())
                }
                PageButton::Page { page, .. } => Span::raw(format!(" {page} ")),
            })
            .collect();
        Line::from(spans).right_aligned().render(area, buf);
    }

    fn draw_footer(&self, uidata: &UIData, styles: &Styles, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Search) => "/",
                Some(CMDMode::OpenFile) => "open: ",
                None => ":",
            };
            let line = Line::from(vec![
                Span::styled(prompt, Style::new().fg(styles.accent)),
                Span::raw(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(line, area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let show_toast = !uidata.status_message.is_empty()
            && uidata.last_status_message_update.elapsed() < self.toast_duration;
        let line = if show_toast {
            Line::from(Span::styled(
                format!(" {}", uidata.status_message),
                styles.toast(uidata.status_level),
            ))
        } else {
            Line::from(vec![
                Span::styled(" o", Style::new().fg(styles.accent)),
                " open ".into(),
                Span::styled("/", Style::new().fg(styles.accent)),
                " search ".into(),
                Span::styled("e", Style::new().fg(styles.accent)),
                " export ".into(),
                Span::styled("t", Style::new().fg(styles.accent)),
                " theme ".into(),
                Span::styled("?", Style::new().fg(styles.accent)),
                " help ".into(),
                Span::styled("q", Style::new().fg(styles.accent)),
                " quit".into(),
            ])
            .style(styles.muted)
        };
        frame.render_widget(line, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn render_panel(panel: &ChartPanel, styles: &Styles, area: Rect, buf: &mut Buffer) {
    if panel.data.is_empty() {
        Paragraph::new("No data").style(styles.muted).centered().render(area, buf);
        return;
    }
    match (&panel.data, panel.kind) {
        (ChartData::Categories { labels, values }, ChartKind::Bar | ChartKind::HorizontalBar) => {
            render_bars(labels, values, panel.kind == ChartKind::HorizontalBar, styles, area, buf)
        }
        (ChartData::Categories { labels, values }, ChartKind::Doughnut) => {
            render_shares(labels, values, styles, area, buf)
        }
        (ChartData::Categories { values, .. }, kind) => {
            let points: Vec<(f64, f64)> = values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
                .collect();
            let graph = if kind == ChartKind::Area { GraphType::Bar } else { GraphType::Line };
            render_xy(panel, &points, graph, styles, area, buf)
        }
        (ChartData::Points(points), _) => {
            render_xy(panel, points, GraphType::Scatter, styles, area, buf)
        }
    }
}

fn render_bars(
    labels: &[String],
    values: &[Option<f64>],
    horizontal: bool,
    styles: &Styles,
    area: Rect,
    buf: &mut Buffer,
) {
    let bars: Vec<Bar> = labels
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(idx, (label, value))| {
            let v = value.unwrap_or(0.0);
            Bar::default()
                .value(v.max(0.0).round() as u64)
                .text_value(format_number(v))
                .label(Line::from(label.clone()))
                .style(Style::new().fg(styles.series[idx % styles.series.len()]))
        })
        .collect();
    let mut chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_gap(1);
    if horizontal {
        chart = chart.direction(Direction::Horizontal).bar_width(1);
    } else {
        let width = (area.width / bars.len().max(1) as u16).saturating_sub(1).clamp(1, 9);
        chart = chart.bar_width(width);
    }
    chart.render(area, buf);
}

fn render_shares(labels: &[String], values: &[Option<f64>], styles: &Styles, area: Rect, buf: &mut Buffer) {
    let total: f64 = values.iter().flatten().sum();
    let lines: Vec<Line> = labels
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(idx, (label, value))| {
            let v = value.unwrap_or(0.0);
            let share = if total > 0.0 { v / total * 100.0 } else { 0.0 };
            Line::from(vec![
                Span::styled("■ ", Style::new().fg(styles.series[idx % styles.series.len()])),
                Span::raw(format!("{label} ")),
                Span::styled(format!("{share:.1}%"), styles.muted),
            ])
        })
        .collect();
    Paragraph::new(lines).render(area, buf);
}

fn render_xy(
    panel: &ChartPanel,
    points: &[(f64, f64)],
    graph: GraphType,
    styles: &Styles,
    area: Rect,
    buf: &mut Buffer,
) {
    let (xmin, xmax) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (ymin, ymax) = panel.data.value_bounds().unwrap_or((0.0, 1.0));
    let ymin = ymin.min(0.0);
    let ymax = if ymax > ymin { ymax } else { ymin + 1.0 };
    let xmax = if xmax > xmin { xmax } else { xmin + 1.0 };

    let dataset = Dataset::default()
        .name(panel.series_name.clone())
        .marker(if graph == GraphType::Scatter { Marker::Dot } else { Marker::Braille })
        .graph_type(graph)
        .style(Style::new().fg(styles.series[if graph == GraphType::Scatter { 1 } else { 0 }]))
        .data(points);
    Chart::new(vec![dataset])
        .x_axis(Axis::default().style(styles.muted).bounds([xmin, xmax]))
        .y_axis(
            Axis::default()
                .style(styles.muted)
                .bounds([ymin, ymax])
                .labels(vec![format_number(ymin), format_number(ymax)]),
        )
        .legend_position(None)
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use crate::samples::SampleKind;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(model: &Model) -> String {
        let mut ui = DashboardUI::new(&DashboardConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(160, 50)).unwrap();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model() -> (Model, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default()
            .with_preferences_path(Some(dir.path().join("prefs.json")))
            .with_export_dir(dir.path().to_path_buf());
        (Model::init(&config).unwrap(), dir)
    }

    #[test]
    fn empty_state_is_drawn() {
        let (model, _dir) = model();
        let text = screen(&model);
        assert!(text.contains("DataPulse"));
        assert!(text.contains("get started"));
    }

    #[test]
    fn dashboard_is_drawn() {
        let (mut model, _dir) = model();
        model.update(Some(Message::LoadSample(SampleKind::Sales))).unwrap();
        let text = screen(&model);
        assert!(text.contains("Showing 1–25 of 36 rows"));
        assert!(text.contains("Trend"));
        assert!(text.contains("Revenue"));
    }

    #[test]
    fn help_popup_is_drawn() {
        let (mut model, _dir) = model();
        model.update(Some(Message::Help)).unwrap();
        assert!(screen(&model).contains("Help"));
    }
}
