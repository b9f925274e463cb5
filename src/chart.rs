//! Step chart of the stock history: one panel per product, one line per spice level.
//!
//! Times are shifted into the configured fixed offset and then drawn as
//! naive wall-clock values, so the axis reads in shop-local time.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashSet;
use std::path::Path;

use crate::config::{ChartConfig, MonitorConfig};
use crate::history::{HistoryLog, StockObservation};
use crate::stock::SpiceLevel;

const WIDTH: u32 = 2100;
const PANEL_HEIGHT: u32 = 750;
const Y_MIN: i64 = -2;

const LOW_COLOR: RGBColor = RGBColor(0xFF, 0xA5, 0x00);

fn spice_color(s: SpiceLevel) -> RGBColor {
    match s {
        SpiceLevel::Mild => RGBColor(0x2E, 0x7D, 0x32),
        SpiceLevel::Medium => RGBColor(0xF5, 0x7C, 0x00),
        SpiceLevel::Spicy => RGBColor(0xC6, 0x28, 0x28),
    }
}

fn batch_key(r: &StockObservation, by_unix: bool) -> i64 {
    match (by_unix, r.unix_ts) {
        (true, Some(ts)) => ts,
        _ => r.timestamp.timestamp_micros(),
    }
}

/// Keep only the rows of the `runs` most recent sampling batches.
///
/// Batches are keyed by `unix_ts` when every row has one, otherwise by the
/// timestamp itself.
pub fn last_runs(rows: Vec<StockObservation>, runs: usize) -> Vec<StockObservation> {
    let by_unix = rows.iter().all(|r| r.unix_ts.is_some());
    let mut keys: Vec<i64> = rows.iter().map(|r| batch_key(r, by_unix)).collect();
    keys.sort_unstable();
    keys.dedup();
    let keep: HashSet<i64> = keys[keys.len().saturating_sub(runs)..]
        .iter()
        .copied()
        .collect();
    rows.into_iter()
        .filter(|r| keep.contains(&batch_key(r, by_unix)))
        .collect()
}

/// Tick spacing and label format, chosen from the plotted time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFormat {
    Daily,
    SixHourly,
    HalfHourly,
    Auto,
}

impl AxisFormat {
    pub fn for_span(span: Duration) -> Self {
        if span.num_days() > 7 {
            AxisFormat::Daily
        } else if span.num_days() > 1 {
            AxisFormat::SixHourly
        } else if span.num_seconds() > 3600 {
            AxisFormat::HalfHourly
        } else {
            AxisFormat::Auto
        }
    }

    pub fn pattern(self) -> &'static str {
        match self {
            AxisFormat::Daily => "%m/%d",
            AxisFormat::SixHourly | AxisFormat::Auto => "%m/%d %H:%M",
            AxisFormat::HalfHourly => "%H:%M",
        }
    }

    pub fn step(self) -> Option<Duration> {
        match self {
            AxisFormat::Daily => Some(Duration::days(1)),
            AxisFormat::SixHourly => Some(Duration::hours(6)),
            AxisFormat::HalfHourly => Some(Duration::minutes(30)),
            AxisFormat::Auto => None,
        }
    }

    /// Tick positions on `[x0, x1]`, each on a whole multiple of the step
    /// counted from local midnight. Long spans skip boundaries to stay
    /// under `MAX_TICKS`; `Auto` picks the finest round step that fits.
    pub fn ticks(self, x0: i64, x1: i64) -> Vec<i64> {
        let span = (x1 - x0).max(1);
        let base = match self.step() {
            Some(step) => step.num_seconds(),
            None => AUTO_STEPS
                .iter()
                .copied()
                .find(|s| span / s < MAX_TICKS)
                .unwrap_or(3600),
        };
        let stride = (span / base / MAX_TICKS + 1).max(1);
        let step = base * stride;
        let first = x0.div_euclid(step) * step;
        let first = if first < x0 { first + step } else { first };
        (0..)
            .map(|i| first + i * step)
            .take_while(|x| *x <= x1)
            .collect()
    }
}

/// Upper bound on x-axis ticks per panel.
const MAX_TICKS: i64 = 30;

/// Candidate steps in seconds for short spans.
const AUTO_STEPS: [i64; 6] = [60, 120, 300, 600, 900, 1800];

#[derive(Debug, Clone, PartialEq)]
pub struct SpiceSeries {
    pub spice: SpiceLevel,
    /// (local wall-clock time, quantity), oldest first.
    pub points: Vec<(NaiveDateTime, i64)>,
    pub sold_out: Vec<(NaiveDateTime, i64)>,
}

impl SpiceSeries {
    pub fn latest(&self) -> i64 {
        self.points.last().map(|p| p.1).unwrap_or_default()
    }

    /// Post-step path: each value holds until the next sample.
    pub fn step_path(&self) -> Vec<(i64, i64)> {
        let mut out = Vec::with_capacity(self.points.len() * 2);
        for (i, &(t, q)) in self.points.iter().enumerate() {
            out.push((x_coord(t), q));
            if let Some(&(next, _)) = self.points.get(i + 1) {
                out.push((x_coord(next), q));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub product_name: String,
    pub series: Vec<SpiceSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub panels: Vec<Panel>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ChartData {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    fn max_quantity(&self) -> i64 {
        self.panels
            .iter()
            .flat_map(|p| p.series.iter())
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .max()
            .unwrap_or_default()
    }
}

pub fn to_local_naive(ts: &DateTime<FixedOffset>, tz: FixedOffset) -> NaiveDateTime {
    ts.with_timezone(&tz).naive_local()
}

fn x_coord(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp()
}

fn tick_label(x: i64, pattern: &str) -> String {
    DateTime::from_timestamp(x, 0)
        .map(|d| d.naive_utc().format(pattern).to_string())
        .unwrap_or_default()
}

/// Group rows into panels (products in first-seen order) and per-spice series.
/// `None` when there is nothing to draw.
pub fn prepare(rows: &[StockObservation], tz: FixedOffset) -> Option<ChartData> {
    let mut names: Vec<&str> = Vec::new();
    for r in rows {
        if !names.contains(&r.product_name.as_str()) {
            names.push(&r.product_name);
        }
    }

    let mut panels = Vec::with_capacity(names.len());
    for name in names {
        let mut series = Vec::new();
        for spice in SpiceLevel::ALL {
            let mut picked: Vec<&StockObservation> = rows
                .iter()
                .filter(|r| r.product_name == name && r.spice_level == spice)
                .collect();
            if picked.is_empty() {
                continue;
            }
            picked.sort_by_key(|r| r.timestamp);
            let point = |r: &StockObservation| (to_local_naive(&r.timestamp, tz), r.quantity as i64);
            series.push(SpiceSeries {
                spice,
                points: picked.iter().map(|r| point(*r)).collect(),
                sold_out: picked.iter().filter(|r| r.sold_out).map(|r| point(*r)).collect(),
            });
        }
        panels.push(Panel {
            product_name: name.to_string(),
            series,
        });
    }

    let times = rows.iter().map(|r| to_local_naive(&r.timestamp, tz));
    let start = times.clone().min()?;
    let end = times.max()?;
    Some(ChartData { panels, start, end })
}

/// The low-stock label sits just above its line at the right edge, clear of the legend.
fn low_label_anchor(x1: i64, low: i64) -> (i64, i64) {
    (x1, low + 1)
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("chart drawing failed: {e}")
}

/// Draw `data` to a PNG at `out`, replacing any previous file.
pub fn render(
    data: &ChartData,
    cfg: &ChartConfig,
    low_threshold: u64,
    tz: FixedOffset,
    out: &Path,
) -> Result<()> {
    if data.panels.is_empty() {
        bail!("nothing to plot");
    }

    let axis = AxisFormat::for_span(data.span());
    let pattern = axis.pattern();
    let fmt_x = |x: &i64| tick_label(*x, pattern);

    let mut x0 = x_coord(data.start);
    let mut x1 = x_coord(data.end);
    if x1 - x0 < 60 {
        x0 -= 1800;
        x1 += 1800;
    }
    let ticks = axis.ticks(x0, x1);
    let y_top = cfg.y_max.max(data.max_quantity() + 5);
    let low = low_threshold as i64;

    let height = PANEL_HEIGHT * data.panels.len() as u32;
    let root = BitMapBackend::new(out, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let root = root
        .titled(&cfg.title, ("sans-serif", 40).into_font().style(FontStyle::Bold))
        .map_err(draw_err)?;
    let areas = root.split_evenly((data.panels.len(), 1));
    let last = data.panels.len() - 1;

    for (idx, (panel, area)) in data.panels.iter().zip(areas.iter()).enumerate() {
        let mut chart = ChartBuilder::on(area)
            .caption(
                &panel.product_name,
                ("sans-serif", 28).into_font().style(FontStyle::Bold),
            )
            .margin(20)
            .x_label_area_size(if idx == last { 90 } else { 40 })
            .y_label_area_size(60)
            .build_cartesian_2d((x0..x1).with_key_points(ticks.clone()), Y_MIN..y_top)
            .map_err(draw_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.x_label_formatter(&fmt_x)
            .y_desc("Stock")
            .light_line_style(BLACK.mix(0.05).stroke_width(1))
            .bold_line_style(BLACK.mix(0.15).stroke_width(1));
        if idx == last {
            mesh.x_desc(format!("Time (UTC{tz})"));
        }
        mesh.draw().map_err(draw_err)?;

        // out-of-stock band and zero line
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x0, Y_MIN), (x1, 0)],
                RED.mix(0.1).filled(),
            )))
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(
                vec![(x0, 0), (x1, 0)],
                RED.mix(0.5).stroke_width(1),
            ))
            .map_err(draw_err)?;

        // dashed low-stock line
        let dash = ((x1 - x0) / 120).max(1);
        chart
            .draw_series(
                (0..)
                    .map(move |i| x0 + i * dash * 2)
                    .take_while(move |a| *a < x1)
                    .map(|a| {
                        PathElement::new(
                            vec![(a, low), ((a + dash).min(x1), low)],
                            LOW_COLOR.mix(0.7).stroke_width(1),
                        )
                    }),
            )
            .map_err(draw_err)?;
        chart
            .draw_series(std::iter::once(Text::new(
                "Low",
                low_label_anchor(x1, low),
                ("sans-serif", 16)
                    .into_font()
                    .color(&LOW_COLOR)
                    .pos(Pos::new(HPos::Right, VPos::Bottom)),
            )))
            .map_err(draw_err)?;

        let mut sold_out_labelled = false;
        for s in &panel.series {
            let color = spice_color(s.spice);
            chart
                .draw_series(LineSeries::new(s.step_path(), color.stroke_width(3)))
                .map_err(draw_err)?
                .label(format!("{}: {}", s.spice.title(), s.latest()))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                });

            chart
                .draw_series(
                    s.points
                        .iter()
                        .map(|&(t, q)| Circle::new((x_coord(t), q), 4, color.mix(0.7).filled())),
                )
                .map_err(draw_err)?;

            if s.sold_out.is_empty() {
                continue;
            }
            let marks = chart
                .draw_series(
                    s.sold_out
                        .iter()
                        .map(|&(t, q)| Cross::new((x_coord(t), q), 10, RED.stroke_width(3))),
                )
                .map_err(draw_err)?;
            if !sold_out_labelled {
                marks
                    .label("Sold Out")
                    .legend(|(x, y)| Cross::new((x + 10, y), 6, RED.stroke_width(2)));
                sold_out_labelled = true;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.9).filled())
            .border_style(BLACK.stroke_width(1))
            .draw()
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    Ok(())
}

/// Load the history log, window it and render. Returns the number of rows drawn.
/// `runs == None` draws everything.
pub fn render_history(cfg: &MonitorConfig, runs: Option<usize>, out: &Path) -> Result<usize> {
    let tz = cfg.history.offset()?;
    let log = HistoryLog::new(&cfg.history.csv_path);
    if !log.exists() {
        bail!("{} not found", log.path().display());
    }
    let rows = log.read_all(tz)?;
    let rows = match runs {
        Some(n) => last_runs(rows, n),
        None => rows,
    };
    tracing::info!(rows = rows.len(), "generating chart");
    let Some(data) = prepare(&rows, tz) else {
        bail!("{} has no rows to plot", log.path().display());
    };
    render(&data, &cfg.chart, cfg.history.low_stock_threshold, tz, out)?;
    tracing::info!(path = %out.display(), "chart saved");
    Ok(rows.len())
}
