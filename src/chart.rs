//! Weekly Progress Chart
//!
//! Chart data is derived from the `{date: totalKg}` map returned by the
//! backend. A [`ChartCanvas`] holds at most one chart instance; every redraw
//! destroys the previous instance and builds a new one.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;

use crate::view::to_fixed;

/// Locale used for the x-axis day labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelLocale {
    /// `es-CO`: "lun 1"
    #[default]
    Spanish,
    /// `en`: "Mon 1"
    English,
}

impl LabelLocale {
    /// Map a BCP 47 tag; anything that is not English falls back to Spanish
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("en") {
            LabelLocale::English
        } else {
            LabelLocale::Spanish
        }
    }

    fn weekday_short(&self, weekday: Weekday) -> &'static str {
        match self {
            LabelLocale::Spanish => match weekday {
                Weekday::Mon => "lun",
                Weekday::Tue => "mar",
                Weekday::Wed => "mié",
                Weekday::Thu => "jue",
                Weekday::Fri => "vie",
                Weekday::Sat => "sáb",
                Weekday::Sun => "dom",
            },
            LabelLocale::English => match weekday {
                Weekday::Mon => "Mon",
                Weekday::Tue => "Tue",
                Weekday::Wed => "Wed",
                Weekday::Thu => "Thu",
                Weekday::Fri => "Fri",
                Weekday::Sat => "Sat",
                Weekday::Sun => "Sun",
            },
        }
    }
}

/// Short weekday plus day of month
pub fn day_label(date: NaiveDate, locale: LabelLocale) -> String {
    format!("{} {}", locale.weekday_short(date.weekday()), date.day())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
}

/// One data series and its styling
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub values: Vec<f64>,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub border_width: u32,
    pub tension: f64,
    pub fill: bool,
}

/// Everything needed to draw a chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub dataset: Dataset,
    pub y_begin_at_zero: bool,
}

/// Build the weekly line chart. Days are ordered by date ascending before
/// labels are derived; keys that are not `YYYY-MM-DD` dates are skipped.
pub fn weekly_progress_chart(progress: &HashMap<String, f64>, locale: LabelLocale) -> ChartSpec {
    let mut days: Vec<(NaiveDate, f64)> = progress
        .iter()
        .filter_map(|(key, total)| match NaiveDate::parse_from_str(key, "%Y-%m-%d") {
            Ok(date) => Some((date, *total)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping progress entry with invalid date");
                None
            }
        })
        .collect();
    days.sort_by_key(|(date, _)| *date);

    ChartSpec {
        kind: ChartKind::Line,
        labels: days.iter().map(|(date, _)| day_label(*date, locale)).collect(),
        dataset: Dataset {
            label: "Kg Reciclados".to_string(),
            values: days.iter().map(|(_, total)| *total).collect(),
            background_color: "rgba(212, 160, 23, 0.2)",
            border_color: "#d4a017",
            border_width: 3,
            tension: 0.4,
            fill: true,
        },
        y_begin_at_zero: true,
    }
}

impl ChartSpec {
    /// Horizontal bar rendering for terminals
    pub fn to_text(&self, width: usize) -> String {
        if self.labels.is_empty() {
            return "Sin datos esta semana".to_string();
        }

        let max = self
            .dataset
            .values
            .iter()
            .cloned()
            .fold(0.0_f64, f64::max);
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        self.labels
            .iter()
            .zip(&self.dataset.values)
            .map(|(label, value)| {
                let bar_len = if max > 0.0 {
                    ((value / max) * width as f64).round() as usize
                } else {
                    0
                };
                let padding = label_width - label.chars().count();
                format!(
                    "{}{} │{} {} kg",
                    label,
                    " ".repeat(padding),
                    "█".repeat(bar_len),
                    to_fixed(*value, 1)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A drawn chart
#[derive(Debug, Clone)]
pub struct ChartInstance {
    pub id: u64,
    pub spec: ChartSpec,
}

/// Drawing surface that owns at most one chart instance
#[derive(Debug, Default)]
pub struct ChartCanvas {
    instance: Option<ChartInstance>,
    next_id: u64,
    destroyed: u64,
}

impl ChartCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy the current instance, if any, and draw `spec` as a new one
    pub fn redraw(&mut self, spec: ChartSpec) -> &ChartInstance {
        if let Some(old) = self.instance.take() {
            tracing::debug!(chart_id = old.id, "Destroying previous chart instance");
            self.destroyed += 1;
        }

        self.next_id += 1;
        self.instance.insert(ChartInstance {
            id: self.next_id,
            spec,
        })
    }

    pub fn current(&self) -> Option<&ChartInstance> {
        self.instance.as_ref()
    }

    /// Number of instances torn down so far
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }
}
