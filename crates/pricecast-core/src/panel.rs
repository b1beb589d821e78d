//! Price panel construction and per-commodity monthly series.
//!
//! The raw input is a wide table: one row per month, one column per
//! commodity, with `-` standing in for months without a quote and prices
//! formatted with thousands separators. [`build_panel`] normalizes that into
//! a long, keyed panel; [`Panel::series`] resamples one commodity onto a
//! gap-free monthly grid with interior gaps linearly interpolated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{month_sequence, months_between, parse_month_label};
use crate::error::{ForecastError, Result};

/// Cell content treated as "no data" besides empty cells.
const PLACEHOLDER: &str = "-";

/// Raw wide price table, as read from a spreadsheet export.
#[derive(Debug, Clone)]
pub struct WideTable {
    /// Commodity names, one per value column.
    pub commodities: Vec<String>,
    /// One entry per month row: the month label plus one cell per commodity.
    pub rows: Vec<(String, Vec<String>)>,
}

/// One cleaned observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub commodity: String,
    pub month: NaiveDate,
    pub price: f64,
}

/// Long-form price panel: sorted by commodity then month, at most one entry
/// per (commodity, month). Built once, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    entries: Vec<PanelEntry>,
}

/// Gap-free monthly series for one commodity. Also serves as the `history`
/// payload inside model artifacts, so it serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub months: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Build a long panel from a wide table.
///
/// Rows with unparseable month labels are dropped whole; cells that are
/// placeholders or fail numeric parsing are dropped individually. Duplicate
/// (commodity, month) pairs keep their first occurrence.
pub fn build_panel(table: &WideTable) -> Panel {
    let mut entries = Vec::new();
    let mut dropped_rows = 0usize;
    let mut dropped_cells = 0usize;

    for (label, cells) in &table.rows {
        let Some(month) = parse_month_label(label) else {
            tracing::debug!(label = %label, "dropping row with unparseable month label");
            dropped_rows += 1;
            continue;
        };
        for (commodity, cell) in table.commodities.iter().zip(cells.iter()) {
            match parse_price_cell(cell) {
                CellValue::Price(price) => entries.push(PanelEntry {
                    commodity: commodity.clone(),
                    month,
                    price,
                }),
                CellValue::Missing => {}
                CellValue::Unparseable => {
                    tracing::debug!(commodity = %commodity, cell = %cell, "dropping unparseable price cell");
                    dropped_cells += 1;
                }
            }
        }
    }

    entries.sort_by(|a, b| {
        a.commodity
            .cmp(&b.commodity)
            .then(a.month.cmp(&b.month))
    });
    entries.dedup_by(|a, b| a.commodity == b.commodity && a.month == b.month);

    if dropped_rows > 0 || dropped_cells > 0 {
        tracing::debug!(dropped_rows, dropped_cells, "panel cleaning dropped input");
    }

    Panel { entries }
}

enum CellValue {
    Price(f64),
    Missing,
    Unparseable,
}

fn parse_price_cell(cell: &str) -> CellValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return CellValue::Missing;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',' && *c != ' ').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Price(v),
        _ => CellValue::Unparseable,
    }
}

impl Panel {
    /// Commodity names present in the panel, sorted, without duplicates.
    pub fn commodities(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in &self.entries {
            if names.last().map(String::as_str) != Some(entry.commodity.as_str()) {
                names.push(entry.commodity.clone());
            }
        }
        names
    }

    pub fn entries(&self) -> &[PanelEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resample one commodity onto a gap-free monthly grid covering its
    /// observed span, linearly interpolating missing interior months.
    pub fn series(&self, commodity: &str) -> Result<MonthlySeries> {
        let observed: Vec<(&NaiveDate, f64)> = self
            .entries
            .iter()
            .filter(|e| e.commodity == commodity)
            .map(|e| (&e.month, e.price))
            .collect();
        if observed.is_empty() {
            return Err(ForecastError::CommodityNotFound(commodity.to_string()));
        }

        let first = *observed[0].0;
        let last = *observed[observed.len() - 1].0;
        let span = months_between(first, last) as usize + 1;

        let months = month_sequence(first, span);
        let mut slots: Vec<Option<f64>> = vec![None; span];
        for (month, price) in observed {
            let idx = months_between(first, *month) as usize;
            slots[idx] = Some(price);
        }
        let values = interpolate_gaps(&slots);

        Ok(MonthlySeries { months, values })
    }
}

/// Linear interpolation over missing slots. Both endpoints are observed by
/// construction in [`Panel::series`], but leading/trailing gaps are padded
/// with the nearest observation to stay total.
fn interpolate_gaps(slots: &[Option<f64>]) -> Vec<f64> {
    let mut result = vec![f64::NAN; slots.len()];
    let Some(first) = slots.iter().position(|v| v.is_some()) else {
        return result;
    };
    let last = slots
        .iter()
        .rposition(|v| v.is_some())
        .unwrap_or(first);

    if let Some(v) = slots[first] {
        for item in result.iter_mut().take(first + 1) {
            *item = v;
        }
    }
    if let Some(v) = slots[last] {
        for item in result.iter_mut().skip(last) {
            *item = v;
        }
    }

    let mut prev_idx = first;
    let mut prev_val = result[first];
    for i in (first + 1)..=last {
        if let Some(v) = slots[i] {
            let gap = i - prev_idx;
            if gap > 1 {
                let slope = (v - prev_val) / gap as f64;
                for j in 1..gap {
                    result[prev_idx + j] = prev_val + slope * j as f64;
                }
            }
            result[i] = v;
            prev_idx = i;
            prev_val = v;
        }
    }

    result
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.months.last().copied()
    }

    /// The same series with values taken to natural log.
    pub fn ln(&self) -> MonthlySeries {
        MonthlySeries {
            months: self.months.clone(),
            values: self.values.iter().map(|v| v.ln()).collect(),
        }
    }

    /// Split into a training prefix and held-out suffix. The split index is
    /// `floor(len * ratio)`, so a 0.8 ratio on 36 months trains on 28.
    pub fn split(&self, ratio: f64) -> (MonthlySeries, MonthlySeries) {
        let split_idx = (self.len() as f64 * ratio) as usize;
        let train = MonthlySeries {
            months: self.months[..split_idx].to_vec(),
            values: self.values[..split_idx].to_vec(),
        };
        let test = MonthlySeries {
            months: self.months[split_idx..].to_vec(),
            values: self.values[split_idx..].to_vec(),
        };
        (train, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn table(rows: Vec<(&str, Vec<&str>)>) -> WideTable {
        WideTable {
            commodities: vec!["Beras".to_string(), "Gula Pasir".to_string()],
            rows: rows
                .into_iter()
                .map(|(label, cells)| {
                    (
                        label.to_string(),
                        cells.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_build_panel_cleans_and_sorts() {
        let t = table(vec![
            ("01/02/2020", vec!["10,500", "-"]),
            ("01/01/2020", vec!["10,000", "12 000"]),
            ("bad label", vec!["9,999", "1"]),
            ("01/03/2020", vec!["n/a", "12,500"]),
        ]);
        let panel = build_panel(&t);

        let entries = panel.entries();
        assert_eq!(entries.len(), 4);
        // Sorted by commodity, then month; the unparseable label row and the
        // placeholder/unparseable cells are gone.
        assert_eq!(entries[0].commodity, "Beras");
        assert_eq!(entries[0].month, date(2020, 1));
        assert_relative_eq!(entries[0].price, 10000.0);
        assert_eq!(entries[1].month, date(2020, 2));
        assert_relative_eq!(entries[1].price, 10500.0);
        assert_eq!(entries[2].commodity, "Gula Pasir");
        assert_relative_eq!(entries[2].price, 12000.0);
        assert_relative_eq!(entries[3].price, 12500.0);
    }

    #[test]
    fn test_build_panel_keeps_first_duplicate() {
        let t = table(vec![
            ("01/01/2020", vec!["10,000", "1"]),
            ("05/01/2020", vec!["11,000", "2"]),
        ]);
        let panel = build_panel(&t);
        // Both labels normalize to January 2020; the first row wins.
        let beras: Vec<_> = panel
            .entries()
            .iter()
            .filter(|e| e.commodity == "Beras")
            .collect();
        assert_eq!(beras.len(), 1);
        assert_relative_eq!(beras[0].price, 10000.0);
    }

    #[test]
    fn test_commodities_listing() {
        let t = table(vec![("01/01/2020", vec!["1", "2"])]);
        let panel = build_panel(&t);
        assert_eq!(panel.commodities(), vec!["Beras", "Gula Pasir"]);
    }

    #[test]
    fn test_series_interpolates_missing_months() {
        let t = table(vec![
            ("01/01/2020", vec!["100", "-"]),
            ("01/02/2020", vec!["110", "-"]),
            // March and April missing for Beras
            ("01/05/2020", vec!["140", "-"]),
        ]);
        let panel = build_panel(&t);
        let series = panel.series("Beras").unwrap();

        assert_eq!(series.len(), 5);
        assert_eq!(series.months[0], date(2020, 1));
        assert_eq!(series.months[4], date(2020, 5));
        assert_relative_eq!(series.values[1], 110.0);
        assert_relative_eq!(series.values[2], 120.0, epsilon = 1e-9);
        assert_relative_eq!(series.values[3], 130.0, epsilon = 1e-9);
        assert_relative_eq!(series.values[4], 140.0);
    }

    #[test]
    fn test_series_unknown_commodity() {
        let t = table(vec![("01/01/2020", vec!["1", "2"])]);
        let panel = build_panel(&t);
        assert!(matches!(
            panel.series("Bawang"),
            Err(ForecastError::CommodityNotFound(_))
        ));
    }

    #[test]
    fn test_split_ratio() {
        let months = month_sequence(date(2020, 1), 10);
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let series = MonthlySeries { months, values };
        let (train, test) = series.split(0.8);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(test.months[0], date(2020, 9));
    }

    #[test]
    fn test_ln_round_trip() {
        let series = MonthlySeries {
            months: month_sequence(date(2020, 1), 2),
            values: vec![100.0, 200.0],
        };
        let logged = series.ln();
        assert_relative_eq!(logged.values[0].exp(), 100.0, epsilon = 1e-9);
        assert_eq!(logged.months, series.months);
    }
}
