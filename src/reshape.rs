use std::collections::{BTreeMap, BTreeSet};

use crate::errors::EmptyInputError;
use crate::record::Record;

/// Label of the matrix corner cell.
pub const METRIC_HEADER: &str = "Metric";

/// How period columns are ordered in the output matrix.
///
/// Plain string sort only orders chronologically for ISO-style labels like
/// `2023-04`; labels such as `2025 November second half` need an explicit
/// key function.
#[derive(Clone, Copy)]
pub enum PeriodOrder {
    Lexicographic,
    KeyFn(fn(&str) -> String),
}

pub struct ReshapeOptions {
    /// Field holding the period label, e.g. `Period` or `_start_from`.
    pub period_key: String,
    /// Column a record lands in when its period field is absent or blank.
    pub fallback_period_label: String,
    /// Fields excluded from metric enumeration (extraction timestamps,
    /// store ids, source tags). Varies per source, so it is configuration.
    pub metadata_keys: BTreeSet<String>,
    pub period_order: PeriodOrder,
}

impl ReshapeOptions {
    pub fn new(period_key: impl Into<String>) -> Self {
        Self {
            period_key: period_key.into(),
            fallback_period_label: "latest".to_string(),
            metadata_keys: BTreeSet::new(),
            period_order: PeriodOrder::Lexicographic,
        }
    }

    pub fn metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn fallback_period_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_period_label = label.into();
        self
    }

    pub fn period_order(mut self, order: PeriodOrder) -> Self {
        self.period_order = order;
        self
    }
}

/// The transposed metric-rows by period-columns table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    pub rows: Vec<Vec<String>>,
}

impl Matrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn is_rectangular(&self) -> bool {
        let columns = self.column_count();
        self.rows.iter().all(|row| row.len() == columns)
    }
}

/// Pivot row-oriented records into a metric-rows by period-columns matrix.
///
/// Records sharing a period merge by field union, later input winning on
/// collision. A record with no period value lands under the fallback label
/// rather than being dropped. The output is rectangular: one header row of
/// periods, one row per distinct metric, blank cells as empty strings.
pub fn reshape(records: &[Record], options: &ReshapeOptions) -> Result<Matrix, EmptyInputError> {
    if records.is_empty() {
        return Err(EmptyInputError);
    }

    let mut by_period: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for record in records {
        let period = match record.get(&options.period_key) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => options.fallback_period_label.clone(),
        };
        let merged = by_period.entry(period).or_default();
        for (field, value) in record.iter() {
            if field == &options.period_key || options.metadata_keys.contains(field) {
                continue;
            }
            merged.insert(field.clone(), value.clone());
        }
    }

    let metrics: BTreeSet<String> = by_period
        .values()
        .flat_map(|fields| fields.keys().cloned())
        .collect();

    // BTreeMap keys come out lexicographically sorted already; a key
    // function re-sorts them chronologically.
    let mut periods: Vec<String> = by_period.keys().cloned().collect();
    if let PeriodOrder::KeyFn(key) = options.period_order {
        periods.sort_by_key(|period| key(period));
    }

    let mut rows = Vec::with_capacity(1 + metrics.len());
    let mut header = Vec::with_capacity(1 + periods.len());
    header.push(METRIC_HEADER.to_string());
    header.extend(periods.iter().cloned());
    rows.push(header);

    for metric in &metrics {
        let mut row = Vec::with_capacity(1 + periods.len());
        row.push(metric.clone());
        for period in &periods {
            let value = by_period
                .get(period)
                .and_then(|fields| fields.get(metric))
                .cloned()
                .unwrap_or_default();
            row.push(value);
        }
        rows.push(row);
    }

    Ok(Matrix { rows })
}

/// Sort key for `YYYY MonthName ...` period labels, so that e.g.
/// `2025 September Second Half` orders before `2025 November second half`.
/// Labels in any other shape pass through unchanged.
pub fn month_label_sort_key(label: &str) -> String {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    let mut parts = label.split_whitespace();
    if let (Some(year), Some(month)) = (parts.next(), parts.next()) {
        if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
            if let Some(index) = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month)) {
                let mut key = format!("{year}-{:02}", index + 1);
                let rest = parts.collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    key.push(' ');
                    key.push_str(&rest.to_lowercase());
                }
                return key;
            }
        }
    }
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let mut record = Record::new();
        for (field, value) in pairs {
            record.insert(*field, *value);
        }
        record
    }

    fn default_options() -> ReshapeOptions {
        ReshapeOptions::new("Period")
    }

    #[test]
    fn pivots_metrics_against_periods() {
        let records = vec![
            record(&[("Period", "2023-Q1"), ("Revenue", "100")]),
            record(&[("Period", "2023-Q2"), ("Revenue", "150"), ("Costs", "20")]),
        ];
        let matrix = reshape(&records, &default_options()).unwrap();
        assert_eq!(
            matrix.rows,
            vec![
                vec!["Metric", "2023-Q1", "2023-Q2"],
                vec!["Costs", "", "20"],
                vec!["Revenue", "100", "150"],
            ]
            .into_iter()
            .map(|row| row.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn output_is_rectangular() {
        let records = vec![
            record(&[("Period", "a"), ("One", "1")]),
            record(&[("Period", "b"), ("Two", "2"), ("Three", "3")]),
            record(&[("Period", "c")]),
        ];
        let matrix = reshape(&records, &default_options()).unwrap();
        assert!(matrix.is_rectangular());
        assert_eq!(matrix.column_count(), 4); // "Metric" + 3 periods
        for row in &matrix.rows {
            assert_eq!(row.len(), 4);
        }
    }

    #[test]
    fn reshape_is_deterministic() {
        let records = vec![
            record(&[("Period", "2024-01"), ("Revenue", "10"), ("Costs", "4")]),
            record(&[("Period", "2024-02"), ("Revenue", "12")]),
        ];
        let first = reshape(&records, &default_options()).unwrap();
        let second = reshape(&records, &default_options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn later_record_wins_on_collision() {
        let records = vec![
            record(&[("Period", "2024-01"), ("X", "old")]),
            record(&[("Period", "2024-01"), ("X", "new")]),
        ];
        let matrix = reshape(&records, &default_options()).unwrap();
        assert_eq!(matrix.rows[1], vec!["X".to_string(), "new".to_string()]);
    }

    #[test]
    fn missing_period_uses_fallback_label() {
        let records = vec![
            record(&[("Revenue", "10")]),
            record(&[("Period", ""), ("Costs", "4")]),
        ];
        let options = default_options().fallback_period_label("latest");
        let matrix = reshape(&records, &options).unwrap();
        assert_eq!(matrix.rows[0], vec!["Metric".to_string(), "latest".to_string()]);
        // Both records landed in the fallback column instead of being dropped.
        assert_eq!(matrix.rows[1], vec!["Costs".to_string(), "4".to_string()]);
        assert_eq!(matrix.rows[2], vec!["Revenue".to_string(), "10".to_string()]);
    }

    #[test]
    fn metadata_fields_are_excluded_from_metrics() {
        let records = vec![record(&[
            ("_start_from", "2024-01"),
            ("_extracted_at", "2025-11-25T20:00:00Z"),
            ("_id", "abc"),
            ("Revenue", "10"),
        ])];
        let options = ReshapeOptions::new("_start_from").metadata_keys(["_extracted_at", "_id"]);
        let matrix = reshape(&records, &options).unwrap();
        let metrics: Vec<&str> = matrix.rows[1..].iter().map(|row| row[0].as_str()).collect();
        assert_eq!(metrics, vec!["Revenue"]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(reshape(&[], &default_options()).is_err());
        let one = vec![record(&[("Period", "2024-01"), ("Revenue", "10")])];
        assert!(reshape(&one, &default_options()).is_ok());
    }

    #[test]
    fn key_fn_overrides_lexicographic_order() {
        let records = vec![
            record(&[("Period", "2025 November second half"), ("Revenue", "9")]),
            record(&[("Period", "2025 September Second Half"), ("Revenue", "7")]),
        ];

        // The default string sort puts November first, which is wrong
        // chronologically.
        let lex = reshape(&records, &default_options()).unwrap();
        assert_eq!(lex.rows[0][1], "2025 November second half");

        let options = default_options().period_order(PeriodOrder::KeyFn(month_label_sort_key));
        let ordered = reshape(&records, &options).unwrap();
        assert_eq!(ordered.rows[0][1], "2025 September Second Half");
        assert_eq!(ordered.rows[0][2], "2025 November second half");
    }

    #[test]
    fn month_label_key_normalizes_year_month_labels() {
        assert_eq!(
            month_label_sort_key("2025 September Second Half"),
            "2025-09 second half"
        );
        assert_eq!(
            month_label_sort_key("2025 November second half"),
            "2025-11 second half"
        );
        assert_eq!(month_label_sort_key("2025 December"), "2025-12");
        assert_eq!(month_label_sort_key("2023-04"), "2023-04");
        assert_eq!(month_label_sort_key("latest"), "latest");
    }
}
