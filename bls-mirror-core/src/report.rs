//! Reporting over the mirrored data: population statistics, best year per series, and a
//! series/population join.

use crate::config::ReportParams;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("series table has no header row")]
    EmptyTable,
    #[error("series table is missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("series table line {line}: {detail}")]
    BadRow { line: usize, detail: String },
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset record {index}: {detail}")]
    BadRecord { index: usize, detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesObservation {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub year: i32,
    pub population: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStats {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestYear {
    pub series_id: String,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
    pub population: Option<f64>,
}

/// Parse the whitespace-delimited series file. Only `series_id`, `year`, `period` and
/// `value` are read; other columns are ignored.
pub fn parse_series_table(text: &str) -> Result<Vec<SeriesObservation>, ReportError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines.next().ok_or(ReportError::EmptyTable)?;
    let columns: Vec<&str> = header.split_whitespace().collect();
    let position = |name: &'static str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or(ReportError::MissingColumn(name))
    };
    let (series_col, year_col, period_col, value_col) = (
        position("series_id")?,
        position("year")?,
        position("period")?,
        position("value")?,
    );

    let mut observations = Vec::new();
    for (idx, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let field = |col: usize| {
            fields.get(col).copied().ok_or_else(|| ReportError::BadRow {
                line: idx + 1,
                detail: format!("expected at least {} fields", col + 1),
            })
        };
        let year = field(year_col)?;
        let value = field(value_col)?;
        observations.push(SeriesObservation {
            series_id: field(series_col)?.to_string(),
            year: year.parse().map_err(|_| ReportError::BadRow {
                line: idx + 1,
                detail: format!("invalid year `{year}`"),
            })?,
            period: field(period_col)?.to_string(),
            value: value.parse().map_err(|_| ReportError::BadRow {
                line: idx + 1,
                detail: format!("invalid value `{value}`"),
            })?,
        });
    }
    debug!(rows = observations.len(), "[REPORT] Parsed series table");
    Ok(observations)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse the mirrored dataset: an array of records with (case-insensitive) `year` and
/// `population` fields, given as numbers or numeric strings.
pub fn parse_population(json: &str) -> Result<Vec<PopulationRecord>, ReportError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(json)?;
    records
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<PopulationRecord, ReportError> {
            let lookup = |name: &str| {
                record
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .and_then(|(_, v)| number(v))
                    .ok_or_else(|| ReportError::BadRecord {
                        index,
                        detail: format!("missing or non-numeric `{name}`"),
                    })
            };
            Ok(PopulationRecord {
                year: lookup("year")? as i32,
                population: lookup("population")?,
            })
        })
        .collect()
}

/// Mean and sample standard deviation of population over the inclusive year range.
/// `None` when fewer than two records fall in range.
pub fn population_stats(
    records: &[PopulationRecord],
    years: RangeInclusive<i32>,
) -> Option<PopulationStats> {
    let values: Vec<f64> = records
        .iter()
        .filter(|r| years.contains(&r.year))
        .map(|r| r.population)
        .collect();
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(PopulationStats {
        mean,
        std_dev: variance.sqrt(),
    })
}

/// For each series, the year whose periods sum to the largest value. Ties go to the
/// earliest year.
pub fn best_years(observations: &[SeriesObservation]) -> Vec<BestYear> {
    let mut sums: BTreeMap<&str, BTreeMap<i32, f64>> = BTreeMap::new();
    for obs in observations {
        *sums
            .entry(obs.series_id.as_str())
            .or_default()
            .entry(obs.year)
            .or_default() += obs.value;
    }
    sums.into_iter()
        .filter_map(|(series_id, years)| {
            years
                .into_iter()
                .fold(None, |best: Option<(i32, f64)>, (year, value)| match best {
                    Some((_, top)) if top >= value => best,
                    _ => Some((year, value)),
                })
                .map(|(year, value)| BestYear {
                    series_id: series_id.to_string(),
                    year,
                    value,
                })
        })
        .collect()
}

/// Observations for one series and period, left-joined with population by year.
pub fn joined_report(
    observations: &[SeriesObservation],
    population: &[PopulationRecord],
    series_id: &str,
    period: &str,
) -> Vec<JoinedRow> {
    let by_year: HashMap<i32, f64> = population.iter().map(|r| (r.year, r.population)).collect();
    observations
        .iter()
        .filter(|o| o.series_id == series_id && o.period == period)
        .map(|o| JoinedRow {
            series_id: o.series_id.clone(),
            year: o.year,
            period: o.period.clone(),
            value: o.value,
            population: by_year.get(&o.year).copied(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub params: ReportParams,
    pub population: Option<PopulationStats>,
    pub best_years: Vec<BestYear>,
    pub joined: Vec<JoinedRow>,
}

pub fn build_report(
    series_text: &str,
    dataset_json: &str,
    params: &ReportParams,
) -> Result<Report, ReportError> {
    let observations = parse_series_table(series_text)?;
    let population = parse_population(dataset_json)?;
    info!(
        observations = observations.len(),
        population_records = population.len(),
        "[REPORT] Loaded mirrored data"
    );
    Ok(Report {
        params: params.clone(),
        population: population_stats(&population, params.years()),
        best_years: best_years(&observations),
        joined: joined_report(&observations, &population, &params.series_id, &params.period),
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = format!("{}-{}", self.params.from_year, self.params.to_year);
        match &self.population {
            Some(stats) => {
                writeln!(f, "Standard Deviation of population ({range}): {:.3}", stats.std_dev)?;
                writeln!(f, "Mean of population ({range}): {:.0}", stats.mean)?;
            }
            None => writeln!(f, "Population statistics ({range}): not enough data")?,
        }

        writeln!(f)?;
        writeln!(f, "{:<20} {:>6} {:>12}", "series_id", "year", "value")?;
        for best in &self.best_years {
            writeln!(f, "{:<20} {:>6} {:>12.3}", best.series_id, best.year, best.value)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:<20} {:>6} {:>6} {:>12} {:>14}",
            "series_id", "year", "period", "value", "population"
        )?;
        for row in &self.joined {
            let population = row
                .population
                .map(|p| format!("{p:.0}"))
                .unwrap_or_else(|| "NaN".to_string());
            writeln!(
                f,
                "{:<20} {:>6} {:>6} {:>12.3} {:>14}",
                row.series_id, row.year, row.period, row.value, population
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES: &str = "series_id        \tyear\tperiod\t       value\tfootnote_codes\n\
PRS30006011      \t2018\tQ01\t       1.0\t\n\
PRS30006011      \t2018\tQ02\t       2.0\t\n\
PRS30006011      \t2019\tQ01\t       2.5\t\n\
PRS30006032      \t2013\tQ01\t       0.5\t\n\
PRS30006032      \t2013\tQ02\t       1.5\t\n\
PRS30006032      \t2014\tQ01\t       2.0\t\n\
PRS30006032      \t2030\tQ01\t      -1.0\tP\n";

    const DATASET: &str = r#"[
        {"ID Nation":"01000US","Nation":"United States","ID Year":2013,"Year":"2013","Population":100},
        {"ID Nation":"01000US","Nation":"United States","ID Year":2014,"Year":"2014","Population":200},
        {"ID Nation":"01000US","Nation":"United States","ID Year":2015,"Year":"2015","Population":300},
        {"ID Nation":"01000US","Nation":"United States","ID Year":2019,"Year":"2019","Population":1000}
    ]"#;

    #[test]
    fn parses_padded_series_table() {
        let rows = parse_series_table(SERIES).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].series_id, "PRS30006011");
        assert_eq!(rows[0].year, 2018);
        assert_eq!(rows[0].period, "Q01");
        assert_eq!(rows[0].value, 1.0);
    }

    #[test]
    fn series_table_errors_name_the_problem() {
        assert!(matches!(parse_series_table(""), Err(ReportError::EmptyTable)));
        assert!(matches!(
            parse_series_table("series_id year period\nA 2020 Q01\n"),
            Err(ReportError::MissingColumn("value"))
        ));
        assert!(matches!(
            parse_series_table("series_id year period value\nA twenty Q01 1\n"),
            Err(ReportError::BadRow { line: 2, .. })
        ));
    }

    #[test]
    fn parses_population_with_string_years() {
        let records = parse_population(DATASET).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            PopulationRecord {
                year: 2013,
                population: 100.0
            }
        );
    }

    #[test]
    fn population_stats_use_sample_deviation_over_inclusive_range() {
        let records = parse_population(DATASET).unwrap();
        let stats = population_stats(&records, 2013..=2018).unwrap();
        assert_eq!(stats.mean, 200.0);
        assert!((stats.std_dev - 100.0).abs() < 1e-9);
        assert!(population_stats(&records, 2019..=2020).is_none());
    }

    #[test]
    fn best_year_is_largest_yearly_sum_per_series() {
        let rows = parse_series_table(SERIES).unwrap();
        let best = best_years(&rows);
        assert_eq!(
            best,
            vec![
                BestYear {
                    series_id: "PRS30006011".into(),
                    year: 2018,
                    value: 3.0
                },
                BestYear {
                    series_id: "PRS30006032".into(),
                    year: 2013,
                    value: 2.0
                },
            ]
        );
    }

    #[test]
    fn join_keeps_rows_without_population() {
        let rows = parse_series_table(SERIES).unwrap();
        let population = parse_population(DATASET).unwrap();
        let joined = joined_report(&rows, &population, "PRS30006032", "Q01");
        let summary: Vec<(i32, Option<f64>)> = joined.iter().map(|r| (r.year, r.population)).collect();
        assert_eq!(summary, vec![(2013, Some(100.0)), (2014, Some(200.0)), (2030, None)]);
    }

    #[test]
    fn report_renders_all_sections() {
        let report = build_report(SERIES, DATASET, &ReportParams::default()).unwrap();
        let text = report.to_string();
        assert!(text.contains("Standard Deviation of population (2013-2018): 100.000"));
        assert!(text.contains("Mean of population (2013-2018): 200"));
        assert!(text.contains("PRS30006011"));
        assert!(text.contains("NaN"));
    }
}
