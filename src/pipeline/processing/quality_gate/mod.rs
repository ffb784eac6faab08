use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use crate::constants;
use crate::domain::{columns, Dataset};

/// Overall outcome of a validation pass
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum QualityStatus {
    #[serde(rename = "OK")]
    Ok,
    /// At least one critical column exceeded the null threshold
    #[serde(rename = "ALERTA")]
    Alerta,
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityStatus::Ok => f.write_str("OK"),
            QualityStatus::Alerta => f.write_str("ALERTA"),
        }
    }
}

/// Null count of one column and its share of all rows, rounded to 2 decimals
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NullStats {
    #[serde(rename = "nulos")]
    pub nulls: usize,
    #[serde(rename = "percentual")]
    pub percent: f64,
}

/// A critical column whose null rate is above the threshold. Advisory only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QualityAlert {
    pub column: String,
    pub nulls: usize,
    pub percent: f64,
}

/// Counts of values outside their valid domain. A counter is `None` when its column is
/// not part of the dataset.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InvalidValueCounts {
    #[serde(rename = "valor_negativo_ou_zero", skip_serializing_if = "Option::is_none")]
    pub non_positive_valor: Option<usize>,
    #[serde(rename = "ano_fora_intervalo", skip_serializing_if = "Option::is_none")]
    pub ano_out_of_range: Option<usize>,
    #[serde(rename = "mes_invalido", skip_serializing_if = "Option::is_none")]
    pub mes_invalid: Option<usize>,
}

impl InvalidValueCounts {
    /// Labelled counters that are present and non-zero
    pub fn nonzero(&self) -> Vec<(&'static str, usize)> {
        [
            ("valor_negativo_ou_zero", self.non_positive_valor),
            ("ano_fora_intervalo", self.ano_out_of_range),
            ("mes_invalido", self.mes_invalid),
        ]
        .into_iter()
        .filter_map(|(label, count)| count.filter(|c| *c > 0).map(|c| (label, c)))
        .collect()
    }
}

/// Result of the quality gate over a whole dataset
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationReport {
    #[serde(rename = "total_registros")]
    pub total_records: usize,
    /// Null statistics of the critical columns present, in the fixed critical order
    #[serde(rename = "colunas_criticas", serialize_with = "ordered_map")]
    pub critical_columns: Vec<(String, NullStats)>,
    /// Null statistics of every column
    #[serde(rename = "valores_nulos")]
    pub null_values: BTreeMap<String, NullStats>,
    #[serde(rename = "valores_invalidos")]
    pub invalid_values: InvalidValueCounts,
    #[serde(rename = "alertas")]
    pub alerts: Vec<QualityAlert>,
    pub status: QualityStatus,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.status == QualityStatus::Ok
    }

    pub fn critical(&self, column: &str) -> Option<&NullStats> {
        self.critical_columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, stats)| stats)
    }
}

/// Trait for implementing data-quality validation over a dataset
pub trait QualityGate {
    fn validate(&self, dataset: &Dataset) -> ValidationReport;
}

/// Configuration for quality assessment rules
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Null ratio (0.0 to 1.0) above which a critical column raises an alert
    pub null_threshold: f64,
    pub critical_columns: Vec<String>,
    pub year_range: RangeInclusive<i64>,
    pub month_range: RangeInclusive<i64>,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            null_threshold: constants::NULL_ALERT_THRESHOLD,
            critical_columns: columns::CRITICAL.iter().map(|c| c.to_string()).collect(),
            year_range: constants::MIN_VALID_YEAR..=constants::MAX_VALID_YEAR,
            month_range: constants::MIN_VALID_MONTH..=constants::MAX_VALID_MONTH,
        }
    }
}

/// Default quality gate with configurable thresholds
#[derive(Debug, Clone, Default)]
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    fn null_stats(nulls: usize, total: usize) -> NullStats {
        let percent = if total == 0 {
            0.0
        } else {
            round2(nulls as f64 / total as f64 * 100.0)
        };
        NullStats { nulls, percent }
    }

    fn exceeds_threshold(&self, nulls: usize, total: usize) -> bool {
        total > 0 && (nulls as f64 / total as f64) > self.config.null_threshold
    }

    /// Count non-null numeric values of `column` failing `is_valid`
    fn count_invalid<F>(dataset: &Dataset, column: &str, is_valid: F) -> Option<usize>
    where
        F: Fn(f64) -> bool,
    {
        let values = dataset.column_values(column)?;
        Some(
            values
                .filter_map(|v| v.as_f64())
                .filter(|x| !is_valid(*x))
                .count(),
        )
    }

    fn invalid_values(&self, dataset: &Dataset) -> InvalidValueCounts {
        let years = &self.config.year_range;
        let months = &self.config.month_range;
        InvalidValueCounts {
            non_positive_valor: Self::count_invalid(dataset, columns::VALOR, |v| v > 0.0),
            ano_out_of_range: Self::count_invalid(dataset, columns::ANO, |v| {
                v >= *years.start() as f64 && v <= *years.end() as f64
            }),
            mes_invalid: Self::count_invalid(dataset, columns::MES, |v| {
                v >= *months.start() as f64 && v <= *months.end() as f64
            }),
        }
    }
}

impl QualityGate for DefaultQualityGate {
    fn validate(&self, dataset: &Dataset) -> ValidationReport {
        let total = dataset.len();
        let mut status = QualityStatus::Ok;
        let mut critical_columns = Vec::new();
        let mut alerts = Vec::new();

        for column in &self.config.critical_columns {
            let Some(nulls) = dataset.null_count(column) else {
                continue;
            };
            let stats = Self::null_stats(nulls, total);
            if self.exceeds_threshold(nulls, total) {
                status = QualityStatus::Alerta;
                alerts.push(QualityAlert {
                    column: column.clone(),
                    nulls,
                    percent: stats.percent,
                });
            }
            critical_columns.push((column.clone(), stats));
        }

        let null_values = dataset
            .columns()
            .iter()
            .map(|column| {
                let nulls = dataset.null_count(column).unwrap_or(0);
                (column.clone(), Self::null_stats(nulls, total))
            })
            .collect();

        ValidationReport {
            total_records: total,
            critical_columns,
            null_values,
            invalid_values: self.invalid_values(dataset),
            alerts,
            status,
        }
    }
}

fn ordered_map<S>(entries: &[(String, NullStats)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    fn with_nulls(column: &str, total: usize, nulls: usize) -> Dataset {
        let rows = (0..total)
            .map(|i| {
                let v = if i < nulls { Value::Null } else { Value::Int(1) };
                vec![v, Value::Int(i as i64 + 1)]
            })
            .collect();
        Dataset::from_rows(vec![column.to_string(), "valor".to_string()], rows).unwrap()
    }

    #[test]
    fn test_exactly_five_percent_nulls_is_ok() {
        let report = DefaultQualityGate::new().validate(&with_nulls("orgao", 100, 5));
        assert_eq!(report.status, QualityStatus::Ok);
        assert_eq!(report.critical("orgao").unwrap().percent, 5.0);
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_just_above_five_percent_nulls_alerts() {
        let report = DefaultQualityGate::new().validate(&with_nulls("orgao", 10_000, 501));
        assert_eq!(report.status, QualityStatus::Alerta);
        assert_eq!(report.critical("orgao").unwrap().percent, 5.01);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].column, "orgao");
    }

    #[test]
    fn test_alert_is_sticky_across_columns() {
        let ds = Dataset::from_rows(
            vec!["valor".into(), "ano".into(), "mes".into()],
            vec![
                vec![Value::Null, Value::Int(2023), Value::Int(1)],
                vec![Value::Int(5), Value::Int(2023), Value::Int(1)],
            ],
        )
        .unwrap();
        let report = DefaultQualityGate::new().validate(&ds);
        assert_eq!(report.status, QualityStatus::Alerta);
        let names: Vec<_> = report.critical_columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["valor", "ano", "mes"]);
    }

    #[test]
    fn test_invalid_counters_ignore_nulls() {
        let ds = Dataset::from_rows(
            vec!["valor".into(), "ano".into(), "mes".into()],
            vec![
                vec![Value::Int(0), Value::Int(1999), Value::Int(13)],
                vec![Value::Float(-1.0), Value::Int(2026), Value::Int(0)],
                vec![Value::Float(3.0), Value::Int(2025), Value::Int(12)],
                vec![Value::Null, Value::Null, Value::Null],
            ],
        )
        .unwrap();
        let report = DefaultQualityGate::new().validate(&ds);

        assert_eq!(report.invalid_values.non_positive_valor, Some(2));
        assert_eq!(report.invalid_values.ano_out_of_range, Some(2));
        assert_eq!(report.invalid_values.mes_invalid, Some(2));
        assert_eq!(report.invalid_values.nonzero().len(), 3);
    }

    #[test]
    fn test_absent_columns_have_no_counters() {
        let ds = Dataset::from_rows(vec!["orgao".into()], vec![vec![Value::text("A")]]).unwrap();
        let report = DefaultQualityGate::new().validate(&ds);
        assert_eq!(report.invalid_values, InvalidValueCounts::default());
        assert_eq!(report.critical_columns.len(), 1);
    }

    #[test]
    fn test_null_map_covers_every_column() {
        let ds = Dataset::from_rows(
            vec!["orgao".into(), "passthrough".into()],
            vec![vec![Value::text("A"), Value::Null], vec![Value::text("B"), Value::Int(1)]],
        )
        .unwrap();
        let report = DefaultQualityGate::new().validate(&ds);
        assert_eq!(report.null_values["passthrough"], NullStats { nulls: 1, percent: 50.0 });
        assert_eq!(report.null_values["orgao"], NullStats { nulls: 0, percent: 0.0 });
    }

    #[test]
    fn test_empty_dataset_is_ok() {
        let ds = Dataset::new(vec!["valor".into()]);
        let report = DefaultQualityGate::new().validate(&ds);
        assert_eq!(report.total_records, 0);
        assert!(report.is_ok());
        assert_eq!(report.critical("valor").unwrap().percent, 0.0);
    }

    #[test]
    fn test_custom_year_range() {
        let config = QualityGateConfig {
            year_range: 2020..=2030,
            ..QualityGateConfig::default()
        };
        let ds = Dataset::from_rows(vec!["ano".into()], vec![vec![Value::Int(2028)], vec![Value::Int(2019)]]).unwrap();
        let report = DefaultQualityGate::with_config(config).validate(&ds);
        assert_eq!(report.invalid_values.ano_out_of_range, Some(1));
    }

    #[test]
    fn test_report_serializes_with_original_keys() {
        let report = DefaultQualityGate::new().validate(&with_nulls("orgao", 10, 0));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_registros"], 10);
        assert_eq!(json["status"], "OK");
        assert!(json["valores_invalidos"].get("valor_negativo_ou_zero").is_some());
        assert_eq!(json["colunas_criticas"]["orgao"]["nulos"], 0);
    }
}
