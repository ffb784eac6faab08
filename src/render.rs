// Human-readable CLI output for pipeline results

use std::fmt::Write;

use crate::app::catalog_use_case::{BronzePartitionInfo, RawListing, SilverSummary};
use crate::app::IngestSummary;
use crate::pipeline::processing::ValidationReport;
use crate::pipeline::SilverRun;

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

pub fn ingest_summary(summary: &IngestSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n📥 Ingestion results (run {}):", summary.run_id);
    let _ = writeln!(out, "   Total pages: {}", summary.total_pages);
    let _ = writeln!(out, "   Started at page: {}", summary.start_page);
    let _ = writeln!(out, "   Pages fetched: {}", summary.pages_fetched);
    let _ = writeln!(out, "   Records fetched: {}", summary.records_fetched);
    let _ = writeln!(out, "   Rows appended to bronze: {}", summary.rows_appended);
    let _ = writeln!(out, "   Rows skipped (no partition key): {}", summary.rows_skipped);
    let _ = writeln!(out, "   Partitions touched: {}", summary.partitions.len());
    if summary.completed {
        let _ = writeln!(out, "   ✅ All pages ingested, checkpoint removed");
    } else {
        let _ = writeln!(out, "   ⏸️  Stopped early, resume with `ingest`");
    }
    out
}

pub fn raw_listing(listing: &RawListing) -> String {
    let mut out = String::new();
    if listing.archives.is_empty() {
        let _ = writeln!(out, "No raw archives found");
        return out;
    }
    let _ = writeln!(out, "\n🗂️  Raw archives:");
    for archive in &listing.archives {
        match &archive.records {
            Ok(n) => {
                let _ = writeln!(
                    out,
                    "   {} - {} records ({:.2} MB)",
                    archive.name,
                    n,
                    megabytes(archive.size_bytes)
                );
            }
            Err(e) => {
                let _ = writeln!(out, "   {} - unreadable: {}", archive.name, e);
            }
        }
    }
    let _ = writeln!(
        out,
        "   Total: {} archives, {} records, {:.2} MB",
        listing.archives.len(),
        listing.total_records,
        megabytes(listing.total_bytes)
    );
    out
}

pub fn bronze_partitions(partitions: &[BronzePartitionInfo]) -> String {
    let mut out = String::new();
    if partitions.is_empty() {
        let _ = writeln!(out, "No bronze partitions found");
        return out;
    }
    let _ = writeln!(out, "\n🥉 Bronze partitions:");
    for p in partitions {
        let valor = p
            .valor_total
            .map_or_else(|| "n/a".to_string(), |v| format!("R$ {v:.2}"));
        let _ = writeln!(
            out,
            "   ano_mes={} - {} file(s), {} records, valor total {}",
            p.key, p.files, p.records, valor
        );
    }
    let total: usize = partitions.iter().map(|p| p.records).sum();
    let _ = writeln!(out, "   Total: {} partitions, {} records", partitions.len(), total);
    out
}

pub fn validation_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let icon = if report.is_ok() { "✅" } else { "⚠️ " };
    let _ = writeln!(out, "\n{} Quality status: {}", icon, report.status);
    let _ = writeln!(out, "   Total records: {}", report.total_records);
    for (column, stats) in &report.critical_columns {
        let _ = writeln!(out, "   {}: {} nulls ({:.2}%)", column, stats.nulls, stats.percent);
    }
    for (label, count) in report.invalid_values.nonzero() {
        let _ = writeln!(out, "   {label}: {count}");
    }
    for alert in &report.alerts {
        let _ = writeln!(out, "   ALERT {}: {:.2}% null", alert.column, alert.percent);
    }
    out
}

pub fn silver_run(run: &SilverRun) -> String {
    let mut out = String::new();
    let t = &run.transform;
    let _ = writeln!(out, "\n🥈 Silver run {}:", run.run_id);
    let _ = writeln!(
        out,
        "   Bronze: {} rows from {} file(s) in {} partition(s)",
        run.rows_read, run.bronze_files, run.bronze_partitions
    );
    let _ = writeln!(out, "   Duplicates removed: {}", t.duplicates_removed);
    let _ = writeln!(out, "   Rows with valor <= 0 removed: {}", t.non_positive_removed);
    let _ = writeln!(out, "   Values coerced to null: {}", t.total_coerced_to_null());
    let _ = writeln!(out, "   Rows written: {}", run.dataset.len());
    match &run.written.unpartitioned {
        Some(path) => {
            let _ = writeln!(out, "   Output: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "   Partitions written: {}", run.written.partition_count());
        }
    }
    out.push_str(&validation_report(&run.report));
    out
}

pub fn silver_summary(summary: &SilverSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n🥈 Silver layer:");
    let _ = writeln!(out, "   Files: {}", summary.files.len());
    let _ = writeln!(out, "   Total records: {}", summary.total_records);
    let _ = writeln!(out, "   Columns ({}): {}", summary.columns.len(), summary.columns.join(", "));
    if let Some(v) = &summary.valor {
        let _ = writeln!(
            out,
            "   valor: total R$ {:.2}, mean R$ {:.2}, max R$ {:.2}",
            v.sum, v.mean, v.max
        );
    }
    if let Some((min, max)) = summary.ano_range {
        let _ = writeln!(out, "   ano: {min} - {max}");
    }
    let _ = writeln!(out, "\n{}", summary.sample);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listings() {
        let listing = RawListing {
            archives: Vec::new(),
            total_records: 0,
            total_bytes: 0,
        };
        assert_eq!(raw_listing(&listing), "No raw archives found\n");
        assert_eq!(bronze_partitions(&[]), "No bronze partitions found\n");
    }

    #[test]
    fn test_bronze_partitions_lists_totals() {
        let text = bronze_partitions(&[BronzePartitionInfo {
            key: "2023_01".into(),
            files: 1,
            records: 4,
            valor_total: Some(12.5),
        }]);
        assert!(text.contains("ano_mes=2023_01"));
        assert!(text.contains("R$ 12.50"));
        assert!(text.contains("Total: 1 partitions, 4 records"));
    }
}
