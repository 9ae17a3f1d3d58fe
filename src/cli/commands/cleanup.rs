use serde_json::{json, Value};

use crate::cli::utils::{output_rows, output_success};
use crate::cli::OutputFormat;
use crate::database::DocumentStore;
use crate::maintenance::{cleanup_placeholders, CleanupItem};

fn describe(row: &Value) -> String {
    format!(
        "{}/{}  {}",
        row["collection"].as_str().unwrap_or_default(),
        row["id"].as_str().unwrap_or_default(),
        row["url"].as_str().unwrap_or_default()
    )
}

fn rows(items: &[CleanupItem]) -> Vec<Value> {
    items.iter().map(|item| json!(item)).collect()
}

pub async fn handle(store: &dyn DocumentStore, dry_run: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let report = cleanup_placeholders(store, dry_run).await;

    if let OutputFormat::Json = output_format {
        println!("{}", serde_json::to_string_pretty(&json!({ "success": report.failed.is_empty(), "report": report }))?);
    } else {
        let verb = if dry_run { "Would clear" } else { "Cleared" };
        println!("{} {} image field(s):", verb, report.cleared.len());
        output_rows(&output_format, "records", &rows(&report.cleared), describe)?;

        let verb = if dry_run { "Would delete" } else { "Deleted" };
        println!("{} {} gallery record(s):", verb, report.deleted.len());
        output_rows(&output_format, "records", &rows(&report.deleted), describe)?;

        if !report.failed.is_empty() {
            println!("Failed on {} record(s):", report.failed.len());
            output_rows(&output_format, "records", &rows(&report.failed), describe)?;
        }

        output_success(
            &output_format,
            &format!("Scanned {} records, {} changed", report.scanned, report.changed()),
            None,
        )?;
    }

    if !report.failed.is_empty() {
        anyhow::bail!("{} record(s) could not be cleaned", report.failed.len());
    }
    Ok(())
}
