//! JSON report export

use crate::error::Result;
use crate::models::{PageRecord, ScanResult};
use std::path::Path;
use tracing::info;

/// Exports scan results as a JSON file
pub fn export(result: &ScanResult, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(output_path, json)?;
    info!("JSON report saved to {}", output_path.display());
    Ok(())
}

/// Exports crawl output alone, as an array of page records
pub fn export_pages(pages: &[PageRecord], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(pages)?;
    std::fs::write(output_path, json)?;
    info!(
        "Crawl output ({} pages) saved to {}",
        pages.len(),
        output_path.display()
    );
    Ok(())
}

/// Loads a ScanResult from a JSON file
pub fn load(input_path: &Path) -> Result<ScanResult> {
    let content = std::fs::read_to_string(input_path)?;
    let result: ScanResult = serde_json::from_str(&content)?;
    Ok(result)
}
