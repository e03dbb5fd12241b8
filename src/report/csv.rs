//! CSV report export (RFC 4180 compliant)

use crate::error::Result;
use crate::models::Finding;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Column order of the finding schema
pub const HEADER: &str = "module,endpoint,parameter,payload,evidence,severity";

/// Escapes a field for CSV according to RFC 4180
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(f: &Finding) -> String {
    format!(
        "{},{},{},{},{},{}",
        escape_csv(&f.module.to_string()),
        escape_csv(&f.endpoint),
        escape_csv(&f.parameter),
        escape_csv(&f.payload),
        escape_csv(&f.evidence),
        escape_csv(&f.severity.to_string()),
    )
}

/// Writes findings in emission order, one row each
pub fn write_findings<W: Write>(findings: &[Finding], mut writer: W) -> Result<()> {
    writeln!(writer, "{HEADER}")?;
    for f in findings {
        writeln!(writer, "{}", row(f))?;
    }
    writer.flush()?;
    Ok(())
}

/// Exports findings as a CSV file
pub fn export(findings: &[Finding], output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    write_findings(findings, std::io::BufWriter::new(file))?;
    info!("CSV report saved to {}", output_path.display());
    Ok(())
}
