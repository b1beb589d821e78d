//! Wide price CSV reading.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pricecast_core::WideTable;

/// Read a wide price table: header = date column label plus one commodity
/// name per column, one record per month. Cells are kept verbatim; blank and
/// placeholder handling happens in the panel builder.
pub fn read_wide_csv(path: &Path) -> Result<WideTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read the header row of {}", path.display()))?;
    if headers.len() < 2 {
        bail!(
            "{} needs a date column and at least one commodity column",
            path.display()
        );
    }
    let commodities: Vec<String> = headers
        .iter()
        .skip(1)
        .map(|name| name.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let label = record.get(0).unwrap_or("").trim().to_string();
        let cells: Vec<String> = (1..=commodities.len())
            .map(|i| record.get(i).unwrap_or("").trim().to_string())
            .collect();
        rows.push((label, cells));
    }

    tracing::debug!(
        path = %path.display(),
        commodities = commodities.len(),
        rows = rows.len(),
        "wide table read"
    );
    Ok(WideTable { commodities, rows })
}
