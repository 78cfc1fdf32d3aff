//! Loading inventories, configuration and graph documents from disk.

use anyhow::{anyhow, Context, Result};
use legacymap_assemble::{AssemblyConfig, GraphDocument};
use legacymap_model::{InventoryRecord, SourceInventory};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A whole inventory document (`{"locations": [...]}`) or a JSON array of per-file records.
pub fn inventory_file(path: &Path) -> Result<SourceInventory> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read inventory {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if value.is_array() {
        let records: Vec<InventoryRecord> = serde_json::from_value(value)
            .with_context(|| format!("{}: invalid inventory records", path.display()))?;
        return Ok(SourceInventory::from_records(records));
    }
    serde_json::from_value(value).with_context(|| format!("{}: invalid inventory", path.display()))
}

/// Every `*.json` record under `dir`, in sorted path order.
pub fn inventory_dir(dir: &Path) -> Result<SourceInventory> {
    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("json")
        {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let record: InventoryRecord = serde_json::from_str(&text)
            .with_context(|| format!("{}: invalid inventory record", path.display()))?;
        records.push(record);
    }
    tracing::info!(dir = %dir.display(), records = records.len(), "loaded inventory records");
    Ok(SourceInventory::from_records(records))
}

pub fn inventory(file: Option<&Path>, dir: Option<&Path>) -> Result<SourceInventory> {
    match (file, dir) {
        (Some(file), None) => inventory_file(file),
        (None, Some(dir)) => inventory_dir(dir),
        (Some(_), Some(_)) => Err(anyhow!("pass either --inventory or --inventory-dir, not both")),
        (None, None) => Err(anyhow!("one of --inventory or --inventory-dir is required")),
    }
}

/// Defaults when no path is given.
pub fn config(path: Option<&Path>) -> Result<AssemblyConfig> {
    match path {
        Some(path) => Ok(AssemblyConfig::load(path)?),
        None => Ok(AssemblyConfig::default()),
    }
}

pub fn document(path: &Path) -> Result<GraphDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph {}", path.display()))?;
    Ok(GraphDocument::from_json_str(&text)?)
}

pub fn write_document(path: &Path, doc: &GraphDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, doc.to_json_pretty()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
