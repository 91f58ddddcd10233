//! Dataset files: a CSV availability summary plus the full JSON records,
//! both named `{prefix}_{YYYYmmdd_HHMMSS}`.

use crate::catalog;
use crate::config::ExportConfig;
use crate::models::{Field, SchoolDescriptor, SchoolRecord};
use crate::utils::yes_no;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub struct DataStore {
    dir: PathBuf,
    prefix: String,
}

/// Paths written by one save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDataset {
    pub timestamp: String,
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl DataStore {
    pub fn new(config: &ExportConfig) -> Self {
        Self::at(&config.output_dir, &config.prefix)
    }

    pub fn at(dir: &Path, prefix: &str) -> Self {
        Self { dir: dir.to_path_buf(), prefix: prefix.to_string() }
    }

    pub fn save(&self, records: &[SchoolRecord], schools: &[SchoolDescriptor]) -> Result<SavedDataset> {
        self.save_at(records, schools, Local::now())
    }

    pub fn save_at(
        &self,
        records: &[SchoolRecord],
        schools: &[SchoolDescriptor],
        when: DateTime<Local>,
    ) -> Result<SavedDataset> {
        fs::create_dir_all(&self.dir).with_context(|| format!("Cannot create output dir {:?}", self.dir))?;

        let timestamp = when.format(TIMESTAMP_FORMAT).to_string();
        let base = format!("{}_{}", self.prefix, timestamp);
        let csv_path = self.dir.join(format!("{}.csv", base));
        let json_path = self.dir.join(format!("{}.json", base));

        write_summary(&csv_path, records, schools)?;

        let output: Vec<Value> = records.iter().map(SchoolRecord::to_output_value).collect();
        let body = serde_json::to_string_pretty(&output).context("Failed to serialise records")?;
        fs::write(&json_path, body).with_context(|| format!("Cannot write {:?}", json_path))?;

        info!("Saved {} records to {:?} and {:?}", records.len(), csv_path, json_path);
        Ok(SavedDataset { timestamp, csv: csv_path, json: json_path })
    }

    /// Timestamps of saved datasets, newest first.
    pub fn list_datasets(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            debug!("Output dir {:?} does not exist yet", self.dir);
            return Ok(Vec::new());
        }

        let head = format!("{}_", self.prefix);
        let mut stamps = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| format!("Cannot read dir: {:?}", self.dir))? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stamp) = name.strip_prefix(&head).and_then(|rest| rest.strip_suffix(".json")) {
                stamps.push(stamp.to_string());
            }
        }
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        Ok(stamps)
    }

    /// Records of the newest dataset, in output form. `None` when nothing was saved yet.
    pub fn load_latest(&self) -> Result<Option<(String, Vec<Value>)>> {
        let Some(stamp) = self.list_datasets()?.into_iter().next() else {
            return Ok(None);
        };
        let path = self.dir.join(format!("{}_{}.json", self.prefix, stamp));
        let raw = fs::read_to_string(&path).with_context(|| format!("Cannot read {:?}", path))?;
        let records: Vec<Value> = serde_json::from_str(&raw).with_context(|| format!("Malformed dataset {:?}", path))?;
        Ok(Some((stamp, records)))
    }
}

fn write_summary(path: &Path, records: &[SchoolRecord], schools: &[SchoolDescriptor]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("Cannot create {:?}", path))?;

    let mut header = vec!["Name".to_string(), "Website".to_string()];
    header.extend(Field::ALL.iter().map(|f| f.key().to_string()));
    wtr.write_record(&header)?;

    for record in records {
        let website = catalog::find(schools, &record.name).map(|s| s.link.as_str()).unwrap_or("");
        let mut row = vec![record.name.clone(), website.to_string()];
        row.extend(record.fields().map(|(_, r)| yes_no(r.is_available()).to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush().with_context(|| format!("Cannot flush {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionResult;
    use chrono::TimeZone;
    use serde_json::json;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lics_export_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn record() -> SchoolRecord {
        let mut r = SchoolRecord::failed("Faith Academy", "unreachable");
        r.tuition_fees = ExtractionResult::success(json!({ "regular": [{ "grade": "K" }] }));
        r.curriculum = ExtractionResult::partial(json!([]), "nothing parsed");
        r
    }

    fn school() -> SchoolDescriptor {
        let mut s = SchoolDescriptor::new("Faith Academy");
        s.link = "https://faith.edu.ph".into();
        s
    }

    #[test]
    fn save_writes_summary_and_records() {
        let dir = scratch("save");
        let store = DataStore::at(&dir, "school_data");
        let when = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap();

        let saved = store.save_at(&[record()], &[school()], when).unwrap();
        assert_eq!(saved.timestamp, "20250314_090507");
        assert!(saved.csv.ends_with("school_data_20250314_090507.csv"));

        let csv = fs::read_to_string(&saved.csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Name,Website,tuition_fees,curriculum,enrollment_process,scholarships,contact_info")
        );
        assert_eq!(lines.next(), Some("Faith Academy,https://faith.edu.ph,y,n,n,n,n"));

        let json: Vec<Value> = serde_json::from_str(&fs::read_to_string(&saved.json).unwrap()).unwrap();
        assert_eq!(json[0]["tuition_fees"]["regular"][0]["grade"], "K");
        assert_eq!(json[0]["contact_info"]["status"], "error");
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn latest_dataset_is_newest_timestamp() {
        let dir = scratch("latest");
        let store = DataStore::at(&dir, "school_data");
        assert!(store.load_latest().unwrap().is_none());

        let older = Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let newer = Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        store.save_at(&[record()], &[], older).unwrap();
        store.save_at(&[], &[], newer).unwrap();
        fs::write(dir.join("other_20990101_000000.json"), "[]").unwrap();

        assert_eq!(store.list_datasets().unwrap(), ["20250601_120000", "20250101_000000"]);
        let (stamp, records) = store.load_latest().unwrap().unwrap();
        assert_eq!(stamp, "20250601_120000");
        assert!(records.is_empty());
        fs::remove_dir_all(dir).ok();
    }
}
