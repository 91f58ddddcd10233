//! School catalog: which URLs to read for each category of each school.

use crate::error::CatalogError;
use crate::models::SchoolDescriptor;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN: &str = include_str!("../../catalog/schools.json");

/// The catalog compiled into the binary.
pub fn builtin() -> Result<Vec<SchoolDescriptor>, CatalogError> {
    parse(BUILTIN)
}

pub fn from_path(path: &Path) -> Result<Vec<SchoolDescriptor>, CatalogError> {
    debug!("Reading catalog {:?}", path);
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let schools = parse(&raw)?;
    info!("Loaded {} schools from {:?}", schools.len(), path);
    Ok(schools)
}

pub fn parse(raw: &str) -> Result<Vec<SchoolDescriptor>, CatalogError> {
    Ok(serde_json::from_str(raw)?)
}

/// Case-insensitive lookup by display name.
pub fn find<'a>(schools: &'a [SchoolDescriptor], name: &str) -> Option<&'a SchoolDescriptor> {
    let wanted = name.trim();
    schools.iter().find(|s| s.name.eq_ignore_ascii_case(wanted))
}
