//! Maharashtra location data - infrastructure layer
//!
//! District / tahsil / village hierarchy loaded from a JSON file. Criteria
//! are validated against it before a browser is ever launched, so a typo'd
//! village fails in milliseconds instead of after a full form fill.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::SearchCriteria;

/// district -> tahsil -> villages
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    districts: HashMap<String, HashMap<String, Vec<String>>>,
}

impl LocationIndex {
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::LocationsNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| FileError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let districts: HashMap<String, HashMap<String, Vec<String>>> =
            serde_json::from_str(&raw).map_err(|e| FileError::JsonParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        info!("✓ loaded location data: {} districts", districts.len());
        Ok(Self { districts })
    }

    #[cfg(test)]
    fn from_json(raw: &str) -> Self {
        Self {
            districts: serde_json::from_str(raw).unwrap(),
        }
    }

    pub fn districts(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.districts.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn tahsils(&self, district: &str) -> Option<Vec<&str>> {
        let tahsils = self.districts.get(district)?;
        let mut out: Vec<&str> = tahsils.keys().map(String::as_str).collect();
        out.sort_unstable();
        Some(out)
    }

    pub fn villages(&self, district: &str, tahsil: &str) -> Option<&[String]> {
        self.districts
            .get(district)
            .and_then(|t| t.get(tahsil))
            .map(Vec::as_slice)
    }

    /// Check every location field of `criteria` against the hierarchy.
    pub fn validate(&self, criteria: &SearchCriteria) -> AppResult<()> {
        let tahsils = self.districts.get(&criteria.district).ok_or_else(|| {
            AppError::InvalidCriteria {
                field: "district",
                value: criteria.district.clone(),
            }
        })?;
        let villages = tahsils
            .get(&criteria.tahsil)
            .ok_or_else(|| AppError::InvalidCriteria {
                field: "tahsil",
                value: criteria.tahsil.clone(),
            })?;
        if !villages.contains(&criteria.village) {
            return Err(AppError::InvalidCriteria {
                field: "village",
                value: criteria.village.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Pune": {
            "Haveli": ["Kothrud", "Wadgaon"],
            "Mulshi": ["Paud"]
        },
        "Mumbai Suburban": {
            "Andheri": ["Versova"]
        }
    }"#;

    fn criteria(district: &str, tahsil: &str, village: &str) -> SearchCriteria {
        SearchCriteria {
            year: "2023".into(),
            district: district.into(),
            tahsil: tahsil.into(),
            village: village.into(),
            property_no: "123".into(),
        }
    }

    #[test]
    fn lookups_walk_the_hierarchy() {
        let index = LocationIndex::from_json(SAMPLE);
        assert_eq!(index.districts(), vec!["Mumbai Suburban", "Pune"]);
        assert_eq!(index.tahsils("Pune").unwrap(), vec!["Haveli", "Mulshi"]);
        assert_eq!(
            index.villages("Pune", "Haveli").unwrap(),
            ["Kothrud", "Wadgaon"]
        );
        assert!(index.tahsils("Nagpur").is_none());
    }

    #[test]
    fn validate_accepts_known_combination() {
        let index = LocationIndex::from_json(SAMPLE);
        assert!(index.validate(&criteria("Pune", "Haveli", "Kothrud")).is_ok());
    }

    #[test]
    fn validate_names_the_offending_field() {
        let index = LocationIndex::from_json(SAMPLE);
        let err = index
            .validate(&criteria("Pune", "Haveli", "Paud"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidCriteria {
                field: "village",
                ..
            }
        ));
        let err = index
            .validate(&criteria("Pune", "Andheri", "Versova"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCriteria { field: "tahsil", .. }));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = LocationIndex::from_file("/nonexistent/locations.json").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::LocationsNotFound { .. })
        ));
    }
}
