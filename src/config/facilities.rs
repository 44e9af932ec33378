use crate::utils::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUNDLED_FACILITIES: &str = include_str!("../../config/facilities.toml");

const MAX_SUGGESTIONS: usize = 3;

/// The approved center names, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRegistry {
    #[serde(default)]
    pub version: Option<String>,
    pub facilities: Vec<String>,
}

impl FacilityRegistry {
    /// Reads the list from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let registry: Self =
            toml::from_str(content).map_err(|e| RelayError::ConfigValidationError {
                field: "facilities".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        if registry.facilities.is_empty() {
            return Err(RelayError::ConfigValidationError {
                field: "facilities".to_string(),
                message: "facility list cannot be empty".to_string(),
            });
        }

        Ok(registry)
    }

    /// The list shipped with the binary.
    pub fn bundled() -> Self {
        Self::from_toml_str(BUNDLED_FACILITIES).unwrap_or_else(|e| {
            tracing::error!("bundled facility list is unreadable: {}", e);
            Self {
                version: None,
                facilities: Vec::new(),
            }
        })
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: None,
            facilities: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact, case-sensitive match.
    pub fn contains(&self, name: &str) -> bool {
        self.facilities.iter().any(|facility| facility == name)
    }

    /// Up to three entries that contain the input, or are contained in it,
    /// ignoring case. List order is kept.
    pub fn suggestions(&self, input: &str) -> Vec<&str> {
        let input_lower = input.to_lowercase();
        self.facilities
            .iter()
            .filter(|facility| {
                let facility_lower = facility.to_lowercase();
                facility_lower.contains(&input_lower) || input_lower.contains(&facility_lower)
            })
            .take(MAX_SUGGESTIONS)
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

impl Default for FacilityRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}
