//! OpenSearch index settings and mappings.
//!
//! Every index the manager creates uses the same settings and mappings. They
//! ship with the crate in `config/opensearch_mappings.json` and can be replaced
//! at run time by pointing `TIM_MAPPINGS_PATH` at another file.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::info;

use tim_shared::RECORD_ID_FIELD;

use crate::errors::TimError;

/// Environment variable naming an alternative mappings file.
pub const MAPPINGS_PATH_VAR: &str = "TIM_MAPPINGS_PATH";

const EMBEDDED_MAPPINGS: &str = include_str!("../../config/opensearch_mappings.json");

/// Settings and mappings for a new index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    settings: Map<String, Value>,
    mappings: Map<String, Value>,
}

impl IndexConfig {
    /// The configuration bundled with the crate.
    pub fn embedded() -> Result<Self, TimError> {
        Self::from_value(serde_json::from_str(EMBEDDED_MAPPINGS)?)
    }

    /// Read the configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TimError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_value(serde_json::from_str(&content)?)
    }

    /// Use `TIM_MAPPINGS_PATH` when set, the bundled configuration otherwise.
    pub fn from_env() -> Result<Self, TimError> {
        match env::var(MAPPINGS_PATH_VAR).ok().filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                info!(path = %path, "Loading index mappings from file");
                Self::from_path(path)
            }
            None => Self::embedded(),
        }
    }

    /// Validate a parsed `{"settings": {...}, "mappings": {...}}` document.
    ///
    /// The mappings must declare the record id field and the settings must
    /// carry an analysis section.
    pub fn from_value(value: Value) -> Result<Self, TimError> {
        let Value::Object(mut document) = value else {
            return Err(TimError::configuration("Index mappings file must be a JSON object"));
        };

        let settings = take_object(&mut document, "settings")?;
        let mappings = take_object(&mut document, "mappings")?;

        if mappings
            .get("properties")
            .and_then(|p| p.get(RECORD_ID_FIELD))
            .is_none()
        {
            return Err(TimError::configuration(format!(
                "Index mappings must define the '{}' property",
                RECORD_ID_FIELD
            )));
        }
        if !settings.contains_key("analysis") {
            return Err(TimError::configuration(
                "Index settings must define an 'analysis' section",
            ));
        }

        Ok(Self { settings, mappings })
    }

    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    pub fn mappings(&self) -> &Map<String, Value> {
        &self.mappings
    }

    /// Body of the create-index request.
    pub fn request_body(&self) -> Value {
        json!({
            "settings": self.settings,
            "mappings": self.mappings,
        })
    }
}

fn take_object(document: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>, TimError> {
    match document.remove(key) {
        Some(Value::Object(object)) => Ok(object),
        _ => Err(TimError::configuration(format!(
            "Index mappings file must contain a '{}' object",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_embedded_config_structure() {
        let config = IndexConfig::embedded().unwrap();
        let body = config.request_body();

        assert_eq!(
            body["mappings"]["properties"]["timdex_record_id"]["type"],
            "keyword"
        );
        assert!(body["settings"]["analysis"].is_object());
        assert!(body["settings"]["index"]["number_of_shards"].is_number());
    }

    #[test]
    fn test_missing_record_id_mapping() {
        let result = IndexConfig::from_value(json!({
            "settings": { "analysis": {} },
            "mappings": { "properties": { "title": { "type": "text" } } }
        }));
        assert!(matches!(result, Err(TimError::ConfigurationError(_))));
    }

    #[test]
    fn test_missing_analysis_settings() {
        let result = IndexConfig::from_value(json!({
            "settings": {},
            "mappings": { "properties": { "timdex_record_id": { "type": "keyword" } } }
        }));
        assert!(matches!(result, Err(TimError::ConfigurationError(_))));
    }

    #[test]
    fn test_not_an_object() {
        let result = IndexConfig::from_value(json!([1, 2]));
        assert!(matches!(result, Err(TimError::ConfigurationError(_))));
    }

    #[test]
    #[serial]
    fn test_from_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"settings": {{"analysis": {{}}, "custom": true}}, "mappings": {{"properties": {{"timdex_record_id": {{"type": "keyword"}}}}}}}}"#
        )
        .unwrap();

        env::set_var(MAPPINGS_PATH_VAR, file.path());
        let config = IndexConfig::from_env();
        env::remove_var(MAPPINGS_PATH_VAR);

        assert_eq!(config.unwrap().settings()["custom"], json!(true));
    }

    #[test]
    #[serial]
    fn test_from_env_default() {
        env::remove_var(MAPPINGS_PATH_VAR);
        assert_eq!(IndexConfig::from_env().unwrap(), IndexConfig::embedded().unwrap());
    }
}
