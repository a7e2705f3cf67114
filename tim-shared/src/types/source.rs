//! Source naming rules.
//!
//! Index names follow the convention `<source>-YYYY-MM-DDthh-mm-ss`. The source
//! is never stored anywhere; it is always derived from the index name prefix.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Alias holding the current production index of every source.
pub const PRIMARY_ALIAS: &str = "all-current";

/// Sources the command line accepts.
pub const VALID_SOURCES: &[&str] = &[
    "alma",
    "aspace",
    "dspace",
    "gismit",
    "gisogm",
    "libguides",
    "jpal",
    "researchdatabases",
    "whoas",
    "zenodo",
];

/// Timestamp portion of a generated index name.
pub const INDEX_TIMESTAMP_FORMAT: &str = "%Y-%m-%dt%H-%M-%S";

/// Reasons an index name does not follow the naming convention.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexNameError {
    #[error("Index name must be in the format <source>-<timestamp>, e.g. 'aspace-2022-01-01t12-34-56'.")]
    Syntax,

    #[error("Source in index name must be a valid configured source, one of: {}", VALID_SOURCES.join(", "))]
    Source,

    #[error("Date in index name must be in the format 'YYYY-MM-DDthh-mm-ss', e.g. 'aspace-2022-01-01t12-34-56'.")]
    Date,
}

/// Derive the source of an index from its name prefix.
///
/// A name without a `-` is its own source.
pub fn source_from_index(index: &str) -> &str {
    index.split('-').next().unwrap_or(index)
}

/// Generate a new index name for a source, stamped with the current UTC time.
pub fn generate_index_name(source: &str) -> String {
    generate_index_name_at(source, Utc::now())
}

/// Generate an index name for a source, stamped with the given time.
pub fn generate_index_name_at(source: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", source, at.format(INDEX_TIMESTAMP_FORMAT))
}

/// Check an index name against the naming convention and the configured sources.
pub fn validate_index_name(name: &str) -> Result<(), IndexNameError> {
    let (source, timestamp) = name.split_once('-').ok_or(IndexNameError::Syntax)?;
    if !VALID_SOURCES.contains(&source) {
        return Err(IndexNameError::Source);
    }
    NaiveDateTime::parse_from_str(timestamp, INDEX_TIMESTAMP_FORMAT)
        .map_err(|_| IndexNameError::Date)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_from_index() {
        assert_eq!(source_from_index("test-index-12345-67890"), "test");
    }

    #[test]
    fn test_source_from_index_without_dash() {
        assert_eq!(source_from_index("testsource"), "testsource");
    }

    #[test]
    fn test_generate_index_name() {
        let at = Utc.with_ymd_and_hms(2022, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(generate_index_name_at("test", at), "test-2022-09-01t00-00-00");
    }

    #[test]
    fn test_generated_name_is_valid() {
        let name = generate_index_name("aspace");
        assert!(name.starts_with("aspace-"));
        assert_eq!(validate_index_name(&name), Ok(()));
    }

    #[test]
    fn test_validate_index_name_success() {
        assert_eq!(validate_index_name("aspace-2022-09-01t13-14-15"), Ok(()));
    }

    #[test]
    fn test_validate_index_name_invalid_syntax() {
        assert_eq!(
            validate_index_name("everythingaboutthisiswrong"),
            Err(IndexNameError::Syntax)
        );
    }

    #[test]
    fn test_validate_index_name_invalid_source() {
        assert_eq!(
            validate_index_name("wrong-2022-09-01t13-14-15"),
            Err(IndexNameError::Source)
        );
    }

    #[test]
    fn test_validate_index_name_invalid_date() {
        assert_eq!(
            validate_index_name("aspace-2022-09-01t13:14:15"),
            Err(IndexNameError::Date)
        );
    }
}
