//! Local argument checks shared by every command.
//!
//! Everything here runs before authentication or any platform request.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::errors::ValidationError;

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(())
}

/// Image URIs must carry an explicit tag (or digest) after the repository.
pub fn validate_image_uri(uri: &str) -> Result<(), ValidationError> {
    require_non_empty("image URI", uri)?;
    if uri.contains('@') {
        return Ok(());
    }
    let repository_end = uri.rfind('/').map_or(0, |i| i + 1);
    match uri[repository_end..].split_once(':') {
        Some((name, tag)) if !name.is_empty() && !tag.is_empty() => Ok(()),
        _ => Err(ValidationError::UntaggedImage(uri.to_string())),
    }
}

/// Accepts 0 through 100.
pub fn allowable_failure_percent(value: i64) -> Result<u8, ValidationError> {
    u8::try_from(value)
        .ok()
        .filter(|percent| *percent <= 100)
        .ok_or(ValidationError::AllowableFailurePercent(value))
}

fn flag_names(group: &[(&str, bool)]) -> Vec<String> {
    group.iter().map(|(name, _)| (*name).to_string()).collect()
}

fn set_names(group: &[(&str, bool)]) -> Vec<String> {
    group
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// At most one flag of the group may be set.
pub fn exclusive(group: &[(&str, bool)]) -> Result<(), ValidationError> {
    let set = set_names(group);
    if set.len() > 1 {
        return Err(ValidationError::MutuallyExclusive {
            group: flag_names(group),
            set,
        });
    }
    Ok(())
}

/// At least one flag of the group must be set.
pub fn one_required(group: &[(&str, bool)]) -> Result<(), ValidationError> {
    if group.iter().any(|(_, set)| *set) {
        return Ok(());
    }
    Err(ValidationError::MissingOneOf(flag_names(group)))
}

/// Either every flag of the group is set, or none is.
pub fn required_together(group: &[(&str, bool)]) -> Result<(), ValidationError> {
    let set = set_names(group);
    if set.is_empty() || set.len() == group.len() {
        return Ok(());
    }
    let missing = group
        .iter()
        .filter(|(_, set)| !*set)
        .map(|(name, _)| (*name).to_string())
        .collect();
    Err(ValidationError::RequiredTogether {
        group: flag_names(group),
        missing,
    })
}

/// Trimmed UUID, with `kind` naming the input in errors.
pub fn parse_uuid(kind: &str, value: &str) -> Result<Uuid, ValidationError> {
    let value = value.trim();
    require_non_empty(kind, value)?;
    Uuid::parse_str(value).map_err(|e| ValidationError::parse(kind, value, e))
}

pub fn at_least(field: &str, minimum: i64, value: i64) -> Result<(), ValidationError> {
    if value < minimum {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            constraint: format!("at least {minimum}"),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// RFC 3339, or whole seconds since the Unix epoch.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    require_non_empty(field, value)?;
    if let Ok(seconds) = value.parse::<i64>() {
        return Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| ValidationError::parse(field, value, "timestamp out of range"));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ValidationError::parse(field, value, e))
}

/// Split comma-separated list flags, dropping blanks.
pub fn split_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_uri_requires_tag() {
        assert!(validate_image_uri("public.ecr.aws/x:latest").is_ok());
        assert!(validate_image_uri("localhost:5000/repo:1.0").is_ok());
        assert!(validate_image_uri("repo@sha256:abcd").is_ok());
        assert_eq!(
            validate_image_uri("localhost:5000/repo").unwrap_err(),
            ValidationError::UntaggedImage("localhost:5000/repo".into())
        );
        assert!(validate_image_uri("repo:").is_err());
    }

    #[test]
    fn test_allowable_failure_percent_bounds() {
        assert_eq!(allowable_failure_percent(0).unwrap(), 0);
        assert_eq!(allowable_failure_percent(100).unwrap(), 100);
        let err = allowable_failure_percent(101).unwrap_err();
        assert!(err
            .to_string()
            .contains("allowable failure percent must be between 0 and 100"));
        assert!(allowable_failure_percent(-1).is_err());
    }

    #[test]
    fn test_exclusive_reports_group_and_set() {
        let err = exclusive(&[
            ("parameter-name", true),
            ("grid-search-config", true),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("if any flags in the group [parameter-name grid-search-config]"));
        assert!(exclusive(&[("a", true), ("b", false)]).is_ok());
    }

    #[test]
    fn test_required_together() {
        assert!(required_together(&[("log-name", false), ("log-location", false)]).is_ok());
        let err = required_together(&[("log-name", true), ("log-location", false)]).unwrap_err();
        assert!(err.to_string().contains("missing [log-location]"));
    }

    #[test]
    fn test_parse_uuid_messages() {
        assert_eq!(
            parse_uuid("batch ID", " ").unwrap_err(),
            ValidationError::Empty("batch ID".into())
        );
        assert!(parse_uuid("batch ID", "nope")
            .unwrap_err()
            .to_string()
            .starts_with("failed to parse batch ID"));
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let unix = parse_timestamp("start timestamp", "1700000000").unwrap();
        let rfc = parse_timestamp("start timestamp", "2023-11-14T22:13:20Z").unwrap();
        assert_eq!(unix, rfc);
        assert!(parse_timestamp("start timestamp", "yesterday").is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(&["a,b", " c ", ""]), vec!["a", "b", "c"]);
    }
}
