//! Parameter maps for batches and workflow runs, and sweep grids.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

/// Separator between a parameter name and its value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSeparator {
    /// `name:value`, used by batches, suite runs and sweeps.
    Colon,
    /// `name=value`, used by workflow runs.
    Equals,
}

impl ParameterSeparator {
    pub const fn as_char(self) -> char {
        match self {
            Self::Colon => ':',
            Self::Equals => '=',
        }
    }
}

/// String parameters passed through to a batch. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap(BTreeMap<String, String>);

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name<sep>value` pairs. The value may itself contain the
    /// separator; only the first occurrence splits.
    pub fn parse<I, S>(raw: I, separator: ParameterSeparator) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for entry in raw {
            let entry = entry.as_ref();
            let Some((name, value)) = entry.split_once(separator.as_char()) else {
                return Err(ValidationError::invalid(
                    format!("parameter (expected name{}value)", separator.as_char()),
                    entry,
                ));
            };
            map.insert(name.trim(), value)?;
        }
        Ok(map)
    }

    /// Add one entry. Empty and repeated names are rejected.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::empty("parameter name"));
        }
        if self.0.contains_key(name) {
            return Err(ValidationError::DuplicateParameter(name.to_string()));
        }
        self.0.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Value for `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One axis of a parameter sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepParameter {
    pub name: String,
    pub values: Vec<String>,
}

/// A grid of sweep axes. The sweep runs one batch per point of the
/// Cartesian product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GridSearch(Vec<SweepParameter>);

impl GridSearch {
    /// Build a grid from already-parsed axes. Names must be non-empty and
    /// unique; each axis needs at least one value and may not repeat one.
    pub fn new(parameters: Vec<SweepParameter>) -> Result<Self, ValidationError> {
        if parameters.is_empty() {
            return Err(ValidationError::empty("grid search configuration"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for parameter in &parameters {
            if parameter.name.trim().is_empty() {
                return Err(ValidationError::empty("sweep parameter name"));
            }
            if parameter.values.is_empty() {
                return Err(ValidationError::empty(format!(
                    "values for sweep parameter {}",
                    parameter.name
                )));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(ValidationError::DuplicateParameter(parameter.name.clone()));
            }
            let mut values = std::collections::BTreeSet::new();
            if let Some(value) = parameter.values.iter().find(|v| !values.insert(v.as_str())) {
                return Err(ValidationError::DuplicateValue {
                    parameter: parameter.name.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(Self(parameters))
    }

    /// Single-axis sweep from `--parameter-name` and `--parameter-values`.
    pub fn single(name: &str, values: Vec<String>) -> Result<Self, ValidationError> {
        Self::new(vec![SweepParameter {
            name: name.to_string(),
            values,
        }])
    }

    /// Parse the JSON grid configuration format: a list of
    /// `{"name": ..., "values": [...]}` objects.
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        let parameters: Vec<SweepParameter> = serde_json::from_str(text)
            .map_err(|e| ValidationError::parse("grid search configuration", "<json>", e))?;
        Self::new(parameters)
    }

    /// Read a grid configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn parameters(&self) -> &[SweepParameter] {
        &self.0
    }

    /// Number of points in the grid, saturating on overflow.
    pub fn combination_count(&self) -> usize {
        self.0
            .iter()
            .fold(1usize, |acc, p| acc.saturating_mul(p.values.len()))
    }

    /// Every grid point as a parameter map, in row-major order with the
    /// last axis varying fastest.
    pub fn combinations(&self) -> Vec<ParameterMap> {
        let mut points = vec![BTreeMap::new()];
        for parameter in &self.0 {
            let mut next = Vec::with_capacity(points.len() * parameter.values.len());
            for point in &points {
                for value in &parameter.values {
                    let mut extended: BTreeMap<String, String> = point.clone();
                    extended.insert(parameter.name.clone(), value.clone());
                    next.push(extended);
                }
            }
            points = next;
        }
        points.into_iter().map(ParameterMap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_parameters() {
        let map = ParameterMap::parse(["a:1", "url:http://x:8080"], ParameterSeparator::Colon)
            .unwrap();
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get("url"), Some("http://x:8080"));
    }

    #[test]
    fn test_parse_equals_parameters() {
        let map = ParameterMap::parse(["speed=fast"], ParameterSeparator::Equals).unwrap();
        assert_eq!(map.get("speed"), Some("fast"));
        assert!(ParameterMap::parse(["speed:fast"], ParameterSeparator::Equals).is_err());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = ParameterMap::parse(["a:1", "a:2"], ParameterSeparator::Colon).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateParameter("a".into()));
    }

    #[test]
    fn test_grid_rejects_empty_values() {
        let err = GridSearch::from_json(r#"[{"name": "speed", "values": []}]"#).unwrap_err();
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn test_grid_rejects_repeated_axis_value() {
        let err = GridSearch::from_json(r#"[{"name": "speed", "values": ["1", "2", "1"]}]"#)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateValue {
                parameter: "speed".into(),
                value: "1".into(),
            }
        );
        assert!(GridSearch::single("speed", vec!["a".into(), "a".into()]).is_err());
    }

    #[test]
    fn test_grid_combinations() {
        let grid = GridSearch::from_json(
            r#"[{"name": "a", "values": ["1", "2"]}, {"name": "b", "values": ["x", "y", "z"]}]"#,
        )
        .unwrap();
        assert_eq!(grid.combination_count(), 6);
        let points = grid.combinations();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].get("a"), Some("1"));
        assert_eq!(points[0].get("b"), Some("x"));
        assert_eq!(points[5].get("a"), Some("2"));
        assert_eq!(points[5].get("b"), Some("z"));
    }
}
