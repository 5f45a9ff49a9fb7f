//! The `filter` blocks of plural data sources.
//!
//! Filters run after every page of results has been fetched and narrow the
//! list client-side. An item survives only if it matches every filter.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::state::lookup_path;

/// One `filter { name, values, regex }` block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Filter {
    /// Dotted path of the property to test, e.g. `freeform_tags.Department`.
    pub name: String,
    /// Accepted values; any one may match.
    pub values: Vec<String>,
    /// Treat `values` as regular expressions.
    #[serde(default)]
    pub regex: bool,
}

impl Filter {
    /// An exact-match filter.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            regex: false,
        }
    }

    /// Match `values` as regular expressions.
    pub fn with_regex(mut self) -> Self {
        self.regex = true;
        self
    }

    /// Parse the `filter` attribute of a data source configuration.
    pub fn from_config(config: &Value) -> Result<Vec<Self>, ProviderError> {
        Self::from_value(config.get("filter"))
    }

    /// Parse the value of a `filter` attribute; absent means no filters.
    pub fn from_value(value: Option<&Value>) -> Result<Vec<Self>, ProviderError> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ProviderError::Validation(format!("invalid filter block: {}", e))),
        }
    }
}

enum Matcher<'a> {
    Exact(&'a [String]),
    Patterns(Vec<Regex>),
}

impl Matcher<'_> {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(values) => values.iter().any(|v| v == candidate),
            Self::Patterns(patterns) => patterns.iter().any(|re| re.is_match(candidate)),
        }
    }
}

fn compile(filter: &Filter) -> Result<(&str, Matcher<'_>), ProviderError> {
    let matcher = if filter.regex {
        let patterns = filter
            .values
            .iter()
            .map(|v| {
                Regex::new(v).map_err(|e| {
                    ProviderError::Validation(format!(
                        "filter '{}': invalid regular expression '{}': {}",
                        filter.name, v, e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Matcher::Patterns(patterns)
    } else {
        Matcher::Exact(&filter.values)
    };
    Ok((filter.name.as_str(), matcher))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn item_matches(item: &Value, path: &str, matcher: &Matcher<'_>) -> bool {
    match lookup_path(item, path) {
        Some(Value::Array(elements)) => elements
            .iter()
            .filter_map(scalar_string)
            .any(|s| matcher.matches(&s)),
        Some(value) => scalar_string(value).is_some_and(|s| matcher.matches(&s)),
        None => false,
    }
}

/// Keep the items that match every filter.
pub fn apply_filters(filters: &[Filter], items: Vec<Value>) -> Result<Vec<Value>, ProviderError> {
    if filters.is_empty() {
        return Ok(items);
    }
    let compiled = filters.iter().map(compile).collect::<Result<Vec<_>, _>>()?;
    Ok(items
        .into_iter()
        .filter(|item| {
            compiled
                .iter()
                .all(|(path, matcher)| item_matches(item, path, matcher))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn db_homes() -> Vec<Value> {
        vec![
            json!({
                "id": "ocid1.dbhome.oc1..one",
                "display_name": "-tf-db-home",
                "db_version": "12.1.0.2",
                "state": "AVAILABLE",
                "freeform_tags": {"Department": "Finance"},
                "fault_domains": ["FAULT-DOMAIN-1", "FAULT-DOMAIN-2"],
                "cpu_core_count": 2,
            }),
            json!({
                "id": "ocid1.dbhome.oc1..two",
                "display_name": "reporting",
                "db_version": "18.0.0.0",
                "state": "TERMINATED",
                "freeform_tags": {"Department": "Accounting"},
                "fault_domains": ["FAULT-DOMAIN-3"],
                "cpu_core_count": 4,
            }),
        ]
    }

    fn ids(items: &[Value]) -> Vec<&str> {
        items.iter().filter_map(|i| i["id"].as_str()).collect()
    }

    #[rstest]
    #[case(Filter::new("display_name", ["-tf-db-home"]), vec!["ocid1.dbhome.oc1..one"])]
    #[case(Filter::new("state", ["AVAILABLE", "TERMINATED"]), vec!["ocid1.dbhome.oc1..one", "ocid1.dbhome.oc1..two"])]
    #[case(Filter::new("db_version", ["^18\\..*"]).with_regex(), vec!["ocid1.dbhome.oc1..two"])]
    #[case(Filter::new("freeform_tags.Department", ["Finance"]), vec!["ocid1.dbhome.oc1..one"])]
    #[case(Filter::new("fault_domains", ["FAULT-DOMAIN-2"]), vec!["ocid1.dbhome.oc1..one"])]
    #[case(Filter::new("cpu_core_count", ["4"]), vec!["ocid1.dbhome.oc1..two"])]
    #[case(Filter::new("missing", ["x"]), vec![])]
    fn test_single_filter(#[case] filter: Filter, #[case] expected: Vec<&str>) {
        let result = apply_filters(&[filter], db_homes()).unwrap();
        assert_eq!(ids(&result), expected);
    }

    #[test]
    fn test_filters_are_anded() {
        let filters = vec![
            Filter::new("state", ["AVAILABLE", "TERMINATED"]),
            Filter::new("display_name", ["report.*"]).with_regex(),
        ];
        let result = apply_filters(&filters, db_homes()).unwrap();
        assert_eq!(ids(&result), vec!["ocid1.dbhome.oc1..two"]);
    }

    #[test]
    fn test_exact_match_is_not_substring() {
        let result = apply_filters(&[Filter::new("display_name", ["tf"])], db_homes()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_invalid_regex_is_validation_error() {
        let err = apply_filters(&[Filter::new("display_name", ["(["]).with_regex()], db_homes())
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_from_config() {
        let config = json!({
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "filter": [{"name": "display_name", "values": ["-tf-db-home"]}],
        });
        let filters = Filter::from_config(&config).unwrap();
        assert_eq!(filters, vec![Filter::new("display_name", ["-tf-db-home"])]);
        assert!(Filter::from_config(&json!({})).unwrap().is_empty());
        assert!(Filter::from_config(&json!({"filter": [{"name": 1}]})).is_err());
    }
}
