//! Rule records and compiled rules.
//!
//! A rule table is a JSON array in the LDRFullFeed layout published by
//! wedata. Each entry is deserialized into a [`RuleRecord`] and then compiled
//! into a [`Rule`], which owns the compiled URL pattern. A `Rule` cannot
//! exist without a compiled pattern.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QueryError;
use crate::xpath::Query;

/// One rule entry as it appears in the rule resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleRecord {
    /// wedata item URL.
    #[serde(deserialize_with = "null_as_default")]
    pub resource_url: String,

    /// Human readable rule name, used in diagnostics.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,

    /// Author of the rule.
    #[serde(deserialize_with = "null_as_default")]
    pub created_by: String,

    /// wedata database the item belongs to.
    #[serde(deserialize_with = "null_as_default")]
    pub database_resource_url: String,

    /// Last modification time.
    pub updated_at: Option<DateTime<FixedOffset>>,

    /// Creation time.
    pub created_at: Option<DateTime<FixedOffset>>,

    /// The recipe itself.
    #[serde(deserialize_with = "null_as_default")]
    pub data: RuleData,
}

/// The `data` object of a rule record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleData {
    /// Regular expression matched against page URLs.
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,

    /// Rule category (`IND`, `INDIVIDUAL`, `SUBGENERAL`, ...).
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,

    /// Page encoding hint.
    #[serde(deserialize_with = "null_as_default")]
    pub enc: String,

    /// XPath expression locating the body.
    #[serde(deserialize_with = "null_as_default")]
    pub xpath: String,

    /// Base URL hint.
    #[serde(deserialize_with = "null_as_default")]
    pub base: String,

    /// Microformats hint.
    #[serde(deserialize_with = "null_as_default")]
    pub microformats: String,
}

/// Reads a JSON `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why a record did not become a [`Rule`].
#[derive(Debug, thiserror::Error)]
pub enum RuleRejection {
    /// `data.url` is missing or empty.
    #[error("no url pattern")]
    MissingPattern,

    /// `data.xpath` is missing or empty.
    #[error("no xpath expression")]
    MissingQuery,

    /// `data.url` is not a valid regular expression.
    #[error("illegal url pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A compiled extraction rule.
///
/// Immutable once built. The XPath expression is compiled on first use and
/// the outcome is kept for later extractions.
#[derive(Debug, Clone)]
pub struct Rule {
    record: RuleRecord,
    pattern: Regex,
    query: OnceLock<Result<Query, QueryError>>,
}

impl Rule {
    /// Compiles a record's URL pattern.
    pub fn compile(record: RuleRecord) -> Result<Self, RuleRejection> {
        if record.data.url.is_empty() {
            return Err(RuleRejection::MissingPattern);
        }
        if record.data.xpath.trim().is_empty() {
            return Err(RuleRejection::MissingQuery);
        }
        let pattern = Regex::new(&record.data.url)?;
        Ok(Self {
            record,
            pattern,
            query: OnceLock::new(),
        })
    }

    /// The record this rule was compiled from.
    #[must_use]
    pub fn record(&self) -> &RuleRecord {
        &self.record
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Regular expression source of the URL pattern.
    #[must_use]
    pub fn url_pattern(&self) -> &str {
        &self.record.data.url
    }

    /// XPath source of the body query.
    #[must_use]
    pub fn query_expression(&self) -> &str {
        &self.record.data.xpath
    }

    /// Compiled URL pattern.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Whether the pattern occurs anywhere in `url`.
    ///
    /// Matching is unanchored: `example\.com` matches
    /// `http://www.example.com/a`. Patterns anchor themselves with `^`.
    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Compiled body query.
    pub fn query(&self) -> Result<&Query, QueryError> {
        self.query
            .get_or_init(|| Query::compile(self.query_expression()))
            .as_ref()
            .map_err(QueryError::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, xpath: &str) -> RuleRecord {
        RuleRecord {
            name: "test".to_string(),
            data: RuleData {
                url: url.to_string(),
                xpath: xpath.to_string(),
                ..RuleData::default()
            },
            ..RuleRecord::default()
        }
    }

    #[test]
    fn compile_rejects_unbalanced_group() {
        let result = Rule::compile(record("^http://(example", "//div"));
        assert!(matches!(result, Err(RuleRejection::InvalidPattern(_))));
    }

    #[test]
    fn compile_rejects_empty_fields() {
        assert!(matches!(
            Rule::compile(record("", "//div")),
            Err(RuleRejection::MissingPattern)
        ));
        assert!(matches!(
            Rule::compile(record("example", "  ")),
            Err(RuleRejection::MissingQuery)
        ));
    }

    #[test]
    fn pattern_matches_anywhere_in_url() {
        let rule = Rule::compile(record(r"example\.com/news", "//div")).expect("valid rule");
        assert!(rule.is_match("http://www.example.com/news/1"));
        assert!(!rule.is_match("http://www.example.com/blog/1"));
    }

    #[test]
    fn anchored_pattern_only_matches_prefix() {
        let rule = Rule::compile(record(r"^http://example\.com", "//div")).expect("valid rule");
        assert!(rule.is_match("http://example.com/a"));
        assert!(!rule.is_match("https://mirror.test/?u=http://example.com/a"));
    }

    #[test]
    fn query_failure_is_remembered() {
        let rule = Rule::compile(record("example", "//div[")).expect("valid rule");
        let first = rule.query().map(|_| ()).unwrap_err();
        let second = rule.query().map(|_| ()).unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(first, QueryError::InvalidExpression { .. }));
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let json = r#"{"name": "partial", "data": {"url": "x", "xpath": "//p"}}"#;
        let record: RuleRecord = serde_json::from_str(json).expect("valid record");
        assert_eq!(record.name, "partial");
        assert!(record.created_at.is_none());
        assert_eq!(record.data.enc, "");
        assert_eq!(record.data.kind, "");
    }

    #[test]
    fn null_fields_deserialize_as_empty() {
        let json = r#"{"name": null, "resource_url": null, "updated_at": null,
            "data": {"url": "x", "xpath": "//p", "type": null, "microformats": null}}"#;
        let record: RuleRecord = serde_json::from_str(json).expect("nulls are tolerated");
        assert_eq!(record.name, "");
        assert_eq!(record.resource_url, "");
        assert!(record.updated_at.is_none());
        assert_eq!(record.data.kind, "");
        assert_eq!(record.data.url, "x");

        let record: RuleRecord =
            serde_json::from_str(r#"{"name": "empty", "data": null}"#).expect("null data");
        assert_eq!(record.data, RuleData::default());
    }
}
