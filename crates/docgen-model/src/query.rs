//! Data queries that feed a template, with light SOQL inspection.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

const DEFAULT_QUERY: &str = "default";

static SELECT_FIELDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^SELECT\s+(.*?)\s+FROM\s").expect("Invalid SELECT regex"));
static FROM_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+([\w.]+)").expect("Invalid FROM regex"));
static WHERE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bWHERE\s+(.*?)(?:\s+GROUP BY|\s+ORDER BY|\s+LIMIT|\s+OFFSET|\s*$)")
        .expect("Invalid WHERE regex")
});
static ORDER_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bORDER BY\s+(.*?)(?:\s+LIMIT|\s+OFFSET|\s*$)").expect("Invalid ORDER BY regex")
});
static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").expect("Invalid LIMIT regex"));
static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([\w.]+)\s*(NOT\s+IN|INCLUDES|EXCLUDES|LIKE|IN|[=!<>]+)\s*(.+)$")
        .expect("Invalid condition regex")
});
static SORT_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:ASC|DESC)$").expect("Invalid sort direction regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    Soql,
    Sosl,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCondition {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query_type: QueryType,
    pub object: Option<String>,
    pub fields: Vec<String>,
    pub conditions: Vec<QueryCondition>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub is_count: bool,
}

impl QueryMetadata {
    /// Extracts metadata from a SOQL query. SOSL is recognised but not inspected.
    pub fn parse(query: &str) -> Self {
        let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let upper = query.to_uppercase();
        let mut metadata = Self {
            query_type: QueryType::Unknown,
            object: None,
            fields: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            is_count: false,
        };
        if upper.starts_with("FIND") {
            metadata.query_type = QueryType::Sosl;
            return metadata;
        }
        if !upper.starts_with("SELECT") {
            return metadata;
        }
        metadata.query_type = QueryType::Soql;
        if let Some(fields) = SELECT_FIELDS.captures(&query).and_then(|c| c.get(1)) {
            metadata.fields = split_list(fields.as_str());
        }
        metadata.object = FROM_OBJECT
            .captures(&query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        metadata.is_count = upper.contains("COUNT()") || upper.contains("COUNT_DISTINCT(");
        if let Some(clause) = WHERE_CLAUSE.captures(&query).and_then(|c| c.get(1)) {
            metadata.conditions = split_conditions(clause.as_str())
                .iter()
                .filter_map(|part| parse_condition(part))
                .collect();
        }
        if let Some(clause) = ORDER_CLAUSE.captures(&query).and_then(|c| c.get(1)) {
            metadata.order_by = split_list(clause.as_str());
        }
        metadata.limit = LIMIT_CLAUSE
            .captures(&query)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        metadata
    }
}

/// Named data queries. A single unnamed query is stored as `default`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCatalog {
    queries: BTreeMap<String, String>,
}

impl QueryCatalog {
    pub fn from_path(path: &Path) -> Result<Self, QueryError> {
        let content = fs::read_to_string(path).map_err(|source| QueryError::io(path, source))?;
        Self::from_text(&content)
    }

    /// Parses a JSON object of named queries, falling back to raw query text.
    pub fn from_text(content: &str) -> Result<Self, QueryError> {
        match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => Self::from_value(&value),
            Ok(Value::String(query)) => Ok(Self::single(query)),
            Ok(_) => Err(QueryError::UnsupportedShape),
            Err(_) => Ok(Self::single(content.trim().to_string())),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(entries) = value else {
            return Err(QueryError::UnsupportedShape);
        };
        let mut queries = BTreeMap::new();
        for (name, query) in entries {
            let Value::String(query) = query else {
                return Err(QueryError::NotAString { name: name.clone() });
            };
            queries.insert(name.clone(), query.clone());
        }
        Ok(Self { queries })
    }

    pub fn single(query: impl Into<String>) -> Self {
        let mut queries = BTreeMap::new();
        queries.insert(DEFAULT_QUERY.to_string(), query.into());
        Self { queries }
    }

    /// Looks up a query; `default` resolves to the only query when there is one.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == DEFAULT_QUERY && self.queries.len() == 1 {
            return self.queries.values().next().map(String::as_str);
        }
        self.queries.get(name).map(String::as_str)
    }

    pub fn default_query(&self) -> Option<&str> {
        self.get(DEFAULT_QUERY)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Sorted field names selected, filtered on, or ordered by in a query.
    pub fn referenced_fields(&self, name: &str) -> Vec<String> {
        let Some(query) = self.get(name) else {
            return Vec::new();
        };
        let metadata = QueryMetadata::parse(query);
        let mut fields: BTreeSet<String> = metadata.fields.into_iter().collect();
        for condition in metadata.conditions {
            if let Some(last) = condition.field.rsplit('.').next() {
                fields.insert(last.to_string());
            }
        }
        for order in metadata.order_by {
            fields.insert(SORT_DIRECTION.replace(&order, "").trim().to_string());
        }
        fields.into_iter().filter(|field| !field.is_empty()).collect()
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|item| item.trim().to_string()).collect()
}

/// Splits a WHERE clause on top-level AND/OR, ignoring quoted text.
fn split_conditions(clause: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let words: Vec<&str> = clause.split(' ').collect();
    for word in words {
        if quote.is_none() && (word.eq_ignore_ascii_case("AND") || word.eq_ignore_ascii_case("OR")) {
            parts.push(std::mem::take(&mut current));
            continue;
        }
        for ch in word.chars() {
            match quote {
                Some(open) if ch == open => quote = None,
                None if ch == '\'' || ch == '"' => quote = Some(ch),
                _ => {}
            }
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_condition(part: &str) -> Option<QueryCondition> {
    let captures = CONDITION.captures(part)?;
    Some(QueryCondition {
        field: captures[1].trim().to_string(),
        operator: captures[2].split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase(),
        value: captures[3].trim().to_string(),
    })
}
