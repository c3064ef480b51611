//! Filter compilation for row-store reads
//!
//! Filters are evaluated inside SQLite against the stored JSON documents so a
//! dashboard read only materializes matching rows. The compiled predicates
//! mirror [`Filter::matches`]: a missing or null field never matches,
//! `eq`/`neq` accept a text or a numeric match, ordering operators need a
//! numeric value on both sides and `contains`/`startsWith` use `LIKE`, which
//! folds ASCII case only.
//!
//! Every value, including the JSON path, is bound as a parameter.

use dashsync_core::RowQuery;
use dashsync_domain::{Filter, FilterOperator};
use rusqlite::types::Value;

/// A `WHERE` clause under construction with its numbered parameters.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Clause scoped to one logical table with the query's filters applied.
    pub(crate) fn for_query(query: &RowQuery) -> Self {
        let mut clause = Self::new();
        let source = clause.bind(query.source_id.clone());
        let table = clause.bind(query.table_name.clone());
        clause.push(format!("source_id = {source} AND table_name = {table}"));
        for filter in &query.filters {
            clause.and_filter(filter);
        }
        clause
    }

    /// Bind a parameter and return its placeholder.
    pub(crate) fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    pub(crate) fn push(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// AND one filter into the clause. Invalid filters are skipped.
    pub(crate) fn and_filter(&mut self, filter: &Filter) {
        if !filter.is_valid() {
            return;
        }
        // Field names that cannot be written as a quoted JSON path match
        // nothing rather than widening the result.
        if filter.field.chars().any(|c| c == '"' || c.is_control()) {
            self.push("0");
            return;
        }

        let path = self.bind(format!("$.\"{}\"", filter.field));
        let exists = format!("COALESCE(json_type(data, {path}), 'null') <> 'null'");
        let text = format!(
            "(CASE json_type(data, {path}) \
             WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
             ELSE CAST(json_extract(data, {path}) AS TEXT) END)"
        );
        let number = format!(
            "(CASE WHEN json_type(data, {path}) IN ('integer', 'real', 'text') \
             THEN dash_number(json_extract(data, {path})) END)"
        );
        let target = filter.numeric_value();

        let comparison = match filter.operator {
            FilterOperator::Eq => {
                let value = self.bind(filter.value.clone());
                match target {
                    Some(t) => {
                        let t = self.bind(t);
                        format!("({text} = {value} OR abs({number} - {t}) < 1e-9)")
                    }
                    None => format!("{text} = {value}"),
                }
            }
            FilterOperator::Neq => {
                let value = self.bind(filter.value.clone());
                match target {
                    Some(t) => {
                        let t = self.bind(t);
                        format!("({text} <> {value} OR abs({number} - {t}) >= 1e-9)")
                    }
                    None => format!("{text} <> {value}"),
                }
            }
            FilterOperator::Gt => self.ordering(&number, ">", target),
            FilterOperator::Gte => self.ordering(&number, ">=", target),
            FilterOperator::Lt => self.ordering(&number, "<", target),
            FilterOperator::Lte => self.ordering(&number, "<=", target),
            FilterOperator::Contains => {
                let pattern = self.bind(format!("%{}%", escape_like(&filter.value)));
                format!("{text} LIKE {pattern} ESCAPE '\\'")
            }
            FilterOperator::StartsWith => {
                let pattern = self.bind(format!("{}%", escape_like(&filter.value)));
                format!("{text} LIKE {pattern} ESCAPE '\\'")
            }
        };

        self.push(format!("({exists} AND {comparison})"));
    }

    fn ordering(&mut self, number: &str, op: &str, target: Option<f64>) -> String {
        match target {
            Some(t) => {
                let t = self.bind(t);
                format!("{number} {op} {t}")
            }
            None => "0".to_string(),
        }
    }

    pub(crate) fn sql(&self) -> String {
        if self.conditions.is_empty() {
            "1".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
