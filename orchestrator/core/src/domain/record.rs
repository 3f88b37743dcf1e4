// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Generic records stored by the entity store.
//!
//! A record is a JSON object with a string `id` and the `createdAt` /
//! `updatedAt` timestamps; every other field belongs to the collection's own
//! shape. Shape validation happens in the domain services, not here.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A stored JSON document
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Well-known collection names
pub mod collections {
    pub const AGENTS: &str = "agents";
    pub const SYSTEMS: &str = "systems";
    pub const EXECUTIONS: &str = "executions";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filter and ordering options for `EntityStore::list`
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Top-level field equality filters, AND-combined
    pub filters: BTreeMap<String, Value>,
    pub sort_by: Option<String>,
    pub sort_direction: SortDirection,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = Some(field.into());
        self.sort_direction = direction;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }

    /// Sort records in place
    ///
    /// Records missing the sort field (or holding `null`) always go last,
    /// whatever the direction; ties fall back to id ascending.
    pub fn sort(&self, records: &mut [Record]) {
        let Some(field) = self.sort_by.as_deref() else {
            records.sort_by(|a, b| record_id(a).cmp(&record_id(b)));
            return;
        };

        records.sort_by(|a, b| {
            let left = a.get(field).filter(|v| !v.is_null());
            let right = b.get(field).filter(|v| !v.is_null());
            let primary = match (left, right) {
                (Some(l), Some(r)) => {
                    let ord = compare_values(l, r);
                    match self.sort_direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            primary.then_with(|| record_id(a).cmp(&record_id(b)))
        });
    }
}

pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

/// Total order over JSON values used for sorting
///
/// Timestamps compare chronologically, numbers numerically, strings
/// lexically. Values of different kinds are ordered by kind.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::String(l), Value::String(r)) => match (parse_timestamp(l), parse_timestamp(r)) {
            (Some(lt), Some(rt)) => lt.cmp(&rt),
            _ => l.cmp(r),
        },
        (Value::Number(l), Value::Number(r)) => {
            let l = l.as_f64().unwrap_or(f64::NAN);
            let r = r.as_f64().unwrap_or(f64::NAN);
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Next `updatedAt` value: now, or one microsecond past the previous stamp
/// when the clock has not advanced (or went backwards)
pub fn next_timestamp(previous: Option<&Value>) -> DateTime<Utc> {
    // Stamps are stored at microsecond precision, so compare at that precision
    let now = Utc::now().trunc_subsecs(6);
    match previous.and_then(Value::as_str).and_then(parse_timestamp) {
        Some(prev) if now <= prev => prev.trunc_subsecs(6) + Duration::microseconds(1),
        _ => now,
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those of `target`
///
/// `id` and `createdAt` are immutable and silently skipped.
pub fn merge_patch(target: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filters_are_and_combined() {
        let query = ListQuery::new().filter("status", "active").filter("owner", "u1");
        assert!(query.matches(&rec(json!({"id": "a", "status": "active", "owner": "u1"}))));
        assert!(!query.matches(&rec(json!({"id": "b", "status": "active", "owner": "u2"}))));
        assert!(!query.matches(&rec(json!({"id": "c", "status": "active"}))));
    }

    #[test]
    fn test_sort_desc_puts_missing_last() {
        let query = ListQuery::new().sort_by("rank", SortDirection::Desc);
        let mut records = vec![
            rec(json!({"id": "a", "rank": 1})),
            rec(json!({"id": "b"})),
            rec(json!({"id": "c", "rank": 3})),
            rec(json!({"id": "d", "rank": null})),
        ];
        query.sort(&mut records);
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        // Lexical order would put "…:01Z" after "…:01.5Z".
        let earlier = json!("2026-01-01T00:00:01Z");
        let later = json!("2026-01-01T00:00:01.5Z");
        assert_eq!(compare_values(&earlier, &later), Ordering::Less);
    }

    #[test]
    fn test_next_timestamp_strictly_increases() {
        let future = Utc::now() + Duration::seconds(60);
        let prev = json!(format_timestamp(future));
        let next = next_timestamp(Some(&prev));
        assert!(next > future);
    }

    #[test]
    fn test_merge_patch_keeps_identity() {
        let mut target = rec(json!({"id": "a", "createdAt": "t0", "name": "old"}));
        merge_patch(
            &mut target,
            rec(json!({"id": "evil", "createdAt": "t9", "name": "new", "extra": 1})),
        );
        assert_eq!(target["id"], "a");
        assert_eq!(target["createdAt"], "t0");
        assert_eq!(target["name"], "new");
        assert_eq!(target["extra"], 1);
    }
}
