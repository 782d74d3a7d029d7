//! In-memory relational store that understands the same [`Query`] shape the
//! REST store renders: equality and or-filters, ordering, and embedded joins.

use crate::backend::{Filter, Join, Order, Query, RelationalStore};
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

/// 2024-01-01 00:00:00 UTC; every stored row ticks one second past the last.
const EPOCH: i64 = 1_704_067_200;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    clock: i64,
    inserts: HashMap<String, usize>,
    failing: HashSet<String>,
    failing_deletes: bool,
}

impl Tables {
    fn stamp(&mut self, mut row: Value) -> Value {
        self.clock += 1;
        let created_at = DateTime::<Utc>::from_timestamp(EPOCH + self.clock, 0)
            .unwrap_or_default()
            .to_rfc3339();
        if let Value::Object(map) = &mut row {
            map.entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            map.entry("created_at")
                .or_insert_with(|| Value::String(created_at));
        }
        row
    }

    fn check(&self, table: &str) -> MarketResult<()> {
        if self.failing.contains(table) {
            return Err(MarketError::Store(format!("{} unavailable", table)));
        }
        Ok(())
    }

    fn evaluate(&self, query: &Query) -> Vec<Value> {
        let mut rows: Vec<Value> = self
            .rows
            .get(query.table_name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters().iter().all(|filter| keep(row, filter)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.ordering() {
            sort_rows(&mut rows, order);
        }

        for row in &mut rows {
            for join in query.joins() {
                self.embed(row, join);
            }
        }
        rows
    }

    fn embed(&self, row: &mut Value, join: &Join) {
        let value = match join {
            Join::One {
                table,
                column,
                nested,
                ..
            } => {
                let key = row[column.as_str()].clone();
                self.rows
                    .get(table)
                    .and_then(|rows| rows.iter().find(|child| child["id"] == key))
                    .cloned()
                    .map(|mut child| {
                        for join in nested {
                            self.embed(&mut child, join);
                        }
                        child
                    })
                    .unwrap_or(Value::Null)
            }
            Join::Many {
                table,
                column,
                nested,
                order,
                ..
            } => {
                let key = row["id"].clone();
                let mut children: Vec<Value> = self
                    .rows
                    .get(table)
                    .map(|rows| {
                        rows.iter()
                            .filter(|child| child[column.as_str()] == key)
                            .cloned()
                            .map(|mut child| {
                                for join in nested {
                                    self.embed(&mut child, join);
                                }
                                child
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(order) = order {
                    sort_rows(&mut children, order);
                }
                Value::Array(children)
            }
        };
        if let Value::Object(map) = row {
            map.insert(join.alias().to_string(), value);
        }
    }
}

fn matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

fn keep(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => matches(&row[column.as_str()], value),
        Filter::AnyOf(pairs) => pairs
            .iter()
            .any(|(column, value)| matches(&row[column.as_str()], value)),
    }
}

fn sort_rows(rows: &mut [Value], order: &Order) {
    rows.sort_by(|a, b| {
        let ordering = compare(&a[order.column.as_str()], &b[order.column.as_str()]);
        if order.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row without counting it as an insert.
    pub async fn seed(&self, table: &str, row: Value) -> Value {
        let mut tables = self.inner.lock().await;
        let row = tables.stamp(row);
        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .lock()
            .await
            .rows
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Inserts through [`RelationalStore::insert`] so far.
    pub async fn insert_count(&self, table: &str) -> usize {
        self.inner
            .lock()
            .await
            .inserts
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    /// Every read and insert on `table` fails until [`Self::restore_table`].
    pub async fn fail_table(&self, table: &str) {
        self.inner.lock().await.failing.insert(table.to_string());
    }

    pub async fn restore_table(&self, table: &str) {
        self.inner.lock().await.failing.remove(table);
    }

    pub async fn fail_deletes(&self) {
        self.inner.lock().await.failing_deletes = true;
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn select(&self, query: &Query) -> MarketResult<Vec<Value>> {
        let tables = self.inner.lock().await;
        tables.check(query.table_name())?;
        Ok(tables.evaluate(query))
    }

    async fn select_one(&self, query: &Query) -> MarketResult<Value> {
        let tables = self.inner.lock().await;
        tables.check(query.table_name())?;
        tables
            .evaluate(query)
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::NotFound(format!("no matching row in {}", query.table_name())))
    }

    async fn insert(&self, table: &str, row: Value) -> MarketResult<Value> {
        let mut tables = self.inner.lock().await;
        tables.check(table)?;
        *tables.inserts.entry(table.to_string()).or_default() += 1;
        let row = tables.stamp(row);
        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn delete(&self, table: &str, column: &str, value: &str) -> MarketResult<()> {
        let mut tables = self.inner.lock().await;
        if tables.failing_deletes {
            return Err(MarketError::Store(format!("delete on {} rejected", table)));
        }
        if let Some(rows) = tables.rows.get_mut(table) {
            rows.retain(|row| !matches(&row[column], value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_applies_filters_order_and_joins() {
        let store = MemoryStore::new();
        store.seed("profiles", json!({"id": "u-1", "email": "a@uni.edu"})).await;
        store
            .seed("listings", json!({"id": "l-1", "seller_id": "u-1", "status": "active"}))
            .await;
        store
            .seed("listings", json!({"id": "l-2", "seller_id": "u-1", "status": "sold"}))
            .await;
        store
            .seed("listings", json!({"id": "l-3", "seller_id": "u-1", "status": "active"}))
            .await;
        store.seed("bids", json!({"listing_id": "l-3", "amount": 4})).await;

        let query = Query::table("listings")
            .join(Join::one("seller", "profiles", "seller_id"))
            .join(Join::many("bids", "bids", "listing_id"))
            .eq("status", "active")
            .order("created_at", false);
        let rows = store.select(&query).await.unwrap();

        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["l-3", "l-1"]);
        assert_eq!(rows[0]["seller"]["email"], "a@uni.edu");
        assert_eq!(rows[0]["bids"].as_array().map(Vec::len), Some(1));
        assert_eq!(rows[1]["bids"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_select_one_missing_row() {
        let store = MemoryStore::new();
        let err = store
            .select_one(&Query::table("listings").eq("id", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }
}
