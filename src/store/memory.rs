use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{
  compare_index_values, index_values_equal, push_id, resolve_server_timestamps, StoreBackend,
};
use crate::types::QueryPlan;

/// In-memory rendition of the hierarchical store, the test double and local
/// development store. Mirrors the live store's single-index query semantics
/// including its cross-type value ordering, and resolves timestamp sentinels
/// with the local clock at write time. The tree lock is held only across a
/// single operation.
#[derive(Default)]
pub struct MemoryBackend {
  collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of documents currently held in a collection.
  pub fn len(&self, collection: &str) -> usize {
    self
      .collections
      .lock()
      .get(collection)
      .map_or(0, BTreeMap::len)
  }

  pub fn is_empty(&self, collection: &str) -> bool {
    self.len(collection) == 0
  }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
  async fn push(&self, collection: &str, value: Value) -> Result<String, anyhow::Error> {
    let id = push_id();
    self.set(collection, &id, value).await?;
    Ok(id)
  }

  async fn set(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error> {
    let mut value = value;
    resolve_server_timestamps(&mut value, Utc::now().timestamp_millis());
    self
      .collections
      .lock()
      .entry(collection.to_string())
      .or_default()
      .insert(id.to_string(), value);
    Ok(())
  }

  async fn update(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error> {
    let mut value = value;
    resolve_server_timestamps(&mut value, Utc::now().timestamp_millis());
    let mut collections = self.collections.lock();
    let node = collections
      .entry(collection.to_string())
      .or_default()
      .entry(id.to_string())
      .or_insert_with(|| Value::Object(Map::new()));
    match value {
      Value::Object(incoming) => {
        if let Value::Object(existing) = node {
          for (key, field) in incoming {
            existing.insert(key, field);
          }
        } else {
          *node = Value::Object(incoming);
        }
      }
      other => *node = other,
    }
    Ok(())
  }

  async fn remove(&self, collection: &str, id: &str) -> Result<(), anyhow::Error> {
    let mut collections = self.collections.lock();
    if let Some(nodes) = collections.get_mut(collection) {
      nodes.remove(id);
      // The store prunes empty interior nodes.
      if nodes.is_empty() {
        collections.remove(collection);
      }
    }
    Ok(())
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, anyhow::Error> {
    Ok(
      self
        .collections
        .lock()
        .get(collection)
        .and_then(|nodes| nodes.get(id))
        .cloned(),
    )
  }

  async fn query(
    &self,
    collection: &str,
    plan: &QueryPlan,
  ) -> Result<Vec<(String, Value)>, anyhow::Error> {
    let collections = self.collections.lock();
    let Some(nodes) = collections.get(collection) else {
      return Ok(Vec::new());
    };

    let mut rows: Vec<(String, Value)> = nodes
      .iter()
      .filter(|(_, node)| plan_matches(plan, node))
      .map(|(id, node)| (id.clone(), node.clone()))
      .collect();

    // BTreeMap iteration already gives key order; an index re-sorts by the
    // indexed child value.
    if let Some(index) = &plan.index {
      rows.sort_by(|a, b| compare_index_values(a.1.get(index), b.1.get(index)));
    }
    if let Some(limit) = plan.limit_to_first {
      rows.truncate(limit);
    }
    Ok(rows)
  }
}

fn plan_matches(plan: &QueryPlan, node: &Value) -> bool {
  let Some(index) = &plan.index else {
    return true;
  };
  let value = node.get(index);
  if let Some(target) = &plan.equal_to {
    return index_values_equal(value, target);
  }
  if let Some(start) = &plan.start_at {
    if compare_index_values(value, Some(start)) == std::cmp::Ordering::Less {
      return false;
    }
  }
  if let Some(end) = &plan.end_at {
    if compare_index_values(value, Some(end)) == std::cmp::Ordering::Greater {
      return false;
    }
  }
  true
}
