mod memory;
mod noop;
#[cfg(feature = "live")]
mod rtdb;

pub use memory::MemoryBackend;
pub use noop::NoopBackend;
#[cfg(feature = "live")]
pub use rtdb::RtdbBackend;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use crate::types::QueryPlan;

/// Path-addressed hierarchical store: push (generate id and write),
/// overwrite, shallow merge, remove, one-shot read, and a single-index range
/// query. Each call is one independent round-trip; concurrent writes to the
/// same node resolve by the store's last-write-wins.
#[async_trait]
pub trait StoreBackend: Send + Sync {
  /// Write `value` under a freshly generated id and return the id.
  async fn push(&self, collection: &str, value: Value) -> Result<String, anyhow::Error>;

  /// Overwrite the node at `collection/id` with `value`.
  async fn set(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error>;

  /// Shallow-merge `value` into the node at `collection/id`, creating it if
  /// absent. Top-level fields are replaced, not recursed into.
  async fn update(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error>;

  /// Remove the node at `collection/id`. Removing a missing node succeeds.
  async fn remove(&self, collection: &str, id: &str) -> Result<(), anyhow::Error>;

  /// One-shot read of the node at `collection/id`; `None` when absent.
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, anyhow::Error>;

  /// Run a lowered single-index query and return `(id, node)` pairs in index
  /// order (key order when the plan has no index).
  async fn query(
    &self,
    collection: &str,
    plan: &QueryPlan,
  ) -> Result<Vec<(String, Value)>, anyhow::Error>;
}

/// Sentinel written in place of a timestamp; the store substitutes its own
/// clock when the write lands. The live store resolves it server-side,
/// local stores resolve it via [`resolve_server_timestamps`].
pub fn server_timestamp() -> Value {
  json!({ ".sv": "timestamp" })
}

fn is_server_timestamp(value: &Value) -> bool {
  value.get(".sv").and_then(Value::as_str) == Some("timestamp")
}

/// Replace timestamp sentinels anywhere in `value` with `now_millis`.
pub(crate) fn resolve_server_timestamps(value: &mut Value, now_millis: i64) {
  if is_server_timestamp(value) {
    *value = Value::from(now_millis);
    return;
  }
  match value {
    Value::Object(map) => {
      for v in map.values_mut() {
        resolve_server_timestamps(v, now_millis);
      }
    }
    Value::Array(items) => {
      for v in items.iter_mut() {
        resolve_server_timestamps(v, now_millis);
      }
    }
    _ => {}
  }
}

// Url-safe, ascii-ordered; keeps generated ids sortable as raw bytes.
const PUSH_ALPHABET: &[u8; 64] =
  b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generate a 20-character push identifier: 8 characters of millisecond
/// timestamp followed by 12 characters of entropy, so ids from different
/// instants sort chronologically under the store's lexicographic key order.
pub fn push_id() -> String {
  push_id_at(Utc::now().timestamp_millis())
}

fn push_id_at(now_millis: i64) -> String {
  let mut id = [0u8; 20];
  let mut ts = now_millis;
  for slot in id[..8].iter_mut().rev() {
    *slot = PUSH_ALPHABET[(ts % 64) as usize];
    ts /= 64;
  }
  let mut rng = rand::thread_rng();
  for slot in id[8..].iter_mut() {
    *slot = PUSH_ALPHABET[rng.gen_range(0..64)];
  }
  String::from_utf8_lossy(&id).into_owned()
}

/// Node ordering used by the store's index: missing/null, then booleans,
/// then numbers, then strings, then composites.
fn rank(value: Option<&Value>) -> u8 {
  match value {
    None | Some(Value::Null) => 0,
    Some(Value::Bool(_)) => 1,
    Some(Value::Number(_)) => 2,
    Some(Value::String(_)) => 3,
    Some(_) => 4,
  }
}

pub(crate) fn compare_index_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  let (ra, rb) = (rank(a), rank(b));
  if ra != rb {
    return ra.cmp(&rb);
  }
  match (a, b) {
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    _ => Ordering::Equal,
  }
}

/// Equality used by `equalTo`: numeric values compare by magnitude so an
/// integer bound matches a float field, everything else compares exactly.
pub(crate) fn index_values_equal(node: Option<&Value>, target: &Value) -> bool {
  match (node, target) {
    (Some(Value::Number(x)), Value::Number(y)) => x.as_f64() == y.as_f64(),
    (Some(v), t) => v == t,
    (None, _) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn push_ids_are_twenty_chars() {
    let id = push_id();
    assert_eq!(id.len(), 20);
    assert!(id.bytes().all(|b| PUSH_ALPHABET.contains(&b)));
  }

  #[test]
  fn push_ids_sort_chronologically() {
    let earlier = push_id_at(1_700_000_000_000);
    let later = push_id_at(1_700_000_000_001);
    assert!(earlier < later);
  }

  #[test]
  fn sentinel_resolution_is_recursive() {
    let mut value = json!({
      "name": "Alice",
      "updatedAt": { ".sv": "timestamp" },
      "nested": { "createdAt": { ".sv": "timestamp" } }
    });
    resolve_server_timestamps(&mut value, 1234);
    assert_eq!(value["updatedAt"], json!(1234));
    assert_eq!(value["nested"]["createdAt"], json!(1234));
    assert_eq!(value["name"], json!("Alice"));
  }

  #[test]
  fn index_ordering_ranks_types() {
    use std::cmp::Ordering::*;
    let num = json!(3);
    let s = json!("a");
    assert_eq!(compare_index_values(None, Some(&num)), Less);
    assert_eq!(compare_index_values(Some(&num), Some(&s)), Less);
    assert_eq!(compare_index_values(Some(&json!(2)), Some(&json!(10))), Less);
    assert_eq!(compare_index_values(Some(&json!("b")), Some(&json!("a"))), Greater);
  }

  #[test]
  fn numeric_equality_crosses_representations() {
    assert!(index_values_equal(Some(&json!(10)), &json!(10.0)));
    assert!(!index_values_equal(None, &json!(10)));
    assert!(index_values_equal(Some(&json!("x")), &json!("x")));
  }
}
