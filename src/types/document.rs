use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved field holding the creation timestamp, milliseconds since epoch.
pub const CREATED_AT: &str = "createdAt";
/// Reserved field holding the last-write timestamp, milliseconds since epoch.
pub const UPDATED_AT: &str = "updatedAt";

/// A uniquely identified field/value mapping with managed timestamps.
///
/// The timestamps live inside the stored node as millisecond fields and are
/// split out on read. `created_at` is `None` for documents written through
/// the overwrite path, which never stamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id: String,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
  pub data: Map<String, Value>,
}

impl Document {
  /// Rebuild a document from a raw store node.
  pub fn from_node(id: impl Into<String>, node: Value) -> Self {
    let mut data = match node {
      Value::Object(map) => map,
      // Scalar leaves can exist in a hierarchical store; surface them under
      // a synthetic field rather than dropping them.
      other => {
        let mut map = Map::new();
        if !other.is_null() {
          map.insert("value".to_string(), other);
        }
        map
      }
    };
    let created_at = take_millis(&mut data, CREATED_AT);
    let updated_at = take_millis(&mut data, UPDATED_AT);
    Self {
      id: id.into(),
      created_at,
      updated_at,
      data,
    }
  }

  /// Access a user field by name. Reserved timestamp fields are not
  /// reachable here, they are on the struct.
  pub fn field(&self, name: &str) -> Option<&Value> {
    self.data.get(name)
  }
}

/// Pop a reserved millisecond field into a typed timestamp. A field that is
/// present but not a number is left in place untouched.
fn take_millis(data: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
  let millis = data.get(key).and_then(Value::as_i64)?;
  data.remove(key);
  DateTime::from_timestamp_millis(millis)
}
