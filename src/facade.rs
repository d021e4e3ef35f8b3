use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{server_timestamp, StoreBackend};
use crate::types::{Document, QueryOptions, CREATED_AT, UPDATED_AT};

// Characters the hierarchical store reserves in path segments.
const RESERVED: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Document-oriented facade over a [`StoreBackend`].
///
/// Stateless apart from the backend handle: every operation is a single
/// independent round-trip, concurrent writes to the same document resolve by
/// the store's last-write-wins, and nothing here retries, batches, or times
/// out. Failures are logged with the operation name and target path, then
/// propagated as [`StoreError`].
#[derive(Clone)]
pub struct DocStore {
  backend: Arc<dyn StoreBackend>,
}

impl DocStore {
  pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
    Self { backend }
  }

  /// Create a document under a store-generated push id. Stamps `createdAt`
  /// and `updatedAt` with the server clock and returns the new id.
  pub async fn create_document(
    &self,
    collection: &str,
    data: Map<String, Value>,
  ) -> Result<String, StoreError> {
    let path = checked_path("create", collection, None)?;
    let mut node = data;
    node.insert(CREATED_AT.to_string(), server_timestamp());
    node.insert(UPDATED_AT.to_string(), server_timestamp());
    self
      .backend
      .push(collection, Value::Object(node))
      .await
      .map_err(|e| StoreError::new("create", path, e))
  }

  /// Write a document at a caller-chosen id, replacing whatever was there.
  ///
  /// Stamps `updatedAt` only: unlike [`DocStore::create_document`] this never
  /// sets `createdAt`, and any existing `createdAt` at that id is overwritten
  /// away with the rest of the node. The asymmetry is deliberate; callers
  /// that want a creation time must go through the push path.
  pub async fn set_document(
    &self,
    collection: &str,
    id: &str,
    data: Map<String, Value>,
  ) -> Result<(), StoreError> {
    let path = checked_path("set", collection, Some(id))?;
    let mut node = data;
    node.insert(UPDATED_AT.to_string(), server_timestamp());
    self
      .backend
      .set(collection, id, Value::Object(node))
      .await
      .map_err(|e| StoreError::new("set", path, e))
  }

  /// Shallow-merge fields into an existing document and refresh `updatedAt`.
  /// Top-level fields are replaced, not recursed into.
  pub async fn update_document(
    &self,
    collection: &str,
    id: &str,
    data: Map<String, Value>,
  ) -> Result<(), StoreError> {
    let path = checked_path("update", collection, Some(id))?;
    let mut node = data;
    node.insert(UPDATED_AT.to_string(), server_timestamp());
    self
      .backend
      .update(collection, id, Value::Object(node))
      .await
      .map_err(|e| StoreError::new("update", path, e))
  }

  /// Remove a document. No existence check: deleting an id that never
  /// existed succeeds silently.
  pub async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
    let path = checked_path("delete", collection, Some(id))?;
    self
      .backend
      .remove(collection, id)
      .await
      .map_err(|e| StoreError::new("delete", path, e))
  }

  /// Read a document by id; `None` when absent, so callers branch on the
  /// common not-found case without error handling.
  pub async fn get_document(
    &self,
    collection: &str,
    id: &str,
  ) -> Result<Option<Document>, StoreError> {
    let path = checked_path("get", collection, Some(id))?;
    let node = self
      .backend
      .get(collection, id)
      .await
      .map_err(|e| StoreError::new("get", path, e))?;
    Ok(node.map(|n| Document::from_node(id, n)))
  }

  /// Query a collection with composable filter/order/limit options, lowered
  /// to the store's single-index surface (see [`QueryOptions::plan`]).
  pub async fn query_documents(
    &self,
    collection: &str,
    options: &QueryOptions,
  ) -> Result<Vec<Document>, StoreError> {
    let path = checked_path("query", collection, None)?;
    let plan = options.plan();
    let rows = self
      .backend
      .query(collection, &plan)
      .await
      .map_err(|e| StoreError::new("query", path, e))?;
    Ok(
      rows
        .into_iter()
        .map(|(id, node)| Document::from_node(id, node))
        .collect(),
    )
  }
}

fn checked_path(
  op: &'static str,
  collection: &str,
  id: Option<&str>,
) -> Result<String, StoreError> {
  let path = match id {
    Some(id) => format!("{collection}/{id}"),
    None => collection.to_string(),
  };
  for segment in std::iter::once(collection).chain(id) {
    if segment.is_empty() || segment.contains(RESERVED) {
      return Err(StoreError::new(
        op,
        path,
        anyhow::anyhow!("invalid path segment `{segment}`"),
      ));
    }
  }
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn path_segments_reject_reserved_characters() {
    assert!(checked_path("get", "users", Some("abc")).is_ok());
    assert!(checked_path("get", "users/evil", Some("abc")).is_err());
    assert!(checked_path("get", "users", Some("a.b")).is_err());
    assert!(checked_path("get", "", None).is_err());
    assert!(checked_path("get", "users", Some("$priority")).is_err());
  }

  #[test]
  fn checked_path_joins_collection_and_id() {
    assert_eq!(checked_path("get", "users", Some("abc")).unwrap(), "users/abc");
    assert_eq!(checked_path("query", "users", None).unwrap(), "users");
  }
}
