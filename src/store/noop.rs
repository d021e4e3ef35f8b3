use async_trait::async_trait;
use serde_json::Value;

use super::{push_id, StoreBackend};
use crate::types::QueryPlan;

/// Disconnected stand-in substituted when store configuration is absent:
/// writes are accepted and discarded, reads come back empty. Keeps builds
/// and partially configured environments running instead of failing at
/// startup; never a production code path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl NoopBackend {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl StoreBackend for NoopBackend {
  async fn push(&self, _collection: &str, _value: Value) -> Result<String, anyhow::Error> {
    Ok(push_id())
  }

  async fn set(&self, _collection: &str, _id: &str, _value: Value) -> Result<(), anyhow::Error> {
    Ok(())
  }

  async fn update(&self, _collection: &str, _id: &str, _value: Value) -> Result<(), anyhow::Error> {
    Ok(())
  }

  async fn remove(&self, _collection: &str, _id: &str) -> Result<(), anyhow::Error> {
    Ok(())
  }

  async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Value>, anyhow::Error> {
    Ok(None)
  }

  async fn query(
    &self,
    _collection: &str,
    _plan: &QueryPlan,
  ) -> Result<Vec<(String, Value)>, anyhow::Error> {
    Ok(Vec::new())
  }
}
