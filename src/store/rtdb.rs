use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::Value;

use super::{compare_index_values, StoreBackend};
use crate::config::StoreConfig;
use crate::types::QueryPlan;

/// REST client for the live realtime tree.
///
/// Every operation is one HTTPS round-trip against
/// `{database_url}/{path}.json`; timeouts come from the HTTP client and the
/// facade adds no retries. Timestamp sentinels pass through untouched, the
/// store resolves them server-side.
pub struct RtdbBackend {
  http: Client,
  config: StoreConfig,
}

impl RtdbBackend {
  pub fn new(config: StoreConfig) -> Result<Self, anyhow::Error> {
    let http = Client::builder()
      .user_agent(concat!("branchdb/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("building http client")?;
    tracing::debug!(project_id = %config.project_id, "live store client ready");
    Ok(Self { http, config })
  }

  fn node_url(&self, path: &str) -> Result<Url, anyhow::Error> {
    let base = self.config.database_url.trim_end_matches('/');
    let mut url =
      Url::parse(&format!("{base}/{path}.json")).context("assembling store node url")?;
    // Token minting from the service-account key is out of scope here; the
    // key rides along as the legacy `auth` credential.
    url
      .query_pairs_mut()
      .append_pair("auth", &self.config.private_key);
    Ok(url)
  }

  async fn request(
    &self,
    method: Method,
    url: Url,
    body: Option<&Value>,
  ) -> Result<Value, anyhow::Error> {
    let path = url.path().to_string();
    tracing::debug!(%method, %path, "store request");
    let mut request = self.http.request(method.clone(), url);
    if let Some(body) = body {
      request = request.json(body);
    }
    let response = request
      .send()
      .await
      .with_context(|| format!("{method} {path}"))?;
    let status = response.status();
    if !status.is_success() {
      let detail = response.text().await.unwrap_or_default();
      anyhow::bail!("{method} {path} returned {status}: {detail}");
    }
    response
      .json()
      .await
      .with_context(|| format!("decoding {method} {path} response"))
  }
}

#[async_trait]
impl StoreBackend for RtdbBackend {
  async fn push(&self, collection: &str, value: Value) -> Result<String, anyhow::Error> {
    let url = self.node_url(collection)?;
    let response = self.request(Method::POST, url, Some(&value)).await?;
    response
      .get("name")
      .and_then(Value::as_str)
      .map(str::to_owned)
      .ok_or_else(|| anyhow::anyhow!("store did not return a generated id"))
  }

  async fn set(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error> {
    let url = self.node_url(&format!("{collection}/{id}"))?;
    self.request(Method::PUT, url, Some(&value)).await?;
    Ok(())
  }

  async fn update(&self, collection: &str, id: &str, value: Value) -> Result<(), anyhow::Error> {
    let url = self.node_url(&format!("{collection}/{id}"))?;
    self.request(Method::PATCH, url, Some(&value)).await?;
    Ok(())
  }

  async fn remove(&self, collection: &str, id: &str) -> Result<(), anyhow::Error> {
    let url = self.node_url(&format!("{collection}/{id}"))?;
    self.request(Method::DELETE, url, None).await?;
    Ok(())
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, anyhow::Error> {
    let url = self.node_url(&format!("{collection}/{id}"))?;
    let node = self.request(Method::GET, url, None).await?;
    Ok(if node.is_null() { None } else { Some(node) })
  }

  async fn query(
    &self,
    collection: &str,
    plan: &QueryPlan,
  ) -> Result<Vec<(String, Value)>, anyhow::Error> {
    let mut url = self.node_url(collection)?;
    {
      let mut params = url.query_pairs_mut();
      // Query parameter values are JSON literals, field names included.
      if let Some(index) = &plan.index {
        params.append_pair("orderBy", &format!("\"{index}\""));
      } else if plan.is_constrained() {
        // The wire protocol rejects bounds and limits without an index.
        params.append_pair("orderBy", "\"$key\"");
      }
      if let Some(v) = &plan.start_at {
        params.append_pair("startAt", &v.to_string());
      }
      if let Some(v) = &plan.end_at {
        params.append_pair("endAt", &v.to_string());
      }
      if let Some(v) = &plan.equal_to {
        params.append_pair("equalTo", &v.to_string());
      }
      if let Some(n) = plan.limit_to_first {
        params.append_pair("limitToFirst", &n.to_string());
      }
    }

    let response = self.request(Method::GET, url, None).await?;
    let mut rows: Vec<(String, Value)> = match response {
      Value::Null => Vec::new(),
      Value::Object(map) => map.into_iter().collect(),
      // Dense numeric keys come back as an array.
      Value::Array(items) => items
        .into_iter()
        .enumerate()
        .filter(|(_, node)| !node.is_null())
        .map(|(i, node)| (i.to_string(), node))
        .collect(),
      other => {
        anyhow::bail!("unexpected query response shape: {other}");
      }
    };

    // The store answers with an unordered object; re-establish index order
    // client-side so callers see the same ordering as the in-memory store.
    if let Some(index) = &plan.index {
      rows.sort_by(|a, b| compare_index_values(a.1.get(index), b.1.get(index)));
    } else {
      rows.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(rows)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_config() -> StoreConfig {
    StoreConfig {
      project_id: "demo".into(),
      client_email: "svc@demo.example".into(),
      private_key: "secret".into(),
      database_url: "https://demo.example.com/".into(),
    }
  }

  #[test]
  fn node_url_joins_path_and_credential() {
    let backend = RtdbBackend::new(test_config()).unwrap();
    let url = backend.node_url("users/abc").unwrap();
    assert_eq!(url.path(), "/users/abc.json");
    assert_eq!(url.query(), Some("auth=secret"));
  }

  #[test]
  fn trailing_slash_in_database_url_is_tolerated() {
    let backend = RtdbBackend::new(test_config()).unwrap();
    let url = backend.node_url("users").unwrap();
    assert_eq!(url.as_str(), "https://demo.example.com/users.json?auth=secret");
  }
}
