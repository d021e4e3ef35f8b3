use serde::{Deserialize, Serialize};

pub const ENV_PROJECT_ID: &str = "BRANCHDB_PROJECT_ID";
pub const ENV_CLIENT_EMAIL: &str = "BRANCHDB_CLIENT_EMAIL";
pub const ENV_PRIVATE_KEY: &str = "BRANCHDB_PRIVATE_KEY";
pub const ENV_DATABASE_URL: &str = "BRANCHDB_DATABASE_URL";

/// Credentials and endpoint for the live store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
  pub project_id: String,
  pub client_email: String,
  pub private_key: String,
  pub database_url: String,
}

impl StoreConfig {
  /// Read configuration from the process environment.
  ///
  /// Returns `None` when any of the four variables is missing or empty,
  /// after a warning naming the gaps, so the composition root can substitute
  /// the disconnected store instead of failing. Missing configuration is not
  /// an error by design.
  pub fn from_env() -> Option<Self> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Same contract as [`StoreConfig::from_env`] with an injected lookup, so
  /// tests never mutate the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
    let fetch = |name: &'static str| lookup(name).filter(|v| !v.is_empty());
    let project_id = fetch(ENV_PROJECT_ID);
    let client_email = fetch(ENV_CLIENT_EMAIL);
    let private_key = fetch(ENV_PRIVATE_KEY);
    let database_url = fetch(ENV_DATABASE_URL);

    let missing: Vec<&str> = [
      (ENV_PROJECT_ID, project_id.is_none()),
      (ENV_CLIENT_EMAIL, client_email.is_none()),
      (ENV_PRIVATE_KEY, private_key.is_none()),
      (ENV_DATABASE_URL, database_url.is_none()),
    ]
    .iter()
    .filter(|(_, absent)| *absent)
    .map(|(name, _)| *name)
    .collect();

    if !missing.is_empty() {
      tracing::warn!(missing = %missing.join(", "), "store configuration incomplete");
      return None;
    }

    Some(Self {
      project_id: project_id?,
      client_email: client_email?,
      // Keys delivered through the environment arrive with escaped newlines.
      private_key: private_key?.replace("\\n", "\n"),
      database_url: database_url?,
    })
  }
}
