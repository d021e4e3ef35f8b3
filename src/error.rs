use thiserror::Error;

/// The facade's single failure kind: a backing-store operation failed.
///
/// Carries the operation name and the target path the failure was logged
/// with. There is no finer taxonomy, no retry and no backoff; callers treat
/// every facade operation as fallible with this one kind.
#[derive(Debug, Error)]
#[error("store operation `{op}` failed at `{path}`")]
pub struct StoreError {
  /// Facade operation that failed (`create`, `set`, `update`, ...).
  pub op: &'static str,
  /// Store path the operation targeted, `collection` or `collection/id`.
  pub path: String,
  #[source]
  pub source: anyhow::Error,
}

impl StoreError {
  pub(crate) fn new(op: &'static str, path: impl Into<String>, source: anyhow::Error) -> Self {
    let path = path.into();
    tracing::error!(op, %path, error = %source, "store operation failed");
    Self { op, path, source }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_names_operation_and_path() {
    let err = StoreError::new("update", "users/abc", anyhow::anyhow!("boom"));
    assert_eq!(err.to_string(), "store operation `update` failed at `users/abc`");
    assert_eq!(err.source.to_string(), "boom");
  }
}
