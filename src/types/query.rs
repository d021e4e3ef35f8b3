use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Margin used to emulate exclusive range bounds on a store whose `startAt`/
/// `endAt` operators are inclusive. Values within this margin of a `>` or
/// `<` bound may be mis-included or mis-excluded; this is a documented
/// precision limitation of the backing store's query surface.
pub const RANGE_EPSILON: f64 = 1e-6;

/// Comparison operators supported by a single-index query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
  #[serde(rename = "==")]
  Eq,
  #[serde(rename = ">")]
  Gt,
  #[serde(rename = ">=")]
  Ge,
  #[serde(rename = "<")]
  Lt,
  #[serde(rename = "<=")]
  Le,
}

/// Condition on a single document field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFilter {
  pub field: String,
  pub op: FilterOp,
  pub value: Value,
}

/// Options accepted by `query_documents`: field filtering, ordering by one
/// field, and a result-count limit. Independent and composable, with the
/// caveat described on [`QueryOptions::plan`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
  #[serde(default)]
  pub filters: Vec<FieldFilter>,
  #[serde(default)]
  pub order_by: Option<String>,
  #[serde(default)]
  pub limit: Option<usize>,
}

impl QueryOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
    self.filters.push(FieldFilter {
      field: field.into(),
      op,
      value: value.into(),
    });
    self
  }

  pub fn order_by(mut self, field: impl Into<String>) -> Self {
    self.order_by = Some(field.into());
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Lower the options onto the store's single-index query surface.
  ///
  /// The store sorts and filters on one child field per query, so the plan
  /// keeps exactly one active index: `order_by` claims it first, then each
  /// filter in turn re-points it at its own field. Combining a filter on one
  /// field with ordering on another is therefore not faithfully
  /// representable; the last filter wins the index.
  ///
  /// Exclusive bounds (`>`, `<`) are emulated by nudging the bound by
  /// [`RANGE_EPSILON`], since the store only has inclusive `startAt`/`endAt`.
  /// Non-numeric bounds cannot be nudged and stay inclusive.
  pub fn plan(&self) -> QueryPlan {
    let mut plan = QueryPlan {
      limit_to_first: self.limit,
      ..QueryPlan::default()
    };
    if let Some(field) = &self.order_by {
      plan.index = Some(field.clone());
    }
    for filter in &self.filters {
      plan.index = Some(filter.field.clone());
      // Equality and range bounds are mutually exclusive on the wire; a
      // filter that claims the index also evicts the other kind so both
      // backends see the same lowered query.
      match filter.op {
        FilterOp::Eq => {
          plan.equal_to = Some(filter.value.clone());
          plan.start_at = None;
          plan.end_at = None;
        }
        FilterOp::Ge => {
          plan.start_at = Some(filter.value.clone());
          plan.equal_to = None;
        }
        FilterOp::Le => {
          plan.end_at = Some(filter.value.clone());
          plan.equal_to = None;
        }
        FilterOp::Gt => {
          plan.start_at = Some(nudge(&filter.value, RANGE_EPSILON));
          plan.equal_to = None;
        }
        FilterOp::Lt => {
          plan.end_at = Some(nudge(&filter.value, -RANGE_EPSILON));
          plan.equal_to = None;
        }
      }
    }
    plan
  }
}

/// A lowered query: one index field plus inclusive bounds and a limit, as the
/// store's wire protocol expresses it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
  pub index: Option<String>,
  pub start_at: Option<Value>,
  pub end_at: Option<Value>,
  pub equal_to: Option<Value>,
  pub limit_to_first: Option<usize>,
}

impl QueryPlan {
  /// Whether any modifier beyond the index is present.
  pub fn is_constrained(&self) -> bool {
    self.start_at.is_some()
      || self.end_at.is_some()
      || self.equal_to.is_some()
      || self.limit_to_first.is_some()
  }
}

fn nudge(value: &Value, eps: f64) -> Value {
  match value.as_f64() {
    Some(n) => serde_json::Number::from_f64(n + eps)
      .map(Value::Number)
      .unwrap_or_else(|| value.clone()),
    None => value.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_options_lower_to_empty_plan() {
    let plan = QueryOptions::new().plan();
    assert_eq!(plan, QueryPlan::default());
    assert!(!plan.is_constrained());
  }

  #[test]
  fn inclusive_bounds_pass_through() {
    let plan = QueryOptions::new().filter("score", FilterOp::Ge, 10).plan();
    assert_eq!(plan.index.as_deref(), Some("score"));
    assert_eq!(plan.start_at, Some(json!(10)));
    assert_eq!(plan.end_at, None);
  }

  #[test]
  fn exclusive_bounds_are_nudged_by_epsilon() {
    let plan = QueryOptions::new().filter("score", FilterOp::Gt, 10).plan();
    let start = plan.start_at.unwrap().as_f64().unwrap();
    assert!((start - (10.0 + RANGE_EPSILON)).abs() < 1e-12);

    let plan = QueryOptions::new().filter("score", FilterOp::Lt, 10).plan();
    let end = plan.end_at.unwrap().as_f64().unwrap();
    assert!((end - (10.0 - RANGE_EPSILON)).abs() < 1e-12);
  }

  #[test]
  fn non_numeric_exclusive_bound_stays_inclusive() {
    let plan = QueryOptions::new().filter("name", FilterOp::Gt, "m").plan();
    assert_eq!(plan.start_at, Some(json!("m")));
  }

  #[test]
  fn last_filter_wins_the_index() {
    let plan = QueryOptions::new()
      .order_by("age")
      .filter("score", FilterOp::Eq, 5)
      .plan();
    assert_eq!(plan.index.as_deref(), Some("score"));
    assert_eq!(plan.equal_to, Some(json!(5)));
  }

  #[test]
  fn order_by_alone_sets_index() {
    let plan = QueryOptions::new().order_by("age").limit(3).plan();
    assert_eq!(plan.index.as_deref(), Some("age"));
    assert_eq!(plan.limit_to_first, Some(3));
    assert!(plan.is_constrained());
  }

  #[test]
  fn eq_filter_evicts_stale_range_bounds() {
    let plan = QueryOptions::new()
      .filter("score", FilterOp::Ge, 10)
      .filter("name", FilterOp::Eq, "Alice")
      .plan();
    assert_eq!(plan.index.as_deref(), Some("name"));
    assert_eq!(plan.equal_to, Some(json!("Alice")));
    // The score bound must not ride along next to equalTo; the wire
    // protocol rejects a query carrying both.
    assert_eq!(plan.start_at, None);
    assert_eq!(plan.end_at, None);
  }

  #[test]
  fn range_filter_evicts_stale_equality() {
    let plan = QueryOptions::new()
      .filter("name", FilterOp::Eq, "Alice")
      .filter("score", FilterOp::Gt, 10)
      .plan();
    assert_eq!(plan.index.as_deref(), Some("score"));
    assert_eq!(plan.equal_to, None);
    assert!(plan.start_at.is_some());
  }

  #[test]
  fn range_filters_compose_on_one_field() {
    let plan = QueryOptions::new()
      .filter("score", FilterOp::Ge, 10)
      .filter("score", FilterOp::Le, 20)
      .plan();
    assert_eq!(plan.start_at, Some(json!(10)));
    assert_eq!(plan.end_at, Some(json!(20)));
  }
}
