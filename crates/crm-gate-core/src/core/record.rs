// crm-gate-core/src/core/record.rs
// ============================================================================
// Module: CRM Records
// Description: Stored record shape and the query model used by list tools.
// Purpose: Share filter, ordering, and pagination semantics across backends.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Records are JSON objects owned by the record store. The store assigns the
//! identifier and timestamps; everything else is the caller's field map.
//! [`RecordQuery`] describes exact-match and inclusive-range filters, an
//! optional sort key, and offset/limit pagination.
//!
//! Ordering rules shared by every backend:
//! - Without a sort key, records are returned newest first.
//! - With a sort key, records lacking the field sort after those that have it.
//! - Ties fall back to newest first.
//! - Sorting on `created_at` follows insertion order, so records created
//!   within the same clock tick keep a stable order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::RecordId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field name carrying the record identifier.
pub const ID_FIELD: &str = "id";
/// Field name carrying the creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Field name carrying the last update timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";

// ============================================================================
// SECTION: Stored Records
// ============================================================================

/// CRM record as persisted by a record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Caller-supplied fields.
    pub fields: Map<String, Value>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    pub updated_at: Timestamp,
}

impl StoredRecord {
    /// Returns the value of a field, including the store-managed ones.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            ID_FIELD => Some(Value::String(self.id.as_str().to_string())),
            CREATED_AT_FIELD => Some(Value::String(self.created_at.as_str().to_string())),
            UPDATED_AT_FIELD => Some(Value::String(self.updated_at.as_str().to_string())),
            _ => self.fields.get(name).filter(|value| !value.is_null()).cloned(),
        }
    }

    /// Flattens the record into a single JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(ID_FIELD.to_string(), Value::String(self.id.as_str().to_string()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        object.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(self.created_at.as_str().to_string()),
        );
        object.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(self.updated_at.as_str().to_string()),
        );
        Value::Object(object)
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Comparison applied by a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact, case-sensitive equality.
    Eq,
    /// Field value greater than or equal to the operand.
    Gte,
    /// Field value less than or equal to the operand.
    Lte,
}

impl FilterOp {
    /// Returns the SQL comparison operator for the filter.
    #[must_use]
    pub const fn sql_operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// Single field predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Field name.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Operand.
    pub value: Value,
}

impl FieldFilter {
    /// Builds an equality filter.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    /// Returns true when the record satisfies the predicate.
    #[must_use]
    pub fn matches(&self, record: &StoredRecord) -> bool {
        let Some(actual) = record.field(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => values_equal(&actual, &self.value),
            FilterOp::Gte => {
                matches!(compare_values(&actual, &self.value), Some(Ordering::Greater | Ordering::Equal))
            }
            FilterOp::Lte => {
                matches!(compare_values(&actual, &self.value), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses `asc` or `desc`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Returns the SQL keyword for the direction.
    #[must_use]
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Explicit sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// List query for a single resource domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordQuery {
    /// Predicates combined with logical AND.
    pub filters: Vec<FieldFilter>,
    /// Optional explicit ordering.
    pub sort: Option<SortKey>,
    /// Maximum number of records returned.
    pub limit: usize,
    /// Number of matching records skipped before the page starts.
    pub offset: usize,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }
}

/// Default page size for record queries.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

impl RecordQuery {
    /// Returns true when the record satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &StoredRecord) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Orders records by the query's sort key.
    ///
    /// `sequence` maps each record to its insertion order; larger values are
    /// newer and win ties. A `created_at` key orders by `sequence` alone.
    pub fn sort_records<F>(&self, records: &mut [StoredRecord], sequence: F)
    where
        F: Fn(&StoredRecord) -> u64,
    {
        records.sort_by(|left, right| {
            let newest_first = sequence(right).cmp(&sequence(left));
            let Some(key) = self.sort.as_ref() else {
                return newest_first;
            };
            if key.field == CREATED_AT_FIELD {
                return match key.order {
                    SortOrder::Asc => newest_first.reverse(),
                    SortOrder::Desc => newest_first,
                };
            }
            compare_for_sort(left.field(&key.field), right.field(&key.field), key.order)
                .then(newest_first)
        });
    }

    /// Applies offset and limit to an ordered result set.
    #[must_use]
    pub fn paginate(&self, records: Vec<StoredRecord>) -> Vec<StoredRecord> {
        records.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Compares two optional sort values, placing missing values last.
fn compare_for_sort(left: Option<Value>, right: Option<Value>, order: SortOrder) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = compare_values(&left, &right).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}

// ============================================================================
// SECTION: Value Comparison
// ============================================================================

/// Returns true when two JSON values are equal; numbers compare numerically.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => (left - right).abs() < f64::EPSILON,
            _ => left == right,
        },
        _ => left == right,
    }
}

/// Orders two JSON scalars of the same kind.
///
/// Returns `None` for mismatched kinds and for arrays, objects, or nulls.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
