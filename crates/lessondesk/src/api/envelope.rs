//! Response envelopes.
//!
//! List endpoints answer with a bare array, `{data, total}` or `{data}`;
//! single-object endpoints with `{data: ...}` or the bare object. Both are
//! unwrapped right after the fetch.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Paged {
        data: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl<T> ListResponse<T> {
    /// Total number of records: the backend's `total` when it sent one,
    /// otherwise the number of items present.
    pub fn total(&self) -> usize {
        match self {
            ListResponse::Bare(items) => items.len(),
            ListResponse::Paged { data, total } => {
                total.map_or(data.len(), |t| usize::try_from(t).unwrap_or(usize::MAX))
            }
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) | ListResponse::Paged { data: items, .. } => items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> DataEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            DataEnvelope::Wrapped { data } | DataEnvelope::Bare(data) => data,
        }
    }
}

/// Items of a list payload. A payload in neither list shape yields no items.
///
/// Only the page the backend returned is kept; a larger reported total is
/// logged.
pub fn list_items(payload: Value) -> Vec<Value> {
    match ListResponse::<Value>::deserialize(payload) {
        Ok(list) => {
            let total = list.total();
            let items = list.into_items();
            if total > items.len() {
                warn!(
                    returned = items.len(),
                    total,
                    "Backend returned a partial page of a paginated list"
                );
            }
            items
        }
        Err(e) => {
            warn!(error = %e, "List response is neither an array nor a data envelope");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_shapes() {
        assert_eq!(list_items(json!([1, 2])).len(), 2);
        assert_eq!(list_items(json!({"data": [1, 2, 3], "total": 40})).len(), 3);
        assert_eq!(list_items(json!({"data": []})).len(), 0);
        assert!(list_items(json!({"data": {"id": 1}})).is_empty());
        assert!(list_items(Value::Null).is_empty());
    }

    #[test]
    fn test_paged_total() {
        let list: ListResponse<Value> =
            serde_json::from_value(json!({"data": [{"id": 1}], "total": 40})).unwrap();
        assert_eq!(list.total(), 40);
        assert_eq!(list.into_items().len(), 1);

        let bare: ListResponse<Value> = serde_json::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(bare.total(), 3);

        let untotalled: ListResponse<Value> = serde_json::from_value(json!({"data": [1]})).unwrap();
        assert_eq!(untotalled.total(), 1);
    }

    #[test]
    fn test_data_envelope() {
        let wrapped: DataEnvelope<Value> = serde_json::from_value(json!({"data": {"id": 1}})).unwrap();
        let bare: DataEnvelope<Value> = serde_json::from_value(json!({"id": 2})).unwrap();
        assert_eq!(wrapped.into_inner()["id"], 1);
        assert_eq!(bare.into_inner()["id"], 2);
    }
}
