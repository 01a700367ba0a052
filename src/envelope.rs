//! Translation from whatever envelope the backend answers with to one
//! `PageResult`. Shape drift stays in this file.

use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::types::{PageResult, Resource, ResourceKind, PAGE_SCHEMA_VERSION};

/// Envelope shapes the collection endpoints have used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"data": {"<kind>": [..], "pagination": {"has_more": .., "last_page": ..}}}`
    Pagination,
    /// `{"data": {"<kind>": [..], "meta": {"current_page": .., "last_page": ..}}}`
    Meta,
    /// A bare array, or a list with no pagination descriptor beside it.
    Bare,
}

/// Items plus continuation, still as raw JSON.
struct RawPage {
    items: Vec<Value>,
    has_more: bool,
    total: Option<u64>,
    envelope: Envelope,
}

/// Normalize a collection response for `kind`.
///
/// `page` and `per_page` are what was requested; they decide `has_more` when
/// the body does not say. Missing items mean an empty page, missing
/// pagination means no further pages. Items that do not deserialize are
/// skipped.
pub fn normalize_page<T: Resource>(
    body: Value,
    kind: ResourceKind,
    page: u32,
    per_page: u32,
) -> Result<PageResult<T>, GatewayError> {
    let raw = split_page(body, kind, page, per_page)?;
    tracing::debug!(
        "{kind} page {page}: {:?} envelope, {} raw items, has_more={} (page schema v{PAGE_SCHEMA_VERSION})",
        raw.envelope,
        raw.items.len(),
        raw.has_more
    );

    let items = raw
        .items
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| tracing::warn!("Skipping malformed {} item: {e}", kind.singular()))
                .ok()
        })
        .collect();

    Ok(PageResult {
        items,
        has_more: raw.has_more,
        total: raw.total,
    })
}

/// Normalize a detail response: `{"data": {"<singular>": {..}}}`,
/// `{"data": {..}}` or the bare record.
pub fn normalize_item<T: Resource>(body: Value, kind: ResourceKind) -> Result<T, GatewayError> {
    let record = match body {
        Value::Object(mut root) => match root.remove("data") {
            Some(Value::Object(mut data)) => match data.remove(kind.singular()) {
                Some(inner @ Value::Object(_)) => inner,
                _ => Value::Object(data),
            },
            Some(other) => {
                return Err(GatewayError::Malformed(format!(
                    "expected an object under 'data', got {}",
                    type_name(&other)
                )))
            }
            None => match root.remove(kind.singular()) {
                Some(inner @ Value::Object(_)) => inner,
                _ => Value::Object(root),
            },
        },
        other => {
            return Err(GatewayError::Malformed(format!(
                "expected a {} object, got {}",
                kind.singular(),
                type_name(&other)
            )))
        }
    };
    serde_json::from_value(record)
        .map_err(|e| GatewayError::Malformed(format!("{} record: {e}", kind.singular())))
}

fn split_page(
    body: Value,
    kind: ResourceKind,
    page: u32,
    per_page: u32,
) -> Result<RawPage, GatewayError> {
    match body {
        Value::Array(items) => Ok(bare(items, per_page)),
        Value::Object(mut root) => match root.remove("data") {
            Some(Value::Object(data)) => Ok(from_container(data, kind, page)),
            Some(Value::Array(items)) => {
                // `{"data": [..], "meta": {..}}` keeps pagination beside the list.
                let mut rest = root;
                rest.insert(kind.plural().to_string(), Value::Array(items));
                Ok(from_container(rest, kind, page))
            }
            Some(Value::Null) | None => Ok(from_container(root, kind, page)),
            Some(other) => Err(GatewayError::Malformed(format!(
                "expected a list or object under 'data', got {}",
                type_name(&other)
            ))),
        },
        other => Err(GatewayError::Malformed(format!(
            "expected a page object, got {}",
            type_name(&other)
        ))),
    }
}

fn from_container(mut container: Map<String, Value>, kind: ResourceKind, page: u32) -> RawPage {
    let items = [kind.plural(), "items", "data"]
        .into_iter()
        .find_map(|key| match container.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        })
        .unwrap_or_default();

    if let Some(Value::Object(pagination)) = container.get("pagination") {
        let has_more = match pagination.get("has_more").and_then(Value::as_bool) {
            Some(flag) => flag,
            None => more_pages(pagination, page).unwrap_or(false),
        };
        return RawPage {
            items,
            has_more,
            total: pagination.get("total").and_then(Value::as_u64),
            envelope: Envelope::Pagination,
        };
    }

    if let Some(Value::Object(meta)) = container.get("meta") {
        return RawPage {
            items,
            has_more: more_pages(meta, page).unwrap_or(false),
            total: meta.get("total").and_then(Value::as_u64),
            envelope: Envelope::Meta,
        };
    }

    if let Some(flag) = container.get("has_more").and_then(Value::as_bool) {
        return RawPage {
            items,
            has_more: flag,
            total: container.get("total").and_then(Value::as_u64),
            envelope: Envelope::Pagination,
        };
    }

    // An envelope that dropped its descriptor: under-paginate rather than loop.
    RawPage {
        items,
        has_more: false,
        total: None,
        envelope: Envelope::Bare,
    }
}

/// A bare array cannot carry a descriptor: a full page suggests another one
/// may follow.
fn bare(items: Vec<Value>, per_page: u32) -> RawPage {
    let has_more = per_page > 0 && items.len() >= per_page as usize;
    RawPage {
        items,
        has_more,
        total: None,
        envelope: Envelope::Bare,
    }
}

/// `current_page < last_page`, falling back to the requested page when the
/// descriptor omits `current_page`.
fn more_pages(descriptor: &Map<String, Value>, requested: u32) -> Option<bool> {
    let last = descriptor.get("last_page").and_then(Value::as_u64)?;
    let current = descriptor
        .get("current_page")
        .and_then(Value::as_u64)
        .unwrap_or(u64::from(requested));
    Some(current < last)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
