use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Version of the `PageResult` shape handed from the gateway to the loader.
/// Bump when fields are added so adapters can be audited in one place.
pub const PAGE_SCHEMA_VERSION: u16 = 1;

/// Stable identity of a catalog item.
/// The backend hands out numeric ids, the older document store used strings;
/// both normalize to the string form so de-duplication works across them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Self(n.to_string())),
            Raw::Text(s) if !s.trim().is_empty() => Ok(Self(s.trim().to_string())),
            Raw::Text(_) => Err(serde::de::Error::custom("empty item id")),
        }
    }
}

/// The four content collections the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Notes,
    Exams,
    Articles,
    Events,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Notes, Self::Exams, Self::Articles, Self::Events];

    /// Collection name, used both in URLs and as the envelope key.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Exams => "exams",
            Self::Articles => "articles",
            Self::Events => "events",
        }
    }

    /// Key of a single record in detail envelopes (`{"data": {"note": ..}}`).
    pub fn singular(self) -> &'static str {
        match self {
            Self::Notes => "note",
            Self::Exams => "exam",
            Self::Articles => "article",
            Self::Events => "event",
        }
    }

    /// Public listing path relative to the API base URL.
    pub fn collection_path(self) -> String {
        format!("public/{}", self.plural())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.plural() == lowered || kind.singular() == lowered)
            .ok_or_else(|| format!("unknown catalog kind '{s}' (expected notes, exams, articles or events)"))
    }
}

/// Filterable attributes of one item, borrowed for facet collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFacets<'a> {
    pub university: Option<&'a str>,
    pub department: Option<&'a str>,
    pub year: Option<&'a str>,
    pub semester: Option<&'a str>,
}

/// What the loader needs from an item: identity. Everything else is for
/// client-side narrowing and display.
pub trait CatalogItem {
    fn item_id(&self) -> &ItemId;

    fn title(&self) -> &str;

    /// Text fields a client-side query is matched against.
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title()]
    }

    fn facets(&self) -> ItemFacets<'_> {
        ItemFacets::default()
    }
}

/// A record type served by one collection endpoint.
pub trait Resource: CatalogItem + DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;
}

/// One fetch worth of items plus the continuation signal.
/// `items` keeps server order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub total: Option<u64>,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more, total: None }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}

/// Snapshot of a catalog reported to whoever renders it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStatus {
    pub generation: u64,
    pub item_count: usize,
    pub current_page: u32,
    pub has_more: bool,
    pub is_initial_loading: bool,
    pub is_fetching_more: bool,
    /// Query finished and matched nothing. Distinct from "still loading".
    pub is_empty_result: bool,
    pub error: Option<String>,
    pub closed: bool,
}

/// Outcome of a backend health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub online: bool,
    pub status: String,
}
