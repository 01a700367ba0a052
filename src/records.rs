use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{CatalogItem, ItemFacets, ItemId, Resource, ResourceKind};

/// Accepts a label as a string, a number, or an object with a `name` field.
/// The backend has shipped all three for `university` and `department`.
fn de_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| label_from_value(&value)))
}

fn label_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(label_from_value),
        _ => None,
    }
}

/// Counters arrive as numbers, numeric strings, or null.
fn de_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_label")]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub semester: Option<String>,
    #[serde(default)]
    pub storage_link: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    pub downloads: Option<u64>,
    #[serde(default, deserialize_with = "de_label")]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CatalogItem for Note {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(
            [&self.subject, &self.university, &self.department]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }

    fn facets(&self) -> ItemFacets<'_> {
        ItemFacets {
            university: self.university.as_deref(),
            department: self.department.as_deref(),
            year: self.year.as_deref(),
            semester: self.semester.as_deref(),
        }
    }
}

impl Resource for Note {
    const KIND: ResourceKind = ResourceKind::Notes;
}

/// Exams are named `name` by the API; older payloads used `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub total_marks: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    pub duration: Option<u64>, // minutes
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub semester: Option<String>,
    #[serde(default)]
    pub storage_link: Option<String>,
}

impl CatalogItem for Exam {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn title(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title()];
        fields.extend(
            [&self.description, &self.university, &self.department]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }

    fn facets(&self) -> ItemFacets<'_> {
        ItemFacets {
            university: self.university.as_deref(),
            department: self.department.as_deref(),
            year: self.year.as_deref(),
            semester: self.semester.as_deref(),
        }
    }
}

impl Resource for Exam {
    const KIND: ResourceKind = ResourceKind::Exams;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub creator: Option<String>,
    #[serde(default)]
    pub storage_link: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub likes_count: Option<u64>,
    #[serde(default, deserialize_with = "de_count")]
    pub downloads_count: Option<u64>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl CatalogItem for Article {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(
            [&self.excerpt, &self.summary, &self.university, &self.department]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }

    fn facets(&self) -> ItemFacets<'_> {
        ItemFacets {
            university: self.university.as_deref(),
            department: self.department.as_deref(),
            year: self.year.as_deref(),
            semester: self.semester.as_deref(),
        }
    }
}

impl Resource for Article {
    const KIND: ResourceKind = ResourceKind::Articles;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "startDate", alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate", alias = "end_date")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub organizer: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "de_label")]
    pub department: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>, // academic | social | career | other
    #[serde(default, rename = "isOnline", alias = "is_online")]
    pub is_online: bool,
    #[serde(default, rename = "registrationUrl", alias = "registration_url")]
    pub registration_url: Option<String>,
}

impl CatalogItem for Event {
    fn item_id(&self) -> &ItemId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(
            [&self.description, &self.university, &self.department]
                .into_iter()
                .filter_map(|f| f.as_deref()),
        );
        fields
    }

    fn facets(&self) -> ItemFacets<'_> {
        ItemFacets {
            university: self.university.as_deref(),
            department: self.department.as_deref(),
            ..ItemFacets::default()
        }
    }
}

impl Resource for Event {
    const KIND: ResourceKind = ResourceKind::Events;
}
