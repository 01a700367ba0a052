use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Date,
    Title,
    Likes,
    Downloads,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Title => "title",
            Self::Likes => "likes",
            Self::Downloads => "downloads",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "title" => Ok(Self::Title),
            "likes" => Ok(Self::Likes),
            "downloads" => Ok(Self::Downloads),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's current query constraints for one catalog.
///
/// A value type: the `with_*` builders consume `self` and hand back a new
/// filter, so a loader holding the previous value can compare by equality.
/// Blank text normalizes to "unset"; picking "all" in a select box and
/// never touching it are the same filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    query: Option<String>,
    university: Option<String>,
    department: Option<String>,
    year: Option<String>,
    semester: Option<String>,
    sort_by: Option<SortKey>,
    sort_order: Option<SortOrder>,
}

fn normalized(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default listing order: newest first.
    pub fn newest_first() -> Self {
        Self::default()
            .with_sort(SortKey::Date)
            .with_order(SortOrder::Desc)
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        Self { query: normalized(query), ..self }
    }

    pub fn with_university(self, university: impl Into<String>) -> Self {
        Self { university: normalized(university), ..self }
    }

    pub fn with_department(self, department: impl Into<String>) -> Self {
        Self { department: normalized(department), ..self }
    }

    pub fn with_year(self, year: impl Into<String>) -> Self {
        Self { year: normalized(year), ..self }
    }

    pub fn with_semester(self, semester: impl Into<String>) -> Self {
        Self { semester: normalized(semester), ..self }
    }

    pub fn with_sort(self, sort_by: SortKey) -> Self {
        Self { sort_by: Some(sort_by), ..self }
    }

    pub fn with_order(self, sort_order: SortOrder) -> Self {
        Self { sort_order: Some(sort_order), ..self }
    }

    /// Drop every constraint but keep the ordering.
    pub fn cleared(self) -> Self {
        Self {
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            ..Self::default()
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn university(&self) -> Option<&str> {
        self.university.as_deref()
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn semester(&self) -> Option<&str> {
        self.semester.as_deref()
    }

    pub fn sort_by(&self) -> Option<SortKey> {
        self.sort_by
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort_order
    }

    /// Query-string pairs for the collection endpoint. Unset fields are omitted.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("search", &self.query),
            ("university", &self.university),
            ("department", &self.department),
            ("year", &self.year),
            ("semester", &self.semester),
        ];
        let mut params: Vec<(&'static str, String)> = text
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect();
        if let Some(sort_by) = self.sort_by {
            params.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(sort_order) = self.sort_order {
            params.push(("sort_order", sort_order.as_str().to_string()));
        }
        params
    }
}

/// Case-insensitive substring match of `query` against an item's text fields.
/// A blank query matches everything.
pub fn matches_query<T: CatalogItem>(item: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Distinct filter values present in the loaded items, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub universities: Vec<String>,
    pub departments: Vec<String>,
    pub years: Vec<String>,
    pub semesters: Vec<String>,
}

impl Facets {
    pub fn collect<'a, T: CatalogItem + 'a>(items: impl IntoIterator<Item = &'a T>) -> Self {
        fn push(bucket: &mut Vec<String>, value: Option<&str>) {
            if let Some(value) = value {
                if !bucket.iter().any(|v| v == value) {
                    bucket.push(value.to_string());
                }
            }
        }

        let mut facets = Self::default();
        for item in items {
            let f = item.facets();
            push(&mut facets.universities, f.university);
            push(&mut facets.departments, f.department);
            push(&mut facets.years, f.year);
            push(&mut facets.semesters, f.semester);
        }
        facets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Note;
    use serde_json::json;

    fn note(id: u64, title: &str, university: &str) -> Note {
        serde_json::from_value(json!({"id": id, "title": title, "university": university}))
            .unwrap()
    }

    #[test]
    fn equality_is_structural_and_blank_is_unset() {
        let a = FilterState::newest_first().with_university("METU");
        let b = FilterState::newest_first().with_university(" METU ");
        assert_eq!(a, b);
        assert_eq!(FilterState::new().with_query("   "), FilterState::new());
        assert_ne!(a.clone().with_year("2023"), a);
    }

    #[test]
    fn builders_leave_the_source_filter_alone() {
        let base = FilterState::new().with_department("Physics");
        let narrowed = base.clone().with_semester("Fall");
        assert_eq!(base.semester(), None);
        assert_eq!(narrowed.semester(), Some("Fall"));
        assert_eq!(narrowed.clone().cleared().department(), None);
    }

    #[test]
    fn params_only_carry_populated_fields() {
        let filter = FilterState::newest_first()
            .with_query("integrals")
            .with_year("2024");
        assert_eq!(
            filter.query_params(),
            vec![
                ("search", "integrals".to_string()),
                ("year", "2024".to_string()),
                ("sort_by", "date".to_string()),
                ("sort_order", "desc".to_string()),
            ]
        );
        assert!(FilterState::new().query_params().is_empty());
    }

    #[test]
    fn query_matches_any_text_field() {
        let item = note(1, "Linear Algebra", "Bogazici");
        assert!(matches_query(&item, "algebra"));
        assert!(matches_query(&item, "BOGAZ"));
        assert!(matches_query(&item, ""));
        assert!(!matches_query(&item, "chemistry"));
    }

    #[test]
    fn facets_keep_first_seen_order() {
        let items = vec![note(1, "a", "METU"), note(2, "b", "ITU"), note(3, "c", "METU")];
        let facets = Facets::collect(&items);
        assert_eq!(facets.universities, vec!["METU", "ITU"]);
        assert!(facets.semesters.is_empty());
    }

    #[test]
    fn sort_values_parse() {
        assert_eq!("Likes".parse::<SortKey>(), Ok(SortKey::Likes));
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
