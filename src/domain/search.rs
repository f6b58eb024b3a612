//! Search text and local, case-insensitive substring filtering.

use super::entities::{ActivityEntry, GalleryImage, Project};
use std::fmt;

/// Address-bar parameter carrying the search text.
pub const SEARCH_PARAM: &str = "q";

/// Current search text. Missing or malformed input is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn from_optional(text: Option<&str>) -> Self {
        text.map(Self::new).unwrap_or_default()
    }

    /// Raw text as typed (what the input widget and the URL hold).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercased, trimmed needle. `None` means "no filter".
    pub fn needle(&self) -> Option<String> {
        let q = self.0.trim();
        if q.is_empty() {
            None
        } else {
            Some(q.to_lowercase())
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchQuery {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SearchQuery {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Items a list view can filter. Each view decides which fields take part.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;

    /// `needle` must already be lowercased.
    fn matches(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|f| f.to_lowercase().contains(needle))
    }
}

/// Admin project list: title, slug, description and tags.
impl Searchable for Project {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.title.as_str(),
            self.slug.as_str(),
            self.description.as_str(),
        ];
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }
}

/// Dashboard activity: project title and action.
impl Searchable for ActivityEntry {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.project.as_str(), self.action.as_str()]
    }
}

impl Searchable for GalleryImage {
    fn search_fields(&self) -> Vec<&str> {
        self.title.as_deref().into_iter().collect()
    }
}

/// Dashboard "top projects" card: only title and slug.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCard<'a>(pub &'a Project);

impl Searchable for ProjectCard<'_> {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.0.title.as_str(), self.0.slug.as_str()]
    }
}

/// Items of `items` matching `query`; all of them when the query is blank.
pub fn filter_items<'a, T: Searchable>(items: &'a [T], query: &SearchQuery) -> Vec<&'a T> {
    match query.needle() {
        None => items.iter().collect(),
        Some(needle) => items.iter().filter(|i| i.matches(&needle)).collect(),
    }
}
