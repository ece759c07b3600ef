use archive_models::{Id, ReviewStatus};
use chrono::{DateTime, NaiveDate, Utc};

/// The denormalized, search-shaped projection of a document — the same
/// fields the original synced into its external index, carried as a typed
/// struct instead of an ad hoc dict.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchDocument {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub caption_raw: String,
    pub source: String,
    pub source_ref: Option<String>,
    pub category_id: Option<Id>,
    pub category: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub ingested_at: DateTime<Utc>,
    pub review_status: ReviewStatus,
    pub tags: Vec<String>,
    pub tag_slugs: Vec<String>,
    pub is_uncategorized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    EventDate,
    IngestedAt,
    Title,
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::EventDate => "event_date",
            SortField::IngestedAt => "ingested_at",
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A typed equivalent of the original's ad hoc filter-expression builder:
/// each field is a structured clause instead of a hand-escaped string
/// fragment, so backends that understand structure (the DB fallback) never
/// need to parse a query-language string back apart.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub category_id: Option<Id>,
    pub tag_slug: Option<String>,
    pub event_date_from: Option<NaiveDate>,
    pub event_date_to: Option<NaiveDate>,
    pub review_status: Option<ReviewStatus>,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub page: u32,
    pub size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub filter: SearchFilter,
}

impl SearchQuery {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.size.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub ids: Vec<Id>,
    pub total: u64,
}
