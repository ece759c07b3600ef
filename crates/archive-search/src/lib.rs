mod db_fallback;
mod document;
mod error;
mod external;
mod port;
mod sync;

pub use db_fallback::{reindex_ids, DbFallbackIndex};
pub use document::{SearchDocument, SearchFilter, SearchQuery, SearchResult, SortField, SortOrder};
pub use error::SearchSyncError;
pub use external::ExternalIndex;
pub use port::SearchIndexPort;
pub use sync::SearchSync;

#[cfg(test)]
mod tests {
    use super::*;
    use archive_models::Id;

    fn sample_document() -> SearchDocument {
        SearchDocument {
            id: Id::generate(),
            title: "Monthly report".into(),
            description: "budget summary".into(),
            summary: String::new(),
            caption_raw: String::new(),
            source: "upload".into(),
            source_ref: None,
            category_id: None,
            category: None,
            event_date: None,
            ingested_at: chrono::Utc::now(),
            review_status: archive_models::ReviewStatus::None,
            tags: vec!["finance".into()],
            tag_slugs: vec!["finance".into()],
            is_uncategorized: true,
        }
    }

    #[test]
    fn search_query_offset_is_zero_based() {
        let query = SearchQuery {
            text: "budget".into(),
            page: 1,
            size: 20,
            sort_by: SortField::EventDate,
            sort_order: SortOrder::Desc,
            filter: SearchFilter::default(),
        };
        assert_eq!(query.offset(), 0);

        let query = SearchQuery { page: 3, ..query };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn search_document_round_trips_through_json() {
        let doc = sample_document();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["title"], "Monthly report");
        let back: SearchDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, doc.id);
    }
}
