use crate::pipeline::default_ruleset_id;
use archive_models::Id;
use archive_rules::{apply_rules, parse_caption, RuleInput};
use archive_search::{SearchDocument, SearchSync};
use archive_sql::documents::ListFilter;
use sqlx::PgPool;
use std::collections::BTreeSet;

const PAGE_SIZE: i64 = 200;
const MAX_FAILURE_SAMPLES: usize = 20;

/// Result of re-running classification over a page of documents, per spec
/// §4.8. Skips documents whose recomputed category/tags/review reasons are
/// unchanged from what's already stored, so a backfill run over an
/// unmodified ruleset is a no-op.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct BackfillSummary {
    pub scanned: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failure_samples: Vec<String>,
}

pub async fn run_backfill(db: &PgPool, search: &SearchSync, filter: ListFilter) -> Result<BackfillSummary, sqlx::Error> {
    let mut summary = BackfillSummary::default();
    let mut after_id: Option<Id> = None;

    loop {
        let page = archive_sql::documents::list_page(db, &filter, after_id, PAGE_SIZE).await?;
        if page.is_empty() {
            break;
        }
        after_id = page.last().map(|d| d.id);

        for document in page {
            summary.scanned += 1;

            let existing_tags = archive_sql::documents::fetch_tags(db, document.id).await?;
            let ruleset_id = default_ruleset_id();
            let active_ruleset = archive_sql::rule_versions::fetch_active(db, ruleset_id).await?;
            let rules = active_ruleset.map(|rv| rv.rules).unwrap_or_else(|| serde_json::json!({}));

            let parsed = parse_caption(Some(&document.caption_raw), &document.title);
            let rule_ctx = RuleInput {
                title: document.title.clone(),
                description: document.description.clone(),
                filename: document.title.clone(),
                body_text: String::new(),
                metadata_date_text: None,
                ingested_at: document.ingested_at,
                caption: parsed,
            };
            let rule_out = apply_rules(&rule_ctx, &rules);

            let prior_reasons: BTreeSet<String> = document.review_reasons.0.iter().map(|r| r.as_str().to_owned()).collect();
            let new_reasons: BTreeSet<String> = rule_out.review_reasons.iter().map(|r| r.as_str().to_owned()).collect();
            let prior_tags: BTreeSet<String> = existing_tags.into_iter().collect();
            let new_tags: BTreeSet<String> = rule_out.tags.iter().cloned().collect();

            let category = match archive_sql::categories::find_or_create(db, &rule_out.category).await {
                Ok(category) => category,
                Err(err) => {
                    summary.failed += 1;
                    push_sample(&mut summary, document.id, &err.to_string());
                    continue;
                }
            };

            let unchanged = Some(category.id) == document.category_id
                && Some(rule_out.event_date) == document.event_date
                && prior_tags == new_tags
                && prior_reasons == new_reasons;

            if unchanged {
                summary.skipped += 1;
                continue;
            }

            let tags = match archive_sql::tags::find_or_create_many(db, &rule_out.tags).await {
                Ok(tags) => tags,
                Err(err) => {
                    summary.failed += 1;
                    push_sample(&mut summary, document.id, &err.to_string());
                    continue;
                }
            };

            let before = serde_json::json!({
                "category_id": document.category_id,
                "event_date": document.event_date,
                "tags": Vec::from_iter(prior_tags),
                "review_reasons": Vec::from_iter(prior_reasons),
            });

            let updated = match archive_sql::documents::apply_reclassification(
                db,
                document.id,
                &document.title,
                &document.description,
                &document.summary,
                Some(category.id),
                Some(rule_out.event_date),
                &tags.iter().map(|t| t.id).collect::<Vec<_>>(),
                rule_out.review_reasons.clone(),
                "backfill_reclassify",
            )
            .await
            {
                Ok(updated) => updated,
                Err(err) => {
                    summary.failed += 1;
                    push_sample(&mut summary, document.id, &err.to_string());
                    continue;
                }
            };

            let after = serde_json::json!({
                "category_id": updated.category_id,
                "event_date": updated.event_date,
                "tags": rule_out.tags,
                "review_reasons": rule_out.review_reasons,
            });
            archive_sql::audit_log::record(db, None, "backfill_reclassify", "document", document.id, Some(before), Some(after)).await?;

            search.enqueue_sync(vec![SearchDocument {
                id: updated.id,
                title: updated.title.clone(),
                description: updated.description.clone(),
                summary: updated.summary.clone(),
                caption_raw: updated.caption_raw.clone(),
                source: updated.source.clone(),
                source_ref: updated.source_ref.clone(),
                category_id: updated.category_id,
                category: Some(category.name.clone()),
                event_date: updated.event_date,
                ingested_at: updated.ingested_at,
                review_status: updated.review_status,
                tags: tags.iter().map(|t| t.name.clone()).collect(),
                tag_slugs: tags.iter().map(|t| t.slug.clone()).collect(),
                is_uncategorized: updated.category_id.is_none(),
            }]);

            summary.updated += 1;
        }
    }

    Ok(summary)
}

fn push_sample(summary: &mut BackfillSummary, document_id: Id, message: &str) {
    if summary.failure_samples.len() < MAX_FAILURE_SAMPLES {
        summary.failure_samples.push(format!("{document_id}: {message}"));
    }
}
