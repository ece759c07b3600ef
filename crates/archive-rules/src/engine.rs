use std::collections::{BTreeMap, HashSet};

use archive_models::ReviewReason;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;

use crate::caption::ParsedCaption;
use crate::date::parse_event_date_from_text;
use crate::keyword_tags::extract_keyword_tags;
use crate::structured_tags::{infer_structured_tags, normalize_tag_key};

const AUTO_TAG_LIMIT: usize = 3;

static KIND_CATEGORY_MAP: &[(&str, &str)] = &[
    ("manual", "매뉴얼"),
    ("guide", "가이드"),
    ("account-list", "계정 리스트"),
    ("drawing", "도면"),
    ("main", "절차"),
];

static SET_CATEGORY_MAP: &[(&str, &str)] = &[
    ("dcp", "DCP"),
    ("general-arrangement-drawing", "General Arrangement Drawing"),
];

static GENERIC_CATEGORY_KEYS: &[&str] = &["기타", "default", "misc", "unknown", "uncategorized", "미분류"];

/// Everything the rule engine needs to classify one document. All text
/// fields arrive already normalized by [`crate::caption::parse_caption`].
#[derive(Debug, Clone)]
pub struct RuleInput {
    pub caption: ParsedCaption,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub body_text: String,
    pub metadata_date_text: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutput {
    pub category: String,
    pub tags: Vec<String>,
    pub event_date: NaiveDate,
    pub review_reasons: Vec<ReviewReason>,
}

fn as_str_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn as_object_list(value: Option<&JsonValue>) -> Vec<&serde_json::Map<String, JsonValue>> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(JsonValue::as_object).collect())
        .unwrap_or_default()
}

fn slugify_for_category(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "-")
}

/// Collects the closed set of category names a ruleset allows, from
/// `category_rules[].category`, `tag_category_rules[].category`, and
/// `default_category`, falling back to "기타" when the ruleset names none.
fn extract_categories_from_rules_json(rules: &JsonValue) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut add = |raw: Option<&str>| {
        let Some(name) = raw.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };
        let key = slugify_for_category(name);
        if seen.insert(key) {
            names.push(name.to_owned());
        }
    };

    for rule in as_object_list(rules.get("category_rules")) {
        add(rule.get("category").and_then(JsonValue::as_str));
    }
    for rule in as_object_list(rules.get("tag_category_rules")) {
        add(rule.get("category").and_then(JsonValue::as_str));
    }
    add(rules.get("default_category").and_then(JsonValue::as_str));

    if names.is_empty() {
        names.push("기타".to_owned());
    }
    names
}

fn build_allowed_category_map(rules: &JsonValue) -> BTreeMap<String, String> {
    let mut allowed = BTreeMap::new();
    for name in extract_categories_from_rules_json(rules) {
        let key = normalize_tag_key(&name);
        allowed.entry(key).or_insert(name);
    }
    allowed
}

fn match_keywords(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

fn extract_structured_tag_map(tags: &[String]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for raw in tags {
        let tag = raw.trim();
        let Some((key, value)) = tag.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.entry(key).or_insert_with(|| value.to_owned());
    }
    map
}

fn tag_matches_pattern(tag_values: &HashSet<String>, pattern: &str) -> bool {
    let normalized_pattern = normalize_tag_key(pattern);
    if normalized_pattern.is_empty() {
        return false;
    }
    if let Some(prefix) = normalized_pattern.strip_suffix('*') {
        if prefix.is_empty() {
            return false;
        }
        return tag_values.iter().any(|v| v.starts_with(prefix));
    }
    tag_values.contains(&normalized_pattern)
}

fn infer_category_from_tag_rules(tags: &[String], rules: &JsonValue) -> Option<String> {
    let tag_rules = as_object_list(rules.get("tag_category_rules"));
    if tag_rules.is_empty() {
        return None;
    }
    let normalized_tags: HashSet<String> = tags
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| normalize_tag_key(t))
        .collect();
    if normalized_tags.is_empty() {
        return None;
    }

    for rule in tag_rules {
        let category = rule.get("category").and_then(JsonValue::as_str).unwrap_or("").trim();
        let patterns = as_str_list(rule.get("tags"));
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).filter(|p| !p.is_empty()).collect();
        if category.is_empty() || patterns.is_empty() {
            continue;
        }
        let match_all = rule
            .get("match")
            .and_then(JsonValue::as_str)
            .map(|m| m.trim().to_lowercase() == "all")
            .unwrap_or(false);
        let matched = if match_all {
            patterns.iter().all(|p| tag_matches_pattern(&normalized_tags, p))
        } else {
            patterns.iter().any(|p| tag_matches_pattern(&normalized_tags, p))
        };
        if matched {
            return Some(category.to_owned());
        }
    }
    None
}

fn choose_plain_tag_as_category(tags: &[String], default_category: &str) -> Option<String> {
    let mut generic_keys: HashSet<String> = GENERIC_CATEGORY_KEYS.iter().map(|k| normalize_tag_key(k)).collect();
    generic_keys.insert(normalize_tag_key(default_category));

    for raw in tags {
        let tag = raw.trim();
        if tag.is_empty() || tag.contains(':') {
            continue;
        }
        let key = normalize_tag_key(tag);
        if generic_keys.contains(&key) {
            continue;
        }
        if tag.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '_' | '/' | '-')) {
            continue;
        }
        return Some(tag.to_owned());
    }
    None
}

fn infer_category_from_tags(
    explicit_tags: &[String],
    auto_tag_candidates: &[String],
    rules: &JsonValue,
    default_category: &str,
    allow_auto_plain_fallback: bool,
) -> Option<String> {
    let mut seen = HashSet::new();
    let mut ordered_tags = Vec::new();
    for raw in explicit_tags.iter().chain(auto_tag_candidates.iter()) {
        let tag = raw.trim();
        if tag.is_empty() {
            continue;
        }
        let key = normalize_tag_key(tag);
        if seen.insert(key) {
            ordered_tags.push(tag.to_owned());
        }
    }
    if ordered_tags.is_empty() {
        return None;
    }

    if let Some(category) = infer_category_from_tag_rules(&ordered_tags, rules) {
        return Some(category);
    }

    let structured = extract_structured_tag_map(&ordered_tags);
    if let Some(kind) = structured.get("kind") {
        let kind = kind.to_lowercase();
        if let Some((_, category)) = KIND_CATEGORY_MAP.iter().find(|(k, _)| *k == kind) {
            return Some((*category).to_owned());
        }
    }
    if let Some(set_key) = structured.get("set") {
        let set_key = set_key.to_lowercase();
        if let Some((_, category)) = SET_CATEGORY_MAP.iter().find(|(k, _)| *k == set_key) {
            return Some((*category).to_owned());
        }
    }

    if allow_auto_plain_fallback {
        choose_plain_tag_as_category(&ordered_tags, default_category)
    } else {
        None
    }
}

/// Classifies one document: resolves its category, derives tags, and picks
/// an event date, exactly per the priority order resolved in spec §4.2.
/// `rules` is the active ruleset's `rules` JSON column
/// ([`archive_models::RuleVersion::rules`]); an empty object behaves as the
/// default ruleset (category "기타", no category/tag rules).
pub fn apply_rules(ctx: &RuleInput, rules: &JsonValue) -> RuleOutput {
    let empty = JsonValue::Object(Default::default());
    let rules = if rules.is_object() { rules } else { &empty };
    let mut allowed_category_map = build_allowed_category_map(rules);

    let default_category_raw = rules.get("default_category").and_then(JsonValue::as_str).unwrap_or("").trim();
    let mut default_category = if default_category_raw.is_empty() {
        "기타".to_owned()
    } else {
        default_category_raw.to_owned()
    };
    let default_key = normalize_tag_key(&default_category);
    if let Some(allowed) = allowed_category_map.get(&default_key) {
        default_category = allowed.clone();
    } else {
        allowed_category_map.insert(default_key, default_category.clone());
    }

    let resolve_allowed_category = |raw: &str, map: &BTreeMap<String, String>| -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        map.get(&normalize_tag_key(raw)).cloned()
    };

    let category_rules = as_object_list(rules.get("category_rules"));

    let mut review_reasons: Vec<ReviewReason> = Vec::new();

    let explicit_tags: Vec<String> = ctx
        .caption
        .explicit_tags
        .iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();
    let tags = explicit_tags.clone();
    let mut auto_tag_candidates: Vec<String> = Vec::new();

    let mut category_resolved = false;
    let mut category = default_category.clone();

    if let Some(explicit_category) = ctx.caption.explicit_category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(allowed) = resolve_allowed_category(explicit_category, &allowed_category_map) {
            category = allowed;
            category_resolved = true;
        } else {
            review_reasons.push(ReviewReason::CategoryOutOfRuleset);
        }
    }

    if !category_resolved {
        let ordered_sources: [(&str, &str); 4] = [
            ("title", ctx.title.as_str()),
            ("description", ctx.description.as_str()),
            ("filename", ctx.filename.as_str()),
            ("body", ctx.body_text.as_str()),
        ];

        'outer: for (source_name, text) in ordered_sources {
            if text.is_empty() {
                continue;
            }
            for rule in &category_rules {
                let keywords = rule
                    .get("keywords")
                    .and_then(JsonValue::as_object)
                    .and_then(|kw| kw.get(source_name))
                    .map(|v| as_str_list(Some(v)))
                    .unwrap_or_default();
                if !keywords.is_empty() && match_keywords(text, &keywords) {
                    category = rule
                        .get("category")
                        .and_then(JsonValue::as_str)
                        .and_then(|raw| resolve_allowed_category(raw.trim(), &allowed_category_map))
                        .unwrap_or_else(|| default_category.clone());
                    auto_tag_candidates.extend(as_str_list(rule.get("tags")));
                    category_resolved = true;
                    break 'outer;
                }
            }
        }
    }

    let date_candidates: [Option<&str>; 5] = [
        ctx.caption.explicit_date.as_deref(),
        Some(ctx.caption.caption_raw.as_str()),
        Some(ctx.title.as_str()),
        Some(ctx.filename.as_str()),
        ctx.metadata_date_text.as_deref(),
    ];
    let mut event_date = None;
    for candidate in date_candidates {
        if let Some(parsed) = parse_event_date_from_text(candidate, ctx.ingested_at) {
            event_date = Some(parsed);
            break;
        }
    }
    let event_date = event_date.unwrap_or_else(|| {
        review_reasons.push(ReviewReason::DateMissing);
        ctx.ingested_at.date_naive()
    });

    let inferred = infer_structured_tags(
        &ctx.title,
        &ctx.description,
        &ctx.filename,
        &tags.iter().chain(auto_tag_candidates.iter()).cloned().collect::<Vec<_>>(),
    );
    auto_tag_candidates.extend(inferred);

    auto_tag_candidates.extend(extract_keyword_tags(
        &ctx.title,
        &ctx.description,
        &ctx.caption.caption_raw,
        &tags.iter().chain(auto_tag_candidates.iter()).cloned().collect::<Vec<_>>(),
    ));

    if !category_resolved {
        let inferred_category = infer_category_from_tags(
            &explicit_tags,
            &auto_tag_candidates,
            rules,
            &default_category,
            false,
        );
        match inferred_category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => match resolve_allowed_category(raw, &allowed_category_map) {
                Some(allowed) => {
                    category = allowed;
                    category_resolved = true;
                }
                None => review_reasons.push(ReviewReason::CategoryOutOfRuleset),
            },
            None => review_reasons.push(ReviewReason::ClassifyFail),
        }
    }

    if !category_resolved && !review_reasons.contains(&ReviewReason::ClassifyFail) {
        review_reasons.push(ReviewReason::ClassifyFail);
    }

    if category != default_category {
        auto_tag_candidates.push(category.clone());
    }

    let explicit_keys: HashSet<String> = tags.iter().map(|t| normalize_tag_key(t)).collect();
    let mut auto_keys: HashSet<String> = HashSet::new();
    let mut limited_auto_tags = Vec::new();
    for raw in &auto_tag_candidates {
        let tag = raw.trim();
        if tag.is_empty() {
            continue;
        }
        let key = normalize_tag_key(tag);
        if explicit_keys.contains(&key) || auto_keys.contains(&key) {
            continue;
        }
        auto_keys.insert(key);
        limited_auto_tags.push(tag.to_owned());
        if limited_auto_tags.len() >= AUTO_TAG_LIMIT {
            break;
        }
    }

    let mut all_tags: Vec<String> = tags.into_iter().chain(limited_auto_tags).collect();
    all_tags.sort();
    all_tags.dedup();

    RuleOutput {
        category,
        tags: all_tags,
        event_date,
        review_reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::parse_caption;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 24, 0, 0, 0).unwrap()
    }

    fn input(caption: Option<&str>, filename: &str) -> RuleInput {
        let parsed = parse_caption(caption, filename);
        RuleInput {
            title: parsed.title.clone(),
            description: parsed.description.clone(),
            filename: filename.to_owned(),
            body_text: String::new(),
            metadata_date_text: None,
            ingested_at: now(),
            caption: parsed,
        }
    }

    #[test]
    fn explicit_category_wins_when_in_ruleset() {
        let rules = json!({ "default_category": "기타", "category_rules": [{ "category": "회의" }] });
        let ctx = input(Some("제목\n#분류:회의\n#날짜:2026-02-24"), "f.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.category, "회의");
        assert!(out.review_reasons.is_empty());
    }

    #[test]
    fn explicit_category_out_of_ruleset_flags_review() {
        let rules = json!({ "default_category": "기타" });
        let ctx = input(Some("제목\n#분류:없는카테고리"), "f.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.category, "기타");
        assert!(out.review_reasons.contains(&ReviewReason::CategoryOutOfRuleset));
    }

    #[test]
    fn keyword_rule_matches_title_before_description() {
        let rules = json!({
            "category_rules": [
                { "category": "안전", "keywords": { "title": ["안전"] } }
            ]
        });
        let ctx = input(Some("안전 점검 보고서"), "report.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.category, "안전");
    }

    #[test]
    fn missing_date_falls_back_to_ingest_time_and_flags_review() {
        let rules = json!({});
        let ctx = input(Some("아무 제목"), "noextdate.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.event_date, now().date_naive());
        assert!(out.review_reasons.contains(&ReviewReason::DateMissing));
    }

    #[test]
    fn unclassifiable_document_flags_classify_fail() {
        let rules = json!({});
        let ctx = input(Some("ab cd"), "ab.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.category, "기타");
        assert!(out.review_reasons.contains(&ReviewReason::ClassifyFail));
    }

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let rules = json!({});
        let ctx = input(Some("제목\n#태그:alpha,alpha,beta"), "f.pdf");
        let out = apply_rules(&ctx, &rules);
        assert_eq!(out.tags.iter().filter(|t| *t == "alpha").count(), 1);
        let mut sorted = out.tags.clone();
        sorted.sort();
        assert_eq!(out.tags, sorted);
    }
}
