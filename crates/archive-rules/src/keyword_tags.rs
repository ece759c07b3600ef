use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::structured_tags::normalize_tag_key;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "from", "this", "that", "document", "file", "title",
        "description", "manual", "note", "분류", "날짜", "태그", "문서", "파일", "제목", "설명",
        "작성", "수정", "및", "또는", "그리고",
    ]
    .into_iter()
    .collect()
});

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9A-Za-z가-힣]{2,}").unwrap());
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,8}$").unwrap());

const DEFAULT_MAX_COUNT: usize = 12;

/// Extracts lightweight free-text keyword tags from title/description/caption,
/// skipping stopwords, pure-digit runs, and anything already present.
pub fn extract_keyword_tags(
    title: &str,
    description: &str,
    caption_raw: &str,
    existing_tags: &[String],
) -> Vec<String> {
    extract_keyword_tags_limited(title, description, caption_raw, existing_tags, DEFAULT_MAX_COUNT)
}

fn extract_keyword_tags_limited(
    title: &str,
    description: &str,
    caption_raw: &str,
    existing_tags: &[String],
    max_count: usize,
) -> Vec<String> {
    let merged = format!("{title} {description} {caption_raw}");
    let merged = merged.trim();
    if merged.is_empty() {
        return Vec::new();
    }

    let mut existing_keys: HashSet<String> = existing_tags
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| normalize_tag_key(t))
        .collect();

    let mut inferred = Vec::new();
    for token in TOKEN_PATTERN.find_iter(merged) {
        let token = token.as_str();
        let lowered = token.to_lowercase();
        if STOPWORDS.contains(lowered.as_str()) {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if DIGIT_RUN.is_match(token) {
            continue;
        }

        let normalized = if token.is_ascii() { lowered } else { token.to_owned() };
        let key = normalize_tag_key(&normalized);
        if existing_keys.contains(&key) {
            continue;
        }

        inferred.push(normalized);
        existing_keys.insert(key);
        if inferred.len() >= max_count {
            break;
        }
    }

    inferred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_non_stopword_tokens() {
        let tags = extract_keyword_tags("Weekly Safety Briefing", "", "", &[]);
        assert!(tags.contains(&"weekly".to_owned()));
        assert!(tags.contains(&"safety".to_owned()));
        assert!(tags.contains(&"briefing".to_owned()));
    }

    #[test]
    fn skips_stopwords_and_digit_runs() {
        let tags = extract_keyword_tags("the manual 2026", "", "", &[]);
        assert!(!tags.contains(&"the".to_owned()));
        assert!(!tags.contains(&"manual".to_owned()));
        assert!(!tags.contains(&"2026".to_owned()));
    }

    #[test]
    fn skips_tags_already_present() {
        let existing = vec!["safety".to_owned()];
        let tags = extract_keyword_tags("Safety Briefing", "", "", &existing);
        assert!(!tags.contains(&"safety".to_owned()));
        assert!(tags.contains(&"briefing".to_owned()));
    }

    #[test]
    fn caps_at_max_count() {
        let title = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi";
        let tags = extract_keyword_tags(title, "", "", &[]);
        assert_eq!(tags.len(), 12);
    }
}
