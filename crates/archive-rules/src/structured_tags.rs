use once_cell::sync::Lazy;
use regex::Regex;

static REV_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\brev(?:ision)?\.?\s*([a-z0-9\-_]+)\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9a-z]+").unwrap());

struct SetRule {
    set: &'static str,
    dockey: &'static str,
    patterns: &'static [&'static str],
}

static SET_RULES: &[SetRule] = &[
    SetRule {
        set: "dcp",
        dockey: "document-control-procedure",
        patterns: &[r"\bdcp\b", "document control procedure"],
    },
    SetRule {
        set: "general-arrangement-drawing",
        dockey: "general-arrangement-drawing",
        patterns: &["general arrangement drawing", r"\bgad\b"],
    },
];

static KIND_RULES: &[(&str, &[&str])] = &[
    ("manual", &[r"\bmanual\b", "매뉴얼"]),
    ("guide", &[r"\bguide\b", "이용 방법", "문서 교환 시스템 소개"]),
    ("account-list", &["account list", "계정 리스트", "necessaryinformation"]),
    ("drawing", &[r"\bdrawing\b", "도면"]),
    ("main", &[r"\bprocedure\b", "절차"]),
];

static LANG_RULES: &[(&str, &[&str])] = &[
    ("ko", &["한글", "국문", "korean"]),
    ("en", &["영문", "english"]),
];

fn any_match(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| {
        Regex::new(p)
            .map(|re| re.is_match(haystack))
            .unwrap_or(false)
    })
}

/// Extracts a trailing `rev:`-style token from a title, e.g. "Procedure rev.3" -> "3".
pub fn extract_revision_from_title(title: &str) -> Option<String> {
    REV_PATTERN
        .captures(title)
        .map(|caps| caps[1].to_owned())
}

fn normalize_value(value: &str) -> String {
    let lowered = WHITESPACE.replace_all(value.trim(), " ").to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_owned()
}

pub(crate) fn normalize_tag_key(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_lowercase()
}

struct StructuredTagMap {
    set: Option<String>,
    dockey: Option<String>,
    rev: Option<String>,
    kind: Option<String>,
    lang: Option<String>,
}

fn extract_structured_tag_map(tags: &[String]) -> StructuredTagMap {
    let mut map = StructuredTagMap {
        set: None,
        dockey: None,
        rev: None,
        kind: None,
        lang: None,
    };
    for raw in tags {
        let tag = raw.trim();
        let Some((key, value)) = tag.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "set" if map.set.is_none() => map.set = Some(value.to_owned()),
            "dockey" if map.dockey.is_none() => map.dockey = Some(value.to_owned()),
            "rev" if map.rev.is_none() => map.rev = Some(value.to_owned()),
            "kind" if map.kind.is_none() => map.kind = Some(value.to_owned()),
            "lang" if map.lang.is_none() => map.lang = Some(value.to_owned()),
            _ => {}
        }
    }
    map
}

/// Infers `set:`/`dockey:`/`rev:`/`kind:`/`lang:` structured tags from free
/// text when the caller hasn't supplied them explicitly. Mirrors the
/// original archive-set heuristics: title/description/filename text is
/// merged and matched against fixed keyword tables in order.
pub fn infer_structured_tags(
    title: &str,
    description: &str,
    filename: &str,
    existing_tags: &[String],
) -> Vec<String> {
    let mut inferred = Vec::new();
    let existing = extract_structured_tag_map(existing_tags);
    let mut has_set = existing.set.is_some();
    let has_dockey = existing.dockey.is_some();
    let has_rev = existing.rev.is_some();
    let has_kind = existing.kind.is_some();
    let has_lang = existing.lang.is_some();

    let merged = format!("{title} {description} {filename}").to_lowercase();

    if !has_set || !has_dockey {
        for rule in SET_RULES {
            if any_match(&merged, rule.patterns) {
                if !has_set {
                    inferred.push(format!("set:{}", rule.set));
                    has_set = true;
                }
                if !has_dockey {
                    inferred.push(format!("dockey:{}", rule.dockey));
                }
                break;
            }
        }
    }

    if !has_rev {
        let revision = extract_revision_from_title(title).or_else(|| extract_revision_from_title(filename));
        if let Some(revision) = revision {
            let normalized = normalize_value(&revision);
            if !normalized.is_empty() {
                inferred.push(format!("rev:{normalized}"));
            }
        } else if any_match(&merged, &[r"\bdraft\b"]) {
            inferred.push("rev:draft".to_owned());
        }
    }

    if !has_kind {
        for (kind, patterns) in KIND_RULES {
            if any_match(&merged, patterns) {
                inferred.push(format!("kind:{kind}"));
                break;
            }
        }
    }

    if !has_lang {
        for (lang, patterns) in LANG_RULES {
            if any_match(&merged, patterns) {
                inferred.push(format!("lang:{lang}"));
                break;
            }
        }
    }

    inferred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_set_and_dockey_from_body_text() {
        let inferred = infer_structured_tags("Document Control Procedure v2", "", "dcp_v2.pdf", &[]);
        assert!(inferred.contains(&"set:dcp".to_owned()));
        assert!(inferred.contains(&"dockey:document-control-procedure".to_owned()));
    }

    #[test]
    fn infers_revision_from_title() {
        let inferred = infer_structured_tags("Safety Manual rev.3", "", "file.pdf", &[]);
        assert!(inferred.contains(&"rev:3".to_owned()));
    }

    #[test]
    fn infers_kind_and_lang() {
        let inferred = infer_structured_tags("Korean Manual 매뉴얼", "한글 버전", "x.pdf", &[]);
        assert!(inferred.contains(&"kind:manual".to_owned()));
        assert!(inferred.contains(&"lang:ko".to_owned()));
    }

    #[test]
    fn skips_fields_already_present_in_existing_tags() {
        let existing = vec!["set:dcp".to_owned(), "dockey:custom".to_owned()];
        let inferred = infer_structured_tags("Document Control Procedure", "", "f.pdf", &existing);
        assert!(!inferred.iter().any(|t| t.starts_with("set:")));
        assert!(!inferred.iter().any(|t| t.starts_with("dockey:")));
    }
}
