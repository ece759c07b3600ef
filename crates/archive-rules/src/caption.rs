use once_cell::sync::Lazy;
use regex::Regex;

/// Result of parsing a free-form upload caption into its structured parts.
/// `caption_raw` is preserved verbatim (the document's immutable
/// `caption_raw` column comes straight from here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCaption {
    pub title: String,
    pub description: String,
    pub caption_raw: String,
    pub explicit_category: Option<String>,
    pub explicit_date: Option<String>,
    pub explicit_tags: Vec<String>,
}

static CATEGORY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^#분류\s*:\s*(.+)$").unwrap());
static DATE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^#날짜\s*:\s*(.+)$").unwrap());
static TAGS_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^#태그\s*:\s*(.+)$").unwrap());

/// Sanitizes a filename into a human title: drop any directory prefix and
/// extension, collapse underscores/hyphens into spaces.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit('/')
        .next()
        .unwrap_or(filename)
        .rsplit('\\')
        .next()
        .unwrap_or(filename);
    let stem = match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    };
    let collapsed = stem.replace(['_', '-'], " ");
    let collapsed: String = collapsed.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "Untitled".to_owned()
    } else {
        collapsed
    }
}

/// Normalizes literal `\n`/`\r\n` escape sequences into real newlines, but
/// only when no real newline is already present — some manual-upload
/// clients send captions with the escape sequences as plain text.
fn normalize_caption_text(caption: &str) -> String {
    if !caption.contains('\n') && caption.contains("\\n") {
        caption.replace("\\r\\n", "\n").replace("\\n", "\n")
    } else {
        caption.to_owned()
    }
}

/// Parses a caption per spec §4.3: the first non-empty line is the title
/// (or a sanitized filename stem when the caption is empty), subsequent
/// `#분류:`/`#날짜:`/`#태그:` lines become explicit fields, and everything
/// else forms the description.
pub fn parse_caption(caption: Option<&str>, filename: &str) -> ParsedCaption {
    let caption_raw = caption.unwrap_or("").to_owned();
    let has_content = caption.map(|c| !c.trim().is_empty()).unwrap_or(false);

    let (title, body_lines): (String, Vec<String>) = if has_content {
        let normalized = normalize_caption_text(caption.unwrap());
        let non_empty: Vec<String> = normalized
            .lines()
            .map(|l| l.trim_end().to_owned())
            .filter(|l| !l.trim().is_empty())
            .collect();
        let title = non_empty
            .first()
            .map(|l| l.trim().to_owned())
            .unwrap_or_else(|| sanitize_filename(filename));
        let body = if non_empty.len() > 1 {
            non_empty[1..].to_vec()
        } else {
            Vec::new()
        };
        (title, body)
    } else {
        (sanitize_filename(filename), Vec::new())
    };

    let mut explicit_category = None;
    let mut explicit_date = None;
    let mut explicit_tags = Vec::new();
    let mut description_lines = Vec::new();

    for line in &body_lines {
        let trimmed = line.trim();
        if let Some(caps) = CATEGORY_LINE.captures(trimmed) {
            explicit_category = Some(caps[1].trim().to_owned());
        } else if let Some(caps) = DATE_LINE.captures(trimmed) {
            explicit_date = Some(caps[1].trim().to_owned());
        } else if let Some(caps) = TAGS_LINE.captures(trimmed) {
            explicit_tags = caps[1]
                .split(',')
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect();
        } else {
            description_lines.push(line.clone());
        }
    }

    ParsedCaption {
        title,
        description: description_lines.join("\n").trim().to_owned(),
        caption_raw,
        explicit_category,
        explicit_date,
        explicit_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_fields_and_description() {
        let caption =
            "주간 회의\n진행상황 공유\n#분류:회의\n#날짜:2026-02-24\n#태그:alpha,beta";
        let parsed = parse_caption(Some(caption), "meeting.pdf");
        assert_eq!(parsed.title, "주간 회의");
        assert_eq!(parsed.description, "진행상황 공유");
        assert_eq!(parsed.explicit_category.as_deref(), Some("회의"));
        assert_eq!(parsed.explicit_date.as_deref(), Some("2026-02-24"));
        assert_eq!(parsed.explicit_tags, vec!["alpha", "beta"]);
    }

    #[test]
    fn empty_caption_falls_back_to_filename() {
        let parsed = parse_caption(None, "weekly_report_final.pdf");
        assert_eq!(parsed.title, "weekly report final");
        assert_eq!(parsed.description, "");
    }

    #[test]
    fn normalizes_literal_escape_newlines() {
        let parsed = parse_caption(Some("Title\\nBody line"), "f.pdf");
        assert_eq!(parsed.title, "Title");
        assert_eq!(parsed.description, "Body line");
    }

    #[test]
    fn sanitize_filename_strips_extension_and_separators() {
        assert_eq!(sanitize_filename("dir/sub-dir/my_file-name.pdf"), "my file name");
        assert_eq!(sanitize_filename("noext"), "noext");
    }
}
