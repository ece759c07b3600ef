use std::fmt;

/// ReviewReason is a short stable code flagging a document for operator
/// attention. The set is closed: unrecognized codes from older data are
/// preserved as `Other` rather than rejected, since `review_reasons` is an
/// append-only audit signal, not a validated enum column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ReviewReason {
    ClassifyFail,
    DateMissing,
    CategoryOutOfRuleset,
    DuplicateSuspect,
    LegacyFileMissing,
    Other(String),
}

impl ReviewReason {
    pub fn as_str(&self) -> &str {
        match self {
            ReviewReason::ClassifyFail => "CLASSIFY_FAIL",
            ReviewReason::DateMissing => "DATE_MISSING",
            ReviewReason::CategoryOutOfRuleset => "CATEGORY_OUT_OF_RULESET",
            ReviewReason::DuplicateSuspect => "DUPLICATE_SUSPECT",
            ReviewReason::LegacyFileMissing => "LEGACY_FILE_MISSING",
            ReviewReason::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ReviewReason {
    fn from(value: &str) -> Self {
        match value {
            "CLASSIFY_FAIL" => ReviewReason::ClassifyFail,
            "DATE_MISSING" => ReviewReason::DateMissing,
            "CATEGORY_OUT_OF_RULESET" => ReviewReason::CategoryOutOfRuleset,
            "DUPLICATE_SUSPECT" => ReviewReason::DuplicateSuspect,
            "LEGACY_FILE_MISSING" => ReviewReason::LegacyFileMissing,
            other => ReviewReason::Other(other.to_owned()),
        }
    }
}

impl From<String> for ReviewReason {
    fn from(value: String) -> Self {
        ReviewReason::from(value.as_str())
    }
}

impl From<ReviewReason> for String {
    fn from(value: ReviewReason) -> Self {
        value.as_str().to_owned()
    }
}

/// ReviewStatus summarizes whether a document currently needs operator
/// attention. Invariant (spec #2): `NeedsReview` iff `review_reasons` is
/// non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "review_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    None,
    NeedsReview,
    Resolved,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::None => "NONE",
            ReviewStatus::NeedsReview => "NEEDS_REVIEW",
            ReviewStatus::Resolved => "RESOLVED",
        }
    }

    /// Derives the status implied by a set of review reasons, per the
    /// invariant that status and reasons never disagree. `prior` controls
    /// which status applies when reasons are empty: a document that has
    /// never needed review stays `None`, one that was previously flagged
    /// and is now clear becomes `Resolved`.
    pub fn derive(reasons: &[ReviewReason], prior: ReviewStatus) -> ReviewStatus {
        if !reasons.is_empty() {
            ReviewStatus::NeedsReview
        } else if prior == ReviewStatus::NeedsReview {
            ReviewStatus::Resolved
        } else {
            prior
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_codes() {
        for code in [
            "CLASSIFY_FAIL",
            "DATE_MISSING",
            "CATEGORY_OUT_OF_RULESET",
            "DUPLICATE_SUSPECT",
            "LEGACY_FILE_MISSING",
        ] {
            let reason = ReviewReason::from(code);
            assert_eq!(reason.as_str(), code);
        }
    }

    #[test]
    fn unknown_code_round_trips_as_other() {
        let reason = ReviewReason::from("SOME_FUTURE_CODE");
        assert_eq!(reason.as_str(), "SOME_FUTURE_CODE");
    }

    #[test]
    fn derive_matches_invariant() {
        assert_eq!(
            ReviewStatus::derive(&[ReviewReason::ClassifyFail], ReviewStatus::None),
            ReviewStatus::NeedsReview
        );
        assert_eq!(
            ReviewStatus::derive(&[], ReviewStatus::NeedsReview),
            ReviewStatus::Resolved
        );
        assert_eq!(
            ReviewStatus::derive(&[], ReviewStatus::None),
            ReviewStatus::None
        );
    }
}
