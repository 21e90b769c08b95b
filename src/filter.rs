use std::collections::HashSet;

/// Keywords that always mark a listing as interesting.
pub const BASE_KEYWORDS: &[&str] = &["artist", "signed", "signature"];

/// Added with `--altered`.
pub const ALTERED_KEYWORDS: &[&str] = &["alter"];

/// Added with `--graded`.
pub const GRADED_KEYWORDS: &[&str] = &["graded", "bgs", "cgc", "psa", "tcg"];

/// Which optional keyword groups are active for this run. Immutable once the
/// command line is parsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterConfig {
    pub include_altered: bool,
    pub include_graded: bool,
}

impl FilterConfig {
    pub fn keywords(&self) -> Vec<&'static str> {
        let mut keywords = BASE_KEYWORDS.to_vec();
        if self.include_altered {
            keywords.extend_from_slice(ALTERED_KEYWORDS);
        }
        if self.include_graded {
            keywords.extend_from_slice(GRADED_KEYWORDS);
        }
        keywords
    }
}

/// True iff any active keyword occurs in the lower-cased title. Blank titles
/// never match.
pub fn title_matches(title: &str, config: &FilterConfig) -> bool {
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return false;
    }
    config.keywords().iter().any(|keyword| title.contains(keyword))
}

/// Normalize a raw title: trim and drop the trailing "View Details" UI
/// affordance the site appends to the title block.
pub fn clean_title(raw: &str) -> String {
    raw.trim().trim_end_matches("View Details").trim().to_string()
}

/// Listing URLs already written for the current product page. A fresh tracker
/// is created per product page; duplicates are only suppressed within one.
#[derive(Debug, Default)]
pub struct DedupTracker {
    recorded: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, listing_url: &str) -> bool {
        self.recorded.contains(listing_url)
    }

    pub fn record(&mut self, listing_url: &str) {
        self.recorded.insert(listing_url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_keywords_match_case_insensitively() {
        let config = FilterConfig::default();
        assert!(title_matches("SIGNED by the artist", &config));
        assert!(title_matches("Signature series", &config));
        assert!(title_matches("artist proof", &config));
        assert!(!title_matches("Regular Foil", &config));
    }

    #[test]
    fn blank_titles_never_match() {
        let config = FilterConfig::default();
        assert!(!title_matches("", &config));
        assert!(!title_matches("   \t  ", &config));
    }

    #[test]
    fn graded_keywords_require_the_flag() {
        let default = FilterConfig::default();
        let graded = FilterConfig {
            include_graded: true,
            ..Default::default()
        };
        assert!(!title_matches("BGS 9.5 Graded", &default));
        assert!(title_matches("BGS 9.5 Graded", &graded));
        assert!(title_matches("PSA 10 gem mint", &graded));
    }

    #[test]
    fn altered_keyword_requires_the_flag() {
        let default = FilterConfig::default();
        let altered = FilterConfig {
            include_altered: true,
            ..Default::default()
        };
        assert!(!title_matches("Full art alter", &default));
        assert!(title_matches("Full art alter", &altered));
    }

    #[test]
    fn clean_title_strips_trailing_affordance() {
        assert_eq!(clean_title("Lightning Bolt View Details"), "Lightning Bolt");
        assert_eq!(clean_title("  Lightning Bolt  "), "Lightning Bolt");
        assert_eq!(clean_title("View Details"), "");
    }

    #[test]
    fn tracker_suppresses_repeats() {
        let mut tracker = DedupTracker::new();
        assert!(!tracker.seen("https://example.com/listing/1"));
        tracker.record("https://example.com/listing/1");
        assert!(tracker.seen("https://example.com/listing/1"));
        assert!(!tracker.seen("https://example.com/listing/2"));
    }
}
