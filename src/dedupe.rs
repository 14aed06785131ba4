//! Duplicate-job detection by normalized source URL. The substring fallback
//! tolerates stored URLs that carry extra path segments from
//! redirect-following. Exact matches always win over substring matches;
//! within a class the first candidate in enumeration order wins, so callers
//! should pass jobs in a deterministic order (the store lists them by
//! `saved_at` desc).

use crate::entities::job;
use crate::urlnorm::normalize;

fn strip_one_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// True when two normalized URLs identify the same posting: equal, or either
/// contains the other after dropping one trailing slash from the contained
/// side.
pub fn urls_match(a: &str, b: &str) -> bool {
    a == b || a.contains(strip_one_trailing_slash(b)) || b.contains(strip_one_trailing_slash(a))
}

/// Find a stored job whose source URL duplicates `new_source_url`.
/// Jobs without a usable source URL are always treated as unique.
pub fn find_duplicate<'a>(
    new_source_url: Option<&str>,
    candidates: &'a [job::Model],
) -> Option<&'a job::Model> {
    let target = normalize(new_source_url)?;

    let mut substring_match = None;
    for candidate in candidates {
        let Some(normalized) = normalize(candidate.source_url.as_deref()) else {
            continue;
        };
        if normalized == target {
            return Some(candidate);
        }
        if substring_match.is_none() && urls_match(&normalized, &target) {
            substring_match = Some(candidate);
        }
    }
    substring_match
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job_with_url(id: &str, source_url: Option<&str>) -> job::Model {
        let now = Utc::now();
        job::Model {
            id: id.to_string(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: None,
            description: None,
            salary_lower_bound: None,
            salary_upper_bound: None,
            salary_currency: None,
            requirements: None,
            application_url: None,
            source_url: source_url.map(str::to_string),
            normalized_source_url: normalize(source_url),
            posted_date: None,
            extracted_at: None,
            saved_at: now,
            excluded: false,
            tags: None,
            accepted_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn query_string_variant_matches() {
        let existing = vec![job_with_url("a", Some("https://ex.com/job/1/"))];
        let found = find_duplicate(Some("https://ex.com/job/1?utm=x"), &existing);
        assert_eq!(found.map(|j| j.id.as_str()), Some("a"));
    }

    #[test]
    fn substring_tolerance_both_directions() {
        let existing = vec![job_with_url("a", Some("https://ex.com/job/1/apply"))];
        assert!(find_duplicate(Some("https://ex.com/job/1"), &existing).is_some());

        let existing = vec![job_with_url("b", Some("https://ex.com/job/1"))];
        assert!(find_duplicate(Some("https://ex.com/job/1/apply"), &existing).is_some());
    }

    #[test]
    fn exact_match_preferred_over_substring() {
        let existing = vec![
            job_with_url("longer", Some("https://ex.com/job/1/apply")),
            job_with_url("exact", Some("https://ex.com/job/1")),
        ];
        let found = find_duplicate(Some("https://ex.com/job/1"), &existing);
        assert_eq!(found.map(|j| j.id.as_str()), Some("exact"));
    }

    #[test]
    fn no_source_url_is_always_unique() {
        let existing = vec![job_with_url("a", Some("https://ex.com/job/1"))];
        assert!(find_duplicate(None, &existing).is_none());
        assert!(find_duplicate(Some(""), &existing).is_none());
    }

    #[test]
    fn candidates_without_urls_are_skipped() {
        let existing = vec![
            job_with_url("none", None),
            job_with_url("hit", Some("https://ex.com/job/2")),
        ];
        let found = find_duplicate(Some("https://ex.com/job/2"), &existing);
        assert_eq!(found.map(|j| j.id.as_str()), Some("hit"));
    }
}
