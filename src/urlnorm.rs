use url::Url;

/// Canonicalize a job-posting URL for duplicate comparison: query and
/// fragment stripped, one trailing slash dropped, everything lowercased.
/// Unparseable input falls back to a best-effort string transform; this never
/// fails, it only returns `None` for missing/empty input.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    let normalized = match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            let mut rendered = parsed.to_string();
            if rendered.ends_with('/') {
                rendered.pop();
            }
            rendered.to_lowercase()
        }
        Err(_) => {
            let lowered = raw.to_lowercase();
            let cut = lowered
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string();
            match cut.strip_suffix('/') {
                Some(stripped) => stripped.to_string(),
                None => cut,
            }
        }
    };

    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_input() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
    }

    #[test]
    fn strips_query_fragment_and_trailing_slash() {
        assert_eq!(
            normalize(Some("https://ex.com/job/1/?utm=x#top")),
            Some("https://ex.com/job/1".to_string())
        );
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            normalize(Some("HTTP://Example.com/a/")),
            normalize(Some("http://example.com/a"))
        );
    }

    #[test]
    fn malformed_url_best_effort() {
        assert_eq!(
            normalize(Some("Not a URL??query")),
            Some("not a url".to_string())
        );
        assert_eq!(
            normalize(Some("broken#frag/")),
            Some("broken".to_string())
        );
    }

    #[test]
    fn idempotent() {
        for input in [
            "https://Example.com/Jobs/42/?a=1",
            "weird://///path/",
            "not a url?x",
        ] {
            let once = normalize(Some(input));
            let twice = normalize(once.as_deref());
            assert_eq!(once, twice);
        }
    }
}
