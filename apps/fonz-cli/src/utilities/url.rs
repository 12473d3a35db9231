/// Joins a base URL and path segments with single slashes.
///
/// Leading and trailing slashes on every part are dropped before joining, so
/// `compose_url("https://host:19999/", &["/api", "4.0/"])` yields
/// `https://host:19999/api/4.0`.
pub fn compose_url(base_url: &str, path: &[&str]) -> String {
    std::iter::once(base_url)
        .chain(path.iter().copied())
        .map(|part| part.trim_matches('/'))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_url_without_path() {
        assert_eq!(
            compose_url("https://test.looker.com", &[]),
            "https://test.looker.com"
        );
    }

    #[test]
    fn test_compose_url_strips_extra_slashes() {
        assert_eq!(
            compose_url("https://test.looker.com/", &["/api/", "4.0", "queries/"]),
            "https://test.looker.com/api/4.0/queries"
        );
    }

    #[test]
    fn test_compose_url_keeps_nested_segments() {
        assert_eq!(
            compose_url("https://test.looker.com:19999", &["queries", "42", "run", "sql"]),
            "https://test.looker.com:19999/queries/42/run/sql"
        );
    }
}
