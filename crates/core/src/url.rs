/// Prepends the configured site prefix to an absolute path.
///
/// `None` or an empty path yields the bare prefix. Anything else is appended
/// verbatim, so callers own slash handling.
pub fn prefix_url(prefix: &str, path: Option<&str>) -> String {
    match path {
        Some(p) if !p.is_empty() => format!("{prefix}{p}"),
        _ => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_bare_prefix() {
        assert_eq!(prefix_url("/zipkin", None), "/zipkin");
        assert_eq!(prefix_url("/zipkin", Some("")), "/zipkin");
    }

    #[test]
    fn appends_path_verbatim() {
        assert_eq!(prefix_url("/zipkin", Some("/api/v2")), "/zipkin/api/v2");
        assert_eq!(prefix_url("/zipkin/", Some("/api")), "/zipkin//api");
        assert_eq!(prefix_url("", Some("/api/v2")), "/api/v2");
    }
}
