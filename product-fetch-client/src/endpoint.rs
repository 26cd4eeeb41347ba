//! Helpers for building catalog listing endpoints.

/// Build `<path>?category=<category>` with the category percent-encoded.
///
/// ```
/// use product_fetch_client::endpoint;
///
/// assert_eq!(
///     endpoint::listing("/api/fences", "granite"),
///     "/api/fences?category=granite"
/// );
/// ```
pub fn listing(path: &str, category: &str) -> String {
    format!("{}?category={}", path, urlencoding::encode(category))
}

/// Structural identity of an endpoint list.
///
/// Two lists with the same URLs in the same order share a key, whatever
/// allocation they live in.
pub fn endpoints_key<S: AsRef<str>>(endpoints: &[S]) -> String {
    endpoints
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_category_is_encoded() {
        let endpoint = listing("/api/products", "гранитные-ограды");
        assert!(endpoint.starts_with("/api/products?category=%D0%B3"));
        assert!(endpoint.is_ascii());
    }

    #[test]
    fn test_endpoints_key_ignores_container() {
        let literal = ["/api/monuments?category=single", "/api/fences?category=granite"];
        let owned: Vec<String> = literal.iter().map(|s| s.to_string()).collect();

        assert_eq!(endpoints_key(&literal), endpoints_key(&owned));
        assert_ne!(
            endpoints_key(&literal),
            endpoints_key(&["/api/fences?category=granite", "/api/monuments?category=single"])
        );
    }
}
