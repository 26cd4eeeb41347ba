use url::Url;

/// Resolve an endpoint against a base URL.
///
/// Absolute endpoints are returned as-is; relative ones such as
/// `/api/monuments?category=single` are joined onto `base`.
pub fn resolve(base: &Url, endpoint: &str) -> Result<Url, url::ParseError> {
    match Url::parse(endpoint) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(endpoint),
        Err(e) => Err(e),
    }
}
