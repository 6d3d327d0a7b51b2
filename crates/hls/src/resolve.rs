use url::Url;

/// Resolves a playlist reference against the playlist URL.
///
/// Absolute `http(s)` references are returned unchanged. Everything else goes
/// through RFC 3986 reference resolution; if the base cannot be parsed the
/// reference is spliced onto the base by hand instead of failing.
pub fn resolve_url(base_url: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    match Url::parse(base_url).and_then(|base| base.join(reference)) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!(base_url, reference, error = %e, "Falling back to manual URL splicing");
            splice(base_url, reference)
        }
    }
}

fn splice(base_url: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        let (scheme, rest) = base_url.split_once("://").unwrap_or(("", base_url));
        let host = rest.split('/').next().unwrap_or(rest);
        if scheme.is_empty() {
            format!("{host}{reference}")
        } else {
            format!("{scheme}://{host}{reference}")
        }
    } else {
        let dir = base_url
            .rsplit_once('/')
            .map_or(base_url, |(dir, _)| dir);
        format!("{dir}/{reference}")
    }
}
