//! Endpoint URL building

use crate::error::{Error, Result};
use url::Url;

/// Parse a base URL, rejecting URLs that cannot carry a path (`mailto:` and friends).
pub fn parse_base_url(base: &str) -> Result<Url> {
    let url = Url::parse(base.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidArgument(format!(
            "base URL cannot carry a path: {}",
            base
        )));
    }
    Ok(url)
}

/// Append path segments and query parameters to `base`.
///
/// Each segment is one path component: reserved characters, `/` included, are
/// percent-encoded, so an identifier can never escape its position in the
/// path. Exactly one `/` separates the base path and every segment. Query
/// parameters use `application/x-www-form-urlencoded` encoding.
pub fn join_url<S, K, V>(base: &Url, segments: &[S], query: &[(K, V)]) -> Result<Url>
where
    S: AsRef<str>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::InvalidArgument(format!("base URL cannot carry a path: {}", base))
        })?;
        path.pop_if_empty();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                return Err(Error::InvalidArgument(
                    "URL path segment cannot be blank".to_string(),
                ));
            }
            path.push(segment);
        }
    }

    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
    }

    Ok(url)
}
