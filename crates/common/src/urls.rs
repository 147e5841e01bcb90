use url::Url;

/// Resolve `path` against `root` the way a browser resolves a link.
///
/// Absolute URLs are returned unchanged, `/x` replaces the root's path and
/// `x` is appended after the root's last `/`. An empty path yields the root.
pub fn build_full_url(path: &str, root: &Url) -> Result<Url, url::ParseError> {
    root.join(path)
}
