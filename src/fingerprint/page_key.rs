use sha1::{Digest, Sha1};
use url::Url;

/// Derive the storage page key from a page address: `<host>_<path>`.
///
/// Query string and fragment are ignored so that the same page visited with
/// different parameters shares its fingerprints. `file://` pages have no host
/// and key on the path alone.
pub fn page_key_from_url(raw: &str) -> Result<String, url::ParseError> {
    let url = Url::parse(raw)?;
    let host = url.host_str().unwrap_or("");
    let path = match url.path() {
        "" => "/",
        p => p,
    };

    Ok(format!("{}_{}", host, path))
}

/// Accept either a full URL or an already-derived page key.
pub fn resolve_page_key(input: &str) -> String {
    let input = input.trim();

    match Url::parse(input) {
        Ok(url) if url.has_host() || url.scheme() == "file" => {
            page_key_from_url(input).unwrap_or_else(|_| input.to_string())
        }
        _ => input.to_string(),
    }
}

/// File-system safe name for a page key's storage unit.
///
/// Runs of characters outside `[A-Za-z0-9_-]` become a single `_`; a short
/// SHA-1 of the raw key keeps keys that sanitize identically apart.
pub fn storage_stem(page_key: &str) -> String {
    let mut stem = String::with_capacity(page_key.len());
    let mut in_run = false;

    for c in page_key.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            stem.push(c);
            in_run = false;
        } else if !in_run {
            stem.push('_');
            in_run = true;
        }
    }

    let mut hasher = Sha1::new();
    hasher.update(page_key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}-{}", stem, &digest[..12])
}
