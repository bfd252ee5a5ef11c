//! Owner identification from timeline URLs and author links.

use url::Url;

use crate::types::OwnerId;

/// First path segments that belong to the site itself rather than to an account.
const RESERVED_ROUTES: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "search",
    "settings",
    "i",
    "compose",
];

/// Derives the timeline owner from the page URL: the first path segment, lower-cased.
pub fn detect_owner(location: &str) -> Option<OwnerId> {
    let url = Url::parse(location.trim()).ok()?;
    owner_from_path(&url)
}

/// Normalizes an author link to an owner id.
///
/// Accepts site-relative paths (`/Name`), absolute URLs (`https://x.com/Name/status/1`) and
/// bare handles (`@Name`).
pub fn owner_from_href(href: &str) -> Option<OwnerId> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("https://host.invalid/").ok()?;
            let path = if trimmed.starts_with('/') {
                trimmed.to_string()
            } else {
                format!("/{trimmed}")
            };
            base.join(&path).ok()?
        }
        Err(_) => return None,
    };
    owner_from_path(&url)
}

fn owner_from_path(url: &Url) -> Option<OwnerId> {
    let segment = url.path_segments()?.find(|segment| !segment.is_empty())?;
    let owner = OwnerId::parse(segment)?;
    if RESERVED_ROUTES.contains(&owner.as_str()) {
        return None;
    }
    Some(owner)
}
