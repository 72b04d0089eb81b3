//! Contextual URLs: `{parentPath}?__trackId=<urlencoded id>`
//!
//! External controllers and persisted resume state only carry one opaque
//! string per item. A contextual URL embeds the browsing context (the parent
//! path) that produced a playable item, so the parent can be resolved again
//! and a sibling queue rebuilt from that single string.
//!
//! Only the `__trackId` parameter is ever added or removed; every other query
//! parameter of the parent path is preserved verbatim.

use std::borrow::Cow;

/// Reserved query parameter carrying the track identifier
pub const TRACK_ID_PARAM: &str = "__trackId";

/// Returns `true` if the query string of `url` carries a `__trackId` parameter
pub fn is_contextual(url: &str) -> bool {
    query_pairs(url).any(|pair| param_key(pair) == TRACK_ID_PARAM)
}

/// Builds the contextual URL of `track_id` within `parent_path`
///
/// ```
/// use pmobrowser::contextual_url::build;
///
/// assert_eq!(build("/albums/42", "song 1"), "/albums/42?__trackId=song%201");
/// assert_eq!(build("/__search?q=jazz", "t1"), "/__search?q=jazz&__trackId=t1");
/// ```
pub fn build(parent_path: &str, track_id: &str) -> String {
    let separator = if parent_path.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        parent_path,
        separator,
        TRACK_ID_PARAM,
        urlencoding::encode(track_id)
    )
}

/// Removes the `__trackId` parameter, keeping the rest of the URL intact
pub fn strip_track_id(url: &str) -> Cow<'_, str> {
    let Some((base, query)) = url.split_once('?') else {
        return Cow::Borrowed(url);
    };

    if !is_contextual(url) {
        return Cow::Borrowed(url);
    }

    let remaining: Vec<&str> = query
        .split('&')
        .filter(|pair| param_key(pair) != TRACK_ID_PARAM)
        .collect();

    if remaining.is_empty() {
        Cow::Owned(base.to_string())
    } else {
        Cow::Owned(format!("{}?{}", base, remaining.join("&")))
    }
}

/// Extracts the decoded track identifier, if the URL is contextual
pub fn extract_track_id(url: &str) -> Option<String> {
    query_pairs(url)
        .find(|pair| param_key(pair) == TRACK_ID_PARAM)
        .and_then(|pair| {
            let value = pair.split_once('=').map(|(_, v)| v).unwrap_or("");
            urlencoding::decode(value).ok().map(Cow::into_owned)
        })
}

fn query_pairs(url: &str) -> impl Iterator<Item = &str> {
    url.split_once('?')
        .map(|(_, query)| query)
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
}

fn param_key(pair: &str) -> &str {
    pair.split_once('=').map(|(key, _)| key).unwrap_or(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_without_query() {
        let url = build("/albums/42", "track-7");
        assert_eq!(url, "/albums/42?__trackId=track-7");
        assert!(is_contextual(&url));
        assert_eq!(extract_track_id(&url).as_deref(), Some("track-7"));
        assert_eq!(strip_track_id(&url), "/albums/42");
    }

    #[test]
    fn test_strip_preserves_other_params() {
        let url = build("/__search?q=jazz&page=2", "https://cdn.example.com/a.mp3?sig=x&y=1");
        assert_eq!(strip_track_id(&url), "/__search?q=jazz&page=2");
        assert_eq!(
            extract_track_id(&url).as_deref(),
            Some("https://cdn.example.com/a.mp3?sig=x&y=1")
        );
    }

    #[test]
    fn test_strip_param_in_the_middle() {
        let url = "/radio?a=1&__trackId=x&b=2";
        assert_eq!(strip_track_id(url), "/radio?a=1&b=2");
    }

    #[test]
    fn test_non_contextual_urls_are_untouched() {
        assert!(!is_contextual("/albums/42"));
        assert!(!is_contextual("/albums/42?__trackIdx=1"));
        assert!(!is_contextual("/albums/42?q=__trackId"));
        assert_eq!(strip_track_id("/albums/42?q=1"), "/albums/42?q=1");
        assert_eq!(extract_track_id("/albums/42"), None);
    }

    #[test]
    fn test_empty_track_id() {
        let url = "/albums/42?__trackId";
        assert!(is_contextual(url));
        assert_eq!(extract_track_id(url).as_deref(), Some(""));
        assert_eq!(strip_track_id(url), "/albums/42");
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            parent in "/[a-z0-9/_-]{0,16}(\\?[a-z]{1,4}=[a-z0-9%]{0,6}(&[a-z]{1,4}=[a-z0-9]{0,6}){0,2})?",
            track_id in "\\PC{0,24}",
        ) {
            let url = build(&parent, &track_id);
            prop_assert!(is_contextual(&url));
            prop_assert_eq!(extract_track_id(&url), Some(track_id.clone()));
            prop_assert_eq!(strip_track_id(&url).into_owned(), parent);
        }
    }
}
