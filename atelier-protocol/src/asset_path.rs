//! Asset names as URL path segments
//!
//! Generated asset names may hold spaces or non-ASCII text. Anything outside
//! the RFC 3986 unreserved set is percent-encoded, `/` included, so a name
//! always stays a single segment under [`ASSET_ROUTE_PREFIX`].

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::ASSET_ROUTE_PREFIX;

const ASSET_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Route path of an asset, e.g. `/assets/render%2001.png`
pub fn asset_path(name: &str) -> String {
    format!(
        "{}{}",
        ASSET_ROUTE_PREFIX,
        utf8_percent_encode(name, ASSET_NAME)
    )
}

/// Decode the segment following [`ASSET_ROUTE_PREFIX`] in a request path
///
/// Returns `None` when the decoded bytes are not UTF-8. The decoded name is
/// not checked here; a `%2F` comes back as a literal `/`.
pub fn decode_asset_name(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|name| name.into_owned())
}
