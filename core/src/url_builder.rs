//! Composes base path, command path and query parameters into a URL.

use url::form_urlencoded;
use url::Url;

use crate::command::Command;
use crate::error::NetError;

/// Build the full request URL for `command` under `base_path`.
///
/// Exactly one `/` separates base and path. A query string is appended iff
/// the command has query parameters.
pub fn build<T>(base_path: &str, command: &Command<T>) -> Result<String, NetError> {
    let base = validate_base_path(base_path)?;

    let path = command.path();
    if path.is_empty() {
        return Err(NetError::malformed("request path is empty"));
    }
    if path.contains(['?', '#']) {
        return Err(NetError::malformed(format!(
            "request path {path:?} must not contain a query or fragment"
        )));
    }
    validate_path(path)?;

    let mut url = format!("{base}/{}", path.trim_start_matches('/'));

    let params = command.query_params();
    if !params.is_empty() {
        url.push('?');
        for (i, (key, value)) in params.iter().enumerate() {
            if key.is_empty() {
                return Err(NetError::malformed("query parameter key is empty"));
            }
            if i > 0 {
                url.push('&');
            }
            url.push_str(&encode_component(key));
            url.push('=');
            url.push_str(&encode_component(value));
        }
    }

    Url::parse(&url).map_err(|e| NetError::malformed(format!("request url {url:?}: {e}")))?;
    Ok(url)
}

/// Paths are sent verbatim, so every byte must already be legal in a URL
/// path: RFC 3986 `pchar`, `/`, or a complete `%XX` escape.
fn validate_path(path: &str) -> Result<(), NetError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(NetError::malformed(format!(
                        "request path {path:?} has an incomplete percent escape"
                    )));
                }
                i += 3;
            }
            b if is_path_byte(b) => i += 1,
            b => {
                return Err(NetError::malformed(format!(
                    "request path {path:?} contains {:?}; percent-encode it",
                    char::from(b)
                )))
            }
        }
    }
    Ok(())
}

fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/".contains(&b)
}

/// Check that `base_path` is an absolute http(s) URL prefix and return it
/// without trailing slashes.
pub fn validate_base_path(base_path: &str) -> Result<&str, NetError> {
    if base_path.trim().is_empty() {
        return Err(NetError::malformed("base path is empty"));
    }
    let parsed = Url::parse(base_path)
        .map_err(|e| NetError::malformed(format!("base path {base_path:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err(NetError::malformed(format!(
            "base path {base_path:?} is not an http(s) URL"
        )));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(NetError::malformed(format!(
            "base path {base_path:?} must not contain a query or fragment"
        )));
    }
    Ok(base_path.trim_end_matches('/'))
}

/// Percent-encode a query key or value. Spaces become `%20`.
pub fn encode_component(raw: &str) -> String {
    // byte_serialize emits `+` only for spaces; a literal `+` comes out as `%2B`.
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
