//! Internet domain name validation.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;
use url::Host;

/// Labels of alphanumerics, `-` and `_` that neither start nor end with a
/// separator; the last label must end in a letter.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z0-9](?:[a-z0-9_-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9_-]{0,61}[a-z]$",
    )
    .expect("domain grammar compiles")
});

/// Check whether a value represents a valid internet domain.
///
/// Non-ASCII input is converted to its IDNA (punycode) form first, so
/// `kräuter.com` yields `xn--kruter-cua.com`. ASCII input is returned with its
/// original casing.
pub fn check_valid_domain(value: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidDomain {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    // Host parsing percent-decodes; an escape would name a different domain.
    if value.contains('%') {
        return Err(invalid("percent escapes are not allowed"));
    }

    let ascii = if value.is_ascii() {
        value.to_string()
    } else {
        match Host::parse(value) {
            Ok(Host::Domain(domain)) => domain,
            Ok(_) => return Err(invalid("not a domain name")),
            Err(e) => return Err(invalid(&format!("IDNA conversion failed: {}", e))),
        }
    };

    if !DOMAIN_RE.is_match(&ascii) {
        return Err(invalid("does not match domain grammar"));
    }
    Ok(ascii)
}

pub fn is_valid_domain(value: &str) -> bool {
    check_valid_domain(value).is_ok()
}
