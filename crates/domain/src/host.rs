//! Host pattern grammar and matching.
//!
//! A variable may be restricted to a list of host patterns. A pattern is
//! either the wildcard `*` or `<host>[:<port>]` where `<host>` is a
//! dot-separated sequence of DNS labels (or `*`) and `<port>` is a number in
//! `1..=65535` or `*`.
//!
//! Patterns are split at the **last** colon. Bracketed IPv6 literals are not
//! special-cased and will not match as users might expect.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HostPatternError;

/// The pattern that matches every host and port.
pub const WILDCARD: &str = "*";

/// Longest accepted host pattern.
pub const MAX_HOST_PATTERN_LENGTH: usize = 253;

#[allow(clippy::expect_used)]
static HOST_PATTERN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\*|[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*)(?::(?:\*|\d+))?$",
    )
    .expect("valid regex")
});

/// A host pattern split into its host and optional port parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    /// Host part, possibly `*`.
    pub host: String,
    /// Port part, possibly `*`. `None` means any port.
    pub port: Option<String>,
}

impl HostPattern {
    /// Returns true if this pattern accepts the given hostname and port.
    ///
    /// Hostnames compare case-insensitively. A missing actual port compares
    /// as the empty string, so a pattern with a numeric port never matches a
    /// portless origin.
    #[must_use]
    pub fn matches(&self, hostname: &str, port: Option<&str>) -> bool {
        let host_matches = self.host == WILDCARD || self.host.eq_ignore_ascii_case(hostname);
        if !host_matches {
            return false;
        }

        match self.port.as_deref() {
            None | Some(WILDCARD) => true,
            Some(expected) => expected == port.unwrap_or(""),
        }
    }
}

/// Parses a host pattern into host and port parts.
///
/// Returns `None` for an empty pattern or one whose host part is empty
/// (for example `":8080"`). A trailing colon with no port is treated as
/// "no port".
#[must_use]
pub fn parse_host_pattern(pattern: &str) -> Option<HostPattern> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == WILDCARD {
        return Some(HostPattern {
            host: WILDCARD.to_string(),
            port: None,
        });
    }

    let Some((host, port)) = trimmed.rsplit_once(':') else {
        return Some(HostPattern {
            host: trimmed.to_string(),
            port: None,
        });
    };

    if host.is_empty() {
        return None;
    }

    Some(HostPattern {
        host: host.to_string(),
        port: (!port.is_empty()).then(|| port.to_string()),
    })
}

/// Matches a host pattern against a hostname and optional port.
///
/// # Examples
///
/// ```
/// use hostvar_domain::match_host;
///
/// assert!(match_host("*", "anything.com", Some("8080")));
/// assert!(match_host("api.x.com:8080", "api.x.com", Some("8080")));
/// assert!(!match_host("api.x.com:8080", "api.x.com", Some("9090")));
/// assert!(match_host("api.x.com", "api.x.com", Some("9090")));
/// ```
#[must_use]
pub fn match_host(pattern: &str, hostname: &str, port: Option<&str>) -> bool {
    if pattern == WILDCARD {
        return true;
    }
    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }

    parse_host_pattern(pattern).is_some_and(|parsed| parsed.matches(hostname, port))
}

/// Validates a host pattern.
///
/// # Errors
///
/// Returns the reason the pattern is rejected.
pub fn validate_host_pattern(pattern: &str) -> Result<(), HostPatternError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(HostPatternError::Empty);
    }
    if trimmed == WILDCARD {
        return Ok(());
    }
    if trimmed.chars().count() > MAX_HOST_PATTERN_LENGTH {
        return Err(HostPatternError::TooLong);
    }
    if !HOST_PATTERN_REGEX.is_match(trimmed) {
        return Err(HostPatternError::Malformed);
    }

    if let Some((_, port)) = trimmed.rsplit_once(':') {
        if port != WILDCARD {
            let in_range = port
                .parse::<u32>()
                .is_ok_and(|number| (1..=65_535).contains(&number));
            if !in_range {
                return Err(HostPatternError::PortOutOfRange);
            }
        }
    }

    Ok(())
}

/// Formats a hostname and port for display (`host` or `host:port`).
///
/// Ports that are absent, empty or `"0"` are omitted.
#[must_use]
pub fn format_host_display(hostname: &str, port: Option<&str>) -> String {
    if hostname.is_empty() {
        return String::new();
    }
    match port {
        None | Some("" | "0") => hostname.to_string(),
        Some(port) => format!("{hostname}:{port}"),
    }
}

/// The hostname and port a piece of text is being edited on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Hostname, without port.
    pub hostname: String,
    /// Explicit port, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl Origin {
    /// Creates an origin from a hostname and optional port.
    #[must_use]
    pub fn new(hostname: impl Into<String>, port: Option<impl Into<String>>) -> Self {
        Self {
            hostname: hostname.into(),
            port: port.map(Into::into),
        }
    }

    /// Parses `host` or `host:port`, splitting at the last colon.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Self {
                hostname: host.to_string(),
                port: (!port.is_empty()).then(|| port.to_string()),
            },
            _ => Self {
                hostname: trimmed.to_string(),
                port: None,
            },
        }
    }

    /// Extracts the origin of a URL. Default ports are not reported,
    /// mirroring what a browser exposes as `location.port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn from_url(input: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(input)?;
        Ok(Self {
            hostname: url.host_str().unwrap_or_default().to_string(),
            port: url.port().map(|port| port.to_string()),
        })
    }

    /// Returns the port as a string slice.
    #[must_use]
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Returns true if the pattern accepts this origin.
    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        match_host(pattern, &self.hostname, self.port())
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_host_display(&self.hostname, self.port()))
    }
}
