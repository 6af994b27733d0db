//! Recognized handler method names.
//!
//! A handler manifest keys its method table by lowercase method name. Only
//! names in this set are registered; `all` matches every request method.

use std::fmt;
use std::str::FromStr;

use axum::http;
use serde::Serialize;

/// A method name a handler may declare.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Checkout,
    Copy,
    Delete,
    Get,
    Head,
    Lock,
    Merge,
    Mkactivity,
    Mkcol,
    Move,
    MSearch,
    Notify,
    Options,
    Patch,
    Post,
    Purge,
    Put,
    Report,
    Search,
    Subscribe,
    Trace,
    Unlock,
    Unsubscribe,
    All,
}

impl Method {
    /// Every recognized name, in declaration order.
    pub const RECOGNIZED: [Method; 24] = [
        Self::Checkout,
        Self::Copy,
        Self::Delete,
        Self::Get,
        Self::Head,
        Self::Lock,
        Self::Merge,
        Self::Mkactivity,
        Self::Mkcol,
        Self::Move,
        Self::MSearch,
        Self::Notify,
        Self::Options,
        Self::Patch,
        Self::Post,
        Self::Purge,
        Self::Put,
        Self::Report,
        Self::Search,
        Self::Subscribe,
        Self::Trace,
        Self::Unlock,
        Self::Unsubscribe,
        Self::All,
    ];

    /// The manifest key (e.g. `"m-search"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::Get => "get",
            Self::Head => "head",
            Self::Lock => "lock",
            Self::Merge => "merge",
            Self::Mkactivity => "mkactivity",
            Self::Mkcol => "mkcol",
            Self::Move => "move",
            Self::MSearch => "m-search",
            Self::Notify => "notify",
            Self::Options => "options",
            Self::Patch => "patch",
            Self::Post => "post",
            Self::Purge => "purge",
            Self::Put => "put",
            Self::Report => "report",
            Self::Search => "search",
            Self::Subscribe => "subscribe",
            Self::Trace => "trace",
            Self::Unlock => "unlock",
            Self::Unsubscribe => "unsubscribe",
            Self::All => "all",
        }
    }

    /// Returns true if a request with `method` is answered by this name.
    pub fn matches(self, method: &http::Method) -> bool {
        match self {
            Self::All => true,
            _ => method.as_str().eq_ignore_ascii_case(self.as_str()),
        }
    }
}

/// Parses a manifest key. Case-insensitive, so `GET` and `get` both work.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::RECOGNIZED
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_recognized_name() {
        for method in Method::RECOGNIZED {
            assert_eq!(method.as_str().parse::<Method>(), Ok(method));
        }
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert_eq!("M-SEARCH".parse::<Method>(), Ok(Method::MSearch));
        assert!("propfind".parse::<Method>().is_err());
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn test_all_matches_any_request_method() {
        assert!(Method::All.matches(&http::Method::GET));
        assert!(Method::All.matches(&http::Method::DELETE));
        assert!(Method::Get.matches(&http::Method::GET));
        assert!(!Method::Get.matches(&http::Method::POST));

        let msearch = http::Method::from_bytes(b"M-SEARCH").unwrap();
        assert!(Method::MSearch.matches(&msearch));
    }

    #[test]
    fn test_displays_wire_form() {
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::MSearch.to_string(), "M-SEARCH");
    }
}
