//! `cache-control` directive parsing.

use std::time::Duration;

/// The directives the fetch pipeline acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    /// `max-age` in seconds. Malformed values are ignored.
    pub max_age: Option<u64>,
}

impl CacheControl {
    /// Parse a header value. A missing header yields no directives.
    pub fn parse(value: Option<&str>) -> Self {
        let mut control = Self::default();
        let Some(value) = value else {
            return control;
        };

        for directive in value.split(',') {
            let directive = directive.trim();
            let (name, arg) = match directive.split_once('=') {
                Some((name, arg)) => (name.trim(), Some(arg.trim().trim_matches('"'))),
                None => (directive, None),
            };

            if name.eq_ignore_ascii_case("no-cache") {
                control.no_cache = true;
            } else if name.eq_ignore_ascii_case("no-store") {
                control.no_store = true;
            } else if name.eq_ignore_ascii_case("max-age") {
                if let Some(secs) = arg.and_then(|a| a.parse::<u64>().ok()) {
                    control.max_age = Some(secs);
                }
            }
        }
        control
    }

    /// True when either `no-cache` or `no-store` is present.
    pub fn forbids_storing(&self) -> bool {
        self.no_cache || self.no_store
    }

    pub fn max_age_ttl(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}
