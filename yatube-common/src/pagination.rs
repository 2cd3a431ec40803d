//! Limit/offset pagination that only kicks in when the client asks for it.

use serde::Serialize;
use std::num::NonZeroU32;
use url::form_urlencoded;

pub const LIMIT_QUERY_PARAM: &str = "limit";
pub const OFFSET_QUERY_PARAM: &str = "offset";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct LimitOffset {
    pub limit: u32,
    pub offset: u32,
}

/// One page of results together with links to its neighbours.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(Page<T>),
}

fn parse_limit(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|limit| *limit > 0)
}

fn parse_offset(value: &str) -> u32 {
    value.trim().parse::<u32>().unwrap_or(0)
}

impl LimitOffset {
    /// Reads `limit` and `offset` from a raw query string.
    ///
    /// Returns `None` when neither parameter is present. A bad `limit` falls back to
    /// `default_limit` and a bad `offset` to zero.
    #[must_use]
    pub fn from_query(query: Option<&str>, default_limit: NonZeroU32) -> Option<Self> {
        let mut limit = None;
        let mut offset = None;

        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match &*key {
                LIMIT_QUERY_PARAM => limit = Some(value),
                OFFSET_QUERY_PARAM => offset = Some(value),
                _ => {}
            }
        }

        if limit.is_none() && offset.is_none() {
            return None;
        }

        Some(Self {
            limit: limit
                .as_deref()
                .and_then(parse_limit)
                .unwrap_or(default_limit.get()),
            offset: offset.as_deref().map_or(0, parse_offset),
        })
    }

    #[must_use]
    pub fn next_link(self, path: &str, query: Option<&str>, count: u64) -> Option<String> {
        let next_offset = u64::from(self.offset) + u64::from(self.limit);
        if next_offset >= count {
            return None;
        }

        Some(link(
            path,
            query,
            self.limit,
            Some(u32::try_from(next_offset).unwrap_or(u32::MAX)),
        ))
    }

    #[must_use]
    pub fn previous_link(self, path: &str, query: Option<&str>) -> Option<String> {
        if self.offset == 0 {
            return None;
        }

        let previous_offset = self.offset.checked_sub(self.limit).filter(|offset| *offset > 0);
        Some(link(path, query, self.limit, previous_offset))
    }

    #[must_use]
    pub fn into_page<T>(
        self,
        path: &str,
        query: Option<&str>,
        count: u64,
        results: Vec<T>,
    ) -> Page<T> {
        Page {
            count,
            next: self.next_link(path, query, count),
            previous: self.previous_link(path, query),
            results,
        }
    }
}

/// Rewrites `limit` and `offset` in `query`, keeping every other parameter. Parameters come out
/// sorted by name. `offset: None` drops the offset parameter.
fn link(path: &str, query: Option<&str>, limit: u32, offset: Option<u32>) -> String {
    let mut pairs: Vec<(String, String)> =
        form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .filter(|(key, _)| key != LIMIT_QUERY_PARAM && key != OFFSET_QUERY_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

    pairs.push((LIMIT_QUERY_PARAM.to_owned(), limit.to_string()));
    if let Some(offset) = offset {
        pairs.push((OFFSET_QUERY_PARAM.to_owned(), offset.to_string()));
    }
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    format!("{path}?{query}")
}
