use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::constants::MAX_PAGE_SIZE;

const LIMIT: &str = "limit";
const OFFSET: &str = "offset";

/// `limit` / `offset` query parameters plus the rest of the query, which
/// page links carry over unchanged.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub params: Vec<(String, String)>,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            params: vec![],
        }
    }

    /// Reads `limit` and `offset` from raw query pairs. Values that are not
    /// integers are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let param = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.trim().parse::<i64>().ok())
        };

        Self {
            limit: param(LIMIT),
            offset: param(OFFSET),
            params: pairs
                .iter()
                .filter(|(k, _)| k != LIMIT && k != OFFSET)
                .cloned()
                .collect(),
        }
    }

    pub fn limit(&self, page_size: i64) -> i64 {
        self.limit
            .filter(|limit| *limit > 0)
            .unwrap_or(page_size)
            .min(MAX_PAGE_SIZE)
    }

    /// Never negative, and small enough that `offset + limit` fits in an i64.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).clamp(0, i64::MAX - MAX_PAGE_SIZE)
    }
}

fn link(path: &str, params: &[(String, String)], limit: i64, offset: i64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    query.append_pair(LIMIT, &limit.to_string());
    if offset > 0 {
        query.append_pair(OFFSET, &offset.to_string());
    }
    format!("{path}?{}", query.finish())
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        limit: i64,
        offset: i64,
        path: &str,
        params: &[(String, String)],
    ) -> Self {
        let next_offset = offset.saturating_add(limit);
        let next = (next_offset < total_rows).then(|| link(path, params, limit, next_offset));

        let previous =
            (offset > 0).then(|| link(path, params, limit, offset.saturating_sub(limit).max(0)));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
