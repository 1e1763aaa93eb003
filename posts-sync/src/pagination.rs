use crate::error::SyncError;
use crate::models::PostsPage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const COLLECTION: &str = "posts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub rows_per_page: u32,
    /// Server-reported total; only ever written from a fetch response.
    pub rows_number: u64,
    pub sort_by: String,
    pub descending: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            rows_per_page: 5,
            rows_number: 0,
            sort_by: "title".to_string(),
            descending: false,
        }
    }
}

impl Pagination {
    /// Zero-based row offset of the current page. Page 0 maps to offset 0.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.rows_per_page)
    }
}

/// Resource locator of one page of posts:
/// `posts/{offset}/{limit}/{sort_by}/{sort_dir}/{filter}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocator {
    pub offset: u64,
    pub limit: u32,
    pub sort_by: String,
    pub descending: bool,
    pub filter: String,
}

impl PageLocator {
    pub fn path(&self) -> String {
        self.to_string()
    }

    pub fn parse(path: &str) -> Result<Self, SyncError> {
        let invalid = || SyncError::InvalidLocator(path.to_string());

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let [collection, offset, limit, sort_by, sort_dir, filter] = segments.as_slice() else {
            return Err(invalid());
        };
        if *collection != COLLECTION {
            return Err(invalid());
        }

        let descending = match *sort_dir {
            "-1" => true,
            "1" => false,
            _ => return Err(invalid()),
        };

        Ok(Self {
            offset: offset.parse().map_err(|_| invalid())?,
            limit: limit.parse().map_err(|_| invalid())?,
            sort_by: decode_segment(sort_by).ok_or_else(invalid)?,
            descending,
            filter: decode_segment(filter).ok_or_else(invalid)?,
        })
    }
}

impl fmt::Display for PageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            COLLECTION,
            self.offset,
            self.limit,
            urlencoding::encode(&self.sort_by),
            if self.descending { -1 } else { 1 },
            urlencoding::encode(&self.filter),
        )
    }
}

fn decode_segment(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

pub fn encode(pagination: &Pagination, filter: &str) -> PageLocator {
    PageLocator {
        offset: pagination.offset(),
        limit: pagination.rows_per_page,
        sort_by: pagination.sort_by.clone(),
        descending: pagination.descending,
        filter: filter.to_string(),
    }
}

/// Decodes a `{posts, count}` body. `count` is the only source of `rows_number`.
pub fn decode(response: Value) -> Result<PostsPage, SyncError> {
    Ok(serde_json::from_value(response)?)
}
