//! Item identifier extraction from source URLs.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Numeric item identifier understood by the sale-history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the final path segment of `locator` as a base-10 item id.
///
/// Query strings and fragments are ignored, as is a single trailing slash.
/// Zero, with or without leading zeros, is rejected.
pub fn extract_item_id(locator: &str) -> Result<ItemId, PipelineError> {
    let path = locator
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let path = path.strip_suffix('/').unwrap_or(path);

    let segment = path.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return Err(PipelineError::invalid_locator(
            locator,
            "the URL has no final path segment",
        ));
    }

    if !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(PipelineError::invalid_locator(
            locator,
            format!("final segment '{segment}' is not a numeric id"),
        ));
    }

    let id = segment.parse::<u64>().map_err(|error| {
        PipelineError::invalid_locator(locator, format!("final segment '{segment}': {error}"))
    })?;
    if id == 0 {
        return Err(PipelineError::invalid_locator(locator, "item id 0 is not assigned"));
    }
    Ok(ItemId(id))
}
