use serde::{Deserialize, Serialize};

/// A single page image of a chapter. `order_no` fixes reading order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct PageInfo {
    pub order_no: i64,
    pub url: String,
}

impl PageInfo {
    pub fn new(order_no: i64, url: impl Into<String>) -> Self {
        Self {
            order_no,
            url: url.into(),
        }
    }
}
