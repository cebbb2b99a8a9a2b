//! API handlers

pub mod auth;
pub mod certificates;
pub mod departments;
pub mod health;
pub mod programs;
pub mod users;

use serde::{Deserialize, Serialize};
use tms_core::PageRequest;
use utoipa::{IntoParams, ToSchema};

/// Listing query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, 1 to 100
    #[serde(alias = "pageSize")]
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn to_request(self) -> PageRequest {
        PageRequest::from_query(self.page, self.limit)
    }
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
