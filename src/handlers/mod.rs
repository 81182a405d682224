use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::repository::{OrderField, PageOptions, SortOrder};

pub mod auth;
pub mod bookmarks;
pub mod groups;
pub mod lists;
pub mod posts;
pub mod users;

/// ErrorResponse
///
/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub message: String,
}

/// Severity → status mapping. This is the only place in the crate that knows
/// about HTTP status codes for domain errors. Internal failures are logged
/// with their detail and reach the caller as a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if self.is_internal() {
            tracing::error!(error = %self, "Request failed with an internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// PageQuery
///
/// Paging parameters accepted by every listing endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size; capped at 100.
    pub entries_per_page: Option<u32>,
    pub order_by: Option<SortOrder>,
    pub order_by_field: Option<OrderField>,
}

impl From<PageQuery> for PageOptions {
    fn from(query: PageQuery) -> Self {
        PageOptions {
            page: query.page.unwrap_or(1),
            entries_per_page: query.entries_per_page,
            order_by: query.order_by.unwrap_or_default(),
            order_by_field: query.order_by_field.unwrap_or_default(),
            ids: None,
        }
    }
}
