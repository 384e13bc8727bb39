pub mod chat;
pub mod checkin;
pub mod hub;
pub mod matching;
pub mod message;
pub mod notification;
pub mod reaction;
pub mod user;

use serde::Serialize;

/// Envelope for paged listings.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(
        result: creatorhub_services::dao::PaginatedResult<U>,
        f: impl FnMut(U) -> T,
    ) -> Self {
        Self {
            items: result.items.into_iter().map(f).collect(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages: result.total_pages,
        }
    }
}
