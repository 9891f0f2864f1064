//! HTTP layer: Axum router, handlers, session extraction and responses.
//!
//! Exposes account endpoints (`/register`, `/login`, `/logout`), ordering
//! (`/checkout`, `/user-bookings`), admin listings under `/api/admin`, and the
//! static landing page.

mod error;
mod forms;
mod handlers;
mod responses;
mod session;
mod state;


pub use handlers::router;
pub use state::{AppState, CookieSettings};
