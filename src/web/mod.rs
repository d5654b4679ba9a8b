pub mod api;
pub mod auth;
pub mod landing;
pub mod responses;
pub mod router;
pub mod state;
pub mod templates;
pub mod upload_ui;
pub mod uploads;

pub use state::AppState;
