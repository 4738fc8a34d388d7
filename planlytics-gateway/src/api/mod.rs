//! HTTP API handlers for planlytics-gateway

pub mod analyze;
pub mod chat;
pub mod health;
pub mod ui;
pub mod upload;

pub use analyze::analyze_routes;
pub use chat::chat_routes;
pub use health::health_routes;
pub use ui::ui_routes;
pub use upload::upload_routes;
