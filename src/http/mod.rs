//! HTTP surface: health, room directory, and the WebSocket upgrade route

pub mod routes;

pub use routes::build_router;
