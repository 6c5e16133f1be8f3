pub mod assets;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod papers;
pub mod routes;
pub mod sessions;
pub mod tasks;

pub use routes::create_router;
