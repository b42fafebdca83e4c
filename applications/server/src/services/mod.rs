/// Server services
pub mod auth;
pub mod cache;
pub mod scheduling;

pub use auth::AuthService;
pub use cache::ResponseCache;
pub use scheduling::SchedulingService;
