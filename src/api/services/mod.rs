pub mod admin;
pub mod health;
pub mod subscribe;
pub mod track;

pub use health::{AppStartTime, HealthService, health_routes};
pub use subscribe::{SubscribeService, subscribe_rate_limiter};
pub use track::TrackService;
