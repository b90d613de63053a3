pub mod api;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod health;
pub mod journal;
pub mod model;
pub mod progress;
pub mod session;
pub mod sync;
pub mod window;

pub use api::{ApiFuture, AuditApi};
pub use channel::{EventChannel, LocalEventBus, Subscription};
pub use config::WatchConfig;
pub use dispatcher::{Notice, NoticeLevel, WatchSnapshot};
pub use error::WatchError;
pub use health::HealthScore;
pub use session::WatchSession;
