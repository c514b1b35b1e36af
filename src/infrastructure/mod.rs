// Infrastructure module - Core background services and utilities
pub mod clock;
pub mod countdown;
pub mod heartbeat;
pub mod http;
pub mod task_manager;
pub mod timer;

pub use clock::{ClockSync, now_millis, remaining_seconds};
pub use countdown::CountdownTicker;
pub use heartbeat::HeartbeatManager;
pub use http::{AuthCheck, HttpAuthCheck};
pub use task_manager::TaskManager;
pub use timer::{BackoffMode, ReconnectTimer};
