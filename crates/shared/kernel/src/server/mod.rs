mod fallback;
mod health;
mod router;
mod state;

pub use fallback::method_not_allowed;
pub use health::{mark_started, uptime};
pub use router::system_router;
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateInner};
