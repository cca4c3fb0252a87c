pub mod cli;
pub mod error;
pub mod extract;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;

pub use error::ApiError;
pub use extract::ApiJson;
pub use routes::router;
pub use session::{SessionId, SessionState, SessionStore, SESSION_HEADER};
pub use state::{AppState, Backends, Live, MenuSettings};
