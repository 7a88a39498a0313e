//! HTTP and WebSocket transport over the session and reward layers.

pub mod fanout;
pub mod http;
pub mod run;
pub mod state;
pub mod ws;

pub use fanout::Fanout;
pub use run::{build_router, run_server};
pub use state::AppState;
