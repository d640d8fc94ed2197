//! Client session logic, independent of transport and rendering.

mod call_session;

pub use call_session::{CallSession, SessionState};
