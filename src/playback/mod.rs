//! Time-driven playback of pixel streams.
//!
//! - `scheduler`: the playback clock as a pure state machine
//! - `guard`: single-flight gate keeping at most one push in flight
//! - `session`: async loop performing scheduler effects and pushing frames

mod guard;
mod scheduler;
mod session;

pub use guard::SingleFlight;
pub use scheduler::{Effect, Event, Scheduler, SchedulerId, format_clock};
pub use session::{Control, PlaybackSession, PlaybackSnapshot, SessionError};
