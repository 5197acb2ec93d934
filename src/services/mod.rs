//! Background services.
mod poller;

pub use poller::{MIN_POLL_INTERVAL, PollState, PollerBackgroundService};
