//! Shared domain types.

pub mod clock;
pub mod event;

pub use clock::{Clock, FixedClock, SystemClock};
pub use event::{parse_event_date, parse_event_time, Event, EventRecord};
