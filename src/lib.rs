pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod liveness;
pub mod utils;

pub use calendar::{EventPage, EventPages, EventSource, EventsRequest, GoogleCalendarClient, TimeWindow};
pub use config::{resolve_calendar_id, SheetKey};
pub use event::{CalendarEvent, EventTime};
pub use liveness::{check_is_live, LiveStatus, CheckSettings};
