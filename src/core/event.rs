//! Event entity and its storage/wire record.
//!
//! The backend keeps dates as `MM/DD/YYYY` and times as `HH:MM` strings. They
//! are parsed once, when an [`EventRecord`] becomes an [`Event`], so nothing
//! downstream compares strings.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse an event date in the fixed `MM/DD/YYYY` form.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Parse an event time in 24-hour `HH:MM` form.
pub fn parse_event_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

// ---------------------------------------------------------------------------
// Record (storage / wire form)
// ---------------------------------------------------------------------------

/// An event exactly as the backing store holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    #[serde(rename = "pictureURL")]
    pub picture_url: Option<String>,
    #[serde(rename = "authorPictureURL")]
    pub author_picture_url: Option<String>,
    pub participants: Vec<String>,
    pub author_id: String,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Empty until the store assigns one.
    pub id: String,
    pub title: String,
    pub description: String,
    /// `None` when the stored date is missing or malformed.
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: String,
    pub picture_url: Option<String>,
    pub author_picture_url: Option<String>,
    pub participants: Vec<String>,
    pub author_id: String,
}

impl Event {
    pub fn is_saved(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Copy of this event with `user_id` appended to the participants.
    /// Already-present users are not added twice.
    pub fn with_participant(&self, user_id: &str) -> Event {
        let mut next = self.clone();
        if !next.is_participant(user_id) {
            next.participants.push(user_id.to_string());
        }
        next
    }

    /// Copy of this event with every occurrence of `user_id` removed.
    pub fn without_participant(&self, user_id: &str) -> Event {
        let mut next = self.clone();
        next.participants.retain(|p| p != user_id);
        next
    }

    /// Midnight of the event date. This is the instant compared against "now"
    /// when splitting upcoming from finished events.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        self.date.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn date_label(&self) -> String {
        self.date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }

    pub fn time_label(&self) -> String {
        self.time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default()
    }
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let date = parse_event_date(&record.date);
        if date.is_none() {
            tracing::warn!(event_id = %record.id, raw = %record.date, "unparseable event date");
        }
        let time = parse_event_time(&record.time);
        if time.is_none() && !record.time.trim().is_empty() {
            tracing::warn!(event_id = %record.id, raw = %record.time, "unparseable event time");
        }

        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            date,
            time,
            location: record.location,
            picture_url: record.picture_url.filter(|url| !url.trim().is_empty()),
            author_picture_url: record.author_picture_url.filter(|url| !url.trim().is_empty()),
            participants: record.participants,
            author_id: record.author_id,
        }
    }
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date_label(),
            time: event.time_label(),
            location: event.location.clone(),
            picture_url: event.picture_url.clone(),
            author_picture_url: event.author_picture_url.clone(),
            participants: event.participants.clone(),
            author_id: event.author_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(date: &str, time: &str) -> EventRecord {
        EventRecord {
            id: "evt-1".to_string(),
            title: "Gala".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            author_id: "author".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_structured_date_and_time() {
        let event = Event::from(record("12/31/2099", "18:30"));
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2099, 12, 31));
        assert_eq!(event.time, NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(event.date_label(), "12/31/2099");
        assert_eq!(event.time_label(), "18:30");
    }

    #[test]
    fn malformed_date_becomes_none() {
        assert!(Event::from(record("2099-12-31", "18:30")).date.is_none());
        assert!(Event::from(record("13/01/2099", "18:30")).date.is_none());
        assert!(Event::from(record("", "")).starts_at().is_none());
    }

    #[test]
    fn record_uses_backend_field_names() {
        let raw = json!({
            "id": "abc",
            "title": "Birthday Party",
            "date": "01/02/2030",
            "time": "09:05",
            "pictureURL": "https://img.example/p.png",
            "authorPictureURL": null,
            "participants": ["u1", "u2"],
            "authorId": "u1"
        });
        let record: EventRecord = serde_json::from_value(raw).expect("valid record");
        assert_eq!(record.picture_url.as_deref(), Some("https://img.example/p.png"));
        assert_eq!(record.author_id, "u1");
        assert_eq!(record.location, "");

        let event = Event::from(record.clone());
        assert_eq!(EventRecord::from(&event), record);
    }

    #[test]
    fn participant_updates_return_new_copies() {
        let event = Event::from(record("01/01/2099", "10:00"));
        let joined = event.with_participant("u1");
        assert!(joined.is_participant("u1"));
        assert!(!event.is_participant("u1"));

        let joined_twice = joined.with_participant("u1");
        assert_eq!(joined_twice.participants, vec!["u1".to_string()]);

        let left = joined_twice.without_participant("u1");
        assert!(left.participants.is_empty());
    }
}
