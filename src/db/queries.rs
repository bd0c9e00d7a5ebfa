use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DbError};

// ---------------------------------------------------------------------------
// Row types — flat structs that map directly to table columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub picture_url: Option<String>,
    pub author_picture_url: Option<String>,
    pub author_id: String,
    pub created_at: String,
}

const EVENT_COLUMNS: &str = "id, title, description, date, time, location, picture_url,
     author_picture_url, author_id, created_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        location: row.get(5)?,
        picture_url: row.get(6)?,
        author_picture_url: row.get(7)?,
        author_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

// ---------------------------------------------------------------------------
// Event queries
// ---------------------------------------------------------------------------

pub fn insert_event(db: &Database, row: &EventRow) -> Result<(), DbError> {
    let conn = db.conn();
    conn.execute(
        "INSERT INTO events (id, title, description, date, time, location, picture_url,
                             author_picture_url, author_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            row.id,
            row.title,
            row.description,
            row.date,
            row.time,
            row.location,
            row.picture_url,
            row.author_picture_url,
            row.author_id,
            row.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_event(db: &Database, id: &str) -> Result<Option<EventRow>, DbError> {
    let conn = db.conn();
    let row = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
            params![id],
            event_from_row,
        )
        .optional()?;
    Ok(row)
}

/// All events in insertion order.
pub fn list_events(db: &Database) -> Result<Vec<EventRow>, DbError> {
    let conn = db.conn();
    let mut stmt = conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY rowid"))?;
    let rows = stmt
        .query_map([], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns `false` when no event had this id.
pub fn delete_event(db: &Database, id: &str) -> Result<bool, DbError> {
    let conn = db.conn();
    let affected = conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------------------
// Participant queries
// ---------------------------------------------------------------------------

pub fn list_participants(db: &Database, event_id: &str) -> Result<Vec<String>, DbError> {
    let conn = db.conn();
    let mut stmt = conn.prepare(
        "SELECT user_id FROM event_participants WHERE event_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![event_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

/// Participants of every event, keyed by event id, each list in join order.
pub fn list_all_participants(db: &Database) -> Result<HashMap<String, Vec<String>>, DbError> {
    let conn = db.conn();
    let mut stmt = conn.prepare(
        "SELECT event_id, user_id FROM event_participants ORDER BY event_id, position",
    )?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for (event_id, user_id) in pairs {
        out.entry(event_id).or_default().push(user_id);
    }
    Ok(out)
}

/// Append `user_id` to the end of the event's participant list. Returns
/// `false` when the user was already a participant; their position and join
/// time are left as they were.
pub fn add_participant(
    db: &Database,
    event_id: &str,
    user_id: &str,
    joined_at: &str,
) -> Result<bool, DbError> {
    let conn = db.conn();
    let inserted = conn.execute(
        "INSERT INTO event_participants (event_id, user_id, position, joined_at)
         SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1, ?3
         FROM event_participants WHERE event_id = ?1
         ON CONFLICT(event_id, user_id) DO NOTHING",
        params![event_id, user_id, joined_at],
    )?;
    Ok(inserted > 0)
}

/// Returns `false` when the user was not a participant.
pub fn remove_participant(db: &Database, event_id: &str, user_id: &str) -> Result<bool, DbError> {
    let conn = db.conn();
    let removed = conn.execute(
        "DELETE FROM event_participants WHERE event_id = ?1 AND user_id = ?2",
        params![event_id, user_id],
    )?;
    Ok(removed > 0)
}
