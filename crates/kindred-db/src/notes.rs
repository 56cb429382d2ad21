use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};

use kindred_types::models::Note;

use crate::{Database, format_ts, parse_ts, parse_uuid};

impl Database {
    pub fn insert_note(&self, pair_code: &str, note: &Note) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (id, pair_code, title, content, color, is_favorite, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    note.id.to_string(),
                    pair_code,
                    note.title,
                    note.content,
                    note.color,
                    note.is_favorite,
                    note.created_by,
                    format_ts(&note.created_at),
                    format_ts(&note.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Most recently updated first.
    pub fn list_notes(&self, pair_code: &str) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, color, is_favorite, created_by, created_at, updated_at
                 FROM notes WHERE pair_code = ?1
                 ORDER BY updated_at DESC",
            )?;
            let notes = stmt
                .query_map([pair_code], note_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }

    /// Absent fields keep their stored value. Returns `false` if no note
    /// with that id belongs to the pair.
    pub fn update_note(
        &self,
        pair_code: &str,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
        color: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notes
                 SET title = COALESCE(?3, title),
                     content = COALESCE(?4, content),
                     color = COALESCE(?5, color),
                     updated_at = ?6
                 WHERE id = ?1 AND pair_code = ?2",
                rusqlite::params![id, pair_code, title, content, color, format_ts(&updated_at)],
            )?;
            Ok(updated == 1)
        })
    }

    /// Flip the favorite flag, returning the new value.
    pub fn toggle_note_favorite(
        &self,
        pair_code: &str,
        id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            let flag = conn
                .query_row(
                    "UPDATE notes SET is_favorite = NOT is_favorite, updated_at = ?3
                     WHERE id = ?1 AND pair_code = ?2
                     RETURNING is_favorite",
                    (id, pair_code, format_ts(&updated_at)),
                    |r| r.get(0),
                )
                .optional()?;
            Ok(flag)
        })
    }

    pub fn delete_note(&self, pair_code: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND pair_code = ?2",
                (id, pair_code),
            )?;
            Ok(deleted == 1)
        })
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Note {
        id: parse_uuid(0, &id)?,
        title: row.get(1)?,
        content: row.get(2)?,
        color: row.get(3)?,
        is_favorite: row.get(4)?,
        created_by: row.get(5)?,
        created_at: parse_ts(6, &created_at)?,
        updated_at: parse_ts(7, &updated_at)?,
    })
}
