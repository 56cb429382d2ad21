use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use kindred_types::models::Reminder;

use crate::models::ReminderChanges;
use crate::{Database, format_ts, parse_ts, parse_uuid};

impl Database {
    pub fn insert_reminder(&self, pair_code: &str, reminder: &Reminder) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reminders (id, pair_code, title, description, date, time, priority,
                                        is_completed, is_recurring, recurring_type, created_by, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    reminder.id.to_string(),
                    pair_code,
                    reminder.title,
                    reminder.description,
                    reminder.date,
                    reminder.time,
                    reminder.priority,
                    reminder.is_completed,
                    reminder.is_recurring,
                    reminder.recurring_type,
                    reminder.created_by,
                    reminder.email,
                    format_ts(&reminder.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Ordered by due date, then time.
    pub fn list_reminders(&self, pair_code: &str) -> Result<Vec<Reminder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, date, time, priority, is_completed,
                        is_recurring, recurring_type, created_by, email, created_at
                 FROM reminders WHERE pair_code = ?1
                 ORDER BY date ASC, time ASC",
            )?;
            let reminders = stmt
                .query_map([pair_code], reminder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(reminders)
        })
    }

    pub fn update_reminder(
        &self,
        pair_code: &str,
        id: &str,
        changes: &ReminderChanges,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE reminders
                 SET title = COALESCE(?3, title),
                     description = COALESCE(?4, description),
                     date = COALESCE(?5, date),
                     time = COALESCE(?6, time),
                     priority = COALESCE(?7, priority),
                     is_recurring = COALESCE(?8, is_recurring),
                     recurring_type = COALESCE(?9, recurring_type)
                 WHERE id = ?1 AND pair_code = ?2",
                rusqlite::params![
                    id,
                    pair_code,
                    changes.title,
                    changes.description,
                    changes.date,
                    changes.time,
                    changes.priority,
                    changes.is_recurring,
                    changes.recurring_type,
                ],
            )?;
            Ok(updated == 1)
        })
    }

    /// Flip the completion flag, returning the new value.
    pub fn toggle_reminder_complete(&self, pair_code: &str, id: &str) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            let flag = conn
                .query_row(
                    "UPDATE reminders SET is_completed = NOT is_completed
                     WHERE id = ?1 AND pair_code = ?2
                     RETURNING is_completed",
                    (id, pair_code),
                    |r| r.get(0),
                )
                .optional()?;
            Ok(flag)
        })
    }

    pub fn delete_reminder(&self, pair_code: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM reminders WHERE id = ?1 AND pair_code = ?2",
                (id, pair_code),
            )?;
            Ok(deleted == 1)
        })
    }
}

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(11)?;

    Ok(Reminder {
        id: parse_uuid(0, &id)?,
        title: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        priority: row.get(5)?,
        is_completed: row.get(6)?,
        is_recurring: row.get(7)?,
        recurring_type: row.get(8)?,
        created_by: row.get(9)?,
        email: row.get(10)?,
        created_at: parse_ts(11, &created_at)?,
    })
}
