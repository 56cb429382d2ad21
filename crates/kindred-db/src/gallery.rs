use anyhow::Result;

use kindred_types::models::Photo;

use crate::{Database, format_ts, parse_ts, parse_uuid};

impl Database {
    pub fn insert_photo(&self, pair_code: &str, photo: &Photo) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gallery (id, pair_code, url, caption, uploaded_by, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    photo.id.to_string(),
                    pair_code,
                    &photo.url,
                    &photo.caption,
                    &photo.uploaded_by,
                    format_ts(&photo.uploaded_at),
                ),
            )?;
            Ok(())
        })
    }

    /// Newest upload first.
    pub fn list_photos(&self, pair_code: &str) -> Result<Vec<Photo>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, caption, uploaded_by, uploaded_at
                 FROM gallery WHERE pair_code = ?1
                 ORDER BY uploaded_at DESC",
            )?;
            let photos = stmt
                .query_map([pair_code], |row| {
                    let id: String = row.get(0)?;
                    let uploaded_at: String = row.get(4)?;
                    Ok(Photo {
                        id: parse_uuid(0, &id)?,
                        url: row.get(1)?,
                        caption: row.get(2)?,
                        uploaded_by: row.get(3)?,
                        uploaded_at: parse_ts(4, &uploaded_at)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(photos)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn photos_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        for (caption, offset) in [("first", 0), ("second", 5)] {
            db.insert_photo(
                "ABC123",
                &Photo {
                    id: Uuid::new_v4(),
                    url: format!("http://localhost/uploads/{caption}.jpg"),
                    caption: caption.into(),
                    uploaded_by: "Ana".into(),
                    uploaded_at: now + Duration::seconds(offset),
                },
            )
            .unwrap();
        }

        let photos = db.list_photos("ABC123").unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].caption, "second");
        assert!(db.list_photos("OTHER1").unwrap().is_empty());
    }
}
