mod models;
mod schema;

pub use models::MediaRecord;

use anyhow::{anyhow, bail, Context};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::{
    fs,
    io::Write,
    path::Path,
    sync::Mutex,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Append-only media cache over the `videos` table. The connection
/// is mutex-guarded so concurrent sessions can append without
/// interleaving writes.
pub struct Db {
    conn: Mutex<SqliteConnection>,
}

impl Db {
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            conn: Mutex::new(Self::open_connection(path.as_ref())?),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let mut conn = SqliteConnection::establish(":memory:")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("migrations error: {err}"))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_connection(path: &Path) -> anyhow::Result<SqliteConnection> {
        let Some(path) = path.to_str() else {
            bail!("path '{}' contains non-unicode characters", path.display());
        };

        Self::backup_database(Path::new(path)).context("backuping database")?;

        // Create the database file and check it is readable and writable.
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .read(true)
            .open(path)
            .with_context(|| format!("opening database '{path}'"))?
            .write(b"")
            .with_context(|| format!("writing to database '{path}'"))?;

        let mut connection = SqliteConnection::establish(path)
            .with_context(|| format!("establish connection to '{path}'"))?;

        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("migrations error: {err}"))?;

        Ok(connection)
    }

    fn backup_database(path: &Path) -> anyhow::Result<()> {
        let dpath = path.display();

        let db_exists = path
            .try_exists()
            .with_context(|| format!("checking database at '{dpath}'"))?;

        if !db_exists {
            return Ok(());
        }

        if !path.is_file() {
            bail!("'{dpath}' is not file");
        }

        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            bail!("file '{dpath}' doesn't have utf-8 file extension");
        };

        let backup_path = path.with_extension(format!("{extension}.bak"));
        let dbackup_path = backup_path.display();

        fs::copy(path, &backup_path)
            .with_context(|| format!("copying file from '{dpath}' to '{dbackup_path}'"))?;

        log::info!("Successfully backup database from '{dpath}' to '{dbackup_path}'");

        Ok(())
    }

    /// Number of cached records for a content id. Zero means the
    /// content was never fetched.
    pub fn media_count(&self, content_id: &str) -> anyhow::Result<i64> {
        use schema::videos::dsl::*;

        let mut conn = self.lock_conn();

        videos
            .filter(platform_id.eq(content_id))
            .count()
            .get_result(&mut *conn)
            .with_context(|| format!("counting media for '{content_id}'"))
    }

    /// Appends one record. Insertion order is what later ordered
    /// retrieval returns, so galleries must insert in delivery order.
    pub fn add_media(&self, record: &MediaRecord) -> anyhow::Result<()> {
        use schema::videos::dsl::*;

        let mut conn = self.lock_conn();

        diesel::insert_into(videos)
            .values(record)
            .execute(&mut *conn)
            .with_context(|| format!("inserting media for '{}'", record.platform_id))?;

        Ok(())
    }

    /// Earliest-inserted record for a content id.
    pub fn first_media(&self, content_id: &str) -> anyhow::Result<Option<MediaRecord>> {
        use schema::videos::dsl::*;

        let mut conn = self.lock_conn();

        videos
            .filter(platform_id.eq(content_id))
            .order(rowid())
            .select(MediaRecord::as_select())
            .first(&mut *conn)
            .optional()
            .with_context(|| format!("selecting first media for '{content_id}'"))
    }

    /// All records for a content id, in insertion order.
    pub fn all_media(&self, content_id: &str) -> anyhow::Result<Vec<MediaRecord>> {
        use schema::videos::dsl::*;

        let mut conn = self.lock_conn();

        videos
            .filter(platform_id.eq(content_id))
            .order(rowid())
            .select(MediaRecord::as_select())
            .load(&mut *conn)
            .with_context(|| format!("selecting media for '{content_id}'"))
    }

    /// Earliest-inserted audio record for a content id, if the
    /// gallery came with an audio track.
    pub fn first_audio(&self, content_id: &str) -> anyhow::Result<Option<MediaRecord>> {
        use schema::videos::dsl::*;

        let mut conn = self.lock_conn();

        videos
            .filter(platform_id.eq(content_id))
            .filter(media_type.eq("audio"))
            .order(rowid())
            .select(MediaRecord::as_select())
            .first(&mut *conn)
            .optional()
            .with_context(|| format!("selecting audio for '{content_id}'"))
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, SqliteConnection> {
        // A poisoned lock means another thread panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|err| err.into_inner())
    }
}

// The table has no surrogate key, so insertion order is recovered
// from SQLite's implicit rowid.
fn rowid() -> diesel::expression::SqlLiteral<diesel::sql_types::BigInt> {
    diesel::dsl::sql::<diesel::sql_types::BigInt>("rowid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MediaKind, Platform};

    fn record(file_id: &str, content_id: &str, kind: MediaKind) -> MediaRecord {
        MediaRecord {
            file_id: file_id.to_owned(),
            platform_id: content_id.to_owned(),
            platform: Platform::Instagram.as_str().to_owned(),
            media_type: kind.as_str().to_owned(),
        }
    }

    #[test]
    fn count_is_zero_for_unknown_content() {
        let db = Db::open_in_memory().unwrap();

        assert_eq!(db.media_count("C1aBcDeFgHi").unwrap(), 0);
        assert!(db.first_media("C1aBcDeFgHi").unwrap().is_none());
        assert!(db.all_media("C1aBcDeFgHi").unwrap().is_empty());
    }

    #[test]
    fn retrieval_preserves_insertion_order() {
        let db = Db::open_in_memory().unwrap();

        for id in ["A", "B", "C"] {
            db.add_media(&record(id, "C1aBcDeFgHi", MediaKind::Photo))
                .unwrap();
        }

        let all = db.all_media("C1aBcDeFgHi").unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.file_id.as_str()).collect();

        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(db.media_count("C1aBcDeFgHi").unwrap(), 3);
        assert_eq!(db.first_media("C1aBcDeFgHi").unwrap().unwrap().file_id, "A");
    }

    #[test]
    fn first_audio_skips_other_kinds() {
        let db = Db::open_in_memory().unwrap();

        db.add_media(&record("P1", "7301", MediaKind::Photo)).unwrap();
        db.add_media(&record("P2", "7301", MediaKind::Photo)).unwrap();
        db.add_media(&record("S1", "7301", MediaKind::Audio)).unwrap();

        assert_eq!(db.first_audio("7301").unwrap().unwrap().file_id, "S1");
        assert!(db.first_audio("other").unwrap().is_none());
    }

    #[test]
    fn content_ids_do_not_leak_between_each_other() {
        let db = Db::open_in_memory().unwrap();

        db.add_media(&record("A", "one", MediaKind::Video)).unwrap();
        db.add_media(&record("B", "two", MediaKind::Video)).unwrap();

        assert_eq!(db.media_count("one").unwrap(), 1);
        assert_eq!(db.first_media("two").unwrap().unwrap().file_id, "B");
    }
}
