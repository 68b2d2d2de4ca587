use crate::domain::MediaKind;
use diesel::prelude::*;

/// One uploaded artifact, keyed by the host-assigned file id. A
/// gallery produces several records sharing one `platform_id`;
/// records are never updated or deleted once written.
#[derive(Clone, Debug, Insertable, Queryable, Selectable)]
#[diesel(table_name = crate::db::schema::videos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MediaRecord {
    /// Opaque reference assigned by Telegram on first upload,
    /// reusable to resend without re-uploading bytes.
    pub file_id: String,

    /// Platform-specific content id the artifact belongs to.
    pub platform_id: String,

    /// Platform name, see [`crate::domain::Platform::as_str`].
    pub platform: String,

    /// "photo", "video" or "audio".
    pub media_type: String,
}

impl MediaRecord {
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::parse(&self.media_type)
    }
}
