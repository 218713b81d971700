/// Primary keys of synced rows (club, team, rule, session, ...).
pub type RowId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
