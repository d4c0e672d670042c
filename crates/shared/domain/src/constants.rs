//! Names shared between the schema, the media layout and the HTTP surface.

/// `SurrealDB` tables.
pub const USER_TABLE: &str = "user";
pub const DRAWING_TABLE: &str = "drawing";
pub const REPORT_TABLE: &str = "report";

/// Media namespace holding saved drawings (`drawings/<id>.<ext>`).
pub const DRAWINGS_NAMESPACE: &str = "drawings";
/// Media namespace holding the append-only report log.
pub const REPORTS_NAMESPACE: &str = "reports";
pub const REPORT_LOG_FILE: &str = "reports.jsonl";

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "scribe_session";

/// `OpenAPI` tags.
pub const SYSTEM_TAG: &str = "System";
pub const IDENTITY_TAG: &str = "Identity";
pub const RECOGNITION_TAG: &str = "Recognition";
pub const GALLERY_TAG: &str = "Gallery";
