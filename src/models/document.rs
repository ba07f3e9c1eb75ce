use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// The two document kinds the coach consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    Jd,
}

/// One named section of a parsed document, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub name: String,
    pub text: String,
    /// Byte offset of the section text within the full document content.
    pub offset: usize,
}

/// A parsed document. Immutable after upload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: DocumentKind,
    pub content: String,
    pub sections: Json<Vec<DocumentSection>>,
    pub chunks: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}
