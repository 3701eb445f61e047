use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// The caller's identity record stored in the `profiles` table, resolved during authentication.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // 'member' or 'admin'.
    pub role: String,
}

/// Section
///
/// Parent grouping a note belongs to. Addressable by numeric id or by its unique tag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Section {
    pub id: i64,
    pub tag: String,
    pub title: String,
}

/// Note
///
/// A note attached to a section. Owns its comments and media: none of them may outlive it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Note {
    pub id: i64,
    pub description: String,
    pub section_id: i64,
    /// Denormalized slug of the section reference the client annotated.
    pub section_ref_slug: Option<String>,
    // Owner.
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Identity passed into the persistence layer ---

/// Actor
///
/// The explicit identity a repository call runs on behalf of. Built from the
/// authenticated user by the handler; the repository never looks identity up itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Owners may mutate their own notes; admins may mutate any note.
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// SectionRef
///
/// How a new note names its parent section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionRef {
    Id(i64),
    Tag(String),
}

/// NewNote
///
/// Fully resolved input for note creation.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub description: String,
    pub section: SectionRef,
    pub section_ref_slug: Option<String>,
    pub user_id: Uuid,
}

/// DeletedNote
///
/// What a cascading delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeletedNote {
    pub note_id: i64,
    pub comments: u64,
    pub media: u64,
}

// --- Request Payloads ---

/// CreateNoteRequest
///
/// Input payload for POST /notes. The section is named by `section_id` or `section_tag`;
/// when both are present the id is used.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateNoteRequest {
    #[schema(example = "Check the wording of this paragraph")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "chapter-2")]
    pub section_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "chapter-2-paragraph-4")]
    pub section_ref: Option<String>,
}

impl CreateNoteRequest {
    /// Resolves which section reference the client supplied, if any.
    pub fn section(&self) -> Option<SectionRef> {
        match (self.section_id, self.section_tag.as_deref().map(str::trim)) {
            (Some(id), _) => Some(SectionRef::Id(id)),
            (None, Some(tag)) if !tag.is_empty() => Some(SectionRef::Tag(tag.to_string())),
            _ => None,
        }
    }
}

/// UpdateNoteRequest
///
/// Input payload for PUT/PATCH /notes/{id}. Only the description is mutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateNoteRequest {
    pub description: String,
}

// --- Response Bodies ---

/// MessageResponse
///
/// Success confirmation returned by every note endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    #[schema(example = "Note created successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// ErrorResponse
///
/// Failure body. Errors are always a single-element list under the `notes` key.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ErrorResponse {
    #[schema(example = json!(["Note not found"]))]
    pub notes: Vec<String>,
}
