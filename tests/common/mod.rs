#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Response};
use chrono::{DateTime, Utc};
use chronicle_notes::{
    AppState, RepoError,
    auth::AuthUser,
    config::AppConfig,
    models::{Actor, DeletedNote, NewNote, Note, Section, SectionRef, User},
    repository::Repository,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const OWNER_ID: Uuid = Uuid::from_u128(0x0001);
pub const OTHER_ID: Uuid = Uuid::from_u128(0x0002);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x0003);

pub const SECTION_ID: i64 = 10;
pub const SECTION_TAG: &str = "chapter-1";

// --- Child rows ---

/// A `comments` row. The service only ever deletes these, so they live with the fixtures.
#[derive(Debug, Clone)]
pub struct NoteComment {
    pub id: i64,
    pub note_id: i64,
    pub user_id: Uuid,
    pub parent_id: Option<i64>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A `media` row.
#[derive(Debug, Clone)]
pub struct Media {
    pub id: i64,
    pub note_id: i64,
    pub resource_key: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

// --- In-memory repository ---

/// Mirrors the Postgres repository's semantics over plain vectors, with a queue of
/// errors to hand out instead of running the next operations.
#[derive(Default)]
pub struct InMemoryRepo {
    pub users: Vec<User>,
    pub sections: Vec<Section>,
    pub notes: Mutex<Vec<Note>>,
    pub comments: Mutex<Vec<NoteComment>>,
    pub media: Mutex<Vec<Media>>,
    pub injected_errors: Mutex<Vec<RepoError>>,
    pub identity_error: Mutex<Option<RepoError>>,
}

impl InMemoryRepo {
    /// Three users (owner, other member, admin), one section, no notes.
    pub fn seeded() -> Self {
        Self {
            users: vec![
                user(OWNER_ID, "member"),
                user(OTHER_ID, "member"),
                user(ADMIN_ID, "admin"),
            ],
            sections: vec![Section {
                id: SECTION_ID,
                tag: SECTION_TAG.to_string(),
                title: "Chapter 1".to_string(),
            }],
            ..Self::default()
        }
    }

    /// Adds a note owned by `owner` with `comments` comments and `media` attachments.
    pub fn with_note(self, id: i64, owner: Uuid, comments: usize, media: usize) -> Self {
        let now = Utc::now();
        self.notes.lock().unwrap().push(Note {
            id,
            description: format!("note {id}"),
            section_id: SECTION_ID,
            section_ref_slug: Some("chapter-1-intro".to_string()),
            user_id: owner,
            created_at: now,
            updated_at: now,
        });
        {
            let mut all = self.comments.lock().unwrap();
            for n in 0..comments {
                let next = all.len() as i64 + 1;
                all.push(NoteComment {
                    id: next,
                    note_id: id,
                    user_id: owner,
                    parent_id: if n == 0 { None } else { Some(next - 1) },
                    body: format!("comment {n}"),
                    created_at: now,
                });
            }
        }
        {
            let mut all = self.media.lock().unwrap();
            for n in 0..media {
                let next = all.len() as i64 + 1;
                all.push(Media {
                    id: next,
                    note_id: id,
                    resource_key: format!("uploads/{id}-{n}.png"),
                    mime_type: "image/png".to_string(),
                    created_at: now,
                });
            }
        }
        self
    }

    pub fn failing_with(self, err: RepoError) -> Self {
        self.injected_errors.lock().unwrap().push(err);
        self
    }

    /// The next profile lookup fails with `err`.
    pub fn identity_failing_with(self, err: RepoError) -> Self {
        *self.identity_error.lock().unwrap() = Some(err);
        self
    }

    pub fn note(&self, id: i64) -> Option<Note> {
        self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned()
    }

    pub fn note_count(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    pub fn comment_count(&self, note_id: i64) -> usize {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.note_id == note_id)
            .count()
    }

    pub fn media_count(&self, note_id: i64) -> usize {
        self.media
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.note_id == note_id)
            .count()
    }

    fn take_injected(&self) -> Result<(), RepoError> {
        match self.injected_errors.lock().unwrap().pop() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn owner_of(&self, id: i64) -> Result<Uuid, RepoError> {
        self.note(id)
            .map(|n| n.user_id)
            .ok_or(RepoError::NotFound("Note"))
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        if let Some(err) = self.identity_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_note(&self, new: NewNote) -> Result<Note, RepoError> {
        self.take_injected()?;
        let section = self
            .sections
            .iter()
            .find(|s| match &new.section {
                SectionRef::Id(id) => s.id == *id,
                SectionRef::Tag(tag) => &s.tag == tag,
            })
            .ok_or(RepoError::NotFound("Section"))?;

        let mut notes = self.notes.lock().unwrap();
        let now = Utc::now();
        let note = Note {
            id: notes.iter().map(|n| n.id).max().unwrap_or(0) + 1,
            description: new.description,
            section_id: section.id,
            section_ref_slug: new.section_ref_slug,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        notes.push(note.clone());
        Ok(note)
    }

    async fn update_note_description(
        &self,
        id: i64,
        actor: Actor,
        description: String,
    ) -> Result<Note, RepoError> {
        self.take_injected()?;
        if !actor.can_modify(self.owner_of(id)?) {
            return Err(RepoError::Forbidden("note"));
        }
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepoError::NotFound("Note"))?;
        note.description = description;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete_note(&self, id: i64, actor: Actor) -> Result<DeletedNote, RepoError> {
        self.take_injected()?;
        if !actor.can_modify(self.owner_of(id)?) {
            return Err(RepoError::Forbidden("note"));
        }
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.note_id != id);
        let removed_comments = (before - comments.len()) as u64;

        let mut media = self.media.lock().unwrap();
        let before = media.len();
        media.retain(|m| m.note_id != id);
        let removed_media = (before - media.len()) as u64;

        self.notes.lock().unwrap().retain(|n| n.id != id);
        Ok(DeletedNote {
            note_id: id,
            comments: removed_comments,
            media: removed_media,
        })
    }
}

// --- Fixtures ---

pub fn user(id: Uuid, role: &str) -> User {
    User {
        id,
        email: format!("{role}-{}@chronicle.test", id.simple()),
        role: role.to_string(),
    }
}

pub fn owner() -> AuthUser {
    AuthUser {
        id: OWNER_ID,
        role: "member".to_string(),
    }
}

pub fn other_member() -> AuthUser {
    AuthUser {
        id: OTHER_ID,
        role: "member".to_string(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        role: "admin".to_string(),
    }
}

pub fn state_with(repo: Arc<InMemoryRepo>, config: AppConfig) -> AppState {
    AppState { repo, config }
}

pub fn state(repo: Arc<InMemoryRepo>) -> AppState {
    state_with(repo, AppConfig::default())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
