use crate::{
    error::RepoError,
    models::{Actor, DeletedNote, NewNote, Note, SectionRef, User},
    retry::RetryPolicy,
};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::{future::Future, pin::Pin, sync::Arc};
use uuid::Uuid;

const NOTE_COLUMNS: &str =
    "id, description, section_id, section_ref_slug, user_id, created_at, updated_at";

/// Repository Trait
///
/// Abstract contract for all persistence the note endpoints need. Handlers only see
/// this trait, so tests can swap in an in-memory implementation.
///
/// Every note mutation is a single transactional unit of work: it either commits
/// completely or leaves the database untouched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    // --- Note lifecycle ---
    /// Resolves the section and inserts the note. `NotFound("Section")` if the section is missing.
    async fn create_note(&self, note: NewNote) -> Result<Note, RepoError>;
    /// Replaces the description only. Owner or admin.
    async fn update_note_description(
        &self,
        id: i64,
        actor: Actor,
        description: String,
    ) -> Result<Note, RepoError>;
    /// Deletes the note's comments, then its media, then the note. Owner or admin.
    async fn delete_note(&self, id: i64, actor: Actor) -> Result<DeletedNote, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Future returned by a unit of work running on a borrowed transaction connection.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, RepoError>> + Send + 'c>>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// in_transaction
    ///
    /// Runs `work` inside a fresh transaction, committing on success. Each attempt gets
    /// its own transaction; the `Transaction` guard rolls back when dropped uncommitted,
    /// so every early return leaves nothing behind. Transient failures replay the whole
    /// unit of work under the configured retry policy.
    async fn in_transaction<T, F>(&self, operation: &'static str, work: F) -> Result<T, RepoError>
    where
        T: Send,
        F: for<'c> Fn(&'c mut PgConnection) -> TxFuture<'c, T> + Send + Sync,
    {
        self.retry
            .run(RepoError::is_transient, |attempt| {
                let work = &work;
                async move {
                    tracing::debug!(operation, attempt, "beginning transaction");
                    let mut tx = self.pool.begin().await?;
                    let value = work(&mut *tx).await?;
                    tx.commit().await?;
                    Ok::<T, RepoError>(value)
                }
            })
            .await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_note(&self, note: NewNote) -> Result<Note, RepoError> {
        self.in_transaction("create_note", move |conn| {
            let note = note.clone();
            Box::pin(async move { insert_note(conn, &note).await })
        })
        .await
    }

    async fn update_note_description(
        &self,
        id: i64,
        actor: Actor,
        description: String,
    ) -> Result<Note, RepoError> {
        self.in_transaction("update_note", move |conn| {
            let actor = actor.clone();
            let description = description.clone();
            Box::pin(async move { set_note_description(conn, id, &actor, &description).await })
        })
        .await
    }

    async fn delete_note(&self, id: i64, actor: Actor) -> Result<DeletedNote, RepoError> {
        self.in_transaction("delete_note", move |conn| {
            let actor = actor.clone();
            Box::pin(async move { cascade_delete_note(conn, id, &actor).await })
        })
        .await
    }
}

// --- Units of work (run on a transaction connection) ---

async fn resolve_section_id(
    conn: &mut PgConnection,
    section: &SectionRef,
) -> Result<i64, RepoError> {
    let found: Option<i64> = match section {
        SectionRef::Id(id) => {
            sqlx::query_scalar("SELECT id FROM sections WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
        }
        SectionRef::Tag(tag) => {
            sqlx::query_scalar("SELECT id FROM sections WHERE tag = $1")
                .bind(tag)
                .fetch_optional(&mut *conn)
                .await?
        }
    };
    found.ok_or(RepoError::NotFound("Section"))
}

async fn insert_note(conn: &mut PgConnection, note: &NewNote) -> Result<Note, RepoError> {
    let section_id = resolve_section_id(conn, &note.section).await?;

    let created = sqlx::query_as::<_, Note>(&format!(
        "INSERT INTO notes (description, section_id, section_ref_slug, user_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, NOW(), NOW()) \
         RETURNING {NOTE_COLUMNS}"
    ))
    .bind(&note.description)
    .bind(section_id)
    .bind(&note.section_ref_slug)
    .bind(note.user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(created)
}

/// Locks the note row for the rest of the transaction and returns its owner.
/// Concurrent updates and deletes of the same note queue up behind this lock.
async fn lock_note_owner(conn: &mut PgConnection, id: i64) -> Result<Uuid, RepoError> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM notes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepoError::NotFound("Note"))
}

async fn set_note_description(
    conn: &mut PgConnection,
    id: i64,
    actor: &Actor,
    description: &str,
) -> Result<Note, RepoError> {
    let owner = lock_note_owner(conn, id).await?;
    if !actor.can_modify(owner) {
        return Err(RepoError::Forbidden("note"));
    }

    let updated = sqlx::query_as::<_, Note>(&format!(
        "UPDATE notes SET description = $2, updated_at = NOW() WHERE id = $1 RETURNING {NOTE_COLUMNS}"
    ))
    .bind(id)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}

async fn cascade_delete_note(
    conn: &mut PgConnection,
    id: i64,
    actor: &Actor,
) -> Result<DeletedNote, RepoError> {
    let owner = lock_note_owner(conn, id).await?;
    if !actor.can_modify(owner) {
        return Err(RepoError::Forbidden("note"));
    }

    // Children first: the foreign keys do not cascade.
    let comments = sqlx::query("DELETE FROM comments WHERE note_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let media = sqlx::query("DELETE FROM media WHERE note_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(DeletedNote {
        note_id: id,
        comments,
        media,
    })
}
