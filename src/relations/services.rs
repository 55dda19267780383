use tracing::{info, warn};
use uuid::Uuid;

use super::{kind::RelationKind, messages::RelationMessages, store::RelationStore};
use crate::error::AppError;

fn reject_self_target(
    kind: RelationKind,
    messages: &RelationMessages,
    user_id: Uuid,
    subject_id: Uuid,
) -> Result<(), AppError> {
    if kind.forbids_self() && user_id == subject_id {
        warn!(?kind, %user_id, "self-targeted relation rejected");
        return Err(AppError::Conflict(messages.myself().to_string()));
    }
    Ok(())
}

async fn require_subject<S>(store: &S, kind: RelationKind, subject_id: Uuid) -> Result<(), AppError>
where
    S: RelationStore + ?Sized,
{
    if !store.subject_exists(kind, subject_id).await? {
        return Err(AppError::not_found(kind.subject_noun()));
    }
    Ok(())
}

/// Creates the (user, subject) row or fails with `Conflict` if it is already there.
pub async fn add_relation<S>(
    store: &S,
    messages: &RelationMessages,
    kind: RelationKind,
    user_id: Uuid,
    subject_id: Uuid,
) -> Result<(), AppError>
where
    S: RelationStore + ?Sized,
{
    reject_self_target(kind, messages, user_id, subject_id)?;
    require_subject(store, kind, subject_id).await?;

    if !store.insert(kind, user_id, subject_id).await? {
        warn!(?kind, %user_id, %subject_id, "relation already exists");
        return Err(AppError::Conflict(messages.get(kind).exists.clone()));
    }
    info!(?kind, %user_id, %subject_id, "relation added");
    Ok(())
}

/// Deletes the (user, subject) row and returns the confirmation message.
pub async fn remove_relation<S>(
    store: &S,
    messages: &RelationMessages,
    kind: RelationKind,
    user_id: Uuid,
    subject_id: Uuid,
) -> Result<String, AppError>
where
    S: RelationStore + ?Sized,
{
    reject_self_target(kind, messages, user_id, subject_id)?;
    require_subject(store, kind, subject_id).await?;

    let set = messages.get(kind);
    if !store.delete(kind, user_id, subject_id).await? {
        warn!(?kind, %user_id, %subject_id, "relation absent");
        return Err(AppError::AbsentRelation(set.not_found.clone()));
    }
    info!(?kind, %user_id, %subject_id, message = %set.deleted, "relation removed");
    Ok(set.deleted.clone())
}
