//! Voicemail business logic.

use crate::{
    core::{dialaction::unlink_destinations_to, validator::non_blank},
    entities::{User, Voicemail, user, voicemail},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Creates a voicemail box; `mailbox` must be unique within `context`.
pub async fn create_voicemail<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    context: &str,
    mailbox: &str,
    fullname: &str,
    email: Option<String>,
) -> Result<voicemail::Model> {
    let context = non_blank("context", context)?;
    let mailbox = non_blank("mailbox", mailbox)?;
    let existing = Voicemail::find()
        .filter(voicemail::Column::Context.eq(context.as_str()))
        .filter(voicemail::Column::Mailbox.eq(mailbox.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::exists("Voicemail", format!("{mailbox}@{context}")));
    }

    voicemail::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        context: Set(context),
        mailbox: Set(mailbox),
        fullname: Set(fullname.trim().to_string()),
        email: Set(email.filter(|e| !e.trim().is_empty())),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a voicemail by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_voicemail<C: ConnectionTrait>(db: &C, id: i32) -> Result<voicemail::Model> {
    Voicemail::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Voicemail", id))
}

/// Lists the voicemails of a tenant.
pub async fn list_voicemails<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<voicemail::Model>> {
    Voicemail::find()
        .filter(voicemail::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(voicemail::Column::Context)
        .order_by_asc(voicemail::Column::Mailbox)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a voicemail, detaching it from users and unlinking destinations to it.
pub async fn delete_voicemail<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let voicemail = require_voicemail(db, id).await?;
    User::update_many()
        .col_expr(user::Column::VoicemailId, Expr::value(Option::<i32>::None))
        .col_expr(user::Column::Enablevoicemail, Expr::value(0))
        .filter(user::Column::VoicemailId.eq(id))
        .exec(db)
        .await?;
    unlink_destinations_to(db, "voicemail", &id.to_string()).await?;
    voicemail.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_voicemail() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        let voicemail =
            create_voicemail(&db, tenant.uuid, "default", "1000", "Alice", Some(String::new())).await?;
        assert_eq!(voicemail.mailbox, "1000");
        assert_eq!(voicemail.email, None);

        let duplicate = create_voicemail(&db, tenant.uuid, "default", "1000", "Bob", None).await;
        assert!(matches!(duplicate, Err(Error::ResourceExists { .. })));
        assert_eq!(list_voicemails(&db, tenant.uuid).await?.len(), 1);
        Ok(())
    }
}
