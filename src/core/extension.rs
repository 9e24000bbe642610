//! Extension business logic - dialable numbers and what they route to.

use crate::{
    core::validator::{ensure_same_tenant, non_blank},
    entities::{Conference, Extension, Group, Incall, Ivr, Queue, User, extension},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::debug;

/// Entity an extension can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionTarget {
    /// A user line
    User(i32),
    /// A ring group
    Group(i32),
    /// A queue
    Queue(i32),
    /// An incoming call route
    Incall(i32),
    /// A conference room
    Conference(i32),
    /// An IVR menu
    Ivr(i32),
}

impl ExtensionTarget {
    /// Value stored in the extension `type` column
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Group(_) => "group",
            Self::Queue(_) => "queue",
            Self::Incall(_) => "incall",
            Self::Conference(_) => "conference",
            Self::Ivr(_) => "ivr",
        }
    }

    /// Value stored in the extension `typeval` column
    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::User(id)
            | Self::Group(id)
            | Self::Queue(id)
            | Self::Incall(id)
            | Self::Conference(id)
            | Self::Ivr(id) => *id,
        }
    }

    async fn tenant_uuid<C: ConnectionTrait>(&self, db: &C) -> Result<Uuid> {
        let id = self.id();
        let tenant_uuid = match self {
            Self::User(_) => User::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Group(_) => Group::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Queue(_) => Queue::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Incall(_) => Incall::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Conference(_) => Conference::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Ivr(_) => Ivr::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
        };
        tenant_uuid.ok_or_else(|| Error::not_found(self.kind(), id))
    }
}

/// Creates a free extension; `exten` must be unique within `context`.
pub async fn create_extension<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    context: &str,
    exten: &str,
) -> Result<extension::Model> {
    let context = non_blank("context", context)?;
    let exten = non_blank("exten", exten)?;
    if !exten.chars().all(|c| c.is_ascii_digit() || matches!(c, '*' | '#' | '+')) {
        return Err(Error::invalid("exten", format!("'{exten}' is not dialable")));
    }
    if get_extension_by_exten(db, &context, &exten).await?.is_some() {
        return Err(Error::exists("Extension", format!("{exten}@{context}")));
    }

    extension::ActiveModel {
        tenant_uuid: Set(tenant_uuid),
        context: Set(context),
        exten: Set(exten),
        r#type: Set(String::new()),
        typeval: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds an extension by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_extension<C: ConnectionTrait>(db: &C, id: i32) -> Result<extension::Model> {
    Extension::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Extension", id))
}

/// Finds an extension by number and context.
pub async fn get_extension_by_exten<C: ConnectionTrait>(
    db: &C,
    context: &str,
    exten: &str,
) -> Result<Option<extension::Model>> {
    Extension::find()
        .filter(extension::Column::Context.eq(context))
        .filter(extension::Column::Exten.eq(exten))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the extensions of a tenant ordered by context then number.
pub async fn list_extensions<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<extension::Model>> {
    Extension::find()
        .filter(extension::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(extension::Column::Context)
        .order_by_asc(extension::Column::Exten)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Extensions currently routing to `target`.
pub async fn extensions_of<C: ConnectionTrait>(
    db: &C,
    target: ExtensionTarget,
) -> Result<Vec<extension::Model>> {
    Extension::find()
        .filter(extension::Column::Type.eq(target.kind()))
        .filter(extension::Column::Typeval.eq(target.id().to_string()))
        .order_by_asc(extension::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Routes a free extension to `target`. Both must belong to the same tenant.
pub async fn associate_extension<C: ConnectionTrait>(
    db: &C,
    extension_id: i32,
    target: ExtensionTarget,
) -> Result<extension::Model> {
    let extension = require_extension(db, extension_id).await?;
    if extension.is_associated() {
        return Err(Error::AlreadyAssociated {
            resource: "Extension",
            id: extension.id.to_string(),
        });
    }
    ensure_same_tenant(target.kind(), extension.tenant_uuid, target.tenant_uuid(db).await?)?;

    let mut active: extension::ActiveModel = extension.into();
    active.r#type = Set(target.kind().to_string());
    active.typeval = Set(target.id().to_string());
    let extension = active.update(db).await?;
    debug!(exten = %extension.exten, context = %extension.context, kind = target.kind(), "associated extension");
    Ok(extension)
}

/// Frees an extension routed to `target`.
pub async fn dissociate_extension<C: ConnectionTrait>(
    db: &C,
    extension_id: i32,
    target: ExtensionTarget,
) -> Result<extension::Model> {
    let extension = require_extension(db, extension_id).await?;
    if extension.r#type != target.kind() || extension.typeval != target.id().to_string() {
        return Err(Error::not_found(
            "Extension association",
            format!("{}/{}", target.kind(), target.id()),
        ));
    }

    let mut active: extension::ActiveModel = extension.into();
    active.r#type = Set(String::new());
    active.typeval = Set(String::new());
    active.update(db).await.map_err(Into::into)
}

/// Frees every extension routed to `target`, used when the target is deleted.
pub async fn release_extensions<C: ConnectionTrait>(db: &C, target: ExtensionTarget) -> Result<u64> {
    let result = Extension::update_many()
        .col_expr(extension::Column::Type, Expr::value(""))
        .col_expr(extension::Column::Typeval, Expr::value(""))
        .filter(extension::Column::Type.eq(target.kind()))
        .filter(extension::Column::Typeval.eq(target.id().to_string()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes an extension.
pub async fn delete_extension<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let extension = require_extension(db, id).await?;
    extension.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_extension_unique_per_context() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        let extension = create_extension(&db, tenant.uuid, "internal", " 1000 ").await?;
        assert_eq!(extension.exten, "1000");
        assert!(!extension.is_associated());

        let result = create_extension(&db, tenant.uuid, "internal", "1000").await;
        assert!(matches!(result, Err(Error::ResourceExists { .. })));

        // same number in another context is fine
        create_extension(&db, tenant.uuid, "from-extern", "1000").await?;
        assert!(create_extension(&db, tenant.uuid, "internal", "10a0").await.is_err());
        assert_eq!(list_extensions(&db, tenant.uuid).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_associate_and_dissociate() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;
        let extension = create_extension(&db, tenant.uuid, "internal", "1000").await?;
        let target = ExtensionTarget::User(user.id);

        let associated = associate_extension(&db, extension.id, target).await?;
        assert_eq!(associated.r#type, "user");
        assert_eq!(associated.typeval, user.id.to_string());
        assert_eq!(extensions_of(&db, target).await?.len(), 1);

        let again = associate_extension(&db, extension.id, target).await;
        assert!(matches!(again, Err(Error::AlreadyAssociated { .. })));

        let wrong = dissociate_extension(&db, extension.id, ExtensionTarget::Group(user.id)).await;
        assert!(matches!(wrong, Err(Error::NotFound { .. })));

        let freed = dissociate_extension(&db, extension.id, target).await?;
        assert!(!freed.is_associated());
        Ok(())
    }

    #[tokio::test]
    async fn test_associate_across_tenants_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let acme = create_test_tenant(&db, "acme").await?;
        let other = create_test_tenant(&db, "other").await?;
        let user = create_test_user(&db, other.uuid, "Mallory").await?;
        let extension = create_extension(&db, acme.uuid, "internal", "1000").await?;

        let result = associate_extension(&db, extension.id, ExtensionTarget::User(user.id)).await;
        assert!(matches!(result, Err(Error::DifferentTenants { .. })));

        let result = associate_extension(&db, extension.id, ExtensionTarget::Queue(404)).await;
        assert!(matches!(result, Err(Error::NotFound { resource: "queue", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_release_extensions() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;
        let target = ExtensionTarget::User(user.id);
        for exten in ["1000", "1001"] {
            let extension = create_extension(&db, tenant.uuid, "internal", exten).await?;
            associate_extension(&db, extension.id, target).await?;
        }

        assert_eq!(release_extensions(&db, target).await?, 2);
        assert!(extensions_of(&db, target).await?.is_empty());
        Ok(())
    }
}
