//! Tenant business logic - creating and looking up tenants.

use crate::{
    core::{dialaction::delete_tenant_dialactions, validator::non_blank},
    entities::{Tenant, tenant},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Creates a tenant; the slug must be unique.
pub async fn create_tenant<C: ConnectionTrait>(db: &C, slug: &str, name: &str) -> Result<tenant::Model> {
    let slug = non_blank("slug", slug)?;
    if get_tenant_by_slug(db, &slug).await?.is_some() {
        return Err(Error::exists("Tenant", format!("slug={slug}")));
    }

    tenant::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        slug: Set(slug),
        name: Set(name.trim().to_string()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a tenant by UUID.
pub async fn get_tenant<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<tenant::Model>> {
    Tenant::find_by_id(uuid).one(db).await.map_err(Into::into)
}

/// Finds a tenant by UUID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_tenant<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<tenant::Model> {
    get_tenant(db, uuid)
        .await?
        .ok_or_else(|| Error::not_found("Tenant", uuid))
}

/// Finds a tenant by slug.
pub async fn get_tenant_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<Option<tenant::Model>> {
    Tenant::find()
        .filter(tenant::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all tenants ordered by slug.
pub async fn list_tenants<C: ConnectionTrait>(db: &C) -> Result<Vec<tenant::Model>> {
    Tenant::find()
        .order_by_asc(tenant::Column::Slug)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a tenant.
///
/// Dialactions of the tenant's entities are deleted first; every other tenant-scoped
/// row goes with the tenant through `ON DELETE CASCADE`.
pub async fn delete_tenant<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<()> {
    let tenant = require_tenant(db, uuid).await?;
    let dialactions = delete_tenant_dialactions(db, uuid).await?;
    tenant.delete(db).await?;
    debug!(%uuid, dialactions, "deleted tenant");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        dialaction::{Destination, DialactionOwner, set_dialaction},
        endpoint_sip::EndpointSipArgs,
        ivr::{IvrArgs, create_ivr},
        sip_options::{SectionType, get_options_view, refresh_options_view},
    };
    use crate::entities::{Dialaction, EndpointSip, EndpointSipSection, EndpointSipSectionOption};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[tokio::test]
    async fn test_create_tenant_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_tenant(&db, "  ", "Nobody").await;
        assert!(matches!(result, Err(Error::InvalidInput { field: "slug", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_find_tenant() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        assert_eq!(get_tenant(&db, tenant.uuid).await?.unwrap(), tenant);
        assert_eq!(get_tenant_by_slug(&db, "acme").await?.unwrap().uuid, tenant.uuid);
        assert!(get_tenant_by_slug(&db, "other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "acme").await?;
        let result = create_tenant(&db, "acme", "Acme again").await;
        assert!(matches!(result, Err(Error::ResourceExists { resource: "Tenant", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_delete_tenants() -> Result<()> {
        let db = setup_test_db().await?;
        let zeta = create_test_tenant(&db, "zeta").await?;
        create_test_tenant(&db, "alpha").await?;

        let slugs: Vec<String> = list_tenants(&db).await?.into_iter().map(|t| t.slug).collect();
        assert_eq!(slugs, vec!["alpha".to_string(), "zeta".to_string()]);

        delete_tenant(&db, zeta.uuid).await?;
        assert!(get_tenant(&db, zeta.uuid).await?.is_none());
        assert!(matches!(
            delete_tenant(&db, zeta.uuid).await,
            Err(Error::NotFound { resource: "Tenant", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_tenant_removes_its_dialactions() -> Result<()> {
        let db = setup_test_db().await?;
        let acme = create_test_tenant(&db, "acme").await?;
        let other = create_test_tenant(&db, "other").await?;
        let alice = create_test_user(&db, acme.uuid, "Alice").await?;
        let bob = create_test_user(&db, other.uuid, "Bob").await?;

        set_dialaction(&db, DialactionOwner::User(alice.id), "noanswer", &Destination::Hangup).await?;
        set_dialaction(&db, DialactionOwner::User(bob.id), "noanswer", &Destination::Hangup).await?;
        let menu = create_ivr(
            &db,
            IvrArgs {
                tenant_uuid: acme.uuid,
                name: "main".to_string(),
                description: None,
                menu_sound: "main-menu".to_string(),
                max_tries: 3,
                choices: vec![("1".to_string(), Destination::Hangup)],
            },
        )
        .await?;
        set_dialaction(&db, DialactionOwner::Ivr(menu.id), "timeout", &Destination::Hangup).await?;
        assert_eq!(Dialaction::find().count(&db).await?, 4);

        delete_tenant(&db, acme.uuid).await?;

        let remaining = Dialaction::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].category, "user");
        assert_eq!(remaining[0].categoryval, bob.id.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_tenant_cascades_to_endpoints() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let endpoint = create_test_endpoint(
            &db,
            EndpointSipArgs::new(tenant.uuid)
                .with_name("alice-phone")
                .with_option(SectionType::Auth, "username", "alice"),
        )
        .await?;
        refresh_options_view(&db).await?;
        assert!(get_options_view(&db, endpoint.uuid).await?.is_some());

        delete_tenant(&db, tenant.uuid).await?;

        assert_eq!(EndpointSip::find().count(&db).await?, 0);
        assert_eq!(EndpointSipSection::find().count(&db).await?, 0);
        assert_eq!(EndpointSipSectionOption::find().count(&db).await?, 0);
        assert!(get_options_view(&db, endpoint.uuid).await?.is_none());
        Ok(())
    }
}
