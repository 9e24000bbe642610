//! Transport business logic.

use crate::{
    core::validator::non_blank,
    entities::{EndpointSip, Transport, endpoint_sip, transport},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Creates a transport; the name must be unique and the protocol known.
pub async fn create_transport<C: ConnectionTrait>(
    db: &C,
    name: &str,
    protocol: &str,
) -> Result<transport::Model> {
    let name = non_blank("name", name)?;
    let protocol = protocol.trim().to_ascii_lowercase();
    if !transport::PROTOCOLS.contains(&protocol.as_str()) {
        return Err(Error::invalid(
            "protocol",
            format!("'{protocol}' is not one of {}", transport::PROTOCOLS.join(", ")),
        ));
    }
    if get_transport_by_name(db, &name).await?.is_some() {
        return Err(Error::exists("Transport", format!("name={name}")));
    }

    transport::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        name: Set(name),
        protocol: Set(protocol),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a transport by UUID, failing with [`Error::NotFound`].
pub async fn require_transport<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<transport::Model> {
    Transport::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Transport", uuid))
}

/// Finds a transport by name.
pub async fn get_transport_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<transport::Model>> {
    Transport::find()
        .filter(transport::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all transports ordered by name.
pub async fn list_transports<C: ConnectionTrait>(db: &C) -> Result<Vec<transport::Model>> {
    Transport::find()
        .order_by_asc(transport::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a transport. Endpoints using it keep existing with no transport.
pub async fn delete_transport<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<()> {
    let transport = require_transport(db, uuid).await?;
    EndpointSip::update_many()
        .col_expr(
            endpoint_sip::Column::TransportUuid,
            Expr::value(Option::<Uuid>::None),
        )
        .filter(endpoint_sip::Column::TransportUuid.eq(uuid))
        .exec(db)
        .await?;
    transport.delete(db).await?;
    Ok(())
}
