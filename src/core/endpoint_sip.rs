//! SIP endpoint business logic - endpoints, their sections and their templates.
//!
//! Functions are generic over [`ConnectionTrait`] so the service layer can run several of
//! them inside one database transaction.

use crate::{
    core::{
        sip_options::{OptionPair, SectionType, TemplateGraph},
        tenant::require_tenant,
        transport::require_transport,
        validator::{ensure_same_tenant, non_blank},
    },
    entities::{
        EndpointSip, EndpointSipOptionsView, EndpointSipSection, EndpointSipSectionOption,
        EndpointSipTemplate, endpoint_sip, endpoint_sip_options_view, endpoint_sip_section,
        endpoint_sip_section_option, endpoint_sip_template,
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Everything needed to create or fully replace an endpoint
#[derive(Debug, Clone)]
pub struct EndpointSipArgs {
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Unique name; generated when `None`
    pub name: Option<String>,
    /// Free-form label
    pub label: Option<String>,
    /// Asterisk identifier override
    pub asterisk_id: Option<String>,
    /// Transport to bind to
    pub transport_uuid: Option<Uuid>,
    /// Whether the endpoint is a template
    pub template: bool,
    /// Own options per section, in declaration order
    pub sections: BTreeMap<SectionType, Vec<OptionPair>>,
}

impl EndpointSipArgs {
    /// Arguments for a plain endpoint without options
    #[must_use]
    pub const fn new(tenant_uuid: Uuid) -> Self {
        Self {
            tenant_uuid,
            name: None,
            label: None,
            asterisk_id: None,
            transport_uuid: None,
            template: false,
            sections: BTreeMap::new(),
        }
    }

    /// Sets the endpoint name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends one option to a section
    #[must_use]
    pub fn with_option(
        mut self,
        section: SectionType,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.sections
            .entry(section)
            .or_default()
            .push((key.into(), value.into()));
        self
    }
}

fn generated_name() -> String {
    let mut name = Uuid::new_v4().simple().to_string();
    name.truncate(8);
    name
}

async fn validate_args<C: ConnectionTrait>(db: &C, args: &EndpointSipArgs) -> Result<()> {
    require_tenant(db, args.tenant_uuid).await?;
    if let Some(transport_uuid) = args.transport_uuid {
        require_transport(db, transport_uuid).await?;
    }
    for (key, _) in args.sections.values().flatten() {
        non_blank("option key", key)?;
    }
    Ok(())
}

async fn ensure_name_available<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except: Option<Uuid>,
) -> Result<()> {
    let mut query = EndpointSip::find().filter(endpoint_sip::Column::Name.eq(name));
    if let Some(uuid) = except {
        query = query.filter(endpoint_sip::Column::Uuid.ne(uuid));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::exists("EndpointSIP", format!("name={name}")));
    }
    Ok(())
}

/// Creates an endpoint and its sections.
pub async fn create_endpoint<C: ConnectionTrait>(db: &C, args: EndpointSipArgs) -> Result<endpoint_sip::Model> {
    validate_args(db, &args).await?;
    let name = match &args.name {
        Some(name) => non_blank("name", name)?,
        None => generated_name(),
    };
    ensure_name_available(db, &name, None).await?;

    let endpoint = endpoint_sip::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        tenant_uuid: Set(args.tenant_uuid),
        label: Set(args.label),
        name: Set(name),
        asterisk_id: Set(args.asterisk_id),
        transport_uuid: Set(args.transport_uuid),
        template: Set(args.template),
    }
    .insert(db)
    .await?;

    for (section, options) in &args.sections {
        replace_section_options(db, endpoint.uuid, *section, options).await?;
    }
    debug!(uuid = %endpoint.uuid, name = %endpoint.name, "created SIP endpoint");
    Ok(endpoint)
}

/// Replaces every attribute and section of an endpoint. The tenant cannot change.
pub async fn update_endpoint<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
    args: EndpointSipArgs,
) -> Result<endpoint_sip::Model> {
    let existing = require_endpoint(db, uuid).await?;
    ensure_same_tenant("EndpointSIP", args.tenant_uuid, existing.tenant_uuid)?;
    validate_args(db, &args).await?;

    let name = match &args.name {
        Some(name) => non_blank("name", name)?,
        None => existing.name.clone(),
    };
    ensure_name_available(db, &name, Some(uuid)).await?;

    if existing.template && !args.template && !get_children(db, uuid).await?.is_empty() {
        return Err(Error::invalid(
            "template",
            "endpoint is still used as a template",
        ));
    }

    let mut endpoint: endpoint_sip::ActiveModel = existing.into();
    endpoint.name = Set(name);
    endpoint.label = Set(args.label);
    endpoint.asterisk_id = Set(args.asterisk_id);
    endpoint.transport_uuid = Set(args.transport_uuid);
    endpoint.template = Set(args.template);
    let endpoint = endpoint.update(db).await?;

    for section in SectionType::ALL {
        let options = args.sections.get(&section).map_or(&[][..], Vec::as_slice);
        replace_section_options(db, uuid, section, options).await?;
    }
    Ok(endpoint)
}

/// Replaces the own options of one section; an empty list removes the section.
pub async fn replace_section_options<C: ConnectionTrait>(
    db: &C,
    endpoint_uuid: Uuid,
    section: SectionType,
    options: &[OptionPair],
) -> Result<()> {
    let existing = EndpointSipSection::find()
        .filter(endpoint_sip_section::Column::EndpointSipUuid.eq(endpoint_uuid))
        .filter(endpoint_sip_section::Column::Type.eq(section.as_str()))
        .one(db)
        .await?;

    let section_uuid = match existing {
        Some(existing) => {
            EndpointSipSectionOption::delete_many()
                .filter(endpoint_sip_section_option::Column::EndpointSipSectionUuid.eq(existing.uuid))
                .exec(db)
                .await?;
            if options.is_empty() {
                existing.delete(db).await?;
                return Ok(());
            }
            existing.uuid
        }
        None if options.is_empty() => return Ok(()),
        None => {
            endpoint_sip_section::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                endpoint_sip_uuid: Set(endpoint_uuid),
                r#type: Set(section.as_str().to_string()),
            }
            .insert(db)
            .await?
            .uuid
        }
    };

    // one insert per option keeps the autoincrement ids in declaration order
    for (key, value) in options {
        endpoint_sip_section_option::ActiveModel {
            endpoint_sip_section_uuid: Set(section_uuid),
            key: Set(key.clone()),
            value: Set(value.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Finds an endpoint by UUID.
pub async fn get_endpoint<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<endpoint_sip::Model>> {
    EndpointSip::find_by_id(uuid).one(db).await.map_err(Into::into)
}

/// Finds an endpoint by UUID, failing with [`Error::NotFound`].
pub async fn require_endpoint<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<endpoint_sip::Model> {
    get_endpoint(db, uuid)
        .await?
        .ok_or_else(|| Error::not_found("EndpointSIP", uuid))
}

/// Finds an endpoint visible from `tenant_uuid`; other tenants' endpoints are reported
/// as not found.
pub async fn get_endpoint_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    uuid: Uuid,
) -> Result<endpoint_sip::Model> {
    EndpointSip::find_by_id(uuid)
        .filter(endpoint_sip::Column::TenantUuid.eq(tenant_uuid))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("EndpointSIP", uuid))
}

/// Finds an endpoint by its unique name.
pub async fn get_endpoint_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<endpoint_sip::Model>> {
    EndpointSip::find()
        .filter(endpoint_sip::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists a tenant's endpoints by name; `template` filters templates in or out.
pub async fn list_endpoints<C: ConnectionTrait>(
    db: &C,
    tenant_uuid: Uuid,
    template: Option<bool>,
) -> Result<Vec<endpoint_sip::Model>> {
    let mut query = EndpointSip::find().filter(endpoint_sip::Column::TenantUuid.eq(tenant_uuid));
    if let Some(template) = template {
        query = query.filter(endpoint_sip::Column::Template.eq(template));
    }
    query
        .order_by_asc(endpoint_sip::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Own sections of an endpoint with their options in declaration order.
pub async fn get_sections<C: ConnectionTrait>(
    db: &C,
    endpoint_uuid: Uuid,
) -> Result<BTreeMap<SectionType, Vec<OptionPair>>> {
    let sections: BTreeMap<Uuid, SectionType> = EndpointSipSection::find()
        .filter(endpoint_sip_section::Column::EndpointSipUuid.eq(endpoint_uuid))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|section| Some((section.uuid, section.section_type()?)))
        .collect();
    if sections.is_empty() {
        return Ok(BTreeMap::new());
    }

    let options = EndpointSipSectionOption::find()
        .filter(
            endpoint_sip_section_option::Column::EndpointSipSectionUuid
                .is_in(sections.keys().copied().collect::<Vec<_>>()),
        )
        .order_by_asc(endpoint_sip_section_option::Column::Id)
        .all(db)
        .await?;

    let mut resolved: BTreeMap<SectionType, Vec<OptionPair>> = BTreeMap::new();
    for option in options {
        if let Some(section) = sections.get(&option.endpoint_sip_section_uuid) {
            resolved
                .entry(*section)
                .or_default()
                .push((option.key, option.value));
        }
    }
    Ok(resolved)
}

/// Deletes an endpoint together with its sections, template edges and view row.
pub async fn delete_endpoint<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<()> {
    let endpoint = require_endpoint(db, uuid).await?;

    for section in SectionType::ALL {
        replace_section_options(db, uuid, section, &[]).await?;
    }
    EndpointSipTemplate::delete_many()
        .filter(
            Condition::any()
                .add(endpoint_sip_template::Column::ChildUuid.eq(uuid))
                .add(endpoint_sip_template::Column::ParentUuid.eq(uuid)),
        )
        .exec(db)
        .await?;
    EndpointSipOptionsView::delete_many()
        .filter(endpoint_sip_options_view::Column::RootUuid.eq(uuid))
        .exec(db)
        .await?;
    endpoint.delete(db).await?;
    Ok(())
}

/// Templates of an endpoint in priority order.
pub async fn get_templates<C: ConnectionTrait>(db: &C, child_uuid: Uuid) -> Result<Vec<endpoint_sip::Model>> {
    let edges = EndpointSipTemplate::find()
        .filter(endpoint_sip_template::Column::ChildUuid.eq(child_uuid))
        .order_by_asc(endpoint_sip_template::Column::Priority)
        .order_by_asc(endpoint_sip_template::Column::ParentUuid)
        .all(db)
        .await?;

    let mut templates = Vec::with_capacity(edges.len());
    for edge in edges {
        templates.push(require_endpoint(db, edge.parent_uuid).await?);
    }
    Ok(templates)
}

/// Endpoints that inherit directly from `parent_uuid`.
pub async fn get_children<C: ConnectionTrait>(db: &C, parent_uuid: Uuid) -> Result<Vec<Uuid>> {
    Ok(EndpointSipTemplate::find()
        .filter(endpoint_sip_template::Column::ParentUuid.eq(parent_uuid))
        .all(db)
        .await?
        .into_iter()
        .map(|edge| edge.child_uuid)
        .collect())
}

/// Replaces the templates of an endpoint; `parents[0]` gets priority 0.
///
/// Every parent must exist, be flagged as a template and share the child's tenant.
/// An assignment that would close a template cycle, or push the child or any endpoint
/// inheriting from it past `MAX_TEMPLATE_DEPTH`, is refused and leaves the existing
/// edges untouched.
pub async fn set_templates<C: ConnectionTrait>(db: &C, child_uuid: Uuid, parents: &[Uuid]) -> Result<()> {
    let child = require_endpoint(db, child_uuid).await?;

    let mut seen = HashSet::new();
    for parent_uuid in parents {
        if !seen.insert(*parent_uuid) {
            return Err(Error::invalid(
                "templates",
                format!("template {parent_uuid} listed twice"),
            ));
        }
        if *parent_uuid == child_uuid {
            return Err(Error::TemplateCycle { endpoint: child_uuid });
        }
        let parent = require_endpoint(db, *parent_uuid).await?;
        ensure_same_tenant("EndpointSIP template", child.tenant_uuid, parent.tenant_uuid)?;
        if !parent.template {
            return Err(Error::NotATemplate { uuid: parent.uuid });
        }
    }

    let mut graph = TemplateGraph::new();
    for edge in EndpointSipTemplate::find().all(db).await? {
        graph.add_parent(edge.child_uuid, edge.parent_uuid, edge.priority);
    }
    graph.set_parents(child_uuid, parents);
    graph.check_descendant_chains(child_uuid)?;

    EndpointSipTemplate::delete_many()
        .filter(endpoint_sip_template::Column::ChildUuid.eq(child_uuid))
        .exec(db)
        .await?;
    for (priority, parent_uuid) in (0_i32..).zip(parents) {
        endpoint_sip_template::ActiveModel {
            child_uuid: Set(child_uuid),
            parent_uuid: Set(*parent_uuid),
            priority: Set(priority),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}
