//! SIP template option resolution.
//!
//! An endpoint's effective options for a section are the options inherited from its
//! parent templates, in priority order, followed by its own options. The definition is
//! recursive: a parent contributes its own combined options, i.e. whatever it inherited
//! followed by what it declares. The result is an ordered list of `(key, value)` pairs in
//! which keys may repeat, because PJSIP accepts repeated keys such as `contact`.
//!
//! The template graph reachable from an endpoint is fetched with a single recursive
//! CTE, then resolved in memory by [`TemplateGraph`]. Cycles and chains deeper than
//! [`MAX_TEMPLATE_DEPTH`] are reported as errors instead of recursing forever.
//!
//! [`OptionsView`] collapses the ordered lists into one value per key (last one wins)
//! for point lookups such as the caller id or the auth username; the
//! `endpoint_sip_options_view` table stores it for every endpoint and is rebuilt by
//! [`refresh_options_view`].

use crate::{
    entities::{
        EndpointSip, EndpointSipOptionsView, EndpointSipSection, EndpointSipSectionOption,
        EndpointSipTemplate, endpoint_sip, endpoint_sip_options_view, endpoint_sip_section,
        endpoint_sip_section_option,
    },
    errors::{Error, Result},
};
use sea_orm::{
    DbBackend, FromQueryResult, QueryOrder, Set, Statement, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Deepest template chain the resolver follows, counted in edges from the endpoint.
pub const MAX_TEMPLATE_DEPTH: i32 = 32;

/// One `(key, value)` option line
pub type OptionPair = (String, String);

/// The typed sections of a SIP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    /// Address of record: contacts, registration limits
    Aor,
    /// Inbound authentication credentials
    Auth,
    /// The endpoint itself: codecs, caller id, context
    Endpoint,
    /// Source-address matching
    Identify,
    /// Credentials presented to the remote side
    OutboundAuth,
    /// Outbound registration
    Registration,
    /// Credentials used by the outbound registration
    RegistrationOutboundAuth,
}

impl SectionType {
    /// Every section type, in storage order
    pub const ALL: [Self; 7] = [
        Self::Aor,
        Self::Auth,
        Self::Endpoint,
        Self::Identify,
        Self::OutboundAuth,
        Self::Registration,
        Self::RegistrationOutboundAuth,
    ];

    /// Value stored in the `type` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aor => "aor",
            Self::Auth => "auth",
            Self::Endpoint => "endpoint",
            Self::Identify => "identify",
            Self::OutboundAuth => "outbound_auth",
            Self::Registration => "registration",
            Self::RegistrationOutboundAuth => "registration_outbound_auth",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| Error::invalid("section", format!("unknown section type '{s}'")))
    }
}

/// Template graph and section options of a set of endpoints.
///
/// Built from the database by [`load_template_graph`] or [`load_full_graph`], or by hand
/// in tests. Resolution never touches the database.
#[derive(Debug, Clone, Default)]
pub struct TemplateGraph {
    parents: HashMap<Uuid, Vec<(i32, Uuid)>>,
    options: HashMap<(Uuid, SectionType), Vec<OptionPair>>,
}

impl TemplateGraph {
    /// Creates an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `child` inherits from `parent` at `priority`
    pub fn add_parent(&mut self, child: Uuid, parent: Uuid, priority: i32) {
        let parents = self.parents.entry(child).or_default();
        if !parents.iter().any(|(_, uuid)| *uuid == parent) {
            parents.push((priority, parent));
        }
    }

    /// Replaces the parents of `child`, priorities following slice order
    pub fn set_parents(&mut self, child: Uuid, parents: &[Uuid]) {
        self.parents.remove(&child);
        for (priority, parent) in (0_i32..).zip(parents) {
            self.add_parent(child, *parent, priority);
        }
    }

    /// Appends one option line to an endpoint's own section
    pub fn add_option(
        &mut self,
        endpoint: Uuid,
        section: SectionType,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.options
            .entry((endpoint, section))
            .or_default()
            .push((key.into(), value.into()));
    }

    /// Parents of `endpoint` in application order: priority, then UUID for ties
    #[must_use]
    pub fn parents_of(&self, endpoint: Uuid) -> Vec<Uuid> {
        let mut parents = self.parents.get(&endpoint).cloned().unwrap_or_default();
        parents.sort_unstable();
        parents.into_iter().map(|(_, uuid)| uuid).collect()
    }

    /// Options declared on the endpoint itself
    #[must_use]
    pub fn own_options(&self, endpoint: Uuid, section: SectionType) -> &[OptionPair] {
        self.options
            .get(&(endpoint, section))
            .map_or(&[], Vec::as_slice)
    }

    /// Combined options of every parent, concatenated in parent order
    pub fn inherited_options(&self, endpoint: Uuid, section: SectionType) -> Result<Vec<OptionPair>> {
        self.check_chain(endpoint)?;
        let mut resolved_nodes = HashMap::new();
        let mut resolved = Vec::new();
        for parent in self.parents_of(endpoint) {
            resolved.extend(self.resolve(parent, section, &mut resolved_nodes));
        }
        Ok(resolved)
    }

    /// Inherited options followed by the endpoint's own options
    pub fn combined_options(&self, endpoint: Uuid, section: SectionType) -> Result<Vec<OptionPair>> {
        let mut resolved = self.inherited_options(endpoint, section)?;
        resolved.extend_from_slice(self.own_options(endpoint, section));
        Ok(resolved)
    }

    /// Combined options of every section type; sections without options are omitted.
    pub fn combined_sections(&self, endpoint: Uuid) -> Result<BTreeMap<SectionType, Vec<OptionPair>>> {
        let mut sections = BTreeMap::new();
        for section in SectionType::ALL {
            let options = self.combined_options(endpoint, section)?;
            if !options.is_empty() {
                sections.insert(section, options);
            }
        }
        Ok(sections)
    }

    /// Fails if following the parents of `endpoint` loops or runs too deep
    pub fn check_chain(&self, endpoint: Uuid) -> Result<()> {
        let height = self.height(endpoint, &mut vec![endpoint], &mut HashMap::new())?;
        if height > max_depth() {
            return Err(Error::TemplateDepthExceeded { endpoint });
        }
        Ok(())
    }

    /// Like [`Self::check_chain`], for `endpoint` and every endpoint inheriting from it
    pub fn check_descendant_chains(&self, endpoint: Uuid) -> Result<()> {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (child, parents) in &self.parents {
            for (_, parent) in parents {
                children.entry(*parent).or_default().push(*child);
            }
        }

        let mut seen = HashSet::from([endpoint]);
        let mut pending = vec![endpoint];
        while let Some(node) = pending.pop() {
            self.check_chain(node)?;
            for child in children.get(&node).into_iter().flatten() {
                if seen.insert(*child) {
                    pending.push(*child);
                }
            }
        }
        Ok(())
    }

    /// Longest chain of edges above `node`; each node is measured once.
    fn height(&self, node: Uuid, path: &mut Vec<Uuid>, heights: &mut HashMap<Uuid, usize>) -> Result<usize> {
        if let Some(height) = heights.get(&node) {
            return Ok(*height);
        }
        let mut height = 0;
        for parent in self.parents_of(node) {
            if path.contains(&parent) {
                return Err(Error::TemplateCycle { endpoint: parent });
            }
            // path holds the root plus every ancestor entered so far
            if path.len() > max_depth() {
                return Err(Error::TemplateDepthExceeded { endpoint: path[0] });
            }
            path.push(parent);
            height = height.max(self.height(parent, path, heights)? + 1);
            path.pop();
        }
        heights.insert(node, height);
        Ok(height)
    }

    /// Combined options of a node whose chain has been checked
    fn resolve(
        &self,
        node: Uuid,
        section: SectionType,
        resolved_nodes: &mut HashMap<Uuid, Vec<OptionPair>>,
    ) -> Vec<OptionPair> {
        if let Some(resolved) = resolved_nodes.get(&node) {
            return resolved.clone();
        }
        let mut resolved = Vec::new();
        for parent in self.parents_of(node) {
            resolved.extend(self.resolve(parent, section, resolved_nodes));
        }
        resolved.extend_from_slice(self.own_options(node, section));
        resolved_nodes.insert(node, resolved.clone());
        resolved
    }
}

fn max_depth() -> usize {
    usize::try_from(MAX_TEMPLATE_DEPTH).unwrap_or(usize::MAX)
}

/// Resolved options collapsed to one value per key, last occurrence winning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionsView {
    sections: BTreeMap<SectionType, BTreeMap<String, String>>,
}

impl OptionsView {
    /// Collapses ordered option lists; later values override earlier ones
    #[must_use]
    pub fn from_sections(sections: &BTreeMap<SectionType, Vec<OptionPair>>) -> Self {
        let sections = sections
            .iter()
            .map(|(section, options)| (*section, options.iter().cloned().collect()))
            .collect();
        Self { sections }
    }

    /// Value of `key` in `section`
    #[must_use]
    pub fn get(&self, section: SectionType, key: &str) -> Option<&str> {
        self.sections
            .get(&section)
            .and_then(|options| options.get(key))
            .map(String::as_str)
    }

    /// All values of a section
    #[must_use]
    pub fn section(&self, section: SectionType) -> Option<&BTreeMap<String, String>> {
        self.sections.get(&section)
    }

    /// `callerid` of the endpoint section
    #[must_use]
    pub fn caller_id(&self) -> Option<&str> {
        self.get(SectionType::Endpoint, "callerid")
    }

    /// `username` of the auth section
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get(SectionType::Auth, "username")
    }

    /// `password` of the auth section
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get(SectionType::Auth, "password")
    }

    /// Whether no option is set at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, FromQueryResult)]
struct TemplateEdgeRow {
    child_uuid: Uuid,
    parent_uuid: Uuid,
    priority: i32,
}

fn ancestors_statement(backend: DbBackend, endpoint: Uuid) -> Statement {
    let (root, depth) = match backend {
        DbBackend::Postgres => ("$1", "$2"),
        _ => ("?", "?"),
    };
    // One level past MAX_TEMPLATE_DEPTH so the resolver can tell a long chain
    // from one that ends exactly at the limit.
    let sql = format!(
        "WITH RECURSIVE ancestors(child_uuid, parent_uuid, priority, depth) AS (
            SELECT child_uuid, parent_uuid, priority, 1
            FROM endpoint_sip_template WHERE child_uuid = {root}
            UNION
            SELECT t.child_uuid, t.parent_uuid, t.priority, a.depth + 1
            FROM endpoint_sip_template t
            JOIN ancestors a ON t.child_uuid = a.parent_uuid
            WHERE a.depth <= {depth}
        )
        SELECT DISTINCT child_uuid, parent_uuid, priority FROM ancestors"
    );
    Statement::from_sql_and_values(backend, sql, [endpoint.into(), MAX_TEMPLATE_DEPTH.into()])
}

async fn load_options<C: ConnectionTrait>(
    db: &C,
    graph: &mut TemplateGraph,
    endpoints: Option<Vec<Uuid>>,
) -> Result<()> {
    let mut sections = EndpointSipSection::find();
    if let Some(endpoints) = endpoints {
        sections = sections.filter(endpoint_sip_section::Column::EndpointSipUuid.is_in(endpoints));
    }
    let sections: HashMap<Uuid, (Uuid, SectionType)> = sections
        .all(db)
        .await?
        .into_iter()
        .filter_map(|section| {
            let section_type = section.section_type()?;
            Some((section.uuid, (section.endpoint_sip_uuid, section_type)))
        })
        .collect();
    if sections.is_empty() {
        return Ok(());
    }

    let options = EndpointSipSectionOption::find()
        .filter(
            endpoint_sip_section_option::Column::EndpointSipSectionUuid
                .is_in(sections.keys().copied().collect::<Vec<_>>()),
        )
        .order_by_asc(endpoint_sip_section_option::Column::Id)
        .all(db)
        .await?;

    for option in options {
        if let Some((endpoint, section)) = sections.get(&option.endpoint_sip_section_uuid) {
            graph.add_option(*endpoint, *section, option.key, option.value);
        }
    }
    Ok(())
}

/// Loads the template chain of `endpoint` and the options of every node on it.
pub async fn load_template_graph<C: ConnectionTrait>(db: &C, endpoint: Uuid) -> Result<TemplateGraph> {
    if EndpointSip::find_by_id(endpoint).one(db).await?.is_none() {
        return Err(Error::not_found("EndpointSIP", endpoint));
    }

    let backend = db.get_database_backend();
    let edges = TemplateEdgeRow::find_by_statement(ancestors_statement(backend, endpoint))
        .all(db)
        .await?;

    let mut graph = TemplateGraph::new();
    let mut nodes: HashSet<Uuid> = HashSet::from([endpoint]);
    for edge in edges {
        nodes.insert(edge.parent_uuid);
        graph.add_parent(edge.child_uuid, edge.parent_uuid, edge.priority);
    }
    debug!(%endpoint, nodes = nodes.len(), "loaded template chain");

    load_options(db, &mut graph, Some(nodes.into_iter().collect())).await?;
    Ok(graph)
}

/// Loads every template edge and every option of every endpoint.
pub async fn load_full_graph<C: ConnectionTrait>(db: &C) -> Result<TemplateGraph> {
    let mut graph = TemplateGraph::new();
    for edge in EndpointSipTemplate::find().all(db).await? {
        graph.add_parent(edge.child_uuid, edge.parent_uuid, edge.priority);
    }
    load_options(db, &mut graph, None).await?;
    Ok(graph)
}

/// Options declared on the endpoint itself for `section`, in declaration order.
pub async fn own_section_options<C: ConnectionTrait>(
    db: &C,
    endpoint: Uuid,
    section: SectionType,
) -> Result<Vec<OptionPair>> {
    let graph = load_template_graph(db, endpoint).await?;
    Ok(graph.own_options(endpoint, section).to_vec())
}

/// Options inherited from the endpoint's templates for `section`.
pub async fn inherited_section_options<C: ConnectionTrait>(
    db: &C,
    endpoint: Uuid,
    section: SectionType,
) -> Result<Vec<OptionPair>> {
    load_template_graph(db, endpoint)
        .await?
        .inherited_options(endpoint, section)
}

/// Inherited options followed by own options for `section`.
pub async fn combined_section_options<C: ConnectionTrait>(
    db: &C,
    endpoint: Uuid,
    section: SectionType,
) -> Result<Vec<OptionPair>> {
    load_template_graph(db, endpoint)
        .await?
        .combined_options(endpoint, section)
}

/// Combined options of every non-empty section of the endpoint.
pub async fn resolve_all_sections<C: ConnectionTrait>(
    db: &C,
    endpoint: Uuid,
) -> Result<BTreeMap<SectionType, Vec<OptionPair>>> {
    load_template_graph(db, endpoint)
        .await?
        .combined_sections(endpoint)
}

/// Computes the single-value view of an endpoint without touching the stored view.
pub async fn resolve_options_view<C: ConnectionTrait>(db: &C, endpoint: Uuid) -> Result<OptionsView> {
    let sections = resolve_all_sections(db, endpoint).await?;
    Ok(OptionsView::from_sections(&sections))
}

/// Rebuilds the `endpoint_sip_options_view` table for every endpoint.
///
/// Returns the number of rows written.
pub async fn refresh_options_view<C: ConnectionTrait>(db: &C) -> Result<usize> {
    let graph = load_full_graph(db).await?;
    let endpoints = EndpointSip::find().all(db).await?;

    EndpointSipOptionsView::delete_many().exec(db).await?;
    for endpoint in &endpoints {
        let view = OptionsView::from_sections(&graph.combined_sections(endpoint.uuid)?);
        endpoint_sip_options_view::ActiveModel {
            root_uuid: Set(endpoint.uuid),
            options: Set(serde_json::to_value(&view)?),
        }
        .insert(db)
        .await?;
    }

    info!("Options view refreshed for {} endpoints", endpoints.len());
    Ok(endpoints.len())
}

/// Reads the stored view of an endpoint, `None` if it has not been refreshed yet.
pub async fn get_options_view<C: ConnectionTrait>(db: &C, endpoint: Uuid) -> Result<Option<OptionsView>> {
    EndpointSipOptionsView::find_by_id(endpoint)
        .one(db)
        .await?
        .map(|row| serde_json::from_value(row.options).map_err(Into::into))
        .transpose()
}

/// Finds the endpoint whose resolved auth username is `username`, using the stored view.
pub async fn find_endpoint_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<endpoint_sip::Model>> {
    for row in EndpointSipOptionsView::find().all(db).await? {
        let view: OptionsView = serde_json::from_value(row.options)?;
        if view.username() == Some(username) {
            return EndpointSip::find_by_id(row.root_uuid)
                .one(db)
                .await
                .map_err(Into::into);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::endpoint_sip::{EndpointSipArgs, set_templates};
    use crate::test_utils::*;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<OptionPair> {
        items
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_section_type_round_trip() {
        for section in SectionType::ALL {
            assert_eq!(section.as_str().parse::<SectionType>().unwrap(), section);
        }
        assert!("bogus".parse::<SectionType>().is_err());
    }

    #[test]
    fn test_no_templates_combined_equals_own() {
        let endpoint = Uuid::new_v4();
        let mut graph = TemplateGraph::new();
        graph.add_option(endpoint, SectionType::Aor, "max_contacts", "1");
        graph.add_option(endpoint, SectionType::Aor, "contact", "sip:a@host");
        graph.add_option(endpoint, SectionType::Aor, "contact", "sip:b@host");

        let combined = graph.combined_options(endpoint, SectionType::Aor).unwrap();
        assert_eq!(combined, graph.own_options(endpoint, SectionType::Aor).to_vec());
        assert_eq!(combined.len(), 3);
        assert!(graph.inherited_options(endpoint, SectionType::Aor).unwrap().is_empty());
    }

    #[test]
    fn test_empty_everywhere_is_empty() {
        let graph = TemplateGraph::new();
        let endpoint = Uuid::new_v4();
        assert!(graph.combined_options(endpoint, SectionType::Auth).unwrap().is_empty());
        assert!(graph.combined_sections(endpoint).unwrap().is_empty());
    }

    #[test]
    fn test_parent_options_precede_own_options() {
        let (endpoint, template) = (Uuid::new_v4(), Uuid::new_v4());
        let mut graph = TemplateGraph::new();
        graph.add_parent(endpoint, template, 0);
        graph.add_option(endpoint, SectionType::Aor, "max_contacts", "1");
        graph.add_option(template, SectionType::Aor, "max_contacts", "5");
        graph.add_option(template, SectionType::Aor, "qualify_frequency", "30");

        let combined = graph.combined_options(endpoint, SectionType::Aor).unwrap();
        assert_eq!(
            combined,
            pairs(&[
                ("max_contacts", "5"),
                ("qualify_frequency", "30"),
                ("max_contacts", "1"),
            ])
        );

        let view = OptionsView::from_sections(&graph.combined_sections(endpoint).unwrap());
        assert_eq!(view.get(SectionType::Aor, "max_contacts"), Some("1"));
        assert_eq!(view.get(SectionType::Aor, "qualify_frequency"), Some("30"));
    }

    #[test]
    fn test_parents_follow_priority_order() {
        let (endpoint, first, second) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut graph = TemplateGraph::new();
        // inserted out of order on purpose
        graph.add_parent(endpoint, second, 1);
        graph.add_parent(endpoint, first, 0);
        graph.add_option(first, SectionType::Endpoint, "allow", "ulaw");
        graph.add_option(second, SectionType::Endpoint, "allow", "alaw");

        let mut expected = graph.combined_options(first, SectionType::Endpoint).unwrap();
        expected.extend(graph.combined_options(second, SectionType::Endpoint).unwrap());
        assert_eq!(
            graph.inherited_options(endpoint, SectionType::Endpoint).unwrap(),
            expected
        );
        assert_eq!(expected, pairs(&[("allow", "ulaw"), ("allow", "alaw")]));
    }

    #[test]
    fn test_grandparent_options_come_first() {
        let (endpoint, parent, grandparent) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut graph = TemplateGraph::new();
        graph.add_parent(endpoint, parent, 0);
        graph.add_parent(parent, grandparent, 0);
        graph.add_option(grandparent, SectionType::Auth, "username", "base");
        graph.add_option(parent, SectionType::Auth, "password", "secret");
        graph.add_option(endpoint, SectionType::Auth, "username", "alice");

        assert_eq!(
            graph.combined_options(endpoint, SectionType::Auth).unwrap(),
            pairs(&[("username", "base"), ("password", "secret"), ("username", "alice")])
        );
    }

    #[test]
    fn test_shared_ancestor_is_not_a_cycle() {
        let (endpoint, left, right, base) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut graph = TemplateGraph::new();
        graph.set_parents(endpoint, &[left, right]);
        graph.add_parent(left, base, 0);
        graph.add_parent(right, base, 0);
        graph.add_option(base, SectionType::Identify, "match", "10.0.0.1");

        let combined = graph.combined_options(endpoint, SectionType::Identify).unwrap();
        assert_eq!(combined, pairs(&[("match", "10.0.0.1"), ("match", "10.0.0.1")]));
        assert!(graph.check_chain(endpoint).is_ok());
    }

    #[test]
    fn test_cycle_is_detected() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut graph = TemplateGraph::new();
        graph.add_parent(a, b, 0);
        graph.add_parent(b, a, 0);

        assert!(matches!(
            graph.combined_options(a, SectionType::Aor),
            Err(Error::TemplateCycle { endpoint }) if endpoint == a
        ));
        assert!(matches!(graph.check_chain(b), Err(Error::TemplateCycle { .. })));
    }

    #[test]
    fn test_chain_deeper_than_limit_is_rejected() {
        let nodes: Vec<Uuid> = (0..=MAX_TEMPLATE_DEPTH + 1).map(|_| Uuid::new_v4()).collect();
        let mut graph = TemplateGraph::new();
        for window in nodes.windows(2) {
            graph.add_parent(window[0], window[1], 0);
        }
        assert!(matches!(
            graph.check_chain(nodes[0]),
            Err(Error::TemplateDepthExceeded { endpoint }) if endpoint == nodes[0]
        ));
        // one level shorter is fine
        assert!(graph.check_chain(nodes[1]).is_ok());
    }

    fn lattice(graph: &mut TemplateGraph, levels: usize) -> Vec<[Uuid; 2]> {
        let rows: Vec<[Uuid; 2]> = (0..levels).map(|_| [Uuid::new_v4(), Uuid::new_v4()]).collect();
        for pair in rows.windows(2) {
            for child in pair[1] {
                graph.set_parents(child, &pair[0]);
            }
        }
        rows
    }

    #[test]
    fn test_repeated_diamonds_resolve_each_node_once() {
        let mut graph = TemplateGraph::new();
        let rows = lattice(&mut graph, 30);
        let bottom = rows[29];
        let endpoint = Uuid::new_v4();
        graph.set_parents(endpoint, &bottom);
        graph.add_option(bottom[0], SectionType::Endpoint, "context", "left");
        graph.add_option(bottom[1], SectionType::Endpoint, "context", "right");

        assert!(graph.check_chain(endpoint).is_ok());
        let mut expected = graph.combined_options(bottom[0], SectionType::Endpoint).unwrap();
        expected.extend(graph.combined_options(bottom[1], SectionType::Endpoint).unwrap());
        assert_eq!(expected, pairs(&[("context", "left"), ("context", "right")]));
        assert_eq!(
            graph.combined_options(endpoint, SectionType::Endpoint).unwrap(),
            expected
        );
    }

    #[test]
    fn test_deep_lattice_is_rejected() {
        let mut graph = TemplateGraph::new();
        let rows = lattice(&mut graph, 34);
        assert!(matches!(
            graph.check_chain(rows[33][0]),
            Err(Error::TemplateDepthExceeded { endpoint }) if endpoint == rows[33][0]
        ));
        assert!(graph.check_chain(rows[32][1]).is_ok());
    }

    #[test]
    fn test_view_value_is_last_occurrence() {
        let endpoint = Uuid::new_v4();
        let mut graph = TemplateGraph::new();
        graph.add_option(endpoint, SectionType::Endpoint, "callerid", "\"A\" <100>");
        graph.add_option(endpoint, SectionType::Endpoint, "callerid", "\"B\" <200>");
        graph.add_option(endpoint, SectionType::Auth, "username", "bob");
        graph.add_option(endpoint, SectionType::Auth, "password", "pw");

        let sections = graph.combined_sections(endpoint).unwrap();
        let view = OptionsView::from_sections(&sections);
        assert_eq!(view.caller_id(), Some("\"B\" <200>"));
        assert_eq!(view.username(), Some("bob"));
        assert_eq!(view.password(), Some("pw"));
        assert!(view.section(SectionType::Aor).is_none());
    }

    #[test]
    fn test_view_json_shape() {
        let endpoint = Uuid::new_v4();
        let mut graph = TemplateGraph::new();
        graph.add_option(endpoint, SectionType::OutboundAuth, "username", "trunk");
        let view = OptionsView::from_sections(&graph.combined_sections(endpoint).unwrap());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({ "outbound_auth": { "username": "trunk" } }));
        let back: OptionsView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }

    #[tokio::test]
    async fn test_combined_options_from_database() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        let template = create_test_endpoint(
            &db,
            EndpointSipArgs {
                template: true,
                ..EndpointSipArgs::new(tenant.uuid)
                    .with_name("webrtc")
                    .with_option(SectionType::Aor, "max_contacts", "5")
                    .with_option(SectionType::Aor, "qualify_frequency", "30")
            },
        )
        .await?;
        let endpoint = create_test_endpoint(
            &db,
            EndpointSipArgs::new(tenant.uuid)
                .with_name("alice")
                .with_option(SectionType::Aor, "max_contacts", "1"),
        )
        .await?;
        set_templates(&db, endpoint.uuid, &[template.uuid]).await?;

        let combined = combined_section_options(&db, endpoint.uuid, SectionType::Aor).await?;
        assert_eq!(
            combined,
            pairs(&[
                ("max_contacts", "5"),
                ("qualify_frequency", "30"),
                ("max_contacts", "1"),
            ])
        );
        assert_eq!(
            own_section_options(&db, endpoint.uuid, SectionType::Aor).await?,
            pairs(&[("max_contacts", "1")])
        );
        assert_eq!(
            inherited_section_options(&db, endpoint.uuid, SectionType::Aor).await?,
            pairs(&[("max_contacts", "5"), ("qualify_frequency", "30")])
        );

        // resolving again without mutation gives the same sequence
        assert_eq!(
            combined_section_options(&db, endpoint.uuid, SectionType::Aor).await?,
            combined
        );

        let view = resolve_options_view(&db, endpoint.uuid).await?;
        assert_eq!(view.get(SectionType::Aor, "max_contacts"), Some("1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_inherited_only_section() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let template = create_test_endpoint(
            &db,
            EndpointSipArgs {
                template: true,
                ..EndpointSipArgs::new(tenant.uuid)
                    .with_name("base")
                    .with_option(SectionType::Endpoint, "context", "default")
            },
        )
        .await?;
        let endpoint = create_test_endpoint(&db, EndpointSipArgs::new(tenant.uuid)).await?;
        set_templates(&db, endpoint.uuid, &[template.uuid]).await?;

        assert_eq!(
            combined_section_options(&db, endpoint.uuid, SectionType::Endpoint).await?,
            pairs(&[("context", "default")])
        );
        assert!(
            combined_section_options(&db, endpoint.uuid, SectionType::Auth)
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = combined_section_options(&db, Uuid::new_v4(), SectionType::Aor).await;
        assert!(matches!(result, Err(Error::NotFound { resource: "EndpointSIP", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_and_lookup_options_view() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let template = create_test_endpoint(
            &db,
            EndpointSipArgs {
                template: true,
                ..EndpointSipArgs::new(tenant.uuid)
                    .with_name("auth-base")
                    .with_option(SectionType::Auth, "username", "placeholder")
                    .with_option(SectionType::Auth, "password", "changeme")
            },
        )
        .await?;
        let endpoint = create_test_endpoint(
            &db,
            EndpointSipArgs::new(tenant.uuid)
                .with_name("bob")
                .with_option(SectionType::Auth, "username", "bob"),
        )
        .await?;
        set_templates(&db, endpoint.uuid, &[template.uuid]).await?;

        assert!(get_options_view(&db, endpoint.uuid).await?.is_none());
        assert_eq!(refresh_options_view(&db).await?, 2);

        let view = get_options_view(&db, endpoint.uuid).await?.unwrap();
        assert_eq!(view.username(), Some("bob"));
        assert_eq!(view.password(), Some("changeme"));

        let found = find_endpoint_by_username(&db, "bob").await?.unwrap();
        assert_eq!(found.uuid, endpoint.uuid);
        assert!(find_endpoint_by_username(&db, "nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_lattice_from_database() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        let mut above: Vec<Uuid> = Vec::new();
        for level in 0..12 {
            let mut row = Vec::new();
            for side in ["left", "right"] {
                let template = create_test_endpoint(
                    &db,
                    EndpointSipArgs {
                        template: true,
                        ..EndpointSipArgs::new(tenant.uuid)
                            .with_name(format!("{side}-{level}"))
                            .with_option(SectionType::Endpoint, "context", format!("{side}-{level}"))
                    },
                )
                .await?;
                if !above.is_empty() {
                    set_templates(&db, template.uuid, &above).await?;
                }
                row.push(template.uuid);
            }
            above = row;
        }
        let endpoint = create_test_endpoint(&db, EndpointSipArgs::new(tenant.uuid)).await?;
        set_templates(&db, endpoint.uuid, &above).await?;

        let graph = load_template_graph(&db, endpoint.uuid).await?;
        assert_eq!(graph.parents_of(above[0]).len(), 2);
        let view = resolve_options_view(&db, endpoint.uuid).await?;
        assert_eq!(view.get(SectionType::Endpoint, "context"), Some("right-11"));
        Ok(())
    }
}
