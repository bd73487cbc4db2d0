//! Property tree builder
//!
//! Every configuration call on a mapping lands here. Destination paths form
//! a trie of [`DestinationProperty`] nodes; a configured leaf carries a
//! [`MemberMapping`] with its ordered step chain. Source paths form a second
//! trie of [`SourceProperty`] nodes whose terminal nodes list the destination
//! leaves they feed (fan-in). Rebasing a leaf with `map_from` moves it from
//! one source chain to another and prunes the chain it left behind.

use std::fmt;
use tracing::trace;

use crate::member::{ConditionFn, ConfigurationOrigin, MemberConfig, Transformation, TransformationType};
use crate::path::PropertyPath;
use crate::{Error, Result};

/// Configuration attached to a destination leaf
#[derive(Clone)]
pub struct MemberMapping {
    source_path: PropertyPath,
    transformations: Vec<Transformation>,
    ignore: bool,
    condition: Option<ConditionFn>,
    source_mapping: bool,
}

impl MemberMapping {
    fn new(source_path: PropertyPath, origin: ConfigurationOrigin) -> Self {
        Self {
            source_path,
            transformations: Vec::new(),
            ignore: false,
            condition: None,
            source_mapping: origin == ConfigurationOrigin::SourceMember,
        }
    }

    /// Source path the member is currently fed from
    #[must_use]
    pub fn source_path(&self) -> &PropertyPath {
        &self.source_path
    }

    /// Steps in append order
    #[must_use]
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    #[must_use]
    pub fn condition(&self) -> Option<&ConditionFn> {
        self.condition.as_ref()
    }

    /// Whether the leaf was created by a source member configuration
    #[must_use]
    pub fn is_source_mapping(&self) -> bool {
        self.source_mapping
    }

    #[must_use]
    pub fn has_async_steps(&self) -> bool {
        self.transformations.iter().any(|t| t.config.is_async())
    }
}

impl fmt::Debug for MemberMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMapping")
            .field("source_path", &self.source_path)
            .field("transformations", &self.transformations)
            .field("ignore", &self.ignore)
            .field("condition", &self.condition.as_ref().map(|_| "<fn>"))
            .field("source_mapping", &self.source_mapping)
            .finish()
    }
}

/// One segment of a source path
#[derive(Debug, Clone)]
pub struct SourceProperty {
    name: String,
    path: PropertyPath,
    level: usize,
    children: Vec<SourceProperty>,
    destinations: Vec<PropertyPath>,
}

impl SourceProperty {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn children(&self) -> &[SourceProperty] {
        &self.children
    }

    /// Destination leaves fed by this exact source path
    #[must_use]
    pub fn destinations(&self) -> &[PropertyPath] {
        &self.destinations
    }
}

/// One segment of a destination path
#[derive(Debug, Clone)]
pub struct DestinationProperty {
    name: String,
    path: PropertyPath,
    level: usize,
    children: Vec<DestinationProperty>,
    member: Option<MemberMapping>,
}

impl DestinationProperty {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn children(&self) -> &[DestinationProperty] {
        &self.children
    }

    /// Configuration of a leaf; scaffolding nodes have none
    #[must_use]
    pub fn member(&self) -> Option<&MemberMapping> {
        self.member.as_ref()
    }
}

trait PathNode: Sized {
    fn create(path: PropertyPath) -> Self;
    fn name(&self) -> &str;
    fn children(&self) -> &[Self];
    fn children_mut(&mut self) -> &mut Vec<Self>;
}

impl PathNode for SourceProperty {
    fn create(path: PropertyPath) -> Self {
        Self {
            name: path.leaf().to_string(),
            level: path.depth() - 1,
            path,
            children: Vec::new(),
            destinations: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

impl PathNode for DestinationProperty {
    fn create(path: PropertyPath) -> Self {
        Self {
            name: path.leaf().to_string(),
            level: path.depth() - 1,
            path,
            children: Vec::new(),
            member: None,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

fn position_or_insert<N: PathNode>(nodes: &mut Vec<N>, path: &PropertyPath, depth: usize) -> usize {
    let name = &path.segments()[depth - 1];
    if let Some(index) = nodes.iter().position(|node| node.name() == name) {
        index
    } else {
        nodes.push(N::create(path.prefix(depth)));
        nodes.len() - 1
    }
}

fn ensure_node<'a, N: PathNode>(roots: &'a mut Vec<N>, path: &PropertyPath) -> &'a mut N {
    let mut nodes = roots;
    for depth in 1..path.depth() {
        let index = position_or_insert(nodes, path, depth);
        nodes = nodes[index].children_mut();
    }
    let index = position_or_insert(nodes, path, path.depth());
    &mut nodes[index]
}

fn find_node_mut<'a, N: PathNode>(nodes: &'a mut [N], segments: &[String]) -> Option<&'a mut N> {
    let (head, rest) = segments.split_first()?;
    let node = nodes.iter_mut().find(|node| node.name() == head)?;
    if rest.is_empty() {
        Some(node)
    } else {
        find_node_mut(node.children_mut(), rest)
    }
}

fn prune(nodes: &mut Vec<SourceProperty>) {
    for node in nodes.iter_mut() {
        prune(&mut node.children);
    }
    nodes.retain(|node| !node.children.is_empty() || !node.destinations.is_empty());
}

fn collect_members<'a>(
    nodes: &'a [DestinationProperty],
    out: &mut Vec<(&'a DestinationProperty, &'a MemberMapping)>,
) {
    for node in nodes {
        if let Some(member) = &node.member {
            out.push((node, member));
        }
        collect_members(&node.children, out);
    }
}

/// Source and destination property tries of one mapping
#[derive(Debug, Clone, Default)]
pub struct PropertyTree {
    sources: Vec<SourceProperty>,
    destinations: Vec<DestinationProperty>,
}

impl PropertyTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root-level source nodes
    #[must_use]
    pub fn sources(&self) -> &[SourceProperty] {
        &self.sources
    }

    /// Root-level destination nodes
    #[must_use]
    pub fn destinations(&self) -> &[DestinationProperty] {
        &self.destinations
    }

    /// Append a step to the destination leaf at `destination`
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` when a `MapFrom` path cannot be parsed; the tree
    /// is left untouched in that case.
    pub fn configure_member(&mut self, destination: &PropertyPath, config: MemberConfig) -> Result<()> {
        let rebase = parse_rebase(&config)?;
        self.ensure_member(destination, ConfigurationOrigin::Member);
        self.append(destination, config, rebase, ConfigurationOrigin::Member);
        Ok(())
    }

    /// Append a step to the destination leaf fed by `source`
    ///
    /// The step joins the first leaf already fed by `source`. Without one, the
    /// leaf at the same path on the destination side is used (and created).
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceMemberConfiguration` unless `config` is
    /// `Ignore`, `Custom` or `AsyncCustom`, and `SourceMemberConflict` when
    /// the leaf at the same path is mapped from another source path.
    pub fn configure_source_member(&mut self, source: &PropertyPath, config: MemberConfig) -> Result<()> {
        match config {
            MemberConfig::Ignore | MemberConfig::Custom(_) | MemberConfig::AsyncCustom(_) => {}
            other => {
                return Err(Error::invalid_source_member_configuration(
                    source.to_string(),
                    other.kind_name(),
                ));
            }
        }

        let destination = match self.destination_fed_by(source) {
            Some(fed) => fed,
            None => {
                if let Some(member) = self.destination_node(source).and_then(|node| node.member.as_ref()) {
                    if member.source_path != *source {
                        return Err(Error::source_member_conflict(
                            source.to_string(),
                            member.source_path.to_string(),
                        ));
                    }
                }
                source.clone()
            }
        };
        self.ensure_member(&destination, ConfigurationOrigin::SourceMember);
        self.append(&destination, config, None, ConfigurationOrigin::SourceMember);
        Ok(())
    }

    /// First destination leaf currently fed by `source`
    #[must_use]
    pub fn destination_fed_by(&self, source: &PropertyPath) -> Option<PropertyPath> {
        self.source_node(source)?.destinations.first().cloned()
    }

    #[must_use]
    pub fn source_node(&self, path: &PropertyPath) -> Option<&SourceProperty> {
        find_node(&self.sources, path)
    }

    #[must_use]
    pub fn destination_node(&self, path: &PropertyPath) -> Option<&DestinationProperty> {
        find_node(&self.destinations, path)
    }

    /// Configured destination leaves, depth first in configuration order
    #[must_use]
    pub fn configured_members(&self) -> Vec<(&DestinationProperty, &MemberMapping)> {
        let mut out = Vec::new();
        collect_members(&self.destinations, &mut out);
        out
    }

    /// Whether any configured source path starts at `name`
    #[must_use]
    pub fn has_source_root(&self, name: &str) -> bool {
        self.sources.iter().any(|node| node.name == name)
    }

    /// Whether any configured destination path starts at `name`
    #[must_use]
    pub fn has_destination_root(&self, name: &str) -> bool {
        self.destinations.iter().any(|node| node.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Replay every step of `other` after the steps already configured here
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if a replayed `MapFrom` path is invalid.
    pub fn merge(&mut self, other: &PropertyTree) -> Result<()> {
        for (property, member) in other.configured_members() {
            let origin = if member.source_mapping {
                ConfigurationOrigin::SourceMember
            } else {
                ConfigurationOrigin::Member
            };
            self.ensure_member(&property.path, origin);
            for transformation in &member.transformations {
                let rebase = parse_rebase(&transformation.config)?;
                self.append(
                    &property.path,
                    transformation.config.clone(),
                    rebase,
                    transformation.kind.origin(),
                );
            }
        }
        Ok(())
    }

    fn ensure_member(&mut self, destination: &PropertyPath, origin: ConfigurationOrigin) {
        let node = ensure_node(&mut self.destinations, destination);
        if node.member.is_some() {
            return;
        }
        node.member = Some(MemberMapping::new(destination.clone(), origin));
        self.attach_source(destination, destination);
    }

    fn append(
        &mut self,
        destination: &PropertyPath,
        config: MemberConfig,
        rebase: Option<PropertyPath>,
        origin: ConfigurationOrigin,
    ) {
        let Some(member) = find_node_mut(&mut self.destinations, destination.segments())
            .and_then(|node| node.member.as_mut())
        else {
            return;
        };

        match &config {
            MemberConfig::MapFrom(_)
            | MemberConfig::Constant(_)
            | MemberConfig::Custom(_)
            | MemberConfig::AsyncCustom(_) => member.ignore = false,
            MemberConfig::Ignore => member.ignore = true,
            MemberConfig::Condition(predicate) => member.condition = Some(predicate.clone()),
        }

        let kind = TransformationType::of(&config, origin);
        trace!(destination = %destination, ?kind, config = config.kind_name(), "appending transformation");
        member.transformations.push(Transformation { kind, config });

        let previous = match rebase {
            Some(source) if source != member.source_path => {
                Some(std::mem::replace(&mut member.source_path, source))
            }
            _ => None,
        };

        if let Some(previous) = previous {
            let current = member.source_path.clone();
            trace!(destination = %destination, from = %previous, to = %current, "rebasing member");
            self.detach_source(&previous, destination);
            self.attach_source(&current, destination);
        }
    }

    fn attach_source(&mut self, source: &PropertyPath, destination: &PropertyPath) {
        let node = ensure_node(&mut self.sources, source);
        if !node.destinations.contains(destination) {
            node.destinations.push(destination.clone());
        }
    }

    fn detach_source(&mut self, source: &PropertyPath, destination: &PropertyPath) {
        if let Some(node) = find_node_mut(&mut self.sources, source.segments()) {
            node.destinations.retain(|fed| fed != destination);
        }
        prune(&mut self.sources);
    }
}

fn find_node<'a, N: PathNode>(roots: &'a [N], path: &PropertyPath) -> Option<&'a N> {
    let mut nodes = roots;
    let mut found = None;
    for segment in path.segments() {
        let node = nodes.iter().find(|node| node.name() == segment)?;
        nodes = node.children();
        found = Some(node);
    }
    found
}

fn parse_rebase(config: &MemberConfig) -> Result<Option<PropertyPath>> {
    match config {
        MemberConfig::MapFrom(path) => PropertyPath::parse(path).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(value: &str) -> PropertyPath {
        PropertyPath::parse(value).unwrap()
    }

    #[test]
    fn test_configure_member_builds_destination_chain() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("dstLevel1.dstLevel2"), MemberConfig::map_from("srcLevel1.srcLevel2"))
            .unwrap();

        let root = &tree.destinations()[0];
        assert_eq!(root.name(), "dstLevel1");
        assert_eq!(root.level(), 0);
        assert!(root.member().is_none());

        let leaf = &root.children()[0];
        assert_eq!(leaf.level(), 1);
        assert_eq!(leaf.path().to_string(), "dstLevel1.dstLevel2");
        assert_eq!(leaf.member().unwrap().source_path().to_string(), "srcLevel1.srcLevel2");

        let source = tree.source_node(&path("srcLevel1.srcLevel2")).unwrap();
        assert_eq!(source.destinations(), &[path("dstLevel1.dstLevel2")]);
        assert_eq!(tree.sources().len(), 1, "default source chain is pruned after rebase");
    }

    #[test]
    fn test_repeated_configuration_merges_into_one_leaf() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("a"), MemberConfig::constant(1)).unwrap();
        tree.configure_member(&path("a"), MemberConfig::custom(|_| Ok(None))).unwrap();

        assert_eq!(tree.destinations().len(), 1);
        let members = tree.configured_members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].1.transformations().len(), 2);
        assert_eq!(members[0].1.transformations()[0].kind, TransformationType::Constant);
    }

    #[test]
    fn test_map_from_last_applied_wins() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("x"), MemberConfig::map_from("first")).unwrap();
        tree.configure_member(&path("x"), MemberConfig::map_from("second.value")).unwrap();

        let (_, member) = tree.configured_members()[0];
        assert_eq!(member.source_path().to_string(), "second.value");
        assert!(tree.source_node(&path("first")).is_none());
        assert!(tree.has_source_root("second"));
    }

    #[test]
    fn test_fan_in_shares_source_prefix() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("city"), MemberConfig::map_from("address.city")).unwrap();
        tree.configure_member(&path("zip"), MemberConfig::map_from("address.zip")).unwrap();
        tree.configure_member(&path("town"), MemberConfig::map_from("address.city")).unwrap();

        assert_eq!(tree.sources().len(), 1);
        let address = &tree.sources()[0];
        assert_eq!(address.children().len(), 2);
        assert_eq!(
            tree.source_node(&path("address.city")).unwrap().destinations(),
            &[path("city"), path("town")]
        );
    }

    #[test]
    fn test_ignore_then_map_from_clears_ignore() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("a"), MemberConfig::ignore()).unwrap();
        assert!(tree.configured_members()[0].1.is_ignored());

        tree.configure_member(&path("a"), MemberConfig::map_from("b")).unwrap();
        assert!(!tree.configured_members()[0].1.is_ignored());

        tree.configure_member(&path("a"), MemberConfig::ignore()).unwrap();
        assert!(tree.configured_members()[0].1.is_ignored());
    }

    #[test]
    fn test_source_member_merges_with_destination_member() {
        let mut tree = PropertyTree::new();
        tree.configure_member(&path("full"), MemberConfig::map_from("name")).unwrap();
        tree.configure_source_member(&path("name"), MemberConfig::custom(|_| Ok(None)))
            .unwrap();

        let members = tree.configured_members();
        assert_eq!(members.len(), 1);
        let (property, member) = members[0];
        assert_eq!(property.path().to_string(), "full");
        assert!(!member.is_source_mapping());
        assert_eq!(
            member.transformations()[1].kind,
            TransformationType::SourceMemberOptions
        );
    }

    #[test]
    fn test_source_member_creates_mirrored_leaf() {
        let mut tree = PropertyTree::new();
        tree.configure_source_member(&path("nested.value"), MemberConfig::ignore())
            .unwrap();

        let (property, member) = tree.configured_members()[0];
        assert_eq!(property.name(), "value");
        assert_eq!(property.path().to_string(), "nested.value");
        assert!(member.is_source_mapping());
        assert!(member.is_ignored());
    }

    #[test]
    fn test_source_member_rejects_non_function_config() {
        let mut tree = PropertyTree::new();
        let err = tree
            .configure_source_member(&path("a"), MemberConfig::constant("x"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSourceMemberConfiguration { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_invalid_map_from_leaves_tree_untouched() {
        let mut tree = PropertyTree::new();
        let err = tree
            .configure_member(&path("a"), MemberConfig::map_from("b..c"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_merge_appends_after_existing_steps() {
        let mut base = PropertyTree::new();
        base.configure_member(&path("a"), MemberConfig::constant(1)).unwrap();

        let mut other = PropertyTree::new();
        other.configure_member(&path("a"), MemberConfig::map_from("z")).unwrap();
        other.configure_member(&path("b"), MemberConfig::ignore()).unwrap();

        base.merge(&other).unwrap();

        let members = base.configured_members();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].1.transformations().len(), 2);
        assert_eq!(members[0].1.source_path().to_string(), "z");
        assert!(members[1].1.is_ignored());
        assert_eq!(members[0].1.source_path().read(&json!({ "z": 3 })), Some(&json!(3)));
    }
}
