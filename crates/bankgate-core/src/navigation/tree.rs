use std::collections::{BTreeSet, HashSet};

use bankgate_types::Role;
use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use super::path::RoutePath;

fn default_visible() -> bool {
    true
}

/// One entry in the declarative route/role permission tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(alias = "routerLink", alias = "routePath")]
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Roles allowed to use this node. Empty means every role.
    #[serde(default, alias = "permittedRoles")]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    pub fn new(id: &str, route: &str, roles: &[Role]) -> Self {
        Self {
            id: id.to_string(),
            label: String::new(),
            route: route.to_string(),
            icon: None,
            roles: roles.iter().cloned().collect(),
            order: 0,
            visible: true,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<NavigationNode>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn route_path(&self) -> RoutePath {
        RoutePath::parse(&self.route)
    }

    pub fn permits(&self, role: &Role) -> bool {
        self.roles.is_empty() || self.roles.contains(role)
    }
}

/// The navigation document: top-level nodes in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTree {
    #[serde(default)]
    pub items: Vec<NavigationNode>,
}

impl NavigationTree {
    pub fn new(items: Vec<NavigationNode>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parses and validates a JSON navigation document.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or a tree that breaks the
    /// sibling-route or id uniqueness rules.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let tree: Self = serde_json::from_str(raw)?;
        tree.validate()?;
        Ok(tree)
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that no two siblings share a route and ids are unique.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut ids = HashSet::new();
        validate_level(&self.items, &mut ids)
    }

    pub fn node_count(&self) -> usize {
        fn count(nodes: &[NavigationNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.items)
    }
}

fn validate_level<'a>(
    nodes: &'a [NavigationNode],
    ids: &mut HashSet<&'a str>,
) -> Result<(), CatalogError> {
    let mut routes = HashSet::new();
    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(CatalogError::DuplicateId {
                id: node.id.clone(),
            });
        }
        let route = node.route_path();
        if !routes.insert(route.clone()) {
            return Err(CatalogError::DuplicateSibling {
                route: route.to_string(),
            });
        }
        validate_level(&node.children, ids)?;
    }
    Ok(())
}
