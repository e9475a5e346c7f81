use bankgate_types::Role;
use serde::Serialize;

use super::tree::{NavigationNode, NavigationTree};

/// A navigation entry as shown to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    /// Normalized route with a leading separator.
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// Visible entries `role` may use, sorted by `order` (stable on ties).
///
/// A hidden or forbidden node drops its whole subtree. No role, no menu.
pub fn menu_for(tree: &NavigationTree, role: Option<&Role>) -> Vec<MenuItem> {
    match role {
        Some(role) => project(&tree.items, role),
        None => Vec::new(),
    }
}

fn project(nodes: &[NavigationNode], role: &Role) -> Vec<MenuItem> {
    let mut allowed: Vec<&NavigationNode> = nodes
        .iter()
        .filter(|n| n.visible && n.permits(role))
        .collect();
    allowed.sort_by_key(|n| n.order);
    allowed
        .into_iter()
        .map(|n| MenuItem {
            id: n.id.clone(),
            label: if n.label.is_empty() {
                n.id.clone()
            } else {
                n.label.clone()
            },
            route: format!("/{}", n.route_path()),
            icon: n.icon.clone(),
            children: project(&n.children, role),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NavigationTree {
        NavigationTree::new(vec![
            NavigationNode::new("dashboard", "/dashboard", &[])
                .with_order(1)
                .with_children(vec![
                    NavigationNode::new("admin", "/dashboard/admin", &[Role::ADMIN]).with_order(10),
                    NavigationNode::new("home", "/dashboard/home", &[Role::CUSTOMER]).with_order(1),
                    NavigationNode::new("profile", "dashboard/profile", &[]).with_order(2),
                    NavigationNode::new("secret", "/dashboard/secret", &[]).hidden(),
                ]),
            NavigationNode::new("settings", "/settings", &[Role::SUPERADMIN]).with_order(0),
        ])
    }

    #[test]
    fn test_menu_filters_by_role_and_visibility() {
        let menu = menu_for(&tree(), Some(&Role::CUSTOMER));
        assert_eq!(menu.len(), 1);
        let ids: Vec<_> = menu[0].children.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["home", "profile"]);
        assert_eq!(menu[0].children[1].route, "/dashboard/profile");
    }

    #[test]
    fn test_menu_sorted_by_order() {
        let menu = menu_for(&tree(), Some(&Role::SUPERADMIN));
        let ids: Vec<_> = menu.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["settings", "dashboard"]);
    }

    #[test]
    fn test_no_role_no_menu() {
        assert!(menu_for(&tree(), None).is_empty());
    }

    #[test]
    fn test_forbidden_parent_hides_children() {
        let tree = NavigationTree::new(vec![
            NavigationNode::new("admin", "/admin", &[Role::ADMIN])
                .with_children(vec![NavigationNode::new("open", "/admin/open", &[])]),
        ]);
        assert!(menu_for(&tree, Some(&Role::CUSTOMER)).is_empty());
    }
}
