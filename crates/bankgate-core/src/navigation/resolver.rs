//! Route authorization: most specific matching node decides.
//!
//! Search order for a normalized path:
//! 1. every non-top-level node (any depth), where the path equals the node's
//!    route or lies under it; the longest route wins, then the deepest node,
//!    then declaration order;
//! 2. a path equal to the parent segment of some child route is an alias of
//!    that child's parent node;
//! 3. top-level nodes, with the same prefix rule;
//! 4. otherwise deny.
//!
//! An absent role is denied before any lookup.

use bankgate_types::Role;

use super::path::RoutePath;
use super::tree::{NavigationNode, NavigationTree};

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<'a> {
    NoRole,
    Descendant(&'a NavigationNode),
    ParentAlias(&'a NavigationNode),
    TopLevel(&'a NavigationNode),
    Unmatched,
}

impl<'a> Match<'a> {
    pub fn node(&self) -> Option<&'a NavigationNode> {
        match *self {
            Match::Descendant(n) | Match::ParentAlias(n) | Match::TopLevel(n) => Some(n),
            Match::NoRole | Match::Unmatched => None,
        }
    }
}

/// Decision plus the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub admitted: bool,
    pub matched: Match<'a>,
}

impl Verdict<'_> {
    fn deny(matched: Match<'_>) -> Verdict<'_> {
        Verdict {
            admitted: false,
            matched,
        }
    }
}

/// Returns whether `role` may reach `path` in `tree`.
pub fn can_access(tree: &NavigationTree, path: &str, role: Option<&Role>) -> bool {
    resolve(tree, path, role).admitted
}

pub fn resolve<'a>(tree: &'a NavigationTree, path: &str, role: Option<&Role>) -> Verdict<'a> {
    let Some(role) = role else {
        return Verdict::deny(Match::NoRole);
    };
    let path = RoutePath::parse(path);

    let mut best: Option<Candidate<'a>> = None;
    for top in &tree.items {
        collect_descendants(&top.children, &path, 1, &mut best);
    }
    if let Some(candidate) = best {
        return decide(Match::Descendant(candidate.node), candidate.node, role);
    }

    if !path.is_root()
        && let Some(parent) = find_parent_alias(&tree.items, &path)
    {
        return decide(Match::ParentAlias(parent), parent, role);
    }

    let mut best: Option<Candidate<'a>> = None;
    for top in &tree.items {
        consider(top, &path, 0, &mut best);
    }
    if let Some(candidate) = best {
        return decide(Match::TopLevel(candidate.node), candidate.node, role);
    }

    Verdict::deny(Match::Unmatched)
}

fn decide<'a>(matched: Match<'a>, node: &NavigationNode, role: &Role) -> Verdict<'a> {
    Verdict {
        admitted: node.permits(role),
        matched,
    }
}

#[derive(Clone, Copy)]
struct Candidate<'a> {
    node: &'a NavigationNode,
    route_len: usize,
    depth: usize,
}

fn node_matches(route: &RoutePath, path: &RoutePath) -> bool {
    if route.is_root() {
        path.is_root()
    } else {
        path.starts_with(route)
    }
}

fn consider<'a>(
    node: &'a NavigationNode,
    path: &RoutePath,
    depth: usize,
    best: &mut Option<Candidate<'a>>,
) {
    let route = node.route_path();
    if !node_matches(&route, path) {
        return;
    }
    let candidate = Candidate {
        node,
        route_len: route.len(),
        depth,
    };
    // Strictly better only, so the first declared node keeps ties.
    let better = best.is_none_or(|current| {
        (candidate.route_len, candidate.depth) > (current.route_len, current.depth)
    });
    if better {
        *best = Some(candidate);
    }
}

fn collect_descendants<'a>(
    nodes: &'a [NavigationNode],
    path: &RoutePath,
    depth: usize,
    best: &mut Option<Candidate<'a>>,
) {
    for node in nodes {
        consider(node, path, depth, best);
        collect_descendants(&node.children, path, depth + 1, best);
    }
}

fn find_parent_alias<'a>(
    nodes: &'a [NavigationNode],
    path: &RoutePath,
) -> Option<&'a NavigationNode> {
    for node in nodes {
        let aliased = node
            .children
            .iter()
            .any(|child| child.route_path().parent().as_ref() == Some(path));
        if aliased {
            return Some(node);
        }
        if let Some(found) = find_parent_alias(&node.children, path) {
            return Some(found);
        }
    }
    None
}
