//! Navigation catalog and route authorization.

mod catalog;
mod error;
mod menu;
mod path;
pub mod resolver;
pub mod source;
mod tree;

pub use catalog::{NavigationCatalog, TreeOrigin};
pub use error::CatalogError;
pub use menu::{MenuItem, menu_for};
pub use path::RoutePath;
pub use resolver::can_access;
pub use tree::{NavigationNode, NavigationTree};
