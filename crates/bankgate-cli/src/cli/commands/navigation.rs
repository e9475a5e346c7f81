//! Gate evaluation and menu rendering.

use anyhow::Result;
use bankgate_core::gate::NavigationOutcome;
use bankgate_core::navigation::{MenuItem, RoutePath, TreeOrigin};
use bankgate_core::portal::Portal;
use serde_json::json;

pub async fn check(portal: &Portal, path: &str, json: bool) -> Result<()> {
    let guard = portal.navigator().guard_for(&RoutePath::parse(path));
    let outcome = portal.navigate(path).await;

    if json {
        let value = json!({
            "destination": path,
            "guard": guard,
            "result": outcome,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &outcome {
        NavigationOutcome::Admitted { destination } => println!("Admitted: /{destination}"),
        NavigationOutcome::Redirected { redirect } => {
            println!("Redirected: {redirect}");
            if let Some(reason) = redirect.reason {
                println!("{}", reason.message());
            }
        }
        NavigationOutcome::Superseded => println!("Superseded by a newer navigation."),
    }
    Ok(())
}

pub async fn menu(portal: &Portal, json: bool) -> Result<()> {
    let items = portal.menu().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if portal.catalog().origin() == Some(TreeOrigin::Empty) {
        eprintln!("Warning: navigation unavailable");
    }
    if items.is_empty() {
        println!("No menu entries.");
        return Ok(());
    }
    print_items(&items, 0);
    Ok(())
}

fn print_items(items: &[MenuItem], depth: usize) {
    for item in items {
        println!("{:indent$}{}  {}", "", item.label, item.route, indent = depth * 2);
        print_items(&item.children, depth + 1);
    }
}
