//! Demonstration of Selector: a toolbox where one tool is active at a time

use entwine::{EntityKey, Selector, SelectorOptions, StoreOptions};
use serde_json::{json, Map};

#[derive(Debug)]
struct Tool {
    name: &'static str,
    label: &'static str,
}

fn main() {
    println!("=== Selector Example: Toolbox ===\n");

    let toolbox = Selector::new(
        StoreOptions::new(|tool: &Tool| EntityKey::from(tool.name)),
        SelectorOptions { history_limit: 5 },
    );
    toolbox.load(vec![
        Tool { name: "draw", label: "Draw" },
        Tool { name: "measure", label: "Measure" },
        Tool { name: "print", label: "Print" },
    ]);

    println!("1. Watching the active tool");
    let _guard = toolbox.watch_active(|record| match record {
        Some(record) => println!("   [Active] {} {:?}", record.entity.label, record.state.options),
        None => println!("   [Active] none"),
    });

    println!("\n2. Activating tools");
    let mut options = Map::new();
    options.insert("geometry".to_string(), json!("polygon"));
    toolbox.activate(&"draw".into(), options);
    toolbox.activate(&"measure".into(), Map::new());

    println!("\n3. Unknown tools are ignored: {}", toolbox.activate(&"erase".into(), Map::new()));

    println!("\n4. History: {:?}", toolbox.history());

    println!("\n5. Going back");
    toolbox.activate_previous();
    toolbox.activate_previous();

    println!("\n✓ Example complete!");
}
