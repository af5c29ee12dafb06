//! Demonstration of Store, its views and per-entity state with a todo list

use entwine::{EntityKey, EntityStatePatch, Store, StoreOptions};
use serde_json::json;

#[derive(Clone, Debug)]
struct TodoItem {
    id: usize,
    title: String,
    completed: bool,
}

fn todo(id: usize, title: &str) -> TodoItem {
    TodoItem {
        id,
        title: title.to_string(),
        completed: false,
    }
}

fn print_todos(store: &Store<TodoItem>) {
    for record in store.state_view().all() {
        let status = if record.entity.completed { "✓" } else { " " };
        let pin = if record.state.selected { " (pinned)" } else { "" };
        println!("   [{}] {}{}", status, record.entity.title, pin);
    }
}

fn main() {
    println!("=== Store Example: Todo App ===\n");

    let store: Store<TodoItem> = Store::new(
        vec![todo(0, "Learn Rust"), todo(1, "Build reactive library")],
        StoreOptions::new(|todo: &TodoItem| EntityKey::from(todo.id)).with_property(
            |todo: &TodoItem, name: &str| match name {
                "title" => Some(json!(todo.title)),
                "completed" => Some(json!(todo.completed)),
                _ => None,
            },
        ),
    );

    // Subscribe to entity changes
    println!("1. Setting up subscriber");
    let _subscription = store.subscribe(|todos| {
        let completed = todos.iter().filter(|t| t.completed).count();
        println!(
            "   [Store Update] Total: {}, Active: {}, Completed: {}",
            todos.len(),
            todos.len() - completed,
            completed
        );
    });

    println!("\n2. Adding a todo");
    store.insert(todo(2, "Write documentation"));
    println!("   pristine: {}", store.pristine());

    println!("\n3. Completing the first todo");
    store.update(TodoItem {
        completed: true,
        ..todo(0, "Learn Rust")
    });

    println!("\n4. Pinning the last todo");
    if let Some(last) = store.get(&EntityKey::from(2usize)) {
        store
            .state()
            .update(&last, &EntityStatePatch::new().selected(true), false);
    }

    println!("\n5. Sorting by title:");
    store
        .state_view()
        .sort(|a, b| a.title.cmp(&b.title));
    print_todos(&store);

    println!("\n6. Active todos:");
    store.data_view().filter(|todo| !todo.completed);
    print_todos(&store);

    println!("\n7. Reading a property through the accessor:");
    if let Some(first) = store.get(&EntityKey::from(1usize)) {
        println!("   title = {:?}", store.property(&first, "title"));
    }

    println!("\n8. Reloading from scratch");
    store.load(vec![todo(10, "Ship it")]);
    print_todos(&store);
    println!("   pristine: {}", store.pristine());

    println!("\n✓ Example complete!");
}
