//! Todo demo: services, view models, and containers wired through hookwire.
//!
//! Runs a scripted session against the wired app instead of an interactive
//! shell: create a couple of todos, trip the duplicate warning, toggle and
//! remove, printing the rendered tree after each step.

use hookwire::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

/// Notification service: a constant record with a `warn` action.
fn notification_service() -> Value {
    let warn = Action::new(|args| {
        let message = args
            .first()
            .and_then(|value| value.as_str())
            .unwrap_or("unspecified warning");
        tracing::warn!(target: "todo::notifications", "{message}");
    });
    Record::build().field("warn", warn).finish().into()
}

fn todo_record(id: i64, text: &str, checked: bool) -> Value {
    Record::build()
        .field("id", id)
        .field("text", text)
        .field("checked", checked)
        .finish()
        .into()
}

fn todo_id(todo: &Value) -> i64 {
    todo.as_record()
        .map(|todo| todo.get("id").as_int().unwrap_or(-1))
        .unwrap_or(-1)
}

/// Todos view model: the list plus create/toggle/remove actions.
fn todos_view_model(registry: &hookwire::core::Registry) -> hookwire::HookDef {
    let next_id = Rc::new(Cell::new(1i64));
    registry.hook(vec![], move |ctx, _| {
        let todos = ctx.state(Vec::<Value>::new);

        let create = {
            let todos = todos.clone();
            let next_id = Rc::clone(&next_id);
            ctx.action(move |args| {
                let text = args
                    .first()
                    .and_then(|value| value.as_str())
                    .unwrap_or("")
                    .to_string();
                let id = next_id.get();
                next_id.set(id + 1);
                todos.update(|list| list.push(todo_record(id, &text, false)));
            })
        };
        let toggle = {
            let todos = todos.clone();
            ctx.action(move |args| {
                let id = args.first().and_then(|value| value.as_int()).unwrap_or(-1);
                todos.update(|list| {
                    for todo in list.iter_mut() {
                        if todo_id(todo) == id {
                            let record = todo.as_record().cloned().unwrap_or_default();
                            let checked = record.get("checked").as_bool().unwrap_or(false);
                            *todo = Record::build()
                                .merge(&record)
                                .field("checked", !checked)
                                .finish()
                                .into();
                        }
                    }
                });
            })
        };
        let remove = {
            let todos = todos.clone();
            ctx.action(move |args| {
                let id = args.first().and_then(|value| value.as_int()).unwrap_or(-1);
                todos.update(|list| list.retain(|todo| todo_id(todo) != id));
            })
        };

        Record::build()
            .field("todos", todos.get())
            .field("create", create)
            .field("toggle", toggle)
            .field("remove", remove)
            .finish()
    })
}

/// Top bar view model: the draft text and a guarded create handler.
fn top_bar_view_model(registry: &hookwire::core::Registry) -> hookwire::HookDef {
    registry.hook(
        vec![
            inject::hook("todosViewModel"),
            inject::constant("notificationService"),
        ],
        |ctx, args| {
            let todos_vm = args[0].watcher().read(ctx);
            let todos = todos_vm.get("todos");
            let create = todos_vm.get("create");
            let notifications = args[1].constant().as_record().cloned().unwrap_or_default();

            let text = ctx.state(String::new);
            let set_text = {
                let text = text.clone();
                ctx.action(move |args| {
                    let next = args
                        .first()
                        .and_then(|value| value.as_str())
                        .unwrap_or("")
                        .to_string();
                    text.set(next);
                })
            };
            let handle_create = {
                let text = text.clone();
                ctx.action(move |_| {
                    let draft = text.get();
                    let trimmed = draft.trim().to_string();
                    let duplicate = todos
                        .as_list()
                        .unwrap_or(&[])
                        .iter()
                        .any(|todo| {
                            todo.as_record().is_some_and(|todo| {
                                todo.get("text")
                                    .as_str()
                                    .is_some_and(|text| text.eq_ignore_ascii_case(&trimmed))
                            })
                        });
                    if duplicate {
                        if let Some(warn) = notifications.get("warn").as_action() {
                            warn.call(&[Value::from("You already have such a todo")]);
                        }
                        return;
                    }
                    if let Some(create) = create.as_action() {
                        create.call(&[Value::from(trimmed)]);
                    }
                    text.set(String::new());
                })
            };

            Record::build()
                .field("text", text.get())
                .field("setText", set_text)
                .field("handleCreateTodo", handle_create)
                .finish()
        },
    )
}

fn todo_item() -> Renderable {
    Renderable::new(|_, props| {
        let checked = props.get("checked").as_bool().unwrap_or(false);
        let text = props.get("text").as_str().unwrap_or("").to_string();
        let mark = if checked { "[x]" } else { "[ ]" };
        Node::elem("div", vec![Node::text(format!("{mark} {text}"))])
    })
}

fn todo_list(registry: &hookwire::core::Registry) -> hookwire::ComponentDef {
    registry.component(vec![inject::hook("todosViewModel")], |args| {
        let view_model = args[0].watcher().clone();
        let item = todo_item();
        Renderable::new(move |ctx, _| {
            let vm = view_model.read(ctx);
            let todos = vm.get("todos");
            let children = todos
                .as_list()
                .unwrap_or(&[])
                .iter()
                .filter_map(|todo| todo.as_record().cloned())
                .map(|todo| Node::unit(&item, todo))
                .collect();
            Node::elem("div", children)
        })
    })
}

fn top_bar(registry: &hookwire::core::Registry) -> hookwire::ComponentDef {
    registry.component(vec![inject::hook("topBarViewModel")], |args| {
        let view_model = args[0].watcher().clone();
        Renderable::new(move |ctx, _| {
            let vm = view_model.read(ctx);
            let draft = vm.get("text").as_str().unwrap_or("").to_string();
            Node::elem("div", vec![Node::text(format!("draft: {draft:?}"))])
        })
    })
}

fn app_container(
    registry: &hookwire::core::Registry,
    top_bar: hookwire::ComponentDef,
    todo_list: hookwire::ComponentDef,
) -> hookwire::ComponentDef {
    registry.component(
        vec![
            inject::constant("appConfig"),
            top_bar.into(),
            todo_list.into(),
        ],
        |args| {
            let config = args[0].constant().as_record().cloned().unwrap_or_default();
            let top_bar = args[1].component().clone();
            let todo_list = args[2].component().clone();
            Renderable::new(move |_, _| {
                let title = config.get("title").as_str().unwrap_or("todos").to_string();
                Node::elem(
                    "div",
                    vec![
                        Node::elem("h1", vec![Node::text(title)]),
                        Node::unit(&top_bar, Record::default()),
                        Node::unit(&todo_list, Record::default()),
                    ],
                )
            })
        },
    )
}

fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let rt = Runtime::new();
    let registry = configure(&rt);
    rt.mount(&registry.holder(), Record::default());

    let app_config: Value = Record::build()
        .field("title", "todos")
        .field("env", "demo")
        .finish()
        .into();
    let notifications = notification_service();

    let todos_vm = todos_view_model(&registry)
        .resolve(&Scope::new())
        .expect("todos view model resolves");
    let scope = Scope::new()
        .with_hook("todosViewModel", todos_vm.clone())
        .with_constant("notificationService", notifications.clone());
    let top_bar_vm = top_bar_view_model(&registry)
        .resolve(&scope)
        .expect("top bar view model resolves");

    let scope = Scope::new()
        .with_hook("todosViewModel", todos_vm.clone())
        .with_hook("topBarViewModel", top_bar_vm.clone())
        .with_constant("appConfig", app_config.clone());
    let list_def = todo_list(&registry);
    let bar_def = top_bar(&registry);
    let app = app_container(&registry, bar_def, list_def)
        .resolve(&scope)
        .expect("app container resolves");

    let mirror = Mirror::new();
    let _watch = watch(
        vec![
            ("appConfig".to_string(), Watched::Constant(app_config)),
            ("todosViewModel".to_string(), Watched::Hook(todos_vm.clone())),
            ("topBarViewModel".to_string(), Watched::Hook(top_bar_vm.clone())),
        ],
        WatchOptions {
            show_diff: true,
            mirror: Some(mirror.clone()),
            ..WatchOptions::default()
        },
    );

    let root = rt.mount(&app, Record::default());
    let step = |label: &str| {
        println!("-- {label}\n{}", render_to_string(&rt, root));
    };
    step("initial");

    let top_bar_action = |name: &str, args: &[Value]| {
        let record = top_bar_vm.current().expect("top bar committed");
        record.get(name).as_action().expect("action field").call(args);
    };
    let todos_action = |name: &str, args: &[Value]| {
        let record = todos_vm.current().expect("todos committed");
        record.get(name).as_action().expect("action field").call(args);
    };

    top_bar_action("setText", &[Value::from("buy milk")]);
    top_bar_action("handleCreateTodo", &[]);
    step("created 'buy milk'");

    top_bar_action("setText", &[Value::from("read book")]);
    top_bar_action("handleCreateTodo", &[]);
    step("created 'read book'");

    // duplicate, warned and ignored
    top_bar_action("setText", &[Value::from("Buy Milk")]);
    top_bar_action("handleCreateTodo", &[]);
    step("duplicate rejected");

    todos_action("toggle", &[Value::from(1)]);
    step("toggled #1");

    todos_action("remove", &[Value::from(2)]);
    step("removed #2");

    let latest = mirror
        .get("todosViewModel")
        .and_then(|value| value.as_record().cloned());
    if let Some(latest) = latest {
        let remaining = latest.get("todos").as_list().map(<[Value]>::len).unwrap_or(0);
        tracing::info!(remaining, "session finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_todo_is_rejected_case_insensitively() {
        let rt = Runtime::new();
        let registry = configure(&rt);
        rt.mount(&registry.holder(), Record::default());

        let todos_vm = todos_view_model(&registry)
            .resolve(&Scope::new())
            .unwrap();
        let scope = Scope::new()
            .with_hook("todosViewModel", todos_vm.clone())
            .with_constant("notificationService", notification_service());
        let top_bar_vm = top_bar_view_model(&registry).resolve(&scope).unwrap();

        let act = |name: &str, args: &[Value]| {
            let record = top_bar_vm.current().expect("top bar committed");
            record.get(name).as_action().expect("action field").call(args);
        };

        act("setText", &[Value::from("buy milk")]);
        act("handleCreateTodo", &[]);
        act("setText", &[Value::from("Buy Milk")]);
        act("handleCreateTodo", &[]);

        let todos = todos_vm.current().unwrap().get("todos");
        assert_eq!(todos.as_list().map(<[Value]>::len), Some(1));
    }
}
