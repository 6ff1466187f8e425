//! End-to-end resolution: layered constants, hook chains, and nested
//! components, under both change-detection modes.

use hookwire::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Default)]
struct UpdateCounts {
    static_vm: Rc<Cell<usize>>,
    main_vm: Rc<Cell<usize>>,
    first_vm: Rc<Cell<usize>>,
    second_vm: Rc<Cell<usize>>,
    third_vm: Rc<Cell<usize>>,
}

impl UpdateCounts {
    #[track_caller]
    fn assert(&self, static_vm: usize, main_vm: usize, first: usize, second: usize, third: usize) {
        assert_eq!(self.static_vm.get(), static_vm, "static view model renders");
        assert_eq!(self.main_vm.get(), main_vm, "main view model renders");
        assert_eq!(self.first_vm.get(), first, "first count view model renders");
        assert_eq!(self.second_vm.get(), second, "second count view model renders");
        assert_eq!(self.third_vm.get(), third, "third count view model renders");
    }
}

struct Testcase {
    counts: UpdateCounts,
    main_current: Rc<RefCell<Option<Record>>>,
}

fn bump(count: &Rc<Cell<usize>>) {
    count.set(count.get() + 1);
}

/// Mirror of the counting wiring: a static source, a main view model with
/// three counters, and one dependent view model per counter field.
fn configure_counting(rt: &Runtime, mode: WatchMode) -> Testcase {
    let registry = configure_with(rt, mode);
    rt.mount(&registry.holder(), Record::default());
    let counts = UpdateCounts::default();

    let static_def = registry.hook(vec![], {
        let renders = Rc::clone(&counts.static_vm);
        move |_, _| {
            bump(&renders);
            Record::build()
                .field("url", "localhost")
                .field("env", "dev")
                .finish()
        }
    });

    let main_def = registry.hook(vec![inject::hook("staticViewModel")], {
        let renders = Rc::clone(&counts.main_vm);
        move |ctx, args| {
            let stat = args[0].watcher().read(ctx);
            let env = stat.get("env");
            let url = stat.get("url");
            let first = ctx.state(|| 0i64);
            let second = ctx.state(|| 0i64);
            let third = ctx.state(|| 0i64);
            let update_first = {
                let first = first.clone();
                ctx.action(move |_| first.update(|n| *n += 1))
            };
            let update_second = {
                let second = second.clone();
                ctx.action(move |_| second.update(|n| *n += 1))
            };
            let update_third = {
                let third = third.clone();
                ctx.action(move |_| third.update(|n| *n += 1))
            };
            bump(&renders);
            Record::build()
                .field("firstCount", first.get())
                .field("secondCount", second.get())
                .field("thirdCount", third.get())
                .field("updateFirstCount", update_first)
                .field("updateSecondCount", update_second)
                .field("updateThirdCount", update_third)
                .field("env", env)
                .field("url", url)
                .finish()
        }
    });

    let dependent = |renders: &Rc<Cell<usize>>, field: &'static str| {
        let renders = Rc::clone(renders);
        registry.hook(
            vec![inject::hook("staticViewModel"), inject::hook("mainViewModel")],
            move |ctx, args| {
                let stat = args[0].watcher().read(ctx);
                let env = stat.get("env");
                let url = stat.get("url");
                let main = args[1].watcher().read(ctx);
                let count = main.get(field);
                bump(&renders);
                Record::build()
                    .field(field, count)
                    .field("env", env)
                    .field("url", url)
                    .finish()
            },
        )
    };
    let first_def = dependent(&counts.first_vm, "firstCount");
    let second_def = dependent(&counts.second_vm, "secondCount");
    let third_def = dependent(&counts.third_vm, "thirdCount");

    let static_vm = static_def.resolve(&Scope::new()).unwrap();
    let scope = Scope::new().with_hook("staticViewModel", static_vm);
    let main_vm = main_def.resolve(&scope).unwrap();
    let scope = scope.with_hook("mainViewModel", main_vm.clone());
    first_def.resolve(&scope).unwrap();
    second_def.resolve(&scope).unwrap();
    third_def.resolve(&scope).unwrap();

    let main_current: Rc<RefCell<Option<Record>>> = Rc::new(RefCell::new(None));
    main_vm.subscribe({
        let main_current = Rc::clone(&main_current);
        move |updated| *main_current.borrow_mut() = Some(updated.clone())
    });

    Testcase {
        counts,
        main_current,
    }
}

fn fire_action(current: &Rc<RefCell<Option<Record>>>, name: &str) {
    let record = current.borrow().clone().expect("view model committed");
    record
        .get(name)
        .as_action()
        .expect("action field")
        .fire();
}

#[test]
fn constants_resolve_in_layers() {
    let rt = Runtime::new();
    let registry = configure(&rt);

    let first_def = registry.constant(vec![], |_| {
        Record::build().field("first", "first").finish().into()
    });
    let second_def = registry.constant(vec![inject::constant("firstLevelConstant")], |values| {
        Record::build()
            .field("second", "second")
            .merge(values[0].as_record().unwrap())
            .finish()
            .into()
    });
    let third_def = registry.constant(
        vec![
            inject::constant("firstLevelConstant"),
            inject::constant("secondLevelConstant"),
        ],
        |values| {
            Record::build()
                .field("third", "third")
                .merge(values[0].as_record().unwrap())
                .merge(values[1].as_record().unwrap())
                .finish()
                .into()
        },
    );

    let first = first_def.resolve(&Scope::new());
    let scope = Scope::new().with_constant("firstLevelConstant", first.clone());
    let second = second_def.resolve(&scope);
    let scope = scope.with_constant("secondLevelConstant", second.clone());
    let third = third_def.resolve(&scope);

    assert_eq!(first.as_record().unwrap().get("first").as_str(), Some("first"));

    let second = second.as_record().unwrap();
    assert_eq!(second.get("first").as_str(), Some("first"));
    assert_eq!(second.get("second").as_str(), Some("second"));

    let third = third.as_record().unwrap();
    assert_eq!(third.get("first").as_str(), Some("first"));
    assert_eq!(third.get("second").as_str(), Some("second"));
    assert_eq!(third.get("third").as_str(), Some("third"));
    assert_eq!(third.len(), 3);
}

#[test]
fn constants_flow_into_hooks_and_components() {
    let rt = Runtime::new();
    let registry = configure(&rt);
    rt.mount(&registry.holder(), Record::default());

    let first_level: Value = Record::build().field("first", "first").finish().into();
    let second_level: Value = Record::build().field("second", "second").finish().into();
    let third_level: Value = Record::build().field("third", "third").finish().into();

    let view_model_def = registry.hook(vec![inject::constant("firstLevelConstant")], |_, args| {
        args[0].constant().as_record().cloned().unwrap_or_default()
    });

    let inner_def = registry.component(
        vec![
            inject::hook("viewModel"),
            inject::constant("secondLevelConstant"),
        ],
        |args| {
            let view_model = args[0].watcher().clone();
            let second = args[1].constant().as_record().cloned().unwrap_or_default();
            Renderable::new(move |ctx, props| {
                let vm = view_model.read(ctx);
                let first = vm.get("first").as_str().unwrap_or("").to_string();
                let second = second.get("second").as_str().unwrap_or("").to_string();
                let text = props.get("text").as_str().unwrap_or("").to_string();
                Node::elem("div", vec![Node::text(format!("inner {first} {second} {text}"))])
            })
        },
    );

    let outer_def = registry.component(
        vec![inner_def.into(), inject::constant("thirdLevelConstant")],
        |args| {
            let inner = args[0].component().clone();
            let third = args[1].constant().as_record().cloned().unwrap_or_default();
            Renderable::new(move |_, _| {
                let third = third.get("third").as_str().unwrap_or("").to_string();
                Node::elem(
                    "div",
                    vec![
                        Node::elem("div", vec![Node::text(format!("outer {third}"))]),
                        Node::unit(&inner, Record::build().field("text", "text").finish()),
                    ],
                )
            })
        },
    );

    let view_model = view_model_def
        .resolve(&Scope::new().with_constant("firstLevelConstant", first_level))
        .unwrap();
    let scope = Scope::new()
        .with_hook("viewModel", view_model)
        .with_constant("secondLevelConstant", second_level)
        .with_constant("thirdLevelConstant", third_level);
    let outer = outer_def.resolve(&scope).unwrap();

    let root = rt.mount(&outer, Record::default());
    assert_eq!(
        render_to_string(&rt, root),
        "<div><div>outer third</div><div>inner first second text</div></div>"
    );
}

#[test]
fn field_level_mode_only_updates_affected_dependents() {
    let rt = Runtime::new();
    let tc = configure_counting(&rt, WatchMode::FieldLevel);
    tc.counts.assert(1, 1, 1, 1, 1);

    fire_action(&tc.main_current, "updateFirstCount");
    tc.counts.assert(1, 2, 2, 1, 1);

    fire_action(&tc.main_current, "updateSecondCount");
    tc.counts.assert(1, 3, 2, 2, 1);

    fire_action(&tc.main_current, "updateThirdCount");
    tc.counts.assert(1, 4, 2, 2, 2);
}

#[test]
fn whole_mode_updates_every_dependent() {
    let rt = Runtime::new();
    let tc = configure_counting(&rt, WatchMode::Whole);
    tc.counts.assert(1, 1, 1, 1, 1);

    fire_action(&tc.main_current, "updateFirstCount");
    tc.counts.assert(1, 2, 2, 2, 2);

    fire_action(&tc.main_current, "updateSecondCount");
    tc.counts.assert(1, 3, 3, 3, 3);

    fire_action(&tc.main_current, "updateThirdCount");
    tc.counts.assert(1, 4, 4, 4, 4);
}

#[test]
fn nested_component_chain_renders_every_level() {
    let rt = Runtime::new();
    let registry = configure(&rt);
    rt.mount(&registry.holder(), Record::default());

    let count_def = registry.hook(vec![], |_, _| {
        Record::build().field("firstCount", 0).finish()
    });

    let leaf = |registry: &hookwire::core::Registry| {
        registry.component(vec![inject::hook("firstCountViewModel")], |args| {
            let view_model = args[0].watcher().clone();
            Renderable::new(move |ctx, props| {
                let vm = view_model.read(ctx);
                let count = vm.get("firstCount").as_int().unwrap_or(0);
                let text = props.get("text").as_str().unwrap_or("").to_string();
                Node::elem(
                    "div",
                    vec![
                        Node::elem("span", vec![Node::text(text)]),
                        Node::elem("span", vec![Node::text(count.to_string())]),
                    ],
                )
            })
        })
    };

    let wrap = |registry: &hookwire::core::Registry, nested: hookwire::ComponentDef| {
        registry.component(
            vec![inject::hook("firstCountViewModel"), nested.into()],
            |args| {
                let view_model = args[0].watcher().clone();
                let nested = args[1].component().clone();
                Renderable::new(move |ctx, props| {
                    let vm = view_model.read(ctx);
                    let count = vm.get("firstCount").as_int().unwrap_or(0);
                    let text = props.get("text").as_str().unwrap_or("").to_string();
                    let inner_text = format!("{text}-inner");
                    Node::elem(
                        "div",
                        vec![
                            Node::elem("span", vec![Node::text(text)]),
                            Node::elem("span", vec![Node::text(count.to_string())]),
                            Node::unit(
                                &nested,
                                Record::build().field("text", inner_text).finish(),
                            ),
                        ],
                    )
                })
            },
        )
    };

    let two_level = leaf(&registry);
    let one_level = wrap(&registry, two_level);
    let main = wrap(&registry, one_level);

    let scope = Scope::new().with_hook(
        "firstCountViewModel",
        count_def.resolve(&Scope::new()).unwrap(),
    );
    let main = main.resolve(&scope).unwrap();
    let root = rt.mount(&main, Record::build().field("text", "main").finish());

    let text = text_content(&rt, root);
    assert!(text.contains("main"), "text was {text:?}");
    assert!(text.contains("main-inner"), "text was {text:?}");
    assert!(text.contains("main-inner-inner"), "text was {text:?}");
}

#[test]
fn missing_hook_in_scope_fails_resolution() {
    let rt = Runtime::new();
    let registry = configure(&rt);
    rt.mount(&registry.holder(), Record::default());

    let def = registry.component(vec![inject::hook("viewModel")], |_| {
        Renderable::new(|_, _| Node::Empty)
    });
    let err = def.resolve(&Scope::new()).unwrap_err();
    assert!(matches!(err, ResolveError::MissingHook(key) if key == "viewModel"));
}
