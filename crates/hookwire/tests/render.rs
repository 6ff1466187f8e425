//! Commit and recommit behavior of hook-gated components: containers only
//! come alive once their hooks have values, render with the latest data,
//! and remount with current state after being unmounted.

use hookwire::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

struct Testcase {
    rt: Runtime,
    main_current: Rc<RefCell<Option<Record>>>,
    main_renders: Rc<RefCell<Vec<i64>>>,
    inner_renders: Rc<RefCell<Vec<i64>>>,
}

impl Testcase {
    #[track_caller]
    fn assert_renders(&self, main: &[i64], inner: &[i64]) {
        assert_eq!(*self.main_renders.borrow(), main, "main container renders");
        assert_eq!(*self.inner_renders.borrow(), inner, "inner container renders");
    }

    fn set_count(&self, count: i64) {
        self.fire("setCount", &[Value::from(count)]);
    }

    fn set_inner_mounted(&self, mounted: bool) {
        self.fire("setMountedInnerContainer", &[Value::from(mounted)]);
    }

    fn fire(&self, name: &str, args: &[Value]) {
        let record = self.main_current.borrow().clone().expect("committed");
        record.get(name).as_action().expect("action field").call(args);
    }
}

/// A main view model with a counter and an inner-container toggle, a main
/// container gated on it, and an inner container it conditionally mounts.
fn configure_containers(initial_inner_mounted: bool) -> Testcase {
    let rt = Runtime::new();
    let registry = configure(&rt);

    let main_def = registry.hook(vec![], move |ctx, _| {
        let count = ctx.state(|| 0i64);
        let mounted = ctx.state(move || initial_inner_mounted);
        let set_count = {
            let count = count.clone();
            ctx.action(move |args| count.set(args[0].as_int().unwrap_or(0)))
        };
        let set_mounted = {
            let mounted = mounted.clone();
            ctx.action(move |args| mounted.set(args[0].as_bool().unwrap_or(false)))
        };
        Record::build()
            .field("count", count.get())
            .field("mountedInnerContainer", mounted.get())
            .field("setCount", set_count)
            .field("setMountedInnerContainer", set_mounted)
            .finish()
    });

    let main_renders: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));
    let inner_renders: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));

    let inner_def = registry.component(vec![inject::hook("mainViewModel")], {
        let renders = Rc::clone(&inner_renders);
        move |args| {
            let view_model = args[0].watcher().clone();
            let renders = Rc::clone(&renders);
            Renderable::new(move |ctx, _| {
                let vm = view_model.read(ctx);
                let count = vm.get("count").as_int().unwrap_or(0);
                renders.borrow_mut().push(count);
                Node::elem("div", vec![Node::text(count.to_string())])
            })
        }
    });

    let main_container_def = registry.component(
        vec![inject::hook("mainViewModel"), inner_def.into()],
        {
            let renders = Rc::clone(&main_renders);
            move |args| {
                let view_model = args[0].watcher().clone();
                let inner = args[1].component().clone();
                let renders = Rc::clone(&renders);
                Renderable::new(move |ctx, _| {
                    let vm = view_model.read(ctx);
                    let count = vm.get("count").as_int().unwrap_or(0);
                    let mounted = vm.get("mountedInnerContainer").as_bool().unwrap_or(false);
                    renders.borrow_mut().push(count);
                    let children = if mounted {
                        vec![Node::unit(&inner, Record::default())]
                    } else {
                        Vec::new()
                    };
                    Node::elem("div", children)
                })
            }
        },
    );

    let main_vm = main_def.resolve(&Scope::new()).unwrap();
    let scope = Scope::new().with_hook("mainViewModel", main_vm.clone());
    let main_container = main_container_def.resolve(&scope).unwrap();

    let main_current: Rc<RefCell<Option<Record>>> = Rc::new(RefCell::new(None));
    main_vm.subscribe({
        let main_current = Rc::clone(&main_current);
        move |updated| *main_current.borrow_mut() = Some(updated.clone())
    });

    rt.mount(&main_container, Record::default());
    rt.mount(&registry.holder(), Record::default());

    Testcase {
        rt,
        main_current,
        main_renders,
        inner_renders,
    }
}

#[test]
fn commits_mounted_container_with_latest_data() {
    let tc = configure_containers(false);
    tc.assert_renders(&[0], &[]);

    tc.set_count(1);
    tc.assert_renders(&[0, 1], &[]);

    tc.set_inner_mounted(true);
    tc.assert_renders(&[0, 1, 1], &[1]);
}

#[test]
fn recommits_remounted_container_with_latest_data() {
    let tc = configure_containers(true);
    tc.assert_renders(&[0], &[0]);

    tc.set_count(1);
    tc.assert_renders(&[0, 1], &[0, 1]);

    tc.set_inner_mounted(false);
    tc.assert_renders(&[0, 1, 1], &[0, 1]);

    // both updates land in one batch; the remounted inner container renders
    // exactly once, with the newest count
    tc.rt.batch(|| {
        tc.set_count(2);
        tc.set_inner_mounted(true);
    });
    tc.assert_renders(&[0, 1, 1, 2], &[0, 1, 2]);

    tc.set_inner_mounted(false);
    tc.assert_renders(&[0, 1, 1, 2, 2], &[0, 1, 2]);
}
