//! di-impl 集中集成测试
//!
//! 以登录界面为例：应用组件是根，登录组件挂在 "login" 作用域，
//! 设置组件挂在 "settings" 作用域。

use di_abstractions::{
    runtime_dependencies, ComponentCatalog, ComponentContract, ComponentFactory, ComponentRegistry,
    DeclarationSource, FnFactory, RuntimeDependencies,
};
use di_impl::{
    clear_global_component_graph, component, global_component_graph, set_global_component_graph,
    ComponentGraph,
};
use infrastructure_common::{ComponentDescriptor, ComponentKey, DependencyError};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct AppComponent {
    name: &'static str,
}

#[derive(Debug)]
struct LoginComponent {
    app: String,
}

#[derive(Debug)]
struct SettingsComponent;

struct App;

impl ComponentContract for App {
    const KEY: &'static str = "demo.AppComponent";
    type Instance = AppComponent;
}

struct Login;

impl ComponentContract for Login {
    const KEY: &'static str = "demo.LoginComponent";
    type Instance = LoginComponent;
}

struct Settings;

impl ComponentContract for Settings {
    const KEY: &'static str = "demo.SettingsComponent";
    type Instance = SettingsComponent;
}

/// 每个组件的构建次数
#[derive(Debug, Default)]
struct BuildCounts {
    app: AtomicUsize,
    login: AtomicUsize,
    settings: AtomicUsize,
}

fn app_catalog(counts: Arc<BuildCounts>) -> ComponentCatalog {
    let (app_counts, login_counts) = (Arc::clone(&counts), Arc::clone(&counts));

    ComponentCatalog::new()
        .declare_fn(ComponentDescriptor::new(App::KEY), move |_| {
            app_counts.app.fetch_add(1, Ordering::SeqCst);
            Ok(AppComponent { name: "demo" })
        })
        .declare_fn(
            ComponentDescriptor::new(Login::KEY)
                .with_parent(App::KEY)
                .with_scope("login"),
            move |parent| {
                login_counts.login.fetch_add(1, Ordering::SeqCst);
                let app = parent
                    .and_then(|p| p.downcast::<AppComponent>())
                    .ok_or_else(|| DependencyError::creation_failed(Login::KEY, "缺少应用组件"))?;
                Ok(LoginComponent {
                    app: app.name.to_string(),
                })
            },
        )
        .declare_fn(
            ComponentDescriptor::new(Settings::KEY)
                .with_parent(App::KEY)
                .with_scope("settings"),
            move |_| {
                counts.settings.fetch_add(1, Ordering::SeqCst);
                Ok(SettingsComponent)
            },
        )
}

fn app_graph() -> (Arc<BuildCounts>, ComponentGraph) {
    let counts = Arc::new(BuildCounts::default());
    let graph = ComponentGraph::new(app_catalog(Arc::clone(&counts)));
    (counts, graph)
}

#[test]
fn test_cache_identity() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();

    let first = graph.get::<App>()?;
    let second = graph.get::<App>()?;

    assert!(first.ptr_eq(&second));
    assert_eq!(counts.app.load(Ordering::SeqCst), 1);
    assert_eq!(graph.registry().stats().cache_hits, 1);
    Ok(())
}

#[test]
fn test_parent_materialized_exactly_once() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();

    let login = graph.get::<Login>()?;
    let settings = graph.get::<Settings>()?;
    let app = graph.get::<App>()?;

    assert_eq!(counts.app.load(Ordering::SeqCst), 1);
    assert_eq!(login.app, "demo");
    assert!(Arc::ptr_eq(login.instance().parent().unwrap(), app.instance()));
    assert!(Arc::ptr_eq(settings.instance().parent().unwrap(), app.instance()));
    assert_eq!(app.instance().children().len(), 2);
    Ok(())
}

#[test]
fn test_scope_end_evicts_subscribers() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();

    let login = graph.get::<Login>()?;
    let scope = graph.scopes().get(Some("login")).expect("解析时创建作用域");
    assert!(scope.is_observing(login.instance()));

    assert_eq!(graph.end_scope("login"), 1);
    assert!(!graph.registry().contains(Login::KEY));
    assert!(graph.registry().contains(App::KEY));
    assert_eq!(scope.observer_count(), 0);

    let rebuilt = graph.get::<Login>()?;
    assert!(!login.ptr_eq(&rebuilt));
    assert_eq!(counts.login.load(Ordering::SeqCst), 2);
    assert_eq!(counts.app.load(Ordering::SeqCst), 1);
    assert!(scope.is_observing(rebuilt.instance()));
    Ok(())
}

#[test]
fn test_scope_end_is_selective() -> anyhow::Result<()> {
    let (_counts, graph) = app_graph();

    graph.get::<Login>()?;
    let settings = graph.get::<Settings>()?;

    assert_eq!(graph.end_scope("login"), 1);

    let keys = graph.registry().cached_keys();
    assert_eq!(keys, vec![App::key(), Settings::key()]);
    assert!(graph.get::<Settings>()?.ptr_eq(&settings));

    // 不存在的作用域和重复结束都没有效果
    assert_eq!(graph.end_scope("unknown"), 0);
    assert_eq!(graph.end_scope("login"), 0);
    assert_eq!(graph.registry().stats().evictions, 1);
    Ok(())
}

#[test]
fn test_runtime_dependencies_overwrite() -> anyhow::Result<()> {
    let (_counts, graph) = app_graph();

    let first = graph.component::<Login>(runtime_dependencies!["username" => String::from("alice")])?;
    assert_eq!(first.runtime().get::<String>("username")?.as_str(), "alice");

    // 空调用不清除已有依赖
    let plain = graph.get::<Login>()?;
    assert_eq!(plain.runtime().get::<String>("username")?.as_str(), "alice");

    let second = graph.component::<Login>(runtime_dependencies![None => 42_u32])?;
    assert!(first.ptr_eq(&second));
    assert!(matches!(
        second.runtime().get::<String>("username"),
        Err(DependencyError::RuntimeDependencyMissing { .. })
    ));
    assert_eq!(*second.runtime().get::<u32>(None)?, 42);
    assert_eq!(second.instance().runtime_dependencies().len(), 1);
    Ok(())
}

#[test]
fn test_invalid_identity_is_rejected() {
    let (_counts, graph) = app_graph();
    graph.get::<App>().unwrap();
    let before = graph.registry().cached_keys();

    let err = graph.registry().get("demo.Unknown").unwrap_err();
    assert!(matches!(
        &err,
        DependencyError::InvalidComponentKind { identity } if identity == "demo.Unknown"
    ));

    assert_eq!(graph.registry().cached_keys(), before);
    assert_eq!(graph.registry().stats().resolution_errors, 1);
}

#[test]
fn test_subscription_is_idempotent() -> anyhow::Result<()> {
    let (_counts, graph) = app_graph();

    let login = graph.get::<Login>()?;
    let scope = graph.attach_scope("login", login.instance());
    graph.attach_scope("login", login.instance());

    assert_eq!(scope.observer_count(), 1);
    assert_eq!(graph.end_scope("login"), 1);
    assert_eq!(graph.registry().stats().evictions, 1);
    Ok(())
}

#[test]
fn test_undeclared_scope_rejects_subscription() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();

    let app = graph.get::<App>()?;
    let login = graph.get::<Login>()?;
    let settings = graph.attach_scope("settings", app.instance());
    graph.attach_scope("settings", login.instance());
    graph.attach_scope("login", app.instance());

    assert!(!settings.is_observing(app.instance()));
    assert!(!settings.is_observing(login.instance()));
    assert_eq!(graph.end_scope("settings"), 0);
    assert!(graph.registry().contains(Login::KEY));

    // login 作用域只驱逐声明了它的组件
    assert_eq!(graph.end_scope("login"), 1);
    assert!(graph.registry().contains(App::KEY));

    graph.get::<App>()?;
    assert_eq!(counts.app.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_empty_scope_declaration_is_never_evicted() -> anyhow::Result<()> {
    let catalog = ComponentCatalog::new()
        .declare_fn(ComponentDescriptor::new("demo.Banner").with_scope(""), |_| Ok(()));
    let graph = ComponentGraph::new(catalog);

    let banner = graph.registry().get("demo.Banner")?;
    assert!(banner.scope().is_none());
    assert!(graph.scopes().is_empty());
    assert_eq!(graph.end_scope(""), 0);
    assert!(graph.registry().contains("demo.Banner"));
    Ok(())
}

#[test]
fn test_scope_guard_ends_scope_on_drop() -> anyhow::Result<()> {
    let (_counts, graph) = app_graph();
    {
        let guard = graph.scope_guard("login");
        let login = graph.get::<Login>()?;
        assert!(guard.scope().is_observing(login.instance()));
        assert!(graph.registry().contains(Login::KEY));
    }
    assert!(!graph.registry().contains(Login::KEY));
    Ok(())
}

#[test]
fn test_parent_cycle_is_reported() {
    let catalog = ComponentCatalog::new()
        .declare_fn(ComponentDescriptor::new("cycle.A").with_parent("cycle.B"), |_| Ok(()))
        .declare_fn(ComponentDescriptor::new("cycle.B").with_parent("cycle.A"), |_| Ok(()));
    assert!(catalog.validate().is_err());

    let graph = ComponentGraph::new(catalog);
    match graph.registry().get("cycle.A") {
        Err(DependencyError::CircularParentChain { chain }) => {
            assert_eq!(chain, "cycle.A -> cycle.B -> cycle.A")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(graph.registry().cached_keys().is_empty());
}

#[test]
fn test_dangling_parent_is_invalid() {
    let catalog = ComponentCatalog::new()
        .declare_fn(ComponentDescriptor::new("demo.Orphan").with_parent("demo.Gone"), |_| Ok(()));
    let graph = ComponentGraph::new(catalog);

    assert!(matches!(
        graph.registry().get("demo.Orphan"),
        Err(DependencyError::InvalidComponentKind { identity }) if identity == "demo.Gone"
    ));
}

#[test]
fn test_construction_failure_leaves_no_entry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let catalog = ComponentCatalog::new()
        .declare_fn(ComponentDescriptor::new(App::KEY), |_| Ok(AppComponent { name: "demo" }))
        .declare_fn(
            ComponentDescriptor::new(Login::KEY).with_parent(App::KEY),
            move |_| -> Result<LoginComponent, DependencyError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DependencyError::RuntimeDependencyMissing {
                    qualifier: "username".to_string(),
                })
            },
        )
        .declare_without_constructor(ComponentDescriptor::new("demo.Abstract"));
    let graph = ComponentGraph::new(catalog);

    assert!(matches!(
        graph.get::<Login>(),
        Err(DependencyError::ComponentCreationFailed { identity, .. }) if identity == Login::KEY
    ));
    assert!(graph.get::<Login>().is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(graph.registry().cached_keys(), vec![App::key()]);

    assert!(matches!(
        graph.registry().get("demo.Abstract"),
        Err(DependencyError::MissingPrimaryConstructor { .. })
    ));
}

#[test]
fn test_contract_mismatch() {
    struct WrongApp;

    impl ComponentContract for WrongApp {
        const KEY: &'static str = App::KEY;
        type Instance = LoginComponent;
    }

    let (_counts, graph) = app_graph();
    assert!(matches!(
        graph.get::<WrongApp>(),
        Err(DependencyError::ContractMismatch { identity, .. }) if identity == App::KEY
    ));
}

mock! {
    Source {}

    impl DeclarationSource for Source {
        fn describe(&self, key: &str) -> Option<ComponentDescriptor>;
        fn factory(&self, key: &str) -> Option<Arc<dyn ComponentFactory>>;
        fn keys(&self) -> Vec<ComponentKey>;
    }
}

#[test]
fn test_parent_type_consulted_once() -> anyhow::Result<()> {
    let mut source = MockSource::new();
    source
        .expect_describe()
        .withf(|key: &str| key == App::KEY)
        .times(1)
        .returning(|_| Some(ComponentDescriptor::new(App::KEY)));
    source
        .expect_describe()
        .withf(|key: &str| key == Login::KEY)
        .times(1)
        .returning(|_| {
            Some(
                ComponentDescriptor::new(Login::KEY)
                    .with_parent(App::KEY)
                    .with_scope("login"),
            )
        });
    source
        .expect_describe()
        .withf(|key: &str| key == "demo.Unknown")
        .times(2)
        .returning(|_| None);

    let app_factory: Arc<dyn ComponentFactory> =
        Arc::new(FnFactory::new(|_| Ok(AppComponent { name: "mock" })));
    let login_factory: Arc<dyn ComponentFactory> =
        Arc::new(FnFactory::new(|_| Ok(LoginComponent { app: "mock".into() })));
    source
        .expect_factory()
        .withf(|key: &str| key == App::KEY)
        .times(1)
        .returning(move |_| Some(Arc::clone(&app_factory)));
    source
        .expect_factory()
        .withf(|key: &str| key == Login::KEY)
        .times(3)
        .returning(move |_| Some(Arc::clone(&login_factory)));

    let graph = ComponentGraph::new(source);
    for _ in 0..3 {
        graph.get::<Login>()?;
        graph.end_scope("login");
    }
    graph.get::<App>()?;

    // 无效标识不做记忆，每次都重新查询
    assert!(graph.registry().get("demo.Unknown").is_err());
    assert!(graph.registry().get("demo.Unknown").is_err());
    Ok(())
}

#[test]
fn test_reset_all_isolates_cases() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();

    graph.get::<Login>()?;
    graph.registry().reset_all();
    assert!(graph.registry().cached_keys().is_empty());

    graph.get::<Login>()?;
    assert_eq!(counts.app.load(Ordering::SeqCst), 2);
    assert_eq!(counts.login.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_global_component_graph() -> anyhow::Result<()> {
    clear_global_component_graph();
    assert!(matches!(
        component::<App>(RuntimeDependencies::new()),
        Err(DependencyError::GraphNotInstalled)
    ));

    let (_counts, graph) = app_graph();
    assert!(set_global_component_graph(Arc::new(graph)).is_none());

    let login = component::<Login>(runtime_dependencies!["username" => "bob"])?;
    assert_eq!(*login.runtime().get::<&str>("username")?, "bob");
    assert!(global_component_graph()?.registry().contains(Login::KEY));

    assert!(clear_global_component_graph().is_some());
    assert!(global_component_graph().is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolution_and_scope_end() -> anyhow::Result<()> {
    let (counts, graph) = app_graph();
    let graph = Arc::new(graph);

    let mut handles = Vec::new();
    for i in 0..32 {
        let graph = Arc::clone(&graph);
        handles.push(tokio::task::spawn_blocking(move || {
            if i % 8 == 0 {
                graph.end_scope("login");
            }
            graph.get::<Login>().map(|login| login.app.clone())
        }));
    }
    for handle in handles {
        assert_eq!(handle.await??, "demo");
    }

    assert_eq!(counts.app.load(Ordering::SeqCst), 1);
    // 作用域结束后订阅者集合与缓存保持一致
    let login = graph.get::<Login>()?;
    let scope = graph.scopes().get(Some("login")).expect("作用域已创建");
    assert!(scope.is_observing(login.instance()));
    Ok(())
}
