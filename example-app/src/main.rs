//! # 示例应用程序
//!
//! 模拟界面生命周期驱动组件图：界面创建时打开作用域并解析组件，
//! 界面销毁时释放作用域守卫，挂在该作用域上的组件随之被驱逐。

use anyhow::Context;
use clap::Parser;
use di_abstractions::{
    runtime_dependencies, ComponentCatalog, ComponentContract, ComponentInstance, ComponentRegistry,
    ContainerConfig,
};
use di_impl::{component, set_global_component_graph, ComponentGraph, ScopeGuard};
use infrastructure_common::{ComponentDescriptor, DependencyError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn ADSP 组件图示例应用")]
struct Args {
    /// 容器配置文件路径（.toml 或 .json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 登录/主页界面往返次数
    #[arg(long, default_value_t = 2)]
    cycles: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("启动 Lorn ADSP 组件图示例应用");

    let config = match &args.config {
        Some(path) => ContainerConfig::load(path)
            .with_context(|| format!("加载容器配置失败: {}", path.display()))?,
        None => ContainerConfig::default(),
    };

    let catalog = build_catalog();
    if let Err(errors) = catalog.validate() {
        for error in &errors {
            warn!("组件声明无效: {}", error);
        }
        anyhow::bail!("组件声明验证失败，共 {} 个错误", errors.len());
    }

    let graph = Arc::new(ComponentGraph::with_config(catalog, config));
    set_global_component_graph(Arc::clone(&graph));

    let (tx, rx) = mpsc::channel(16);
    let producer = tokio::spawn(drive_screens(tx, args.cycles));
    run_event_loop(rx).await?;
    producer.await?;

    let stats = graph.registry().stats();
    info!("组件图统计:\n{}", serde_json::to_string_pretty(&stats)?);
    info!("应用已关闭");
    Ok(())
}

/// 应用根组件
#[derive(Debug)]
struct AppComponent {
    name: String,
}

/// 登录界面组件
#[derive(Debug)]
struct LoginComponent {
    app_name: String,
    attempts: AtomicU32,
}

impl LoginComponent {
    fn login(&self, username: &str) -> Session {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        Session {
            username: username.to_string(),
            attempt,
        }
    }
}

#[derive(Debug)]
struct Session {
    username: String,
    attempt: u32,
}

/// 主页组件
#[derive(Debug)]
struct HomeComponent {
    app_name: String,
}

struct App;

impl ComponentContract for App {
    const KEY: &'static str = "example.AppComponent";
    type Instance = AppComponent;
}

struct Login;

impl ComponentContract for Login {
    const KEY: &'static str = "example.LoginComponent";
    type Instance = LoginComponent;
}

struct Home;

impl ComponentContract for Home {
    const KEY: &'static str = "example.HomeComponent";
    type Instance = HomeComponent;
}

fn app_name(parent: Option<&Arc<ComponentInstance>>, key: &str) -> Result<String, DependencyError> {
    parent
        .and_then(|p| p.downcast::<AppComponent>())
        .map(|app| app.name.clone())
        .ok_or_else(|| DependencyError::creation_failed(key, "缺少应用组件"))
}

/// 相当于代码生成器的产出
fn build_catalog() -> ComponentCatalog {
    ComponentCatalog::new()
        .declare_fn(
            ComponentDescriptor::new(App::KEY).with_description("应用根组件"),
            |_| {
                Ok(AppComponent {
                    name: "lorn-example".to_string(),
                })
            },
        )
        .declare_fn(
            ComponentDescriptor::new(Login::KEY)
                .with_parent(App::KEY)
                .with_scope("login"),
            |parent| {
                Ok(LoginComponent {
                    app_name: app_name(parent, Login::KEY)?,
                    attempts: AtomicU32::new(0),
                })
            },
        )
        .declare_fn(
            ComponentDescriptor::new(Home::KEY)
                .with_parent(App::KEY)
                .with_scope("home"),
            |parent| {
                Ok(HomeComponent {
                    app_name: app_name(parent, Home::KEY)?,
                })
            },
        )
}

/// 界面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Screen {
    Login,
    Home,
}

impl Screen {
    fn scope(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Home => "home",
        }
    }
}

/// 界面生命周期事件
#[derive(Debug)]
enum ScreenEvent {
    Created { screen: Screen, username: String },
    Destroyed(Screen),
}

/// 模拟用户在登录页与主页之间往返
async fn drive_screens(tx: mpsc::Sender<ScreenEvent>, cycles: u32) {
    for cycle in 1..=cycles {
        let username = format!("user-{cycle}");
        let events = [
            ScreenEvent::Created {
                screen: Screen::Login,
                username: username.clone(),
            },
            ScreenEvent::Destroyed(Screen::Login),
            ScreenEvent::Created {
                screen: Screen::Home,
                username,
            },
            ScreenEvent::Destroyed(Screen::Home),
        ];
        for event in events {
            if tx.send(event).await.is_err() {
                warn!("事件循环已退出");
                return;
            }
        }
    }
}

async fn run_event_loop(mut rx: mpsc::Receiver<ScreenEvent>) -> anyhow::Result<()> {
    let mut guards: HashMap<Screen, ScopeGuard> = HashMap::new();

    while let Some(event) = rx.recv().await {
        match event {
            ScreenEvent::Created { screen, username } => {
                let graph = di_impl::global_component_graph()?;
                guards.insert(screen, graph.scope_guard(screen.scope()));
                on_screen_created(screen, &username)?;
            }
            ScreenEvent::Destroyed(screen) => {
                // 释放守卫即结束作用域
                if guards.remove(&screen).is_none() {
                    warn!("界面 {:?} 未创建", screen);
                }
            }
        }
    }
    Ok(())
}

fn on_screen_created(screen: Screen, username: &str) -> anyhow::Result<()> {
    match screen {
        Screen::Login => {
            let login = component::<Login>(runtime_dependencies!["username" => username.to_string()])?;
            let username = login.runtime().get::<String>("username")?;
            let session = login.login(&username);
            info!(
                "{} 登录界面 {}: 用户 {} 第 {} 次登录",
                login.app_name,
                login.instance().id(),
                session.username,
                session.attempt
            );
        }
        Screen::Home => {
            let home = component::<Home>(runtime_dependencies![])?;
            let app = component::<App>(runtime_dependencies![])?;
            info!(
                "{} 主页 {}，根组件 {} 创建于 {}",
                home.app_name,
                home.instance().id(),
                app.instance().id(),
                app.instance().created_at()
            );
        }
    }
    Ok(())
}
