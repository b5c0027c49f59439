//! 注册表客户端演示：从环境变量加载拓扑，打印服务与数据库，并演示一次服务解析。
//!
//! # 使用方法
//! ```bash
//! SOAJS_REGISTRY_API=127.0.0.1:5000 SOAJS_ENV=dev \
//!     cargo run --bin registry_demo -- --config config.json \
//!     --context header.json --connect payments@2 --watch
//! ```
//! - `--config`：服务自身的 `config.json`；缺省时使用 `--service`（默认 `example`）与类型 `service`；
//! - `--context`：一份 `soajsinjectobj` 头部内容，用于演示解析；
//! - `--connect`：目标服务，可带 `@版本`；
//! - `--watch`：保持运行直至 Ctrl-C，期间后台刷新持续生效。
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `info`。

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, bail};
use soajs_core::{
    EnvironmentConfig, ManagerOptions, RegistryManager, RequestContext, ServiceConnector,
    ServiceDescriptor,
};
use soajs_transport_http::{HttpRegistryTransport, RegistryAddress};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct DemoArgs {
    config: Option<String>,
    service: Option<String>,
    context: Option<String>,
    connect: Option<String>,
    watch: bool,
}

fn parse_args() -> anyhow::Result<DemoArgs> {
    let mut parsed = DemoArgs::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} 需要一个参数"))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(value("--config")?),
            "--service" => parsed.service = Some(value("--service")?),
            "--context" => parsed.context = Some(value("--context")?),
            "--connect" => parsed.connect = Some(value("--connect")?),
            "--watch" => parsed.watch = true,
            other => bail!("未知参数: {other}"),
        }
    }
    Ok(parsed)
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_tracing();
    let args = parse_args()?;

    let env = EnvironmentConfig::from_env()?;
    let transport = Arc::new(HttpRegistryTransport::new(RegistryAddress::from_environment(
        &env,
    )?)?);

    let options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("读取 {path} 失败"))?;
            ManagerOptions::from_descriptor(ServiceDescriptor::from_json(&text)?, &env.env_code)
        }
        None => ManagerOptions::new(
            args.service.as_deref().unwrap_or("example"),
            &env.env_code,
            "service",
        ),
    }
    .with_environment(&env);

    let context = args
        .context
        .as_deref()
        .map(|path| fs::read_to_string(path).with_context(|| format!("读取 {path} 失败")))
        .transpose()?;

    RegistryManager::scoped(options, transport, |manager| async move {
        let snapshot = manager.current()?;
        info!(
            registry.name = %snapshot.name,
            registry.environment = %snapshot.environment,
            "registry ready"
        );
        for (name, service) in &snapshot.services {
            println!("service  {name:<24} group={} port={}", service.group, service.port);
        }
        for (name, db) in manager.all_databases()? {
            println!("database {name:<24} cluster={}", db.cluster);
        }

        if let (Some(raw), Some(target)) = (context.as_deref(), args.connect.as_deref()) {
            let (service, version) = match target.split_once('@') {
                Some((service, version)) => (service, Some(version)),
                None => (target, None),
            };
            match RequestContext::from_header_value(raw) {
                Ok(ctx) => {
                    let descriptor = ServiceConnector::new(&ctx).connect(service, version);
                    println!("connect  {target} -> {} ({:?})", descriptor.host, descriptor.route);
                    for (name, value) in &descriptor.headers {
                        println!("  header {name}: {value}");
                    }
                }
                Err(err) => println!("connect  skipped: {err}"),
            }
        }

        if args.watch {
            info!("watching registry; press Ctrl-C to exit");
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error.message = %err, "failed to listen for Ctrl-C");
            }
        }
        Ok(())
    })
    .await?;

    Ok(())
}
