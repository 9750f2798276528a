// # qcip
//
// Keeps Tencent Cloud firewall rules pointed at the operator's current
// public IP. Each invocation makes one pass and exits; schedule it with
// cron or Task Scheduler for continuous coverage.
//
// This binary is a thin integration layer: it parses arguments, wires
// the IP source and provider into `qcip_core::FirewallSync`, and turns
// the outcome into log lines, an optional notification and an exit code.
//
// ## Configuration
//
// A JSON file (`config.json` by default, `-c` to override):
//
// ```json
// {
//   "MType": "lh",
//   "SecretId": "...",
//   "SecretKey": "...",
//   "InstanceId": "lhins-xxxxxxxx",
//   "InstanceRegion": "ap-guangzhou",
//   "GetIPAPI": "IPCONF",
//   "MaxRetries": 3,
//   "EnableWinNotify": false,
//   "Rules": ["home-ip"]
// }
// ```
//
// For `"MType": "cvm"`, `SecurityGroupId` and `SecurityGroupRegion`
// replace `InstanceId` and `InstanceRegion`.
//
// ## Environment
//
// - `QCIP_LOG_LEVEL`: trace, debug, info (default), warn, error

mod cli;
mod notify;
mod update_check;

use anyhow::Context;
use cli::{Action, RunOptions};
use qcip_core::config::Config;
use qcip_core::engine::{FirewallSync, SyncOutcome};
use qcip_core::{Error, FirewallProvider, ProviderRegistry, Result, RunContext};
use qcip_ip_http::HttpIpSource;
use std::net::IpAddr;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes
#[derive(Debug, Clone, Copy)]
enum QcipExitCode {
    /// Rules are current (updated or already matching)
    Success = 0,
    /// Any error: config, arguments, network or provider
    Failure = 1,
}

impl From<QcipExitCode> for ExitCode {
    fn from(code: QcipExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let log_level = log_level_from_env();
    if let Err(e) = init_tracing(*log_level.as_ref().unwrap_or(&Level::INFO)) {
        eprintln!("{:#}", e);
        return QcipExitCode::Failure.into();
    }
    if let Err(e) = log_level {
        error!("{}", e);
        return QcipExitCode::Failure.into();
    }

    let action = match cli::parse_args(std::env::args()) {
        Ok(action) => action,
        Err(e) => {
            error!("{}", e);
            error!("Run qcip -h for help");
            return QcipExitCode::Failure.into();
        }
    };

    let rt = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{:#}", e);
            return QcipExitCode::Failure.into();
        }
    };

    match action {
        Action::Help => {
            println!("{}", cli::help_text());
            QcipExitCode::Success.into()
        }
        Action::Version => {
            rt.block_on(update_check::show_version_info());
            QcipExitCode::Success.into()
        }
        Action::Run(options) => {
            println!("QCIP v{}", update_check::VERSION);
            let mut ctx = run_context(&options);

            match rt.block_on(run(&mut ctx)) {
                Ok(outcome) => {
                    ctx.notify_success(outcome.message());
                    QcipExitCode::Success.into()
                }
                Err(e) => {
                    ctx.report_error(&e);
                    ctx.flush_errors();
                    QcipExitCode::Failure.into()
                }
            }
        }
    }
}

/// Max log level from `QCIP_LOG_LEVEL`; unset or empty means info
fn log_level_from_env() -> Result<Level> {
    let value = std::env::var("QCIP_LOG_LEVEL").unwrap_or_default();
    match value.to_lowercase().as_str() {
        "" | "info" => Ok(Level::INFO),
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::argument(format!(
            "QCIP_LOG_LEVEL {} is not valid, use trace, debug, info, warn or error",
            value
        ))),
    }
}

/// Install the global fmt subscriber
fn init_tracing(log_level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

fn run_context(options: &RunOptions) -> RunContext {
    let mut ctx = RunContext::new()
        .with_config_path(options.config_path.clone())
        .with_ip_override(options.ip.map(IpAddr::V4))
        .with_notifier(notify::desktop_notifier());

    if options.notify {
        ctx.enable_notifications();
    }
    ctx
}

/// One reconciliation pass
async fn run(ctx: &mut RunContext) -> Result<SyncOutcome> {
    let config = Config::load_in(ctx)?;

    let registry = ProviderRegistry::new();
    qcip_provider_tencent::register(&registry);

    let provider = registry.create_provider(&config)?;
    info!(
        "Managing {} rule tag(s) on {} {}",
        config.rules.len(),
        config.machine_type(),
        config.target.resource_id()
    );

    let engine = build_engine(&config, provider, ctx.ip_override())?;
    engine.run_in(ctx).await
}

/// The IP echo service is only set up when no IP was given
fn build_engine(
    config: &Config,
    provider: Box<dyn FirewallProvider>,
    ip_override: Option<IpAddr>,
) -> Result<FirewallSync> {
    if ip_override.is_some() {
        return FirewallSync::without_ip_source(provider, config);
    }

    let ip_source = HttpIpSource::from_selector(config.ip_api.as_deref())?;
    FirewallSync::new(Box::new(ip_source), provider, config)
}
