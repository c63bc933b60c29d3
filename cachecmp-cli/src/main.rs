use anyhow::{anyhow, bail, Context, Result};
use cachecmp_caching::{ResponseCache, ResponseCacheConfig};
use cachecmp_config::{
    domains::logging::LogFormat, CachecmpConfig, ConfigLoader, DeploymentConfig, LoggingConfig,
    SampleBudget, VariantKind,
};
use cachecmp_harness::{BenchReport, Harness};
use cachecmp_http::HttpConfig;
use cachecmp_proxy::{caching_proxy_app, spawn_server, OriginServer, StaticRelayer};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, ConfigCommands, WorkloadArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_tracing(cli.log_level.as_ref(), &config.logging)?;

    match cli.command {
        Commands::Run {
            variant,
            external,
            workload,
            json,
        } => run_command(config, variant, external, &workload, json).await,
        Commands::Compare {
            baseline_url,
            workload,
            json,
        } => compare_command(config, baseline_url, &workload, json).await,
        Commands::ServeOrigin { host, port } => serve_origin(&host, port).await,
        Commands::ServeProxy {
            host,
            port,
            upstreams,
            header,
            capacity,
        } => serve_proxy(&config, &host, port, &upstreams, &header, capacity).await,
        Commands::Config { config_cmd } => config_command(config_cmd),
    }
}

/// Initialize tracing from the CLI level, `RUST_LOG`, or the configured level
fn init_tracing(log_level: Option<&String>, logging: &LoggingConfig) -> Result<()> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", level);
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.to_string())),
    };

    // Reports go to stdout; logs stay on stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(logging.ansi)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing: {}", e))?;

    debug!("Tracing initialized");
    Ok(())
}

/// Fold command-line workload overrides into the loaded configuration
fn apply_workload(config: &mut CachecmpConfig, workload: &WorkloadArgs) {
    if let Some(keys) = workload.keys {
        config.harness.keys = keys;
    }
    if let Some(count) = workload.iterations {
        config.harness.sample = SampleBudget::Iterations { count };
    }
    if let Some(secs) = workload.duration {
        config.harness.sample = SampleBudget::Duration {
            seconds: Duration::from_secs(secs),
        };
    }
    if let Some(seed) = workload.seed {
        config.harness.seed = Some(seed);
    }
    if let Some(capacity) = workload.capacity {
        if let DeploymentConfig::InProcess { ref mut store, .. } = config.sut.deployment {
            store.capacity = Some(capacity);
        }
    }
}

fn print_report(report: &BenchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn fail_unless_passed(report: &BenchReport) -> Result<()> {
    if !report.passed() {
        bail!(
            "{} run failed: {} cache violations, {} transport errors",
            report.variant.kind,
            report.sample.violations,
            report.sample.transport_errors
        );
    }
    Ok(())
}

async fn run_command(
    mut config: CachecmpConfig,
    variant: Option<VariantKind>,
    external: Option<String>,
    workload: &WorkloadArgs,
    json: bool,
) -> Result<()> {
    if let Some(variant) = variant {
        config.sut.variant = variant;
    }
    if let Some(base_url) = external {
        config.sut.deployment = DeploymentConfig::External { base_url };
    }
    apply_workload(&mut config, workload);
    config.validate_all().context("Invalid configuration")?;

    let report = Harness::new(config)
        .run()
        .await
        .context("Benchmark run aborted")?;
    print_report(&report, json)?;
    fail_unless_passed(&report)
}

async fn compare_command(
    config: CachecmpConfig,
    baseline_url: Option<String>,
    workload: &WorkloadArgs,
    json: bool,
) -> Result<()> {
    let mut reports = Vec::with_capacity(2);

    for kind in [VariantKind::Baseline, VariantKind::Custom] {
        let mut config = config.clone();
        config.sut.variant = kind;
        // Presets decide header and concurrency for a comparison
        config.sut.cache_status_header = None;
        config.sut.populate_concurrency = None;
        if kind == VariantKind::Baseline {
            if let Some(ref base_url) = baseline_url {
                config.sut.deployment = DeploymentConfig::External {
                    base_url: base_url.clone(),
                };
            }
        } else if let DeploymentConfig::External { .. } = config.sut.deployment {
            config.sut.deployment = DeploymentConfig::default();
        }
        apply_workload(&mut config, workload);
        config.validate_all().context("Invalid configuration")?;

        info!("Running {} variant", kind);
        let report = Harness::new(config)
            .run()
            .await
            .with_context(|| format!("{} run aborted", kind))?;
        print_report(&report, json)?;
        reports.push(report);
    }

    if let [baseline, custom] = reports.as_slice() {
        if !json && baseline.ops_per_sec > 0.0 {
            println!(
                "⚡ custom/baseline throughput: {:.2}x",
                custom.ops_per_sec / baseline.ops_per_sec
            );
        }
    }

    for report in &reports {
        fail_unless_passed(report)?;
    }
    Ok(())
}

fn bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid bind address: {}", host))?;
    Ok(SocketAddr::new(ip, port))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}

async fn serve_origin(host: &str, port: u16) -> Result<()> {
    let origin = OriginServer::start(bind_address(host, port)?)
        .await
        .context("Failed to start origin")?;
    println!("🚀 Origin listening on {}", origin.url());

    shutdown_signal().await;
    println!("Origin served {} requests", origin.hits());
    origin.shutdown().await;
    Ok(())
}

async fn serve_proxy(
    config: &CachecmpConfig,
    host: &str,
    port: u16,
    upstreams: &[String],
    header: &str,
    capacity: Option<usize>,
) -> Result<()> {
    let relayer = StaticRelayer::from_routes(upstreams).context("Invalid --upstream")?;
    let routes = relayer.len();
    let cache = ResponseCache::from_config(ResponseCacheConfig {
        capacity,
        ..Default::default()
    })
    .context("Invalid cache configuration")?;
    let http: HttpConfig = config.http.clone().into();

    let app = caching_proxy_app(Arc::new(relayer), Arc::new(cache), header, &http)
        .context("Failed to build proxy")?;
    let handle = spawn_server("proxy", bind_address(host, port)?, app)
        .await
        .context("Failed to start proxy")?;
    println!(
        "🚀 Caching proxy listening on {} ({} route(s), header {})",
        handle.url(),
        routes,
        header
    );

    handle.run_until(shutdown_signal()).await;
    Ok(())
}

fn config_command(config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Validate { path } => validate_config_file(&path),
        ConfigCommands::Generate { output } => {
            let sample = CachecmpConfig::generate_sample();
            match output {
                Some(path) => {
                    std::fs::write(&path, sample)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✅ Sample configuration written to {}", path.display());
                }
                None => print!("{}", sample),
            }
            Ok(())
        }
    }
}

fn validate_config_file(path: &Path) -> Result<()> {
    let config = ConfigLoader::new()
        .from_file(path)
        .with_context(|| format!("Invalid configuration: {}", path.display()))?;
    println!("✅ Configuration is valid: {}", path.display());
    println!(
        "   {} variant, {} keys, {:?}",
        config.sut.variant, config.harness.keys, config.harness.sample
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "cachecmp",
            "run",
            "--variant",
            "baseline",
            "--keys",
            "10",
            "--iterations",
            "500",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                variant, workload, ..
            } => {
                assert_eq!(variant, Some(VariantKind::Baseline));
                assert_eq!(workload.keys, Some(10));
                assert_eq!(workload.iterations, Some(500));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_iterations_conflict_with_duration() {
        let result = Cli::try_parse_from([
            "cachecmp",
            "run",
            "--iterations",
            "5",
            "--duration",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_proxy_requires_upstream() {
        assert!(Cli::try_parse_from(["cachecmp", "serve-proxy"]).is_err());

        let cli = Cli::try_parse_from([
            "cachecmp",
            "serve-proxy",
            "--upstream",
            "a.example.com=http://127.0.0.1:8081",
            "--upstream",
            "b.example.com=http://127.0.0.1:8082",
        ])
        .unwrap();
        match cli.command {
            Commands::ServeProxy { upstreams, header, .. } => {
                assert_eq!(upstreams.len(), 2);
                assert_eq!(header, "X-Cache");
            }
            _ => panic!("expected serve-proxy command"),
        }
    }

    #[test]
    fn test_apply_workload() {
        let mut config = CachecmpConfig::default();
        apply_workload(
            &mut config,
            &WorkloadArgs {
                keys: Some(100),
                duration: Some(3),
                capacity: Some(50),
                seed: Some(1),
                ..Default::default()
            },
        );

        assert_eq!(config.harness.keys, 100);
        assert_eq!(
            config.harness.sample,
            SampleBudget::Duration {
                seconds: Duration::from_secs(3)
            }
        );
        assert_eq!(config.harness.seed, Some(1));
        match config.sut.deployment {
            DeploymentConfig::InProcess { ref store, .. } => assert_eq!(store.capacity, Some(50)),
            _ => panic!("expected in-process deployment"),
        }
    }

    #[test]
    fn test_generated_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cachecmp.yaml");
        std::fs::write(&path, CachecmpConfig::generate_sample()).unwrap();

        assert!(validate_config_file(&path).is_ok());
        assert!(validate_config_file(&dir.path().join("missing.yaml")).is_err());
    }
}
