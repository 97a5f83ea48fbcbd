mod api;
mod cli;
mod config;
mod csr;
mod health;
mod models;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use api::ApiState;
use cli::{CliArgs, VERSION};
use config::{Config, EndpointConfig};
use csr::Backend;
use health::{example_json, health};
use models::ErrorMessage;

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();

    if cli_args.show_help {
        CliArgs::print_help();
        return;
    }

    if cli_args.show_version {
        CliArgs::print_version();
        return;
    }

    let config = Config::load();

    if cli_args.validate_config {
        print_config_validation(&config);
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Some(ref path) = cli_args.decode_path {
        let exit_code = run_decode(path, cli_args.parser.as_deref(), config.max_input_bytes);
        std::process::exit(exit_code);
    }

    info!("starting csr-parser-server v{}", VERSION);

    if let Err(errors) = config.validate() {
        for err in errors {
            error!(field = %err.field, "{}", err.message);
        }
        std::process::exit(1);
    }

    let shutdown_token = CancellationToken::new();
    spawn_signal_handler(shutdown_token.clone());

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");

    let app = build_router(
        &config.endpoints,
        RouterDeps {
            api_state: Arc::new(ApiState {
                max_input_bytes: config.max_input_bytes,
            }),
            prometheus_handle,
        },
    );

    let addr = SocketAddr::from((config.host, config.port));
    info!(address = %addr, max_input_bytes = config.max_input_bytes, "starting server");

    match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => run_tls_server(addr, app, cert, key, shutdown_token).await,
        _ => run_plain_server(addr, app, shutdown_token).await,
    }

    info!("server stopped");
}

/// Decodes a local file and prints the result envelope. Returns the process
/// exit code.
fn run_decode(path: &str, parser: Option<&str>, max_input_bytes: usize) -> i32 {
    let backend = match parser.map(Backend::from_str).transpose() {
        Ok(backend) => backend.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    let input = match std::fs::read(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", path, e);
            return 2;
        }
    };

    let (rendered, exit_code) = match csr::decode(&input, backend, max_input_bytes) {
        Ok(model) => (serde_json::to_string_pretty(&model), 0),
        Err(e) => {
            warn!(path = %path, error = %e, "input rejected");
            (serde_json::to_string_pretty(&ErrorMessage::invalid_csr()), 1)
        }
    };

    match rendered {
        Ok(json) => {
            println!("{}", json);
            exit_code
        }
        Err(e) => {
            eprintln!("Error: cannot render result: {}", e);
            2
        }
    }
}

fn spawn_signal_handler(shutdown_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl+c");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to listen for SIGTERM")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT"),
            _ = terminate => info!("received SIGTERM"),
        }

        warn!("initiating graceful shutdown...");
        shutdown_token.cancel();
    });
}

/// Dependencies needed to build the HTTP router.
struct RouterDeps {
    api_state: Arc<ApiState>,
    prometheus_handle: PrometheusHandle,
}

fn build_router(endpoints: &EndpointConfig, deps: RouterDeps) -> Router {
    let RouterDeps {
        api_state,
        prometheus_handle,
    } = deps;

    let mut app = Router::new();

    if endpoints.health {
        app = app.route("/health", get(health));
    }

    if endpoints.example_json {
        app = app.route("/example.json", get(example_json));
    }

    if endpoints.metrics {
        app = app.route(
            "/metrics",
            get(move || async move { prometheus_handle.render() }),
        );
    }

    app.merge(api::router(api_state))
        .layer(CorsLayer::permissive())
}

async fn run_tls_server(
    addr: SocketAddr,
    app: Router,
    tls_cert: &str,
    tls_key: &str,
    shutdown_token: CancellationToken,
) {
    let tls_config = match axum_server::tls_rustls::RustlsConfig::from_pem_file(tls_cert, tls_key).await {
        Ok(tls_config) => tls_config,
        Err(e) => {
            error!(error = %e, "failed to load TLS config");
            return;
        }
    };

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_token.cancelled().await;
        info!("shutting down TLS server");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
    });

    if let Err(e) = axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
    {
        error!(error = %e, "server error");
    }
}

async fn run_plain_server(addr: SocketAddr, app: Router, shutdown_token: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %addr, error = %e, "failed to bind");
            return;
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_token.cancelled().await;
        info!("shutting down HTTP server");
    })
    .await
    {
        error!(error = %e, "server error");
    }
}

fn print_config_validation(config: &Config) {
    println!("Validating configuration...");
    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid.");
            if let Some(ref path) = config.config_path {
                println!("Config file: {}", path);
            }
            println!("Host: {}", config.host);
            println!("Port: {}", config.port);
            println!("Log level: {}", config.log_level);
            println!("Max input bytes: {}", config.max_input_bytes);
            println!("TLS: {}", config.has_tls());
            println!("Health: {}", config.endpoints.health);
            println!("Metrics: {}", config.endpoints.metrics);
            println!("Example JSON: {}", config.endpoints.example_json);
        }
        Err(errors) => {
            eprintln!("Configuration validation failed:");
            for err in errors {
                eprintln!("  - {}: {}", err.field, err.message);
            }
            std::process::exit(1);
        }
    }
}
