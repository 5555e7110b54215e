use anyhow::{Context, Result};
use casino_lobby_engine::{MemoryStore, Snapshot, Sources};
use casino_lobby_server::{
    cms::CmsClient, recommendation::RecommendationClient, Api, DataSource, Lobby, ServerConfig,
    DEFAULT_CMS_URL, DEFAULT_RECOMMENDATION_URL,
};
use clap::Parser;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() -> Result<()> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

    if let Some(endpoint) = endpoint {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| "casino-lobby-server".to_string());
        let rate = std::env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("failed to build OTLP exporter")?;
        let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();
        let tracer = tracer_provider.tracer("casino-lobby-server");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Base URL of the CMS REST API.
    #[arg(long, default_value = DEFAULT_CMS_URL)]
    cms_url: String,

    /// Base URL of the recommendation service.
    #[arg(long, default_value = DEFAULT_RECOMMENDATION_URL)]
    recommendation_url: String,

    /// Serve a YAML or JSON snapshot from memory instead of calling the CMS.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Timeout for each source call made while resolving a section (ms).
    #[arg(long)]
    call_timeout_ms: Option<u64>,

    /// Client timeout for outbound HTTP requests (ms).
    #[arg(long)]
    upstream_timeout_ms: Option<u64>,

    /// HTTP rate limit per IP in requests per second (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// HTTP rate limit burst size (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Max request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,

    /// Redis URL for the layout cache (disabled when omitted).
    #[arg(long)]
    cache_redis_url: Option<String>,

    /// Key prefix for cached layouts.
    #[arg(long)]
    cache_redis_prefix: Option<String>,

    /// Layout cache TTL in seconds (0 disables caching).
    #[arg(long)]
    cache_redis_ttl_seconds: Option<u64>,
}

/// Maps an optional limit: 0 => None (disabled), Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    if let Some(0) = args.call_timeout_ms {
        anyhow::bail!("call_timeout_ms must be > 0 when set");
    }
    if let Some(0) = args.upstream_timeout_ms {
        anyhow::bail!("upstream_timeout_ms must be > 0 when set");
    }
    let data_source = match &args.fixtures {
        Some(path) => DataSource::Fixtures { path: path.clone() },
        None => DataSource::Remote {
            cms_url: args.cms_url.clone(),
            recommendation_url: args.recommendation_url.clone(),
        },
    };

    Ok(ServerConfig {
        data_source,
        call_timeout_ms: args.call_timeout_ms.unwrap_or(defaults.call_timeout_ms),
        upstream_timeout_ms: args
            .upstream_timeout_ms
            .unwrap_or(defaults.upstream_timeout_ms),
        http_rate_limit_per_second: map_optional_limit(
            args.http_rate_limit_per_second,
            defaults.http_rate_limit_per_second,
        ),
        http_rate_limit_burst: map_optional_limit(
            args.http_rate_limit_burst,
            defaults.http_rate_limit_burst,
        ),
        http_body_limit_bytes: map_optional_limit(
            args.http_body_limit_bytes,
            defaults.http_body_limit_bytes,
        ),
        cache_redis_url: args.cache_redis_url.clone(),
        cache_redis_prefix: args
            .cache_redis_prefix
            .clone()
            .or(defaults.cache_redis_prefix),
        cache_redis_ttl_seconds: args
            .cache_redis_ttl_seconds
            .or(defaults.cache_redis_ttl_seconds),
    })
}

fn build_lobby(config: ServerConfig) -> Result<Lobby> {
    match config.data_source.clone() {
        DataSource::Fixtures { path } => {
            let snapshot = Snapshot::load(&path)
                .with_context(|| format!("failed to load fixtures from {}", path.display()))?;
            info!(
                path = %path.display(),
                games = snapshot.games.len(),
                promotions = snapshot.promotions.len(),
                layouts = snapshot.layouts.len(),
                "serving fixtures"
            );
            Ok(Lobby::from_store(config, Arc::new(MemoryStore::new(snapshot))))
        }
        DataSource::Remote {
            cms_url,
            recommendation_url,
        } => {
            let timeout = config.upstream_timeout();
            let cms = Arc::new(
                CmsClient::new(&cms_url, timeout).context("invalid CMS URL")?,
            );
            let recommendations = Arc::new(
                RecommendationClient::new(&recommendation_url, timeout)
                    .context("invalid recommendation service URL")?,
            );
            info!(%cms_url, %recommendation_url, "using remote sources");
            let sources = Sources {
                catalog: cms.clone(),
                promotions: cms.clone(),
                layouts: cms.clone(),
                recommendations,
            };
            Ok(Lobby::new(config, sources, cms))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = build_config(&args)?;
    let lobby = Arc::new(build_lobby(config)?);
    let api = Api::new(lobby);
    let app = api.router();

    // Start server
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_remote_sources() {
        let args = Args::parse_from(["casino-lobby-server"]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.data_source, DataSource::default());
        assert_eq!(config.call_timeout_ms, ServerConfig::default().call_timeout_ms);
        assert_eq!(config.http_rate_limit_per_second, Some(200));
    }

    #[test]
    fn zero_disables_limits() {
        let args = Args::parse_from([
            "casino-lobby-server",
            "--http-rate-limit-per-second",
            "0",
            "--http-body-limit-bytes",
            "0",
            "--fixtures",
            "lobby.yaml",
        ]);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.http_rate_limit_per_second, None);
        assert_eq!(config.http_body_limit_bytes, None);
        assert_eq!(
            config.data_source,
            DataSource::Fixtures {
                path: PathBuf::from("lobby.yaml")
            }
        );
    }

    #[test]
    fn rejects_zero_call_timeout() {
        let args = Args::parse_from(["casino-lobby-server", "--call-timeout-ms", "0"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("call_timeout_ms"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn missing_fixture_file_fails_startup() {
        let config = ServerConfig {
            data_source: DataSource::Fixtures {
                path: PathBuf::from("/nonexistent/lobby.yaml"),
            },
            ..ServerConfig::default()
        };
        assert!(build_lobby(config).is_err());
    }

    #[tokio::test]
    async fn fixtures_are_served_from_memory() {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "games:\n  - id: g1\n    slug: first\n    type: slot").unwrap();
        let config = ServerConfig {
            data_source: DataSource::Fixtures {
                path: file.path().to_path_buf(),
            },
            ..ServerConfig::unlimited()
        };
        let lobby = build_lobby(config).unwrap();
        assert_eq!(lobby.game("first").await.unwrap().id, "g1");
    }
}
