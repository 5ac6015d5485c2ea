use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use clap::Parser;
use prometheus::Registry;
use tracing::info;

use edge_object_gateway::cache::fast::EdgeCache;
use edge_object_gateway::cache::kv::{KvStore, RedisKvStore};
use edge_object_gateway::config::Config;
use edge_object_gateway::constants::{DEFAULT_FAST_CACHE_TTL_SECS, FAST_CACHE_MAX_TOTAL_BYTES};
use edge_object_gateway::metrics::Metrics;
use edge_object_gateway::origin::OriginClient;
use edge_object_gateway::proxy::GatewayProxy;
use edge_object_gateway::server::{GatewayServer, ServerConfig};
use edge_object_gateway::service::ObjectService;

#[derive(Parser, Debug)]
#[command(name = "edge-object-gateway", about = "Edge-resident object gateway")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    edge_object_gateway::logging::init_subscriber()?;

    let yaml = std::fs::read_to_string(&args.config)
        .map_err(|e| format!("reading config file {:?}: {}", args.config, e))?;
    let config = Config::from_yaml_with_env(&yaml)?;
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let (origins, service) = runtime.block_on(bootstrap(&config))?;

    let router = Arc::new(config.build_router()?);
    let proxy = GatewayProxy::new(router, service, origins, &config.cache);
    let server_config = ServerConfig::from_config(&config);

    info!(address = %server_config.address, "starting edge object gateway");
    let server = GatewayServer::new(server_config, proxy)?;
    server.run_forever();
}

/// Build every per-bucket origin client, the (optional) slow-tier KV store,
/// the fast tier, and the metrics registry bound into one [`ObjectService`].
async fn bootstrap(
    config: &Config,
) -> Result<(HashMap<String, Arc<OriginClient>>, Arc<ObjectService>), Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let metrics = Arc::new(Metrics::new(&registry));

    let mut origins = HashMap::new();
    let retry_policy = config.storage.to_retry_policy();
    for bucket in &config.buckets {
        let client = OriginClient::client_from_config(&bucket.s3).await;
        let origin = Arc::new(OriginClient::new(client, bucket.s3.bucket.clone(), retry_policy.clone()));
        origins.insert(bucket.name.clone(), origin);
    }

    let kv: Option<Arc<dyn KvStore>> = if config.redis.url.is_empty() {
        None
    } else {
        Some(Arc::new(RedisKvStore::connect(&config.redis.url).await?))
    };

    let evictions = Arc::new(AtomicU64::new(0));
    let edge = Arc::new(EdgeCache::new(FAST_CACHE_MAX_TOTAL_BYTES, DEFAULT_FAST_CACHE_TTL_SECS, evictions));

    let service = Arc::new(ObjectService::new(edge, kv, config.cache.clone(), Some(metrics)));

    Ok((origins, service))
}
