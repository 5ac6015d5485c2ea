//! Pingora server bootstrap: binds the gateway proxy service to a TCP
//! listener and runs the Pingora event loop.

use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use pingora_proxy::http_proxy_service;

use crate::config::Config;
use crate::proxy::GatewayProxy;

/// Listener address and worker-thread count the Pingora server runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub threads: usize,
}

impl ServerConfig {
    pub fn new(address: String) -> Self {
        Self { address, threads: crate::constants::DEFAULT_THREADS }
    }

    pub fn from_config(config: &Config) -> Self {
        let address = format!("{}:{}", config.server.address, config.server.port);
        Self { address, threads: crate::constants::DEFAULT_THREADS }
    }
}

/// Wraps a configured Pingora [`Server`] with the gateway's proxy service
/// already registered and bound.
pub struct GatewayServer {
    server: Server,
}

impl GatewayServer {
    pub fn new(server_config: ServerConfig, proxy: GatewayProxy) -> Result<Self, Box<dyn std::error::Error>> {
        let mut server = Server::new(Some(Opt::default()))?;
        server.bootstrap();

        let mut service = http_proxy_service(&server.configuration, proxy);
        service.threads = Some(server_config.threads);
        service.add_tcp(&server_config.address);
        server.add_service(service);

        Ok(Self { server })
    }

    /// Run the Pingora event loop. Never returns under normal operation.
    pub fn run_forever(self) -> ! {
        self.server.run_forever()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_new_uses_default_threads() {
        let config = ServerConfig::new("127.0.0.1:8080".to_string());
        assert_eq!(config.address, "127.0.0.1:8080");
        assert_eq!(config.threads, crate::constants::DEFAULT_THREADS);
    }

    #[test]
    fn server_config_from_config_combines_address_and_port() {
        let yaml = r#"
server:
  address: "0.0.0.0"
  port: 9090
redis:
  url: "redis://127.0.0.1:6379"
buckets: []
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let server_config = ServerConfig::from_config(&config);
        assert_eq!(server_config.address, "0.0.0.0:9090");
    }
}
