use crate::error::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const REDIS_PORT: u16 = 6379;

/// A single throwaway Redis server.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
}

impl RedisServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("redis", "8.6.0")
            .with_exposed_port(REDIS_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;
        Ok(Self { container })
    }

    pub async fn host(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();

        Ok(match host.as_str() {
            "localhost" => String::from("127.0.0.1"),
            _ => host,
        })
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(REDIS_PORT).await?)
    }

    /// `redis://host:port` for this server.
    pub async fn url(&self) -> Result<String> {
        Ok(format!("redis://{}:{}", self.host().await?, self.port().await?))
    }

    /// Opens a fresh multiplexed connection.
    pub async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let client = redis::Client::open(self.url().await?.as_str())?;
        Ok(client.get_multiplexed_async_connection().await?)
    }

    /// Stops the server while keeping the container handle alive.
    pub async fn stop(&self) -> Result<()> {
        Ok(self.container.stop().await?)
    }

    /// Returns the underlying container reference.
    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
