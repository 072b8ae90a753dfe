use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::broker::{Broker, SharedBroker};
use crate::config::Settings;
use crate::transport::connection::handle_connection;
use crate::utils::Result;

/// TCP front end of the broker.
pub struct Server {
    listener: TcpListener,
    broker: SharedBroker,
    settings: Settings,
    /// One permit per open connection, taken at accept time and held until
    /// the connection task ends.
    connections: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener described by `settings` with a fresh broker.
    pub async fn bind(settings: Settings) -> Result<Self> {
        Self::bind_with_broker(settings, Broker::shared()).await
    }

    pub async fn bind_with_broker(settings: Settings, broker: SharedBroker) -> Result<Self> {
        let listener = TcpListener::bind(settings.server.addr()).await?;
        let limit = settings.broker.max_connections.min(Semaphore::MAX_PERMITS);
        Ok(Self {
            listener,
            broker,
            settings,
            connections: Arc::new(Semaphore::new(limit)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn broker(&self) -> SharedBroker {
        self.broker.clone()
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("broker listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept(stream, peer),
                    // accept errors (e.g. fd exhaustion) are per-connection
                    Err(e) => error!("accept failed: {e}"),
                },
            }
        }
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        // counted here: the spawned task registers its client only later
        let Ok(permit) = self.connections.clone().try_acquire_owned() else {
            let max = self.settings.broker.max_connections;
            warn!("refusing {peer}: {max} connections already open");
            drop(stream);
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("could not set TCP_NODELAY for {peer}: {e}");
        }

        let broker = self.broker.clone();
        let capacity = self.settings.broker.outbound_queue_capacity.max(1);
        tokio::spawn(async move {
            handle_connection(stream, peer, broker, capacity).await;
            drop(permit);
        });
    }
}
