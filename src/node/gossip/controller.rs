use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info};

use super::GossipCommand;
use crate::error::{Result, ShuffleError};
use crate::gossip::{GossipPacket, ShuffleEngine, ShuffleStats};
use crate::node::NodeId;
use crate::transport::Sender;

/// Runs one shuffle engine inside a single task.
///
/// Timer ticks, inbound packets and commands are handled one at a time by
/// the same loop, so the engine needs no lock.
pub struct GossipController<S, R> {
    engine: ShuffleEngine<S, R>,
    /// Period of the active step; `None` means only `GossipCommand::Tick` drives it
    round_interval: Option<Duration>,
}

impl<S, R> std::fmt::Debug for GossipController<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipController")
            .field("engine", &self.engine)
            .field("round_interval", &self.round_interval)
            .finish()
    }
}

impl<S, R> GossipController<S, R>
where
    S: Sender + Send + 'static,
    R: Rng + Send + 'static,
{
    pub fn new(engine: ShuffleEngine<S, R>, round_interval: Option<Duration>) -> Self {
        Self {
            engine,
            round_interval,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.engine.node_id()
    }

    /// Spawn the IO loop and return a handle to it
    pub fn spawn(self, packet_rx: mpsc::UnboundedReceiver<Vec<u8>>) -> GossipHandle {
        let node_id = self.node_id();
        let (command_tx, command_rx) = mpsc::channel(64);
        let task = tokio::spawn(self.start(packet_rx, command_rx));
        GossipHandle {
            node_id,
            command_tx,
            task,
        }
    }

    /// Handle inbound packets, commands and periodic rounds until shut down.
    ///
    /// Returns the engine's final counters.
    pub async fn start(
        mut self,
        mut packet_rx: mpsc::UnboundedReceiver<Vec<u8>>,
        mut command_rx: mpsc::Receiver<GossipCommand>,
    ) -> ShuffleStats {
        let node_id = self.node_id();
        info!(
            "[{}] Starting shuffle loop (interval: {:?}, neighbors: {}/{})",
            node_id,
            self.round_interval,
            self.engine.degree(),
            self.engine.config().cache_size()
        );

        let auto_tick = self.round_interval.is_some();
        let period = self.round_interval.unwrap_or(Duration::from_secs(3600));
        let mut round_timer = time::interval(period);
        round_timer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // the first tick of an interval fires immediately
        round_timer.tick().await;

        loop {
            tokio::select! {
                biased;

                Some(data) = packet_rx.recv() => {
                    if let Err(e) = self.handle_packet(&data) {
                        debug!("[{}] Dropping inbound packet: {}", node_id, e);
                    }
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(GossipCommand::Shutdown) | None => {
                            info!("[{}] Shuffle loop shutting down", node_id);
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                _ = round_timer.tick(), if auto_tick => {
                    self.engine.on_periodic_tick();
                }
            }
        }
        self.engine.stats()
    }

    fn handle_packet(&mut self, data: &[u8]) -> Result<()> {
        let packet = GossipPacket::deserialize(data)?;
        self.engine.on_envelope_received(packet.message);
        Ok(())
    }

    fn handle_command(&mut self, cmd: GossipCommand) {
        match cmd {
            GossipCommand::Tick => self.engine.on_periodic_tick(),
            GossipCommand::GetView { resp_chan } => {
                if resp_chan.send(self.engine.neighbors()).is_err() {
                    error!("[{}] Failed sending oneshot view response", self.node_id());
                }
            }
            GossipCommand::GetStats { resp_chan } => {
                if resp_chan.send(self.engine.stats()).is_err() {
                    error!("[{}] Failed sending oneshot stats response", self.node_id());
                }
            }
            GossipCommand::Shutdown => {}
        }
    }
}

/// Handle to a spawned `GossipController`
#[derive(Debug)]
pub struct GossipHandle {
    node_id: NodeId,
    command_tx: mpsc::Sender<GossipCommand>,
    task: tokio::task::JoinHandle<ShuffleStats>,
}

impl GossipHandle {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    async fn send_command(&self, cmd: GossipCommand) -> Result<()> {
        self.command_tx.send(cmd).await.map_err(|e| {
            ShuffleError::Concurrency(format!("[{}] Controller stopped: {}", self.node_id, e))
        })
    }

    pub async fn tick(&self) -> Result<()> {
        self.send_command(GossipCommand::Tick).await
    }

    pub async fn view(&self) -> Result<Vec<NodeId>> {
        let (resp_chan, rx) = oneshot::channel();
        self.send_command(GossipCommand::GetView { resp_chan }).await?;
        rx.await
            .map_err(|e| ShuffleError::Concurrency(format!("View response dropped: {}", e)))
    }

    pub async fn stats(&self) -> Result<ShuffleStats> {
        let (resp_chan, rx) = oneshot::channel();
        self.send_command(GossipCommand::GetStats { resp_chan }).await?;
        rx.await
            .map_err(|e| ShuffleError::Concurrency(format!("Stats response dropped: {}", e)))
    }

    /// Stop the loop and wait for its final counters
    pub async fn shutdown(self) -> Result<ShuffleStats> {
        self.send_command(GossipCommand::Shutdown).await?;
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::gossip::{GossipMessage, ShuffleConfig};
    use crate::transport::MemoryNetwork;

    fn id(n: u32) -> NodeId {
        NodeId::new(n)
    }

    fn spawn_node(
        network: &std::sync::Arc<MemoryNetwork>,
        node: u32,
        peers: &[u32],
        round_interval: Option<Duration>,
    ) -> GossipHandle {
        let config = ShuffleConfig::new(3, 2).unwrap();
        let mut engine = ShuffleEngine::new(
            id(node),
            config,
            network.transport(id(node)),
            StdRng::seed_from_u64(node as u64),
        );
        for &p in peers {
            engine.add_neighbor(id(p));
        }
        let inbox = network.register(id(node));
        GossipController::new(engine, round_interval).spawn(inbox)
    }

    #[tokio::test]
    async fn test_manual_round_trip() {
        let network = MemoryNetwork::new(0.0);
        let a = spawn_node(&network, 1, &[2], None);
        let b = spawn_node(&network, 2, &[3], None);

        a.tick().await.unwrap();
        // wait until A has completed its round
        let mut stats = a.stats().await.unwrap();
        for _ in 0..100 {
            if stats.replies_received == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            stats = a.stats().await.unwrap();
        }

        assert_eq!(stats.replies_received, 1);
        assert_eq!(a.view().await.unwrap(), vec![id(2), id(3)]);
        assert_eq!(b.view().await.unwrap(), vec![id(3), id(1)]);

        let final_stats = a.shutdown().await.unwrap();
        assert_eq!(final_stats.rounds_started, 1);
        b.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_packet_is_ignored() {
        let network = MemoryNetwork::new(0.0);
        let a = spawn_node(&network, 1, &[2], None);
        network.deliver(id(9), id(1), vec![0xff, 0xff, 0xff]).unwrap();

        // a valid envelope after the junk is still handled
        network
            .transport(id(9))
            .send(id(1), GossipMessage::reject(id(9)))
            .unwrap();

        let stats = a.stats().await.unwrap();
        assert_eq!(stats.rejects_received, 1);
        assert_eq!(a.view().await.unwrap(), vec![id(2), id(9)]);
        a.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_returns_stats() {
        let network = MemoryNetwork::new(0.0);
        let a = spawn_node(&network, 1, &[], Some(Duration::from_millis(5)));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stats = a.shutdown().await.unwrap();
        assert_eq!(stats.rounds_started, 0);
    }
}
