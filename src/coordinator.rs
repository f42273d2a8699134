use crate::prelude::*;

use crate::decoder::{self, BLOCK_LENGTH, BLOCK_START};
use crate::influx;

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ChannelData {
    Shutdown,
}

/// Drives the fetch -> decode -> publish cycle on a fixed interval. One
/// cycle at a time; the Modbus connection is owned here exclusively.
#[derive(Clone)]
pub struct Coordinator {
    config: ConfigWrapper,
    channels: Channels,
}

impl Coordinator {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let inverter = self.config.inverter();
        let fetcher = ModbusClient::new(
            inverter.host().to_string(),
            inverter.port(),
            inverter.unit_id(),
            inverter.read_timeout(),
        );

        self.run(fetcher).await
    }

    pub fn stop(&self) {
        let _ = self.channels.to_coordinator.send(ChannelData::Shutdown);
    }

    /// The poll loop proper. Shutdown is observed between cycles or while a
    /// fetch blocks, never mid-decode; decode itself cannot block.
    pub async fn run<F>(&self, mut fetcher: F) -> Result<()>
    where
        F: RegisterFetcher + Send,
    {
        let period = self.config.period();
        info!(
            "polling inverter {} every {}s",
            self.config.inverter().host(),
            period
        );

        let mut receiver = self.channels.to_coordinator.subscribe();
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(period));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // a bad cycle is logged and skipped, never fatal
                    if let Err(err) = self.poll_once(&mut fetcher).await {
                        error!("unhandled error during poll cycle: {:?}", err);
                    }
                }
                message = receiver.recv() => {
                    match message {
                        Ok(ChannelData::Shutdown) => {
                            info!("coordinator received shutdown signal");
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(err) => {
                            warn!("coordinator channel closed: {}", err);
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// One fetch/decode/publish cycle. Transport and structural failures are
    /// resolved here by logging and skipping the cycle.
    pub async fn poll_once<F>(&self, fetcher: &mut F) -> Result<()>
    where
        F: RegisterFetcher + Send,
    {
        let block = match fetcher.fetch(BLOCK_START, BLOCK_LENGTH as u16).await {
            Ok(block) => block,
            Err(err) => {
                self.log_connection_error(err);
                return Ok(());
            }
        };

        let sample = match decoder::decode(&block) {
            Ok(sample) => sample,
            Err(err) => {
                error!("discarding register block: {}", err);
                return Ok(());
            }
        };

        trace!("decoded sample: {:?}", sample);

        // send fails when influx is disabled and nothing subscribes
        if self.channels.to_influx.send(influx::ChannelData::Sample(sample)).is_err() {
            debug!("no sample consumers, dropping sample");
        }

        Ok(())
    }

    fn log_connection_error(&self, err: ConnectionError) {
        match err {
            ConnectionError::Refused { addr } => {
                error!("Failed to connect to SolarEdge inverter {}!", addr);
            }
            ConnectionError::Timeout => {
                error!("Timeout during send or receive operation!");
            }
            ConnectionError::SendReceive(err) => {
                error!("Send or receive error: {}", err);
            }
            other => {
                error!("Modbus request failed: {}", other);
            }
        }
    }
}
