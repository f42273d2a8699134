use crate::prelude::*;

use rinfluxdb::line_protocol::{r#async::Client, LineBuilder};

static MEASUREMENT: &str = "SolarEdge";

#[derive(PartialEq, Clone, Debug)]
pub enum ChannelData {
    Sample(Sample),
    Shutdown,
}

#[derive(Clone)]
pub struct Influx {
    config: ConfigWrapper,
    channels: Channels,
}

impl Influx {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.influx().enabled() {
            info!("influx disabled, skipping");
            return Ok(());
        }

        info!("initializing influx at {}", self.config.influx().url());

        let client = {
            let config = self.config.influx();
            let url = url::Url::parse(&config.url())?;
            let credentials = match (config.username(), config.password()) {
                (Some(u), Some(p)) => Some((u.clone(), p.clone())),
                _ => None,
            };

            Client::new(url, credentials)?
        };

        // Spawn the sender task instead of awaiting it
        let self_clone = self.clone();
        tokio::spawn(async move {
            if let Err(e) = self_clone.sender(client).await {
                error!("InfluxDB sender task failed: {}", e);
            }
        });

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_influx.send(ChannelData::Shutdown);
    }

    async fn sender(&self, client: Client) -> Result<()> {
        use ChannelData::*;

        let inverter_tag = self.config.inverter().unit_id().to_string();
        let mut receiver = self.channels.to_influx.subscribe();
        info!("InfluxDB sender started");

        loop {
            match receiver.recv().await {
                Ok(Shutdown) => {
                    info!("InfluxDB sender received shutdown signal");
                    break;
                }
                Ok(Sample(sample)) => {
                    let mut line = LineBuilder::new(MEASUREMENT)
                        .insert_tag("inverter", inverter_tag.as_str())
                        .set_timestamp(sample.time);

                    let mut field_count = 0;
                    for (name, value) in &sample.fields {
                        if let Some(value) = value {
                            line = line.insert_field(*name, *value);
                            field_count += 1;
                        }
                    }

                    // a line with no fields is not valid line protocol
                    if field_count == 0 {
                        debug!("sample has no implemented fields, skipping write");
                        continue;
                    }

                    let points = [line.build()];
                    debug!("writing to influx: {:?}", points);

                    // failed writes drop the sample; the next poll cycle
                    // produces a fresh one anyway
                    if let Err(err) = client.send(&self.database(), &points).await {
                        error!("failed to write to InfluxDB: {:?}", err);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("InfluxDB sender lagged, {} samples dropped", n);
                }
                Err(e) => {
                    error!("Error receiving from InfluxDB channel: {}", e);
                    break;
                }
            }
        }

        info!("InfluxDB sender loop exiting");

        Ok(())
    }

    fn database(&self) -> String {
        self.config.influx().database().to_string()
    }
}
