pub use std::io::Write;

pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::config::{Config, ConfigWrapper};
pub use crate::coordinator::Coordinator;
pub use crate::decoder::{RegisterBlock, Sample};
pub use crate::error::{ConnectionError, DecodeError};
pub use crate::influx::Influx;
pub use crate::modbus::{ModbusClient, RegisterFetcher};
pub use crate::options::Options;
