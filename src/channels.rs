use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Channels {
    pub to_influx: broadcast::Sender<crate::influx::ChannelData>,
    pub to_coordinator: broadcast::Sender<crate::coordinator::ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_influx: Self::channel(),
            to_coordinator: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(128).0
    }
}
