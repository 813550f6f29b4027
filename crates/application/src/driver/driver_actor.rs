use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use domain::channel::{ChannelId, ChannelProvider, ChannelWrite, Value};
use domain::driver::ChannelDriver;

/// Actor that runs one driver against the channel bus.
///
/// Polled samples and write feedback are published on the bus; committed
/// writes from the bus's write sink are forwarded to the driver.
pub struct DriverActor {
    driver: Box<dyn ChannelDriver>,
    channels: Arc<dyn ChannelProvider>,
    writes: mpsc::UnboundedReceiver<ChannelWrite>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl DriverActor {
    pub fn new(
        driver: Box<dyn ChannelDriver>,
        channels: Arc<dyn ChannelProvider>,
        writes: mpsc::UnboundedReceiver<ChannelWrite>,
        interval: Duration,
    ) -> Self {
        Self {
            driver,
            channels,
            writes,
            interval,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token that stops the actor when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    fn publish(channels: &dyn ChannelProvider, channel: &ChannelId, value: Value) {
        match channels.channel(channel) {
            Some(c) => c.publish(value),
            None => debug!(channel = %channel, "Sample for undeclared channel dropped"),
        }
    }

    pub async fn run(self) {
        let DriverActor {
            mut driver,
            channels,
            mut writes,
            interval,
            cancel_token,
        } = self;
        let driver_type = driver.driver_type().to_string();

        info!(driver = %driver_type, "Starting DriverActor");
        if let Err(e) = driver.connect().await {
            error!(driver = %driver_type, "Failed initial connection: {}", e);
        }

        info!(driver = %driver_type, interval_ms = interval.as_millis() as u64, "Starting poll loop");
        let mut timer = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!(driver = %driver_type, "Shutdown signal received");
                    break;
                }
                _ = timer.tick() => {
                    if !driver.is_connected() {
                        match driver.connect().await {
                            Ok(_) => info!(driver = %driver_type, "Reconnected"),
                            Err(e) => {
                                warn!(driver = %driver_type, "Failed to reconnect: {}", e);
                                continue;
                            }
                        }
                    }

                    match driver.poll().await {
                        Ok(samples) => {
                            for (channel, value) in samples {
                                Self::publish(channels.as_ref(), &channel, value);
                            }
                        }
                        Err(e) => {
                            error!(driver = %driver_type, "Poll failed: {}", e);
                            let _ = driver.disconnect().await;
                        }
                    }
                }
                Some(write) = writes.recv() => {
                    match driver.write(&write.channel, write.value).await {
                        Ok(Some(feedback)) => {
                            Self::publish(channels.as_ref(), &write.channel, feedback);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(driver = %driver_type, channel = %write.channel, "Write failed: {}", e);
                        }
                    }
                }
            }
        }

        if let Err(e) = driver.disconnect().await {
            warn!(driver = %driver_type, "Disconnect failed: {}", e);
        }
        info!(driver = %driver_type, "DriverActor stopped");
    }
}
