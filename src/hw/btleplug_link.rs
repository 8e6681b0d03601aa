use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, trace};

use super::link::{Link, Notification, NotificationStream, WriteMode};
use crate::error::InteractionError;
use crate::protocol::{
    DEVICE_NAME_PREFIX, EndpointId, EndpointKind, endpoint_for_uuid, endpoint_metadata,
};
use crate::utils::duration_ms;

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(15);

/// Which advertising peripheral a [`BtleplugLink`] connects to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeviceTarget {
    /// Exact Bluetooth address, or platform peripheral id on macOS.
    Address(String),
    /// First peripheral whose local name starts with this prefix.
    NamePrefix(String),
}

impl DeviceTarget {
    fn matches(&self, peripheral: &Peripheral, properties: &PeripheralProperties) -> bool {
        match self {
            Self::Address(address) => {
                properties.address.to_string().eq_ignore_ascii_case(address)
                    || peripheral.id().to_string().eq_ignore_ascii_case(address)
            }
            Self::NamePrefix(prefix) => properties
                .local_name
                .as_deref()
                .is_some_and(|name| name.starts_with(prefix.as_str())),
        }
    }
}

impl Default for DeviceTarget {
    fn default() -> Self {
        Self::NamePrefix(DEVICE_NAME_PREFIX.to_string())
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(formatter, "address {address}"),
            Self::NamePrefix(prefix) => write!(formatter, "name prefix {prefix:?}"),
        }
    }
}

/// Settings for the real BLE link.
#[derive(Debug, Clone, Builder)]
pub struct BtleplugLinkConfig {
    #[builder(default)]
    target: DeviceTarget,
    #[builder(default = DEFAULT_SCAN_TIMEOUT)]
    scan_timeout: Duration,
}

#[derive(Debug, Clone)]
struct ConnectedPeripheral {
    peripheral: Peripheral,
    characteristics: HashMap<EndpointId, Characteristic>,
}

/// [`Link`] backed by the host Bluetooth adapter through `btleplug`.
#[derive(Debug)]
pub struct BtleplugLink {
    manager: Manager,
    config: BtleplugLinkConfig,
    connected: Mutex<Option<ConnectedPeripheral>>,
}

impl BtleplugLink {
    /// Creates the link; no radio traffic happens until `connect`.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform Bluetooth manager is unavailable.
    pub async fn new(config: BtleplugLinkConfig) -> Result<Self, InteractionError> {
        let manager = Manager::new().await?;
        Ok(Self {
            manager,
            config,
            connected: Mutex::new(None),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ConnectedPeripheral>> {
        self.connected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Result<ConnectedPeripheral, InteractionError> {
        self.lock().clone().ok_or(InteractionError::NotConnected)
    }

    fn handle_for(
        &self,
        endpoint: EndpointId,
    ) -> Result<(Peripheral, Characteristic), InteractionError> {
        let connected = self.current()?;
        let characteristic = connected
            .characteristics
            .get(&endpoint)
            .cloned()
            .ok_or(InteractionError::MissingEndpoint { endpoint })?;
        Ok((connected.peripheral, characteristic))
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<Adapter>, InteractionError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(InteractionError::NoAdapters);
        }
        Ok(adapters)
    }

    /// Scans until the target advertises or the scan timeout elapses.
    #[instrument(skip(self), level = "debug", fields(target = %self.config.target))]
    async fn find_target(&self) -> Result<Peripheral, InteractionError> {
        let adapters = self.adapters().await?;
        for adapter in &adapters {
            adapter.start_scan(ScanFilter::default()).await?;
        }

        let found = timeout(self.config.scan_timeout, self.poll_for_target(&adapters)).await;

        for adapter in &adapters {
            if let Err(error) = adapter.stop_scan().await {
                debug!(?error, "failed to stop adapter scan cleanly");
            }
        }

        match found {
            Ok(peripheral) => peripheral,
            Err(_elapsed) => Err(InteractionError::DeviceNotFound {
                target: self.config.target.to_string(),
                timeout_ms: duration_ms(self.config.scan_timeout),
            }),
        }
    }

    async fn poll_for_target(&self, adapters: &[Adapter]) -> Result<Peripheral, InteractionError> {
        loop {
            for adapter in adapters {
                for peripheral in adapter.peripherals().await? {
                    let Some(properties) = peripheral.properties().await? else {
                        continue;
                    };
                    if self.config.target.matches(&peripheral, &properties) {
                        info!(
                            address = %properties.address,
                            local_name = properties.local_name.as_deref().unwrap_or("-"),
                            rssi = ?properties.rssi,
                            "found iPIXEL display"
                        );
                        return Ok(peripheral);
                    }
                }
            }
            sleep(SCAN_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Link for BtleplugLink {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&self) -> Result<(), InteractionError> {
        let peripheral = self.find_target().await?;
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        let characteristics = characteristics_by_endpoint(&peripheral);
        for endpoint in [
            EndpointId::WriteCharacteristic,
            EndpointId::NotifyCharacteristic,
        ] {
            if !characteristics.contains_key(&endpoint) {
                if let Err(error) = peripheral.disconnect().await {
                    debug!(?error, "failed to disconnect after endpoint validation error");
                }
                return Err(InteractionError::MissingEndpoint { endpoint });
            }
        }

        *self.lock() = Some(ConnectedPeripheral {
            peripheral,
            characteristics,
        });
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), InteractionError> {
        let Some(connected) = self.lock().take() else {
            return Ok(());
        };
        if connected.peripheral.is_connected().await? {
            connected.peripheral.disconnect().await?;
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let Ok(connected) = self.current() else {
            return false;
        };
        connected.peripheral.is_connected().await.unwrap_or(false)
    }

    #[instrument(skip(self, payload), level = "trace", fields(%endpoint, %mode, payload_len = payload.len()))]
    async fn write(
        &self,
        endpoint: EndpointId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), InteractionError> {
        let (peripheral, characteristic) = self.handle_for(endpoint)?;
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        peripheral.write(&characteristic, payload, write_type).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn subscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let (peripheral, characteristic) = self.handle_for(endpoint)?;
        peripheral.subscribe(&characteristic).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace", fields(%endpoint))]
    async fn unsubscribe(&self, endpoint: EndpointId) -> Result<(), InteractionError> {
        let (peripheral, characteristic) = self.handle_for(endpoint)?;
        peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationStream, InteractionError> {
        let connected = self.current()?;
        let stream = connected
            .peripheral
            .notifications()
            .await?
            .filter_map(|notification| {
                let endpoint = endpoint_for_uuid(&notification.uuid.to_string());
                if endpoint.is_none() {
                    trace!(uuid = %notification.uuid, "notification from unknown characteristic");
                }
                endpoint.map(|endpoint| Notification {
                    endpoint,
                    value: notification.value,
                })
            });
        Ok(Box::pin(stream))
    }
}

fn characteristics_by_endpoint(peripheral: &Peripheral) -> HashMap<EndpointId, Characteristic> {
    peripheral
        .services()
        .into_iter()
        .flat_map(|service| service.characteristics.into_iter())
        .filter_map(|characteristic| {
            let endpoint = endpoint_for_uuid(&characteristic.uuid.to_string())?;
            (endpoint_metadata(endpoint).kind() == EndpointKind::Characteristic)
                .then_some((endpoint, characteristic))
        })
        .collect()
}
