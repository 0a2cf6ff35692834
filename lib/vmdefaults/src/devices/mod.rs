// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builders for default devices.
//!
//! [`DefaultDeviceFactory::add_default_device`] builds one device of the
//! requested kind, inserts it into the configuration and returns a copy of
//! what was inserted. A failed addition leaves the configuration untouched.

use std::time::Duration;

use slog::{debug, o, Logger};
use thiserror::Error;

use crate::config::{AppMode, DeviceDescriptor, DeviceKind, VmConfiguration};
use crate::features::GuestFeatureQuery;
use crate::guest::OsVersion;
use crate::host::CapabilityView;
use crate::netquery::{VirtualNetworkQuery, DEFAULT_NETWORK_QUERY_TIMEOUT};

mod floppy;
mod network;
mod ports;
mod sound;
mod storage;
mod usb;

pub use network::generate_mac_address;
pub use ports::{MAX_PARALLEL_COUNT, MAX_USB_PRINTER_COUNT};

/// Reasons a single default device could not be added.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddDeviceError {
    #[error("no free storage slot for {0}")]
    NoFreeSlot(DeviceKind),

    #[error("no default device of kind {0}")]
    Unsupported(DeviceKind),

    #[error("host has no unattended install floppy for {0}")]
    MissingUnattendedFloppy(OsVersion),

    #[error("all USB and LPT printer ports are in use")]
    PrinterPortsExhausted,
}

/// Smallest index not used by `used`.
pub(crate) fn unused_index(mut used: Vec<u32>) -> u32 {
    used.sort_unstable();
    used.dedup();
    used.iter()
        .enumerate()
        .find(|(i, idx)| *i as u32 != **idx)
        .map_or(used.len() as u32, |(i, _)| i as u32)
}

/// Image file name for the device at `index`: `stem.ext` for index 0,
/// then `stem2.ext`, `stem3.ext` and so on.
pub(crate) fn image_name(stem: &str, ext: &str, index: u32) -> String {
    if index == 0 {
        format!("{stem}.{ext}")
    } else {
        format!("{stem}{}.{ext}", index + 1)
    }
}

/// Builds default devices against a host and guest feature source.
pub struct DefaultDeviceFactory<'a> {
    caps: CapabilityView<'a>,
    features: &'a dyn GuestFeatureQuery,
    networks: Option<&'a dyn VirtualNetworkQuery>,
    network_timeout: Duration,
    app_mode: AppMode,
    log: Logger,
}

impl<'a> DefaultDeviceFactory<'a> {
    pub fn new(
        caps: CapabilityView<'a>,
        features: &'a dyn GuestFeatureQuery,
        app_mode: AppMode,
        log: &Logger,
    ) -> Self {
        Self {
            caps,
            features,
            networks: None,
            network_timeout: DEFAULT_NETWORK_QUERY_TIMEOUT,
            app_mode,
            log: log.new(o!("component" => "device-factory")),
        }
    }

    /// Lets bridged network adapters look up a default virtual network.
    pub fn with_network_query(
        mut self,
        networks: &'a dyn VirtualNetworkQuery,
        timeout: Duration,
    ) -> Self {
        self.networks = Some(networks);
        self.network_timeout = timeout;
        self
    }

    fn is_server(&self) -> bool {
        self.app_mode == AppMode::Server
    }

    /// Adds one default device of `kind` to `cfg`.
    pub async fn add_default_device(
        &self,
        cfg: &mut VmConfiguration,
        kind: DeviceKind,
    ) -> Result<DeviceDescriptor, AddDeviceError> {
        let device = match kind {
            DeviceKind::Floppy => self.floppy(cfg)?,
            DeviceKind::OpticalDisk => self.optical_disk(cfg)?,
            DeviceKind::HardDisk | DeviceKind::AttachedBackupDisk => {
                self.hard_disk(cfg, kind)?
            }
            DeviceKind::NetworkAdapter => self.network_adapter(cfg).await,
            DeviceKind::SerialPort => self.serial_port(cfg),
            DeviceKind::ParallelPort | DeviceKind::Printer => {
                self.parallel_port(cfg)?
            }
            DeviceKind::SoundDevice => self.sound_device(cfg),
            DeviceKind::UsbDevice => self.usb_device(cfg),
            DeviceKind::GenericScsi | DeviceKind::GenericPci => {
                return Err(AddDeviceError::Unsupported(kind));
            }
        };

        debug!(self.log, "added default device";
            "kind" => %kind,
            "index" => device.common().index,
            "name" => &device.common().system_name);
        cfg.devices.insert(device.clone());
        Ok(device)
    }
}
