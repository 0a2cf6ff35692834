// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembly of a complete default configuration.

use std::time::Duration;

use serde::Serialize;
use slog::{info, o, warn, Logger};

use crate::boot::BootOrderBuilder;
use crate::config::{
    AppMode, AutoStopAction, DeviceDescriptor, DeviceKind, Firmware,
    UsbControllerSettings, VmConfiguration,
};
use crate::devices::{AddDeviceError, DefaultDeviceFactory};
use crate::features::GuestFeatureQuery;
use crate::guest::{GuestIdentity, OsFamily, OsVersion};
use crate::host::{
    CapabilityView, HostCapabilitySnapshot, HostOsFamily, VtxMode,
};
use crate::netquery::{VirtualNetworkQuery, DEFAULT_NETWORK_QUERY_TIMEOUT};
use crate::policy::default_device_set;
use crate::sizing::{
    default_ram_size, default_video_ram_size, default_video_ram_size_hostless,
};

/// What to synthesize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub os_version: OsVersion,
    /// Whether to populate default devices and the boot order.
    pub create_devices: bool,
    pub firmware: Firmware,
}

impl SynthesisRequest {
    pub fn new(os_version: OsVersion) -> Self {
        Self { os_version, create_devices: true, firmware: Firmware::Bios }
    }
}

/// A device that could not be added during synthesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceFailure {
    pub kind: DeviceKind,
    #[serde(serialize_with = "display")]
    pub error: AddDeviceError,
}

fn display<S: serde::Serializer>(
    e: &AddDeviceError,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(e)
}

/// The outcome of synthesis: the configuration, plus every device addition
/// that failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Synthesis {
    pub config: VmConfiguration,
    pub added: Vec<DeviceDescriptor>,
    pub failures: Vec<DeviceFailure>,
}

/// Builds default VM configurations for one product instance.
pub struct ConfigurationSynthesizer<'a> {
    caps: CapabilityView<'a>,
    features: &'a dyn GuestFeatureQuery,
    networks: Option<(&'a dyn VirtualNetworkQuery, Duration)>,
    app_mode: AppMode,
    log: Logger,
}

impl<'a> ConfigurationSynthesizer<'a> {
    pub fn new(
        host: Option<&'a HostCapabilitySnapshot>,
        features: &'a dyn GuestFeatureQuery,
        app_mode: AppMode,
        log: &Logger,
    ) -> Self {
        Self {
            caps: CapabilityView::new(host),
            features,
            networks: None,
            app_mode,
            log: log.new(o!("component" => "synthesizer")),
        }
    }

    pub fn with_network_query(
        mut self,
        networks: &'a dyn VirtualNetworkQuery,
    ) -> Self {
        self.networks = Some((networks, DEFAULT_NETWORK_QUERY_TIMEOUT));
        self
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        if let Some((_, t)) = self.networks.as_mut() {
            *t = timeout;
        }
        self
    }

    /// A device factory sharing this synthesizer's host, features and mode,
    /// for adding devices to an existing configuration.
    pub fn device_factory(&self) -> DefaultDeviceFactory<'a> {
        let factory = DefaultDeviceFactory::new(
            self.caps,
            self.features,
            self.app_mode,
            &self.log,
        );
        match self.networks {
            Some((q, timeout)) => factory.with_network_query(q, timeout),
            None => factory,
        }
    }

    fn is_server(&self) -> bool {
        self.app_mode == AppMode::Server
    }

    pub async fn create_default_config(
        &self,
        req: &SynthesisRequest,
    ) -> Synthesis {
        let guest = GuestIdentity::new(req.os_version);
        let mut config = VmConfiguration::new(guest);
        let log = self.log.new(o!(
            "vm_id" => config.id.to_string(),
            "os_version" => req.os_version.to_string(),
        ));

        self.apply_runtime_defaults(&mut config);
        config.startup.firmware = req.firmware;
        self.apply_cpu_defaults(&mut config);
        self.apply_video_defaults(&mut config);
        config.memory.ram_mb =
            default_ram_size(req.os_version, self.caps.ram_mb());
        config.usb_controller =
            UsbControllerSettings::defaults_for(req.os_version);

        let mut added = Vec::new();
        let mut failures = Vec::new();
        if req.create_devices {
            let factory = self.device_factory();
            for kind in default_device_set(req.os_version, self.app_mode) {
                match factory.add_default_device(&mut config, kind).await {
                    Ok(dev) => added.push(dev),
                    Err(error) => {
                        warn!(log, "failed to add default device";
                            "kind" => %kind, "error" => %error);
                        failures.push(DeviceFailure { kind, error });
                    }
                }
            }
            let firmware = config.startup.firmware;
            config.startup.boot_order =
                BootOrderBuilder::new(guest, firmware, &config.devices).build();
        }

        info!(log, "synthesized default configuration";
            "cpus" => config.cpu.count,
            "ram_mb" => config.memory.ram_mb,
            "video_mb" => config.video.memory_mb,
            "devices" => added.len(),
            "failures" => failures.len());

        Synthesis { config, added, failures }
    }

    fn apply_runtime_defaults(&self, cfg: &mut VmConfiguration) {
        cfg.runtime.disable_speaker = self.is_server();
        if self.is_server() {
            cfg.shutdown.auto_stop = AutoStopAction::Shutdown;
        }
    }

    fn apply_cpu_defaults(&self, cfg: &mut VmConfiguration) {
        cfg.cpu.count =
            default_cpu_count(cfg.guest.version, self.caps, self.app_mode);
    }

    fn apply_video_defaults(&self, cfg: &mut VmConfiguration) {
        let version = cfg.guest.version;
        let mut enable_3d = true;

        let video_mb = match self.caps.host_os() {
            Some(host_os) => {
                let legacy_windows =
                    version.is_windows() && version < OsVersion::WIN_2K;
                if matches!(host_os, HostOsFamily::Mac | HostOsFamily::Linux)
                    && (self.is_server() || legacy_windows)
                {
                    enable_3d = false;
                }
                let host_ram = self.caps.ram_mb();
                default_video_ram_size(version, host_os, host_ram, enable_3d)
            }
            None => default_video_ram_size_hostless(version),
        };

        cfg.video.enable_3d = enable_3d;
        cfg.video.memory_mb = video_mb;
        cfg.video.hi_res_drawing =
            version >= OsVersion::WIN_7 && version < OsVersion::WIN_OTHER;
    }
}

/// Returns true if `version` can make use of more than one virtual CPU.
pub fn supports_multiple_cpus(version: OsVersion) -> bool {
    let legacy_windows =
        version >= OsVersion::WIN_311 && version < OsVersion::WIN_2K;
    !(legacy_windows
        || version == OsVersion::LIN_KRNL_24
        || version.is_valid_for(OsFamily::Os2)
        || version.is_valid_for(OsFamily::MsDos)
        || version.is_valid_for(OsFamily::Solaris))
}

/// Default virtual CPU count. Two CPUs are given only to capable guests in
/// server mode on a host with at least four CPUs and hardware
/// virtualization.
pub fn default_cpu_count(
    version: OsVersion,
    caps: CapabilityView<'_>,
    app_mode: AppMode,
) -> u32 {
    let eligible = caps.is_present()
        && supports_multiple_cpus(version)
        && app_mode == AppMode::Server
        && caps.cpu_count() >= 4
        && caps.vtx_mode() != VtxMode::None;
    if eligible {
        2
    } else {
        1
    }
}
