// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host capability data and the read-only view used during synthesis.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::InterfaceType;
use crate::guest::OsVersion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostOsFamily {
    Mac,
    Linux,
    Windows,
    Other,
}

/// Hardware virtualization exposed by the host CPU.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum VtxMode {
    #[default]
    None,
    Vtx,
    Svm,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum HostFeature {
    PlainDiskAllowed,
    UsbPrinterSupport,
}

/// A physical device on the host that a virtual device can be bound to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDevice {
    pub id: String,
    pub name: String,
}

/// Maximum device count per storage bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceLimits {
    #[serde(default = "InterfaceLimits::default_ide")]
    pub ide: u32,
    #[serde(default = "InterfaceLimits::default_sata")]
    pub sata: u32,
    #[serde(default = "InterfaceLimits::default_scsi")]
    pub scsi: u32,
}

impl InterfaceLimits {
    const fn default_ide() -> u32 {
        4
    }

    const fn default_sata() -> u32 {
        6
    }

    const fn default_scsi() -> u32 {
        15
    }

    pub fn capacity(&self, iface: InterfaceType) -> u32 {
        match iface {
            InterfaceType::Ide => self.ide,
            InterfaceType::Sata => self.sata,
            InterfaceType::Scsi => self.scsi,
        }
    }
}

impl Default for InterfaceLimits {
    fn default() -> Self {
        Self {
            ide: Self::default_ide(),
            sata: Self::default_sata(),
            scsi: Self::default_scsi(),
        }
    }
}

/// A floppy image the host provides for unattended installation of a guest
/// version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnattendedFloppy {
    pub os_version: OsVersion,
    pub path: String,
}

/// Host facts gathered by the caller before synthesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostCapabilitySnapshot {
    pub cpus: u32,
    #[serde(default)]
    pub vtx: VtxMode,
    pub ram_mb: u32,
    pub os: HostOsFamily,
    #[serde(default)]
    pub features: BTreeSet<HostFeature>,
    #[serde(default)]
    pub interfaces: InterfaceLimits,
    #[serde(default)]
    pub floppy_disks: Vec<HostDevice>,
    #[serde(default)]
    pub optical_disks: Vec<HostDevice>,
    #[serde(default)]
    pub serial_ports: Vec<HostDevice>,
    #[serde(default)]
    pub parallel_ports: Vec<HostDevice>,
    #[serde(default)]
    pub printers: Vec<HostDevice>,
    #[serde(default)]
    pub sound_outputs: Vec<HostDevice>,
    #[serde(default)]
    pub sound_mixers: Vec<HostDevice>,
    #[serde(default)]
    pub network_adapters: Vec<HostDevice>,
    #[serde(default)]
    pub unattended_floppies: Vec<UnattendedFloppy>,
}

impl HostCapabilitySnapshot {
    /// A host with the given resources and no devices or features.
    pub fn new(cpus: u32, vtx: VtxMode, ram_mb: u32, os: HostOsFamily) -> Self {
        Self {
            cpus,
            vtx,
            ram_mb,
            os,
            features: BTreeSet::new(),
            interfaces: InterfaceLimits::default(),
            floppy_disks: Vec::new(),
            optical_disks: Vec::new(),
            serial_ports: Vec::new(),
            parallel_ports: Vec::new(),
            printers: Vec::new(),
            sound_outputs: Vec::new(),
            sound_mixers: Vec::new(),
            network_adapters: Vec::new(),
            unattended_floppies: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostDeviceClass {
    Floppy,
    Optical,
    Serial,
    Parallel,
    Printer,
    SoundOutput,
    SoundMixer,
    Network,
}

/// Read-only access to an optional [`HostCapabilitySnapshot`]. Every query
/// has a fixed answer when no snapshot is available.
#[derive(Clone, Copy, Debug, Default)]
pub struct CapabilityView<'a> {
    snapshot: Option<&'a HostCapabilitySnapshot>,
}

impl<'a> CapabilityView<'a> {
    pub const FALLBACK_CPU_COUNT: u32 = 1;
    pub const FALLBACK_RAM_MB: u32 = 512;

    pub fn new(snapshot: Option<&'a HostCapabilitySnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn is_present(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn cpu_count(&self) -> u32 {
        self.snapshot.map_or(Self::FALLBACK_CPU_COUNT, |s| s.cpus)
    }

    pub fn vtx_mode(&self) -> VtxMode {
        self.snapshot.map(|s| s.vtx).unwrap_or_default()
    }

    pub fn ram_mb(&self) -> u32 {
        self.snapshot.map_or(Self::FALLBACK_RAM_MB, |s| s.ram_mb)
    }

    pub fn host_os(&self) -> Option<HostOsFamily> {
        self.snapshot.map(|s| s.os)
    }

    pub fn max_devices(&self, iface: InterfaceType) -> u32 {
        self.snapshot
            .map(|s| s.interfaces)
            .unwrap_or_default()
            .capacity(iface)
    }

    pub fn has_feature(&self, feature: HostFeature) -> bool {
        self.snapshot.is_some_and(|s| s.features.contains(&feature))
    }

    pub fn devices(&self, class: HostDeviceClass) -> &'a [HostDevice] {
        let Some(s) = self.snapshot else {
            return &[];
        };
        match class {
            HostDeviceClass::Floppy => &s.floppy_disks,
            HostDeviceClass::Optical => &s.optical_disks,
            HostDeviceClass::Serial => &s.serial_ports,
            HostDeviceClass::Parallel => &s.parallel_ports,
            HostDeviceClass::Printer => &s.printers,
            HostDeviceClass::SoundOutput => &s.sound_outputs,
            HostDeviceClass::SoundMixer => &s.sound_mixers,
            HostDeviceClass::Network => &s.network_adapters,
        }
    }

    pub fn first_device(
        &self,
        class: HostDeviceClass,
    ) -> Option<&'a HostDevice> {
        self.devices(class).first()
    }

    /// Path of the host's unattended-install floppy for `version`, if any.
    pub fn unattended_floppy(&self, version: OsVersion) -> Option<&'a str> {
        self.snapshot?
            .unattended_floppies
            .iter()
            .find(|f| f.os_version == version)
            .map(|f| f.path.as_str())
    }
}
