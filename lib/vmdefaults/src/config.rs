// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The virtual machine configuration produced by synthesis.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::guest::{GuestIdentity, OsFamily, OsVersion};

/// Whether the product instance runs as a headless server or a desktop
/// client.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AppMode {
    #[default]
    Desktop,
    Server,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Firmware {
    #[default]
    Bios,
    Efi,
}

/// A storage bus a disk or optical drive attaches to.
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
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InterfaceType {
    Ide,
    Sata,
    Scsi,
}

impl InterfaceType {
    /// Position of this bus in the order Windows probes for a boot disk.
    pub const fn windows_boot_preference(self) -> u8 {
        match self {
            Self::Ide => 0,
            Self::Sata => 1,
            Self::Scsi => 2,
        }
    }
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
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    Floppy,
    OpticalDisk,
    HardDisk,
    /// A hard disk backed by a backup image of another disk.
    AttachedBackupDisk,
    NetworkAdapter,
    SerialPort,
    ParallelPort,
    /// A parallel port bound to a printer. Shares index space with
    /// [`Self::ParallelPort`].
    Printer,
    SoundDevice,
    UsbDevice,
    GenericScsi,
    GenericPci,
}

/// Fields shared by every device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceCommon {
    pub index: u32,
    pub enabled: bool,
    pub connected: bool,
    pub friendly_name: String,
    pub system_name: String,
}

impl DeviceCommon {
    /// An enabled device at `index` with both names set to `name`.
    pub fn new(index: u32, connected: bool, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            index,
            enabled: true,
            connected,
            friendly_name: name.clone(),
            system_name: name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScsiSubType {
    LsiSpi,
    LsiSas,
    VirtioScsi,
}

/// Where a storage device sits on its bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageAttachment {
    pub interface: InterfaceType,
    pub stack_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<ScsiSubType>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiskImageType {
    Expanding,
    Plain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HardDisk {
    #[serde(flatten)]
    pub common: DeviceCommon,
    #[serde(flatten)]
    pub attachment: StorageAttachment,
    pub image_type: DiskImageType,
    pub size_mb: u32,
    pub split: bool,
    /// Set for disks backed by a backup image.
    pub backup: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OpticalDisk {
    #[serde(flatten)]
    pub common: DeviceCommon,
    #[serde(flatten)]
    pub attachment: StorageAttachment,
    pub emulation: OpticalEmulation,
    pub remote: bool,
    pub passthrough: bool,
}

/// Backing for an optical drive: an image file or a host drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpticalEmulation {
    Image,
    Real,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloppyEmulation {
    Image,
    Real,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FloppyDisk {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub emulation: FloppyEmulation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkMode {
    Shared,
    Bridged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NicAdapterType {
    Rtl,
    E1000,
    Virtio,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkAdapter {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub mode: NetworkMode,
    pub adapter_type: NicAdapterType,
    pub mac_address: String,
    pub static_address: bool,
    pub bound_adapter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortEmulation {
    OutputFile,
    Real,
    Printer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SocketMode {
    Server,
    Client,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerialPort {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub emulation: PortEmulation,
    pub socket_mode: SocketMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrinterInterface {
    Lpt,
    Usb,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParallelPort {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub emulation: PortEmulation,
    pub printer_interface: PrinterInterface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundEmulation {
    Ac97,
    Sb16,
}

/// A host audio endpoint a sound device is routed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoundRoute {
    pub friendly_name: String,
    pub system_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoundDevice {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub emulation: SoundEmulation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<SoundRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixer: Option<SoundRoute>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UsbDevice {
    #[serde(flatten)]
    pub common: DeviceCommon,
    pub autoconnect_primary_os: bool,
}

/// A pass-through SCSI device. Never created by default, but occupies a
/// SCSI slot when present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenericScsiDevice {
    #[serde(flatten)]
    pub common: DeviceCommon,
    #[serde(flatten)]
    pub attachment: StorageAttachment,
}

/// Access to the fields every device carries.
pub trait Device {
    fn common(&self) -> &DeviceCommon;

    fn index(&self) -> u32 {
        self.common().index
    }
}

macro_rules! impl_device {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Device for $ty {
                fn common(&self) -> &DeviceCommon {
                    &self.common
                }
            }
        )*
    };
}

impl_device!(
    HardDisk,
    OpticalDisk,
    FloppyDisk,
    NetworkAdapter,
    SerialPort,
    ParallelPort,
    SoundDevice,
    UsbDevice,
    GenericScsiDevice,
);

/// A device created by the default device factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeviceDescriptor {
    Floppy(FloppyDisk),
    OpticalDisk(OpticalDisk),
    HardDisk(HardDisk),
    NetworkAdapter(NetworkAdapter),
    SerialPort(SerialPort),
    ParallelPort(ParallelPort),
    SoundDevice(SoundDevice),
    UsbDevice(UsbDevice),
}

impl DeviceDescriptor {
    pub fn common(&self) -> &DeviceCommon {
        match self {
            Self::Floppy(d) => d.common(),
            Self::OpticalDisk(d) => d.common(),
            Self::HardDisk(d) => d.common(),
            Self::NetworkAdapter(d) => d.common(),
            Self::SerialPort(d) => d.common(),
            Self::ParallelPort(d) => d.common(),
            Self::SoundDevice(d) => d.common(),
            Self::UsbDevice(d) => d.common(),
        }
    }

    /// The storage placement, for disk and optical devices.
    pub fn attachment(&self) -> Option<&StorageAttachment> {
        match self {
            Self::OpticalDisk(d) => Some(&d.attachment),
            Self::HardDisk(d) => Some(&d.attachment),
            _ => None,
        }
    }
}

/// Every device in a configuration, one list per kind, each sorted by
/// index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceList {
    pub floppy_disks: Vec<FloppyDisk>,
    pub optical_disks: Vec<OpticalDisk>,
    pub hard_disks: Vec<HardDisk>,
    pub network_adapters: Vec<NetworkAdapter>,
    pub serial_ports: Vec<SerialPort>,
    pub parallel_ports: Vec<ParallelPort>,
    pub sound_devices: Vec<SoundDevice>,
    pub usb_devices: Vec<UsbDevice>,
    pub generic_scsi_devices: Vec<GenericScsiDevice>,
}

impl DeviceList {
    pub fn is_empty(&self) -> bool {
        self.floppy_disks.is_empty()
            && self.optical_disks.is_empty()
            && self.hard_disks.is_empty()
            && self.network_adapters.is_empty()
            && self.serial_ports.is_empty()
            && self.parallel_ports.is_empty()
            && self.sound_devices.is_empty()
            && self.usb_devices.is_empty()
            && self.generic_scsi_devices.is_empty()
    }

    /// Indices in use by devices of `kind`. Backup disks share the hard
    /// disk list and printers share the parallel port list.
    pub fn indices(&self, kind: DeviceKind) -> Vec<u32> {
        fn idx<D: Device>(list: &[D]) -> Vec<u32> {
            list.iter().map(Device::index).collect()
        }

        match kind {
            DeviceKind::Floppy => idx(&self.floppy_disks),
            DeviceKind::OpticalDisk => idx(&self.optical_disks),
            DeviceKind::HardDisk | DeviceKind::AttachedBackupDisk => {
                idx(&self.hard_disks)
            }
            DeviceKind::NetworkAdapter => idx(&self.network_adapters),
            DeviceKind::SerialPort => idx(&self.serial_ports),
            DeviceKind::ParallelPort | DeviceKind::Printer => {
                idx(&self.parallel_ports)
            }
            DeviceKind::SoundDevice => idx(&self.sound_devices),
            DeviceKind::UsbDevice => idx(&self.usb_devices),
            DeviceKind::GenericScsi => idx(&self.generic_scsi_devices),
            DeviceKind::GenericPci => Vec::new(),
        }
    }

    pub fn contains(&self, kind: DeviceKind, index: u32) -> bool {
        self.indices(kind).contains(&index)
    }

    pub fn hard_disk(&self, index: u32) -> Option<&HardDisk> {
        self.hard_disks.iter().find(|d| d.index() == index)
    }

    /// Every storage attachment held by disks, optical drives and generic
    /// SCSI devices.
    pub fn storage_attachments(
        &self,
    ) -> impl Iterator<Item = &StorageAttachment> + '_ {
        self.hard_disks
            .iter()
            .map(|d| &d.attachment)
            .chain(self.optical_disks.iter().map(|d| &d.attachment))
            .chain(self.generic_scsi_devices.iter().map(|d| &d.attachment))
    }

    /// Adds `descriptor` to its list, keeping the list sorted by index.
    pub fn insert(&mut self, descriptor: DeviceDescriptor) {
        fn put<D: Device>(list: &mut Vec<D>, dev: D) {
            let pos = list.partition_point(|d| d.index() < dev.index());
            list.insert(pos, dev);
        }

        match descriptor {
            DeviceDescriptor::Floppy(d) => put(&mut self.floppy_disks, d),
            DeviceDescriptor::OpticalDisk(d) => put(&mut self.optical_disks, d),
            DeviceDescriptor::HardDisk(d) => put(&mut self.hard_disks, d),
            DeviceDescriptor::NetworkAdapter(d) => {
                put(&mut self.network_adapters, d)
            }
            DeviceDescriptor::SerialPort(d) => put(&mut self.serial_ports, d),
            DeviceDescriptor::ParallelPort(d) => {
                put(&mut self.parallel_ports, d)
            }
            DeviceDescriptor::SoundDevice(d) => put(&mut self.sound_devices, d),
            DeviceDescriptor::UsbDevice(d) => put(&mut self.usb_devices, d),
        }
    }
}

/// One entry in the firmware boot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BootDeviceEntry {
    pub kind: DeviceKind,
    pub index: u32,
    pub sequence: u32,
    pub in_use: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeOptions {
    pub foreground_priority: Priority,
    pub background_priority: Priority,
    pub disk_cache_write_back: bool,
    pub close_app_on_shutdown: bool,
    pub os_resolution_in_full_screen: bool,
    pub disable_speaker: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            foreground_priority: Priority::Normal,
            background_priority: Priority::Normal,
            disk_cache_write_back: true,
            close_app_on_shutdown: false,
            os_resolution_in_full_screen: false,
            disable_speaker: false,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum WindowMode {
    #[default]
    Window,
    FullScreen,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StartupOptions {
    pub autostart: bool,
    pub window_mode: WindowMode,
    pub firmware: Firmware,
    pub boot_order: Vec<BootDeviceEntry>,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AutoStopAction {
    #[default]
    Stop,
    Suspend,
    Shutdown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShutdownOptions {
    pub auto_stop: AutoStopAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acceleration {
    Disabled,
    Normal,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuSettings {
    pub count: u32,
    pub vtx_enabled: bool,
    pub acceleration: Acceleration,
}

impl Default for CpuSettings {
    fn default() -> Self {
        Self { count: 1, vtx_enabled: true, acceleration: Acceleration::High }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VideoSettings {
    pub memory_mb: u32,
    pub enable_3d: bool,
    pub hi_res_drawing: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemorySettings {
    pub ram_mb: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VirtualPrinters {
    pub use_host_printers: bool,
    pub sync_default_printer: bool,
}

/// Which USB controller generations the VM exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UsbControllerSettings {
    pub uhci: bool,
    pub ehci: bool,
    pub xhci: bool,
}

impl UsbControllerSettings {
    /// The controller set a new VM running `version` starts with.
    pub fn defaults_for(version: OsVersion) -> Self {
        let xhci_only = version == OsVersion::MACOS_UNIVERSAL
            || version.is_linux_like()
            || (version >= OsVersion::WIN_8 && version < OsVersion::WIN_OTHER);

        if xhci_only {
            return Self { uhci: false, ehci: false, xhci: true };
        }

        // OS/2 keeps the USB 1.x controller and loses EHCI.
        Self {
            uhci: true,
            ehci: version.family() != OsFamily::Os2,
            xhci: true,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.uhci || self.ehci || self.xhci
    }
}

/// A complete virtual machine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VmConfiguration {
    pub id: Uuid,
    pub guest: GuestIdentity,
    pub runtime: RuntimeOptions,
    pub startup: StartupOptions,
    pub shutdown: ShutdownOptions,
    pub cpu: CpuSettings,
    pub video: VideoSettings,
    pub memory: MemorySettings,
    pub printers: VirtualPrinters,
    pub usb_controller: UsbControllerSettings,
    pub devices: DeviceList,
}

impl VmConfiguration {
    /// An empty configuration for `guest` with a fresh identity.
    pub fn new(guest: GuestIdentity) -> Self {
        Self {
            id: Uuid::new_v4(),
            guest,
            runtime: RuntimeOptions::default(),
            startup: StartupOptions::default(),
            shutdown: ShutdownOptions::default(),
            cpu: CpuSettings::default(),
            video: VideoSettings::default(),
            memory: MemorySettings::default(),
            printers: VirtualPrinters::default(),
            usb_controller: UsbControllerSettings::defaults_for(guest.version),
            devices: DeviceList::default(),
        }
    }
}
