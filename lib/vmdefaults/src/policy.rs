// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Which device kinds belong in a new VM's default configuration.

use crate::config::{AppMode, DeviceKind};
use crate::guest::{OsFamily, OsVersion};

/// Device kinds considered for a default configuration, in the order they
/// are created. Parallel ports come after USB so that a USB printer port can
/// be chosen when a USB controller is present.
pub const DEFAULT_DEVICE_ORDER: [DeviceKind; 8] = [
    DeviceKind::HardDisk,
    DeviceKind::Floppy,
    DeviceKind::OpticalDisk,
    DeviceKind::SerialPort,
    DeviceKind::SoundDevice,
    DeviceKind::NetworkAdapter,
    DeviceKind::UsbDevice,
    DeviceKind::ParallelPort,
];

/// Returns the device kinds a default configuration for `version` contains,
/// in creation order.
pub fn default_device_set(
    version: OsVersion,
    mode: AppMode,
) -> Vec<DeviceKind> {
    DEFAULT_DEVICE_ORDER
        .into_iter()
        .filter(|kind| is_default_device_needed(version, *kind, mode))
        .collect()
}

/// Returns true if a default configuration for `version` includes a device
/// of `kind`.
pub fn is_default_device_needed(
    version: OsVersion,
    kind: DeviceKind,
    mode: AppMode,
) -> bool {
    let family = version.family();
    match kind {
        DeviceKind::HardDisk | DeviceKind::OpticalDisk => true,
        DeviceKind::Floppy => !matches!(
            family,
            OsFamily::Solaris
                | OsFamily::Linux
                | OsFamily::MacOs
                | OsFamily::NetWare
        ),
        DeviceKind::SerialPort => family == OsFamily::Os2,
        DeviceKind::SoundDevice => {
            mode != AppMode::Server
                && !matches!(
                    family,
                    OsFamily::MsDos | OsFamily::NetWare | OsFamily::Solaris
                )
        }
        DeviceKind::NetworkAdapter => family != OsFamily::NetWare,
        DeviceKind::UsbDevice => usb_needed(version),
        DeviceKind::ParallelPort => {
            mode != AppMode::Server && parallel_needed(version)
        }
        DeviceKind::AttachedBackupDisk
        | DeviceKind::Printer
        | DeviceKind::GenericScsi
        | DeviceKind::GenericPci => false,
    }
}

fn usb_needed(version: OsVersion) -> bool {
    match version {
        OsVersion::LIN_KRNL_24
        | OsVersion::WIN_311
        | OsVersion::WIN_95
        | OsVersion::WIN_NT
        | OsVersion::WIN_OTHER => false,
        OsVersion::OS2_ECS11 | OsVersion::OS2_ECS12 => true,
        _ => matches!(
            version.family(),
            OsFamily::Linux
                | OsFamily::ChromeOs
                | OsFamily::Android
                | OsFamily::Windows
                | OsFamily::MacOs
                | OsFamily::FreeBsd
        ),
    }
}

fn parallel_needed(version: OsVersion) -> bool {
    match version.family() {
        OsFamily::Linux | OsFamily::ChromeOs => version == OsVersion::LIN_OTHER,
        OsFamily::FreeBsd => true,
        OsFamily::Windows => version != OsVersion::WIN_311,
        _ => false,
    }
}
