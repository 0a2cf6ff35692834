// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Default firmware boot order.

use crate::config::{BootDeviceEntry, DeviceKind, DeviceList, Firmware};
use crate::guest::{GuestIdentity, OsFamily, OsVersion};

/// Derives the boot order for a freshly synthesized device set.
///
/// Only devices present in the set get an entry.
#[derive(Clone, Copy, Debug)]
pub struct BootOrderBuilder<'a> {
    guest: GuestIdentity,
    firmware: Firmware,
    devices: &'a DeviceList,
}

impl<'a> BootOrderBuilder<'a> {
    pub fn new(
        guest: GuestIdentity,
        firmware: Firmware,
        devices: &'a DeviceList,
    ) -> Self {
        Self { guest, firmware, devices }
    }

    fn entry(
        &self,
        kind: DeviceKind,
        in_use: bool,
    ) -> Option<BootDeviceEntry> {
        self.devices.contains(kind, 0).then_some(BootDeviceEntry {
            kind,
            index: 0,
            sequence: 0,
            in_use,
        })
    }

    pub fn build(&self) -> Vec<BootDeviceEntry> {
        let mut order: Vec<BootDeviceEntry> = [
            self.entry(DeviceKind::HardDisk, true),
            self.entry(DeviceKind::OpticalDisk, true),
        ]
        .into_iter()
        .flatten()
        .collect();

        if self.guest.family != OsFamily::NetWare {
            order.extend(self.entry(DeviceKind::NetworkAdapter, true));
        }

        // Warp-era OS/2 installs from floppy.
        if self.guest.family == OsFamily::Os2
            && self.guest.version <= OsVersion::OS2_WARP45
        {
            if let Some(floppy) = self.entry(DeviceKind::Floppy, true) {
                order.insert(0, floppy);
            }
        }

        // USB follows the optical drive, ahead of the network entry.
        if self.guest.family != OsFamily::MacOs {
            let efi = self.firmware == Firmware::Efi;
            let usb = self.entry(DeviceKind::UsbDevice, efi);
            let cd =
                order.iter().position(|e| e.kind == DeviceKind::OpticalDisk);
            if let (Some(usb), Some(cd)) = (usb, cd) {
                order.insert(cd + 1, usb);
            }
        }

        for (seq, entry) in order.iter_mut().enumerate() {
            entry.sequence = seq as u32;
        }
        order
    }
}
