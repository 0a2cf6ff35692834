// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{unused_index, DefaultDeviceFactory};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, SoundDevice, SoundEmulation,
    SoundRoute, VmConfiguration,
};
use crate::guest::{OsFamily, OsVersion};
use crate::host::{HostDevice, HostDeviceClass};

fn route(dev: &HostDevice) -> SoundRoute {
    SoundRoute { friendly_name: dev.name.clone(), system_name: dev.id.clone() }
}

impl DefaultDeviceFactory<'_> {
    pub(super) fn sound_device(
        &self,
        cfg: &VmConfiguration,
    ) -> DeviceDescriptor {
        let index = unused_index(cfg.devices.indices(DeviceKind::SoundDevice));
        let emulation = if cfg.guest.version == OsVersion::WIN_311
            || cfg.guest.family == OsFamily::MsDos
        {
            SoundEmulation::Sb16
        } else {
            SoundEmulation::Ac97
        };

        DeviceDescriptor::SoundDevice(SoundDevice {
            common: DeviceCommon::new(index, true, String::new()),
            emulation,
            output: self
                .caps
                .first_device(HostDeviceClass::SoundOutput)
                .map(route),
            mixer: self
                .caps
                .first_device(HostDeviceClass::SoundMixer)
                .map(route),
        })
    }
}
