// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::warn;

use super::{image_name, unused_index, AddDeviceError, DefaultDeviceFactory};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, FloppyDisk, FloppyEmulation,
    VmConfiguration,
};
use crate::guest::OsFamily;
use crate::host::HostDeviceClass;

/// Guest tools image inserted into new OS/2 VMs.
pub const OS2_TOOLS_FLOPPY: &str = "guest-tools-os2.fdd";

impl DefaultDeviceFactory<'_> {
    pub(super) fn floppy(
        &self,
        cfg: &VmConfiguration,
    ) -> Result<DeviceDescriptor, AddDeviceError> {
        let index = unused_index(cfg.devices.indices(DeviceKind::Floppy));
        let version = cfg.guest.version;
        let os2 = cfg.guest.family == OsFamily::Os2;
        let windows = version.is_windows();

        let image = if os2 {
            OS2_TOOLS_FLOPPY.to_string()
        } else if windows {
            match self.caps.unattended_floppy(version) {
                Some(path) => path.to_string(),
                None => {
                    warn!(self.log, "no unattended install floppy on host";
                        "os_version" => %version);
                    return Err(AddDeviceError::MissingUnattendedFloppy(
                        version,
                    ));
                }
            }
        } else {
            image_name("floppy", "fdd", index)
        };

        let connected =
            os2 || windows || cfg.guest.family == OsFamily::MsDos;
        let mut common = DeviceCommon::new(index, connected, image);
        let mut emulation = FloppyEmulation::Image;

        let host_drive = self.caps.first_device(HostDeviceClass::Floppy);
        if !os2 && !windows {
            if let Some(host) = host_drive {
                common.friendly_name = host.name.clone();
                common.system_name = host.id.clone();
                emulation = FloppyEmulation::Real;
            }
        }

        Ok(DeviceDescriptor::Floppy(FloppyDisk { common, emulation }))
    }
}
