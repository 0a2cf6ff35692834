// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::debug;

use super::{unused_index, DefaultDeviceFactory};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, UsbControllerSettings,
    UsbDevice, VmConfiguration,
};

impl DefaultDeviceFactory<'_> {
    /// Builds the USB device. A VM whose USB controllers are all switched
    /// off gets its controller defaults back, since the device is useless
    /// without one.
    pub(super) fn usb_device(
        &self,
        cfg: &mut VmConfiguration,
    ) -> DeviceDescriptor {
        let index = unused_index(cfg.devices.indices(DeviceKind::UsbDevice));

        if !cfg.usb_controller.any_enabled() {
            cfg.usb_controller =
                UsbControllerSettings::defaults_for(cfg.guest.version);
            debug!(self.log, "re-enabled USB controllers";
                "controllers" => ?cfg.usb_controller);
        }

        DeviceDescriptor::UsbDevice(UsbDevice {
            common: DeviceCommon::new(index, true, String::new()),
            autoconnect_primary_os: true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::super::test::{logger, vm};
    use super::*;
    use crate::config::AppMode;
    use crate::features::BuiltinGuestFeatures;
    use crate::guest::OsVersion;
    use crate::host::CapabilityView;

    #[tokio::test]
    async fn restores_disabled_controllers() {
        let features = BuiltinGuestFeatures;
        let factory = DefaultDeviceFactory::new(
            CapabilityView::new(None),
            &features,
            AppMode::Desktop,
            &logger(),
        );
        let mut cfg = vm(OsVersion::WIN_7);
        cfg.usb_controller =
            UsbControllerSettings { uhci: false, ehci: false, xhci: false };

        let dev = factory
            .add_default_device(&mut cfg, DeviceKind::UsbDevice)
            .await
            .unwrap();
        assert!(matches!(
            dev,
            DeviceDescriptor::UsbDevice(UsbDevice {
                autoconnect_primary_os: true,
                ..
            })
        ));
        assert_eq!(
            cfg.usb_controller,
            UsbControllerSettings::defaults_for(OsVersion::WIN_7)
        );
    }

    #[tokio::test]
    async fn keeps_user_controller_choice() {
        let features = BuiltinGuestFeatures;
        let factory = DefaultDeviceFactory::new(
            CapabilityView::new(None),
            &features,
            AppMode::Desktop,
            &logger(),
        );
        let mut cfg = vm(OsVersion::WIN_7);
        let custom =
            UsbControllerSettings { uhci: false, ehci: true, xhci: false };
        cfg.usb_controller = custom;

        factory
            .add_default_device(&mut cfg, DeviceKind::UsbDevice)
            .await
            .unwrap();
        assert_eq!(cfg.usb_controller, custom);
        assert_eq!(cfg.devices.usb_devices.len(), 1);
    }
}
