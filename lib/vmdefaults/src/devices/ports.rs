// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::debug;

use super::{image_name, unused_index, AddDeviceError, DefaultDeviceFactory};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, ParallelPort, PortEmulation,
    PrinterInterface, SerialPort, SocketMode, VmConfiguration,
};
use crate::guest::{OsFamily, OsVersion};
use crate::host::{HostDeviceClass, HostFeature};

pub const MAX_USB_PRINTER_COUNT: usize = 3;
pub const MAX_PARALLEL_COUNT: usize = 3;

impl DefaultDeviceFactory<'_> {
    pub(super) fn serial_port(
        &self,
        cfg: &VmConfiguration,
    ) -> DeviceDescriptor {
        let index = unused_index(cfg.devices.indices(DeviceKind::SerialPort));
        let mut common =
            DeviceCommon::new(index, true, image_name("serial", "txt", index));
        let mut emulation = PortEmulation::OutputFile;

        let host_port = self.caps.first_device(HostDeviceClass::Serial);
        if !self.is_server() {
            if let Some(host) = host_port {
                common.friendly_name = host.name.clone();
                common.system_name = host.id.clone();
                emulation = PortEmulation::Real;
            }
        }

        DeviceDescriptor::SerialPort(SerialPort {
            common,
            emulation,
            socket_mode: SocketMode::Server,
        })
    }

    /// Picks the printer interface for a new parallel port. USB printer
    /// ports are used first when the VM has USB and the host supports them.
    fn printer_interface(
        &self,
        cfg: &VmConfiguration,
    ) -> Result<PrinterInterface, AddDeviceError> {
        if cfg.devices.usb_devices.is_empty()
            || !self.caps.has_feature(HostFeature::UsbPrinterSupport)
        {
            return Ok(PrinterInterface::Lpt);
        }

        let ports = &cfg.devices.parallel_ports;
        let count = |iface: PrinterInterface| {
            ports.iter().filter(|p| p.printer_interface == iface).count()
        };
        if count(PrinterInterface::Usb) < MAX_USB_PRINTER_COUNT {
            Ok(PrinterInterface::Usb)
        } else if count(PrinterInterface::Lpt) < MAX_PARALLEL_COUNT {
            Ok(PrinterInterface::Lpt)
        } else {
            Err(AddDeviceError::PrinterPortsExhausted)
        }
    }

    pub(super) fn parallel_port(
        &self,
        cfg: &VmConfiguration,
    ) -> Result<DeviceDescriptor, AddDeviceError> {
        let printer_interface = self.printer_interface(cfg)?;
        let index = unused_index(cfg.devices.indices(DeviceKind::ParallelPort));
        let version = cfg.guest.version;

        let image = image_name("parallel", "txt", index);
        let mut common = DeviceCommon::new(index, true, image);
        let mut emulation = PortEmulation::OutputFile;

        let output_file_only = cfg.guest.family == OsFamily::FreeBsd
            || version == OsVersion::LIN_OTHER;
        if !output_file_only {
            let binds_printer =
                version.is_windows() && version != OsVersion::WIN_311;
            let printer = binds_printer
                .then(|| self.caps.first_device(HostDeviceClass::Printer))
                .flatten();
            if let Some(host) = printer {
                common.friendly_name = host.name.clone();
                common.system_name = host.id.clone();
                emulation = PortEmulation::Printer;
            } else if let Some(host) =
                self.caps.first_device(HostDeviceClass::Parallel)
            {
                common.friendly_name = host.name.clone();
                common.system_name = host.id.clone();
                emulation = PortEmulation::Real;
            }
        }
        debug!(self.log, "parallel port";
            "printer_interface" => ?printer_interface,
            "emulation" => ?emulation);

        Ok(DeviceDescriptor::ParallelPort(ParallelPort {
            common,
            emulation,
            printer_interface,
        }))
    }
}
