// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end synthesis of default configurations.

use slog::{o, Logger};
use vmdefaults::config::{
    BootDeviceEntry, DeviceDescriptor, InterfaceType, NicAdapterType,
    OpticalEmulation, PortEmulation, ScsiSubType,
};
use vmdefaults::host::{HostOsFamily, UnattendedFloppy, VtxMode};
use vmdefaults::netquery::{
    StaticNetworkList, VirtualNetwork, VirtualNetworkType,
};
use vmdefaults::*;

fn logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

fn boot_kinds(order: &[BootDeviceEntry]) -> Vec<(DeviceKind, u32, bool)> {
    order.iter().map(|e| (e.kind, e.sequence, e.in_use)).collect()
}

// The USB entry is inserted straight after the optical drive, so it boots
// ahead of the network adapter.
#[tokio::test]
async fn other_linux_without_host_boots_usb_before_network() {
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        None,
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::LIN_OTHER))
        .await;
    let cfg = &out.config;

    assert!(out.failures.is_empty(), "{:?}", out.failures);
    assert_eq!(cfg.guest.family, OsFamily::Linux);
    assert_eq!(cfg.cpu.count, 1);
    assert_eq!(cfg.memory.ram_mb, 512);
    assert_eq!(cfg.video.memory_mb, 32);

    assert!(cfg.devices.floppy_disks.is_empty());
    assert!(cfg.devices.serial_ports.is_empty());

    let hdd = &cfg.devices.hard_disks[0];
    assert_eq!(hdd.attachment.interface, InterfaceType::Scsi);
    assert_eq!(hdd.attachment.stack_index, 0);
    assert_eq!(hdd.attachment.sub_type, Some(ScsiSubType::VirtioScsi));
    assert_eq!(hdd.common.system_name, "harddisk.hdd");
    assert_eq!(hdd.size_mb, 65536);

    let cd = &cfg.devices.optical_disks[0];
    assert_eq!(cd.attachment.interface, InterfaceType::Scsi);
    assert_eq!(cd.attachment.stack_index, 1);
    assert_eq!(cd.emulation, OpticalEmulation::Image);

    assert_eq!(
        cfg.devices.network_adapters[0].adapter_type,
        NicAdapterType::Virtio
    );
    assert_eq!(cfg.devices.sound_devices.len(), 1);
    assert_eq!(cfg.devices.usb_devices.len(), 1);
    assert_eq!(
        cfg.devices.parallel_ports[0].emulation,
        PortEmulation::OutputFile
    );

    assert_eq!(
        boot_kinds(&cfg.startup.boot_order),
        vec![
            (DeviceKind::HardDisk, 0, true),
            (DeviceKind::OpticalDisk, 1, true),
            (DeviceKind::UsbDevice, 2, false),
            (DeviceKind::NetworkAdapter, 3, true),
        ]
    );
    assert_eq!(out.added.len(), 6);
}

#[tokio::test]
async fn netware_gets_only_storage() {
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        None,
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::NET_5X))
        .await;
    let cfg = &out.config;

    let kinds: Vec<_> = out
        .added
        .iter()
        .map(|d| match d {
            DeviceDescriptor::HardDisk(_) => DeviceKind::HardDisk,
            DeviceDescriptor::OpticalDisk(_) => DeviceKind::OpticalDisk,
            other => panic!("unexpected device {other:?}"),
        })
        .collect();
    assert_eq!(kinds, vec![DeviceKind::HardDisk, DeviceKind::OpticalDisk]);
    assert_eq!(
        cfg.devices.hard_disks[0].attachment.interface,
        InterfaceType::Ide
    );
    assert_eq!(cfg.devices.optical_disks[0].attachment.stack_index, 1);
    assert_eq!(cfg.devices.hard_disks[0].size_mb, 8192);

    assert_eq!(
        boot_kinds(&cfg.startup.boot_order),
        vec![
            (DeviceKind::HardDisk, 0, true),
            (DeviceKind::OpticalDisk, 1, true),
        ]
    );
}

#[tokio::test]
async fn windows_backup_disk_sorts_after_boot_disk() {
    let mut host = HostCapabilitySnapshot::new(
        4,
        VtxMode::Vtx,
        8192,
        HostOsFamily::Linux,
    );
    host.unattended_floppies.push(UnattendedFloppy {
        os_version: OsVersion::WIN_XP,
        path: "/opt/images/winxp-unattended.fdd".to_string(),
    });
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        Some(&host),
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let mut out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::WIN_XP))
        .await;
    assert!(out.failures.is_empty(), "{:?}", out.failures);

    let cfg = &mut out.config;
    let boot = cfg.devices.hard_disks[0].attachment;
    assert_eq!((boot.interface, boot.stack_index), (InterfaceType::Ide, 0));
    assert_eq!(cfg.devices.optical_disks[0].attachment.stack_index, 1);
    assert_eq!(
        cfg.devices.floppy_disks[0].common.system_name,
        "/opt/images/winxp-unattended.fdd"
    );

    let backup = synth
        .device_factory()
        .add_default_device(cfg, DeviceKind::AttachedBackupDisk)
        .await
        .unwrap();
    match backup {
        DeviceDescriptor::HardDisk(disk) => {
            assert!(disk.backup);
            assert_eq!(disk.common.index, 1);
            assert_eq!(disk.common.system_name, "harddisk2.hdd");
            assert_eq!(disk.attachment.interface, InterfaceType::Ide);
            assert!(disk.attachment.stack_index > boot.stack_index);
            assert_eq!(disk.attachment.stack_index, 2);
        }
        other => panic!("expected a hard disk, got {other:?}"),
    }
}

#[tokio::test]
async fn windows_without_unattended_floppy_reports_failure() {
    let host = HostCapabilitySnapshot::new(
        4,
        VtxMode::Vtx,
        8192,
        HostOsFamily::Windows,
    );
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        Some(&host),
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::WIN_XP))
        .await;

    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].kind, DeviceKind::Floppy);
    assert_eq!(
        out.failures[0].error,
        AddDeviceError::MissingUnattendedFloppy(OsVersion::WIN_XP)
    );
    assert!(out.config.devices.floppy_disks.is_empty());
    assert_eq!(out.config.devices.hard_disks.len(), 1);
}

#[tokio::test]
async fn linux_host_ram_sizing() {
    let host = HostCapabilitySnapshot::new(
        2,
        VtxMode::Svm,
        4096,
        HostOsFamily::Linux,
    );
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        Some(&host),
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let mut req = SynthesisRequest::new(OsVersion::LIN_UBUNTU);
    req.create_devices = false;
    let cfg = synth.create_default_config(&req).await.config;
    assert_eq!(cfg.memory.ram_mb, 1024);
    assert!(cfg.usb_controller.xhci);
}

#[tokio::test]
async fn server_mode_guest() {
    let host = HostCapabilitySnapshot::new(
        16,
        VtxMode::Vtx,
        65536,
        HostOsFamily::Linux,
    );
    let networks = StaticNetworkList(vec![
        VirtualNetwork {
            id: "Host-Only".to_string(),
            network_type: VirtualNetworkType::HostOnly,
            enabled: true,
        },
        VirtualNetwork {
            id: "Bridged".to_string(),
            network_type: VirtualNetworkType::Bridged,
            enabled: true,
        },
    ]);
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        Some(&host),
        &features,
        AppMode::Server,
        &logger(),
    )
    .with_network_query(&networks);
    let out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::LIN_CENTOS_7))
        .await;
    let cfg = &out.config;

    assert_eq!(cfg.cpu.count, 2);
    assert_eq!(cfg.memory.ram_mb, 2048);
    assert!(!cfg.video.enable_3d);
    assert!(cfg.runtime.disable_speaker);
    assert!(cfg.devices.sound_devices.is_empty());
    assert!(cfg.devices.parallel_ports.is_empty());
    assert_eq!(
        cfg.devices.network_adapters[0].virtual_network_id.as_deref(),
        Some("Bridged")
    );
}

#[tokio::test]
async fn efi_usb_boot_entry_is_in_use() {
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        None,
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let mut req = SynthesisRequest::new(OsVersion::WIN_10);
    req.firmware = Firmware::Efi;
    let out = synth.create_default_config(&req).await;

    assert_eq!(out.config.startup.firmware, Firmware::Efi);
    let usb = out
        .config
        .startup
        .boot_order
        .iter()
        .find(|e| e.kind == DeviceKind::UsbDevice)
        .unwrap();
    assert!(usb.in_use);
    assert_eq!(usb.sequence, 2);
}

#[tokio::test]
async fn synthesis_serializes_to_json() {
    let features = BuiltinGuestFeatures;
    let synth = ConfigurationSynthesizer::new(
        None,
        &features,
        AppMode::Desktop,
        &logger(),
    );
    let out = synth
        .create_default_config(&SynthesisRequest::new(OsVersion::OS2_WARP4))
        .await;

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["config"]["guest"]["version"], "os2-warp4");
    assert_eq!(json["config"]["startup"]["boot-order"][0]["kind"], "floppy");
    let back: VmConfiguration =
        serde_json::from_value(json["config"].clone()).unwrap();
    assert_eq!(back, out.config);
}
