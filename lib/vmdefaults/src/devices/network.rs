// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rand::Rng;

use super::{unused_index, DefaultDeviceFactory};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, NetworkAdapter, NetworkMode,
    VmConfiguration,
};
use crate::features::nic_adapter_type;
use crate::netquery::default_bridged_network;

/// Host adapter name new network devices are bound to.
pub const DEFAULT_ADAPTER_NAME: &str = "Default Adapter";

/// Generates a random unicast, locally administered MAC address as twelve
/// uppercase hex digits.
pub fn generate_mac_address() -> String {
    let mut bytes: [u8; 6] = rand::thread_rng().gen();
    bytes[0] = (bytes[0] & 0xfc) | 0x02;
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

impl DefaultDeviceFactory<'_> {
    pub(super) async fn network_adapter(
        &self,
        cfg: &VmConfiguration,
    ) -> DeviceDescriptor {
        let index =
            unused_index(cfg.devices.indices(DeviceKind::NetworkAdapter));

        let (mode, virtual_network_id) = if self.is_server() {
            let id = match self.networks {
                Some(q) => {
                    default_bridged_network(q, self.network_timeout, &self.log)
                        .await
                }
                None => None,
            };
            (NetworkMode::Bridged, id)
        } else {
            (NetworkMode::Shared, None)
        };

        DeviceDescriptor::NetworkAdapter(NetworkAdapter {
            common: DeviceCommon::new(index, true, format!("eth{index}")),
            mode,
            adapter_type: nic_adapter_type(self.features, cfg.guest.version),
            mac_address: generate_mac_address(),
            static_address: false,
            bound_adapter_name: DEFAULT_ADAPTER_NAME.to_string(),
            virtual_network_id,
        })
    }
}

#[cfg(test)]
mod test {
    use super::super::test::{logger, vm};
    use super::*;
    use crate::config::{AppMode, NicAdapterType};
    use crate::features::BuiltinGuestFeatures;
    use crate::guest::OsVersion;
    use crate::host::CapabilityView;
    use crate::netquery::{
        MockVirtualNetworkQuery, StaticNetworkList, VirtualNetwork,
        VirtualNetworkType, DEFAULT_NETWORK_QUERY_TIMEOUT,
    };

    fn adapter(dev: DeviceDescriptor) -> NetworkAdapter {
        match dev {
            DeviceDescriptor::NetworkAdapter(n) => n,
            other => panic!("expected a network adapter, got {other:?}"),
        }
    }

    #[test]
    fn mac_address_format() {
        for _ in 0..64 {
            let mac = generate_mac_address();
            assert_eq!(mac.len(), 12);
            assert!(mac
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
            let first = u8::from_str_radix(&mac[..2], 16).unwrap();
            assert_eq!(first & 0x01, 0, "multicast bit set in {mac}");
            assert_eq!(first & 0x02, 0x02, "local bit clear in {mac}");
        }
    }

    #[tokio::test]
    async fn desktop_adapter_is_shared() {
        let features = BuiltinGuestFeatures;
        let mut networks = MockVirtualNetworkQuery::new();
        networks.expect_virtual_networks().never();
        let factory = DefaultDeviceFactory::new(
            CapabilityView::new(None),
            &features,
            AppMode::Desktop,
            &logger(),
        )
        .with_network_query(&networks, DEFAULT_NETWORK_QUERY_TIMEOUT);

        let mut cfg = vm(OsVersion::WIN_XP);
        let first = adapter(
            factory
                .add_default_device(&mut cfg, DeviceKind::NetworkAdapter)
                .await
                .unwrap(),
        );
        assert_eq!(first.common.system_name, "eth0");
        assert_eq!(first.mode, NetworkMode::Shared);
        assert_eq!(first.adapter_type, NicAdapterType::Rtl);
        assert_eq!(first.bound_adapter_name, DEFAULT_ADAPTER_NAME);
        assert_eq!(first.virtual_network_id, None);
        assert!(!first.static_address);

        let second = adapter(
            factory
                .add_default_device(&mut cfg, DeviceKind::NetworkAdapter)
                .await
                .unwrap(),
        );
        assert_eq!(second.common.system_name, "eth1");
        assert_ne!(first.mac_address, second.mac_address);
    }

    #[tokio::test]
    async fn server_adapter_is_bridged() {
        let features = BuiltinGuestFeatures;
        let networks = StaticNetworkList(vec![VirtualNetwork {
            id: "Bridged".to_string(),
            network_type: VirtualNetworkType::Bridged,
            enabled: true,
        }]);
        let factory = DefaultDeviceFactory::new(
            CapabilityView::new(None),
            &features,
            AppMode::Server,
            &logger(),
        )
        .with_network_query(&networks, DEFAULT_NETWORK_QUERY_TIMEOUT);

        let mut cfg = vm(OsVersion::LIN_CENTOS_7);
        let nic = adapter(
            factory
                .add_default_device(&mut cfg, DeviceKind::NetworkAdapter)
                .await
                .unwrap(),
        );
        assert_eq!(nic.mode, NetworkMode::Bridged);
        assert_eq!(nic.virtual_network_id.as_deref(), Some("Bridged"));
        assert_eq!(nic.adapter_type, NicAdapterType::Virtio);
    }

    #[tokio::test]
    async fn server_adapter_without_network_query() {
        let features = BuiltinGuestFeatures;
        let factory = DefaultDeviceFactory::new(
            CapabilityView::new(None),
            &features,
            AppMode::Server,
            &logger(),
        );
        let mut cfg = vm(OsVersion::SOL_11);
        let nic = adapter(
            factory
                .add_default_device(&mut cfg, DeviceKind::NetworkAdapter)
                .await
                .unwrap(),
        );
        assert_eq!(nic.mode, NetworkMode::Bridged);
        assert_eq!(nic.virtual_network_id, None);
        assert_eq!(nic.adapter_type, NicAdapterType::E1000);
    }
}
