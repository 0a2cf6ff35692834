// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Guest driver support queries.

use serde::{Deserialize, Serialize};

use crate::config::{NicAdapterType, ScsiSubType};
use crate::guest::{OsFamily, OsVersion};

/// A paravirtual or emulated device model a guest may have drivers for.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum GuestFeature {
    Virtio,
    E1000,
    ScsiLsiSpi,
    ScsiLsiSas,
}

/// Answers whether a guest version ships drivers for a device model.
#[cfg_attr(test, mockall::automock)]
pub trait GuestFeatureQuery: Send + Sync {
    fn is_supported(&self, version: OsVersion, feature: GuestFeature) -> bool;
}

/// The built-in driver support table.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinGuestFeatures;

impl GuestFeatureQuery for BuiltinGuestFeatures {
    fn is_supported(&self, version: OsVersion, feature: GuestFeature) -> bool {
        match feature {
            GuestFeature::Virtio => {
                (version.is_windows() && version >= OsVersion::WIN_VISTA)
                    || (version.is_linux_like()
                        && version != OsVersion::LIN_KRNL_24
                        && version != OsVersion::LIN_RHLES3)
            }
            GuestFeature::E1000 => {
                (version.is_windows() && version >= OsVersion::WIN_VISTA)
                    || (version.is_linux_like()
                        && version != OsVersion::LIN_KRNL_24)
                    || (version.is_macos()
                        && version >= OsVersion::MACOS_SNOW_LEOPARD)
                    || !(version.is_windows()
                        || version.is_linux_like()
                        || version.is_macos()
                        || version.family() == OsFamily::Os2)
            }
            GuestFeature::ScsiLsiSpi => version.is_linux_like(),
            GuestFeature::ScsiLsiSas => {
                version >= OsVersion::WIN_VISTA
                    && version <= OsVersion::WIN_LAST
            }
        }
    }
}

/// Picks the SCSI controller model for a guest. Later matches take
/// precedence: LSI SPI, then LSI SAS, then virtio-SCSI.
pub fn scsi_sub_type(
    features: &dyn GuestFeatureQuery,
    version: OsVersion,
) -> Option<ScsiSubType> {
    let mut sub_type = None;
    if features.is_supported(version, GuestFeature::ScsiLsiSpi) {
        sub_type = Some(ScsiSubType::LsiSpi);
    }
    if features.is_supported(version, GuestFeature::ScsiLsiSas) {
        sub_type = Some(ScsiSubType::LsiSas);
    }
    if features.is_supported(version, GuestFeature::Virtio) {
        sub_type = Some(ScsiSubType::VirtioScsi);
    }
    sub_type
}

/// Picks the network adapter model for a guest.
pub fn nic_adapter_type(
    features: &dyn GuestFeatureQuery,
    version: OsVersion,
) -> NicAdapterType {
    if version.code() == 0
        || features.is_supported(version, GuestFeature::Virtio)
    {
        NicAdapterType::Virtio
    } else if features.is_supported(version, GuestFeature::E1000) {
        NicAdapterType::E1000
    } else {
        NicAdapterType::Rtl
    }
}
