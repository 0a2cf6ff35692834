// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Default RAM, disk and video memory sizes.
//!
//! Each size is looked up in an ordered rule table: the first row whose
//! matcher accepts the guest version wins, and a fixed fallback covers
//! versions no row accepts.

use crate::guest::{OsFamily, OsVersion};
use crate::host::HostOsFamily;

/// Selects the guest versions a sizing rule applies to.
#[derive(Clone, Copy, Debug)]
enum Match {
    Versions(&'static [OsVersion]),
    Families(&'static [OsFamily]),
}

impl Match {
    fn accepts(&self, version: OsVersion) -> bool {
        match self {
            Match::Versions(vs) => vs.contains(&version),
            Match::Families(fs) => fs.contains(&version.family()),
        }
    }
}

/// How a RAM rule turns host RAM into a guest RAM size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RamSize {
    Fixed(u32),
    GuestTiers,
    WindowsTiers,
    MacTiers,
}

impl RamSize {
    fn resolve(self, host_ram_mb: u32) -> u32 {
        match self {
            RamSize::Fixed(mb) => mb,
            RamSize::GuestTiers => guest_tiers(host_ram_mb),
            RamSize::WindowsTiers => windows_tiers(host_ram_mb),
            RamSize::MacTiers => mac_tiers(host_ram_mb),
        }
    }
}

fn guest_tiers(host_ram_mb: u32) -> u32 {
    if host_ram_mb <= 1024 {
        512
    } else if host_ram_mb > 2048 {
        1024
    } else {
        768
    }
}

fn windows_tiers(host_ram_mb: u32) -> u32 {
    if host_ram_mb > 3072 {
        1024
    } else if host_ram_mb > 2048 {
        768
    } else {
        512
    }
}

fn mac_tiers(host_ram_mb: u32) -> u32 {
    if host_ram_mb <= 2048 {
        512
    } else if host_ram_mb < 4096 {
        1024
    } else {
        2048
    }
}

pub const FALLBACK_RAM_MB: u32 = 256;
pub const FALLBACK_HDD_MB: u32 = 8192;
/// Video memory when no host information is available.
pub const BASELINE_VIDEO_MB: u32 = 32;

#[rustfmt::skip]
const RAM_RULES: &[(Match, RamSize)] = &[
    (Match::Versions(&[OsVersion::WIN_311]), RamSize::Fixed(64)),
    (Match::Versions(&[OsVersion::WIN_95]), RamSize::Fixed(128)),
    (
        Match::Versions(&[
            OsVersion::WIN_NT,
            OsVersion::WIN_98,
            OsVersion::WIN_ME,
            OsVersion::WIN_2K,
        ]),
        RamSize::Fixed(256),
    ),
    (
        Match::Versions(&[
            OsVersion::WIN_XP,
            OsVersion::WIN_2003,
            OsVersion::WIN_VISTA,
            OsVersion::WIN_2008,
            OsVersion::WIN_7,
            OsVersion::WIN_8,
            OsVersion::WIN_8_1,
            OsVersion::WIN_OTHER,
        ]),
        RamSize::WindowsTiers,
    ),
    (
        Match::Versions(&[OsVersion::WIN_10, OsVersion::WIN_2016]),
        RamSize::Fixed(2048),
    ),
    (
        Match::Versions(&[
            OsVersion::OS2_ECS11,
            OsVersion::OS2_ECS12,
            OsVersion::OS2_WARP45,
        ]),
        RamSize::Fixed(256),
    ),
    (
        Match::Versions(&[
            OsVersion::SOL_OTHER,
            OsVersion::SOL_9,
            OsVersion::WIN_2012,
            OsVersion::LIN_FEDORA,
        ]),
        RamSize::Fixed(1024),
    ),
    (Match::Versions(&[OsVersion::SOL_10]), RamSize::Fixed(1536)),
    (Match::Versions(&[OsVersion::SOL_11]), RamSize::Fixed(768)),
    (Match::Versions(&[OsVersion::LIN_FEDORA_5]), RamSize::Fixed(512)),
    (
        Match::Versions(&[
            OsVersion::LIN_REDHAT_7,
            OsVersion::LIN_CENTOS_7,
            OsVersion::LIN_VZLINUX_7,
            OsVersion::LIN_CLOUDLINUX_7,
            OsVersion::LIN_PSBM,
        ]),
        RamSize::Fixed(2048),
    ),
    (Match::Versions(&[OsVersion::MACOS_TIGER]), RamSize::GuestTiers),
    (Match::Families(&[OsFamily::Windows]), RamSize::Fixed(1024)),
    (Match::Families(&[OsFamily::Os2]), RamSize::Fixed(128)),
    (Match::Families(&[OsFamily::MsDos]), RamSize::Fixed(32)),
    (Match::Families(&[OsFamily::MacOs]), RamSize::MacTiers),
    (
        Match::Families(&[
            OsFamily::Linux,
            OsFamily::ChromeOs,
            OsFamily::Android,
        ]),
        RamSize::GuestTiers,
    ),
];

#[rustfmt::skip]
const HDD_RULES: &[(Match, u32)] = &[
    (Match::Versions(&[OsVersion::WIN_311, OsVersion::WIN_95]), 2048),
    (Match::Versions(&[OsVersion::WIN_98, OsVersion::WIN_ME]), 8192),
    (Match::Versions(&[OsVersion::WIN_NT]), 4096),
    (Match::Families(&[OsFamily::Os2, OsFamily::MsDos]), 2048),
    (Match::Families(&[OsFamily::NetWare]), 8192),
    (
        Match::Families(&[
            OsFamily::FreeBsd,
            OsFamily::Solaris,
            OsFamily::MacOs,
            OsFamily::Linux,
            OsFamily::ChromeOs,
            OsFamily::Android,
            OsFamily::Windows,
        ]),
        65536,
    ),
];

/// Windows releases that get the largest video memory on capable hosts.
const HI_VIDEO_WINDOWS: &[OsVersion] = &[
    OsVersion::WIN_2K,
    OsVersion::WIN_XP,
    OsVersion::WIN_VISTA,
    OsVersion::WIN_7,
    OsVersion::WIN_8,
    OsVersion::WIN_8_1,
];

fn ram_rule(version: OsVersion) -> Option<RamSize> {
    RAM_RULES
        .iter()
        .find(|(m, _)| m.accepts(version))
        .map(|(_, size)| *size)
}

/// Default guest RAM in MB for `version` on a host with `host_ram_mb`.
pub fn default_ram_size(version: OsVersion, host_ram_mb: u32) -> u32 {
    ram_rule(version).map_or(FALLBACK_RAM_MB, |size| size.resolve(host_ram_mb))
}

/// Default size in MB of a new hard disk image for `version`.
pub fn default_hdd_size(version: OsVersion) -> u32 {
    HDD_RULES
        .iter()
        .find(|(m, _)| m.accepts(version))
        .map_or(FALLBACK_HDD_MB, |(_, mb)| *mb)
}

/// Default video memory in MB, given what is known about the host.
pub fn default_video_ram_size(
    version: OsVersion,
    host_os: HostOsFamily,
    host_ram_mb: u32,
    is_3d_enabled: bool,
) -> u32 {
    if version == OsVersion::WIN_2003 {
        return 64;
    }

    let capable_host =
        matches!(host_os, HostOsFamily::Mac | HostOsFamily::Linux)
        && is_3d_enabled
        && version.is_windows()
        && host_ram_mb > 1024;
    if !capable_host {
        return BASELINE_VIDEO_MB;
    }

    if HI_VIDEO_WINDOWS.contains(&version) && host_ram_mb > 2048 {
        256
    } else {
        128
    }
}

/// Default video memory in MB when no host information is available.
pub fn default_video_ram_size_hostless(_version: OsVersion) -> u32 {
    BASELINE_VIDEO_MB
}
