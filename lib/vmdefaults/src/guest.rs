// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Guest operating system identity.
//!
//! A guest is identified by a 16-bit version code whose high byte names the
//! OS family. Codes compare meaningfully within a family (e.g. "Windows Vista
//! or newer"), and each family reserves `0xFF` in the low byte for "other".

use std::fmt::Display;
use std::io::{Error, ErrorKind};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A guest operating system family.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    MacOs,
    Windows,
    Linux,
    FreeBsd,
    Os2,
    MsDos,
    NetWare,
    Solaris,
    ChromeOs,
    Android,
    Other,
}

impl OsFamily {
    pub const fn code(self) -> u8 {
        match self {
            Self::MacOs => 0x07,
            Self::Windows => 0x08,
            Self::Linux => 0x09,
            Self::FreeBsd => 0x0A,
            Self::Os2 => 0x0B,
            Self::MsDos => 0x0C,
            Self::NetWare => 0x0D,
            Self::Solaris => 0x0E,
            Self::ChromeOs => 0x0F,
            Self::Android => 0x10,
            Self::Other => 0xFF,
        }
    }

    /// Maps a family code to a family. Unassigned codes are [`Self::Other`].
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x07 => Self::MacOs,
            0x08 => Self::Windows,
            0x09 => Self::Linux,
            0x0A => Self::FreeBsd,
            0x0B => Self::Os2,
            0x0C => Self::MsDos,
            0x0D => Self::NetWare,
            0x0E => Self::Solaris,
            0x0F => Self::ChromeOs,
            0x10 => Self::Android,
            _ => Self::Other,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::MacOs => "Mac OS X",
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::FreeBsd => "FreeBSD",
            Self::Os2 => "OS/2",
            Self::MsDos => "MS-DOS",
            Self::NetWare => "NetWare",
            Self::Solaris => "Solaris",
            Self::ChromeOs => "Chrome OS",
            Self::Android => "Android",
            Self::Other => "Other",
        }
    }
}

impl Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A guest OS version code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OsVersion(u16);

impl OsVersion {
    pub const MACOS_TIGER: Self = Self(0x0701);
    pub const MACOS_LEOPARD: Self = Self(0x0702);
    pub const MACOS_SNOW_LEOPARD: Self = Self(0x0703);
    pub const MACOS_UNIVERSAL: Self = Self::MACOS_SNOW_LEOPARD;

    pub const WIN_311: Self = Self(0x0801);
    pub const WIN_95: Self = Self(0x0802);
    pub const WIN_98: Self = Self(0x0803);
    pub const WIN_ME: Self = Self(0x0804);
    pub const WIN_NT: Self = Self(0x0805);
    pub const WIN_2K: Self = Self(0x0806);
    pub const WIN_XP: Self = Self(0x0807);
    pub const WIN_2003: Self = Self(0x0808);
    pub const WIN_VISTA: Self = Self(0x0809);
    pub const WIN_2008: Self = Self(0x080A);
    pub const WIN_7: Self = Self(0x080B);
    pub const WIN_8: Self = Self(0x080C);
    pub const WIN_2012: Self = Self(0x080D);
    pub const WIN_8_1: Self = Self(0x080E);
    pub const WIN_10: Self = Self(0x080F);
    pub const WIN_2016: Self = Self(0x0810);
    pub const WIN_2019: Self = Self(0x0811);
    pub const WIN_LAST: Self = Self::WIN_2019;
    /// Used for legacy guests, but sorts after every named Windows release.
    pub const WIN_OTHER: Self = Self(0x08FF);

    pub const LIN_REDHAT: Self = Self(0x0901);
    pub const LIN_SUSE: Self = Self(0x0902);
    pub const LIN_MANDRAKE: Self = Self(0x0903);
    pub const LIN_KRNL_24: Self = Self(0x0904);
    pub const LIN_KRNL_26: Self = Self(0x0905);
    pub const LIN_DEBIAN: Self = Self(0x0906);
    pub const LIN_FEDORA: Self = Self(0x0907);
    pub const LIN_FEDORA_5: Self = Self(0x0908);
    pub const LIN_XANDROS: Self = Self(0x0909);
    pub const LIN_UBUNTU: Self = Self(0x090A);
    pub const LIN_SLES9: Self = Self(0x090B);
    pub const LIN_RHLES3: Self = Self(0x090C);
    pub const LIN_CENTOS: Self = Self(0x090D);
    pub const LIN_RH_LEGACY: Self = Self(0x090E);
    pub const LIN_OPENSUSE: Self = Self(0x090F);
    pub const LIN_PSBM: Self = Self(0x0910);
    pub const LIN_MAGEIA: Self = Self(0x0911);
    pub const LIN_MINT: Self = Self(0x0912);
    pub const LIN_REDHAT_7: Self = Self(0x0913);
    pub const LIN_CENTOS_7: Self = Self(0x0914);
    pub const LIN_VZLINUX: Self = Self(0x0915);
    pub const LIN_VZLINUX_7: Self = Self(0x0916);
    pub const LIN_SLES11: Self = Self(0x0917);
    pub const LIN_SLES12: Self = Self(0x0918);
    pub const LIN_CLOUDLINUX: Self = Self(0x0919);
    pub const LIN_CLOUDLINUX_7: Self = Self(0x0920);
    pub const LIN_OTHER: Self = Self(0x09FF);

    pub const BSD_4X: Self = Self(0x0A01);
    pub const BSD_5X: Self = Self(0x0A02);
    pub const BSD_6X: Self = Self(0x0A03);
    pub const BSD_7X: Self = Self(0x0A04);
    pub const BSD_8X: Self = Self(0x0A05);
    pub const BSD_OTHER: Self = Self(0x0AFF);

    pub const OS2_WARP3: Self = Self(0x0B01);
    pub const OS2_WARP4: Self = Self(0x0B02);
    pub const OS2_WARP45: Self = Self(0x0B03);
    pub const OS2_ECS11: Self = Self(0x0B04);
    pub const OS2_ECS12: Self = Self(0x0B05);
    pub const OS2_OTHER: Self = Self(0x0BFF);

    pub const DOS_MS622: Self = Self(0x0C01);
    pub const DOS_OTHER: Self = Self(0x0CFF);

    pub const NET_4X: Self = Self(0x0D01);
    pub const NET_5X: Self = Self(0x0D02);
    pub const NET_6X: Self = Self(0x0D03);
    pub const NET_OTHER: Self = Self(0x0DFF);

    pub const SOL_9: Self = Self(0x0E01);
    pub const SOL_10: Self = Self(0x0E02);
    pub const SOL_11: Self = Self(0x0E03);
    pub const SOL_OPEN: Self = Self(0x0E04);
    pub const SOL_OTHER: Self = Self(0x0EFF);

    pub const CHROMEOS_1X: Self = Self(0x0F01);
    pub const CHROMEOS_OTHER: Self = Self(0x0FFF);

    pub const ANDROID_2X: Self = Self(0x1000);
    pub const ANDROID_3X: Self = Self(0x1001);
    pub const ANDROID_4_0: Self = Self(0x1002);
    pub const ANDROID_OTHER: Self = Self(0x10FF);

    pub const OTH_QNX: Self = Self(0xFF01);
    pub const OTH_OPENSTEP: Self = Self(0xFF02);
    pub const OTH_OTHER: Self = Self(0xFFFF);

    pub const fn from_code(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }

    /// The family encoded in the high byte of the version code.
    pub const fn family(self) -> OsFamily {
        OsFamily::from_code((self.0 >> 8) as u8)
    }

    pub fn is_windows(self) -> bool {
        self.family() == OsFamily::Windows
    }

    pub fn is_macos(self) -> bool {
        self.family() == OsFamily::MacOs
    }

    pub fn is_os2(self) -> bool {
        self.family() == OsFamily::Os2
    }

    /// Linux proper, plus the Linux-based Chrome OS and Android families.
    pub fn is_linux_like(self) -> bool {
        matches!(
            self.family(),
            OsFamily::Linux | OsFamily::ChromeOs | OsFamily::Android
        )
    }

    /// True if this code is one of the named versions (including each
    /// family's "other" entry).
    pub fn is_known(self) -> bool {
        info(self).is_some()
    }

    /// True for a known version belonging to `family`.
    pub fn is_valid_for(self, family: OsFamily) -> bool {
        self.is_known() && self.family() == family
    }

    /// The stable key used for this version in configuration files.
    pub fn key(self) -> Option<&'static str> {
        info(self).map(|i| i.key)
    }

    /// Every named version, in code order.
    pub fn known() -> impl Iterator<Item = OsVersion> {
        KNOWN_VERSIONS.iter().map(|i| i.version)
    }
}

struct VersionInfo {
    version: OsVersion,
    key: &'static str,
    name: &'static str,
}

const fn v(
    version: OsVersion,
    key: &'static str,
    name: &'static str,
) -> VersionInfo {
    VersionInfo { version, key, name }
}

#[rustfmt::skip]
const KNOWN_VERSIONS: &[VersionInfo] = &[
    v(OsVersion::MACOS_TIGER, "macos-tiger", "Mac OS X Tiger"),
    v(OsVersion::MACOS_LEOPARD, "macos-leopard", "Mac OS X Leopard"),
    v(OsVersion::MACOS_SNOW_LEOPARD, "macos-snow-leopard",
      "Mac OS X Snow Leopard"),
    v(OsVersion::WIN_311, "win-311", "Windows 3.11"),
    v(OsVersion::WIN_95, "win-95", "Windows 95"),
    v(OsVersion::WIN_98, "win-98", "Windows 98"),
    v(OsVersion::WIN_ME, "win-me", "Windows ME"),
    v(OsVersion::WIN_NT, "win-nt", "Windows NT"),
    v(OsVersion::WIN_2K, "win-2000", "Windows 2000"),
    v(OsVersion::WIN_XP, "win-xp", "Windows XP"),
    v(OsVersion::WIN_2003, "win-2003", "Windows Server 2003"),
    v(OsVersion::WIN_VISTA, "win-vista", "Windows Vista"),
    v(OsVersion::WIN_2008, "win-2008", "Windows Server 2008"),
    v(OsVersion::WIN_7, "win-7", "Windows 7"),
    v(OsVersion::WIN_8, "win-8", "Windows 8"),
    v(OsVersion::WIN_2012, "win-2012", "Windows Server 2012"),
    v(OsVersion::WIN_8_1, "win-8.1", "Windows 8.1"),
    v(OsVersion::WIN_10, "win-10", "Windows 10"),
    v(OsVersion::WIN_2016, "win-2016", "Windows Server 2016"),
    v(OsVersion::WIN_2019, "win-2019", "Windows Server 2019"),
    v(OsVersion::WIN_OTHER, "win-other", "Other Windows"),
    v(OsVersion::LIN_REDHAT, "lin-redhat", "Red Hat Enterprise Linux"),
    v(OsVersion::LIN_SUSE, "lin-suse", "SUSE Linux Enterprise"),
    v(OsVersion::LIN_MANDRAKE, "lin-mandrake", "Mandriva Linux"),
    v(OsVersion::LIN_KRNL_24, "lin-kernel-2.4", "Other Linux kernel 2.4"),
    v(OsVersion::LIN_KRNL_26, "lin-kernel-2.6", "Other Linux kernel 2.6"),
    v(OsVersion::LIN_DEBIAN, "lin-debian", "Debian GNU/Linux"),
    v(OsVersion::LIN_FEDORA, "lin-fedora", "Fedora Linux"),
    v(OsVersion::LIN_FEDORA_5, "lin-fedora-5", "Fedora Core 5 Linux"),
    v(OsVersion::LIN_XANDROS, "lin-xandros", "Xandros Linux"),
    v(OsVersion::LIN_UBUNTU, "lin-ubuntu", "Ubuntu Linux"),
    v(OsVersion::LIN_SLES9, "lin-sles9", "SUSE Linux Enterprise Server 9"),
    v(OsVersion::LIN_RHLES3, "lin-rhles3", "Red Hat Enterprise Server 3"),
    v(OsVersion::LIN_CENTOS, "lin-centos", "CentOS Linux"),
    v(OsVersion::LIN_RH_LEGACY, "lin-rh-legacy", "Red Hat Linux"),
    v(OsVersion::LIN_OPENSUSE, "lin-opensuse", "OpenSUSE Linux"),
    v(OsVersion::LIN_PSBM, "lin-psbm", "Cloud Server Linux"),
    v(OsVersion::LIN_MAGEIA, "lin-mageia", "Mageia Linux"),
    v(OsVersion::LIN_MINT, "lin-mint", "Mint Linux"),
    v(OsVersion::LIN_REDHAT_7, "lin-redhat-7", "Red Hat Enterprise Linux 7"),
    v(OsVersion::LIN_CENTOS_7, "lin-centos-7", "CentOS Linux 7"),
    v(OsVersion::LIN_VZLINUX, "lin-vzlinux", "Virtuozzo Linux"),
    v(OsVersion::LIN_VZLINUX_7, "lin-vzlinux-7", "Virtuozzo Linux 7"),
    v(OsVersion::LIN_SLES11, "lin-sles11", "SUSE Linux Enterprise Server 11"),
    v(OsVersion::LIN_SLES12, "lin-sles12", "SUSE Linux Enterprise Server 12"),
    v(OsVersion::LIN_CLOUDLINUX, "lin-cloudlinux", "CloudLinux"),
    v(OsVersion::LIN_CLOUDLINUX_7, "lin-cloudlinux-7", "CloudLinux 7"),
    v(OsVersion::LIN_OTHER, "lin-other", "Other Linux"),
    v(OsVersion::BSD_4X, "bsd-4", "FreeBSD 4.x"),
    v(OsVersion::BSD_5X, "bsd-5", "FreeBSD 5.x"),
    v(OsVersion::BSD_6X, "bsd-6", "FreeBSD 6.x"),
    v(OsVersion::BSD_7X, "bsd-7", "FreeBSD 7.x"),
    v(OsVersion::BSD_8X, "bsd-8", "FreeBSD 8.x"),
    v(OsVersion::BSD_OTHER, "bsd-other", "Other FreeBSD"),
    v(OsVersion::OS2_WARP3, "os2-warp3", "OS/2 Warp 3"),
    v(OsVersion::OS2_WARP4, "os2-warp4", "OS/2 Warp 4"),
    v(OsVersion::OS2_WARP45, "os2-warp45", "OS/2 Warp 4.5"),
    v(OsVersion::OS2_ECS11, "os2-ecs11", "eComStation 1.1"),
    v(OsVersion::OS2_ECS12, "os2-ecs12", "eComStation 1.2"),
    v(OsVersion::OS2_OTHER, "os2-other", "Other OS/2"),
    v(OsVersion::DOS_MS622, "dos-ms622", "MS-DOS 6.22"),
    v(OsVersion::DOS_OTHER, "dos-other", "Other DOS"),
    v(OsVersion::NET_4X, "netware-4", "NetWare 4.x"),
    v(OsVersion::NET_5X, "netware-5", "NetWare 5.x"),
    v(OsVersion::NET_6X, "netware-6", "NetWare 6.x"),
    v(OsVersion::NET_OTHER, "netware-other", "Other NetWare"),
    v(OsVersion::SOL_9, "sol-9", "Solaris 9"),
    v(OsVersion::SOL_10, "sol-10", "Solaris 10"),
    v(OsVersion::SOL_11, "sol-11", "Solaris 11"),
    v(OsVersion::SOL_OPEN, "sol-open", "OpenSolaris"),
    v(OsVersion::SOL_OTHER, "sol-other", "Other Solaris"),
    v(OsVersion::CHROMEOS_1X, "chromeos-1", "Chrome OS"),
    v(OsVersion::CHROMEOS_OTHER, "chromeos-other", "Other Chrome OS"),
    v(OsVersion::ANDROID_2X, "android-2", "Android 2.x"),
    v(OsVersion::ANDROID_3X, "android-3", "Android 3.x"),
    v(OsVersion::ANDROID_4_0, "android-4.0", "Android 4.0"),
    v(OsVersion::ANDROID_OTHER, "android-other", "Other Android"),
    v(OsVersion::OTH_QNX, "qnx", "QNX"),
    v(OsVersion::OTH_OPENSTEP, "openstep", "OpenStep"),
    v(OsVersion::OTH_OTHER, "other", "Other"),
];

fn info(version: OsVersion) -> Option<&'static VersionInfo> {
    KNOWN_VERSIONS.iter().find(|i| i.version == version)
}

impl FromStr for OsVersion {
    type Err = std::io::Error;

    /// Accepts either a version key (`"win-xp"`) or a hexadecimal code
    /// (`"0x0807"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(info) = KNOWN_VERSIONS.iter().find(|i| i.key == s) {
            return Ok(info.version);
        }

        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidInput,
                    format!("Unrecognized guest OS version {}", s),
                )
            })?;

        u16::from_str_radix(hex, 16).map(OsVersion).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Failed to parse guest OS version {}: {}", s, e),
            )
        })
    }
}

impl Display for OsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match info(*self) {
            Some(info) => f.write_str(info.name),
            None => {
                write!(f, "unknown {} version {:#06x}", self.family(), self.0)
            }
        }
    }
}

impl Serialize for OsVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.key() {
            Some(key) => serializer.serialize_str(key),
            None => serializer.serialize_str(&format!("{:#06x}", self.0)),
        }
    }
}

impl<'d> Deserialize<'d> for OsVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

/// The identity of the guest a configuration is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuestIdentity {
    pub family: OsFamily,
    pub version: OsVersion,
}

impl GuestIdentity {
    pub fn new(version: OsVersion) -> Self {
        Self { family: version.family(), version }
    }
}

impl From<OsVersion> for GuestIdentity {
    fn from(version: OsVersion) -> Self {
        Self::new(version)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_test::{assert_tokens, Token};
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn family_from_version() {
        assert_eq!(OsVersion::WIN_XP.family(), OsFamily::Windows);
        assert_eq!(OsVersion::LIN_OTHER.family(), OsFamily::Linux);
        assert_eq!(OsVersion::ANDROID_2X.family(), OsFamily::Android);
        assert_eq!(OsVersion::OTH_QNX.family(), OsFamily::Other);
        assert_eq!(OsVersion::from_code(0x4201).family(), OsFamily::Other);
    }

    #[test]
    fn family_codes_round_trip() {
        for family in OsFamily::iter() {
            assert_eq!(OsFamily::from_code(family.code()), family);
        }
    }

    #[test]
    fn known_versions_are_unique() {
        let codes: HashSet<_> = OsVersion::known().collect();
        assert_eq!(codes.len(), KNOWN_VERSIONS.len());

        let keys: HashSet<_> = KNOWN_VERSIONS.iter().map(|i| i.key).collect();
        assert_eq!(keys.len(), KNOWN_VERSIONS.len());
    }

    #[test]
    fn linux_like_families() {
        assert!(OsVersion::LIN_UBUNTU.is_linux_like());
        assert!(OsVersion::CHROMEOS_1X.is_linux_like());
        assert!(OsVersion::ANDROID_4_0.is_linux_like());
        assert!(!OsVersion::BSD_8X.is_linux_like());
    }

    #[test]
    fn version_validity() {
        assert!(OsVersion::SOL_10.is_valid_for(OsFamily::Solaris));
        assert!(!OsVersion::SOL_10.is_valid_for(OsFamily::Linux));
        assert!(!OsVersion::from_code(0x0E42).is_valid_for(OsFamily::Solaris));
    }

    #[test]
    fn version_from_str() {
        assert_eq!("win-xp".parse::<OsVersion>().unwrap(), OsVersion::WIN_XP);
        assert_eq!(
            "0x09ff".parse::<OsVersion>().unwrap(),
            OsVersion::LIN_OTHER
        );
        assert_eq!(
            "0x0E42".parse::<OsVersion>().unwrap(),
            OsVersion::from_code(0x0E42)
        );
        assert!("windows".parse::<OsVersion>().is_err());
        assert!("0xnope".parse::<OsVersion>().is_err());
        assert!("".parse::<OsVersion>().is_err());
    }

    #[test]
    fn version_serialization() {
        assert_tokens(&OsVersion::OS2_WARP45, &[Token::Str("os2-warp45")]);
        assert_tokens(&OsVersion::from_code(0x0E42), &[Token::Str("0x0e42")]);
    }

    #[test]
    fn identity_derives_family() {
        let guest = GuestIdentity::new(OsVersion::NET_5X);
        assert_eq!(guest.family, OsFamily::NetWare);
    }
}
