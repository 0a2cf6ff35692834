// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use slog::{o, Drain, Level, Logger};

use vmdefaults::netquery::StaticNetworkList;
use vmdefaults::policy::default_device_set;
use vmdefaults::sizing;
use vmdefaults::{
    AppMode, BuiltinGuestFeatures, ConfigurationSynthesizer, DeviceKind,
    Firmware, OsVersion, SynthesisRequest,
};

#[derive(Debug, Parser)]
#[clap(about, version)]
/// Synthesize default virtual hardware for a guest OS
struct Opt {
    /// Host description (TOML)
    #[clap(short = 'H', long, action)]
    host: Option<PathBuf>,

    /// Enable debugging
    #[clap(short, long, action)]
    debug: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a complete default configuration as JSON
    Create {
        /// Guest OS version key (e.g. "win-10") or code (e.g. "0x080f")
        #[clap(action)]
        os: OsVersion,

        /// Leave out default devices and the boot order
        #[clap(long, action)]
        no_devices: bool,

        /// Boot with EFI firmware instead of the host file's choice
        #[clap(long, action)]
        efi: bool,
    },

    /// List the device kinds a default configuration would contain
    Devices {
        #[clap(action)]
        os: OsVersion,

        /// Use server application mode instead of the host file's choice
        #[clap(long, action)]
        server: bool,
    },

    /// Print default RAM, disk and video sizes
    Sizes {
        #[clap(action)]
        os: OsVersion,
    },

    /// List every known guest OS version
    Versions,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Sizes {
    os_version: OsVersion,
    ram_mb: u32,
    hdd_mb: u32,
    video_mb: u32,
}

#[derive(Serialize)]
struct VersionEntry {
    key: &'static str,
    code: String,
    name: String,
}

fn create_logger(opt: &Opt) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level = if opt.debug { Level::Debug } else { Level::Info };
    let drain = slog::LevelFilter(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

fn load_host(opt: &Opt) -> anyhow::Result<vmdefaults_host_toml::Config> {
    match &opt.host {
        Some(path) => vmdefaults_host_toml::parse(path).with_context(|| {
            format!("failed to parse host description {}", path.display())
        }),
        None => Ok(vmdefaults_host_toml::Config::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value)
        .context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    let log = create_logger(&opt);
    let host_cfg = load_host(&opt)?;

    match opt.cmd {
        Command::Create { os, no_devices, efi } => {
            let features = BuiltinGuestFeatures;
            let networks = StaticNetworkList(host_cfg.networks.clone());
            let synth = ConfigurationSynthesizer::new(
                host_cfg.host.as_ref(),
                &features,
                host_cfg.app_mode,
                &log,
            )
            .with_network_query(&networks);

            let req = SynthesisRequest {
                os_version: os,
                create_devices: !no_devices,
                firmware: if efi { Firmware::Efi } else { host_cfg.firmware },
            };
            let synthesis = synth.create_default_config(&req).await;
            print_json(&synthesis)?;
        }
        Command::Devices { os, server } => {
            let mode = if server { AppMode::Server } else { host_cfg.app_mode };
            let kinds: Vec<DeviceKind> = default_device_set(os, mode);
            print_json(&kinds)?;
        }
        Command::Sizes { os } => {
            let features = BuiltinGuestFeatures;
            let synth = ConfigurationSynthesizer::new(
                host_cfg.host.as_ref(),
                &features,
                host_cfg.app_mode,
                &log,
            );
            let mut req = SynthesisRequest::new(os);
            req.create_devices = false;
            let cfg = synth.create_default_config(&req).await.config;
            print_json(&Sizes {
                os_version: os,
                ram_mb: cfg.memory.ram_mb,
                hdd_mb: sizing::default_hdd_size(os),
                video_mb: cfg.video.memory_mb,
            })?;
        }
        Command::Versions => {
            let versions: Vec<VersionEntry> = OsVersion::known()
                .filter_map(|v| {
                    Some(VersionEntry {
                        key: v.key()?,
                        code: format!("{:#06x}", v.code()),
                        name: v.to_string(),
                    })
                })
                .collect();
            print_json(&versions)?;
        }
    }

    Ok(())
}
