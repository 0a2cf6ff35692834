// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TOML description of a host, used to drive synthesis outside of the
//! product that normally gathers host capabilities.

use std::path::Path;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use vmdefaults::config::{AppMode, Firmware};
use vmdefaults::host::HostCapabilitySnapshot;
use vmdefaults::netquery::VirtualNetwork;

/// Synthesis inputs read from a host description file.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub app_mode: AppMode,

    #[serde(default)]
    pub firmware: Firmware,

    /// Absent when the host is unknown; synthesis then uses fallbacks.
    #[serde(default)]
    pub host: Option<HostCapabilitySnapshot>,

    #[serde(default, rename = "network")]
    pub networks: Vec<VirtualNetwork>,
}

/// Errors which may be returned when parsing a host description.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    fn validate(&self) -> Result<(), ParseError> {
        let Some(host) = &self.host else {
            return Ok(());
        };
        if host.cpus == 0 {
            return Err(ParseError::InvalidValue(
                "host.cpus".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if host.ram_mb == 0 {
            return Err(ParseError::InvalidValue(
                "host.ram-mb".to_string(),
                "must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a TOML string into a host description.
pub fn from_str(contents: &str) -> Result<Config, ParseError> {
    let cfg = toml::from_str::<Config>(contents)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parses a TOML file into a host description.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Config, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    from_str(&contents)
}
