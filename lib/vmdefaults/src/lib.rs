// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthesis of default virtual-hardware configurations.
//!
//! Given a guest OS version, an optional snapshot of host capabilities and
//! the product's application mode, this crate decides the virtual hardware
//! a new VM should get: CPU count, RAM, video memory, the default device
//! set with every storage device placed on a free interface slot, and the
//! firmware boot order.
//!
//! The entry point is [`ConfigurationSynthesizer`]. Individual devices can
//! be added to an existing configuration with [`DefaultDeviceFactory`].

pub mod alloc;
pub mod boot;
pub mod config;
pub mod devices;
pub mod features;
pub mod guest;
pub mod host;
pub mod netquery;
pub mod policy;
pub mod sizing;
pub mod synth;

pub use config::{AppMode, DeviceKind, Firmware, VmConfiguration};
pub use devices::{AddDeviceError, DefaultDeviceFactory};
pub use features::{BuiltinGuestFeatures, GuestFeatureQuery};
pub use guest::{GuestIdentity, OsFamily, OsVersion};
pub use host::{CapabilityView, HostCapabilitySnapshot};
pub use synth::{
    ConfigurationSynthesizer, DeviceFailure, Synthesis, SynthesisRequest,
};
