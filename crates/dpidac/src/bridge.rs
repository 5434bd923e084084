// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Bridge context
//!
//! [`Bridge`] owns the configuration of one DPI-to-VGA output and the EDID it
//! currently publishes. Each [`Bridge::attach`] runs a full resolution pass
//! (timings document, forced mode, built-ins, CEA baseline), selects the
//! preferred mode and synthesizes a fresh EDID. The previous publication is
//! replaced only once the new one is complete, so a failed attach leaves the
//! old blob in place.

use std::path::{Path, PathBuf};

use crate::bus_format::BusFormat;
use crate::catalog::{build_catalog, select_preferred, ModeCatalog, OrderedSources};
use crate::edid::{synthesize_edid, DisplayIdentity, EdidBlob};
use crate::mode::DesiredModeSpec;
use crate::timing::read_timings_document;
use crate::Error;

/// Preferred mode used when none is configured
pub const DEFAULT_PREFERRED_MODE: &str = "1080p60";

/// Configuration of one bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    forced_mode: Option<String>,
    preferred_mode: Option<String>,
    bus_format: BusFormat,
    timings_path: Option<PathBuf>,
    identity: DisplayIdentity,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            forced_mode: None,
            preferred_mode: Some(DEFAULT_PREFERRED_MODE.to_string()),
            bus_format: BusFormat::default(),
            timings_path: None,
            identity: DisplayIdentity::default(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forced_mode(&self) -> Option<&str> {
        self.forced_mode.as_deref()
    }

    pub fn preferred_mode(&self) -> Option<&str> {
        self.preferred_mode.as_deref()
    }

    pub fn bus_format(&self) -> BusFormat {
        self.bus_format
    }

    pub fn timings_path(&self) -> Option<&Path> {
        self.timings_path.as_deref()
    }

    pub fn identity(&self) -> &DisplayIdentity {
        &self.identity
    }

    /// Set the forced mode descriptor. An empty string clears it.
    pub fn set_forced_mode(&mut self, descriptor: &str) {
        self.forced_mode = non_empty(descriptor);
    }

    /// Set the preferred mode descriptor. An empty string clears it.
    pub fn set_preferred_mode(&mut self, descriptor: &str) {
        self.preferred_mode = non_empty(descriptor);
    }

    /// Set the bus format by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedBusFormat`] and keeps the current format
    /// when `name` is not one of [`BusFormat::ALL`].
    pub fn set_bus_format(&mut self, name: &str) -> Result<(), Error> {
        match name.parse::<BusFormat>() {
            Ok(format) => {
                self.bus_format = format;
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "ignoring bus format {:?}, keeping {}",
                    name,
                    self.bus_format
                );
                Err(err)
            }
        }
    }

    pub fn set_timings_path(&mut self, path: Option<PathBuf>) {
        self.timings_path = path;
    }

    pub fn set_identity(&mut self, identity: DisplayIdentity) {
        self.identity = identity;
    }

    pub fn with_forced_mode(mut self, descriptor: &str) -> Self {
        self.set_forced_mode(descriptor);
        self
    }

    pub fn with_preferred_mode(mut self, descriptor: &str) -> Self {
        self.set_preferred_mode(descriptor);
        self
    }

    pub fn with_timings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.timings_path = Some(path.into());
        self
    }

    pub fn with_identity(mut self, identity: DisplayIdentity) -> Self {
        self.identity = identity;
        self
    }
}

/// What an attached bridge hands to the display pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub catalog: ModeCatalog,
    pub edid: EdidBlob,
}

/// Display-pipeline view of the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
}

/// One bridge instance
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    published: Option<Published>,
}

impl Bridge {
    pub fn create(config: BridgeConfig) -> Self {
        log::debug!(
            "bridge created, bus format {} ({})",
            config.bus_format,
            config.bus_format.media_bus_name()
        );
        Bridge {
            config,
            published: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut BridgeConfig {
        &mut self.config
    }

    /// There is no hot-plug detect line, the output is always connected.
    pub fn connector_status(&self) -> ConnectorStatus {
        ConnectorStatus::Connected
    }

    pub fn interlace_allowed(&self) -> bool {
        true
    }

    pub fn doublescan_allowed(&self) -> bool {
        true
    }

    /// The current publication, if attached
    pub fn published(&self) -> Option<&Published> {
        self.published.as_ref()
    }

    fn sources(&self) -> OrderedSources {
        let document = self
            .config
            .timings_path
            .as_deref()
            .map(read_timings_document)
            .filter(|document| !document.is_empty());

        OrderedSources {
            forced_mode: self.config.forced_mode.clone(),
            timings_document: document,
        }
    }

    fn preferred_spec(&self) -> Option<DesiredModeSpec> {
        let descriptor = self.config.preferred_mode.as_deref()?;
        match DesiredModeSpec::parse(descriptor) {
            Ok(spec) => Some(spec),
            Err(err) => {
                log::warn!("ignoring preferred mode: {}", err);
                None
            }
        }
    }

    /// Run a resolution pass and return the catalog with its preferred entry
    /// selected. Nothing is published.
    pub fn resolve_modes(&self) -> ModeCatalog {
        let mut catalog = build_catalog(&self.sources());
        select_preferred(&mut catalog, self.preferred_spec().as_ref());
        catalog
    }

    /// Resolve modes, synthesize the EDID and publish both.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] when the EDID buffer cannot be
    /// allocated. The previous publication, if any, stays in place.
    pub fn attach(&mut self) -> Result<&Published, Error> {
        let catalog = self.resolve_modes();

        let label = catalog
            .preferred()
            .and_then(|mode| mode.cea_label())
            .or(self.config.preferred_mode.as_deref())
            .unwrap_or(DEFAULT_PREFERRED_MODE)
            .to_string();
        let edid = synthesize_edid(&self.config.identity, &label)?;

        if self.published.take().is_some() {
            log::debug!("retired previous EDID");
        }
        log::info!(
            "published {} modes, preferred {}",
            catalog.len(),
            catalog
                .preferred()
                .map(|mode| mode.display_name())
                .unwrap_or("none")
        );

        Ok(self.published.insert(Published { catalog, edid }))
    }

    /// Take the current publication, leaving the bridge detached.
    pub fn detach(&mut self) -> Option<Published> {
        let published = self.published.take();
        if published.is_some() {
            log::info!("bridge detached, EDID retired");
        }
        published
    }

    pub fn destroy(mut self) {
        self.detach();
        log::debug!("bridge destroyed");
    }
}
