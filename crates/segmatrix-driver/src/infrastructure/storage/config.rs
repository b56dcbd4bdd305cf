//! TOML-based topology configuration loading.
//!
//! A configuration file holds one or more named topologies:
//!
//! ```toml
//! [configurations."24x4"]
//! name = "24x4 Horizontal"
//! kind = "physical"
//! module_digit_width = 4
//! module_digit_height = 4
//! total_width = 24
//! total_height = 4
//!
//! [[configurations."24x4".buses]]
//! id = 1
//!
//! [[configurations."24x4".buses.expanders]]
//! address = "0x77"
//! [configurations."24x4".buses.expanders.channels]
//! "0" = [["0x70", "0x71", "0x72", "0x73", "0x74", "0x75"]]
//! ```
//!
//! Device addresses are written as hexadecimal strings, matching how they
//! appear on schematics; this loader parses them to integers before the
//! display layer ever sees them. An expander entry without an `address`
//! means the modules attach directly to the bus. An expander with a
//! non-empty `rows` table gets explicit-rows placement; everything else is
//! scan-filled. The choice happens here, once, at load time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use segmatrix_core::{
    domain::layout, BusTopology, DisplayKind, DisplayTopology, ExpanderTopology, ModuleGrid,
    Placement, RowPlacement, TopologyError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// No configuration with the requested name exists in the file.
    #[error("configuration not found: {0}")]
    TopologyNotFound(String),

    /// A device address string is not valid hexadecimal.
    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    /// A channel key is not a valid channel number.
    #[error("invalid channel number: {0:?}")]
    InvalidChannel(String),

    /// The `kind` field is neither `physical` nor `emulated`.
    #[error("invalid display kind: {0:?}")]
    InvalidKind(String),

    /// A module cannot carry more digits than its frame buffer holds.
    #[error("module geometry {width}x{height} exceeds {max} digits")]
    ModuleGeometry {
        width: usize,
        height: usize,
        max: usize,
    },

    /// The topology's module grids do not tile the panel.
    #[error("topology failed coverage validation: {0}")]
    Layout(#[from] TopologyError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file: named topologies.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub configurations: BTreeMap<String, TopologyConfig>,
}

/// One named topology as written in TOML, before address parsing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TopologyConfig {
    /// Human-readable label.
    pub name: String,
    /// `"physical"` or `"emulated"`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Digits per module, horizontal.
    pub module_digit_width: usize,
    /// Digits per module, vertical.
    pub module_digit_height: usize,
    /// Panel width in digits.
    pub total_width: usize,
    /// Panel height in digits.
    pub total_height: usize,
    /// Buses in declaration order.
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

/// One bus and its expander chain.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BusConfig {
    /// Kernel adapter number (`/dev/i2c-<id>`).
    pub id: u8,
    #[serde(default)]
    pub expanders: Vec<ExpanderConfig>,
}

/// One channel-expander entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExpanderConfig {
    /// Expander bus address as a hex string; absent = no multiplexer,
    /// modules attach directly to the bus.
    #[serde(default)]
    pub address: Option<String>,
    /// Channel number (as a string key) -> rows of module address strings.
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<Vec<String>>>,
    /// Optional explicit row placements for strip-wired panels.
    #[serde(default)]
    pub rows: BTreeMap<String, RowConfig>,
}

/// Placement of one independently wired row strip.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RowConfig {
    pub channel: u8,
    #[serde(default)]
    pub row_offset: usize,
    #[serde(default)]
    pub col_offset: usize,
}

fn default_kind() -> String {
    "physical".to_string()
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Loads the named topology from `path`, parsing addresses and validating
/// digit coverage.
///
/// # Errors
///
/// Returns [`ConfigError::TopologyNotFound`] for unknown names and the
/// respective parse/validation errors otherwise.
pub fn load_topology(path: &Path, name: &str) -> Result<DisplayTopology, ConfigError> {
    let file = load_config_file(path)?;
    let config = file
        .configurations
        .get(name)
        .ok_or_else(|| ConfigError::TopologyNotFound(name.to_string()))?;
    let topology = build_topology(config)?;
    info!(
        "loaded topology {:?}: {}x{} digits, {} modules",
        topology.name,
        topology.total_width,
        topology.total_height,
        topology.all_addresses().len()
    );
    Ok(topology)
}

/// Converts a raw [`TopologyConfig`] into the domain model.
///
/// # Errors
///
/// Returns [`ConfigError`] for malformed addresses or channel keys and for
/// topologies whose module grids do not tile the panel exactly.
pub fn build_topology(config: &TopologyConfig) -> Result<DisplayTopology, ConfigError> {
    let kind = match config.kind.as_str() {
        "physical" => DisplayKind::Physical,
        "emulated" => DisplayKind::Emulated,
        other => return Err(ConfigError::InvalidKind(other.to_string())),
    };

    if config.module_digit_width * config.module_digit_height > segmatrix_core::DIGITS_PER_MODULE {
        return Err(ConfigError::ModuleGeometry {
            width: config.module_digit_width,
            height: config.module_digit_height,
            max: segmatrix_core::DIGITS_PER_MODULE,
        });
    }

    let mut buses = BTreeMap::new();
    for bus_config in &config.buses {
        let mut expanders = Vec::new();
        for expander_config in &bus_config.expanders {
            let address = expander_config
                .address
                .as_deref()
                .map(parse_address)
                .transpose()?;

            let mut channels: BTreeMap<u8, ModuleGrid> = BTreeMap::new();
            for (channel_key, grid_config) in &expander_config.channels {
                let channel = parse_channel(channel_key)?;
                let grid = grid_config
                    .iter()
                    .map(|row| row.iter().map(|a| parse_address(a)).collect())
                    .collect::<Result<ModuleGrid, _>>()?;
                channels.insert(channel, grid);
            }

            let placement = if expander_config.rows.is_empty() {
                Placement::ScanFill
            } else {
                let mut rows = BTreeMap::new();
                for (row_key, row_config) in &expander_config.rows {
                    let row_id = parse_row_id(row_key)?;
                    if row_config.channel >= 8 {
                        return Err(ConfigError::InvalidChannel(row_config.channel.to_string()));
                    }
                    rows.insert(
                        row_id,
                        RowPlacement {
                            channel: row_config.channel,
                            row_offset: row_config.row_offset,
                            col_offset: row_config.col_offset,
                        },
                    );
                }
                Placement::ExplicitRows(rows)
            };

            expanders.push(ExpanderTopology {
                address,
                channels,
                placement,
            });
        }
        buses.insert(bus_config.id, BusTopology { expanders });
    }

    let topology = DisplayTopology {
        name: config.name.clone(),
        kind,
        buses,
        module_digit_width: config.module_digit_width,
        module_digit_height: config.module_digit_height,
        total_width: config.total_width,
        total_height: config.total_height,
    };

    layout::validate(&topology)?;
    Ok(topology)
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Parses a hexadecimal device address, with or without a `0x` prefix.
fn parse_address(s: &str) -> Result<u8, ConfigError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidAddress(s.to_string()))
}

/// Parses a decimal channel key. The expander control byte has one bit per
/// channel, so only 0–7 are addressable.
fn parse_channel(s: &str) -> Result<u8, ConfigError> {
    match s.parse::<u8>() {
        Ok(channel) if channel < 8 => Ok(channel),
        _ => Err(ConfigError::InvalidChannel(s.to_string())),
    }
}

/// Parses a decimal row-id key. Row ids are synthetic labels and carry no
/// range restriction.
fn parse_row_id(s: &str) -> Result<u8, ConfigError> {
    s.parse::<u8>()
        .map_err(|_| ConfigError::InvalidChannel(s.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
