//! Configuration management for CIMap.
//!
//! Program behavior can be customized through INI-format configuration files
//! without touching the command line. Files are layered with the following
//! precedence (highest first):
//!
//! 1. Local configuration (`./cimap_config.cfg`)
//! 2. User configuration (`~/.config/cimap/cimap_config.cfg`)
//! 3. System configuration (`/etc/cimap/cimap_config.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [geometry]
//! reference_name = p-NDP
//! target_name = NDP
//!
//! [parser]
//! threshold = 0.2
//! default_roots = 7
//! energy_line_offset = 1
//!
//! [output]
//! directory = .
//! write_heatmap = true
//!
//! [plot]
//! width = 1000
//! row_height = 60
//! title_font_size = 14
//!
//! [labels]
//! 22222220u00000 = $\pi_2^*$
//!
//! [logging]
//! level = info
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use cimap::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Threshold: {}", settings.parser().threshold);
//! # Ok::<(), cimap::settings::ConfigError>(())
//! ```

use crate::heatmap::{HeatmapStyle, MAX_DIMENSION};
use crate::parser::{DEFAULT_ENERGY_LINE_OFFSET, DEFAULT_NUM_ROOTS, DEFAULT_THRESHOLD};
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Name of the settings file searched in each configuration location.
pub const SETTINGS_FILE_NAME: &str = "cimap_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading or writing configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

type IniSection = HashMap<String, Option<String>>;

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Geometry display names
    pub geometry: GeometrySettings,
    /// Log parser settings
    pub parser: ParserSettings,
    /// Output location and artifacts
    pub output: OutputSettings,
    /// Heatmap styling
    pub plot: PlotSettings,
    /// User-defined configuration labels (configuration string → label)
    pub labels: HashMap<String, String>,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Display names of the two compared geometries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometrySettings {
    /// Reference geometry name, first report column (default: "p-NDP")
    pub reference_name: String,
    /// Target geometry name, second report column (default: "NDP")
    pub target_name: String,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            reference_name: "p-NDP".to_string(),
            target_name: "NDP".to_string(),
        }
    }
}

/// Log parser settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParserSettings {
    /// Coefficient threshold |c| (default: 0.2)
    pub threshold: f64,
    /// Root count used when no `ciroot` line is found (default: 7)
    pub default_roots: usize,
    /// Lines between the root marker and the energy line (default: 1)
    pub energy_line_offset: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            default_roots: DEFAULT_NUM_ROOTS,
            energy_line_offset: DEFAULT_ENERGY_LINE_OFFSET,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    /// Directory receiving reports and heatmaps (default: ".")
    pub directory: PathBuf,
    /// Render heatmap images next to the reports (default: true)
    pub write_heatmap: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            write_heatmap: true,
        }
    }
}

/// Heatmap styling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotSettings {
    /// Image width in pixels (default: 1000)
    pub width: u32,
    /// Row height in pixels (default: 60)
    pub row_height: u32,
    /// Title font size in points (default: 14)
    pub title_font_size: f64,
    /// Row, column and axis label font size in points (default: 12)
    pub label_font_size: f64,
    /// Colorbar tick font size in points (default: 11)
    pub tick_font_size: f64,
    /// Cell annotation font size in points (default: 11)
    pub annotation_font_size: f64,
    /// TrueType font file (default: search common system fonts)
    pub font_path: Option<PathBuf>,
}

impl Default for PlotSettings {
    fn default() -> Self {
        let style = HeatmapStyle::default();
        Self {
            width: style.width,
            row_height: style.row_height,
            title_font_size: style.title_font_size,
            label_font_size: style.label_font_size,
            tick_font_size: style.tick_font_size,
            annotation_font_size: style.annotation_font_size,
            font_path: None,
        }
    }
}

impl PlotSettings {
    /// Builds the heatmap style described by these settings.
    pub fn to_style(&self) -> HeatmapStyle {
        HeatmapStyle {
            width: self.width,
            row_height: self.row_height,
            title_font_size: self.title_font_size,
            label_font_size: self.label_font_size,
            tick_font_size: self.tick_font_size,
            annotation_font_size: self.annotation_font_size,
            font_path: self.font_path.clone(),
            ..HeatmapStyle::default()
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: error, warn, info, debug, trace (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Parsed log level, falling back to `Info` for unknown names.
    pub fn level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(self.level.trim()).unwrap_or(log::LevelFilter::Info)
    }
}

/// Loads and exposes program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the standard locations.
    ///
    /// System, user and local files are applied in that order on top of the
    /// built-in defaults, so later files override earlier ones key by key. A
    /// file that fails to load is skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(SETTINGS_FILE_NAME))),
        ];

        for (kind, path) in candidates {
            let Some(path) = path else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            let mut layered = settings.clone();
            match Self::load_config(&path, &mut layered) {
                Ok(()) => {
                    settings = layered;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} configuration from: {}", kind, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} config from {}: {}",
                        kind,
                        path.display(),
                        e
                    );
                }
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads configuration from a single file on top of the built-in defaults.
    ///
    /// Unlike [`SettingsManager::load`], errors in the file are returned.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::load_config(path, &mut settings)?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Consumes the manager, returning the settings.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Gets the geometry settings.
    pub fn geometry(&self) -> &GeometrySettings {
        &self.settings.geometry
    }

    /// Gets the parser settings.
    pub fn parser(&self) -> &ParserSettings {
        &self.settings.parser
    }

    /// Gets the output settings.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Gets the plot settings.
    pub fn plot(&self) -> &PlotSettings {
        &self.settings.plot
    }

    /// Gets the user-defined labels.
    pub fn labels(&self) -> &HashMap<String, String> {
        &self.settings.labels
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Applies one INI file onto `settings`.
    fn load_config(path: &Path, settings: &mut Settings) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        let map = ini
            .read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        if let Some(section) = map.get("geometry") {
            Self::parse_geometry(section, &mut settings.geometry);
        }
        if let Some(section) = map.get("parser") {
            Self::parse_parser(section, &mut settings.parser)?;
        }
        if let Some(section) = map.get("output") {
            Self::parse_output(section, &mut settings.output)?;
        }
        if let Some(section) = map.get("plot") {
            Self::parse_plot(section, &mut settings.plot)?;
        }
        if let Some(section) = map.get("labels") {
            for (config, label) in section {
                if let Some(label) = label {
                    settings.labels.insert(config.clone(), label.clone());
                }
            }
        }
        if let Some(section) = map.get("logging") {
            if let Some(Some(level)) = section.get("level") {
                settings.logging.level = level.clone();
            }
        }

        Ok(())
    }

    fn parse_geometry(section: &IniSection, geometry: &mut GeometrySettings) {
        if let Some(Some(name)) = section.get("reference_name") {
            geometry.reference_name = name.clone();
        }
        if let Some(Some(name)) = section.get("target_name") {
            geometry.target_name = name.clone();
        }
    }

    fn parse_parser(section: &IniSection, parser: &mut ParserSettings) -> Result<(), ConfigError> {
        if let Some(threshold) = parse_value::<f64>(section, "threshold")? {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid threshold: {}",
                    threshold
                )));
            }
            parser.threshold = threshold;
        }
        if let Some(default_roots) = parse_value::<usize>(section, "default_roots")? {
            if default_roots == 0 {
                return Err(ConfigError::InvalidValue(
                    "Invalid default_roots: 0".to_string(),
                ));
            }
            parser.default_roots = default_roots;
        }
        if let Some(offset) = parse_value::<usize>(section, "energy_line_offset")? {
            if offset == 0 {
                return Err(ConfigError::InvalidValue(
                    "Invalid energy_line_offset: 0".to_string(),
                ));
            }
            parser.energy_line_offset = offset;
        }
        Ok(())
    }

    fn parse_output(section: &IniSection, output: &mut OutputSettings) -> Result<(), ConfigError> {
        if let Some(Some(directory)) = section.get("directory") {
            output.directory = PathBuf::from(directory);
        }
        if let Some(write_heatmap) = parse_value::<bool>(section, "write_heatmap")? {
            output.write_heatmap = write_heatmap;
        }
        Ok(())
    }

    fn parse_plot(section: &IniSection, plot: &mut PlotSettings) -> Result<(), ConfigError> {
        if let Some(width) = parse_value::<u32>(section, "width")? {
            plot.width = check_dimension("width", width)?;
        }
        if let Some(row_height) = parse_value::<u32>(section, "row_height")? {
            plot.row_height = check_dimension("row_height", row_height)?;
        }
        if let Some(size) = parse_value::<f64>(section, "title_font_size")? {
            plot.title_font_size = size;
        }
        if let Some(size) = parse_value::<f64>(section, "label_font_size")? {
            plot.label_font_size = size;
        }
        if let Some(size) = parse_value::<f64>(section, "tick_font_size")? {
            plot.tick_font_size = size;
        }
        if let Some(size) = parse_value::<f64>(section, "annotation_font_size")? {
            plot.annotation_font_size = size;
        }
        if let Some(Some(font_path)) = section.get("font_path") {
            if !font_path.is_empty() {
                plot.font_path = Some(PathBuf::from(font_path));
            }
        }
        Ok(())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/cimap").join(SETTINGS_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("cimap").join(SETTINGS_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("cimap")
                    .join(SETTINGS_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("cimap").join(SETTINGS_FILE_NAME))
        }
    }
}

fn parse_value<T: FromStr>(section: &IniSection, key: &str) -> Result<Option<T>, ConfigError> {
    match section.get(key) {
        Some(Some(raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid {}: {}", key, raw))),
        _ => Ok(None),
    }
}

fn check_dimension(key: &str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 || value > MAX_DIMENSION {
        return Err(ConfigError::InvalidValue(format!(
            "Invalid {}: {} (must be between 1 and {})",
            key, value, MAX_DIMENSION
        )));
    }
    Ok(value)
}

impl SettingsManager {
    /// Writes a commented settings template with all options at their defaults.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let geometry = GeometrySettings::default();
        let parser = ParserSettings::default();
        let output = OutputSettings::default();
        let plot = PlotSettings::default();
        let logging = LoggingSettings::default();

        format!(
            r#"# CIMap Configuration File
#
# Configuration files are loaded in hierarchical order, later files
# overriding earlier ones key by key:
#
# 1. System config directory (/etc/cimap/cimap_config.cfg on Unix, %PROGRAMDATA%/cimap/cimap_config.cfg on Windows)
# 2. User config directory (~/.config/cimap/cimap_config.cfg on Unix, %APPDATA%/cimap/cimap_config.cfg on Windows)
# 3. Current working directory (./cimap_config.cfg) - highest priority
#
# Missing sections or values use the built-in defaults shown below.
# Command-line arguments (thres=, name1=, name2=, outdir=) override this file.

[geometry]
# Display name of the reference geometry (geo2=, first report column)
reference_name = {}

# Display name of the target geometry (geo1=, second report column)
target_name = {}

[parser]
# Keep configurations with |coefficient| >= threshold (default: 0.2)
threshold = {}

# Number of roots assumed when no 'ciroot' line is found (default: 7)
default_roots = {}

# Lines between 'printout of CI-coefficients' and the 'energy=' line (default: 1)
energy_line_offset = {}

[output]
# Directory for reports and heatmaps (default: current directory)
directory = {}

# Render a heatmap image for every root (default: true)
write_heatmap = {}

[plot]
# Image width and height of one configuration row, in pixels
width = {}
row_height = {}

# Font sizes in points
title_font_size = {}
label_font_size = {}
tick_font_size = {}
annotation_font_size = {}

# TrueType font for heatmap text (default: search common system fonts)
# font_path = /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf

[labels]
# Extra configuration labels, overriding the built-in table
# 22222220u00000 = $\pi_2^*$

[logging]
# Log level: error, warn, info, debug, trace (default: info)
level = {}
"#,
            geometry.reference_name,
            geometry.target_name,
            parser.threshold,
            parser.default_roots,
            parser.energy_line_offset,
            output.directory.display(),
            output.write_heatmap,
            plot.width,
            plot.row_height,
            plot.title_font_size,
            plot.label_font_size,
            plot.tick_font_size,
            plot.annotation_font_size,
            logging.level,
        )
    }
}
