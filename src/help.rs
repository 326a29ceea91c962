//! Built-in help for CIMap
//!
//! Documents the command line, the `ci` command and every key of the
//! `cimap_config.cfg` settings file.

/// Settings file section a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// `[geometry]` display names
    Geometry,
    /// `[parser]` log parsing options
    Parser,
    /// `[output]` output files
    Output,
    /// `[plot]` heatmap styling
    Plot,
    /// `[logging]` diagnostics
    Logging,
}

impl KeywordCategory {
    /// All categories in the order they appear in the settings file.
    pub const ALL: [KeywordCategory; 5] = [
        KeywordCategory::Geometry,
        KeywordCategory::Parser,
        KeywordCategory::Output,
        KeywordCategory::Plot,
        KeywordCategory::Logging,
    ];

    /// INI section name.
    pub fn section(self) -> &'static str {
        match self {
            KeywordCategory::Geometry => "geometry",
            KeywordCategory::Parser => "parser",
            KeywordCategory::Output => "output",
            KeywordCategory::Plot => "plot",
            KeywordCategory::Logging => "logging",
        }
    }
}

/// Documentation entry for a single settings keyword.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Key name inside its section
    pub name: &'static str,
    /// Section of the key
    pub category: KeywordCategory,
    /// What the key controls
    pub description: &'static str,
    /// Built-in default
    pub default_value: Option<&'static str>,
    /// Command-line argument overriding the key, if any
    pub cli_override: Option<&'static str>,
}

/// Every documented settings keyword.
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "reference_name",
        category: KeywordCategory::Geometry,
        description: "Display name of the reference geometry (geo2), first report column",
        default_value: Some("p-NDP"),
        cli_override: Some("name2="),
    },
    Keyword {
        name: "target_name",
        category: KeywordCategory::Geometry,
        description: "Display name of the target geometry (geo1), second report column",
        default_value: Some("NDP"),
        cli_override: Some("name1="),
    },
    Keyword {
        name: "threshold",
        category: KeywordCategory::Parser,
        description: "Keep configurations with |coefficient| >= threshold",
        default_value: Some("0.2"),
        cli_override: Some("thres="),
    },
    Keyword {
        name: "default_roots",
        category: KeywordCategory::Parser,
        description: "Root count assumed when the log has no usable 'ciroot' line",
        default_value: Some("7"),
        cli_override: None,
    },
    Keyword {
        name: "energy_line_offset",
        category: KeywordCategory::Parser,
        description: "Lines between the CI-coefficients header and its 'energy=' line",
        default_value: Some("1"),
        cli_override: None,
    },
    Keyword {
        name: "directory",
        category: KeywordCategory::Output,
        description: "Directory receiving reports and heatmaps (created if missing)",
        default_value: Some("."),
        cli_override: Some("outdir="),
    },
    Keyword {
        name: "write_heatmap",
        category: KeywordCategory::Output,
        description: "Render a PNG heatmap for every root",
        default_value: Some("true"),
        cli_override: None,
    },
    Keyword {
        name: "width",
        category: KeywordCategory::Plot,
        description: "Heatmap width in pixels",
        default_value: Some("1000"),
        cli_override: None,
    },
    Keyword {
        name: "row_height",
        category: KeywordCategory::Plot,
        description: "Height of one configuration row in pixels",
        default_value: Some("60"),
        cli_override: None,
    },
    Keyword {
        name: "title_font_size",
        category: KeywordCategory::Plot,
        description: "Title font size",
        default_value: Some("14"),
        cli_override: None,
    },
    Keyword {
        name: "label_font_size",
        category: KeywordCategory::Plot,
        description: "Row, column and axis label font size",
        default_value: Some("12"),
        cli_override: None,
    },
    Keyword {
        name: "tick_font_size",
        category: KeywordCategory::Plot,
        description: "Colorbar tick label font size",
        default_value: Some("11"),
        cli_override: None,
    },
    Keyword {
        name: "annotation_font_size",
        category: KeywordCategory::Plot,
        description: "Cell annotation font size",
        default_value: Some("11"),
        cli_override: None,
    },
    Keyword {
        name: "font_path",
        category: KeywordCategory::Plot,
        description: "TrueType font used for heatmap text; common system fonts are searched if unset",
        default_value: None,
        cli_override: None,
    },
    Keyword {
        name: "level",
        category: KeywordCategory::Logging,
        description: "Log level: off, error, warn, info, debug, trace",
        default_value: Some("info"),
        cli_override: None,
    },
];

/// Print global help
pub fn print_global_help() {
    println!("CIMap - CI configuration weight comparison for two geometries");
    println!();
    println!("USAGE:");
    println!("    cimap geo1=<target.log> geo2=<reference.log> [thres=0.2] [name1=..] [name2=..] [outdir=..]");
    println!();
    println!("ARGUMENTS:");
    println!("    geo1=<file>          OpenMolcas log of the target geometry (required)");
    println!("    geo2=<file>          OpenMolcas log of the reference geometry (required)");
    println!("    thres=<value>        Coefficient threshold |c|, default 0.2");
    println!("    name1=<name>         Display name of the target geometry");
    println!("    name2=<name>         Display name of the reference geometry");
    println!("    outdir=<dir>         Output directory");
    println!();
    println!("COMMANDS:");
    println!("    ci cimap_config.cfg  Create a settings template file");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords, ci");
    println!();
    println!("OUTPUT (per root with configurations above the threshold):");
    println!("    config_weights_root<N>_thres<T>.txt");
    println!("    configuration_heatmap_root<N>_thres<T>.png");
    println!();
    println!("CONFIGURATION FILE:");
    println!("    Supported locations:");
    println!("      - ./cimap_config.cfg (local, highest priority)");
    println!("      - ~/.config/cimap/cimap_config.cfg (user)");
    println!("      - /etc/cimap/cimap_config.cfg (system)");
    println!("    Command-line arguments override the file.");
    println!();
    println!("EXAMPLES:");
    println!("    cimap geo1=ndp.log geo2=pndp.log");
    println!("    cimap geo1=ndp.log geo2=pndp.log thres=0.1 outdir=results");
    println!("    cimap --help keywords");
    println!();
}

/// Print help for 'ci' command
pub fn print_ci_help() {
    println!("Create Settings Template (ci) Command");
    println!("═════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    cimap ci cimap_config.cfg");
    println!();
    println!("DESCRIPTION:");
    println!("    Writes a commented settings file with every key at its default.");
    println!("    An existing file is never overwritten.");
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("KEYWORD REFERENCE");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();

    for category in KeywordCategory::ALL {
        print_category_header(category);
        println!();

        for keyword in keywords_in(category) {
            print_keyword(keyword);
            println!();
        }
    }

    println!("[labels]");
    println!("{}", "─".repeat(76));
    println!("<configuration string> = <label>");
    println!("    Adds or overrides a configuration label, e.g.");
    println!("    2222222u000000 = $\\pi_1^*$");
    println!();
}

/// Prints help for `topic`, or the global help for unknown topics.
pub fn print_topic_help(topic: Option<&str>) {
    match topic {
        Some("keywords") => print_keyword_help(),
        Some("ci") => print_ci_help(),
        Some(other) => {
            eprintln!("Unknown help topic: {}", other);
            print_global_help();
        }
        None => print_global_help(),
    }
}

/// Keywords of one section, in declaration order.
pub fn keywords_in(category: KeywordCategory) -> impl Iterator<Item = &'static Keyword> {
    KEYWORDS
        .iter()
        .filter(move |keyword| keyword.category == category)
}

/// Print category header
fn print_category_header(category: KeywordCategory) {
    println!("[{}]", category.section());
    println!("{}", "─".repeat(76));
}

/// Print single keyword
fn print_keyword(keyword: &Keyword) {
    println!("{}", keyword.name);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(flag) = keyword.cli_override {
        println!("    Command line: {}", flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_every_category_has_keywords() {
        for category in KeywordCategory::ALL {
            assert!(keywords_in(category).count() > 0, "{:?}", category);
        }
    }

    #[test]
    fn test_documented_defaults_match_settings() {
        let settings = Settings::default();
        let default_of = |name: &str| {
            KEYWORDS
                .iter()
                .find(|keyword| keyword.name == name)
                .and_then(|keyword| keyword.default_value)
                .unwrap()
        };

        assert_eq!(default_of("reference_name"), settings.geometry.reference_name);
        assert_eq!(default_of("target_name"), settings.geometry.target_name);
        assert_eq!(
            default_of("threshold").parse::<f64>().unwrap(),
            settings.parser.threshold
        );
        assert_eq!(
            default_of("default_roots").parse::<usize>().unwrap(),
            settings.parser.default_roots
        );
        assert_eq!(
            default_of("width").parse::<u32>().unwrap(),
            settings.plot.width
        );
        assert_eq!(default_of("level"), settings.logging.level);
    }
}
