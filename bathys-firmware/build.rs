//! Build script for bathys-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates telemetry.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keys accepted per section, with their expected kind
const LINK_KEYS: &[(&str, Kind)] = &[
    ("enabled", Kind::Bool),
    ("baudrate", Kind::Int),
    ("parity", Kind::Str),
    ("quiet_ms", Kind::Int),
];

const DISPATCH_KEYS: &[(&str, Kind)] = &[
    ("tick_ms", Kind::Int),
    ("max_frames_per_tick", Kind::Int),
    ("decode_throttle_ms", Kind::Int),
    ("diagnostics_period_ms", Kind::Int),
    ("frame_timeout_ms", Kind::Int),
    ("pump_on_threshold_x100", Kind::Int),
];

const LIVENESS_KEYS: &[(&str, Kind)] = &[
    ("alive_within_ms", Kind::Int),
    ("dead_after_ms", Kind::Int),
];

#[derive(Clone, Copy)]
enum Kind {
    Bool,
    Int,
    Str,
}

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate telemetry.toml configuration at compile time
fn validate_config() {
    // Re-run if telemetry.toml changes
    println!("cargo:rerun-if-changed=telemetry.toml");

    let config_path = Path::new("telemetry.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: telemetry.toml not found!                                ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a telemetry.toml configuration file.        ║\n\
            ║  Please create one in the bathys-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read telemetry.toml                            ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Parse and validate TOML syntax
    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in telemetry.toml                    ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_links(&config, &mut errors);
    validate_liveness(&config, &mut errors);
    report("Invalid telemetry configuration", &errors);

    println!("cargo:warning=telemetry.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Panic with a boxed list of errors, if any
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Check every section and key against the accepted set
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        errors.push("top level must be a table".to_string());
        return;
    };

    for (name, value) in root {
        match name.as_str() {
            "link" => {
                let Some(links) = value.as_table() else {
                    errors.push("[link] must contain [link.primary] / [link.secondary]".to_string());
                    continue;
                };
                for (link, table) in links {
                    if link != "primary" && link != "secondary" {
                        errors.push(format!("unknown section [link.{}]", link));
                        continue;
                    }
                    check_keys(&format!("link.{}", link), table, LINK_KEYS, errors);
                }
            }
            "dispatch" => check_keys("dispatch", value, DISPATCH_KEYS, errors),
            "liveness" => check_keys("liveness", value, LIVENESS_KEYS, errors),
            other => errors.push(format!("unknown section [{}]", other)),
        }
    }
}

fn check_keys(
    section: &str,
    value: &toml::Value,
    allowed: &[(&str, Kind)],
    errors: &mut Vec<String>,
) {
    let Some(table) = value.as_table() else {
        errors.push(format!("[{}] must be a table", section));
        return;
    };

    for (key, value) in table {
        match allowed.iter().find(|(name, _)| *name == key.as_str()) {
            None => errors.push(format!("[{}] unknown key '{}'", section, key)),
            Some((_, kind)) => {
                let ok = match kind {
                    Kind::Bool => value.is_bool(),
                    Kind::Int => value.as_integer().is_some_and(|v| v >= 0),
                    Kind::Str => value.is_str(),
                };
                if !ok {
                    errors.push(format!("[{}] '{}' has the wrong type", section, key));
                }
            }
        }
    }
}

/// Validate link settings
fn validate_links(config: &toml::Value, errors: &mut Vec<String>) {
    for link in ["primary", "secondary"] {
        let Some(table) = config.get("link").and_then(|l| l.get(link)) else {
            continue;
        };

        if let Some(parity) = table.get("parity").and_then(|p| p.as_str()) {
            if !["none", "even", "odd"].contains(&parity) {
                errors.push(format!("[link.{}] parity must be 'none', 'even' or 'odd'", link));
            }
        }

        if let Some(baud) = table.get("baudrate").and_then(|b| b.as_integer()) {
            if !(1200..=921_600).contains(&baud) {
                errors.push(format!("[link.{}] baudrate must be 1200-921600", link));
            }
        }
    }

    if let Some(frames) = config
        .get("dispatch")
        .and_then(|d| d.get("max_frames_per_tick"))
        .and_then(|v| v.as_integer())
    {
        if !(1..=u16::MAX as i64).contains(&frames) {
            errors.push("[dispatch] max_frames_per_tick must be 1-65535".to_string());
        }
    }
}

/// Validate liveness thresholds
fn validate_liveness(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(liveness) = config.get("liveness") else {
        return;
    };
    let alive = liveness.get("alive_within_ms").and_then(|v| v.as_integer()).unwrap_or(10_000);
    let dead = liveness.get("dead_after_ms").and_then(|v| v.as_integer()).unwrap_or(12_000);
    if dead < alive {
        errors.push("[liveness] dead_after_ms must be >= alive_within_ms".to_string());
    }
}
