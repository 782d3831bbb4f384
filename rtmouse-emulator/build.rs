//! Build script for rtmouse-emulator
//!
//! - Sets up linker search paths for memory.x
//! - Validates emulator.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const RT_RATES: [i64; 6] = [10, 20, 40, 60, 80, 100];
const PS2_RATES: [i64; 7] = [10, 20, 40, 60, 80, 100, 200];
const RESOLUTIONS: [i64; 4] = [25, 50, 100, 200];

/// Adapter UART oscillator; the baud divisor is 256 - OSC / (baud * 192)
const ADAPTER_OSC_HZ: i64 = 9_216_000;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate emulator.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=emulator.toml");

    let config_path = Path::new("emulator.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: emulator.toml not found!                                 ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires an emulator.toml configuration file.      ║\n\
            ║  Please create one in the rtmouse-emulator directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read emulator.toml                             ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in emulator.toml                     ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_required_sections(&config);

    let protocol = validate_link(&config);
    validate_mouse(&config, &protocol);
    validate_bridge(&config);

    println!("cargo:warning=emulator.toml validated successfully");
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

fn report_errors(title: &str, errors: &[String]) {
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

fn section<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    config.get(name).and_then(|v| v.as_table())
}

/// Validate that required sections exist
fn validate_required_sections(config: &toml::Value) {
    let mut errors = Vec::new();

    for name in ["link", "mouse"] {
        match config.get(name) {
            None => errors.push(format!("Missing [{}] section", name)),
            Some(toml::Value::Table(_)) => {}
            Some(_) => errors.push(format!("[{}] must be a table", name)),
        }
    }
    if let Some(bridge) = config.get("bridge") {
        if !bridge.is_table() {
            errors.push("[bridge] must be a table".to_string());
        }
    }

    report_errors("Missing required sections in emulator.toml", &errors);
}

/// Validate the mouse line; returns the protocol name
fn validate_link(config: &toml::Value) -> String {
    let mut errors = Vec::new();
    let mut protocol = "rt".to_string();

    if let Some(link) = section(config, "link") {
        match link.get("protocol") {
            Some(toml::Value::String(p)) if p == "rt" || p == "ps2" => protocol = p.clone(),
            Some(_) => errors.push("[link] protocol must be 'rt' or 'ps2'".to_string()),
            None => {}
        }

        match link.get("parity") {
            Some(toml::Value::String(p)) if p == "odd" || p == "even" => {}
            Some(_) => errors.push("[link] parity must be 'odd' or 'even'".to_string()),
            None => {}
        }

        match link.get("baud") {
            Some(toml::Value::Integer(baud)) => {
                let divisor = if *baud > 0 {
                    256 - ADAPTER_OSC_HZ / (baud * 192)
                } else {
                    -1
                };
                if protocol == "rt" && !(0..=255).contains(&divisor) {
                    errors.push(format!(
                        "[link] baud {} cannot be programmed into the adapter",
                        baud
                    ));
                } else if *baud <= 0 || *baud > 115_200 {
                    errors.push("[link] baud must be 1-115200".to_string());
                }
            }
            Some(_) => errors.push("[link] baud must be an integer".to_string()),
            None => {}
        }
    }

    report_errors("Invalid [link] configuration", &errors);
    protocol
}

fn validate_mouse(config: &toml::Value, protocol: &str) {
    let mut errors = Vec::new();

    if let Some(mouse) = section(config, "mouse") {
        match mouse.get("kind") {
            Some(toml::Value::String(k)) if k == "generic" => {}
            Some(toml::Value::String(k)) if k == "optical" => {
                if protocol == "ps2" {
                    errors.push("[mouse] kind 'optical' is only defined for 'rt'".to_string());
                }
            }
            Some(_) => errors.push("[mouse] kind must be 'generic' or 'optical'".to_string()),
            None => {}
        }

        for key in ["invert_y", "chord_middle"] {
            if let Some(value) = mouse.get(key) {
                if !value.is_bool() {
                    errors.push(format!("[mouse] {} must be true or false", key));
                }
            }
        }

        match mouse.get("sample_rate") {
            Some(toml::Value::Integer(rate)) => {
                let allowed: &[i64] = if protocol == "ps2" {
                    &PS2_RATES
                } else {
                    &RT_RATES
                };
                if !allowed.contains(rate) {
                    errors.push(format!(
                        "[mouse] sample_rate must be one of {:?}",
                        allowed
                    ));
                }
            }
            Some(_) => errors.push("[mouse] sample_rate must be an integer".to_string()),
            None => {}
        }

        for key in ["settle_ticks", "poll_ticks"] {
            match mouse.get(key) {
                Some(toml::Value::Integer(ticks)) if (1..=u32::MAX as i64).contains(ticks) => {}
                Some(_) => errors.push(format!("[mouse] {} must be a positive integer", key)),
                None => {}
            }
        }

        match mouse.get("max_checks") {
            Some(toml::Value::Integer(checks)) if (0..=255).contains(checks) => {}
            Some(_) => errors.push("[mouse] max_checks must be 0-255".to_string()),
            None => {}
        }

        match mouse.get("resolution") {
            Some(toml::Value::Integer(cpi)) if RESOLUTIONS.contains(cpi) => {}
            Some(_) => errors.push(format!(
                "[mouse] resolution must be one of {:?}",
                RESOLUTIONS
            )),
            None => {}
        }
    }

    report_errors("Invalid [mouse] configuration", &errors);
}

fn validate_bridge(config: &toml::Value) {
    let mut errors = Vec::new();

    if let Some(bridge) = section(config, "bridge") {
        match bridge.get("baud") {
            Some(toml::Value::Integer(baud)) if *baud > 0 && *baud <= 921_600 => {}
            Some(_) => errors.push("[bridge] baud must be 1-921600".to_string()),
            None => {}
        }
    }

    report_errors("Invalid [bridge] configuration", &errors);
}
