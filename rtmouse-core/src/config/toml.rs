//! Simple TOML parser for the emulator configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `emulator.toml`. It does NOT support the full TOML grammar and never
//! allocates.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys

use rtmouse_protocol::{Framing, MouseKind, Resolution, SampleRate};

use super::types::{EmulatorConfig, Protocol};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Key not known in its section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Link,
    Mouse,
    Bridge,
}

/// Parse TOML configuration into an [`EmulatorConfig`]
///
/// Missing keys keep their defaults.
pub fn parse_config(input: &str) -> Result<EmulatorConfig, ParseError> {
    let mut config = EmulatorConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(&mut config, section, key, value)?;
    }

    Ok(config)
}

fn parse_section_header(line: &str) -> Result<Section, ParseError> {
    let line = strip_comment(line);
    let header = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or(ParseError::InvalidSection)?;

    match header.trim() {
        "link" => Ok(Section::Link),
        "mouse" => Ok(Section::Mouse),
        "bridge" => Ok(Section::Bridge),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Cut a trailing comment unless the `#` sits inside a string
fn strip_comment(value: &str) -> &str {
    match value.find('#') {
        Some(pos) if value[..pos].matches('"').count() % 2 == 0 => value[..pos].trim(),
        _ => value,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    strip_separators(value)?
        .parse()
        .map_err(|_| ParseError::InvalidValue)
}

/// Timer delays of zero would re-check in the same tick
fn parse_ticks(value: &str) -> Result<u32, ParseError> {
    match parse_int(value)? {
        0 => Err(ParseError::InvalidValue),
        ticks => Ok(ticks),
    }
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Integers may use `_` digit separators (`115_200`)
fn strip_separators(value: &str) -> Result<heapless::String<16>, ParseError> {
    let mut out = heapless::String::new();
    for c in value.chars().filter(|c| *c != '_') {
        out.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    Ok(out)
}

fn apply_value(
    config: &mut EmulatorConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ParseError> {
    match (section, key) {
        (Section::Link, "protocol") => {
            config.link.protocol = match parse_string(value)? {
                "rt" => Protocol::RtPc,
                "ps2" => Protocol::Ps2,
                _ => return Err(ParseError::InvalidValue),
            };
        }
        (Section::Link, "baud") => config.link.baud = parse_int(value)?,
        (Section::Link, "parity") => {
            config.link.parity = match parse_string(value)? {
                "odd" => Framing::Odd,
                "even" => Framing::Even,
                _ => return Err(ParseError::InvalidValue),
            };
        }
        (Section::Mouse, "kind") => {
            config.mouse.kind = match parse_string(value)? {
                "generic" => MouseKind::Generic,
                "optical" => MouseKind::Optical,
                _ => return Err(ParseError::InvalidValue),
            };
        }
        (Section::Mouse, "invert_y") => config.mouse.invert_y = parse_bool(value)?,
        (Section::Mouse, "chord_middle") => config.mouse.chord_middle = parse_bool(value)?,
        (Section::Mouse, "sample_rate") => {
            let hz: u8 = parse_int(value)?;
            config.mouse.sample_rate = SampleRate::from_hz(hz).ok_or(ParseError::InvalidValue)?;
        }
        (Section::Mouse, "resolution") => {
            let cpi: u16 = parse_int(value)?;
            config.mouse.resolution = Resolution::from_cpi(cpi).ok_or(ParseError::InvalidValue)?;
        }
        (Section::Mouse, "settle_ticks") => config.mouse.buttons.settle_ticks = parse_ticks(value)?,
        (Section::Mouse, "poll_ticks") => config.mouse.buttons.poll_ticks = parse_ticks(value)?,
        (Section::Mouse, "max_checks") => config.mouse.buttons.max_checks = parse_int(value)?,
        (Section::Bridge, "baud") => config.bridge.baud = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Emulator configuration
[link]
protocol = "ps2"   # PS/2 planar mouse
baud = 9600
parity = "even"

[mouse]
kind = "optical"
invert_y = false
sample_rate = 40
resolution = 200
chord_middle = true

[bridge]
baud = 115_200
"#;

    #[test]
    fn test_parse_full_config() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert_eq!(cfg.link.protocol, Protocol::Ps2);
        assert_eq!(cfg.link.baud, 9600);
        assert_eq!(cfg.link.parity, Framing::Even);
        assert_eq!(cfg.mouse.kind, MouseKind::Optical);
        assert!(!cfg.mouse.invert_y);
        assert!(cfg.mouse.chord_middle);
        assert_eq!(cfg.mouse.sample_rate, SampleRate::Hz40);
        assert_eq!(cfg.mouse.resolution, Resolution::Cpi200);
        assert_eq!(cfg.bridge.baud, 115_200);
    }

    #[test]
    fn test_chord_timing_keys() {
        let cfg = parse_config("[mouse]\nsettle_ticks = 6\npoll_ticks = 3\nmax_checks = 4\n").unwrap();
        assert_eq!(cfg.mouse.buttons.settle_ticks, 6);
        assert_eq!(cfg.mouse.buttons.poll_ticks, 3);
        assert_eq!(cfg.mouse.buttons.max_checks, 4);

        let cfg = parse_config("[mouse]\npoll_ticks = 5\n").unwrap();
        assert_eq!(cfg.mouse.buttons.settle_ticks, 4);
        assert_eq!(cfg.mouse.buttons.poll_ticks, 5);

        assert_eq!(
            parse_config("[mouse]\nsettle_ticks = 0\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[mouse]\nmax_checks = 300\n"),
            Err(ParseError::InvalidValue)
        );
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(parse_config(""), Ok(EmulatorConfig::default()));
        assert_eq!(parse_config("# nothing\n\n"), Ok(EmulatorConfig::default()));
    }

    #[test]
    fn test_unknown_section() {
        assert_eq!(parse_config("[usb]\n"), Err(ParseError::InvalidSection));
        assert_eq!(parse_config("[link\n"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            parse_config("[link]\nspeed = 9600\n"),
            Err(ParseError::UnknownKey)
        );
        // Root-level keys are not accepted
        assert_eq!(parse_config("baud = 9600\n"), Err(ParseError::UnknownKey));
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            parse_config("[mouse]\nsample_rate = 55\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[mouse]\ninvert_y = yes\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[link]\nprotocol = rt\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(parse_config("[link]\nbaud\n"), Err(ParseError::InvalidLine));
    }

    #[test]
    fn test_hash_inside_string_is_kept() {
        assert_eq!(
            parse_config("[link]\nprotocol = \"rt#1\"\n"),
            Err(ParseError::InvalidValue)
        );
    }
}
