//! `QSH_DEBUG` category mask.
//!
//! The variable holds a hex mask selecting debug categories; a value that
//! is set but parses to zero (or does not parse) enables everything. The
//! mask maps onto per-module `log` filters installed by the binary.

pub const DEBUG_TOKENIZER: u32 = 0x1;
pub const DEBUG_PARSER: u32 = 0x2;
pub const DEBUG_EXECUTOR: u32 = 0x4;
pub const DEBUG_PROFILER: u32 = 0x8;
pub const DEBUG_ALL: u32 = 0xF;

/// Log targets enabled by each mask bit.
pub const CATEGORY_TARGETS: &[(u32, &str)] = &[
    (DEBUG_TOKENIZER, "qsh_parser::lexer"),
    (DEBUG_PARSER, "qsh_parser::parser"),
    (DEBUG_EXECUTOR, "qsh_core::executor"),
    (DEBUG_PROFILER, "qsh_core::profiler"),
];

/// Interpret the raw `QSH_DEBUG` value. `None` means debugging is off
/// entirely (variable unset).
pub fn parse_mask(raw: Option<&str>) -> Option<u32> {
    let raw = raw?.trim();
    let raw = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
    match u32::from_str_radix(raw, 16) {
        Ok(0) | Err(_) => Some(DEBUG_ALL),
        Ok(mask) => Some(mask),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_means_off() {
        assert_eq!(parse_mask(None), None);
    }

    #[test]
    fn zero_or_garbage_enables_all() {
        assert_eq!(parse_mask(Some("0")), Some(DEBUG_ALL));
        assert_eq!(parse_mask(Some("zzz")), Some(DEBUG_ALL));
        assert_eq!(parse_mask(Some("")), Some(DEBUG_ALL));
    }

    #[test]
    fn hex_masks_parse() {
        assert_eq!(parse_mask(Some("5")), Some(DEBUG_TOKENIZER | DEBUG_EXECUTOR));
        assert_eq!(parse_mask(Some("0x8")), Some(DEBUG_PROFILER));
    }
}
