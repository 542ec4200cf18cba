//! Removal of diagnostic text captured inside a payload block.
//!
//! When writers interleave, a block's byte span can contain header lines,
//! sample banners or monitor diagnostics. Each physical line of the block is
//! cut at the first noise marker it contains, banners are removed, and the
//! surviving pieces are concatenated without the line breaks. A record line
//! never contains a raw newline, so the concatenation restores the original
//! text around an injected line.
//!
//! Payload text that itself contains a noise marker is cut as well. There is
//! no escaping mechanism in the stream grammar to tell the two apart.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::telemetry::HEADER_PREFIX;

/// Prefix of diagnostic lines written by the monitor.
pub const MONITOR_PREFIX: &str = "[monitor]";

/// Start of plain status lines written by the monitor.
const STATUS_PREFIX: &str = "Monitor:";

static SAMPLE_BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Sample '\d+' RECEIVED").expect("banner pattern is valid"));

/// Returns the block with every noise fragment removed.
pub fn strip_noise(block: &str) -> String {
    block
        .split('\n')
        .map(|line| {
            let line = line.trim_end_matches('\r');
            if line.trim_start().starts_with(STATUS_PREFIX) {
                return String::new();
            }
            let cut = [HEADER_PREFIX, MONITOR_PREFIX]
                .iter()
                .filter_map(|marker| line.find(marker))
                .min()
                .unwrap_or(line.len());
            SAMPLE_BANNER.replace_all(&line[..cut], "").into_owned()
        })
        .collect()
}

/// True when `line` is diagnostic output rather than part of a record.
pub fn is_diagnostic_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with(MONITOR_PREFIX) || line.starts_with(STATUS_PREFIX) || SAMPLE_BANNER.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_block_is_unchanged() {
        let block = "{latitude: 39.9, longitude: 32.8}";
        assert_eq!(strip_noise(block), block);
    }

    #[test]
    fn injected_header_line_is_removed() {
        let block = "{latitude: 39.9,\n[domain=3] TOPIC: intelligence\n longitude: 32.8}";
        assert_eq!(strip_noise(block), "{latitude: 39.9, longitude: 32.8}");
    }

    #[test]
    fn header_injected_mid_token_rejoins_the_token() {
        let block = "{lati[domain=0] TOPIC: aircraft coredata\ntude: 39.9}";
        assert_eq!(strip_noise(block), "{latitude: 39.9}");
    }

    #[test]
    fn banners_and_monitor_lines_are_removed() {
        let block = "{a: 1,\nSample '12' RECEIVED\n[monitor] CoreData matched change: current_count=1\n b: 2}";
        assert_eq!(strip_noise(block), "{a: 1, b: 2}");
        let block = "{a: 1,\nMonitor: DataReaders created for domain 2\n b: 2}";
        assert_eq!(strip_noise(block), "{a: 1, b: 2}");
    }

    #[test]
    fn stripping_is_idempotent() {
        let block = "{a: 1,\n[domain=3] TOPIC: messaging\r\n b: \"x\"}";
        let once = strip_noise(block);
        assert_eq!(strip_noise(&once), once);
    }

    #[test]
    fn diagnostic_lines_are_recognised() {
        assert!(is_diagnostic_line("[monitor] Messaging matched change: current_count=0"));
        assert!(is_diagnostic_line("Sample '3' RECEIVED"));
        assert!(is_diagnostic_line("Monitor: Waiting for DDS data on domains 0,1"));
        assert!(!is_diagnostic_line("[domain=1] TOPIC: intelligence"));
    }
}
