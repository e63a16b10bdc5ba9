//! Peer blocklist ingestion.
//!
//! A fetched blocklist may be gzip-compressed or plain text. It is inflated,
//! parsed into IPv4 ranges, and the accepted rules are staged in a temporary
//! file in the config directory that is then renamed over
//! [`SessionConfig::BLOCKLIST_FILENAME`], so readers never see a partial list.
//!
//! Two line formats are accepted:
//! - P2P plaintext: `description:1.2.3.0-1.2.3.255`
//! - DAT: `001.002.003.000 - 001.002.003.255 , 000 , description`

use crate::config::SessionConfig;
use crate::{Result, SeedboxError};
use flate2::read::GzDecoder;
use std::io::{BufWriter, Read, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// An inclusive IPv4 address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub begin: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl AddressRange {
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.begin <= addr && addr <= self.end
    }
}

/// Parse one blocklist line. Returns `None` for comments and junk.
pub fn parse_rule(line: &str) -> Option<AddressRange> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    // DAT format: "begin - end , level , description"
    if let Some((range, _)) = line.split_once(',') {
        if let Some((begin, end)) = range.split_once('-') {
            if let (Some(begin), Some(end)) = (parse_padded_ip(begin), parse_padded_ip(end)) {
                return ordered(begin, end);
            }
        }
    }

    // P2P format: "description:begin-end", description optional
    let range = line.rsplit_once(':').map_or(line, |(_, range)| range);
    let (begin, end) = range.split_once('-')?;
    ordered(parse_padded_ip(begin)?, parse_padded_ip(end)?)
}

fn ordered(begin: Ipv4Addr, end: Ipv4Addr) -> Option<AddressRange> {
    (begin <= end).then_some(AddressRange { begin, end })
}

/// Parse dotted quads that may carry leading zeros ("001.002.003.004").
fn parse_padded_ip(text: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = text.trim().split('.');
    for octet in octets.iter_mut() {
        *octet = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

/// Inflate `body` if it is gzip data, otherwise pass it through.
pub fn decompress(body: &[u8]) -> Result<Vec<u8>> {
    if !body.starts_with(&GZIP_MAGIC) {
        return Ok(body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(|e| SeedboxError::Decompress(e.to_string()))?;
    Ok(out)
}

/// Replace the blocklist in `config_dir` with the rules found in `body`.
///
/// Returns the number of rules now in effect.
pub fn install(config_dir: &Path, body: &[u8]) -> Result<Vec<AddressRange>> {
    let text = decompress(body)?;

    let rules: Vec<AddressRange> = String::from_utf8_lossy(&text)
        .lines()
        .filter_map(parse_rule)
        .collect();

    let target = blocklist_path(config_dir);
    std::fs::create_dir_all(config_dir).map_err(|e| SeedboxError::io_with_path(e, config_dir))?;
    let mut staging = tempfile::Builder::new()
        .prefix("blocklist.tmp.")
        .tempfile_in(config_dir)
        .map_err(|e| SeedboxError::io_with_path(e, config_dir.join("blocklist.tmp")))?;
    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        for rule in &rules {
            writeln!(writer, "{}-{}", rule.begin, rule.end)
                .map_err(|e| SeedboxError::io_with_path(e, &target))?;
        }
        writer
            .flush()
            .map_err(|e| SeedboxError::io_with_path(e, &target))?;
    }
    debug!("blocklist staged at {}", staging.path().display());
    staging
        .persist(&target)
        .map_err(|e| SeedboxError::io_with_path(e.error, &target))?;

    info!("blocklist updated with {} rules", rules.len());
    Ok(rules)
}

/// Location of the installed blocklist.
pub fn blocklist_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SessionConfig::BLOCKLIST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    const SAMPLE: &str = "# comment\n\
        Bad Range:10.0.0.0-10.0.0.255\n\
        001.002.003.000 - 001.002.003.255 , 000 , dat entry\n\
        garbage line\n";

    #[test]
    fn test_parse_rule_formats() {
        let p2p = parse_rule("Evil Corp:1.2.3.4-1.2.3.10").unwrap();
        assert!(p2p.contains(Ipv4Addr::new(1, 2, 3, 5)));
        assert!(!p2p.contains(Ipv4Addr::new(1, 2, 3, 11)));

        let dat = parse_rule("010.000.000.000 - 010.000.000.009 , 100 , x").unwrap();
        assert_eq!(dat.begin, Ipv4Addr::new(10, 0, 0, 0));

        assert!(parse_rule("9.9.9.0-9.9.9.9").is_some());
        assert!(parse_rule("# nope").is_none());
        assert!(parse_rule("backwards:1.2.3.9-1.2.3.1").is_none());
    }

    #[test]
    fn test_install_plain() {
        let dir = tempfile::TempDir::new().unwrap();
        let rules = install(dir.path(), SAMPLE.as_bytes()).unwrap();
        assert_eq!(rules.len(), 2);

        let installed = std::fs::read_to_string(blocklist_path(dir.path())).unwrap();
        assert_eq!(installed, "10.0.0.0-10.0.0.255\n1.2.3.0-1.2.3.255\n");
        let reloaded: Vec<AddressRange> = installed.lines().filter_map(parse_rule).collect();
        assert_eq!(reloaded, rules);
    }

    #[test]
    fn test_install_replaces_and_leaves_no_staging_file() {
        let dir = tempfile::TempDir::new().unwrap();
        install(dir.path(), SAMPLE.as_bytes()).unwrap();
        let rules = install(dir.path(), b"only:5.5.5.5-5.5.5.6\n").unwrap();
        assert_eq!(rules.len(), 1);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![SessionConfig::BLOCKLIST_FILENAME.to_string()]);
        assert_eq!(
            std::fs::read_to_string(blocklist_path(dir.path())).unwrap(),
            "5.5.5.5-5.5.5.6\n"
        );
    }

    #[test]
    fn test_install_reports_unwritable_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let err = install(&not_a_dir, SAMPLE.as_bytes()).unwrap_err();
        assert!(matches!(err, SeedboxError::Io { path: Some(_), .. }));
    }

    #[test]
    fn test_install_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        let gz = encoder.finish().unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(install(dir.path(), &gz).unwrap().len(), 2);
    }

    #[test]
    fn test_truncated_gzip_fails() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        let gz = encoder.finish().unwrap();

        let err = decompress(&gz[..gz.len() / 2]).unwrap_err();
        assert!(matches!(err, SeedboxError::Decompress(_)));
    }
}
