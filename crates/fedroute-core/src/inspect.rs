//! Extraction of identifying keys from returned payloads.
//!
//! Keys are dotted `NET[.STA[.LOC.CHA]]` strings compared against request
//! lines to decide which lines a provider actually satisfied.

use std::collections::HashSet;

use crate::domain::{Granularity, EMPTY_LOCATION};

/// Keys found in one payload together with their granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadKeys {
    pub granularity: Granularity,
    pub keys: HashSet<String>,
}

/// Strategy for reading identifying keys out of a payload.
///
/// `None` means the payload cannot be inspected; every requested line then
/// counts as satisfied.
pub trait PayloadInspector: Send + Sync {
    fn identifying_keys(&self, payload: &[u8]) -> Option<PayloadKeys>;
}

/// Trusts the provider: nothing is inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustingInspector;

impl PayloadInspector for TrustingInspector {
    fn identifying_keys(&self, _payload: &[u8]) -> Option<PayloadKeys> {
        None
    }
}

/// FDSN station service `format=text` output.
///
/// The header row decides the granularity: a `Channel` column means channel
/// level, a `Station` column station level, otherwise network level.
#[derive(Debug, Default, Clone, Copy)]
pub struct StationTextInspector;

impl PayloadInspector for StationTextInspector {
    fn identifying_keys(&self, payload: &[u8]) -> Option<PayloadKeys> {
        let text = std::str::from_utf8(payload).ok()?;
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let header = lines.next()?.strip_prefix('#')?;
        let columns: Vec<String> = header
            .split('|')
            .map(|column| column.trim().to_ascii_lowercase())
            .collect();

        let column = |name: &str| columns.iter().position(|column| column == name);
        let network = column("network")?;
        let (granularity, indexes) = match (column("station"), column("location"), column("channel")) {
            (Some(station), Some(location), Some(channel)) => {
                (Granularity::Channel, vec![network, station, location, channel])
            }
            (Some(station), _, _) => (Granularity::Station, vec![network, station]),
            _ => (Granularity::Network, vec![network]),
        };

        let keys = lines
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| {
                let fields: Vec<&str> = line.split('|').map(str::trim).collect();
                let parts = indexes
                    .iter()
                    .map(|index| fields.get(*index).copied())
                    .collect::<Option<Vec<_>>>()?;
                Some(join_key(&parts, granularity))
            })
            .collect();

        Some(PayloadKeys { granularity, keys })
    }
}

const MINISEED_HEADER_LEN: usize = 48;
const MINISEED_DEFAULT_RECORD: usize = 512;
const BLOCKETTE_1000: u16 = 1000;

/// miniSEED 2 records, keyed at channel level from each fixed header.
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniSeedInspector;

impl PayloadInspector for MiniSeedInspector {
    fn identifying_keys(&self, payload: &[u8]) -> Option<PayloadKeys> {
        let mut keys = HashSet::new();
        let mut offset = 0;

        while offset + MINISEED_HEADER_LEN <= payload.len() {
            let record = &payload[offset..];
            if !matches!(record[6], b'D' | b'R' | b'Q' | b'M') {
                break;
            }

            let field = |range: std::ops::Range<usize>| {
                String::from_utf8_lossy(&record[range]).trim().to_owned()
            };
            let station = field(8..13);
            let location = field(13..15);
            let channel = field(15..18);
            let network = field(18..20);
            keys.insert(join_key(
                &[network.as_str(), station.as_str(), location.as_str(), channel.as_str()],
                Granularity::Channel,
            ));

            offset += record_length(record).unwrap_or(MINISEED_DEFAULT_RECORD);
        }

        if offset == 0 && !payload.is_empty() {
            return None;
        }

        Some(PayloadKeys {
            granularity: Granularity::Channel,
            keys,
        })
    }
}

// Walks the blockette chain looking for blockette 1000. Header words may be
// big- or little-endian; the first-blockette offset tells them apart.
fn record_length(record: &[u8]) -> Option<usize> {
    let read_u16 = |at: usize, big_endian: bool| -> Option<u16> {
        let bytes = [*record.get(at)?, *record.get(at + 1)?];
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };

    let big_endian = read_u16(46, true)
        .map(|first| usize::from(first) >= MINISEED_HEADER_LEN && usize::from(first) < 4096)
        .unwrap_or(false);
    let mut next = usize::from(read_u16(46, big_endian)?);
    let mut hops = 0;

    while next >= MINISEED_HEADER_LEN && hops < 16 {
        let kind = read_u16(next, big_endian)?;
        if kind == BLOCKETTE_1000 {
            let exponent = *record.get(next + 6)?;
            return (8..=20)
                .contains(&exponent)
                .then(|| 1_usize << exponent);
        }
        next = usize::from(read_u16(next + 2, big_endian)?);
        hops += 1;
    }
    None
}

fn join_key(parts: &[&str], granularity: Granularity) -> String {
    parts
        .iter()
        .enumerate()
        .map(|(index, &part)| {
            if granularity == Granularity::Channel && index == 2 && part.is_empty() {
                EMPTY_LOCATION
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
