//! Packet decoder for the glove's binary capture format
//!
//! The device emits a byte stream of framed packets: a 7-byte header opened
//! by a sync marker, then a type-dependent payload. ECG payloads carry five
//! sub-frames of eight little-endian signed 16-bit samples, one per
//! channel, each sub-frame closed by its own modulo-256 checksum. Corrupt
//! sub-frames are skipped; a truncated tail ends the scan quietly.

use ecg_core::{EcgResult, LeadSet};
use tracing::debug;

/// Synchronization marker opening every header.
pub const SYNC_BYTE: u8 = 0x80;
/// Fixed second and third header bytes.
pub const HEADER_TAG: [u8; 2] = [0x17, 0x00];
/// Header length in bytes.
pub const HEADER_LEN: usize = 7;
/// ECG data packet type.
pub const ECG_PACKET_TYPE: u8 = 0x51;
/// Fault/status packet type.
pub const FAULT_PACKET_TYPE: u8 = 0x03;
/// Sub-frames per ECG payload.
pub const SUBFRAMES_PER_PACKET: usize = 5;
/// Sub-frame length: 8 channels x 2 bytes + checksum.
pub const SUBFRAME_LEN: usize = 17;
/// ECG payload length.
pub const ECG_PAYLOAD_LEN: usize = SUBFRAMES_PER_PACKET * SUBFRAME_LEN;
/// Fault payload length.
pub const FAULT_PAYLOAD_LEN: usize = 10;
/// A sync byte with fewer bytes than this remaining is end-of-stream.
pub const MIN_TAIL: usize = 11;

/// Number of captured channels per sub-frame.
const CHANNELS: usize = 8;

/// Stateless decoder for one capture buffer.
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    sampling_rate: f64,
}

/// Decode statistics, reported alongside the lead set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Well-formed ECG packets consumed
    pub ecg_packets: usize,
    /// Fault packets consumed (payload ignored)
    pub fault_packets: usize,
    /// Sub-frames dropped for checksum failure
    pub corrupt_subframes: usize,
}

impl PacketDecoder {
    pub fn new(sampling_rate: f64) -> Self {
        PacketDecoder { sampling_rate }
    }

    /// Decode a complete capture buffer into per-lead sample series.
    ///
    /// A buffer with no valid packets yields an empty lead set, not an
    /// error; malformed regions are skipped byte by byte.
    pub fn decode(&self, data: &[u8]) -> EcgResult<(LeadSet, DecodeStats)> {
        let mut leads = LeadSet::new(self.sampling_rate);
        let mut stats = DecodeStats::default();
        let size = data.len();
        let mut i = 0;

        while i < size {
            if data[i] != SYNC_BYTE {
                i += 1;
                continue;
            }
            if size - i < MIN_TAIL {
                // Truncated tail: end of stream, not corruption
                break;
            }

            let header = &data[i..i + HEADER_LEN];
            let Some(packet_type) = decode_header(header) else {
                i += 1;
                continue;
            };

            match packet_type {
                ECG_PACKET_TYPE => {
                    let end = i + HEADER_LEN + ECG_PAYLOAD_LEN;
                    if end > size {
                        break;
                    }
                    let payload = &data[i + HEADER_LEN..end];
                    stats.ecg_packets += 1;
                    stats.corrupt_subframes += decode_ecg_payload(payload, &mut leads);
                    i = end;
                }
                FAULT_PACKET_TYPE => {
                    let end = i + HEADER_LEN + FAULT_PAYLOAD_LEN;
                    if end > size {
                        break;
                    }
                    // Device fault codes are not acted on here
                    stats.fault_packets += 1;
                    i = end;
                }
                _ => {
                    i += 1;
                }
            }
        }

        leads.trim_primary();
        debug!(
            ecg_packets = stats.ecg_packets,
            fault_packets = stats.fault_packets,
            corrupt_subframes = stats.corrupt_subframes,
            samples = leads.total_samples(),
            "capture decoded"
        );
        Ok((leads, stats))
    }
}

/// Validate a header and return its packet type.
fn decode_header(header: &[u8]) -> Option<u8> {
    if header.len() == HEADER_LEN
        && header[0] == SYNC_BYTE
        && header[1] == HEADER_TAG[0]
        && header[2] == HEADER_TAG[1]
        && checksum_ok(header)
    {
        Some(header[5])
    } else {
        None
    }
}

/// Modulo-256 checksum: all bytes must sum to zero.
fn checksum_ok(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

/// Decode the five sub-frames of an ECG payload, skipping corrupt ones.
/// Returns the number of sub-frames dropped.
fn decode_ecg_payload(payload: &[u8], leads: &mut LeadSet) -> usize {
    let mut dropped = 0;
    for subframe in payload.chunks_exact(SUBFRAME_LEN) {
        if !checksum_ok(subframe) {
            dropped += 1;
            continue;
        }
        for ch in 0..CHANNELS {
            let lsb = subframe[2 * ch];
            let msb = subframe[2 * ch + 1];
            let value = i16::from_le_bytes([lsb, msb]);
            leads.push_sample(ch, value as f64);
        }
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecg_core::LeadId;

    fn checksum_byte(bytes: &[u8]) -> u8 {
        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        0u8.wrapping_sub(sum)
    }

    fn header(packet_type: u8) -> Vec<u8> {
        let mut h = vec![SYNC_BYTE, 0x17, 0x00, 0x00, 0x00, packet_type];
        h.push(checksum_byte(&h));
        h
    }

    fn subframe(samples: [i16; 8]) -> Vec<u8> {
        let mut f: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        f.push(checksum_byte(&f));
        f
    }

    fn ecg_packet(value: i16) -> Vec<u8> {
        let mut packet = header(ECG_PACKET_TYPE);
        for _ in 0..SUBFRAMES_PER_PACKET {
            packet.extend(subframe([value; 8]));
        }
        packet
    }

    #[test]
    fn test_no_markers_decodes_empty() {
        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&[0x01, 0x02, 0x03, 0x7f]).unwrap();
        assert!(leads.is_empty());
        assert_eq!(stats, DecodeStats::default());
    }

    #[test]
    fn test_single_packet_yields_forty_samples() {
        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&ecg_packet(1000)).unwrap();

        assert_eq!(stats.ecg_packets, 1);
        assert_eq!(stats.corrupt_subframes, 0);
        assert_eq!(leads.total_samples(), 40);
        for lead in LeadId::CAPTURED {
            let series = leads.series(lead).unwrap();
            assert_eq!(series.len(), 5);
            assert!(series.iter().all(|&v| v == 1000.0));
        }
    }

    #[test]
    fn test_corrupt_subframe_drops_only_its_samples() {
        let mut packet = ecg_packet(200);
        // Flip the checksum of the third sub-frame
        let third_ck = HEADER_LEN + 2 * SUBFRAME_LEN + SUBFRAME_LEN - 1;
        packet[third_ck] = packet[third_ck].wrapping_add(1);

        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&packet).unwrap();

        assert_eq!(stats.corrupt_subframes, 1);
        assert_eq!(leads.total_samples(), 32);
        assert_eq!(leads.series(LeadId::V3).unwrap().len(), 4);
    }

    #[test]
    fn test_negative_samples_are_sign_extended() {
        let decoder = PacketDecoder::new(500.0);
        let mut packet = header(ECG_PACKET_TYPE);
        for _ in 0..SUBFRAMES_PER_PACKET {
            packet.extend(subframe([-512; 8]));
        }
        let (leads, _) = decoder.decode(&packet).unwrap();
        assert_eq!(leads.series(LeadId::I).unwrap()[0], -512.0);
    }

    #[test]
    fn test_truncated_tail_is_end_of_stream() {
        let mut data = ecg_packet(10);
        let full = ecg_packet(20);
        data.extend(&full[..HEADER_LEN + 5]); // second packet cut short

        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&data).unwrap();
        assert_eq!(stats.ecg_packets, 1);
        assert_eq!(leads.total_samples(), 40);
    }

    #[test]
    fn test_garbage_between_packets_is_skipped() {
        let mut data = vec![0x80, 0x11, 0x99]; // sync without a valid header
        data.extend(ecg_packet(7));
        data.extend([0xff, 0x00, 0x42]);
        data.extend(ecg_packet(9));

        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&data).unwrap();
        assert_eq!(stats.ecg_packets, 2);
        assert_eq!(leads.series(LeadId::I).unwrap().len(), 10);
    }

    #[test]
    fn test_fault_packet_is_consumed_without_samples() {
        let mut data = header(FAULT_PACKET_TYPE);
        data.extend([0u8; FAULT_PAYLOAD_LEN]);
        data.extend(ecg_packet(3));

        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&data).unwrap();
        assert_eq!(stats.fault_packets, 1);
        assert_eq!(stats.ecg_packets, 1);
        assert_eq!(leads.total_samples(), 40);
    }

    #[test]
    fn test_bad_header_checksum_advances_scan() {
        let mut packet = ecg_packet(5);
        packet[6] = packet[6].wrapping_add(1); // break the header checksum

        let decoder = PacketDecoder::new(500.0);
        let (leads, stats) = decoder.decode(&packet).unwrap();
        assert_eq!(stats.ecg_packets, 0);
        assert!(leads.is_empty());
    }
}
