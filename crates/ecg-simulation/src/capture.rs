//! Capture-buffer encoding: the inverse of the packet decoder
//!
//! Packs per-channel sample series into framed, checksummed glove packets
//! so tests and development tooling can drive the full analysis pipeline
//! over realistic byte buffers.

use ecg_processing::decoder::{
    ECG_PACKET_TYPE, FAULT_PACKET_TYPE, FAULT_PAYLOAD_LEN, HEADER_TAG, SUBFRAMES_PER_PACKET,
    SYNC_BYTE,
};

/// Encoder for device capture buffers.
#[derive(Debug, Clone, Default)]
pub struct CaptureEncoder;

impl CaptureEncoder {
    pub fn new() -> Self {
        CaptureEncoder
    }

    /// Checksum byte completing `bytes` to a zero sum modulo 256.
    fn checksum_byte(bytes: &[u8]) -> u8 {
        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        0u8.wrapping_sub(sum)
    }

    fn header(packet_type: u8) -> [u8; 7] {
        let mut header = [SYNC_BYTE, HEADER_TAG[0], HEADER_TAG[1], 0x00, 0x00, packet_type, 0x00];
        header[6] = Self::checksum_byte(&header[..6]);
        header
    }

    fn subframe(samples: [i16; 8]) -> [u8; 17] {
        let mut frame = [0u8; 17];
        for (ch, sample) in samples.iter().enumerate() {
            let [lsb, msb] = sample.to_le_bytes();
            frame[2 * ch] = lsb;
            frame[2 * ch + 1] = msb;
        }
        frame[16] = Self::checksum_byte(&frame[..16]);
        frame
    }

    /// Encode eight channel series into a packet stream.
    ///
    /// Each packet carries five consecutive sample indices; a trailing
    /// remainder that cannot fill a whole packet is dropped, matching the
    /// device's whole-packet framing.
    pub fn encode(&self, channels: &[Vec<i16>; 8]) -> Vec<u8> {
        let samples = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let packets = samples / SUBFRAMES_PER_PACKET;
        let mut out = Vec::with_capacity(packets * (7 + SUBFRAMES_PER_PACKET * 17));

        for p in 0..packets {
            out.extend(Self::header(ECG_PACKET_TYPE));
            for k in 0..SUBFRAMES_PER_PACKET {
                let idx = p * SUBFRAMES_PER_PACKET + k;
                let mut frame = [0i16; 8];
                for (ch, series) in channels.iter().enumerate() {
                    frame[ch] = series[idx];
                }
                out.extend(Self::subframe(frame));
            }
        }
        out
    }

    /// A fault packet with a zeroed payload, for interleaving in tests.
    pub fn fault_packet(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(7 + FAULT_PAYLOAD_LEN);
        out.extend(Self::header(FAULT_PACKET_TYPE));
        out.extend([0u8; FAULT_PAYLOAD_LEN]);
        out
    }
}
