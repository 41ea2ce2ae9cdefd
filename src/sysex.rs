//! DX7 SysEx framing
//!
//! Two messages carry voice data: the single voice edit buffer (155 unpacked
//! bytes) and the 32 voice bulk dump (32 x 128 packed bytes). Both end with
//! a 7-bit two's complement checksum over the data bytes.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;

use crate::fm::patch::{Patch, PatchBank, UNPACKED_SIZE};

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const YAMAHA_ID: u8 = 0x43;

/// Format number of the single voice edit buffer
const FORMAT_VOICE: u8 = 0x00;
/// Format number of the 32 voice bulk dump
const FORMAT_BANK: u8 = 0x09;

const HEADER_SIZE: usize = 6;

/// Total size of a single voice message
pub const VOICE_MESSAGE_SIZE: usize = HEADER_SIZE + UNPACKED_SIZE + 2;

/// Total size of a 32 voice bulk message
pub const BANK_MESSAGE_SIZE: usize = HEADER_SIZE + PatchBank::PACKED_SIZE + 2;

/// Decoded contents of one SysEx message
#[derive(Debug, Clone)]
pub enum SysexData {
    /// Single voice edit buffer
    Voice(Patch),
    /// 32 voice bulk dump
    Bank(PatchBank),
}

impl SysexData {
    /// Patches carried by the message, in bank order
    pub fn patches(&self) -> Vec<Patch> {
        match self {
            SysexData::Voice(patch) => vec![*patch],
            SysexData::Bank(bank) => bank.patches.to_vec(),
        }
    }
}

/// Checksum of a data block, `(-sum) & 0x7F`
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum.wrapping_neg() & 0x7F
}

fn frame(channel: u8, format: u8, data: &[u8]) -> Vec<u8> {
    let count = data.len();
    let mut msg = Vec::with_capacity(HEADER_SIZE + count + 2);
    msg.extend_from_slice(&[
        SYSEX_START,
        YAMAHA_ID,
        channel & 0x0F,
        format,
        (count >> 7) as u8 & 0x7F,
        count as u8 & 0x7F,
    ]);
    msg.extend_from_slice(data);
    msg.push(checksum(data));
    msg.push(SYSEX_END);
    msg
}

/// Encode a single voice edit buffer for MIDI channel `channel` (0-15)
///
/// The operator on/off mask is not part of the message.
pub fn encode_voice(patch: &Patch, channel: u8) -> Vec<u8> {
    frame(channel, FORMAT_VOICE, &patch.to_unpacked())
}

/// Encode a 32 voice bulk dump for MIDI channel `channel` (0-15)
pub fn encode_bank(bank: &PatchBank, channel: u8) -> Vec<u8> {
    frame(channel, FORMAT_BANK, &bank.to_packed())
}

/// Decode one complete SysEx message
pub fn parse_message(msg: &[u8]) -> Result<SysexData> {
    if msg.len() < HEADER_SIZE + 2 {
        bail!("SysEx message too short: {} bytes", msg.len());
    }
    if msg[0] != SYSEX_START {
        bail!("invalid SysEx start byte: {:#04x}", msg[0]);
    }
    if msg[msg.len() - 1] != SYSEX_END {
        bail!("invalid SysEx end byte: {:#04x}", msg[msg.len() - 1]);
    }
    if msg[1] != YAMAHA_ID {
        bail!("not a Yamaha SysEx message: manufacturer {:#04x}", msg[1]);
    }
    if msg[2] & 0xF0 != 0 {
        bail!("unsupported sub-status {:#04x}", msg[2]);
    }

    let format = msg[3];
    let expected = match format {
        FORMAT_VOICE => VOICE_MESSAGE_SIZE,
        FORMAT_BANK => BANK_MESSAGE_SIZE,
        _ => bail!("unsupported SysEx format: {:#04x}", format),
    };
    if msg.len() != expected {
        bail!(
            "format {:#04x} message must be {} bytes, got {}",
            format,
            expected,
            msg.len()
        );
    }

    let count = (usize::from(msg[4]) << 7) | usize::from(msg[5]);
    let data = &msg[HEADER_SIZE..msg.len() - 2];
    if count != data.len() {
        bail!("byte count {} does not match data length {}", count, data.len());
    }

    let sum = msg[msg.len() - 2];
    let expected_sum = checksum(data);
    if sum != expected_sum {
        bail!("checksum mismatch: got {:#04x}, expected {:#04x}", sum, expected_sum);
    }

    debug!(
        "SysEx format {:#04x} channel {} ({} data bytes)",
        format,
        msg[2] + 1,
        data.len()
    );

    match format {
        FORMAT_VOICE => Ok(SysexData::Voice(Patch::from_unpacked(data)?)),
        _ => Ok(SysexData::Bank(PatchBank::from_packed(data)?)),
    }
}

/// Decode every DX7 voice message in a byte stream
///
/// Bytes outside `F0 .. F7` frames are skipped.
pub fn parse_sysex_data(data: &[u8]) -> Result<Vec<Patch>> {
    if data.is_empty() {
        return Err(anyhow!("empty SysEx data"));
    }

    let mut patches = Vec::new();
    let mut pos = 0;

    while let Some(start) = data[pos..].iter().position(|&b| b == SYSEX_START) {
        let start = pos + start;
        let end = data[start..]
            .iter()
            .position(|&b| b == SYSEX_END)
            .map(|end| start + end)
            .ok_or_else(|| anyhow!("unterminated SysEx message at offset {}", start))?;

        let message = parse_message(&data[start..=end])
            .with_context(|| format!("SysEx message at offset {}", start))?;
        patches.extend(message.patches());

        pos = end + 1;
    }

    if patches.is_empty() {
        bail!("no DX7 voices found in SysEx data");
    }

    Ok(patches)
}

/// Read a `.syx` file and decode every voice in it
pub fn parse_sysex_file(path: impl AsRef<Path>) -> Result<Vec<Patch>> {
    let path = path.as_ref();
    let data =
        fs::read(path).with_context(|| format!("failed to read SysEx file '{}'", path.display()))?;
    parse_sysex_data(&data).with_context(|| format!("failed to parse '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::patch::ALL_OPERATORS;

    fn test_patch() -> Patch {
        let mut patch = Patch::default();
        patch.set_name("TEST VOICE");
        patch.algorithm = 17;
        patch.feedback = 5;
        patch.op[0].level = 72;
        patch.op[3].detune = 3;
        patch
    }

    #[test]
    fn test_empty_data() {
        assert!(parse_sysex_data(&[]).is_err());
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1]), 0x7F);
        assert_eq!(checksum(&[0x40, 0x40]), 0);
        let data = [0x12, 0x34, 0x56];
        assert_eq!((data.iter().map(|&b| u32::from(b)).sum::<u32>() + u32::from(checksum(&data))) & 0x7F, 0);
    }

    #[test]
    fn test_voice_message_layout() {
        let msg = encode_voice(&test_patch(), 2);
        assert_eq!(msg.len(), VOICE_MESSAGE_SIZE);
        assert_eq!(msg.len(), 163);
        assert_eq!(&msg[..6], &[0xF0, 0x43, 0x02, 0x00, 0x01, 0x1B]);
        assert_eq!(msg[162], 0xF7);
    }

    #[test]
    fn test_bank_message_layout() {
        let msg = encode_bank(&PatchBank::default(), 0);
        assert_eq!(msg.len(), BANK_MESSAGE_SIZE);
        assert_eq!(msg.len(), 4104);
        assert_eq!(&msg[..6], &[0xF0, 0x43, 0x00, 0x09, 0x20, 0x00]);
        assert_eq!(msg[4103], 0xF7);
    }

    #[test]
    fn test_voice_round_trip_drops_operator_mask() {
        let mut patch = test_patch();
        patch.op_enable = 0b101010;

        let decoded = match parse_message(&encode_voice(&patch, 0)).unwrap() {
            SysexData::Voice(p) => p,
            SysexData::Bank(_) => panic!("expected a single voice"),
        };

        assert_eq!(decoded.op_enable, ALL_OPERATORS);
        patch.op_enable = ALL_OPERATORS;
        assert_eq!(decoded, patch);
    }

    #[test]
    fn test_bank_round_trip() {
        let mut bank = PatchBank::default();
        bank.patches[5] = test_patch();

        let patches = parse_sysex_data(&encode_bank(&bank, 0)).unwrap();
        assert_eq!(patches.len(), 32);
        assert_eq!(patches[5], test_patch());
        assert_eq!(patches[5].name(), "TEST VOICE");
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut msg = encode_voice(&test_patch(), 0);
        msg[161] ^= 0x01;
        let err = parse_message(&msg).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut msg = encode_voice(&test_patch(), 0);
        msg[1] = 0x41;
        assert!(parse_message(&msg).is_err());

        let mut msg = encode_voice(&test_patch(), 0);
        msg[3] = 0x05;
        assert!(parse_message(&msg).is_err());

        let mut msg = encode_voice(&test_patch(), 0);
        msg[2] = 0x20;
        assert!(parse_message(&msg).is_err());
    }

    #[test]
    fn test_rejects_truncated() {
        let msg = encode_bank(&PatchBank::default(), 0);
        let mut short = msg[..200].to_vec();
        short.push(SYSEX_END);
        assert!(parse_message(&short).is_err());
    }

    #[test]
    fn test_stream_with_several_messages() {
        let mut stream = vec![0x00, 0x01];
        stream.extend(encode_voice(&test_patch(), 0));
        stream.extend(encode_voice(&Patch::default(), 3));

        let patches = parse_sysex_data(&stream).unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].name(), "TEST VOICE");
        assert_eq!(patches[1].name(), "INIT VOICE");
    }
}
