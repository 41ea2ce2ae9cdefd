//! Firmware ROM tables
//!
//! Lookup tables used by the DX7 firmware to translate patch parameters
//! (mostly 0-99 front panel values) into EGS/OPS register values. The
//! contents are transcribed from the firmware ROM and must not be "tidied";
//! several of them carry deliberate irregularities.

/// 0-99 level to 7-bit attenuation (0x7F = silent, 0x00 = full level)
pub const LOG_LEVEL: [u8; 100] = [
    0x7F, 0x7A, 0x76, 0x72, 0x6E, 0x6B, 0x68, 0x66, 0x64, 0x62,
    0x60, 0x5E, 0x5C, 0x5A, 0x58, 0x56, 0x55, 0x54, 0x52, 0x51,
    0x4F, 0x4E, 0x4D, 0x4C, 0x4B, 0x4A, 0x49, 0x48, 0x47, 0x46,
    0x45, 0x44, 0x43, 0x42, 0x41, 0x40, 0x3F, 0x3E, 0x3D, 0x3C,
    0x3B, 0x3A, 0x39, 0x38, 0x37, 0x36, 0x35, 0x34, 0x33, 0x32,
    0x31, 0x30, 0x2F, 0x2E, 0x2D, 0x2C, 0x2B, 0x2A, 0x29, 0x28,
    0x27, 0x26, 0x25, 0x24, 0x23, 0x22, 0x21, 0x20, 0x1F, 0x1E,
    0x1D, 0x1C, 0x1B, 0x1A, 0x19, 0x18, 0x17, 0x16, 0x15, 0x14,
    0x13, 0x12, 0x11, 0x10, 0x0F, 0x0E, 0x0D, 0x0C, 0x0B, 0x0A,
    0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00
];

/// MIDI note to 8-bit log pitch (4 steps per semitone, skipping every 3rd)
pub const KEY_PITCH: [u8; 128] = [
    0x00, 0x00, 0x01, 0x02, 0x04, 0x05, 0x06, 0x08,
    0x09, 0x0A, 0x0C, 0x0D, 0x0E, 0x10, 0x11, 0x12,
    0x14, 0x15, 0x16, 0x18, 0x19, 0x1A, 0x1C, 0x1D,
    0x1E, 0x20, 0x21, 0x22, 0x24, 0x25, 0x26, 0x28,
    0x29, 0x2A, 0x2C, 0x2D, 0x2E, 0x30, 0x31, 0x32,
    0x34, 0x35, 0x36, 0x38, 0x39, 0x3A, 0x3C, 0x3D,
    0x3E, 0x40, 0x41, 0x42, 0x44, 0x45, 0x46, 0x48,
    0x49, 0x4A, 0x4C, 0x4D, 0x4E, 0x50, 0x51, 0x52,
    0x54, 0x55, 0x56, 0x58, 0x59, 0x5A, 0x5C, 0x5D,
    0x5E, 0x60, 0x61, 0x62, 0x64, 0x65, 0x66, 0x68,
    0x69, 0x6A, 0x6C, 0x6D, 0x6E, 0x70, 0x71, 0x72,
    0x74, 0x75, 0x76, 0x78, 0x79, 0x7A, 0x7C, 0x7D,
    0x7E, 0x80, 0x81, 0x82, 0x84, 0x85, 0x86, 0x88,
    0x89, 0x8A, 0x8C, 0x8D, 0x8E, 0x90, 0x91, 0x92,
    0x94, 0x95, 0x96, 0x98, 0x99, 0x9A, 0x9C, 0x9D,
    0x9E, 0xA0, 0xA1, 0xA2, 0xA4, 0xA5, 0xA6, 0xA8
];

/// Ratio mode coarse frequency (0-31) in 16-bit log pitch
pub const OP_FREQ_COARSE: [u16; 32] = [
    0xF000, 0x0000, 0x1000, 0x195C, 0x2000, 0x2528, 0x295C, 0x2CEC,
    0x3000, 0x32B8, 0x3528, 0x375A, 0x395C, 0x3B34, 0x3CEC, 0x3E84,
    0x4000, 0x4168, 0x42B8, 0x43F8, 0x4528, 0x4648, 0x475A, 0x4860,
    0x495C, 0x4A4C, 0x4B34, 0x4C14, 0x4CEC, 0x4DBA, 0x4E84, 0x4F44
];

/// Ratio mode fine frequency (0-99) in 16-bit log pitch
pub const OP_FREQ_FINE: [u16; 100] = [
    0x000, 0x03A, 0x075, 0x0AE, 0x0E7, 0x120, 0x158, 0x18F, 0x1C6, 0x1FD,
    0x233, 0x268, 0x29D, 0x2D2, 0x306, 0x339, 0x36D, 0x39F, 0x3D2, 0x403,
    0x435, 0x466, 0x497, 0x4C7, 0x4F7, 0x526, 0x555, 0x584, 0x5B2, 0x5E0,
    0x60E, 0x63B, 0x668, 0x695, 0x6C1, 0x6ED, 0x719, 0x744, 0x76F, 0x799,
    0x7C4, 0x7EE, 0x818, 0x841, 0x86A, 0x893, 0x8BC, 0x8E4, 0x90C, 0x934,
    0x95C, 0x983, 0x9AA, 0x9D1, 0x9F7, 0xA1D, 0xA43, 0xA69, 0xA8F, 0xAB4,
    0xAD9, 0xAFE, 0xB22, 0xB47, 0xB6B, 0xB8F, 0xBB2, 0xBD6, 0xBF9, 0xC1C,
    0xC3F, 0xC62, 0xC84, 0xCA7, 0xCC9, 0xCEA, 0xD0C, 0xD2E, 0xD4F, 0xD70,
    0xD91, 0xDB2, 0xDD2, 0xDF3, 0xE13, 0xE33, 0xE53, 0xE72, 0xE92, 0xEB1,
    0xED0, 0xEEF, 0xF0E, 0xF2D, 0xF4C, 0xF6A, 0xF88, 0xFA6, 0xFC4, 0xFE2
];

/// Offset added to every ratio mode operator pitch
pub const OP_FREQ_RATIO_OFFSET: u16 = 0x232C;

/// Fixed mode coarse frequency (1, 10, 100, 1000 Hz) in 16-bit log pitch
pub const OP_FREQ_FIXED: [u16; 4] = [0x0000, 0x3526, 0x6A4C, 0x9F74];

/// Fixed mode log pitch step per unit of fine frequency
pub const OP_FREQ_FIXED_FINE_STEP: u16 = 136;

/// Offset added to every fixed mode operator pitch
pub const OP_FREQ_FIXED_OFFSET: u16 = 0x16AC;

/// MIDI velocity (top 5 bits) to 7-bit velocity attenuation
pub const MIDI_VELOCITY: [u8; 32] = [
    0x6E, 0x64, 0x5A, 0x55, 0x50, 0x4B, 0x46, 0x41,
    0x3A, 0x36, 0x32, 0x2E, 0x2A, 0x26, 0x22, 0x1E,
    0x1C, 0x1A, 0x18, 0x16, 0x14, 0x12, 0x10, 0x0E,
    0x0C, 0x0A, 0x08, 0x06, 0x04, 0x02, 0x01, 0x00,
];

/// Velocity attenuation (top 5 bits) to operator volume scale
pub const OP_VOLUME_VELOCITY_SCALE: [u8; 32] = [
    0x00, 0x04, 0x0C, 0x15, 0x1E, 0x28, 0x2E, 0x34,
    0x3A, 0x40, 0x46, 0x4C, 0x52, 0x58, 0x5E, 0x64,
    0x67, 0x6A, 0x6D, 0x70, 0x72, 0x74, 0x76, 0x78,
    0x7A, 0x7C, 0x7E, 0x80, 0x82, 0x83, 0x84, 0x85,
];

/// Key velocity sensitivity step
pub const KEY_VELOCITY_SENSE_STEP: u16 = 0x1E0;

/// Number of keyboard scaling groups (3 semitones per group)
pub const KBD_SCALING_GROUPS: usize = 43;

/// Exponential keyboard level scaling curve
pub const KBD_SCALING_CURVE_EXP: [u8; 36] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05,
    0x06, 0x07, 0x08, 0x09, 0x0B, 0x0E,
    0x10, 0x13, 0x17, 0x1C, 0x21, 0x27,
    0x2F, 0x39, 0x43, 0x50, 0x5F, 0x71,
    0x86, 0xA0, 0xBE, 0xE0, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Linear keyboard level scaling curve
pub const KBD_SCALING_CURVE_LIN: [u8; 36] = [
    0x00, 0x08, 0x10, 0x18, 0x20, 0x28,
    0x30, 0x38, 0x40, 0x48, 0x50, 0x58,
    0x60, 0x68, 0x70, 0x78, 0x80, 0x88,
    0x90, 0x98, 0xA0, 0xA8, 0xB2, 0xB8,
    0xC0, 0xC8, 0xD0, 0xD8, 0xE0, 0xE8,
    0xF0, 0xF8, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Combined (inverted) modulation amount to EGS amplitude modulation
pub const AMP_MOD: [u8; 256] = [
    0xFF, 0xFF, 0xE0, 0xCD, 0xC0, 0xB5, 0xAD, 0xA6, 0xA0, 0x9A, 0x95, 0x91, 0x8D, 0x89, 0x86, 0x82,
    0x80, 0x7D, 0x7A, 0x78, 0x75, 0x73, 0x71, 0x6F, 0x6D, 0x6B, 0x69, 0x67, 0x66, 0x64, 0x62, 0x61,
    0x60, 0x5E, 0x5D, 0x5B, 0x5A, 0x59, 0x58, 0x56, 0x55, 0x54, 0x53, 0x52, 0x51, 0x50, 0x4F, 0x4E,
    0x4D, 0x4C, 0x4B, 0x4A, 0x49, 0x48, 0x47, 0x46, 0x46, 0x45, 0x44, 0x43, 0x42, 0x42, 0x41, 0x40,
    0x40, 0x3F, 0x3E, 0x3D, 0x3D, 0x3C, 0x3B, 0x3B, 0x3A, 0x39, 0x39, 0x38, 0x38, 0x37, 0x36, 0x36,
    0x35, 0x35, 0x34, 0x33, 0x33, 0x32, 0x32, 0x31, 0x31, 0x30, 0x30, 0x2F, 0x2F, 0x2E, 0x2E, 0x2D,
    0x2D, 0x2C, 0x2C, 0x2B, 0x2B, 0x2A, 0x2A, 0x2A, 0x29, 0x29, 0x28, 0x28, 0x27, 0x27, 0x26, 0x26,
    0x26, 0x25, 0x25, 0x24, 0x24, 0x24, 0x23, 0x23, 0x22, 0x22, 0x22, 0x21, 0x21, 0x21, 0x20, 0x20,
    0x20, 0x1F, 0x1F, 0x1E, 0x1E, 0x1E, 0x1D, 0x1D, 0x1D, 0x1C, 0x1C, 0x1C, 0x1B, 0x1B, 0x1B, 0x1A,
    0x1A, 0x1A, 0x19, 0x19, 0x19, 0x18, 0x18, 0x18, 0x18, 0x17, 0x17, 0x17, 0x16, 0x16, 0x16, 0x15,
    0x15, 0x15, 0x15, 0x14, 0x14, 0x14, 0x13, 0x13, 0x13, 0x13, 0x12, 0x12, 0x12, 0x12, 0x11, 0x11,
    0x11, 0x11, 0x10, 0x10, 0x10, 0x10, 0x0F, 0x0F, 0x0F, 0x0F, 0x0E, 0x0E, 0x0E, 0x0E, 0x0D, 0x0D,
    0x0D, 0x0D, 0x0C, 0x0C, 0x0C, 0x0C, 0x0B, 0x0B, 0x0B, 0x0B, 0x0A, 0x0A, 0x0A, 0x0A, 0x09, 0x09,
    0x09, 0x09, 0x08, 0x08, 0x08, 0x08, 0x08, 0x07, 0x07, 0x07, 0x07, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x04, 0x04, 0x04, 0x04, 0x04, 0x03, 0x03, 0x03, 0x03, 0x03, 0x02,
    0x02, 0x02, 0x02, 0x02, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00
];

/// Pitch EG rate (0-99) to per-update increment
pub const PITCH_EG_RATE: [u8; 100] = [
    0x01, 0x02, 0x03, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x06,
    0x07, 0x07, 0x08, 0x08, 0x09, 0x09, 0x0A, 0x0A, 0x0B, 0x0B,
    0x0C, 0x0C, 0x0D, 0x0D, 0x0E, 0x0E, 0x0F, 0x10, 0x10, 0x11,
    0x12, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A,
    0x1B, 0x1C, 0x1E, 0x1F, 0x21, 0x22, 0x24, 0x25, 0x26, 0x27,
    0x29, 0x2A, 0x2C, 0x2E, 0x2F, 0x31, 0x33, 0x35, 0x36, 0x38,
    0x3A, 0x3C, 0x3E, 0x40, 0x42, 0x44, 0x46, 0x48, 0x4A, 0x4C,
    0x4F, 0x52, 0x55, 0x58, 0x5B, 0x5E, 0x62, 0x66, 0x6A, 0x6E,
    0x73, 0x78, 0x7D, 0x82, 0x87, 0x8D, 0x93, 0x99, 0x9F, 0xA5,
    0xAB, 0xB2, 0xB9, 0xC1, 0xCA, 0xD3, 0xE8, 0xF3, 0xFE, 0xFF
];

/// Pitch EG level (0-99) to 8-bit level, 50 is the centre (0x80)
pub const PITCH_EG_LEVEL: [u8; 100] = [
    0x00, 0x0C, 0x18, 0x21, 0x2B, 0x34, 0x3C, 0x43, 0x48, 0x4C,
    0x4F, 0x52, 0x55, 0x57, 0x59, 0x5B, 0x5D, 0x5F, 0x60, 0x61,
    0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x6B,
    0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0x73, 0x74, 0x75,
    0x76, 0x77, 0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x8B, 0x8C, 0x8D, 0x8E, 0x8F, 0x90, 0x91, 0x92, 0x93,
    0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9B, 0x9C, 0x9D,
    0x9E, 0x9F, 0xA0, 0xA1, 0xA2, 0xA3, 0xA6, 0xA8, 0xAB, 0xAE,
    0xB1, 0xB5, 0xBA, 0xC1, 0xC9, 0xD2, 0xDC, 0xE7, 0xF3, 0xFF
];

/// First quadrant of the LFO sine wave
pub const LFO_SINE: [u8; 64] = [
    0x02, 0x05, 0x08, 0x0B, 0x0E, 0x11, 0x14, 0x17,
    0x1A, 0x1D, 0x20, 0x23, 0x26, 0x29, 0x2C, 0x2F,
    0x32, 0x35, 0x38, 0x3A, 0x3D, 0x40, 0x43, 0x45,
    0x48, 0x4A, 0x4D, 0x4F, 0x52, 0x54, 0x56, 0x59,
    0x5B, 0x5D, 0x5F, 0x61, 0x63, 0x65, 0x67, 0x69,
    0x6A, 0x6C, 0x6E, 0x6F, 0x71, 0x72, 0x73, 0x75,
    0x76, 0x77, 0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7C,
    0x7D, 0x7D, 0x7E, 0x7E, 0x7F, 0x7F, 0x7F, 0x7F
];

/// LFO pitch modulation sensitivity (0-7) to 8-bit scale
pub const PITCH_MOD_SENSE: [u8; 8] = [0, 10, 20, 33, 55, 92, 153, 255];

/// Master tune offset added to the voice pitch
pub const MASTER_TUNE: i32 = 0x0100;

/// Voice pitch offset removed before the master tune is applied
pub const VOICE_PITCH_OFFSET: i32 = 0x1BA8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_monotonic() {
        assert_eq!(LOG_LEVEL[0], 0x7F);
        assert_eq!(LOG_LEVEL[99], 0x00);
        for pair in LOG_LEVEL.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn test_key_pitch_steps() {
        // 12 semitones are 16 steps, note 0 is a ROM special case
        for note in 13..128 {
            assert_eq!(KEY_PITCH[note] - KEY_PITCH[note - 12], 0x10);
        }
    }

    #[test]
    fn test_pitch_eg_level_centre() {
        assert_eq!(PITCH_EG_LEVEL[50], 0x80);
        for pair in PITCH_EG_LEVEL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
