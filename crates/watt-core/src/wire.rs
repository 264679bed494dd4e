//! Wire encoding for the pedal's MIDI protocol.
//!
//! The Whammy is driven with two message kinds:
//!
//! - program change `[0xC0, patch]` selects the effect; patches 0-15 are the
//!   active bank, 16-31 the same effects bypassed
//! - control change `[0xB0, controller, value]` carries the stomp switch
//!   (controller 0) and the toe/expression position (controller 11)
//!
//! All data bytes are 7-bit.

/// Program change status byte
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Control change status byte
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Controller number for the stomp (bypass/enable) switch
pub const CC_STOMP: u8 = 0;

/// Controller number for the toe (expression pedal) position
pub const CC_TOE: u8 = 11;

/// Patch offset selecting the bypassed bank of an effect
pub const BYPASS_BANK_OFFSET: u8 = 16;

/// Encode a program change message
pub fn program_change(patch: u8) -> Vec<u8> {
    vec![PROGRAM_CHANGE, patch & 0x7F]
}

/// Encode a control change message
pub fn control_change(controller: u8, value: u8) -> Vec<u8> {
    vec![CONTROL_CHANGE, controller & 0x7F, value & 0x7F]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_change_bytes() {
        assert_eq!(program_change(4), vec![0xC0, 4]);
        assert_eq!(program_change(20), vec![0xC0, 20]);
        // Data bytes are masked to 7 bits
        assert_eq!(program_change(0xFF), vec![0xC0, 0x7F]);
    }

    #[test]
    fn test_control_change_bytes() {
        assert_eq!(control_change(CC_STOMP, 127), vec![0xB0, 0, 127]);
        assert_eq!(control_change(CC_TOE, 64), vec![0xB0, 11, 64]);
        assert_eq!(control_change(CC_TOE, 0xFF), vec![0xB0, 11, 0x7F]);
    }
}
