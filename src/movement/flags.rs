use serde::{Deserialize, Serialize};

/// Bit-packed move flags shared with the server on every saved move.
///
/// The lower nibble belongs to the base move (jump, crouch); the upper
/// nibble holds the four custom intent bits. Two are in use, two are
/// reserved and always round-trip as zero:
///
/// - `0x10` wants-to-sprint
/// - `0x20` wall-run keys down
/// - `0x40`, `0x80` reserved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedFlags(u8);

impl CompressedFlags {
    pub const JUMP: u8 = 0x01;
    pub const CROUCH: u8 = 0x02;

    const CUSTOM_SPRINT: u8 = 0x10;
    const CUSTOM_WALL_RUN: u8 = 0x20;
    const BASE_MASK: u8 = 0x0F;

    /// Pack the two intent booleans into the custom bits.
    pub fn encode(wants_to_sprint: bool, wall_run_keys_down: bool) -> Self {
        let mut bits = 0;
        if wants_to_sprint {
            bits |= Self::CUSTOM_SPRINT;
        }
        if wall_run_keys_down {
            bits |= Self::CUSTOM_WALL_RUN;
        }
        Self(bits)
    }

    /// OR the base move's flag nibble into this byte. Custom bits win; any
    /// base bits outside the lower nibble are dropped.
    pub fn with_base(self, base_bits: u8) -> Self {
        Self(self.0 | (base_bits & Self::BASE_MASK))
    }

    /// Restore the two intent booleans from the custom bits.
    pub fn decode(self) -> (bool, bool) {
        (self.wants_to_sprint(), self.wall_run_keys_down())
    }

    pub fn wants_to_sprint(self) -> bool {
        self.0 & Self::CUSTOM_SPRINT != 0
    }

    pub fn wall_run_keys_down(self) -> bool {
        self.0 & Self::CUSTOM_WALL_RUN != 0
    }

    pub fn crouching(self) -> bool {
        self.0 & Self::CROUCH != 0
    }

    pub fn jumping(self) -> bool {
        self.0 & Self::JUMP != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Just the base move nibble.
    pub fn base_bits(self) -> u8 {
        self.0 & Self::BASE_MASK
    }

    /// Rebuild from a wire byte. The layout is fixed, so the byte is taken
    /// as-is; senders never set the reserved custom bits.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_combinations() {
        for sprint in [false, true] {
            for wall_run in [false, true] {
                let flags = CompressedFlags::encode(sprint, wall_run);
                assert_eq!(flags.decode(), (sprint, wall_run));

                let rewired = CompressedFlags::from_bits(flags.bits());
                assert_eq!(rewired.decode(), (sprint, wall_run));
            }
        }
    }

    #[test]
    fn test_reserved_custom_bits_stay_zero() {
        let flags = CompressedFlags::encode(true, true);
        assert_eq!(flags.bits() & 0xC0, 0);

        let with_base = flags.with_base(CompressedFlags::CROUCH);
        assert_eq!(with_base.bits() & 0xC0, 0);
    }

    #[test]
    fn test_wire_layout() {
        assert_eq!(CompressedFlags::encode(true, false).bits(), 0x10);
        assert_eq!(CompressedFlags::encode(false, true).bits(), 0x20);
        assert_eq!(CompressedFlags::encode(true, true).bits(), 0x30);
    }

    #[test]
    fn test_base_bits_kept_separate() {
        let flags = CompressedFlags::encode(false, true).with_base(CompressedFlags::JUMP | CompressedFlags::CROUCH);
        assert!(flags.jumping());
        assert!(flags.crouching());
        assert!(!flags.wants_to_sprint());
        assert!(flags.wall_run_keys_down());

        // Base bits may not spill into the custom nibble
        let dirty = CompressedFlags::default().with_base(0xFF);
        assert_eq!(dirty.bits(), 0x0F);
    }
}
