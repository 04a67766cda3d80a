//! Live channel and percussion muting
//!
//! Muting never touches the song data. When a key-on register is written, the
//! value sent to the engine has its key-on bit (or the muted rhythm bits)
//! cleared, so the muted voice never starts a note.

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Register group holding key-on/block/F-number high bits (0xB0-0xB8)
const KEY_ON_GROUP: u8 = 0xB0;

/// Key-on bit in the 0xB0-0xB8 registers
const KEY_ON_BIT: u8 = 0x20;

/// Rhythm mode register
pub const RHYTHM_REGISTER: u8 = 0xBD;

/// Melodic channels on an OPL2
pub const MELODIC_CHANNELS: usize = 9;

bitflags! {
    /// Muted melodic channels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelMask: u16 {
        /// Channel 0 (register 0xB0)
        const CH_0 = 1 << 0;
        /// Channel 1
        const CH_1 = 1 << 1;
        /// Channel 2
        const CH_2 = 1 << 2;
        /// Channel 3
        const CH_3 = 1 << 3;
        /// Channel 4
        const CH_4 = 1 << 4;
        /// Channel 5
        const CH_5 = 1 << 5;
        /// Channel 6
        const CH_6 = 1 << 6;
        /// Channel 7
        const CH_7 = 1 << 7;
        /// Channel 8 (register 0xB8)
        const CH_8 = 1 << 8;
    }
}

impl ChannelMask {
    /// Flag for melodic channel `index`, if it exists
    pub fn channel(index: usize) -> Option<Self> {
        if index < MELODIC_CHANNELS {
            Some(ChannelMask::from_bits_truncate(1 << index))
        } else {
            None
        }
    }
}

bitflags! {
    /// Muted rhythm voices, laid out like the low bits of register 0xBD
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PercussionMask: u8 {
        /// Hi-hat
        const HI_HAT = 0x01;
        /// Top cymbal
        const CYMBAL = 0x02;
        /// Tom-tom
        const TOM_TOM = 0x04;
        /// Snare drum
        const SNARE_DRUM = 0x08;
        /// Bass drum
        const BASS_DRUM = 0x10;
    }
}

/// Rhythm-mode voice, numbered by its bit in register 0xBD
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum PercussionVoice {
    /// Hi-hat (bit 0)
    HiHat = 0,
    /// Top cymbal (bit 1)
    Cymbal = 1,
    /// Tom-tom (bit 2)
    TomTom = 2,
    /// Snare drum (bit 3)
    SnareDrum = 3,
    /// Bass drum (bit 4)
    BassDrum = 4,
}

impl PercussionVoice {
    /// Voice for `index`, if it exists
    pub fn from_index(index: usize) -> Option<Self> {
        PercussionVoice::from_usize(index)
    }

    /// Flag of this voice in [`PercussionMask`]
    pub fn mask(self) -> PercussionMask {
        PercussionMask::from_bits_truncate(1 << self as u8)
    }
}

/// Combined mute state for melodic channels and rhythm voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MuteMask {
    /// Muted melodic channels
    pub channels: ChannelMask,
    /// Muted rhythm voices
    pub percussion: PercussionMask,
}

impl MuteMask {
    /// Value to send to the engine for a write of `value` to `register`
    #[inline]
    pub fn filter(&self, register: u8, value: u8) -> u8 {
        if register & 0xF0 != KEY_ON_GROUP {
            return value;
        }
        if register == RHYTHM_REGISTER {
            return value & !self.percussion.bits();
        }
        match ChannelMask::channel((register & 0x0F) as usize) {
            Some(flag) if self.channels.contains(flag) => value & !KEY_ON_BIT,
            _ => value,
        }
    }

    /// True if nothing is muted
    pub fn is_clear(&self) -> bool {
        self.channels.is_empty() && self.percussion.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_on_cleared_for_muted_channel() {
        let mask = MuteMask {
            channels: ChannelMask::CH_0,
            ..Default::default()
        };
        assert_eq!(mask.filter(0xB0, 0x21), 0x01);
        assert_eq!(mask.filter(0xB1, 0x21), 0x21);
        // other register groups pass through
        assert_eq!(mask.filter(0xA0, 0x21), 0x21);
        assert_eq!(mask.filter(0x20, 0x21), 0x21);
    }

    #[test]
    fn test_rhythm_bits_cleared() {
        let mask = MuteMask {
            percussion: PercussionVoice::SnareDrum.mask() | PercussionVoice::HiHat.mask(),
            ..Default::default()
        };
        assert_eq!(mask.filter(RHYTHM_REGISTER, 0x3F), 0x36);
    }

    #[test]
    fn test_rhythm_register_ignores_channel_mask() {
        let mask = MuteMask {
            channels: ChannelMask::all(),
            ..Default::default()
        };
        // 0xBD low nibble is 13, not a melodic channel
        assert_eq!(mask.filter(RHYTHM_REGISTER, 0x3F), 0x3F);
        assert_eq!(mask.filter(0xB8, 0x3F), 0x1F);
        assert_eq!(mask.filter(0xB9, 0x3F), 0x3F);
    }

    #[test]
    fn test_voice_indices() {
        assert_eq!(PercussionVoice::from_index(0), Some(PercussionVoice::HiHat));
        assert_eq!(PercussionVoice::from_index(4), Some(PercussionVoice::BassDrum));
        assert_eq!(PercussionVoice::from_index(5), None);
        assert_eq!(PercussionVoice::BassDrum.mask(), PercussionMask::BASS_DRUM);
        assert_eq!(ChannelMask::channel(8), Some(ChannelMask::CH_8));
        assert_eq!(ChannelMask::channel(9), None);
    }

    #[test]
    fn test_clear_mask_passes_everything() {
        let mask = MuteMask::default();
        assert!(mask.is_clear());
        for register in 0xB0..=0xBD {
            assert_eq!(mask.filter(register, 0xFF), 0xFF);
        }
    }
}
