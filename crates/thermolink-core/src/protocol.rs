//! SPI frame codec for the slave link.
//!
//! Every acquisition cycle exchanges exactly [`FRAME_LEN`] bytes in each
//! direction. The master clocks out a [`ControlFrame`] and simultaneously
//! clocks in a [`StatusFrame`].
//!
//! Wire layout:
//! - outbound: `[0x00, 0x00, led_command]`
//! - inbound:  `[adc_low, adc_high, led_state_echo]`

use core::fmt;

/// Number of bytes exchanged per transaction, in each direction.
pub const FRAME_LEN: usize = 3;

/// Largest value the slave's 12-bit ADC can report.
pub const ADC_MAX: u16 = 4095;

/// LED command / state byte.
///
/// Only the three low bits are meaningful; the rest are carried through
/// untouched so the slave sees exactly what the client sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedCommand(u8);

impl LedCommand {
    pub const NONE: Self = Self(0);
    pub const GREEN: Self = Self(0b001);
    pub const YELLOW: Self = Self(0b010);
    pub const RED: Self = Self(0b100);

    /// Mask of the bits that drive an LED.
    pub const LED_MASK: u8 = 0b111;

    /// Wrap a raw byte, keeping reserved bits as-is.
    pub const fn from_bits_retain(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when any bit outside [`Self::LED_MASK`] is set.
    pub const fn has_reserved_bits(self) -> bool {
        self.0 & !Self::LED_MASK != 0
    }
}

impl fmt::Display for LedCommand {
    /// Renders the byte in binary, e.g. `00000101`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

/// Frame sent from the master to the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame {
    reserved: [u8; 2],
    pub led_command: u8,
}

impl ControlFrame {
    /// Build the outbound frame for `led_command`.
    ///
    /// Any byte is accepted; reserved bytes are always zero.
    pub const fn encode(led_command: u8) -> Self {
        Self {
            reserved: [0, 0],
            led_command,
        }
    }

    pub const fn as_bytes(&self) -> [u8; FRAME_LEN] {
        [self.reserved[0], self.reserved[1], self.led_command]
    }
}

/// Frame received from the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFrame {
    pub adc_low: u8,
    pub adc_high: u8,
    pub led_state_echo: u8,
}

impl StatusFrame {
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self {
            adc_low: bytes[0],
            adc_high: bytes[1],
            led_state_echo: bytes[2],
        }
    }

    pub const fn as_bytes(&self) -> [u8; FRAME_LEN] {
        [self.adc_low, self.adc_high, self.led_state_echo]
    }

    /// Split the frame into the LED echo and the raw ADC sample.
    ///
    /// The ADC value is always `(adc_high << 8) | adc_low`.
    pub const fn decode(&self) -> SlaveReading {
        SlaveReading {
            led_state: self.led_state_echo,
            raw_adc: u16::from_le_bytes([self.adc_low, self.adc_high]),
        }
    }
}

/// Decoded content of a [`StatusFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlaveReading {
    pub led_state: u8,
    pub raw_adc: u16,
}

impl SlaveReading {
    /// `(led_state << 16) | raw_adc`, the packed form used for reporting.
    pub const fn packed(&self) -> u32 {
        ((self.led_state as u32) << 16) | self.raw_adc as u32
    }

    pub const fn led(&self) -> LedCommand {
        LedCommand::from_bits_retain(self.led_state)
    }
}
