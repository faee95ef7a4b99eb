//! Register map and bit-field descriptors for the NAU7802.
//!
//! # Description
//! Field positions are data: each descriptor names its register and bit range, and the
//! byte-level accessors are pure functions, so field arithmetic is testable without a
//! bus. The driver composes a register read, one of these accessors, and a register
//! write to perform its read-modify-write cycles.

use bit_field::BitField;
use serde::{Deserialize, Serialize};

/// The register map of the converter.
#[allow(dead_code)]
#[derive(Copy, Clone)]
pub(crate) enum Register {
    PuCtrl = 0x00,
    Ctrl1 = 0x01,
    Ctrl2 = 0x02,
    Ocal1B2 = 0x03,
    Ocal1B1 = 0x04,
    Ocal1B0 = 0x05,
    Gcal1B3 = 0x06,
    Gcal1B2 = 0x07,
    Gcal1B1 = 0x08,
    Gcal1B0 = 0x09,
    Ocal2B2 = 0x0A,
    Ocal2B1 = 0x0B,
    Ocal2B0 = 0x0C,
    Gcal2B3 = 0x0D,
    Gcal2B2 = 0x0E,
    Gcal2B1 = 0x0F,
    Gcal2B0 = 0x10,
    I2cControl = 0x11,
    AdcoB2 = 0x12,
    AdcoB1 = 0x13,
    AdcoB0 = 0x14,
    Adc = 0x15,
    OtpB1 = 0x16,
    OtpB0 = 0x17,
    Pga = 0x1B,
    PgaPwr = 0x1C,
    DeviceRev = 0x1F,
}

/// Location of a single-bit flag within a device register.
#[derive(Copy, Clone)]
pub(crate) struct Bit {
    pub(crate) register: Register,
    index: usize,
}

impl Bit {
    const fn new(register: Register, index: usize) -> Self {
        Bit { register, index }
    }

    /// Extract the flag state from a register byte.
    pub(crate) fn extract(self, byte: u8) -> bool {
        byte.get_bit(self.index)
    }

    /// Return `byte` with the flag set to `state`, leaving all other bits untouched.
    pub(crate) fn insert(self, mut byte: u8, state: bool) -> u8 {
        *byte.set_bit(self.index, state)
    }
}

/// Location of a multi-bit field within a device register.
#[derive(Copy, Clone)]
pub(crate) struct Field {
    pub(crate) register: Register,
    offset: usize,
    width: usize,
}

impl Field {
    const fn new(register: Register, offset: usize, width: usize) -> Self {
        Field {
            register,
            offset,
            width,
        }
    }

    /// Extract the field value from a register byte.
    pub(crate) fn extract(self, byte: u8) -> u8 {
        byte.get_bits(self.offset..self.offset + self.width)
    }

    /// Return `byte` with the field set to `value`, leaving all other bits untouched.
    ///
    /// # Note
    /// `value` must not exceed [`Field::max`].
    pub(crate) fn insert(self, mut byte: u8, value: u8) -> u8 {
        *byte.set_bits(self.offset..self.offset + self.width, value)
    }

    /// The largest value the field can hold.
    pub(crate) fn max(self) -> u8 {
        ((1usize << self.width) - 1) as u8
    }
}

/// Flags of the power-up control register.
#[allow(dead_code)]
pub(crate) mod pu_ctrl {
    use super::{Bit, Register};

    /// Register reset.
    pub(crate) const RR: Bit = Bit::new(Register::PuCtrl, 0);
    /// Power up the digital circuit.
    pub(crate) const PUD: Bit = Bit::new(Register::PuCtrl, 1);
    /// Power up the analog circuit.
    pub(crate) const PUA: Bit = Bit::new(Register::PuCtrl, 2);
    /// Power-up ready, read-only.
    pub(crate) const PUR: Bit = Bit::new(Register::PuCtrl, 3);
    /// Start a conversion cycle.
    pub(crate) const CS: Bit = Bit::new(Register::PuCtrl, 4);
    /// Conversion cycle ready, read-only.
    pub(crate) const CR: Bit = Bit::new(Register::PuCtrl, 5);
    /// System clock source select.
    pub(crate) const OSCS: Bit = Bit::new(Register::PuCtrl, 6);
    /// Analog supply source select, set for the internal regulator.
    pub(crate) const AVDDS: Bit = Bit::new(Register::PuCtrl, 7);
}

/// Fields of control register 1.
#[allow(dead_code)]
pub(crate) mod ctrl1 {
    use super::{Bit, Field, Register};

    /// Programmable amplifier gain select.
    pub(crate) const GAINS: Field = Field::new(Register::Ctrl1, 0, 3);
    /// Internal regulator voltage select.
    pub(crate) const VLDO: Field = Field::new(Register::Ctrl1, 3, 3);
    /// Data-ready pin function select.
    pub(crate) const DRDY_SEL: Bit = Bit::new(Register::Ctrl1, 6);
    /// Conversion-ready pin polarity, set for active low.
    pub(crate) const CRP: Bit = Bit::new(Register::Ctrl1, 7);
}

/// Fields of control register 2.
#[allow(dead_code)]
pub(crate) mod ctrl2 {
    use super::{Bit, Field, Register};

    /// Calibration mode select.
    pub(crate) const CALMOD: Field = Field::new(Register::Ctrl2, 0, 2);
    /// Start a calibration cycle, remains set while the cycle runs.
    pub(crate) const CALS: Bit = Bit::new(Register::Ctrl2, 2);
    /// Calibration failure, read-only.
    pub(crate) const CAL_ERR: Bit = Bit::new(Register::Ctrl2, 3);
    /// Conversion rate select.
    pub(crate) const CRS: Field = Field::new(Register::Ctrl2, 4, 3);
    /// Input channel select, set for channel 2.
    pub(crate) const CHS: Bit = Bit::new(Register::Ctrl2, 7);
}

/// Flags of the amplifier configuration register.
#[allow(dead_code)]
pub(crate) mod pga {
    use super::{Bit, Register};

    /// Disable the amplifier chopper.
    pub(crate) const CHP_DIS: Bit = Bit::new(Register::Pga, 0);
    /// Invert the amplifier input phase.
    pub(crate) const INV: Bit = Bit::new(Register::Pga, 3);
    /// Bypass the amplifier.
    pub(crate) const BYPASS_EN: Bit = Bit::new(Register::Pga, 4);
    /// Route the amplifier output to pins.
    pub(crate) const OUT_EN: Bit = Bit::new(Register::Pga, 5);
    /// Improved regulator stability mode.
    pub(crate) const LDOMODE: Bit = Bit::new(Register::Pga, 6);
    /// Select OTP read-out on the data registers.
    pub(crate) const RD_OTP_SEL: Bit = Bit::new(Register::Pga, 7);
}

/// Fields of the amplifier power register.
#[allow(dead_code)]
pub(crate) mod pga_pwr {
    use super::{Bit, Field, Register};

    /// Amplifier bias current select.
    pub(crate) const PGA_CURR: Field = Field::new(Register::PgaPwr, 0, 2);
    /// Converter bias current select.
    pub(crate) const ADC_CURR: Field = Field::new(Register::PgaPwr, 2, 2);
    /// Master bias current select.
    pub(crate) const MSTR_BIAS_CURR: Field = Field::new(Register::PgaPwr, 4, 3);
    /// Enable the output bypass capacitor across the channel 2 inputs.
    pub(crate) const CAP_EN: Bit = Bit::new(Register::PgaPwr, 7);
}

/// Fields of the device revision register.
pub(crate) mod device_rev {
    use super::{Field, Register};

    /// Silicon revision number.
    pub(crate) const REVISION_ID: Field = Field::new(Register::DeviceRev, 0, 4);
}

/// Indicates the gain applied by the programmable amplifier.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum Gain {
    /// Unity gain.
    G1 = 0b000,
    /// Times 2.
    G2 = 0b001,
    /// Times 4.
    G4 = 0b010,
    /// Times 8.
    G8 = 0b011,
    /// Times 16.
    G16 = 0b100,
    /// Times 32.
    G32 = 0b101,
    /// Times 64.
    G64 = 0b110,
    /// Times 128.
    G128 = 0b111,
}

impl Gain {
    /// The amplification factor selected by this code.
    pub fn multiplier(self) -> u8 {
        1 << (self as u8)
    }
}

impl From<Gain> for u8 {
    fn from(gain: Gain) -> u8 {
        gain as u8
    }
}

/// Indicates the output voltage of the internal analog supply regulator.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum Ldo {
    /// 4.5 V.
    L4v5 = 0b000,
    /// 4.2 V.
    L4v2 = 0b001,
    /// 3.9 V.
    L3v9 = 0b010,
    /// 3.6 V.
    L3v6 = 0b011,
    /// 3.3 V.
    L3v3 = 0b100,
    /// 3.0 V.
    L3v0 = 0b101,
    /// 2.7 V.
    L2v7 = 0b110,
    /// 2.4 V.
    L2v4 = 0b111,
}

impl Ldo {
    /// The regulator output in volts.
    pub fn volts(self) -> f32 {
        match self {
            Ldo::L4v5 => 4.5,
            Ldo::L4v2 => 4.2,
            Ldo::L3v9 => 3.9,
            Ldo::L3v6 => 3.6,
            Ldo::L3v3 => 3.3,
            Ldo::L3v0 => 3.0,
            Ldo::L2v7 => 2.7,
            Ldo::L2v4 => 2.4,
        }
    }
}

impl From<Ldo> for u8 {
    fn from(ldo: Ldo) -> u8 {
        ldo as u8
    }
}

/// Indicates the conversion rate of the converter.
///
/// # Note
/// The remaining codes of the 3-bit rate field are reserved by the hardware. The raw
/// code setter accepts them unchecked for forward compatibility.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum SampleRate {
    /// 10 samples per second.
    Sps10 = 0b000,
    /// 20 samples per second.
    Sps20 = 0b001,
    /// 40 samples per second.
    Sps40 = 0b010,
    /// 80 samples per second.
    Sps80 = 0b011,
    /// 320 samples per second.
    Sps320 = 0b111,
}

impl SampleRate {
    /// The conversion rate in samples per second.
    pub fn per_second(self) -> u16 {
        match self {
            SampleRate::Sps10 => 10,
            SampleRate::Sps20 => 20,
            SampleRate::Sps40 => 40,
            SampleRate::Sps80 => 80,
            SampleRate::Sps320 => 320,
        }
    }
}

impl From<SampleRate> for u8 {
    fn from(rate: SampleRate) -> u8 {
        rate as u8
    }
}

/// Indicates an analog input channel of the converter.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum Channel {
    One = 0,
    Two = 1,
}

/// Indicates the active level of the conversion-ready pin.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum Polarity {
    ActiveHigh = 0,
    ActiveLow = 1,
}
