//! Driver for the NAU7802 24-bit load cell analog-to-digital converter.
//!
//! # Description
//! This driver owns the converter bring-up sequence, the power and self-calibration
//! handshakes, and the conversion from raw 24-bit codes into a calibrated weight. The
//! weight conversion is an affine transformation of the averaged raw code: a zero
//! offset maps the unloaded scale to zero and a calibration factor scales counts into
//! the caller's weight unit. Both constants can be captured in place or seeded from
//! externally persisted values.
//!
//! Register mutations are read-modify-write cycles, so a device instance must never be
//! shared between concurrently executing owners. The driver takes the bus and the
//! delay provider by value to make that single-owner requirement explicit.
#![no_std]
#![deny(warnings)]

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use embedded_hal::{delay::DelayNs, i2c::I2c};

mod registers;

pub use registers::{Channel, Gain, Ldo, Polarity, SampleRate};

use registers::{ctrl1, ctrl2, device_rev, pga_pwr, pu_ctrl, Bit, Field, Register};

/// The fixed I2C address of the converter.
pub const DEVICE_ADDRESS: u8 = 0x2A;

/// Number of status polls a handshake may consume before timing out.
const POLL_ATTEMPTS: usize = 100;

/// Interval between handshake status polls.
const POLL_INTERVAL_MS: u32 = 1;

/// Settling time after enabling analog stages during bring-up.
const STARTUP_SETTLE_MS: u32 = 100;

/// Indicates which bounded handshake ran out of polling attempts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Timeout {
    PowerUp,
    PowerDown,
    Calibration,
}

/// Represents possible errors from the converter driver.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Error<E> {
    /// The bus transaction with the device failed.
    I2c(E),
    /// A configuration value or argument was outside the legal range.
    Bounds,
    /// The device did not acknowledge its bus address.
    NotPresent,
    /// The device reported that its self-calibration failed.
    Calibration,
    /// A device handshake did not complete within its polling allowance.
    Timeout(Timeout),
    /// A reading below the zero offset was rejected by the weight policy.
    NegativeWeight,
    /// The stored calibration cannot convert readings into a weight.
    InvalidState,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}

/// Progress of an analog front end calibration cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// The calibration cycle is still running.
    InProgress,
    /// The calibration cycle completed successfully.
    Done,
    /// The device reported a calibration failure.
    Failed,
}

/// Analog front end settings applied by [Nau7802::initialize].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The analog input channel to convert.
    pub channel: Channel,
    /// The output voltage of the internal analog supply regulator.
    pub ldo: Ldo,
    /// The amplifier gain ahead of the converter.
    pub gain: Gain,
    /// The conversion rate.
    pub sample_rate: SampleRate,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel: Channel::One,
            ldo: Ldo::L3v3,
            gain: Gain::G128,
            sample_rate: SampleRate::Sps80,
        }
    }
}

/// A driver for the NAU7802 analog-to-digital converter.
pub struct Nau7802<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
    i2c: I2C,
    delay: DELAY,
    zero_offset: i32,
    calibration_factor: f32,
}

impl<I2C, DELAY> Nau7802<I2C, DELAY>
where
    I2C: I2c,
    DELAY: DelayNs,
{
    /// Construct a new converter driver.
    ///
    /// # Note
    /// Construction performs no bus traffic. Call [Nau7802::initialize] to bring the
    /// converter into a converting state.
    ///
    /// # Args
    /// * `i2c` - The I2C bus to use to communicate with the device.
    /// * `delay` - A means of delaying between status polls and samples.
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Nau7802 {
            i2c,
            delay,
            zero_offset: 0,
            calibration_factor: 1.0,
        }
    }

    fn read_register(&mut self, register: Register) -> Result<u8, Error<I2C::Error>> {
        let mut result: [u8; 1] = [0];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[register as u8], &mut result)?;

        Ok(result[0])
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(DEVICE_ADDRESS, &[register as u8, value])?;

        Ok(())
    }

    fn get_bit(&mut self, bit: Bit) -> Result<bool, Error<I2C::Error>> {
        let byte = self.read_register(bit.register)?;

        Ok(bit.extract(byte))
    }

    fn set_bit(&mut self, bit: Bit, state: bool) -> Result<(), Error<I2C::Error>> {
        let byte = self.read_register(bit.register)?;

        self.write_register(bit.register, bit.insert(byte, state))
    }

    fn set_field(&mut self, field: Field, value: u8) -> Result<(), Error<I2C::Error>> {
        if value > field.max() {
            return Err(Error::Bounds);
        }

        let byte = self.read_register(field.register)?;

        self.write_register(field.register, field.insert(byte, value))
    }

    /// Check whether the device acknowledges its bus address.
    pub fn probe(&mut self) -> bool {
        self.read_register(Register::PuCtrl).is_ok()
    }

    /// Restore the device registers to their power-on defaults.
    pub fn reset(&mut self) -> Result<(), Error<I2C::Error>> {
        self.set_bit(pu_ctrl::RR, true)?;

        // Hold the reset flag for a moment before releasing it.
        self.delay.delay_ms(1);

        self.set_bit(pu_ctrl::RR, false)
    }

    /// Power up the digital and analog circuits.
    ///
    /// # Note
    /// Blocks until the device reports power-up ready, polling for up to 100 ms.
    pub fn power_up(&mut self) -> Result<(), Error<I2C::Error>> {
        self.set_bit(pu_ctrl::PUD, true)?;
        self.set_bit(pu_ctrl::PUA, true)?;

        for _ in 0..POLL_ATTEMPTS {
            if self.get_bit(pu_ctrl::PUR)? {
                return Ok(());
            }

            self.delay.delay_ms(POLL_INTERVAL_MS);
        }

        warn!("Power-up did not complete within {} polls", POLL_ATTEMPTS);
        Err(Error::Timeout(Timeout::PowerUp))
    }

    /// Power down the digital and analog circuits.
    ///
    /// # Note
    /// Blocks until the device confirms the ready flag has cleared, polling for up to
    /// 100 ms. Registers retain their contents while powered down.
    pub fn power_down(&mut self) -> Result<(), Error<I2C::Error>> {
        self.set_bit(pu_ctrl::PUD, false)?;
        self.set_bit(pu_ctrl::PUA, false)?;

        for _ in 0..POLL_ATTEMPTS {
            if !self.get_bit(pu_ctrl::PUR)? {
                return Ok(());
            }

            self.delay.delay_ms(POLL_INTERVAL_MS);
        }

        warn!("Power-down did not complete within {} polls", POLL_ATTEMPTS);
        Err(Error::Timeout(Timeout::PowerDown))
    }

    /// Start an analog front end calibration cycle.
    pub fn begin_afe_calibration(&mut self) -> Result<(), Error<I2C::Error>> {
        self.set_bit(ctrl2::CALS, true)
    }

    /// Query the state of the analog front end calibration cycle.
    pub fn afe_calibration_status(&mut self) -> Result<CalibrationStatus, Error<I2C::Error>> {
        let status = self.read_register(Register::Ctrl2)?;

        // A failure indication wins over a lingering in-progress flag.
        if ctrl2::CAL_ERR.extract(status) {
            Ok(CalibrationStatus::Failed)
        } else if ctrl2::CALS.extract(status) {
            Ok(CalibrationStatus::InProgress)
        } else {
            Ok(CalibrationStatus::Done)
        }
    }

    /// Run an analog front end calibration cycle and wait for its result.
    ///
    /// # Note
    /// Calibration compensates the analog front end for the selected gain, rate, and
    /// supply settings. Run it again after changing any of them.
    pub fn calibrate_afe(&mut self) -> Result<(), Error<I2C::Error>> {
        self.begin_afe_calibration()?;

        for _ in 0..POLL_ATTEMPTS {
            match self.afe_calibration_status()? {
                CalibrationStatus::Done => {
                    debug!("AFE calibration complete");
                    return Ok(());
                }
                CalibrationStatus::Failed => {
                    warn!("Device reported AFE calibration failure");
                    return Err(Error::Calibration);
                }
                CalibrationStatus::InProgress => self.delay.delay_ms(POLL_INTERVAL_MS),
            }
        }

        warn!("AFE calibration did not complete within {} polls", POLL_ATTEMPTS);
        Err(Error::Timeout(Timeout::Calibration))
    }

    /// Select the amplifier gain.
    ///
    /// # Args
    /// * `gain` - A [Gain] variant, or the raw 3-bit gain code.
    pub fn set_gain(&mut self, gain: impl Into<u8>) -> Result<(), Error<I2C::Error>> {
        self.set_field(ctrl1::GAINS, gain.into())
    }

    /// Select the output voltage of the internal analog supply regulator.
    ///
    /// # Note
    /// Also selects the internal regulator as the analog supply source.
    ///
    /// # Args
    /// * `ldo` - An [Ldo] variant, or the raw 3-bit voltage code.
    pub fn set_ldo_voltage(&mut self, ldo: impl Into<u8>) -> Result<(), Error<I2C::Error>> {
        self.set_field(ctrl1::VLDO, ldo.into())?;

        // The regulator only takes effect once it is selected as the analog supply.
        self.set_bit(pu_ctrl::AVDDS, true)
    }

    /// Select the conversion rate.
    ///
    /// # Args
    /// * `rate` - A [SampleRate] variant, or the raw 3-bit rate code. Reserved codes
    ///   within the 3-bit range are written through unchecked.
    pub fn set_sample_rate(&mut self, rate: impl Into<u8>) -> Result<(), Error<I2C::Error>> {
        self.set_field(ctrl2::CRS, rate.into())
    }

    /// Select the analog input channel.
    pub fn set_channel(&mut self, channel: Channel) -> Result<(), Error<I2C::Error>> {
        self.set_bit(ctrl2::CHS, channel == Channel::Two)
    }

    /// Select the active level of the conversion-ready pin.
    pub fn set_interrupt_polarity(&mut self, polarity: Polarity) -> Result<(), Error<I2C::Error>> {
        self.set_bit(ctrl1::CRP, polarity == Polarity::ActiveLow)
    }

    /// Check whether a new conversion result is ready to read.
    pub fn data_available(&mut self) -> Result<bool, Error<I2C::Error>> {
        self.get_bit(pu_ctrl::CR)
    }

    /// Read the most recent conversion result.
    ///
    /// # Returns
    /// The 24-bit two's-complement conversion result, sign-extended to an `i32`.
    pub fn read_raw(&mut self) -> Result<i32, Error<I2C::Error>> {
        let mut adco: [u8; 3] = [0; 3];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[Register::AdcoB2 as u8], &mut adco)?;

        // The result is stored most significant byte first. Placing it in the upper
        // three bytes and shifting arithmetically back down extends the sign.
        let code = i32::from_be_bytes([adco[0], adco[1], adco[2], 0]);

        Ok(code >> 8)
    }

    /// Average a number of conversion results.
    ///
    /// # Args
    /// * `samples` - The number of conversions to average. Must be nonzero.
    ///
    /// # Returns
    /// The integer mean of `samples` conversion results, truncated toward zero.
    pub fn read_averaged(&mut self, samples: usize) -> Result<i32, Error<I2C::Error>> {
        if samples == 0 {
            return Err(Error::Bounds);
        }

        let mut total: i64 = 0;
        for _ in 0..samples {
            total += self.read_raw()? as i64;

            // Give the converter a moment to settle between samples.
            self.delay.delay_ms(1);
        }

        Ok((total / samples as i64) as i32)
    }

    /// Record the current unloaded reading as the zero offset.
    ///
    /// # Note
    /// The scale must be unloaded while this runs. The captured offset is the tare
    /// point that [Nau7802::get_weight] subtracts from every reading.
    ///
    /// # Args
    /// * `samples` - The number of conversions to average.
    pub fn capture_zero_offset(&mut self, samples: usize) -> Result<(), Error<I2C::Error>> {
        self.zero_offset = self.read_averaged(samples)?;

        Ok(())
    }

    /// Derive the calibration factor from a known weight resting on the scale.
    ///
    /// # Note
    /// Capture the zero offset first; the factor relates counts above the tare point
    /// to the reference weight.
    ///
    /// # Args
    /// * `known_weight` - The reference weight on the scale, in the caller's unit.
    ///   Must be nonzero.
    /// * `samples` - The number of conversions to average.
    pub fn capture_calibration_factor(
        &mut self,
        known_weight: f32,
        samples: usize,
    ) -> Result<(), Error<I2C::Error>> {
        if known_weight == 0.0 {
            return Err(Error::Bounds);
        }

        let average = self.read_averaged(samples)?;
        self.calibration_factor = (average - self.zero_offset) as f32 / known_weight;

        Ok(())
    }

    /// Measure the weight on the scale.
    ///
    /// # Args
    /// * `allow_negative` - Permit readings below the zero offset instead of
    ///   rejecting them.
    /// * `samples` - The number of conversions to average.
    ///
    /// # Returns
    /// The measured weight in the unit of the captured reference weight.
    pub fn get_weight(
        &mut self,
        allow_negative: bool,
        samples: usize,
    ) -> Result<f32, Error<I2C::Error>> {
        let average = self.read_averaged(samples)?;

        if !allow_negative && average < self.zero_offset {
            return Err(Error::NegativeWeight);
        }

        if self.calibration_factor == 0.0 {
            return Err(Error::InvalidState);
        }

        Ok((average - self.zero_offset) as f32 / self.calibration_factor)
    }

    /// The raw code corresponding to an unloaded scale.
    pub fn zero_offset(&self) -> i32 {
        self.zero_offset
    }

    /// Seed the zero offset from an externally persisted calibration.
    pub fn set_zero_offset(&mut self, offset: i32) {
        self.zero_offset = offset;
    }

    /// The scale factor relating raw counts to the caller's weight unit.
    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    /// Seed the calibration factor from an externally persisted calibration.
    pub fn set_calibration_factor(&mut self, factor: f32) {
        self.calibration_factor = factor;
    }

    /// Get the silicon revision number of the device.
    pub fn get_revision(&mut self) -> Result<u8, Error<I2C::Error>> {
        let byte = self.read_register(Register::DeviceRev)?;

        Ok(device_rev::REVISION_ID.extract(byte))
    }

    /// Bring the converter into a calibrated, converting state.
    ///
    /// # Description
    /// Verifies device presence, then runs the bring-up sequence: channel select,
    /// reset, power-up handshake, regulator, gain, and rate configuration, analog
    /// stabilization, and an analog front end calibration. Enabling the input bypass
    /// capacitor clears the gain selection, so the gain is applied a second time
    /// afterwards.
    ///
    /// # Args
    /// * `config` - The analog front end settings to apply.
    pub fn initialize(&mut self, config: Config) -> Result<(), Error<I2C::Error>> {
        if !self.probe() {
            warn!("No converter acknowledged address 0x{:02X}", DEVICE_ADDRESS);
            return Err(Error::NotPresent);
        }

        self.set_channel(config.channel)?;
        self.reset()?;
        self.power_up()?;

        self.set_ldo_voltage(config.ldo)?;
        self.set_gain(config.gain)?;
        self.set_sample_rate(config.sample_rate)?;

        // Disable the chopper clock.
        self.write_register(Register::Adc, 0x30)?;

        // Bypass capacitor across the channel 2 inputs, recommended for single-channel
        // operation.
        self.set_bit(pga_pwr::CAP_EN, true)?;
        self.delay.delay_ms(STARTUP_SETTLE_MS);

        // The capacitor enable clears the gain selection, so apply it again.
        self.set_gain(config.gain)?;

        self.calibrate_afe()?;
        self.delay.delay_ms(STARTUP_SETTLE_MS);

        debug!("Converter bring-up complete");
        Ok(())
    }

    /// Release the bus and delay without touching the device.
    pub fn release(self) -> (I2C, DELAY) {
        (self.i2c, self.delay)
    }

    /// Power down the converter and release the bus and delay.
    ///
    /// # Note
    /// The driver is consumed even when powering down fails. To keep the bus on a
    /// failed power-down, call [Nau7802::power_down] and [Nau7802::release]
    /// separately.
    pub fn shutdown(mut self) -> Result<(I2C, DELAY), Error<I2C::Error>> {
        self.power_down()?;

        Ok(self.release())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.channel, Channel::One);
        assert_eq!(config.ldo, Ldo::L3v3);
        assert_eq!(config.gain, Gain::G128);
        assert_eq!(config.sample_rate, SampleRate::Sps80);
    }

    #[test]
    fn bus_faults_lift_into_the_error_type() {
        fn fallible(result: Result<(), u8>) -> Result<(), Error<u8>> {
            result?;
            Ok(())
        }

        assert_eq!(fallible(Err(7)), Err(Error::I2c(7)));
        assert_eq!(fallible(Ok(())), Ok(()));
    }
}
