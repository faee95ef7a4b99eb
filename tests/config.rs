//! Configuration setter behavior against a scripted bus.

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

use nau7802::{Channel, Error, Gain, Ldo, Nau7802, Polarity, SampleRate, DEVICE_ADDRESS};

const ADDR: u8 = DEVICE_ADDRESS;
const PU_CTRL: u8 = 0x00;
const CTRL1: u8 = 0x01;
const CTRL2: u8 = 0x02;

fn nau(expectations: &[I2cTransaction]) -> (Nau7802<I2cMock, NoopDelay>, I2cMock) {
    let i2c = I2cMock::new(expectations);
    let bus = i2c.clone();

    (Nau7802::new(i2c, NoopDelay::new()), bus)
}

#[test]
fn out_of_range_codes_are_rejected_without_bus_traffic() {
    let (mut adc, mut bus) = nau(&[]);

    assert_eq!(adc.set_gain(8u8), Err(Error::Bounds));
    assert_eq!(adc.set_ldo_voltage(8u8), Err(Error::Bounds));
    assert_eq!(adc.set_sample_rate(0xFFu8), Err(Error::Bounds));

    bus.done();
}

#[test]
fn gain_codes_only_touch_the_gain_field() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL1], vec![0b1010_1000]),
        I2cTransaction::write(ADDR, vec![CTRL1, 0b1010_1111]),
    ]);

    adc.set_gain(Gain::G128).unwrap();

    bus.done();
}

#[test]
fn ldo_selection_enables_the_internal_regulator() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL1], vec![0x00]),
        I2cTransaction::write(ADDR, vec![CTRL1, 0b0010_0000]),
        I2cTransaction::write_read(ADDR, vec![PU_CTRL], vec![0x06]),
        I2cTransaction::write(ADDR, vec![PU_CTRL, 0x86]),
    ]);

    adc.set_ldo_voltage(Ldo::L3v3).unwrap();

    bus.done();
}

#[test]
fn repeating_a_setter_writes_the_same_byte() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL2], vec![0x00]),
        I2cTransaction::write(ADDR, vec![CTRL2, 0b0011_0000]),
        I2cTransaction::write_read(ADDR, vec![CTRL2], vec![0b0011_0000]),
        I2cTransaction::write(ADDR, vec![CTRL2, 0b0011_0000]),
    ]);

    adc.set_sample_rate(SampleRate::Sps80).unwrap();
    adc.set_sample_rate(SampleRate::Sps80).unwrap();

    bus.done();
}

#[test]
fn reserved_rate_codes_pass_through() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL2], vec![0x00]),
        I2cTransaction::write(ADDR, vec![CTRL2, 0b0101_0000]),
    ]);

    adc.set_sample_rate(0b101u8).unwrap();

    bus.done();
}

#[test]
fn channel_select_toggles_a_single_flag() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL2], vec![0b0011_0000]),
        I2cTransaction::write(ADDR, vec![CTRL2, 0b1011_0000]),
        I2cTransaction::write_read(ADDR, vec![CTRL2], vec![0b1011_0000]),
        I2cTransaction::write(ADDR, vec![CTRL2, 0b0011_0000]),
    ]);

    adc.set_channel(Channel::Two).unwrap();
    adc.set_channel(Channel::One).unwrap();

    bus.done();
}

#[test]
fn interrupt_polarity_drives_the_crp_flag() {
    let (mut adc, mut bus) = nau(&[
        I2cTransaction::write_read(ADDR, vec![CTRL1], vec![0x00]),
        I2cTransaction::write(ADDR, vec![CTRL1, 0x80]),
        I2cTransaction::write_read(ADDR, vec![CTRL1], vec![0x80]),
        I2cTransaction::write(ADDR, vec![CTRL1, 0x00]),
    ]);

    adc.set_interrupt_polarity(Polarity::ActiveLow).unwrap();
    adc.set_interrupt_polarity(Polarity::ActiveHigh).unwrap();

    bus.done();
}
