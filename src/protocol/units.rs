//! Conversions between device fixed-point values and engineering units.
//!
//! The D5 Next stores duty cycles as big-endian fixed-point percent
//! (0x0000 = 0.00%, 0x0A1A = 25.86%, 0x2710 = 100.00%) and temperatures in
//! centi-degrees Celsius. Consumers use a 0-255 duty and milli-degrees.
//! Every rounding step rounds half away from zero.

/// Device duty value for 100.00%.
pub const DEVICE_DUTY_MAX: u16 = 10_000;

/// Largest normalized duty.
pub const NORMALIZED_DUTY_MAX: u8 = u8::MAX;

/// Divide and round half away from zero.
pub fn div_round_closest(numerator: i64, denominator: i64) -> i64 {
    let half = denominator / 2;
    if (numerator < 0) == (denominator < 0) {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Device fixed-point percent to normalized 0-255 duty.
///
/// Values above 100.00% scale past 255; callers decide what to do with them.
pub fn device_duty_to_normalized(raw: u16) -> u16 {
    div_round_closest(raw as i64 * NORMALIZED_DUTY_MAX as i64, DEVICE_DUTY_MAX as i64) as u16
}

/// Normalized 0-255 duty to device fixed-point percent.
pub fn normalized_duty_to_device(duty: u8) -> u16 {
    div_round_closest(duty as i64 * DEVICE_DUTY_MAX as i64, NORMALIZED_DUTY_MAX as i64) as u16
}

/// Device centi-degrees to milli-degrees Celsius.
pub fn centi_to_milli_degrees(raw: u16) -> i32 {
    raw as i32 * 10
}

/// Milli-degrees to centi-degrees Celsius, rounded.
pub fn milli_to_centi_degrees(millis: i64) -> i64 {
    div_round_closest(millis, 10)
}

/// Sensor report voltage (centi-volts) to milli-volts.
pub fn centi_to_milli_volts(raw: u16) -> u32 {
    raw as u32 * 10
}

/// Sensor report power (centi-watts) to micro-watts.
pub fn centi_watts_to_micro_watts(raw: u16) -> u32 {
    raw as u32 * 10_000
}

/// Device fixed-point percent as a display percentage.
pub fn device_duty_to_percent(raw: u16) -> f32 {
    raw as f32 / 100.0
}
