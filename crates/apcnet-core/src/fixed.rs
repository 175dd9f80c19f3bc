use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Electrical potential in volts.
pub type Volts = Fixed64;

/// Power draw in watts.
pub type Watts = Fixed64;

/// Resistance in ohms.
pub type Ohms = Fixed64;

/// Nominal mains voltage the resistance model is calibrated against.
pub const MAINS_VOLTAGE: i32 = 240;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert an f64 to Fixed64, or `None` if it is NaN, infinite, or outside
/// the Q32.32 range. Use for untrusted input such as data files.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and config round-trips.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Equivalent resistance of a load drawing `watts` at [`MAINS_VOLTAGE`].
///
/// Computes `V * V / P`, which equals `V / (P / V)` without the precision
/// loss of the intermediate division. Returns `None` for non-positive wattage.
/// Saturates at [`Fixed64::MAX`] for vanishingly small loads.
#[inline]
pub fn resistance_for_watts(watts: Watts) -> Option<Ohms> {
    if watts <= Fixed64::ZERO {
        return None;
    }
    let v = Fixed64::from_num(MAINS_VOLTAGE);
    Some((v * v).saturating_div(watts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistance_for_hundred_watts_is_576() {
        let r = resistance_for_watts(f64_to_fixed64(100.0)).unwrap();
        assert_eq!(r, Fixed64::from_num(576));
    }

    #[test]
    fn resistance_for_zero_watts_is_none() {
        assert!(resistance_for_watts(Fixed64::ZERO).is_none());
        assert!(resistance_for_watts(f64_to_fixed64(-5.0)).is_none());
    }

    #[test]
    fn resistance_for_default_trickle_load() {
        let r = resistance_for_watts(f64_to_fixed64(0.01)).unwrap();
        // 57600 / 0.01 = 5_760_000, modulo Q32.32 rounding of 0.01.
        let ohms = fixed64_to_f64(r);
        assert!((ohms - 5_760_000.0).abs() < 1.0, "got {ohms}");
    }

    #[test]
    fn resistance_saturates_for_tiny_loads() {
        let r = resistance_for_watts(Fixed64::DELTA).unwrap();
        assert_eq!(r, Fixed64::MAX);
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }

    #[test]
    fn checked_conversion_rejects_out_of_range() {
        assert_eq!(checked_f64_to_fixed64(230.0), Some(Fixed64::from_num(230)));
        assert_eq!(checked_f64_to_fixed64(1e12), None);
        assert_eq!(checked_f64_to_fixed64(-1e12), None);
        assert_eq!(checked_f64_to_fixed64(f64::NAN), None);
        assert_eq!(checked_f64_to_fixed64(f64::INFINITY), None);
    }

    #[test]
    fn volts_ordering() {
        let low: Volts = f64_to_fixed64(150.0);
        let high: Volts = f64_to_fixed64(310.0);
        assert!(low < high);
    }
}
