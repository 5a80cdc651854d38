//! Small meteorological conversions used by the plotters.

pub const CELSIUS_OFFSET: f32 = 273.15;
pub const KNOTS_PER_METRE_PER_SECOND: f32 = 1.943_844;

pub fn kelvin_to_celsius(t: f32) -> f32 {
    t - CELSIUS_OFFSET
}

/// u/v components (m/s) from speed (m/s) and the direction the wind blows from.
pub fn wind_components(speed: f32, direction_deg: f32) -> (f32, f32) {
    let rad = direction_deg.to_radians();
    (-speed * rad.sin(), -speed * rad.cos())
}

pub fn wind_speed(u: f32, v: f32) -> f32 {
    u.hypot(v)
}

/// Direction the wind blows from, in degrees.
pub fn wind_direction(u: f32, v: f32) -> f32 {
    if u == 0.0 && v == 0.0 {
        return 0.0;
    }
    ((-u).atan2(-v).to_degrees() + 360.0) % 360.0
}

/// Dewpoint (K) from temperature (K) and relative humidity (%), Magnus form
/// with Bolton's constants.
pub fn dewpoint_from_relative_humidity(t: f32, rh: f32) -> f32 {
    let tc = kelvin_to_celsius(t);
    let saturation = 6.112 * (17.67 * tc / (tc + 243.5)).exp();
    let vapour = (rh.max(0.1) / 100.0) * saturation;
    let ln = (vapour / 6.112).ln();
    243.5 * ln / (17.67 - ln) + CELSIUS_OFFSET
}

/// Lifted condensation level (pressure hPa, temperature K) of a parcel,
/// after Bolton (1980).
pub fn lifted_condensation_level(p: f32, t: f32, td: f32) -> (f32, f32) {
    let t_lcl = 1.0 / (1.0 / (td - 56.0) + (t / td).ln() / 800.0) + 56.0;
    let p_lcl = p * (t_lcl / t).powf(1.0 / 0.2854);
    (p_lcl, t_lcl)
}
