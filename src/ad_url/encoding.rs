//! Value formatting rules for ad request query strings.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched by the platform URI component encoder.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'!')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// Percent-encode a query value. Space becomes `%20`, never `+`.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Render a coordinate the way a JVM `double` prints.
///
/// Plain notation always keeps a fractional digit (`30.0`); magnitudes below
/// 1e-3 or from 1e7 upward switch to `1.0E-4` style.
pub fn format_coordinate(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && value.is_finite() && !(1e-3..1e7).contains(&magnitude) {
        let scientific = format!("{value:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{mantissa}.0")
            };
            return format!("{mantissa}E{exponent}");
        }
    }
    format!("{value:?}")
}

/// Round a location accuracy to whole metres, ties upward.
pub fn round_accuracy(accuracy: f32) -> i64 {
    (f64::from(accuracy) + 0.5).floor() as i64
}

/// Round to `precision` decimal places, ties toward zero.
pub fn round_half_down(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let scaled = value.abs() * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor > 0.5 { floor + 1.0 } else { floor };
    (rounded / factor).copysign(value)
}
