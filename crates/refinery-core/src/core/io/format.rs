/// Formats `value` like C's `%<width>.<precision>e`: a signed exponent of at least two digits,
/// right-aligned in `width` columns.
pub fn scientific(value: f64, width: usize, precision: usize) -> String {
    let formatted = format!("{value:.precision$e}");
    let formatted = match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    };
    format!("{formatted:>width$}")
}
