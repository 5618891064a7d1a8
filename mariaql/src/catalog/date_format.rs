use super::{Error, Result};

/// Convert a MariaDB date format string into MongoDB's `$dateToString`
/// format specification. The specifier table is exhaustive over the MariaDB
/// set; anything unmapped raises `UnsupportedFormatSpecifier` rather than
/// passing through silently.
pub fn convert_date_format(format: &str) -> Result<String> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(spec) = chars.next() else {
            return Err(Error::UnsupportedFormatSpecifier('%'));
        };
        let mapped = match spec {
            // year
            'Y' => "%Y", // 4-digit year
            'y' => "%y", // 2-digit year

            // month
            'M' => "%B", // full month name
            'b' => "%b", // abbreviated month name
            'm' => "%m", // month, zero padded
            'c' => "%m", // month, no padding (approximate)

            // day
            'd' => "%d", // day of month, zero padded
            'e' => "%d", // day of month, no padding (approximate)
            'D' => "%d", // day with english suffix (approximate)
            'j' => "%j", // day of year

            // weekday
            'W' => "%A", // full weekday name
            'a' => "%a", // abbreviated weekday name
            'w' => "%w", // weekday number, 0 = Sunday

            // hour
            'H' => "%H", // 24-hour, zero padded
            'h' => "%I", // 12-hour, zero padded
            'I' => "%I", // 12-hour, zero padded
            'k' => "%H", // 24-hour, no padding (approximate)
            'l' => "%I", // 12-hour, no padding (approximate)

            // minute / second / fraction
            'i' => "%M", // minutes
            's' => "%S", // seconds
            'S' => "%S", // seconds
            'f' => "%L", // microseconds, approximated by milliseconds

            // compound time
            'p' => "%p",          // AM / PM
            'r' => "%I:%M:%S %p", // 12-hour time
            'T' => "%H:%M:%S",    // 24-hour time

            // week numbers
            'U' => "%U", // week, Sunday first
            'u' => "%U", // week, Monday first (approximate)
            'V' => "%V", // ISO week
            'v' => "%V", // week, Monday first (approximate)
            'X' => "%G", // year of the week, Sunday first (approximate)
            'x' => "%G", // ISO year of the week

            '%' => "%",

            other => return Err(Error::UnsupportedFormatSpecifier(other)),
        };
        out.push_str(mapped);
    }
    Ok(out)
}
