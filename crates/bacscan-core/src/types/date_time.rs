use core::fmt;

/// Octet value meaning "unspecified" in any date or time field.
pub const UNSPECIFIED: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year_since_1900: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

fn field(f: &mut fmt::Formatter<'_>, value: u8, width: usize) -> fmt::Result {
    if value == UNSPECIFIED {
        write!(f, "{:*<width$}", "")
    } else {
        write!(f, "{value:0width$}")
    }
}

/// ISO-like `YYYY-MM-DD`; unspecified fields print as `*`.
impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year_since_1900 == UNSPECIFIED {
            f.write_str("****")?;
        } else {
            write!(f, "{}", 1900 + u16::from(self.year_since_1900))?;
        }
        f.write_str("-")?;
        field(f, self.month, 2)?;
        f.write_str("-")?;
        field(f, self.day, 2)
    }
}

/// `HH:MM:SS.hh`; unspecified fields print as `*`.
impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, self.hour, 2)?;
        f.write_str(":")?;
        field(f, self.minute, 2)?;
        f.write_str(":")?;
        field(f, self.second, 2)?;
        f.write_str(".")?;
        field(f, self.hundredths, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::{Date, Time, UNSPECIFIED};

    #[test]
    fn renders_dates_and_times() {
        let date = Date {
            year_since_1900: 124,
            month: 2,
            day: 3,
            weekday: 6,
        };
        assert_eq!(date.to_string(), "2024-02-03");
        let time = Time {
            hour: 7,
            minute: 5,
            second: 0,
            hundredths: UNSPECIFIED,
        };
        assert_eq!(time.to_string(), "07:05:00.**");
    }
}
