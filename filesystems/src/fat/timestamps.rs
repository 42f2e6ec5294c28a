// FAT date/time decoding
// FAT date: bits 15-9: year (0=1980), bits 8-5: month, bits 4-0: day
// FAT time: bits 15-11: hours, bits 10-5: minutes, bits 4-0: seconds/2

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FatDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl FatDateTime {
    /// Decode a directory record's date, time and creation tenths fields
    pub fn decode(date: u16, time: u16, tenths: u8) -> Self {
        Self {
            year: ((date & 0xFE00) >> 9) + 1980,
            month: ((date & 0x01E0) >> 5) as u8,
            day: (date & 0x001F) as u8,
            hour: ((time & 0xF800) >> 11) as u8,
            minute: ((time & 0x07E0) >> 5) as u8,
            second: legacy_second(time, tenths),
            millisecond: legacy_millisecond(tenths),
        }
    }

    /// Calendar value, when the fields form a valid date and time
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_milli_opt(
                self.hour as u32,
                self.minute as u32,
                self.second as u32,
                self.millisecond as u32,
            )
    }
}

/// Seconds field combined with the creation tenths.
///
/// The tenths value selects the shift amount instead of adding whole seconds
/// after doubling; kept as-is until checked against a reference image.
pub fn legacy_second(time: u16, tenths: u8) -> u8 {
    let shift = 1 + tenths as u32 / 100;
    (((time & 0x1F) as u32) << shift) as u8
}

/// Millisecond field derived from the creation tenths
pub fn legacy_millisecond(tenths: u8) -> u16 {
    ((tenths as u32 * 100) % 10_000) as u16
}
