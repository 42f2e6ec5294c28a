// VFAT long name reconstruction
//
// Fragments are stored tail first on disk. Assembly runs in two phases:
// accumulate fragments in encounter order, then reverse the fragment order
// and trim the pad spaces that mark the end of the name.

use byteorder::{ByteOrder, LittleEndian};

use super::constants::*;

const PAD: u16 = b' ' as u16;

/// One long name record's 13 code units, in on-disk field order
pub type Fragment = [u16; LFN_UNITS_PER_RECORD];

/// Extract the UTF-16 units and the "last logical fragment" flag of a long name record
pub fn parse_fragment(record: &[u8]) -> (Fragment, bool) {
    let mut units = [0u16; LFN_UNITS_PER_RECORD];
    let groups = [(LFN_NAME1, 5), (LFN_NAME2, 6), (LFN_NAME3, 2)];

    let mut i = 0;
    for (start, count) in groups {
        for j in 0..count {
            units[i] = LittleEndian::read_u16(&record[start + j * 2..]);
            i += 1;
        }
    }

    let is_tail = record[0] & LFN_LAST_FRAGMENT != 0;
    (units, is_tail)
}

/// Replace the terminator and everything after it with pad spaces
fn pad_tail(mut units: Fragment) -> Fragment {
    if let Some(end) = units.iter().position(|&u| u == 0x0000 || u == 0xFFFF) {
        for unit in &mut units[end..] {
            *unit = PAD;
        }
    }
    units
}

#[derive(Debug, Default)]
pub struct LongNameAssembler {
    fragments: Vec<Fragment>,
}

impl LongNameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Phase one: accumulate a fragment in encounter order
    pub fn push(&mut self, units: Fragment, is_tail: bool) {
        let units = if is_tail { pad_tail(units) } else { units };
        self.fragments.push(units);
    }

    /// Phase two: restore logical order, trim padding and reset for the next name
    pub fn finish(&mut self) -> String {
        let mut units: Vec<u16> = self
            .fragments
            .drain(..)
            .rev()
            .flat_map(|fragment| fragment.into_iter())
            .collect();

        while units.last() == Some(&PAD) {
            units.pop();
        }

        String::from_utf16_lossy(&units)
    }
}
