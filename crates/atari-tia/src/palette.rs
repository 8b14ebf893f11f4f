//! NTSC colour palette.

/// 128-entry NTSC palette as ARGB32, indexed by `colour >> 1`.
///
/// Rows are the 16 hues (colour register bits 7-4), columns the 8
/// luminances (bits 3-1).
#[rustfmt::skip]
const NTSC_PALETTE: [u32; 128] = [
    // 0: grey
    0xFF000000, 0xFF404040, 0xFF6C6C6C, 0xFF909090, 0xFFB0B0B0, 0xFFC8C8C8, 0xFFDCDCDC, 0xFFECECEC,
    // 1: gold
    0xFF444400, 0xFF646410, 0xFF848424, 0xFFA0A034, 0xFFB8B840, 0xFFD0D050, 0xFFE8E85C, 0xFFFCFC68,
    // 2: orange
    0xFF702800, 0xFF844414, 0xFF985C28, 0xFFAC783C, 0xFFBC8C4C, 0xFFCCA05C, 0xFFDCB468, 0xFFECC878,
    // 3: red-orange
    0xFF841800, 0xFF983418, 0xFFAC5030, 0xFFC06848, 0xFFD0805C, 0xFFE09470, 0xFFECA880, 0xFFFCBC94,
    // 4: pink
    0xFF880000, 0xFF9C2020, 0xFFB03C3C, 0xFFC05858, 0xFFD07070, 0xFFE08888, 0xFFECA0A0, 0xFFFCB4B4,
    // 5: purple
    0xFF78005C, 0xFF8C2074, 0xFFA03C88, 0xFFB0589C, 0xFFC070B0, 0xFFD084C0, 0xFFDC9CD0, 0xFFECB0E0,
    // 6: violet
    0xFF480078, 0xFF602090, 0xFF783CA4, 0xFF8C58B8, 0xFFA070CC, 0xFFB484DC, 0xFFC49CEC, 0xFFD4B0FC,
    // 7: blue-violet
    0xFF140084, 0xFF302098, 0xFF4C3CAC, 0xFF6858C0, 0xFF7C70D0, 0xFF9488E0, 0xFFA8A0EC, 0xFFBCB4FC,
    // 8: blue
    0xFF000088, 0xFF1C209C, 0xFF3840B0, 0xFF505CC0, 0xFF6874D0, 0xFF7C8CE0, 0xFF90A4EC, 0xFFA4B8FC,
    // 9: light blue
    0xFF00187C, 0xFF1C3890, 0xFF3854A8, 0xFF5070BC, 0xFF6888CC, 0xFF7C9CDC, 0xFF90B4EC, 0xFFA4C8FC,
    // A: turquoise
    0xFF002C5C, 0xFF1C4C78, 0xFF386890, 0xFF5084AC, 0xFF689CC0, 0xFF7CB4D4, 0xFF90CCE8, 0xFFA4E0FC,
    // B: green-blue
    0xFF003C2C, 0xFF1C5C48, 0xFF387C64, 0xFF509C80, 0xFF68B494, 0xFF7CD0AC, 0xFF90E4C0, 0xFFA4FCD4,
    // C: green
    0xFF003C00, 0xFF205C20, 0xFF407C40, 0xFF5C9C5C, 0xFF74B474, 0xFF8CD08C, 0xFFA4E4A4, 0xFFB8FCB8,
    // D: yellow-green
    0xFF143800, 0xFF345C1C, 0xFF507C38, 0xFF6C9850, 0xFF84B468, 0xFF9CCC7C, 0xFFB4E490, 0xFFC8FCA4,
    // E: orange-green
    0xFF2C3000, 0xFF4C501C, 0xFF687034, 0xFF848C4C, 0xFF9CA864, 0xFFB4C078, 0xFFCCD488, 0xFFE0EC9C,
    // F: light orange
    0xFF442800, 0xFF644818, 0xFF846830, 0xFFA08444, 0xFFB89C58, 0xFFD0B46C, 0xFFE8CC7C, 0xFFFCE08C,
];

/// Convert a TIA colour register value to ARGB32. Bit 0 is ignored.
#[must_use]
pub fn argb(colour: u8) -> u32 {
    NTSC_PALETTE[usize::from(colour >> 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_ends() {
        assert_eq!(argb(0x00), 0xFF00_0000);
        assert_eq!(argb(0x0E), 0xFFEC_ECEC);
    }

    #[test]
    fn low_bit_ignored() {
        for c in (0..=0xFEu8).step_by(2) {
            assert_eq!(argb(c), argb(c | 1));
        }
    }
}
