//! Scenery consulted once per band.

/// PF0-PF2 values for one band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayfieldRow {
    pub pf0: u8,
    pub pf1: u8,
    pub pf2: u8,
}

impl PlayfieldRow {
    #[must_use]
    pub const fn new(pf0: u8, pf1: u8, pf2: u8) -> Self {
        Self { pf0, pf1, pf2 }
    }
}

/// Playfield rows, repeated down the screen when shorter than the band count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Background {
    rows: Vec<PlayfieldRow>,
}

impl Background {
    #[must_use]
    pub fn new(rows: Vec<PlayfieldRow>) -> Self {
        Self { rows }
    }

    /// No playfield at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Left and right walls with an open middle.
    #[must_use]
    pub fn walls() -> Self {
        Self::new(vec![PlayfieldRow::new(0x10, 0x00, 0x00)])
    }

    #[must_use]
    pub fn row(&self, band: u16) -> PlayfieldRow {
        if self.rows.is_empty() {
            return PlayfieldRow::default();
        }
        self.rows[usize::from(band) % self.rows.len()]
    }
}
