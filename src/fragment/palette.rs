// Palette - Fragment colours

use std::fmt;

/// Colour of a fragment body and its buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentColor {
    #[default]
    Cyan,
    Red,
    Green,
    Orange,
    Pink,
}

impl FragmentColor {
    /// Palette order, used by [`FragmentColor::next`]
    pub const ALL: [FragmentColor; 5] = [
        FragmentColor::Cyan,
        FragmentColor::Red,
        FragmentColor::Green,
        FragmentColor::Orange,
        FragmentColor::Pink,
    ];

    pub fn hex(&self) -> &'static str {
        match self {
            FragmentColor::Cyan => "#00aacc",
            FragmentColor::Red => "#CD1B00",
            FragmentColor::Green => "#00CD74",
            FragmentColor::Orange => "#CD8900",
            FragmentColor::Pink => "#CD0066",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            FragmentColor::Cyan => 0,
            FragmentColor::Red => 1,
            FragmentColor::Green => 2,
            FragmentColor::Orange => 3,
            FragmentColor::Pink => 4,
        }
    }

    /// Colour at `index`, wrapping around the palette
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Following palette entry; the last one wraps to the first
    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

impl fmt::Display for FragmentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex())
    }
}
