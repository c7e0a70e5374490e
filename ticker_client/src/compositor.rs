//! Text to pixel-column composition.
//!
//! A [`TextCompositor`] turns one or more text lines into a [`Reel`]: a wrap-around strip of
//! pixel columns, one `u64` per column with bit `r` lit when row `r` is on. With several
//! lines the display height is split into horizontal bands, one per line, and each line is
//! drawn vertically centered in its band. The compositor holds no state besides its
//! geometry, so composing the same input twice yields the same reel.
use clap::ValueEnum;
use strum::{Display, EnumString};

use crate::error::RenderError;
use crate::glyphs::{GLYPH_HEIGHT, GLYPH_WIDTH, GlyphTable};

/// Default reel height in pixel rows.
pub const DEFAULT_HEIGHT: usize = 32;
/// Largest height a `u64` column can carry.
pub const MAX_HEIGHT: usize = 64;
/// Blank columns after each character.
pub const CHAR_SPACING: usize = 1;
/// Blank columns after each line, before the reel repeats.
pub const MESSAGE_SPACING: usize = GLYPH_WIDTH;
/// Separator between quote messages sharing a band.
pub const MESSAGE_SEPARATOR: &str = "   ";

/// How quote messages are laid out on the display.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Display,
    EnumString,
)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DisplayMode {
    /// All messages on one centered line.
    #[default]
    Single,
    /// Messages alternate between a top and a bottom band.
    Dual,
}

impl DisplayMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Single => DisplayMode::Dual,
            DisplayMode::Dual => DisplayMode::Single,
        }
    }

    /// Distribute `messages` into the text lines composed for this mode.
    ///
    /// Dual mode sends even-indexed messages to the top band and odd-indexed ones to the
    /// bottom band. A band without messages gets an empty line so both bands still exist.
    pub fn lines<S: AsRef<str>>(self, messages: &[S]) -> Vec<String> {
        match self {
            DisplayMode::Single => vec![join(messages.iter())],
            DisplayMode::Dual => vec![
                join(messages.iter().step_by(2)),
                join(messages.iter().skip(1).step_by(2)),
            ],
        }
    }
}

fn join<'a, S: AsRef<str> + 'a>(messages: impl Iterator<Item = &'a S>) -> String {
    messages
        .map(|m| m.as_ref().trim())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

/// Immutable sequence of pixel columns; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reel {
    columns: Vec<u64>,
    height: usize,
}

impl Reel {
    /// A single dark column.
    pub fn blank(height: usize) -> Self {
        Reel {
            columns: vec![0],
            height,
        }
    }

    /// Number of columns; always at least 1.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Pixel rows per column.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All columns in order.
    pub fn columns(&self) -> &[u64] {
        &self.columns
    }

    /// `true` when no pixel anywhere is lit.
    pub fn is_blank(&self) -> bool {
        self.columns.iter().all(|c| *c == 0)
    }
}

/// One horizontal slice of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// First row of the band.
    pub top: usize,
    /// Rows in the band.
    pub height: usize,
}

/// Builds reels for a fixed display height.
#[derive(Debug, Clone)]
pub struct TextCompositor {
    height: usize,
    glyphs: GlyphTable,
}

impl TextCompositor {
    /// Compositor for `height` rows; `height` must lie in `7..=64`.
    pub fn new(height: usize) -> Result<Self, RenderError> {
        if !(GLYPH_HEIGHT..=MAX_HEIGHT).contains(&height) {
            return Err(RenderError::Height {
                height,
                min: GLYPH_HEIGHT,
                max: MAX_HEIGHT,
            });
        }
        Ok(TextCompositor {
            height,
            glyphs: GlyphTable,
        })
    }

    /// Display height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Split the height into `count` bands differing by at most one row; the first
    /// `height % count` bands take the extra rows.
    pub fn bands(&self, count: usize) -> Vec<Band> {
        if count == 0 {
            return Vec::new();
        }
        let base = self.height / count;
        let extra = self.height % count;
        let mut top = 0;
        (0..count)
            .map(|i| {
                let height = base + usize::from(i < extra);
                let band = Band { top, height };
                top += height;
                band
            })
            .collect()
    }

    /// First glyph row inside `band`: centered when the band is tall enough, otherwise
    /// clamped so the glyph stays on the display.
    pub fn glyph_top(&self, band: Band) -> usize {
        let top = if band.height > GLYPH_HEIGHT {
            band.top + (band.height - GLYPH_HEIGHT) / 2
        } else {
            band.top
        };
        top.min(self.height - GLYPH_HEIGHT)
    }

    /// Compose a single line.
    pub fn compose_line(&self, line: &str) -> Reel {
        self.compose(&[line])
    }

    /// Compose `messages` laid out for `mode`.
    pub fn compose_messages<S: AsRef<str>>(&self, messages: &[S], mode: DisplayMode) -> Reel {
        self.compose(&mode.lines(messages))
    }

    /// Compose one line per band, OR-merging the lines column by column.
    pub fn compose<S: AsRef<str>>(&self, lines: &[S]) -> Reel {
        let bands = self.bands(lines.len());
        let mut columns: Vec<u64> = Vec::new();

        for (line, band) in lines.iter().zip(bands) {
            let rendered = self.line_columns(line.as_ref(), self.glyph_top(band));
            if rendered.len() > columns.len() {
                columns.resize(rendered.len(), 0);
            }
            for (merged, col) in columns.iter_mut().zip(rendered) {
                *merged |= col;
            }
        }

        if columns.is_empty() {
            return Reel::blank(self.height);
        }
        Reel {
            columns,
            height: self.height,
        }
    }

    fn line_columns(&self, line: &str, top: usize) -> Vec<u64> {
        if line.is_empty() {
            return Vec::new();
        }
        let chars = line.chars().count();
        let mut columns = Vec::with_capacity(chars * (GLYPH_WIDTH + CHAR_SPACING) + MESSAGE_SPACING);
        for ch in line.chars() {
            let glyph = self.glyphs.glyph(ch);
            for col in 0..GLYPH_WIDTH {
                columns.push(u64::from(glyph.column(col)) << top);
            }
            columns.extend(std::iter::repeat_n(0, CHAR_SPACING));
        }
        columns.extend(std::iter::repeat_n(0, MESSAGE_SPACING));
        columns
    }
}
