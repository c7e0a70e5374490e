//! Terminal canvas for the dot-matrix window.
//!
//! Two pixel rows share one character cell: the upper pixel maps to `▀`, the lower one to
//! `▄`, both to `█`. Lit pixels use the `on` color over the `off` background. A status line
//! is printed under the matrix.
use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::scroll::Canvas;

/// Render a bit-column window as text rows of half-block characters.
pub fn half_block_rows(window: &[u64], height: usize) -> Vec<String> {
    (0..height.div_ceil(2))
        .map(|cell_row| {
            let upper = cell_row * 2;
            let lower = upper + 1;
            window
                .iter()
                .map(|col| {
                    let top = col >> upper & 1 == 1;
                    let bottom = lower < height && col >> lower & 1 == 1;
                    match (top, bottom) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect()
        })
        .collect()
}

/// Paints onto any writer with crossterm commands.
pub struct TerminalCanvas<W: Write> {
    out: W,
    on: Color,
    off: Color,
    status: String,
}

impl<W: Write> TerminalCanvas<W> {
    /// Canvas writing to `out` with the default amber-on-black palette.
    pub fn new(out: W) -> Self {
        TerminalCanvas {
            out,
            on: Color::Rgb {
                r: 255,
                g: 176,
                b: 0,
            },
            off: Color::Black,
            status: String::new(),
        }
    }

    /// Text shown under the matrix from the next paint on.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Current status text.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Borrow the underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Canvas for TerminalCanvas<W> {
    fn paint(&mut self, window: &[u64], height: usize) -> io::Result<()> {
        let rows = half_block_rows(window, height);
        queue!(
            self.out,
            SetForegroundColor(self.on),
            SetBackgroundColor(self.off)
        )?;
        for (y, row) in rows.iter().enumerate() {
            queue!(self.out, MoveTo(0, y as u16), Print(row))?;
        }
        queue!(
            self.out,
            ResetColor,
            MoveTo(0, rows.len() as u16 + 1),
            Clear(ClearType::CurrentLine),
            Print(&self.status)
        )?;
        self.out.flush()
    }
}

/// Raw mode plus alternate screen; restored on drop.
pub struct TerminalSession {
    restore: Option<fn() -> io::Result<()>>,
}

impl TerminalSession {
    /// Switch the terminal into full-screen raw mode.
    pub fn enter() -> io::Result<Self> {
        Self::enter_with(
            terminal::enable_raw_mode,
            || {
                let mut stdout = io::stdout();
                execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))
            },
            Self::leave,
        )
    }

    /// Once `raw` succeeds the guard exists, so a failing `screen` step is undone by `restore`.
    fn enter_with(
        raw: impl FnOnce() -> io::Result<()>,
        screen: impl FnOnce() -> io::Result<()>,
        restore: fn() -> io::Result<()>,
    ) -> io::Result<Self> {
        raw()?;
        let session = TerminalSession {
            restore: Some(restore),
        };
        screen()?;
        Ok(session)
    }

    /// Restore the terminal, reporting failures.
    pub fn restore(mut self) -> io::Result<()> {
        match self.restore.take() {
            Some(restore) => restore(),
            None => Ok(()),
        }
    }

    fn leave() -> io::Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, ResetColor, Show, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            let _ = restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn half_blocks_pair_rows() {
        // Column 0: row 0 only; column 1: row 1 only; column 2: both; column 3: none.
        let window = [0b01, 0b10, 0b11, 0b00];
        assert_eq!(half_block_rows(&window, 2), vec!["▀▄█ ".to_string()]);
    }

    #[test]
    fn odd_height_ignores_rows_below_the_display() {
        let window = [0b1_0000, 0b10_0000];
        let rows = half_block_rows(&window, 5);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], "▀ ");
    }

    static SCREEN_FAILED_RESTORES: AtomicUsize = AtomicUsize::new(0);
    static RAW_FAILED_RESTORES: AtomicUsize = AtomicUsize::new(0);
    static CLEAN_RESTORES: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn failed_screen_setup_leaves_raw_mode() {
        fn restore() -> io::Result<()> {
            SCREEN_FAILED_RESTORES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        let entered =
            TerminalSession::enter_with(|| Ok(()), || Err(io::Error::other("not a terminal")), restore);
        assert!(entered.is_err());
        assert_eq!(SCREEN_FAILED_RESTORES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_raw_mode_has_nothing_to_undo() {
        fn restore() -> io::Result<()> {
            RAW_FAILED_RESTORES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        let entered = TerminalSession::enter_with(
            || Err(io::Error::other("not a terminal")),
            || Ok(()),
            restore,
        );
        assert!(entered.is_err());
        assert_eq!(RAW_FAILED_RESTORES.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_restore_runs_once() {
        fn restore() -> io::Result<()> {
            CLEAN_RESTORES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        let session = TerminalSession::enter_with(|| Ok(()), || Ok(()), restore).unwrap();
        assert_eq!(CLEAN_RESTORES.load(Ordering::SeqCst), 0);
        session.restore().unwrap();
        assert_eq!(CLEAN_RESTORES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn paint_writes_rows_and_status() {
        let mut canvas = TerminalCanvas::new(Vec::new());
        canvas.set_status("Updated 12:00:00");
        canvas.paint(&[0b11; 4], 4).unwrap();
        let text = String::from_utf8(canvas.writer().clone()).unwrap();
        assert!(text.contains("████"));
        assert!(text.contains("Updated 12:00:00"));
    }
}
