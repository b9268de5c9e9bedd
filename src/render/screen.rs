use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};

use super::{Frame, Layout, Renderer};

/// Full-screen view redrawn in place on every refresh.
///
/// The alternate screen is entered on construction and left on drop, so the
/// user's scrollback is untouched once the loop stops. Raw mode is not
/// enabled: Ctrl-C still reaches the process as SIGINT.
pub struct LiveScreen<W: Write = Stdout> {
    out: W,
    /// Fixed size for writers that are not a terminal.
    size: Option<(u16, u16)>,
}

impl LiveScreen<Stdout> {
    pub fn stdout() -> Result<Self> {
        Self::new(io::stdout(), None)
    }
}

impl<W: Write> LiveScreen<W> {
    pub fn new(mut out: W, size: Option<(u16, u16)>) -> Result<Self> {
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Self { out, size })
    }

    fn size(&self) -> (u16, u16) {
        self.size
            .or_else(|| terminal::size().ok())
            .unwrap_or((u16::MAX, u16::MAX))
    }
}

impl<W: Write> Renderer for LiveScreen<W> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        let (cols, rows) = self.size();
        queue!(self.out, Clear(ClearType::All))?;
        for (i, line) in frame.lines(Layout::Plain).iter().enumerate() {
            if i >= rows as usize {
                break;
            }
            let visible: String = line.chars().take(cols as usize).collect();
            queue!(self.out, MoveTo(0, i as u16), Print(visible))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for LiveScreen<W> {
    fn drop(&mut self) {
        let _ = restore_terminal(&mut self.out);
    }
}

/// Show the cursor and leave the alternate screen.
pub fn restore_terminal<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, Show, LeaveAlternateScreen)
}

/// Restore the terminal before the default panic message is printed, so a
/// panic during a live session is readable in the normal screen.
pub fn install_panic_restore() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal(&mut io::stdout());
        default_hook(info);
    }));
}
