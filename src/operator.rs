//! Operator I/O: raw single-keystroke commands and line-buffered text entry.

use std::io::{BufRead, Write};

use crossterm::cursor::MoveTo;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};

use crate::error::Error;

/// The person answering prompts. `read_key` returning `None` means the
/// operator is gone (end of input, Ctrl+C) and the run must stop.
pub trait Operator {
    /// Report a recoverable mistake and give the operator a chance to read it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the terminal cannot be written or read.
    fn notify(&mut self, message: &str) -> Result<(), Error>;

    /// Block for a single keystroke. Enter is reported as `'\n'`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the terminal cannot be read.
    fn read_key(&mut self) -> Result<Option<char>, Error>;

    /// Prompt for a line of text, returned without its terminator.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the terminal cannot be written or read.
    fn read_line(&mut self, prompt: &str) -> Result<String, Error>;

    /// Replace whatever is on screen with `screen`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the terminal cannot be written.
    fn show(&mut self, screen: &str) -> Result<(), Error>;
}

/// Keeps the terminal in raw mode for as long as it lives.
struct RawModeGuard;

impl RawModeGuard {
    /// Switch the terminal into raw mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if raw mode cannot be enabled.
    fn enable() -> Result<Self, Error> {
        terminal::enable_raw_mode()?;
        return Ok(Self);
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Operator driven by arbitrary byte streams: one byte per keystroke,
/// newline-terminated text entry. Used when stdin is not a terminal.
pub struct StreamOperator<R, W> {
    /// Keystrokes and text entry.
    input: R,
    /// Screens and notices.
    output: W,
}

impl<R: BufRead, W: Write> StreamOperator<R, W> {
    /// Wrap an input and output stream.
    pub const fn new(input: R, output: W) -> Self {
        return Self { input, output };
    }
}

impl<R: BufRead, W: Write> Operator for StreamOperator<R, W> {
    fn notify(&mut self, message: &str) -> Result<(), Error> {
        writeln!(self.output, "{message}")?;
        return Ok(());
    }

    fn read_key(&mut self) -> Result<Option<char>, Error> {
        let byte = {
            let buf = self.input.fill_buf()?;
            let Some(&b) = buf.first() else {
                return Ok(None);
            };
            b
        };
        self.input.consume(1);

        let key = char::from(byte);
        return Ok(Some(if key == '\r' { '\n' } else { key }));
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, Error> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut buf = String::new();
        self.input.read_line(&mut buf)?;
        return Ok(buf.trim_end_matches(['\r', '\n']).to_string());
    }

    fn show(&mut self, screen: &str) -> Result<(), Error> {
        self.output.write_all(screen.as_bytes())?;
        self.output.flush()?;
        return Ok(());
    }
}

/// Interactive terminal operator: clears the screen for each prompt and
/// reads commands as raw keystrokes.
pub struct TtyOperator {
    /// Terminal output.
    out: std::io::Stdout,
}

impl TtyOperator {
    /// Attach to the process terminal.
    pub fn new() -> Self {
        return Self { out: std::io::stdout() };
    }
}

impl Default for TtyOperator {
    fn default() -> Self {
        return Self::new();
    }
}

impl Operator for TtyOperator {
    fn notify(&mut self, message: &str) -> Result<(), Error> {
        writeln!(self.out, "{message}")?;
        self.read_line("press enter to continue")?;
        return Ok(());
    }

    fn read_key(&mut self) -> Result<Option<char>, Error> {
        let key = {
            let _raw = RawModeGuard::enable()?;
            read_raw_key()?
        };
        writeln!(self.out)?;
        return Ok(key);
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, Error> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;

        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf)?;
        return Ok(buf.trim_end_matches(['\r', '\n']).to_string());
    }

    fn show(&mut self, screen: &str) -> Result<(), Error> {
        crossterm::execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.write_all(screen.as_bytes())?;
        self.out.flush()?;
        return Ok(());
    }
}

/// Wait for a key press while the terminal is in raw mode.
/// Ctrl+C arrives as a key event in raw mode and is reported as `None`.
///
/// # Errors
///
/// Returns `Error::Io` if reading terminal events fails.
fn read_raw_key() -> Result<Option<char>, Error> {
    loop {
        let Event::Key(key) = crossterm::event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(None),
            KeyCode::Char(c) => return Ok(Some(c)),
            KeyCode::Enter => return Ok(Some('\n')),
            _ => {},
        }
    }
}
