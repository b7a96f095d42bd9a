//! Colored terminal output for the command line front end.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Writes prefixed, colored status lines to stdout and errors to stderr.
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn prefixed(&self, prefix: &str, color: Color, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(&mut buffer, "{prefix}")?;
        buffer.reset()?;
        writeln!(&mut buffer, " {message}")?;
        self.bufwtr.print(&buffer)
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.prefixed("ℹ", Color::Cyan, message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.prefixed("✓", Color::Green, message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.prefixed("⚠", Color::Yellow, message)
    }

    /// Print a message only in verbose mode
    pub fn verbose(&self, message: &str) -> std::io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.prefixed("→", Color::Blue, message)
    }

    /// Print an error message to stderr, even in quiet mode
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || writeln!(&mut buffer, " {message}").is_err()
            || bufwtr.print(&buffer).is_err()
        {
            eprintln!("✗ {message}");
        }
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.println(&format!("    {message}"))
    }

    /// Print a plain line
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.bufwtr.print(&buffer)
    }

    /// Print a line that is the command's result, even in quiet mode
    pub fn result(&self, message: &str) -> std::io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.bufwtr.print(&buffer)
    }
}
