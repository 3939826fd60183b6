//! Console status lines
//!
//! Child processes write to log files; this module is how the controller
//! itself talks to the operator.

use std::io::{self, Write};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Operator-facing status printer
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// `==== <msg>` stage banner
    pub fn header(&self, msg: &str) {
        let _ = print_colored(
            &mut StandardStream::stdout(ColorChoice::Auto),
            ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true),
            "====",
            msg,
        );
    }

    pub fn info(&self, msg: &str) {
        println!("{}", msg);
    }

    /// Only shown with `--verbose`
    pub fn detail(&self, msg: &str) {
        if self.verbose {
            let _ = print_colored(
                &mut StandardStream::stdout(ColorChoice::Auto),
                ColorSpec::new().set_fg(Some(Color::Blue)),
                "--",
                msg,
            );
        }
    }

    pub fn warn(&self, msg: &str) {
        let _ = print_colored(
            &mut StandardStream::stderr(ColorChoice::Auto),
            ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
            "warning:",
            msg,
        );
    }

    pub fn error(&self, msg: &str) {
        let _ = print_colored(
            &mut StandardStream::stderr(ColorChoice::Auto),
            ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true),
            "error:",
            msg,
        );
    }

    pub fn elapsed(&self, label: &str, elapsed: Duration) {
        println!("{}: {}", label, format_secs(elapsed));
    }
}

fn print_colored(
    out: &mut StandardStream,
    spec: &ColorSpec,
    tag: &str,
    msg: &str,
) -> io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{}", tag)?;
    out.reset()?;
    writeln!(out, " {}", msg)?;
    out.flush()
}

/// Seconds with four decimals, the format used for every timing line
pub fn format_secs(elapsed: Duration) -> String {
    format!("{:.4}", elapsed.as_secs_f64())
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
