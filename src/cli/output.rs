//! Terminal output for the quire CLI.
//!
//! Every line is rendered to a `String` first and printed second, so the
//! plain (uncolored) form can be checked in tests.

use crate::rag::indexer::IndexReport;
use owo_colors::OwoColorize;

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Note,
    Warn,
    Fail,
}

impl Tone {
    fn tag(self) -> &'static str {
        match self {
            Tone::Ok => "ok",
            Tone::Note => "--",
            Tone::Warn => "warn",
            Tone::Fail => "fail",
        }
    }
}

pub struct Output {
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// `[tag] message`, with the tag padded so messages line up.
    pub fn render_line(&self, tone: Tone, message: &str) -> String {
        let tag = format!("[{:>4}]", tone.tag());
        if !self.colored {
            return format!("{} {}", tag, message);
        }
        match tone {
            Tone::Ok => format!("{} {}", tag.green(), message),
            Tone::Note => format!("{} {}", tag.dimmed(), message),
            Tone::Warn => format!("{} {}", tag.yellow().bold(), message.yellow()),
            Tone::Fail => format!("{} {}", tag.red().bold(), message.red()),
        }
    }

    /// Status line; failures go to stderr.
    pub fn line(&self, tone: Tone, message: &str) {
        let rendered = self.render_line(tone, message);
        if tone == Tone::Fail {
            eprintln!("{}", rendered);
        } else {
            println!("{}", rendered);
        }
    }

    pub fn banner(&self) {
        let version = concat!("v", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!("{} {}", "quire".cyan().bold(), version.dimmed());
        } else {
            println!("quire {}", version);
        }
    }

    pub fn heading(&self, title: &str) {
        if self.colored {
            println!("\n{}", title.bold());
        } else {
            println!("\n{}\n{}", title, "-".repeat(title.chars().count()));
        }
    }

    pub fn render_field(&self, key: &str, value: &str) -> String {
        let key = format!("{:>12}", key);
        if self.colored {
            format!("{} {}", key.dimmed(), value)
        } else {
            format!("{} {}", key, value)
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        println!("{}", self.render_field(key, value));
    }

    /// A command the user can paste into a shell.
    pub fn shell(&self, command: &str) {
        if self.colored {
            println!("       {} {}", "$".dimmed(), command.cyan());
        } else {
            println!("       $ {}", command);
        }
    }

    /// A TOML document, section headers highlighted.
    pub fn toml(&self, text: &str) {
        for line in text.lines() {
            if self.colored && line.starts_with('[') {
                println!("  {}", line.cyan());
            } else {
                println!("  {}", line);
            }
        }
    }

    /// Summary of a finished `quire-server index` run.
    pub fn render_index_report(&self, report: &IndexReport) -> Vec<String> {
        let mut lines = vec![self.render_line(
            Tone::Ok,
            &format!("indexed {} chunks from {} pages", report.chunks, report.pages),
        )];
        lines.push(self.render_field("dimensions", &report.dimensions.to_string()));
        lines.push(self.render_field("snapshot", &report.path.display().to_string()));
        lines
    }

    pub fn index_report(&self, report: &IndexReport) {
        for line in self.render_index_report(report) {
            println!("{}", line);
        }
    }

    pub fn blank(&self) {
        println!();
    }
}
