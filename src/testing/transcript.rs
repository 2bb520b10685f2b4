//! Human-readable running transcript on stdout

use colored::Colorize;
use std::io::{self, Write};

use super::config::ParamWrite;
use super::session::AssertionRecord;

/// Prints progress as the run goes; silent when stdout carries JSON
#[derive(Debug, Clone, Copy)]
pub struct Transcript {
    enabled: bool,
    verbose: bool,
}

impl Transcript {
    pub fn new(enabled: bool, verbose: bool) -> Self {
        Self { enabled, verbose }
    }

    pub fn silent() -> Self {
        Self::new(false, false)
    }

    pub fn header(&self, suite: &str, module: &str, description: Option<&str>) {
        if !self.enabled {
            return;
        }
        println!(
            "\n{} {} {}",
            "Running Suite:".blue().bold(),
            suite.white().bold(),
            format!("({})", module).dimmed()
        );
        if let Some(desc) = description {
            println!("  {}", desc.dimmed());
        }
    }

    pub fn phase(&self, title: &str) {
        if self.enabled {
            println!("\n{}", format!("=== {} ===", title).cyan());
        }
    }

    pub fn section(&self, title: &str) {
        if self.enabled {
            println!("\n{}", format!("--- {} ---", title).cyan());
        }
    }

    pub fn write(&self, write: &ParamWrite) {
        if self.enabled && self.verbose {
            println!("  {} {}", "$".dimmed(), write.to_string().dimmed());
        }
    }

    pub fn captured(&self, name: &str, values: &[i64], chosen: i64) {
        if self.enabled && self.verbose {
            let preview: Vec<String> = values.iter().take(10).map(i64::to_string).collect();
            println!(
                "  {} captured {} values into '{}' ({}{}), using {}",
                "·".dimmed(),
                values.len(),
                name,
                preview.join(" "),
                if values.len() > 10 { " ..." } else { "" },
                chosen
            );
        }
    }

    pub fn assertion(&self, record: &AssertionRecord) {
        if !self.enabled {
            return;
        }
        let stdout = io::stdout();
        let _ = self.write_assertion(&mut stdout.lock(), record);
    }

    /// Render one assertion result: status line, expected pattern, found flag
    ///
    /// A failure also gets the log tail it was checked against.
    pub fn write_assertion<W: Write>(&self, out: &mut W, record: &AssertionRecord) -> io::Result<()> {
        if record.passed {
            writeln!(
                out,
                "  {} {} #{}: {}",
                "✓".green(),
                "PASS".green(),
                record.index,
                record.description
            )?;
            writeln!(out, "      {} '{}'", "expected:".dimmed(), record.pattern)?;
            writeln!(out, "      {} {}", "found:".dimmed(), "yes".green())?;
        } else {
            writeln!(
                out,
                "  {} {} #{}: {}",
                "✗".red(),
                "FAIL".red().bold(),
                record.index,
                record.description
            )?;
            writeln!(out, "      {} '{}'", "expected:".dimmed(), record.pattern)?;
            writeln!(out, "      {} {}", "found:".dimmed(), "no".red())?;
            if let Some(excerpt) = &record.excerpt {
                writeln!(out, "      {}", "log tail:".dimmed())?;
                for line in excerpt.lines() {
                    writeln!(out, "        {}", line.dimmed())?;
                }
            }
        }
        Ok(())
    }

    pub fn warning(&self, message: &str) {
        if self.enabled {
            println!("  {} {}", "!".yellow(), message.yellow());
        }
    }
}
