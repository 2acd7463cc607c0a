//! Colored console status lines

use colored::{ColoredString, Colorize};

/// Status tag printed in front of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Ok,
    Fail,
    Warn,
    Info,
}

impl Tag {
    fn label(&self) -> ColoredString {
        match self {
            Tag::Ok => "[OK]".green().bold(),
            Tag::Fail => "[FAIL]".red().bold(),
            Tag::Warn => "[WARN]".yellow().bold(),
            Tag::Info => "[INFO]".blue(),
        }
    }
}

pub fn tagged(tag: Tag, message: &str) -> String {
    format!("{} {}", tag.label(), message)
}

pub fn ok(message: &str) {
    println!("{}", tagged(Tag::Ok, message));
}

pub fn fail(message: &str) {
    println!("{}", tagged(Tag::Fail, message));
}

pub fn warn(message: &str) {
    println!("{}", tagged(Tag::Warn, message));
}

pub fn info(message: &str) {
    println!("{}", tagged(Tag::Info, message));
}

/// Indented continuation line under the last status line
pub fn detail(message: &str) {
    println!("    {}", message);
}
