//! Parsing of interactive command lines.

use std::path::PathBuf;

use crate::error::{MboxError, Result};
use crate::session::cursor::parse_page_size;
use crate::session::sort::{SortDirection, SortField};

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ls [N]`
    List(Option<usize>),
    /// `next [N]`
    Next(Option<usize>),
    /// `prev [N]`
    Prev(Option<usize>),
    /// `cols` shows the selection, `cols a,b` replaces it.
    Columns(Option<String>),
    Show(usize),
    Search(String),
    Sort(SortField, SortDirection),
    Reset,
    /// `save <n> <file>`
    Save(usize, PathBuf),
    Info,
    /// `dates` summarizes strategies, `dates <n>` explains one message.
    Dates(Option<usize>),
    /// `dates unparsed`
    UnparsedDates,
    Help,
    Quit,
    /// Blank line.
    Empty,
}

impl Command {
    /// Parse a line. The command word is case-insensitive.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then_some(rest);

        match word.to_ascii_lowercase().as_str() {
            "" => Ok(Self::Empty),
            "ls" | "list" => Ok(Self::List(arg.map(parse_page_size).transpose()?)),
            "next" | "n" => Ok(Self::Next(arg.map(parse_page_size).transpose()?)),
            "prev" | "p" => Ok(Self::Prev(arg.map(parse_page_size).transpose()?)),
            "cols" | "columns" => Ok(Self::Columns(arg.map(str::to_string))),
            "show" => Ok(Self::Show(parse_ordinal(arg, "show <n>")?)),
            "search" | "/" => match arg {
                Some(q) => Ok(Self::Search(q.to_string())),
                None => Err(usage("search <text>")),
            },
            "sort" => parse_sort(arg),
            "reset" => Ok(Self::Reset),
            "save" => parse_save(arg),
            "info" | "stats" => Ok(Self::Info),
            "dates" => match arg {
                Some(a) if a.eq_ignore_ascii_case("unparsed") => Ok(Self::UnparsedDates),
                _ => Ok(Self::Dates(
                    arg.map(|a| parse_ordinal(Some(a), "dates [n|unparsed]"))
                        .transpose()?,
                )),
            },
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(MboxError::InvalidArgument(format!(
                "unknown command '{other}' (type 'help')"
            ))),
        }
    }
}

fn usage(text: &str) -> MboxError {
    MboxError::InvalidArgument(format!("usage: {text}"))
}

fn parse_ordinal(arg: Option<&str>, usage_text: &str) -> Result<usize> {
    arg.and_then(|a| a.trim().parse().ok())
        .ok_or_else(|| usage(usage_text))
}

fn parse_sort(arg: Option<&str>) -> Result<Command> {
    let mut parts = arg.unwrap_or("").split_whitespace();
    let field: SortField = parts
        .next()
        .ok_or_else(|| usage("sort <date|from|subject> [asc|desc]"))?
        .parse()?;
    let direction = match parts.next() {
        Some(d) => d.parse()?,
        None => SortDirection::default(),
    };
    if parts.next().is_some() {
        return Err(usage("sort <date|from|subject> [asc|desc]"));
    }
    Ok(Command::Sort(field, direction))
}

fn parse_save(arg: Option<&str>) -> Result<Command> {
    let usage_text = "save <n> <file>";
    let (n, path) = arg
        .and_then(|a| a.split_once(char::is_whitespace))
        .ok_or_else(|| usage(usage_text))?;
    let n = parse_ordinal(Some(n), usage_text)?;
    let path = path.trim();
    if path.is_empty() {
        return Err(usage(usage_text));
    }
    Ok(Command::Save(n, PathBuf::from(path)))
}
