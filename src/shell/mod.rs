//! Interactive browser: reads commands, runs them on a [`Session`], prints tables.
//!
//! Command errors are printed and the loop continues; only I/O errors on the
//! terminal itself end it.

pub mod command;
pub mod table;

use std::io::{BufRead, Write};

use humansize::{format_size, BINARY};

use crate::config::BrowseConfig;
use crate::error::MboxError;
use crate::index::mailbox::DateDiagnostic;
use crate::search::SEARCH_DISPLAY_LIMIT;
use crate::session::columns::Column;
use crate::session::{Page, Session, ViewKind};

use self::command::Command;
use self::table::Table;

const PROMPT: &str = "(mbox) ";

const HELP: &str = "\
Commands:
  ls [N]                     list the next N messages (default page size)
  next [N]                   same as ls
  prev [N]                   page backward
  cols [c1,c2,...]           show or set columns (index, date, from, to, cc, subject)
  show <n>                   print message n of the current view
  search <text>              case-insensitive search in From / Subject
  sort <field> [asc|desc]    sort by date, from or subject
  reset                      back to all messages in file order
  save <n> <file>            write message n verbatim to a file or directory
  info                       mailbox statistics
  dates [n]                  date parsing summary, or details for message n
  dates unparsed             list messages whose date could not be resolved
  help                       this text
  quit                       leave (also: exit, Ctrl-D)
";

/// REPL over a session, generic over its input and output streams.
pub struct Shell<'a, W: Write> {
    session: &'a mut Session,
    out: W,
    from_width: usize,
    subject_width: usize,
}

impl<'a, W: Write> Shell<'a, W> {
    pub fn new(session: &'a mut Session, out: W, browse: &BrowseConfig) -> Self {
        Self {
            session,
            out,
            from_width: browse.from_width,
            subject_width: browse.subject_width,
        }
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> std::io::Result<()> {
        let index = self.session.index();
        writeln!(
            self.out,
            "Loaded {} messages from {} ({})",
            index.size(),
            index.path().display(),
            format_size(index.file_size(), BINARY)
        )?;
        writeln!(self.out, "Type 'help' for commands.")?;

        let mut line = String::new();
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                break;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => self.execute(cmd)?,
                Err(e) => self.report(&e)?,
            }
        }
        writeln!(self.out, "Good-bye!")
    }

    /// Run one command, printing its result or its error.
    pub fn execute(&mut self, cmd: Command) -> std::io::Result<()> {
        match cmd {
            Command::Empty | Command::Quit => Ok(()),
            Command::Help => write!(self.out, "{HELP}"),
            Command::List(n) | Command::Next(n) => {
                let page = self.session.list(n);
                self.print_page_result(page)
            }
            Command::Prev(n) => {
                let page = self.session.prev(n);
                self.print_page_result(page)
            }
            Command::Columns(None) => {
                let current = self.session.columns().to_string();
                let all: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
                writeln!(self.out, "Current display columns: {current}")?;
                writeln!(self.out, "Available columns: {}", all.join(","))
            }
            Command::Columns(Some(spec)) => match self.session.set_columns(&spec) {
                Ok(()) => {
                    let current = self.session.columns().to_string();
                    writeln!(self.out, "Display columns set to: {current}")
                }
                Err(e) => self.report(&e),
            },
            Command::Show(n) => match self.session.show(n) {
                Ok(text) => {
                    let rule = "=".repeat(80);
                    writeln!(self.out, "{rule}")?;
                    write!(self.out, "{text}")?;
                    if !text.ends_with('\n') {
                        writeln!(self.out)?;
                    }
                    writeln!(self.out, "{rule}")
                }
                Err(e) => self.report(&e),
            },
            Command::Search(query) => self.search(&query),
            Command::Sort(field, direction) => {
                self.session.sort(field, direction);
                writeln!(self.out, "Sorted by {field} {direction}")?;
                let page = self.session.list(None);
                self.print_page_result(page)
            }
            Command::Reset => {
                self.session.reset();
                writeln!(self.out, "View reset to all messages")
            }
            Command::Save(n, path) => match self.session.export(n, &path) {
                Ok(written) => writeln!(self.out, "Saved → {}", written.display()),
                Err(e) => self.report(&e),
            },
            Command::Info => self.info(),
            Command::Dates(None) => self.dates_summary(),
            Command::Dates(Some(n)) => match self.session.diagnose(n) {
                Ok(diag) => self.print_diagnostic(&diag),
                Err(e) => self.report(&e),
            },
            Command::UnparsedDates => self.unparsed_dates(),
        }
    }

    fn report(&mut self, e: &MboxError) -> std::io::Result<()> {
        writeln!(self.out, "Error: {e}")
    }

    fn search(&mut self, query: &str) -> std::io::Result<()> {
        let outcome = match self.session.search(query) {
            Ok(o) => o,
            Err(e) => return self.report(&e),
        };
        if outcome.total() == 0 {
            return writeln!(self.out, "No matches found");
        }

        let title = if outcome.is_truncated() {
            format!(
                "Found {} matches (showing first {SEARCH_DISPLAY_LIMIT})",
                outcome.total()
            )
        } else {
            format!("Found {} matches", outcome.total())
        };
        let page = Page {
            start: 0,
            indices: outcome.displayed().to_vec(),
            view_len: outcome.total(),
        };
        let rendered = render_page(&*self.session, &page, self.from_width, self.subject_width);
        writeln!(self.out, "\n{title}")?;
        write!(self.out, "{rendered}")
    }

    fn print_page_result(&mut self, page: crate::error::Result<Page>) -> std::io::Result<()> {
        let page = match page {
            Ok(p) => p,
            Err(e) => return self.report(&e),
        };
        if page.is_empty() {
            return writeln!(self.out, "No messages in the current view");
        }
        let scope = match self.session.view_kind() {
            ViewKind::All => String::new(),
            ViewKind::Search { query } => format!(" matching '{query}'"),
            ViewKind::Sorted { field, direction } => format!(" sorted by {field} {direction}"),
        };
        let title = format!(
            "Messages {} to {} of {}{scope}",
            page.start,
            page.end() - 1,
            page.view_len
        );
        let rendered = render_page(&*self.session, &page, self.from_width, self.subject_width);
        writeln!(self.out, "\n{title}")?;
        write!(self.out, "{rendered}")
    }

    fn info(&mut self) -> std::io::Result<()> {
        let stats = self.session.stats();
        let index = self.session.index();
        writeln!(self.out, "Path        : {}", index.path().display())?;
        writeln!(self.out, "Messages    : {}", stats.total)?;
        writeln!(
            self.out,
            "Size        : {}",
            format_size(stats.file_size, BINARY)
        )?;
        if stats.preamble_bytes > 0 {
            writeln!(self.out, "Preamble    : {} bytes", stats.preamble_bytes)?;
        }
        writeln!(
            self.out,
            "Dates       : {} parsed, {} unparsed",
            stats.parsed_dates, stats.unparsed_dates
        )?;
        if let (Some(first), Some(last)) = (stats.earliest, stats.latest) {
            writeln!(
                self.out,
                "Date Range  : {} to {}",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            )?;
        }
        if !stats.top_domains.is_empty() {
            writeln!(self.out, "\nMessage Sources:")?;
            for (domain, count) in &stats.top_domains {
                writeln!(self.out, "  @{domain}: {count} messages")?;
            }
        }
        Ok(())
    }

    fn dates_summary(&mut self) -> std::io::Result<()> {
        let stats = self.session.stats();
        writeln!(self.out, "Date resolution:")?;
        for (strategy, count) in &stats.by_strategy {
            writeln!(self.out, "  {:<16} {count}", strategy.name())?;
        }
        writeln!(self.out, "  {:<16} {}", "unparsed", stats.unparsed_dates)
    }

    fn unparsed_dates(&mut self) -> std::io::Result<()> {
        let unparsed: Vec<DateDiagnostic> = self
            .session
            .index()
            .date_diagnostics()
            .into_iter()
            .filter(|d| d.date.is_none())
            .collect();
        for diag in &unparsed {
            writeln!(
                self.out,
                "  #{:<6} {:<24} {}",
                diag.index,
                diag.raw.as_deref().unwrap_or("(no Date header)"),
                diag.subject
            )?;
        }
        writeln!(self.out, "{} message(s) with unparsed dates", unparsed.len())
    }

    fn print_diagnostic(&mut self, diag: &DateDiagnostic) -> std::io::Result<()> {
        writeln!(self.out, "Message   : {}", diag.index)?;
        writeln!(self.out, "Subject   : {}", diag.subject)?;
        writeln!(
            self.out,
            "Raw date  : {}",
            diag.raw.as_deref().unwrap_or("(no Date header)")
        )?;
        writeln!(self.out, "Strategy  : {}", diag.strategy_name())?;
        match &diag.date {
            Some(date) => writeln!(self.out, "Parsed    : {date}"),
            None => writeln!(self.out, "Parsed    : (unparsed)"),
        }
    }
}

/// Render a page as a table: a `#` column (position in the view) followed
/// by the session's selected columns.
pub fn render_page(session: &Session, page: &Page, from_width: usize, subject_width: usize) -> String {
    let mut table = Table::new().column("#", None, true);
    for &column in session.columns().columns() {
        let cap = match column {
            Column::From | Column::To | Column::Cc => Some(from_width),
            Column::Subject => Some(subject_width),
            Column::Index | Column::Date => None,
        };
        table = table.column(column.name(), cap, column == Column::Index);
    }
    for (offset, record) in session.records(page).into_iter().enumerate() {
        let mut cells = vec![(page.start + offset).to_string()];
        cells.extend(session.row(record));
        table.row(cells);
    }
    table.render()
}
