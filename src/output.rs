//! Display side of operations: the [`Presenter`] interface and a terminal
//! implementation printing fragments in a grep-like layout.

use crate::query::Fragment;
use crate::utils::progress::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Where operations report status and results
pub trait Presenter: Send + Sync {
    /// Replace the current status line
    fn show_progress(&self, status: &str) -> io::Result<()>;

    /// Append one matching fragment of `path`
    fn append_result(&self, path: &Path, fragment: &Fragment<'_>) -> io::Result<()>;

    /// Remove the status line and start a fresh result listing
    fn clear(&self) -> io::Result<()>;
}

/// Results on stdout; status as a spinner line on stderr
pub struct TerminalPresenter {
    choice: ColorChoice,
    heading: bool,
    last_path: Mutex<Option<PathBuf>>,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalPresenter {
    pub fn new(color: bool, heading: bool) -> Self {
        Self {
            choice: if color {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            },
            heading,
            last_path: Mutex::new(None),
            spinner: Mutex::new(None),
        }
    }

    fn spinner(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

impl Presenter for TerminalPresenter {
    fn show_progress(&self, status: &str) -> io::Result<()> {
        self.spinner()
            .get_or_insert_with(new_spinner)
            .set_message(status.to_string());
        Ok(())
    }

    fn append_result(&self, path: &Path, fragment: &Fragment<'_>) -> io::Result<()> {
        let mut last_path = self.last_path.lock().unwrap_or_else(|p| p.into_inner());
        let is_new_file = last_path.as_deref() != Some(path);

        let print = || -> io::Result<()> {
            let mut stdout = StandardStream::stdout(self.choice);
            if is_new_file && self.heading {
                if last_path.is_some() {
                    // Add blank line between files
                    writeln!(stdout)?;
                }
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
                writeln!(stdout, "{}", path.display())?;
                stdout.reset()?;
            }
            print_fragment(&mut stdout, path, fragment, self.heading)
        };

        // Keep the spinner line from tearing through the results
        match self.spinner().as_ref() {
            Some(spinner) => spinner.suspend(print)?,
            None => print()?,
        }

        if is_new_file {
            *last_path = Some(path.to_path_buf());
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if let Some(spinner) = self.spinner().take() {
            spinner.finish_and_clear();
        }
        *self.last_path.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

/// Print a fragment line with its phrase words highlighted
fn print_fragment<W: WriteColor>(
    stdout: &mut W,
    path: &Path,
    fragment: &Fragment<'_>,
    heading: bool,
) -> io::Result<()> {
    if !heading {
        // Print path prefix when not using heading mode
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(stdout, "{}", path.display())?;
        stdout.reset()?;
        write!(stdout, ":")?;
    }

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(stdout, "{}", fragment.line_number())?;
    stdout.reset()?;
    write!(stdout, ":")?;

    let line = fragment.as_str();
    let mut printed = 0;
    for (start, end) in fragment.term_spans() {
        if start < printed
            || end > line.len()
            || !line.is_char_boundary(start)
            || !line.is_char_boundary(end)
        {
            continue;
        }
        write!(stdout, "{}", &line[printed..start])?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(stdout, "{}", &line[start..end])?;
        stdout.reset()?;
        printed = end;
    }
    writeln!(stdout, "{}", &line[printed..])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::TermOccurrence;
    use crate::query::locate;
    use termcolor::Buffer;

    fn render(text: &str, occurrences: &[TermOccurrence], distinct: usize) -> String {
        let mut out = Buffer::no_color();
        for fragment in locate(text, occurrences, distinct) {
            print_fragment(&mut out, Path::new("a.txt"), &fragment, false).unwrap();
        }
        String::from_utf8(out.into_inner()).unwrap()
    }

    fn occ(word: &str, start: usize, end: usize) -> TermOccurrence {
        TermOccurrence {
            word: word.into(),
            position: 0,
            start,
            end,
        }
    }

    #[test]
    fn test_prints_line_with_number() {
        let text = "skip\nhello world\n";
        let out = render(text, &[occ("hello", 5, 10), occ("world", 11, 16)], 2);
        assert_eq!(out, "a.txt:2:hello world\n");
    }

    #[test]
    fn test_misaligned_spans_print_plain() {
        // Offsets from an older version of the file
        let text = "aé€ bar x";
        let terms = [occ("bar", 2, 5), occ("bar", 7, 10)];
        let fragment = Fragment {
            text,
            start: 0,
            end: text.len(),
            terms: &terms,
        };

        let mut out = Buffer::no_color();
        print_fragment(&mut out, Path::new("a.txt"), &fragment, true).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "1:aé€ bar x\n");
    }
}
