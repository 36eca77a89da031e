//! Console chat loop.

use std::io::{self, BufRead, Write};

/// Words that end the session (case-insensitive).
const QUIT_WORDS: [&str; 2] = ["quit", "exit"];

fn is_quit(line: &str) -> bool {
    QUIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// Read queries from `input` until EOF or a quit word, printing each reply as
/// `<name>: <reply>`. Blank lines are skipped without calling `respond`.
///
/// Returns the number of queries answered.
pub fn chat_loop<R, W, F>(input: R, out: &mut W, name: &str, mut respond: F) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> String,
{
    let mut answered = 0usize;
    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                writeln!(out)?;
                break;
            }
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_quit(query) {
            break;
        }

        let reply = respond(query);
        writeln!(out, "{}: {}\n", name, reply)?;
        answered = answered.saturating_add(1);
    }
    Ok(answered)
}
