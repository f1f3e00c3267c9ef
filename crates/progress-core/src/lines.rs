//! The one line-splitting convention shared by reads, checkbox detection and
//! patches.
//!
//! Lines are delimited by `\n` only and each line keeps its terminator, so a
//! `\r\n` ending stays attached to its line and `join(split(s)) == s` for every
//! input. A line index always means an index into this split of the content
//! currently stored on disk.

/// Split `content` into lines, each including its trailing `\n` if present.
pub fn split(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Reassemble lines produced by [`split`].
pub fn join<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_ref().len()).sum());
    for line in lines {
        out.push_str(line.as_ref());
    }
    out
}

/// Separate a line from its terminator (`"\n"`, `"\r\n"` or `""`).
pub fn strip_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}
