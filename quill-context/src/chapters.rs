use quill_doc::Rope;

/// Matches `^#{1,3}\s`: one to three ATX heading hashes followed by
/// whitespace. Four or more hashes is not a chapter marker: greedily
/// trying 3, 2, then 1 hash always leaves another `#` where whitespace
/// is required.
fn is_atx_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=3).contains(&hashes) && line.chars().nth(hashes).is_some_and(char::is_whitespace)
}

/// Matches `^第.+章`: starts with 第, has at least one character, then 章.
fn is_chinese_chapter_marker(line: &str) -> bool {
    let mut chars = line.chars();
    if chars.next() != Some('第') {
        return false;
    }
    let rest: String = chars.collect();
    rest.chars().count() >= 2 && rest.chars().skip(1).any(|c| c == '章')
}

/// Matches `^Chapter \d+`.
fn is_english_chapter_marker(line: &str) -> bool {
    line.strip_prefix("Chapter ")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

pub(crate) fn is_chapter_marker(line: &str) -> bool {
    is_atx_heading(line) || is_chinese_chapter_marker(line) || is_english_chapter_marker(line)
}

/// Finds the `[start, end)` char range (in the document's char indexing)
/// of the chapter containing `cursor`. Returns `None` if no chapter
/// marker precedes the cursor anywhere in the document, in which case the
/// caller should fall back to a fixed radius.
pub(crate) fn chapter_bounds(text: &Rope, cursor: usize) -> Option<(usize, usize)> {
    let cursor_line = text.char_to_line(cursor.min(text.len_chars()));

    let mut start_line = None;
    for line_idx in (0..=cursor_line).rev() {
        let line = text.line(line_idx);
        if is_chapter_marker(&line.to_string()) {
            start_line = Some(line_idx);
            break;
        }
    }
    let start_line = start_line?;

    let mut end_line = text.len_lines();
    for line_idx in (cursor_line + 1)..text.len_lines() {
        let line = text.line(line_idx);
        if is_chapter_marker(&line.to_string()) {
            end_line = line_idx;
            break;
        }
    }

    let start = text.line_to_char(start_line);
    let end = text.line_to_char(end_line.min(text.len_lines()));
    Some((start, end))
}
