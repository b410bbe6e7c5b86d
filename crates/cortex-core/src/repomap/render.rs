//! Byte-budgeted plain-text rendering of ranked files.

use crate::guards::clamp_text_budget;
use crate::models::RankingEntry;

fn render_entry(entry: &RankingEntry) -> String {
    let mut chunk = format!("{} ({:.3})\n", entry.path, entry.score);
    for symbol in &entry.symbols {
        chunk.push_str("  - ");
        chunk.push_str(symbol);
        chunk.push('\n');
    }
    chunk
}

fn truncation_note(shown: usize, total: usize, budget: usize) -> String {
    format!("... (truncated, showing {shown}/{total} files within {budget} bytes)\n")
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a
/// UTF-8 sequence.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Render entries in order until the next one would overflow the budget,
/// then append a truncation note, dropping accepted entries from the tail
/// until the note fits.
pub fn render_text(ranking: &[RankingEntry], max_text_bytes: usize) -> String {
    if ranking.is_empty() {
        return String::new();
    }
    let budget = clamp_text_budget(max_text_bytes);
    let total = ranking.len();
    let mut chunks: Vec<String> = Vec::new();
    let mut used = 0;
    let mut truncated = false;

    for entry in ranking {
        let chunk = render_entry(entry);
        if used + chunk.len() > budget {
            truncated = true;
            break;
        }
        used += chunk.len();
        chunks.push(chunk);
    }

    if truncated {
        let mut note = truncation_note(chunks.len(), total, budget);
        while used + note.len() > budget {
            let Some(removed) = chunks.pop() else {
                break;
            };
            used -= removed.len();
            note = truncation_note(chunks.len(), total, budget);
        }
        if used + note.len() > budget {
            return truncate_utf8(&note, budget).to_string();
        }
        chunks.push(note);
    }
    chunks.concat()
}
