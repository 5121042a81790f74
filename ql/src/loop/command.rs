//! Command cleanup between DECIDE and ACT

/// Characters removed from a decided command, straight and typographic
const QUOTES: [char; 7] = ['"', '\'', '`', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];

/// Strip quote characters and surrounding whitespace; fall back to `idle`
/// when nothing usable is left
pub fn sanitize_command(raw: &str, idle: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !QUOTES.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        idle.trim().to_string()
    } else {
        cleaned.to_string()
    }
}

/// Case-insensitive match against the termination keywords
pub fn is_quit_command(command: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| k.trim().eq_ignore_ascii_case(command.trim()))
}
