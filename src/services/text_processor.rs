// Text Processing Service
// Normalizes raw user text before lexical matching

use regex::Regex;
use std::sync::OnceLock;

/// Character substitutions used to undo common leetspeak obfuscation.
const OBFUSCATION_MAP: [(char, char); 9] = [
    ('@', 'a'),
    ('3', 'e'),
    ('1', 'i'),
    ('0', 'o'),
    ('5', 's'),
    ('$', 's'),
    ('4', 'a'),
    ('7', 't'),
    ('+', 't'),
];

/// Cyrillic, Greek and Latin look-alikes of ASCII letters, matched after lowercasing.
const HOMOGLYPH_MAP: [(char, char); 32] = [
    ('а', 'a'), ('α', 'a'), ('ɑ', 'a'),
    ('ь', 'b'), ('β', 'b'),
    ('с', 'c'),
    ('е', 'e'), ('ε', 'e'),
    ('һ', 'h'),
    ('і', 'i'), ('ι', 'i'), ('ı', 'i'),
    ('κ', 'k'),
    ('м', 'm'), ('μ', 'm'),
    ('η', 'n'),
    ('о', 'o'), ('ο', 'o'),
    ('р', 'p'), ('ρ', 'p'),
    ('г', 'r'), ('γ', 'r'),
    ('ѕ', 's'), ('ς', 's'),
    ('т', 't'), ('τ', 't'),
    ('υ', 'u'),
    ('х', 'x'), ('χ', 'x'),
    ('у', 'y'),
    ('ј', 'j'),
    ('ԁ', 'd'),
];

/// Longest run of one repeated character kept in a token.
const MAX_REPEAT: usize = 2;

/// Consecutive single-letter tokens needed before they are read as one word.
const MIN_SPACED_LETTERS: usize = 3;

// Underscore is a word character for `\w` but a separator here.
fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]|_").expect("punctuation regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn lookup(map: &[(char, char)], ch: char) -> Option<char> {
    map.iter().find(|(from, _)| *from == ch).map(|(_, to)| *to)
}

fn deobfuscate_char(ch: char) -> char {
    // Fullwidth forms sit at a fixed offset from ASCII.
    if ('\u{FF41}'..='\u{FF5A}').contains(&ch) || ('\u{FF10}'..='\u{FF19}').contains(&ch) {
        if let Some(ascii) = char::from_u32(ch as u32 - 0xFEE0) {
            return deobfuscate_char(ascii);
        }
    }
    lookup(&OBFUSCATION_MAP, ch)
        .or_else(|| lookup(&HOMOGLYPH_MAP, ch))
        .unwrap_or(ch)
}

/// Cap runs of one character at `MAX_REPEAT` ("stuuuupid" -> "stuupid").
fn squeeze_repeats(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut prev = None;
    let mut run = 0;
    for ch in token.chars() {
        if prev == Some(ch) {
            run += 1;
        } else {
            prev = Some(ch);
            run = 1;
        }
        if run <= MAX_REPEAT {
            out.push(ch);
        }
    }
    out
}

fn is_single_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

/// Rejoin words spelled out letter by letter ("s t u p i d" -> "stupid").
fn join_spaced_letters(tokens: Vec<String>) -> Vec<String> {
    let mut joined = Vec::with_capacity(tokens.len());
    let mut run: Vec<String> = Vec::new();

    let flush = |run: &mut Vec<String>, joined: &mut Vec<String>| {
        if run.len() >= MIN_SPACED_LETTERS {
            joined.push(run.concat());
        } else {
            joined.append(run);
        }
        run.clear();
    };

    for token in tokens {
        if is_single_letter(&token) {
            run.push(token);
        } else {
            flush(&mut run, &mut joined);
            joined.push(token);
        }
    }
    flush(&mut run, &mut joined);
    joined
}

/// Lowercase, undo character substitutions and look-alike letters, turn
/// punctuation into spaces, cap repeated characters and rejoin spelled-out
/// words. Empty or blank input yields an empty string.
pub fn normalize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lowered: String = text.to_lowercase().chars().map(deobfuscate_char).collect();
    let spaced = punctuation_re().replace_all(&lowered, " ");
    let tokens = whitespace_re()
        .split(spaced.trim())
        .filter(|t| !t.is_empty())
        .map(squeeze_repeats)
        .collect();
    join_spaced_letters(tokens).join(" ")
}

/// Collapse every run of a repeated character to one ("iidiot" -> "idiot").
pub fn fold_repeats(token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    chars.dedup();
    chars.into_iter().collect()
}

/// Whether any character is immediately repeated.
pub fn has_repeats(token: &str) -> bool {
    token.chars().zip(token.chars().skip(1)).any(|(a, b)| a == b)
}

/// Split already-normalized text into tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}

/// Whitespace-separated word count of the original text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max_chars` characters, never splitting a code point.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Short single-line preview for log output.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out = char_prefix(text, max_chars).to_string();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_deobfuscates() {
        assert_eq!(normalize_text("Y0u @re 5TUP1D!!!"), "you are stupid");
        assert_eq!(normalize_text("k1ll   y0u"), "kill you");
        assert_eq!(normalize_text("$p@m"), "spam");
        assert_eq!(normalize_text("7h+ea7"), "thteat");
    }

    #[test]
    fn test_normalize_maps_look_alike_letters() {
        assert_eq!(normalize_text("you ıdıot"), "you idiot");
        // Cyrillic с, а and р.
        assert_eq!(normalize_text("\u{0441}r\u{0430}\u{0440}"), "crap");
        assert_eq!(normalize_text("ＳＴＵＰＩＤ"), "stupid");
        assert_eq!(normalize_text("ｋ１ｌｌ"), "kill");
    }

    #[test]
    fn test_normalize_caps_repeated_characters() {
        assert_eq!(normalize_text("you iiiidiot"), "you iidiot");
        assert_eq!(normalize_text("sooooo stuuuupid"), "soo stuupid");
        assert_eq!(normalize_text("worthlesss"), "worthless");
        assert_eq!(normalize_text("I will kill you"), "i will kill you");
    }

    #[test]
    fn test_normalize_joins_spaced_letters() {
        assert_eq!(normalize_text("you are s t u p i d"), "you are stupid");
        assert_eq!(normalize_text("s.t.u.p.i.d"), "stupid");
        assert_eq!(normalize_text("s_t_u_p_i_d loser"), "stupid loser");
        // Short runs stay as they are.
        assert_eq!(normalize_text("a b or c"), "a b or c");
        assert_eq!(normalize_text("i a m fine"), "iam fine");
    }

    #[test]
    fn test_fold_repeats() {
        assert_eq!(fold_repeats("iidiot"), "idiot");
        assert_eq!(fold_repeats("kill"), "kil");
        assert!(has_repeats("kiill"));
        assert!(!has_repeats("idiot"));
        assert!(!has_repeats(""));
    }

    #[test]
    fn test_normalize_collapses_punctuation() {
        assert_eq!(normalize_text("hello, there... how are you?"), "hello there how are you");
        assert_eq!(normalize_text("don't"), "don t");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\t "), "");
        assert_eq!(normalize_text("?!"), "");
    }

    #[test]
    fn test_tokenize_and_word_count() {
        assert_eq!(tokenize("you are stupid"), vec!["you", "are", "stupid"]);
        assert!(tokenize("").is_empty());
        assert_eq!(word_count("I will  kill you"), 4);
    }

    #[test]
    fn test_char_prefix_respects_boundaries() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("hi", 10), "hi");
        assert_eq!(preview("line one\nline two", 8), "line one...");
    }
}
