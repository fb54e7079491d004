//! Reversible placeholder substitution
//!
//! External formatters mangle full-width punctuation and stop at semicolons.
//! `protect` swaps the offenders for ASCII tokens outside quoted strings;
//! `restore` swaps them back, tolerant of whatever case the formatter left.

use regex::Regex;

/// Character -> token table. `/` must come after `／` so the full-width form
/// is not matched as two replacements.
pub const TOKENS: &[(&str, &str)] = &[
    ("\u{ff0f}", "__FW_SLASH__"),
    ("/", "__SLASH__"),
    ("\u{ff0e}", "__FW_DOT__"),
    ("\u{3002}", "__JP_DOT__"),
    ("\u{ff0c}", "__FW_COMMA__"),
    ("\u{ff5e}", "__FW_WAVE__"),
    ("\u{301c}", "__WAVE__"),
];

/// Semicolon placeholder, shaped as a comment so SQL tooling ignores it
pub const SEMICOLON_TOKEN: &str = "/*__SC__*/";

lazy_static::lazy_static! {
    // '' is the quote escape inside Access string literals
    static ref SQL_STRING: Regex = Regex::new(r"'(?:''|[^'])*'").unwrap();
    static ref SEMICOLON_RESTORE: Regex = Regex::new(r"(?i)/\*\s*__SC__\s*\*/").unwrap();
    static ref TOKEN_RESTORES: Vec<(Regex, &'static str)> = TOKENS
        .iter()
        .map(|(ch, token)| {
            let re = Regex::new(&format!("(?i){}", regex::escape(token))).unwrap();
            (re, *ch)
        })
        .collect();
}

/// Apply `f` to every span outside single-quoted string literals
fn map_outside_strings<F>(sql: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for m in SQL_STRING.find_iter(sql) {
        out.push_str(&f(&sql[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&f(&sql[last..]));
    out
}

/// Swap formatter-hostile characters for tokens, leaving string literals and
/// the terminal semicolon untouched.
pub fn protect(sql: &str) -> String {
    let replaced = map_outside_strings(sql, |span| {
        let mut s = span.to_string();
        // Characters first: the semicolon token itself contains slashes
        for (ch, token) in TOKENS {
            s = s.replace(ch, token);
        }
        s.replace(';', SEMICOLON_TOKEN)
    });
    restore_terminal_semicolon(replaced)
}

fn restore_terminal_semicolon(s: String) -> String {
    let trimmed_len = s.trim_end().len();
    if let Some(head) = s[..trimmed_len].strip_suffix(SEMICOLON_TOKEN) {
        let tail = &s[trimmed_len..];
        return format!("{};{}", head, tail);
    }
    s
}

/// Invert `protect`. Token matching is case-insensitive because formatters
/// may re-case the text around them.
pub fn restore(sql: &str) -> String {
    let mut s = SEMICOLON_RESTORE.replace_all(sql, ";").into_owned();
    for (re, ch) in TOKEN_RESTORES.iter() {
        s = re.replace_all(&s, *ch).into_owned();
    }
    s
}
