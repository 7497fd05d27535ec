//! `--exec` command templates

use chrono::SecondsFormat;

use crate::action::ActionError;
use crate::version::types::Release;

/// Substitute release fields into `template`:
/// `%p` name, `%s` spec, `%t` ISO timestamp, `%v` version, `%%` a literal percent.
/// Any other `%` sequence is kept as written.
pub fn interpolate(template: &str, release: &Release) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let replacement = match chars.peek() {
            Some('p') => release.name.clone(),
            Some('s') => release.spec.clone(),
            Some('t') => release.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            Some('v') => release.version.clone(),
            Some('%') => "%".to_string(),
            _ => {
                out.push('%');
                continue;
            }
        };
        chars.next();
        out.push_str(&replacement);
    }

    out
}

/// Split a command line into words the way a POSIX shell would, without expansions
pub fn split_args(line: &str) -> Result<Vec<String>, ActionError> {
    let error = |reason: &str| ActionError::Template {
        template: line.to_string(),
        reason: reason.to_string(),
    };

    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(error("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => word.push(c),
                            Some('\n') => {}
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => return Err(error("unterminated double quote")),
                        },
                        Some(c) => word.push(c),
                        None => return Err(error("unterminated double quote")),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(c) => {
                    in_word = true;
                    word.push(c);
                }
                None => return Err(error("trailing backslash")),
            },
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }

    Ok(words)
}

/// Tokenize `template`, then interpolate each word, so substituted values never split
pub fn exec_command(template: &str, release: &Release) -> Result<Vec<String>, ActionError> {
    let words = split_args(template)?;
    if words.is_empty() {
        return Err(ActionError::EmptyCommand);
    }
    Ok(words.iter().map(|word| interpolate(word, release)).collect())
}
