//! LaTeX escaping of field values.
//!
//! Stored values keep Unicode for accented letters; rendering turns them
//! back into brace-protected accent commands (`é` ↔ `{\'e}`). Brace groups
//! and any other TeX are passed through untouched in both directions.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Accent commands: (command, base letter, composed character)
const ACCENTS: &[(char, char, char)] = &[
    ('\'', 'a', 'á'), ('\'', 'e', 'é'), ('\'', 'i', 'í'), ('\'', 'o', 'ó'), ('\'', 'u', 'ú'),
    ('\'', 'y', 'ý'), ('\'', 'A', 'Á'), ('\'', 'E', 'É'), ('\'', 'I', 'Í'), ('\'', 'O', 'Ó'),
    ('\'', 'U', 'Ú'), ('\'', 'Y', 'Ý'), ('\'', 'c', 'ć'), ('\'', 'n', 'ń'), ('\'', 's', 'ś'),
    ('\'', 'z', 'ź'), ('\'', 'C', 'Ć'), ('\'', 'N', 'Ń'), ('\'', 'S', 'Ś'), ('\'', 'Z', 'Ź'),
    ('`', 'a', 'à'), ('`', 'e', 'è'), ('`', 'i', 'ì'), ('`', 'o', 'ò'), ('`', 'u', 'ù'),
    ('`', 'A', 'À'), ('`', 'E', 'È'), ('`', 'I', 'Ì'), ('`', 'O', 'Ò'), ('`', 'U', 'Ù'),
    ('^', 'a', 'â'), ('^', 'e', 'ê'), ('^', 'i', 'î'), ('^', 'o', 'ô'), ('^', 'u', 'û'),
    ('^', 'A', 'Â'), ('^', 'E', 'Ê'), ('^', 'I', 'Î'), ('^', 'O', 'Ô'), ('^', 'U', 'Û'),
    ('"', 'a', 'ä'), ('"', 'e', 'ë'), ('"', 'i', 'ï'), ('"', 'o', 'ö'), ('"', 'u', 'ü'),
    ('"', 'y', 'ÿ'), ('"', 'A', 'Ä'), ('"', 'E', 'Ë'), ('"', 'I', 'Ï'), ('"', 'O', 'Ö'),
    ('"', 'U', 'Ü'), ('"', 'Y', 'Ÿ'),
    ('~', 'a', 'ã'), ('~', 'n', 'ñ'), ('~', 'o', 'õ'), ('~', 'A', 'Ã'), ('~', 'N', 'Ñ'),
    ('~', 'O', 'Õ'),
    ('=', 'a', 'ā'), ('=', 'e', 'ē'), ('=', 'i', 'ī'), ('=', 'o', 'ō'), ('=', 'u', 'ū'),
    ('.', 'z', 'ż'), ('.', 'Z', 'Ż'), ('.', 'I', 'İ'),
    ('c', 'c', 'ç'), ('c', 'C', 'Ç'), ('c', 's', 'ş'), ('c', 'S', 'Ş'),
    ('v', 'c', 'č'), ('v', 's', 'š'), ('v', 'z', 'ž'), ('v', 'r', 'ř'), ('v', 'e', 'ě'),
    ('v', 'n', 'ň'), ('v', 'C', 'Č'), ('v', 'S', 'Š'), ('v', 'Z', 'Ž'), ('v', 'R', 'Ř'),
    ('v', 'E', 'Ě'), ('v', 'N', 'Ň'),
    ('u', 'a', 'ă'), ('u', 'g', 'ğ'), ('u', 'A', 'Ă'), ('u', 'G', 'Ğ'),
    ('H', 'o', 'ő'), ('H', 'u', 'ű'), ('H', 'O', 'Ő'), ('H', 'U', 'Ű'),
    ('k', 'a', 'ą'), ('k', 'e', 'ę'), ('k', 'A', 'Ą'), ('k', 'E', 'Ę'),
    ('r', 'a', 'å'), ('r', 'A', 'Å'),
];

/// Letter commands without an argument
const SPECIAL_LETTERS: &[(&str, char)] = &[
    ("ss", 'ß'), ("o", 'ø'), ("O", 'Ø'), ("ae", 'æ'), ("AE", 'Æ'), ("oe", 'œ'),
    ("OE", 'Œ'), ("aa", 'å'), ("AA", 'Å'), ("l", 'ł'), ("L", 'Ł'), ("i", 'ı'), ("j", 'ȷ'),
];

/// Command for a literal backslash, always written as `{\textbackslash}`
const TEXT_BACKSLASH: &str = "textbackslash";

/// Accent commands spelled with a letter (`\c{c}`), which need `{}` or a space
fn is_letter_accent(cmd: char) -> bool {
    cmd.is_ascii_alphabetic()
}

fn encode_table() -> &'static HashMap<char, String> {
    static TABLE: OnceLock<HashMap<char, String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for (name, ch) in SPECIAL_LETTERS {
            table.entry(*ch).or_insert_with(|| format!("{{\\{name}}}"));
        }
        for (cmd, base, ch) in ACCENTS {
            let command = if is_letter_accent(*cmd) {
                format!("{{\\{cmd}{{{base}}}}}")
            } else {
                format!("{{\\{cmd}{base}}}")
            };
            table.entry(*ch).or_insert(command);
        }
        table
    })
}

fn compose(cmd: char, base: char) -> Option<char> {
    ACCENTS
        .iter()
        .find(|(c, b, _)| *c == cmd && *b == base)
        .map(|(_, _, ch)| *ch)
}

/// Escape a stored value for output inside a braced BibTeX field
pub fn encode(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let unbalanced = unbalanced_braces(&chars);
    let table = encode_table();

    let mut out = String::with_capacity(value.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '\\' if !is_plain_backslash(&chars, i) => {
                out.push_str("{\\");
                out.push_str(TEXT_BACKSLASH);
                out.push('}');
            }
            '{' | '}' if unbalanced.contains(&i) => {
                out.push('\\');
                out.push(ch);
            }
            '&' => out.push_str("\\&"),
            _ => match table.get(&ch) {
                Some(command) => out.push_str(command),
                None => out.push(ch),
            },
        }
    }
    out
}

/// A backslash that [`decode`] reads back unchanged
///
/// It must start no known command and be followed by an ASCII character
/// that `encode` writes as is and `decode` does not treat as escaped.
fn is_plain_backslash(chars: &[char], i: usize) -> bool {
    match chars.get(i + 1) {
        Some(next) if next.is_ascii() && !matches!(next, '{' | '}' | '&' | '\\') => {
            parse_command(chars, i).is_none()
        }
        _ => false,
    }
}

/// Positions of braces that have no partner
fn unbalanced_braces(chars: &[char]) -> Vec<usize> {
    let mut open: Vec<usize> = Vec::new();
    let mut unmatched: Vec<usize> = Vec::new();
    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '{' => open.push(i),
            '}' => {
                if open.pop().is_none() {
                    unmatched.push(i);
                }
            }
            _ => {}
        }
    }
    unmatched.extend(open);
    unmatched
}

/// Turn LaTeX accent commands, `\textbackslash` and the escapes `\&`,
/// `\{` and `\}` into plain characters
pub fn decode(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        // `{\'e}`: accent wrapped in its own group
        if chars[i] == '{' && chars.get(i + 1) == Some(&'\\') {
            if let Some((ch, len)) = parse_command(&chars, i + 1) {
                if chars.get(i + 1 + len) == Some(&'}') {
                    out.push(ch);
                    i += len + 2;
                    continue;
                }
            }
        }

        if chars[i] == '\\' {
            if let Some(&escaped @ ('&' | '{' | '}')) = chars.get(i + 1) {
                out.push(escaped);
                i += 2;
                continue;
            }
            if let Some((ch, len)) = parse_command(&chars, i) {
                out.push(ch);
                i += len;
                continue;
            }
        }

        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Parse an accent or special-letter command starting at the backslash
///
/// Returns the character and the number of chars consumed.
fn parse_command(chars: &[char], start: usize) -> Option<(char, usize)> {
    let cmd = *chars.get(start + 1)?;

    if let Some(found) = parse_special_letter(chars, start) {
        return Some(found);
    }

    let letter_accent = is_letter_accent(cmd);
    if letter_accent && !ACCENTS.iter().any(|(c, _, _)| *c == cmd) {
        return None;
    }

    let mut pos = start + 2;
    let (base, arg_len) = match chars.get(pos)? {
        '{' => {
            let (base, len) = parse_base(chars, pos + 1)?;
            if chars.get(pos + 1 + len) != Some(&'}') {
                return None;
            }
            (base, len + 2)
        }
        ' ' if letter_accent => {
            pos += 1;
            let (base, len) = parse_base(chars, pos)?;
            (base, len + 1)
        }
        _ if letter_accent => return None,
        _ => parse_base(chars, pos)?,
    };

    let composed = compose(cmd, base)?;
    Some((composed, 2 + arg_len))
}

/// A base letter, allowing dotless `\i` / `\j`
fn parse_base(chars: &[char], pos: usize) -> Option<(char, usize)> {
    match chars.get(pos)? {
        '\\' => match chars.get(pos + 1)? {
            'i' | 'j' if !chars.get(pos + 2).is_some_and(|c| c.is_ascii_alphabetic()) => {
                Some((chars[pos + 1], 2))
            }
            _ => None,
        },
        c if c.is_ascii_alphabetic() => Some((*c, 1)),
        _ => None,
    }
}

fn parse_special_letter(chars: &[char], start: usize) -> Option<(char, usize)> {
    let name: String = chars[start + 1..]
        .iter()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let ch = if name == TEXT_BACKSLASH {
        '\\'
    } else {
        SPECIAL_LETTERS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ch)| *ch)?
    };

    let end = start + 1 + name.len();
    // a trailing `{}` or a single space terminates the command name
    let extra = match (chars.get(end), chars.get(end + 1)) {
        (Some('{'), Some('}')) => 2,
        (Some(' '), _) => 1,
        _ => 0,
    };
    Some((ch, 1 + name.len() + extra))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_accents() {
        assert_eq!(encode("Gödel"), "G{\\\"o}del");
        assert_eq!(encode("Erdős"), "Erd{\\H{o}}s");
        assert_eq!(encode("Straße"), "Stra{\\ss}e");
        assert_eq!(encode("Françoise"), "Fran{\\c{c}}oise");
    }

    #[test]
    fn test_encode_ampersand_and_braces() {
        assert_eq!(encode("Proofs & Types"), "Proofs \\& Types");
        assert_eq!(encode("The {DNA} story"), "The {DNA} story");
        assert_eq!(encode("a}b{c"), "a\\}b\\{c");
        assert_eq!(encode("Set {x | x > 0"), "Set \\{x | x > 0");
        assert_eq!(encode("Q\\&A"), "Q{\\textbackslash}\\&A");
    }

    #[test]
    fn test_encode_backslashes() {
        assert_eq!(encode("C:\\"), "C:{\\textbackslash}");
        assert_eq!(encode("\\"), "{\\textbackslash}");
        assert_eq!(encode("$\\lambda$"), "$\\lambda$");
        assert_eq!(encode("a\\{b}"), "a{\\textbackslash}{b}");
        assert_eq!(encode("\\'e"), "{\\textbackslash}'e");
    }

    #[test]
    fn test_decode_escaped_braces_and_backslash() {
        assert_eq!(decode("Set \\{x | x > 0"), "Set {x | x > 0");
        assert_eq!(decode("a\\}b"), "a}b");
        assert_eq!(decode("C:{\\textbackslash}"), "C:\\");
        assert_eq!(decode("C:\\textbackslash{}x"), "C:\\x");
    }

    #[test]
    fn test_encode_leaves_other_scripts() {
        assert_eq!(encode("数学 λ"), "数学 λ");
    }

    #[test]
    fn test_decode_forms() {
        assert_eq!(decode("G{\\\"o}del"), "Gödel");
        assert_eq!(decode("G\\\"odel"), "Gödel");
        assert_eq!(decode("G\\\"{o}del"), "Gödel");
        assert_eq!(decode("G{\\\"{o}}del"), "Gödel");
        assert_eq!(decode("Fran\\c{c}oise"), "Françoise");
        assert_eq!(decode("Fran\\c coise"), "Françoise");
        assert_eq!(decode("Stra\\ss{}e"), "Straße");
        assert_eq!(decode("Stra{\\ss}e"), "Straße");
        assert_eq!(decode("Mart\\'{\\i}n"), "Martín");
        assert_eq!(decode("A \\& B"), "A & B");
    }

    #[test]
    fn test_decode_keeps_other_tex() {
        assert_eq!(decode("The {DNA} of $\\lambda$"), "The {DNA} of $\\lambda$");
        assert_eq!(decode("\\cite{x} \\emph{y}"), "\\cite{x} \\emph{y}");
        assert_eq!(decode("\\'{}"), "\\'{}");
    }

    #[test]
    fn test_round_trip() {
        for text in [
            "Gödel, Escher, Bach",
            "Łukasiewicz & Čech",
            "Øystein Ore's {GRAPHS}",
            "naïve façade — déjà vu",
            "Plain ASCII title",
            "Set {x | x > 0",
            "}{ inverted",
            "C:\\",
            "path\\to\\{file",
            "\\'e is not \\ss",
            "\\\\ twice",
            "\\& \\{ \\}",
            "already {\\'e}",
        ] {
            assert_eq!(decode(&encode(text)), text, "{text}");
        }
    }
}
