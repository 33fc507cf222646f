//! Phonetic encoders for the `phonetic_code` transform
//!
//! All encoders work on a transliterated A-Z view of the input: NFKD
//! decomposition, combining marks stripped, uppercased (which expands
//! `ß` to `SS`), everything else dropped. Letters without a code (like
//! `H` in Cologne Phonetics) still participate in positional context.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use pprl_model::PhoneticCodeAlgorithm;

/// Encode `value` under the given scheme. Values that transliterate to
/// nothing yield the empty code.
pub fn encode(algorithm: PhoneticCodeAlgorithm, value: &str) -> String {
    let word = transliterate(value);

    match algorithm {
        PhoneticCodeAlgorithm::Soundex => soundex(&word),
        PhoneticCodeAlgorithm::Metaphone => metaphone(&word),
        PhoneticCodeAlgorithm::RefinedSoundex => refined_soundex(&word),
        PhoneticCodeAlgorithm::Cologne => cologne(&word),
    }
}

/// Reduce a value to uppercase ASCII letters.
fn transliterate(value: &str) -> Vec<char> {
    value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_uppercase)
        .collect()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

/// American Soundex: first letter plus three digits. `H` and `W` are
/// transparent between same-coded consonants; vowels reset the run.
fn soundex(word: &[char]) -> String {
    fn code(c: char) -> u8 {
        match c {
            'B' | 'F' | 'P' | 'V' => b'1',
            'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => b'2',
            'D' | 'T' => b'3',
            'L' => b'4',
            'M' | 'N' => b'5',
            'R' => b'6',
            _ => 0,
        }
    }

    let Some(&first) = word.first() else {
        return String::new();
    };

    let mut out = String::from(first);
    let mut prev = code(first);

    for &c in &word[1..] {
        if matches!(c, 'H' | 'W') {
            continue;
        }

        let current = code(c);
        if current == 0 {
            prev = 0;
            continue;
        }

        if current != prev {
            out.push(current as char);
            if out.len() == 4 {
                break;
            }
        }
        prev = current;
    }

    while out.len() < 4 {
        out.push('0');
    }

    out
}

/// Refined Soundex: first letter plus a digit for every letter (vowels
/// code to 0), adjacent duplicate codes collapsed, no length limit.
fn refined_soundex(word: &[char]) -> String {
    fn code(c: char) -> char {
        match c {
            'B' | 'P' => '1',
            'F' | 'V' => '2',
            'C' | 'K' | 'S' => '3',
            'G' | 'J' => '4',
            'Q' | 'X' | 'Z' => '5',
            'D' | 'T' => '6',
            'L' => '7',
            'M' | 'N' => '8',
            'R' => '9',
            _ => '0',
        }
    }

    let Some(&first) = word.first() else {
        return String::new();
    };

    let mut out = String::from(first);
    let mut prev = None;

    for &c in word {
        let current = code(c);
        if prev != Some(current) {
            out.push(current);
        }
        prev = Some(current);
    }

    out
}

/// Classic Metaphone. Letters are examined in place with their left and
/// right context; digraph partners (`CH`, `PH`, `TH`, `GH`, ...) emit at
/// the first letter and silence the second.
fn metaphone(word: &[char]) -> String {
    if word.is_empty() {
        return String::new();
    }

    // Initial-letter exceptions.
    let word: &[char] = match word {
        ['A', 'E', ..] | ['G', 'N', ..] | ['K', 'N', ..] | ['P', 'N', ..] | ['W', 'R', ..] => {
            &word[1..]
        }
        ['W', 'H', rest @ ..] => {
            let mut replaced = vec!['W'];
            replaced.extend_from_slice(rest);
            return metaphone_inner(&replaced);
        }
        ['X', rest @ ..] => {
            let mut replaced = vec!['S'];
            replaced.extend_from_slice(rest);
            return metaphone_inner(&replaced);
        }
        _ => word,
    };

    metaphone_inner(word)
}

fn metaphone_inner(word: &[char]) -> String {
    let mut out = String::new();
    let n = word.len();

    let at = |i: usize| word.get(i).copied();
    let vowel_at = |i: usize| at(i).is_some_and(is_vowel);

    for i in 0..n {
        let c = word[i];
        let prev = if i > 0 { at(i - 1) } else { None };
        let next = at(i + 1);

        // Adjacent duplicates collapse, except C.
        if prev == Some(c) && c != 'C' {
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == 0 {
                    out.push(c);
                }
            }
            'B' => {
                let silent = i == n - 1 && prev == Some('M');
                if !silent {
                    out.push('B');
                }
            }
            'C' => {
                if prev == Some('S') && matches!(next, Some('I' | 'E' | 'Y')) {
                    // SCI / SCE / SCY
                } else if next == Some('I') && at(i + 2) == Some('A') {
                    out.push('X');
                } else if next == Some('H') {
                    out.push(if prev == Some('S') { 'K' } else { 'X' });
                } else if matches!(next, Some('I' | 'E' | 'Y')) {
                    out.push('S');
                } else {
                    out.push('K');
                }
            }
            'D' => {
                if next == Some('G') && matches!(at(i + 2), Some('E' | 'I' | 'Y')) {
                    out.push('J');
                } else {
                    out.push('T');
                }
            }
            'F' | 'J' | 'L' | 'M' | 'N' | 'R' => out.push(c),
            'G' => {
                if prev == Some('D') {
                    // DGE / DGI / DGY already emitted J at the D.
                } else if next == Some('H') {
                    if vowel_at(i + 2) {
                        out.push('K');
                    }
                } else if next == Some('N') {
                    // silent as in "sign"
                } else if matches!(next, Some('I' | 'E' | 'Y')) {
                    out.push('J');
                } else {
                    out.push('K');
                }
            }
            'H' => {
                let digraph_partner = matches!(prev, Some('C' | 'S' | 'P' | 'T' | 'G'));
                let silent_after_vowel = prev.is_some_and(is_vowel) && !vowel_at(i + 1);
                if !digraph_partner && !silent_after_vowel {
                    out.push('H');
                }
            }
            'K' => {
                if prev != Some('C') {
                    out.push('K');
                }
            }
            'P' => out.push(if next == Some('H') { 'F' } else { 'P' }),
            'Q' => out.push('K'),
            'S' => {
                if next == Some('H')
                    || (next == Some('I') && matches!(at(i + 2), Some('O' | 'A')))
                {
                    out.push('X');
                } else {
                    out.push('S');
                }
            }
            'T' => {
                if next == Some('C') && at(i + 2) == Some('H') {
                    // silent in -TCH-
                } else if next == Some('H') {
                    out.push('0');
                } else if next == Some('I') && matches!(at(i + 2), Some('O' | 'A')) {
                    out.push('X');
                } else {
                    out.push('T');
                }
            }
            'V' => out.push('F'),
            'W' => {
                if vowel_at(i + 1) {
                    out.push('W');
                }
            }
            'X' => out.push_str("KS"),
            'Y' => {
                if vowel_at(i + 1) {
                    out.push('Y');
                }
            }
            'Z' => out.push('S'),
            _ => {}
        }
    }

    out
}

/// Kölner Phonetik, tailored to German names. Letter groups map to
/// digits with positional rules (left context, and right context for
/// C, D, T, P and X), consecutive duplicates collapse, and zeros are
/// stripped everywhere but the leading position.
fn cologne(word: &[char]) -> String {
    const PAD: char = '#';

    let mut raw = String::new();

    for i in 0..word.len() {
        let prev = if i > 0 { word[i - 1] } else { PAD };
        let this = word[i];
        let next = *word.get(i + 1).unwrap_or(&PAD);

        match this {
            'A' | 'E' | 'I' | 'J' | 'O' | 'U' | 'Y' => raw.push('0'),
            'B' => raw.push('1'),
            'P' => raw.push(if next == 'H' { '3' } else { '1' }),
            'D' | 'T' => raw.push(if matches!(next, 'C' | 'S' | 'Z') { '8' } else { '2' }),
            'F' | 'V' | 'W' => raw.push('3'),
            'G' | 'K' | 'Q' => raw.push('4'),
            'C' => {
                let code = if i == 0 {
                    if matches!(next, 'A' | 'H' | 'K' | 'L' | 'O' | 'Q' | 'R' | 'U' | 'X') {
                        '4'
                    } else {
                        '8'
                    }
                } else if matches!(prev, 'S' | 'Z') {
                    '8'
                } else if matches!(next, 'A' | 'H' | 'K' | 'O' | 'Q' | 'U' | 'X') {
                    '4'
                } else {
                    '8'
                };
                raw.push(code);
            }
            'X' => {
                if matches!(prev, 'C' | 'K' | 'Q') {
                    raw.push('8');
                } else {
                    raw.push_str("48");
                }
            }
            'L' => raw.push('5'),
            'M' | 'N' => raw.push('6'),
            'R' => raw.push('7'),
            'S' | 'Z' => raw.push('8'),
            _ => {}
        }
    }

    if raw.is_empty() {
        return raw;
    }

    let mut code = String::new();
    let mut last = None;
    for c in raw.chars() {
        if last != Some(c) {
            code.push(c);
        }
        last = Some(c);
    }

    let mut chars = code.chars();
    let head = chars.next().expect("collapsed code is non-empty");
    let tail: String = chars.filter(|&c| c != '0').collect();

    format!("{head}{tail}")
}
