use unicode_normalization::UnicodeNormalization;

const KATAKANA_START: u32 = 0x30A1; // ァ
const KATAKANA_END: u32 = 0x30F6; // ヶ
const KANA_OFFSET: u32 = 0x60;

/// Canonical search key for a food name or query token.
///
/// NFKC (folds half-width katakana and full-width latin), lowercase, NFKC
/// again, kanji replaced by their hiragana reading, katakana to hiragana,
/// whitespace runs collapsed to one space, trimmed.
#[must_use]
pub fn normalize_name(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    // Lowercasing can leave combining marks out of canonical order
    let composed: String = lowered.nfkc().collect();
    let read = kanji_to_hiragana(&composed);
    let folded: String = read.chars().map(katakana_to_hiragana).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_kanji(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3005}' // 々
    )
}

fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}')
}

/// Replace each kanji run (with its trailing okurigana) by its reading.
/// Everything else is copied through untouched.
fn kanji_to_hiragana(text: &str) -> String {
    if !text.chars().any(is_kanji) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() * 2);
    let mut segment = String::new();
    let mut in_kanji = false;
    for c in text.chars() {
        if is_kanji(c) {
            if !in_kanji && !segment.is_empty() {
                out.push_str(&kakasi::convert(&segment).hiragana);
                segment.clear();
            }
            in_kanji = true;
            segment.push(c);
        } else if !segment.is_empty() && is_hiragana(c) {
            in_kanji = false;
            segment.push(c);
        } else {
            if !segment.is_empty() {
                out.push_str(&kakasi::convert(&segment).hiragana);
                segment.clear();
            }
            in_kanji = false;
            out.push(c);
        }
    }
    if !segment.is_empty() {
        out.push_str(&kakasi::convert(&segment).hiragana);
    }
    out
}

/// [`normalize_name`] for cells that may be absent; absent text maps to "".
#[must_use]
pub fn normalize_field(text: Option<&str>) -> String {
    text.map(normalize_name).unwrap_or_default()
}

fn katakana_to_hiragana(c: char) -> char {
    let code = c as u32;
    let mapped = match code {
        KATAKANA_START..=KATAKANA_END => code - KANA_OFFSET,
        // ヽ ヾ iteration marks
        0x30FD | 0x30FE => code - KANA_OFFSET,
        _ => return c,
    };
    char::from_u32(mapped).unwrap_or(c)
}

/// Split a raw query on ASCII and ideographic spaces and normalize each
/// token, dropping tokens that normalize to nothing.
#[must_use]
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .replace('\u{3000}', " ")
        .split_whitespace()
        .map(normalize_name)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Header comparison key: NFKC with every whitespace character removed, so
/// padded headers like "カ ル シ ウ ム" match "カルシウム".
#[must_use]
pub fn header_key(header: &str) -> String {
    header.nfkc().filter(|c| !c.is_whitespace()).collect()
}
