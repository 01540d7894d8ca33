use ahash::{AHashMap, RandomState};
use scc::HashMap;
use std::sync::LazyLock;

/// Stem → surface forms that map to it without going through the rules.
const IRREGULAR_FORMS: &[(&str, &[&str])] = &[
    ("sky", &["sky", "skies"]),
    ("die", &["dying"]),
    ("lie", &["lying"]),
    ("tie", &["tying"]),
    ("news", &["news"]),
    ("inning", &["innings", "inning"]),
    ("outing", &["outings", "outing"]),
    ("canning", &["cannings", "canning"]),
    ("howe", &["howe"]),
    ("proceed", &["proceed"]),
    ("exceed", &["exceed"]),
    ("succeed", &["succeed"]),
];

const VOWELS: &[u8] = b"aeiou";

static SHARED: LazyLock<PorterStemmer> = LazyLock::new(PorterStemmer::new);

/// A suffix rewrite. The measure gate is evaluated on the word with
/// `suffix` removed.
struct Rule {
    suffix: &'static str,
    replacement: &'static str,
    /// When non-empty, the stem left after removing `suffix` must end in
    /// one of these letters for the rule to match at all.
    stem_ends_with: &'static [u8],
    /// Run the whole stage again on the rewritten word.
    redispatch: bool,
}

const fn rule(suffix: &'static str, replacement: &'static str) -> Rule {
    Rule {
        suffix,
        replacement,
        stem_ends_with: b"",
        redispatch: false,
    }
}

const fn rule_after(suffix: &'static str, replacement: &'static str, letters: &'static [u8]) -> Rule {
    Rule {
        suffix,
        replacement,
        stem_ends_with: letters,
        redispatch: false,
    }
}

// Rules are grouped by the penultimate letter of their suffix; a word
// can only ever match rules from one group.
const STEP2_RULES: &[Rule] = &[
    rule("ational", "ate"),
    rule("tional", "tion"),
    rule("enci", "ence"),
    rule("anci", "ance"),
    rule("izer", "ize"),
    rule("bli", "ble"),
    Rule {
        suffix: "alli",
        replacement: "al",
        stem_ends_with: b"",
        redispatch: true,
    },
    rule("fulli", "ful"),
    rule("entli", "ent"),
    rule("eli", "e"),
    rule("ousli", "ous"),
    rule("ization", "ize"),
    rule("ation", "ate"),
    rule("ator", "ate"),
    rule("alism", "al"),
    rule("iveness", "ive"),
    rule("fulness", "ful"),
    rule("ousness", "ous"),
    rule("aliti", "al"),
    rule("iviti", "ive"),
    rule("biliti", "ble"),
    // measured on the stem that still carries the `l`
    rule_after("ogi", "og", b"l"),
];

const STEP3_RULES: &[Rule] = &[
    rule("icate", "ic"),
    rule("ative", ""),
    rule("alize", "al"),
    rule("iciti", "ic"),
    rule("ical", "ic"),
    rule("ful", ""),
    rule("ness", ""),
];

const STEP4_RULES: &[Rule] = &[
    rule("al", ""),
    rule("ance", ""),
    rule("ence", ""),
    rule("er", ""),
    rule("ic", ""),
    rule("able", ""),
    rule("ible", ""),
    rule("ant", ""),
    rule("ement", ""),
    rule("ment", ""),
    rule("ent", ""),
    rule_after("ion", "", b"st"),
    rule("ou", ""),
    rule("ism", ""),
    rule("ate", ""),
    rule("iti", ""),
    rule("ous", ""),
    rule("ive", ""),
    rule("ize", ""),
];

#[derive(Debug, Clone)]
pub struct PorterStemmer {
    irregular: AHashMap<&'static str, &'static str>,
}

impl Default for PorterStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl PorterStemmer {
    pub fn new() -> Self {
        let irregular = IRREGULAR_FORMS
            .iter()
            .flat_map(|(stem, forms)| forms.iter().map(move |form| (*form, *stem)))
            .collect();
        Self { irregular }
    }

    pub fn shared() -> &'static PorterStemmer {
        &SHARED
    }

    /// Expects lowercase ASCII; words with other bytes come back unchanged.
    pub fn stem(&self, word: &str) -> String {
        if let Some(stem) = self.irregular.get(word) {
            return (*stem).to_owned();
        }
        if word.len() <= 2 || !word.is_ascii() {
            return word.to_owned();
        }

        let mut buf = word.as_bytes().to_vec();
        step1ab(&mut buf);
        step1c(&mut buf);
        step2(&mut buf);
        step3(&mut buf);
        step4(&mut buf);
        step5(&mut buf);
        // only ASCII letters were removed or appended
        String::from_utf8(buf).unwrap_or_else(|_| word.to_owned())
    }
}

pub fn stem(word: &str) -> String {
    PorterStemmer::shared().stem(word)
}

/// Lowercases and stems `word`, memoizing the result.
pub fn get_stem(word: &str) -> String {
    static STEM_CACHE: LazyLock<HashMap<String, String, RandomState>> =
        LazyLock::new(HashMap::default);
    let word = word.to_lowercase();
    if let Some(stem) = STEM_CACHE.read(&word, |_, stem| stem.clone()) {
        return stem;
    }
    STEM_CACHE
        .entry(word.clone())
        .or_insert_with(|| stem(&word))
        .get()
        .clone()
}

/// Number of vowel-consonant sequences in `word[..=j]`.
pub fn measure(word: &str, j: usize) -> usize {
    let bytes = word.as_bytes();
    if bytes.is_empty() {
        return 0;
    }
    vc_count(&bytes[..=j.min(bytes.len() - 1)])
}

fn is_consonant(word: &[u8], i: usize) -> bool {
    match word.get(i) {
        None => false,
        Some(ch) if VOWELS.contains(ch) => false,
        Some(b'y') => {
            // a run of y alternates; its first y is a vowel only after a consonant
            let start = word[..i]
                .iter()
                .rposition(|&ch| ch != b'y')
                .map_or(0, |p| p + 1);
            let first = start == 0 || VOWELS.contains(&word[start - 1]);
            first != ((i - start) % 2 == 1)
        }
        Some(_) => true,
    }
}

fn consonants(word: &[u8]) -> impl Iterator<Item = bool> + '_ {
    word.iter().scan(false, |prev, &ch| {
        let consonant = match ch {
            ch if VOWELS.contains(&ch) => false,
            b'y' => !*prev,
            _ => true,
        };
        *prev = consonant;
        Some(consonant)
    })
}

/// `[C](VC){m}[V]` gives m.
fn vc_count(word: &[u8]) -> usize {
    consonants(word)
        .fold((0, true), |(n, prev), consonant| {
            (n + usize::from(!prev && consonant), consonant)
        })
        .0
}

fn has_vowel(stem: &[u8]) -> bool {
    consonants(stem).any(|consonant| !consonant)
}

fn ends_with_double_consonant(word: &[u8]) -> bool {
    match word {
        [.., a, b] if a == b => is_consonant(word, word.len() - 1),
        _ => false,
    }
}

fn is_cvc(word: &[u8], i: usize) -> bool {
    if i >= word.len() {
        return false;
    }
    match i {
        0 => false,
        1 => !is_consonant(word, 0) && is_consonant(word, 1),
        _ => {
            is_consonant(word, i)
                && !is_consonant(word, i - 1)
                && is_consonant(word, i - 2)
                && !matches!(word[i], b'w' | b'x' | b'y')
        }
    }
}

fn truncate_by(word: &mut Vec<u8>, n: usize) {
    word.truncate(word.len().saturating_sub(n));
}

fn step1ab(word: &mut Vec<u8>) {
    if word.ends_with(b"s") {
        if word.ends_with(b"sses") {
            truncate_by(word, 2);
        } else if word.ends_with(b"ies") {
            // 'dies' -> 'die' but 'flies' -> 'fli'
            truncate_by(word, if word.len() == 4 { 1 } else { 2 });
        } else if word.len() >= 2 && word[word.len() - 2] != b's' {
            truncate_by(word, 1);
        }
    }

    let len = word.len();
    let mut trimmed = false;
    if word.ends_with(b"ied") {
        truncate_by(word, if len == 4 { 1 } else { 2 });
    } else if word.ends_with(b"eed") {
        if vc_count(&word[..len - 3]) > 0 {
            truncate_by(word, 1);
        }
    } else if word.ends_with(b"ed") && has_vowel(&word[..len - 2]) {
        truncate_by(word, 2);
        trimmed = true;
    } else if word.ends_with(b"ing") && has_vowel(&word[..len - 3]) {
        truncate_by(word, 3);
        trimmed = true;
    }

    if !trimmed {
        return;
    }
    if word.ends_with(b"at") || word.ends_with(b"bl") || word.ends_with(b"iz") {
        word.push(b'e');
    } else if ends_with_double_consonant(word) {
        if !matches!(word.last(), Some(b'l' | b's' | b'z')) {
            word.pop();
        }
    } else if vc_count(word) == 1 && is_cvc(word, word.len() - 1) {
        word.push(b'e');
    }
}

fn step1c(word: &mut Vec<u8>) {
    let len = word.len();
    if len > 2 && word[len - 1] == b'y' && is_consonant(word, len - 2) {
        word[len - 1] = b'i';
    }
}

/// Applies the first rule whose suffix matches. Returns that rule when the
/// word was rewritten; a matching rule whose measure gate fails still ends
/// the stage.
fn apply_rules(word: &mut Vec<u8>, rules: &'static [Rule], min_measure: usize) -> Option<&'static Rule> {
    for rule in rules {
        let suffix = rule.suffix.as_bytes();
        if !word.ends_with(suffix) {
            continue;
        }
        let stem_len = word.len() - suffix.len();
        if !rule.stem_ends_with.is_empty()
            && !word[..stem_len]
                .last()
                .is_some_and(|ch| rule.stem_ends_with.contains(ch))
        {
            continue;
        }
        if vc_count(&word[..stem_len]) <= min_measure {
            return None;
        }
        word.truncate(stem_len);
        word.extend_from_slice(rule.replacement.as_bytes());
        return Some(rule);
    }
    None
}

fn step2(word: &mut Vec<u8>) {
    if word.len() <= 1 {
        return;
    }
    // each redispatch shortens the word, so this terminates
    while let Some(rule) = apply_rules(word, STEP2_RULES, 0) {
        if !rule.redispatch {
            break;
        }
    }
}

fn step3(word: &mut Vec<u8>) {
    apply_rules(word, STEP3_RULES, 0);
}

fn step4(word: &mut Vec<u8>) {
    if word.len() <= 1 {
        return;
    }
    apply_rules(word, STEP4_RULES, 1);
}

fn step5(word: &mut Vec<u8>) {
    if word.ends_with(b"e") {
        let m = vc_count(word);
        if m > 1 || (m == 1 && !is_cvc(word, word.len().saturating_sub(2))) {
            word.pop();
        }
    }
    if word.ends_with(b"ll") && vc_count(word) > 1 {
        word.pop();
    }
}
