//! Derives URL-safe slugs from arbitrary post and category text. Han
//! characters are transliterated into toneless pinyin, everything else is
//! reduced to ASCII letters and digits.
//!
//! Slugs are presentation-layer tokens and are not injective: `数据` and `书局`
//! can map to the same slug. Canonical identity is carried by
//! [`crate::index::PostMeta::id`].

/// The Han range that receives pinyin transliteration. Characters outside of
/// it (kana, hangul, accented Latin, punctuation) are treated as non-CJK and
/// dropped unless they are ASCII alphanumerics.
fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Converts `text` into a lowercase, hyphen-separated slug. The result only
/// ever contains `[a-z0-9-]`, never starts or ends with `-` and never contains
/// `--`. Text with no retainable characters yields the empty string.
///
/// ```
/// use inkwell::slug::to_slug;
///
/// assert_eq!(to_slug("技术"), "jishu");
/// assert_eq!(to_slug("Vue3入门"), "vue3-rumen");
/// assert_eq!(to_slug("Hello, World!"), "helloworld");
/// ```
pub fn to_slug(text: &str) -> String {
    let mut joined = String::with_capacity(text.len());
    for (cjk, run) in runs(text) {
        let part = if cjk {
            transliterate(run)
        } else {
            retain_ascii(run)
        };
        if part.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('-');
        }
        joined.push_str(&part);
    }
    joined.make_ascii_lowercase();
    collapse_dashes(&joined)
}

/// Splits `text` into maximal runs of CJK and non-CJK characters, in order.
fn runs<'a>(text: &'a str) -> impl Iterator<Item = (bool, &'a str)> + 'a {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let cjk = is_cjk(first);
        let end = rest
            .find(|c: char| is_cjk(c) != cjk)
            .unwrap_or_else(|| rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some((cjk, run))
    })
}

// Pinyin syllables within one run are concatenated without separators.
fn transliterate(run: &str) -> String {
    ::slug::slugify(run).replace('-', "")
}

// Punctuation, hyphens included, is dropped rather than turned into a separator.
fn retain_ascii(run: &str) -> String {
    run.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn collapse_dashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_owned()
}
