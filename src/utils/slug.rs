//! Header text to field identifier.
//!
//! Keys produced here are embedded in JSON objects, XML element names and
//! JavaScript property accesses, so they are reduced to lowercase
//! alphanumerics joined by underscores.

use std::borrow::Cow;

/// Closest-ASCII replacements, sorted by code point for binary search.
const TRANSLITERATIONS: &[(char, &str)] = &[
    // Latin-1 Supplement
    ('£', ""), ('ª', "a"), ('º', "o"), ('À', "A"), ('Á', "A"), ('Â', "A"),
    ('Ã', "A"), ('Ä', "A"), ('Å', "A"), ('Æ', "AE"), ('Ç', "C"), ('È', "E"),
    ('É', "E"), ('Ê', "E"), ('Ë', "E"), ('Ì', "I"), ('Í', "I"), ('Î', "I"),
    ('Ï', "I"), ('Ð', "D"), ('Ñ', "N"), ('Ò', "O"), ('Ó', "O"), ('Ô', "O"),
    ('Õ', "O"), ('Ö', "O"), ('Ø', "O"), ('Ù', "U"), ('Ú', "U"), ('Û', "U"),
    ('Ü', "U"), ('Ý', "Y"), ('Þ', "TH"), ('ß', "s"), ('à', "a"), ('á', "a"),
    ('â', "a"), ('ã', "a"), ('ä', "a"), ('å', "a"), ('æ', "ae"), ('ç', "c"),
    ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"), ('ì', "i"), ('í', "i"),
    ('î', "i"), ('ï', "i"), ('ð', "d"), ('ñ', "n"), ('ò', "o"), ('ó', "o"),
    ('ô', "o"), ('õ', "o"), ('ö', "o"), ('ø', "o"), ('ù', "u"), ('ú', "u"),
    ('û', "u"), ('ü', "u"), ('ý', "y"), ('þ', "th"), ('ÿ', "y"),
    // Latin Extended-A
    ('Ā', "A"), ('ā', "a"), ('Ă', "A"), ('ă', "a"), ('Ą', "A"), ('ą', "a"),
    ('Ć', "C"), ('ć', "c"), ('Ĉ', "C"), ('ĉ', "c"), ('Ċ', "C"), ('ċ', "c"),
    ('Č', "C"), ('č', "c"), ('Ď', "D"), ('ď', "d"), ('Đ', "D"), ('đ', "d"),
    ('Ē', "E"), ('ē', "e"), ('Ĕ', "E"), ('ĕ', "e"), ('Ė', "E"), ('ė', "e"),
    ('Ę', "E"), ('ę', "e"), ('Ě', "E"), ('ě', "e"), ('Ĝ', "G"), ('ĝ', "g"),
    ('Ğ', "G"), ('ğ', "g"), ('Ġ', "G"), ('ġ', "g"), ('Ģ', "G"), ('ģ', "g"),
    ('Ĥ', "H"), ('ĥ', "h"), ('Ħ', "H"), ('ħ', "h"), ('Ĩ', "I"), ('ĩ', "i"),
    ('Ī', "I"), ('ī', "i"), ('Ĭ', "I"), ('ĭ', "i"), ('Į', "I"), ('į', "i"),
    ('İ', "I"), ('ı', "i"), ('Ĳ', "IJ"), ('ĳ', "ij"), ('Ĵ', "J"), ('ĵ', "j"),
    ('Ķ', "K"), ('ķ', "k"), ('ĸ', "k"), ('Ĺ', "L"), ('ĺ', "l"), ('Ļ', "L"),
    ('ļ', "l"), ('Ľ', "L"), ('ľ', "l"), ('Ŀ', "L"), ('ŀ', "l"), ('Ł', "L"),
    ('ł', "l"), ('Ń', "N"), ('ń', "n"), ('Ņ', "N"), ('ņ', "n"), ('Ň', "N"),
    ('ň', "n"), ('ŉ', "N"), ('Ŋ', "n"), ('ŋ', "N"), ('Ō', "O"), ('ō', "o"),
    ('Ŏ', "O"), ('ŏ', "o"), ('Ő', "O"), ('ő', "o"), ('Œ', "OE"), ('œ', "oe"),
    ('Ŕ', "R"), ('ŕ', "r"), ('Ŗ', "R"), ('ŗ', "r"), ('Ř', "R"), ('ř', "r"),
    ('Ś', "S"), ('ś', "s"), ('Ŝ', "S"), ('ŝ', "s"), ('Ş', "S"), ('ş', "s"),
    ('Š', "S"), ('š', "s"), ('Ţ', "T"), ('ţ', "t"), ('Ť', "T"), ('ť', "t"),
    ('Ŧ', "T"), ('ŧ', "t"), ('Ũ', "U"), ('ũ', "u"), ('Ū', "U"), ('ū', "u"),
    ('Ŭ', "U"), ('ŭ', "u"), ('Ů', "U"), ('ů', "u"), ('Ű', "U"), ('ű', "u"),
    ('Ų', "U"), ('ų', "u"), ('Ŵ', "W"), ('ŵ', "w"), ('Ŷ', "Y"), ('ŷ', "y"),
    ('Ÿ', "Y"), ('Ź', "Z"), ('ź', "z"), ('Ż', "Z"), ('ż', "z"), ('Ž', "Z"),
    ('ž', "z"), ('ſ', "s"),
    // Latin Extended-B and IPA (Pinyin, Vietnamese horn vowels)
    ('Ơ', "O"), ('ơ', "o"), ('Ư', "U"), ('ư', "u"), ('Ǎ', "A"), ('ǎ', "a"),
    ('Ǐ', "I"), ('ǐ', "i"), ('Ǒ', "O"), ('ǒ', "o"), ('Ǔ', "U"), ('ǔ', "u"),
    ('Ǖ', "U"), ('ǖ', "u"), ('Ǘ', "U"), ('ǘ', "u"), ('Ǚ', "U"), ('ǚ', "u"),
    ('Ǜ', "U"), ('ǜ', "u"), ('Ș', "S"), ('ș', "s"), ('Ț', "T"), ('ț', "t"),
    ('ɑ', "a"),
    // Latin Extended Additional (Vietnamese)
    ('Ạ', "A"), ('ạ', "a"), ('Ả', "A"), ('ả', "a"), ('Ấ', "A"), ('ấ', "a"),
    ('Ầ', "A"), ('ầ', "a"), ('Ẩ', "A"), ('ẩ', "a"), ('Ẫ', "A"), ('ẫ', "a"),
    ('Ậ', "A"), ('ậ', "a"), ('Ắ', "A"), ('ắ', "a"), ('Ằ', "A"), ('ằ', "a"),
    ('Ẳ', "A"), ('ẳ', "a"), ('Ẵ', "A"), ('ẵ', "a"), ('Ặ', "A"), ('ặ', "a"),
    ('Ẹ', "E"), ('ẹ', "e"), ('Ẻ', "E"), ('ẻ', "e"), ('Ẽ', "E"), ('ẽ', "e"),
    ('Ế', "E"), ('ế', "e"), ('Ề', "E"), ('ề', "e"), ('Ể', "E"), ('ể', "e"),
    ('Ễ', "E"), ('ễ', "e"), ('Ệ', "E"), ('ệ', "e"), ('Ỉ', "I"), ('ỉ', "i"),
    ('Ị', "I"), ('ị', "i"), ('Ọ', "O"), ('ọ', "o"), ('Ỏ', "O"), ('ỏ', "o"),
    ('Ố', "O"), ('ố', "o"), ('Ồ', "O"), ('ồ', "o"), ('Ổ', "O"), ('ổ', "o"),
    ('Ỗ', "O"), ('ỗ', "o"), ('Ộ', "O"), ('ộ', "o"), ('Ớ', "O"), ('ớ', "o"),
    ('Ờ', "O"), ('ờ', "o"), ('Ở', "O"), ('ở', "o"), ('Ỡ', "O"), ('ỡ', "o"),
    ('Ợ', "O"), ('ợ', "o"), ('Ụ', "U"), ('ụ', "u"), ('Ủ', "U"), ('ủ', "u"),
    ('Ứ', "U"), ('ứ', "u"), ('Ừ', "U"), ('ừ', "u"), ('Ử', "U"), ('ử', "u"),
    ('Ữ', "U"), ('ữ', "u"), ('Ự', "U"), ('ự', "u"), ('Ỳ', "Y"), ('ỳ', "y"),
    ('Ỵ', "Y"), ('ỵ', "y"), ('Ỷ', "Y"), ('ỷ', "y"), ('Ỹ', "Y"), ('ỹ', "y"),
    // Currency
    ('€', "E"),
];

/// Replace accented Latin letters with their ASCII equivalents.
///
/// Pure ASCII input is returned untouched. Characters outside the table
/// (CJK, Cyrillic, symbols) pass through unchanged.
pub fn remove_accents(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match TRANSLITERATIONS.binary_search_by_key(&ch, |&(c, _)| c) {
            Ok(idx) => out.push_str(TRANSLITERATIONS[idx].1),
            Err(_) => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Lowercase the text and collapse every run of non-alphanumeric characters
/// into a single hyphen, with no leading or trailing hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            pending_hyphen = true;
            continue;
        }
        for lower in ch.to_lowercase().filter(|c| c.is_alphanumeric()) {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(lower);
        }
    }

    slug
}

/// Turn a raw column header into a record key.
///
/// `sanitize_key(sanitize_key(x)) == sanitize_key(x)` for every input.
pub fn sanitize_key(header: &str) -> String {
    // 先轉小寫再查表，避免大寫字母轉小寫後才落入對照表
    let lowered = header.to_lowercase();
    slugify(&remove_accents(&lowered)).replace('-', "_")
}
