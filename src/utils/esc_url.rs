//! Checks and cleans a user-supplied source URL.
//!
//! The output is either a URL whose scheme is on [`ALLOWED_PROTOCOLS`] (or a
//! relative reference), or the empty string when the input was rejected.

use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const ALLOWED_PROTOCOLS: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "gopher", "nntp", "feed", "telnet",
    "mms", "rtsp", "svn", "tel", "fax", "xmpp",
];

/// Named entities that survive normalisation (HTML 4 set).
const ALLOWED_ENTITY_NAMES: &[&str] = &[
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "acute", "micro", "para", "middot",
    "cedil", "ordm", "raquo", "iquest", "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring",
    "AElig", "Ccedil", "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml",
    "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave",
    "Uacute", "Ucirc", "Uuml", "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde",
    "auml", "aring", "aelig", "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute",
    "icirc", "iuml", "eth", "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide",
    "oslash", "ugrave", "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml", "quot", "amp", "lt",
    "gt", "apos", "OElig", "oelig", "Scaron", "scaron", "Yuml", "circ", "tilde", "ensp", "emsp",
    "thinsp", "zwnj", "zwj", "lrm", "rlm", "ndash", "mdash", "lsquo", "rsquo", "sbquo", "ldquo",
    "rdquo", "bdquo", "dagger", "Dagger", "permil", "lsaquo", "rsaquo", "euro", "fnof", "Alpha",
    "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa", "Lambda", "Mu",
    "Nu", "Xi", "Omicron", "Pi", "Rho", "Sigma", "Tau", "Upsilon", "Phi", "Chi", "Psi", "Omega",
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigmaf", "sigma", "tau", "upsilon",
    "phi", "chi", "psi", "omega", "thetasym", "upsih", "piv", "bull", "hellip", "prime", "Prime",
    "oline", "frasl", "weierp", "image", "real", "trade", "alefsym", "larr", "uarr", "rarr",
    "darr", "harr", "crarr", "lArr", "uArr", "rArr", "dArr", "hArr", "forall", "part", "exist",
    "empty", "nabla", "isin", "notin", "ni", "prod", "sum", "minus", "lowast", "radic", "prop",
    "infin", "ang", "and", "or", "cap", "cup", "int", "sim", "cong", "asymp", "ne", "equiv", "le",
    "ge", "sub", "sup", "nsub", "sube", "supe", "oplus", "otimes", "perp", "sdot", "lceil",
    "rceil", "lfloor", "rfloor", "lang", "rang", "loz", "spades", "clubs", "hearts", "diams",
    "sup1", "sup2", "sup3", "frac14", "frac12", "frac34", "there4",
];

const CRLF_SEQUENCES: &[&str] = &["%0d", "%0a", "%0D", "%0A"];

/// Bad-protocol stripping gives up after this many passes.
const MAX_PROTOCOL_PASSES: usize = 6;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static URL sanitizer pattern")
}

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"[^a-zA-Z0-9\-~+_.?#=!&;,/:%@$|*'()\x{80}-\x{10FFFF}]"));
static LOCAL_SCRIPT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^[a-z0-9-]+?\.php"));
static NAMED_ENTITY: LazyLock<Regex> = LazyLock::new(|| compile(r"&amp;([A-Za-z]{2,8});"));
static DECIMAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| compile(r"&amp;#(0*[0-9]{1,7});"));
static HEX_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"&amp;#[Xx](0*[0-9A-Fa-f]{1,6});"));
static PROTOCOL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i):|&#0*58;|&#x0*3a;"));
static DECODE_DECIMAL: LazyLock<Regex> = LazyLock::new(|| compile(r"&#([0-9]+);"));
static DECODE_HEX: LazyLock<Regex> = LazyLock::new(|| compile(r"&#[Xx]([0-9A-Fa-f]+);"));
static NULL_BYTES: LazyLock<Regex> = LazyLock::new(|| compile(r"\x00+"));
static ESCAPED_NULLS: LazyLock<Regex> = LazyLock::new(|| compile(r"(\\0)+"));

/// Sanitize a URL taken from a request; returns `""` when it is rejected.
pub fn sanitize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let url = DISALLOWED_CHARS.replace_all(raw, "");
    let url = deep_replace(CRLF_SEQUENCES, &url);
    let mut url = url.replace(";//", "://");

    if url.is_empty() {
        return url;
    }

    // 沒有 scheme 的網址預設補上 http://（相對路徑與本地腳本除外）
    if !url.contains(':')
        && !url.starts_with(['/', '#', '?'])
        && !LOCAL_SCRIPT.is_match(&url)
    {
        url = format!("http://{}", url);
    }

    let url = normalize_entities(&url);

    if strip_bad_protocols(&url, ALLOWED_PROTOCOLS) != url {
        tracing::warn!("Rejected source URL with disallowed protocol: {:?}", raw);
        return String::new();
    }

    url
}

/// Undo the `&` disarming applied by [`normalize_entities`], giving the form
/// that is sent over the wire.
pub fn unescape_ampersands(url: &str) -> String {
    url.replace("&#038;", "&").replace("&amp;", "&")
}

/// Remove every occurrence of each needle, repeating until none is left, so
/// that nested sequences such as `%0%0%0DDD` disappear completely.
pub fn deep_replace(needles: &[&str], subject: &str) -> String {
    let mut subject = subject.to_string();
    loop {
        let mut found = false;
        for needle in needles {
            while subject.contains(needle) {
                found = true;
                subject = subject.replace(needle, "");
            }
        }
        if !found {
            return subject;
        }
    }
}

/// Disarm every `&`, then re-enable well-formed named and numeric entities.
pub fn normalize_entities(text: &str) -> String {
    let disarmed = text.replace('&', "&amp;");

    let named = NAMED_ENTITY.replace_all(&disarmed, |caps: &Captures| {
        let name = &caps[1];
        if ALLOWED_ENTITY_NAMES.contains(&name) {
            format!("&{};", name)
        } else {
            format!("&amp;{};", name)
        }
    });

    let decimal = DECIMAL_ENTITY.replace_all(&named, |caps: &Captures| {
        let digits = &caps[1];
        match digits.parse::<u32>() {
            Ok(code) if valid_unicode(code) => {
                format!("&#{:0>3};", digits.trim_start_matches('0'))
            }
            _ => format!("&amp;#{};", digits),
        }
    });

    HEX_ENTITY
        .replace_all(&decimal, |caps: &Captures| {
            let hex = &caps[1];
            match u32::from_str_radix(hex, 16) {
                Ok(code) if valid_unicode(code) => {
                    format!("&#x{};", hex.trim_start_matches('0'))
                }
                _ => format!("&amp;#x{};", hex),
            }
        })
        .into_owned()
}

/// Code points allowed in XML character data.
pub fn valid_unicode(code: u32) -> bool {
    code == 0x9
        || code == 0xA
        || code == 0xD
        || (0x20..=0xD7FF).contains(&code)
        || (0xE000..=0xFFFD).contains(&code)
        || (0x10000..=0x10FFFF).contains(&code)
}

/// Strip disallowed protocols from the start of `text`.
///
/// Runs repeatedly so that `javascript:javascript:alert(1)` cannot leave a
/// live scheme behind; if the string is still changing after the last pass
/// the whole thing is dropped.
pub fn strip_bad_protocols(text: &str, allowed: &[&str]) -> String {
    let mut current = remove_nulls(text);

    for _ in 0..MAX_PROTOCOL_PASSES {
        let next = strip_protocol_once(&current, allowed, 1);
        if next == current {
            return current;
        }
        current = next;
    }

    String::new()
}

fn strip_protocol_once(text: &str, allowed: &[&str], depth: usize) -> String {
    let mut parts = PROTOCOL_SEPARATOR.splitn(text, 2);
    let scheme = parts.next().unwrap_or_default();
    let Some(rest) = parts.next() else {
        return text.to_string();
    };
    if scheme.contains("/?") {
        return text.to_string();
    }

    let mut rest = rest
        .trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B'))
        .to_string();
    let protocol = check_protocol(scheme, allowed);

    // feed:http://… 的內層協定也要檢查，但最多遞迴三層
    if protocol == "feed:" {
        if depth > 2 {
            return String::new();
        }
        rest = strip_protocol_once(&rest, allowed, depth + 1);
        if rest.is_empty() {
            return rest;
        }
    }

    format!("{}{}", protocol, rest)
}

/// Returns `"<scheme>:"` for an allowed scheme and `""` otherwise.
fn check_protocol(scheme: &str, allowed: &[&str]) -> String {
    let decoded = decode_entities(scheme);
    let compact: String = decoded.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = remove_nulls(&compact).to_lowercase();

    if allowed.iter().any(|p| p.eq_ignore_ascii_case(&normalized)) {
        format!("{}:", normalized)
    } else {
        String::new()
    }
}

/// Decode numeric entities (`&#65;`, `&#x41;`); named entities are left alone.
fn decode_entities(text: &str) -> String {
    let decimal = DECODE_DECIMAL.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    DECODE_HEX
        .replace_all(&decimal, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

fn remove_nulls(text: &str) -> String {
    let text = NULL_BYTES.replace_all(text, "");
    ESCAPED_NULLS.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_http_when_scheme_missing() {
        assert_eq!(
            sanitize_url("example.com/data.csv"),
            "http://example.com/data.csv"
        );
        assert_eq!(
            sanitize_url("https://example.com/data.csv"),
            "https://example.com/data.csv"
        );
    }

    #[test]
    fn test_relative_references_are_kept() {
        assert_eq!(sanitize_url("/files/data.csv"), "/files/data.csv");
        assert_eq!(sanitize_url("?source=x"), "?source=x");
        assert_eq!(sanitize_url("index.php?x=1"), "index.php?x=1");
    }

    #[test]
    fn test_rejects_script_protocols() {
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("JaVaScRiPt:alert(1)"), "");
        assert_eq!(sanitize_url("javascript:javascript:alert(1)"), "");
        assert_eq!(sanitize_url("jav&#x61;script:alert(1)"), "");
        assert_eq!(sanitize_url("data:text/html,hello"), "");
    }

    #[test]
    fn test_feed_protocol_checks_inner_scheme() {
        assert_eq!(
            sanitize_url("feed:http://example.com/rss"),
            "feed:http://example.com/rss"
        );
        assert_eq!(sanitize_url("feed:javascript:alert(1)"), "");
    }

    #[test]
    fn test_strips_crlf_sequences_deeply() {
        assert_eq!(
            sanitize_url("http://example.com/a%0D%0Ab.csv"),
            "http://example.com/ab.csv"
        );
        assert_eq!(
            sanitize_url("http://example.com/a%0%0%0DDDb.csv"),
            "http://example.com/ab.csv"
        );
        assert_eq!(deep_replace(&["%0D"], "%0%0%0DDD"), "");
    }

    #[test]
    fn test_strips_disallowed_characters() {
        assert_eq!(
            sanitize_url("http://exa mple.com/<data>.csv\""),
            "http://example.com/data.csv"
        );
        assert_eq!(sanitize_url("http://example.com/;//x"), "http://example.com/://x");
    }

    #[test]
    fn test_normalize_entities() {
        assert_eq!(normalize_entities("AT&T"), "AT&amp;T");
        assert_eq!(normalize_entities("a=1&b=2"), "a=1&amp;b=2");
        assert_eq!(normalize_entities("&amp;"), "&amp;");
        assert_eq!(normalize_entities("&nbsp;"), "&nbsp;");
        assert_eq!(normalize_entities("&bogus;"), "&amp;bogus;");
        assert_eq!(normalize_entities("&#00058;"), "&#058;");
        assert_eq!(normalize_entities("&#x003a;"), "&#x3a;");
        assert_eq!(normalize_entities("&#1;"), "&amp;#1;");
        assert_eq!(normalize_entities("&#xD800;"), "&amp;#xD800;");
    }

    #[test]
    fn test_query_strings_survive_round_trip() {
        let sanitized = sanitize_url("http://example.com/export?format=csv&gid=0");
        assert_eq!(sanitized, "http://example.com/export?format=csv&amp;gid=0");
        assert_eq!(
            unescape_ampersands(&sanitized),
            "http://example.com/export?format=csv&gid=0"
        );
    }

    #[test]
    fn test_valid_unicode() {
        assert!(valid_unicode(0x9));
        assert!(valid_unicode(0x41));
        assert!(!valid_unicode(0x0));
        assert!(!valid_unicode(0xD800));
        assert!(!valid_unicode(0xFFFE));
        assert!(valid_unicode(0x10FFFF));
        assert!(!valid_unicode(0x110000));
    }

    #[test]
    fn test_strip_bad_protocols_removes_nulls() {
        assert_eq!(
            strip_bad_protocols("ht\0tp://example.com", ALLOWED_PROTOCOLS),
            "http://example.com"
        );
    }
}
