use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// One capture group per opaque kind, in the order of `OpaqueKind::ALL`.
regex!(OPAQUE_START_REGEX, r"(?i)(<!--)|(<nowiki>)|(<pre>)|(<math>)");
regex!(COMMENT_END_REGEX, r"-->");
regex!(NOWIKI_END_REGEX, r"(?i)</nowiki>");
regex!(PRE_END_REGEX, r"(?i)</pre>");
regex!(MATH_END_REGEX, r"(?i)</math>");

regex!(AUTHOR_FIELD_REGEX, r"(?i)\|\s*author\s*=");
regex!(DATE_FIELD_REGEX, r"(?i)\|\s*date\s*=");
