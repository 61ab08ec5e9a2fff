//! Stdout logger that masks every configured secret in the rendered line.
//!
//! Redaction runs after formatting so nothing that ends up in the line, whether
//! it came from the message or the surrounding layout, can carry a raw secret.

use env_logger::{Builder, Target};
use log::{LevelFilter, Record, SetLoggerError};

use std::io::Write;

const PLACEHOLDER: &str = "***";
const KEEP: usize = 3;

pub fn mask(value: &str) -> String {
    let trimmed = value.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= KEEP * 2 {
        return PLACEHOLDER.to_string();
    }
    let head: String = chars[..KEEP].iter().collect();
    let tail: String = chars[chars.len() - KEEP..].iter().collect();
    format!("{}{}{}", head, PLACEHOLDER, tail)
}

/// Literal substring replacement of a fixed set of secrets.
#[derive(Clone, Debug, Default)]
pub struct Redactor {
    // (raw, masked), longest raw value first
    secrets: Vec<(String, String)>,
}

impl Redactor {
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut raw: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        // A secret that contains another must be replaced before the shorter one
        // breaks its match.
        raw.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        raw.dedup();
        Self {
            secrets: raw
                .into_iter()
                .map(|s| {
                    let masked = mask(&s);
                    (s, masked)
                })
                .collect(),
        }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (raw, masked) in &self.secrets {
            if out.contains(raw.as_str()) {
                out = out.replace(raw.as_str(), masked);
            }
        }
        out
    }
}

/// Renders one record as `[timestamp] LEVEL    message` and masks it.
pub fn render(record: &Record, redactor: &Redactor) -> String {
    let line = format!(
        "[{}] {:<8} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%z"),
        record.level(),
        record.args()
    );
    redactor.redact(&line)
}

pub fn level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the process logger. Can only succeed once per process.
pub fn init<I, S>(debug: bool, secrets: I) -> Result<(), SetLoggerError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let redactor = Redactor::new(secrets);
    Builder::new()
        .target(Target::Stdout)
        .filter_level(level(debug))
        // hyper logs connection chatter at debug
        .filter_module("hyper", LevelFilter::Info)
        .format(move |buf, record| writeln!(buf, "{}", render(record, &redactor)))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn short_secrets_collapse() {
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("abcdef"), "***");
        assert_eq!(mask("  abcdef  "), "***");
    }

    #[test]
    fn long_secrets_keep_edges() {
        assert_eq!(mask("abcdefg"), "abc***efg");
        assert_eq!(mask("abc123456xyz"), "abc***xyz");
        assert_eq!(mask("签到奖励签到成功"), "签到奖***到成功");
    }

    #[test]
    fn every_secret_is_masked_independently() {
        let redactor = Redactor::new(["abc123456xyz", "", "key42", "https://bark.example"]);
        let out = redactor.redact(
            "token=abc123456xyz url=https://bark.example/key42/t/m again abc123456xyz",
        );
        assert!(!out.contains("abc123456xyz"));
        assert!(!out.contains("key42"));
        assert!(!out.contains("https://bark.example"));
        assert_eq!(
            out,
            "token=abc***xyz url=htt***ple/***/t/m again abc***xyz"
        );
    }

    #[test]
    fn matching_is_literal() {
        let redactor = Redactor::new(["a.c.e.g.i"]);
        assert_eq!(redactor.redact("abcdefghi"), "abcdefghi");
        assert_eq!(redactor.redact("x a.c.e.g.i y"), "x a.c***g.i y");
    }

    #[test]
    fn nested_secret_does_not_expose_the_outer_one() {
        let redactor = Redactor::new(["secret", "my-secret-token"]);
        let out = redactor.redact("my-secret-token secret");
        assert_eq!(out, "my-***ken ***");
    }

    #[test]
    fn empty_redactor_is_identity() {
        assert_eq!(Redactor::new(Vec::<String>::new()).redact("hello"), "hello");
    }

    #[test]
    fn rendered_line_is_redacted() {
        let redactor = Redactor::new(["tok-0123456789"]);
        let line = render(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("request with tok-0123456789 failed"))
                .build(),
            &redactor,
        );
        assert!(line.starts_with('['));
        assert!(line.contains("] WARN     request with tok***789 failed"));
        assert!(!line.contains("tok-0123456789"));
    }

    #[test]
    fn debug_flag_selects_level() {
        assert_eq!(level(true), LevelFilter::Debug);
        assert_eq!(level(false), LevelFilter::Info);
    }
}
