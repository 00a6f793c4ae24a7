use std::sync::LazyLock;

use regex::Regex;

use super::date::parse_date;
use super::types::{EventQuery, Intent};

/// How a matched rule turns the transcript into an intent.
#[derive(Debug, Clone, Copy)]
enum Extract {
    Fixed(fn() -> Intent),
    Symptom,
    Show,
    Delete,
}

#[derive(Debug)]
enum Matcher {
    /// Whole (trimmed, lower-cased) transcript equals the phrase.
    Exact(&'static str),
    Pattern(Regex),
}

#[derive(Debug)]
struct Rule {
    matcher: Matcher,
    extract: Extract,
}

/// Literal/pattern command grammar for the de-DE command vocabulary.
///
/// The recognizer gives no grammar-constrained results, so matching is done
/// on the transcript text. Rules are tried in order; the first match wins.
#[derive(Debug)]
pub struct IntentParser {
    rules: Vec<Rule>,
}

static PARSER: LazyLock<IntentParser> = LazyLock::new(IntentParser::new);

/// Parses a transcript with the shared command grammar.
pub fn parse(transcript: &str) -> Intent {
    PARSER.parse(transcript)
}

impl IntentParser {
    pub fn new() -> Self {
        let pattern = |re: &str| Matcher::Pattern(Regex::new(re).expect("command pattern must compile"));

        let rules = vec![
            Rule { matcher: Matcher::Exact("dialog schließen"), extract: Extract::Fixed(|| Intent::CloseDialog) },
            Rule { matcher: pattern(r"\bneuer\b.*\btermin"), extract: Extract::Fixed(|| Intent::CreateAppointment) },
            Rule { matcher: pattern(r"\bneues\b.*\bsymptom\b"), extract: Extract::Symptom },
            Rule { matcher: pattern(r"\bauf\b.*\bein\b.*\bwiederhören"), extract: Extract::Fixed(|| Intent::EndSession) },
            Rule { matcher: pattern(r"hilfe"), extract: Extract::Fixed(|| Intent::Help) },
            Rule { matcher: pattern(r"\blösche\s.*\bam\s+\S"), extract: Extract::Delete },
            Rule { matcher: pattern(r"\bzeige\s.*\bam\s+\S"), extract: Extract::Show },
            Rule { matcher: Matcher::Exact("start"), extract: Extract::Fixed(|| Intent::ControlStart) },
            Rule { matcher: Matcher::Exact("weiter"), extract: Extract::Fixed(|| Intent::ControlNext) },
            Rule { matcher: Matcher::Exact("zurück"), extract: Extract::Fixed(|| Intent::ControlPrevious) },
            Rule { matcher: Matcher::Exact("neue eingabe"), extract: Extract::Fixed(|| Intent::ControlRepeat) },
            Rule { matcher: Matcher::Exact("fertig"), extract: Extract::Fixed(|| Intent::ControlFinish) },
        ];

        Self { rules }
    }

    /// Pure: the same transcript always yields the same intent.
    pub fn parse(&self, transcript: &str) -> Intent {
        let lowered = transcript.trim().to_lowercase();

        for rule in &self.rules {
            let hit = match &rule.matcher {
                Matcher::Exact(phrase) => lowered == *phrase,
                Matcher::Pattern(re) => re.is_match(&lowered),
            };
            if !hit {
                continue;
            }

            return match rule.extract {
                Extract::Fixed(build) => build(),
                Extract::Symptom => Intent::AddSymptom { symptom: extract_symptom(transcript.trim()) },
                Extract::Show => Intent::ShowEvent(extract_query(&lowered, "zeige")),
                Extract::Delete => Intent::DeleteEvent(extract_query(&lowered, "lösche")),
            };
        }

        Intent::Unrecognized
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Text after the keyword "symptom", in the casing the user dictated.
fn extract_symptom(transcript: &str) -> String {
    match find_ignore_case(transcript, "symptom") {
        Some(start) => transcript[start + "symptom".len()..].trim().to_string(),
        None => String::new(),
    }
}

/// "<verb> <name> am <date>": name runs from after the verb to the last " am ",
/// the date token is everything after it.
fn extract_query(lowered: &str, verb: &str) -> EventQuery {
    let name_start = lowered.find(verb).map(|at| at + verb.len()).unwrap_or(0);

    match lowered.rfind(" am ") {
        Some(keyword) if keyword >= name_start => {
            let name = lowered[name_start..keyword].trim().to_string();
            let raw_date = lowered[keyword + " am ".len()..].trim().to_string();
            EventQuery {
                name,
                date: parse_date(&raw_date),
                raw_date,
            }
        }
        _ => EventQuery {
            name: lowered[name_start..].trim().to_string(),
            date: None,
            raw_date: String::new(),
        },
    }
}

/// Byte offset of `needle` (lower-case ASCII) in `haystack`, ignoring case.
/// Offsets index the original string, so the caller can slice user text.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.char_indices().map(|(at, _)| at).find(|&at| {
        haystack[at..]
            .get(..needle.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(needle))
    })
}
