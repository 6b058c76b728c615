use super::{Decision, HookEvent, HostResponse, PRE_TOOL_USE_EVENT};
use regex::Regex;
use std::sync::OnceLock;

const SILENCED: &str = r"(?:&>|>)\s*/dev/null";

struct Rule {
    pattern: Regex,
    message: &'static str,
}

fn compile(rules: &[(String, &'static str)]) -> Vec<Rule> {
    rules
        .iter()
        .map(|(p, message)| Rule {
            pattern: Regex::new(p).expect("valid regex"),
            message,
        })
        .collect()
}

/// Matched against the command with quoted text masked out.
fn blocking_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[(
            format!(r"{SILENCED}.*\bgit\s+commit\b|\bgit\s+commit\b.*{SILENCED}"),
            "Commit with silenced output hides hook failures",
        )])
    })
}

fn warning_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            (
                r"\bgit\s+push\b.*(?:\s--force\b|\s-f\b)".to_string(),
                "Force push rewrites remote history",
            ),
            (
                r"\bgit\s+reset\s+--hard\b".to_string(),
                "Hard reset discards uncommitted work",
            ),
            (
                r"\bgit\s+clean\s+-[a-zA-Z]*f".to_string(),
                "git clean deletes untracked files",
            ),
            (
                r"\bchmod\s+-R\s+0?777\b".to_string(),
                "Recursive world-writable permissions",
            ),
            (
                r"\b(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z)?sh\b".to_string(),
                "Piping a download straight into a shell",
            ),
        ])
    })
}

// ---------------------------------------------------------------------------
// Shell words
// ---------------------------------------------------------------------------

/// Split a command into simple commands at unquoted `;`, `&&`, `||`, `|`,
/// `&` and newlines, each as a list of words with quotes removed.
fn segments(command: &str) -> Vec<Vec<String>> {
    let mut segments = Vec::new();
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some('"') if c == '\\' => {
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            Some(q) if c == q => quote = None,
            Some(_) => word.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        word.push(next);
                        in_word = true;
                    }
                }
                ';' | '|' | '&' | '\n' => {
                    end_word(&mut word, &mut in_word, &mut words);
                    if !words.is_empty() {
                        segments.push(std::mem::take(&mut words));
                    }
                    if matches!(c, '|' | '&') && chars.peek() == Some(&c) {
                        chars.next();
                    }
                }
                c if c.is_whitespace() => end_word(&mut word, &mut in_word, &mut words),
                c => {
                    word.push(c);
                    in_word = true;
                }
            },
        }
    }
    end_word(&mut word, &mut in_word, &mut words);
    if !words.is_empty() {
        segments.push(words);
    }
    segments
}

fn end_word(word: &mut String, in_word: &mut bool, words: &mut Vec<String>) {
    if *in_word {
        words.push(std::mem::take(word));
        *in_word = false;
    }
}

/// Replace quoted text (quotes included) with `_` so pattern rules only see
/// what the shell would interpret.
fn mask_quoted(command: &str) -> String {
    let mut quote: Option<char> = None;
    command
        .chars()
        .map(|c| match quote {
            Some(q) if c == q => {
                quote = None;
                '_'
            }
            Some(_) => '_',
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                '_'
            }
            None => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// rm analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RmTarget {
    Root,
    Home,
    Variable,
    Wildcard,
    Absolute,
}

impl RmTarget {
    fn classify(operand: &str) -> Option<Self> {
        let trimmed = operand.trim_end_matches('/');
        if operand.starts_with('/') && (trimmed.is_empty() || trimmed == "/*") {
            Some(Self::Root)
        } else if trimmed == "~" || trimmed == "~/*" {
            Some(Self::Home)
        } else if operand.starts_with('$') {
            Some(Self::Variable)
        } else if matches!(trimmed.trim_start_matches("./"), "*" | ".*") {
            Some(Self::Wildcard)
        } else if operand.starts_with('/') {
            Some(Self::Absolute)
        } else {
            None
        }
    }

    fn blocks(self) -> bool {
        self != Self::Absolute
    }

    fn message(self) -> &'static str {
        match self {
            Self::Root => "Recursive force delete of the filesystem root",
            Self::Home => "Recursive force delete of the home directory",
            Self::Variable => {
                "Recursive force delete of a variable path (an unset variable expands to /)"
            }
            Self::Wildcard => "Recursive force delete with a wildcard",
            Self::Absolute => "Recursive force delete of an absolute path",
        }
    }
}

/// Classified operands of every recursive, forced `rm` in the command.
fn rm_targets(command: &str) -> Vec<RmTarget> {
    let mut targets = Vec::new();
    for words in segments(command) {
        let Some(pos) = words.iter().position(|w| w == "rm" || w.ends_with("/rm")) else {
            continue;
        };
        let (mut recursive, mut force, mut options_done) = (false, false, false);
        let mut operands = Vec::new();
        for arg in &words[pos + 1..] {
            if options_done || arg == "-" || !arg.starts_with('-') {
                operands.push(arg.as_str());
            } else if arg == "--" {
                options_done = true;
            } else if let Some(long) = arg.strip_prefix("--") {
                match long {
                    "recursive" => recursive = true,
                    "force" => force = true,
                    _ => {}
                }
            } else {
                recursive |= arg.contains(['r', 'R']);
                force |= arg.contains('f');
            }
        }
        if recursive && force {
            targets.extend(operands.into_iter().filter_map(RmTarget::classify));
        }
    }
    targets
}

/// Block destructive shell commands and warn on risky ones.
pub(super) fn check(event: &HookEvent) -> Decision {
    if !event.is_event(PRE_TOOL_USE_EVENT) || event.tool_name() != "Bash" {
        return Decision::Allow;
    }
    let command = event.command();
    if command.trim().is_empty() {
        return Decision::Allow;
    }

    let targets = rm_targets(command);
    let masked = mask_quoted(command);
    let blocked = targets
        .iter()
        .find(|t| t.blocks())
        .map(|t| t.message())
        .or_else(|| {
            blocking_rules()
                .iter()
                .find(|r| r.pattern.is_match(&masked))
                .map(|r| r.message)
        });
    if let Some(message) = blocked {
        return Decision::Block(HostResponse::deny_tool(format!(
            "❌ BLOCKED: {message}\nCommand: {command}"
        )));
    }

    let mut messages: Vec<&str> = Vec::new();
    if targets.contains(&RmTarget::Absolute) {
        messages.push(RmTarget::Absolute.message());
    }
    messages.extend(
        warning_rules()
            .iter()
            .filter(|r| r.pattern.is_match(&masked))
            .map(|r| r.message),
    );
    if messages.is_empty() {
        Decision::Allow
    } else {
        Decision::Warn(
            messages
                .into_iter()
                .map(|m| format!("⚠️  Warning: {m}"))
                .collect(),
        )
    }
}
