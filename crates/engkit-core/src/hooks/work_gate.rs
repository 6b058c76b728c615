use super::{Decision, HookEvent, HostResponse, ProjectFs, USER_PROMPT_SUBMIT_EVENT};
use crate::config::HookPolicy;
use crate::paths;
use regex::Regex;
use std::sync::OnceLock;

const MESSAGE: &str = "\
❌ BLOCKED: Read CONTEXT.md before starting design work.

CONTEXT.md is missing, nearly empty or still full of placeholders.
Before continuing:

1. Read CONTEXT.md for the current project state
2. Fill in the critical parameters, system status and blocking issues
3. Check the recent decisions in docs/decisions/

Then re-send your request.";

fn design_work_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"(?i)\b(design|iterate|optimize|calculate|model|simulate)\b",
            r"(?i)\b(create|implement|build|develop|write)\s+(calculation|design|model)",
            r"(?i)\b(review|analyze|check)\s+(design|implementation|calculation)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Block design-work prompts until CONTEXT.md has real content.
pub(super) fn check(event: &HookEvent, fs: &dyn ProjectFs, policy: &HookPolicy) -> Decision {
    if !event.is_event(USER_PROMPT_SUBMIT_EVENT) || !is_design_work(event.prompt(), policy) {
        return Decision::Allow;
    }
    let path = paths::context_md_path(&event.project_dir());
    let content = match fs.read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot read CONTEXT.md");
            return Decision::Allow;
        }
    };
    if context_engaged(&content, policy) {
        Decision::Allow
    } else {
        Decision::Block(HostResponse::block_prompt(MESSAGE))
    }
}

fn is_design_work(prompt: &str, policy: &HookPolicy) -> bool {
    if design_work_patterns().iter().any(|re| re.is_match(prompt)) {
        return true;
    }
    keyword_pattern(policy)
        .map(|re| re.is_match(prompt))
        .unwrap_or(false)
}

fn keyword_pattern(policy: &HookPolicy) -> Option<Regex> {
    let words: Vec<String> = policy
        .prompt_keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| regex::escape(k.trim()))
        .collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).ok()
}

/// Bracketed `[TODO]` markers also count as plain `TODO`, so they weigh double.
fn placeholder_score(content: &str) -> usize {
    content.matches("TODO").count() + content.matches("TBD").count() + content.matches("[TODO]").count()
}

fn context_engaged(content: &str, policy: &HookPolicy) -> bool {
    content.trim().chars().count() >= policy.context_min_chars
        && placeholder_score(content) <= policy.context_max_placeholders
}
