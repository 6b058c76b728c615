//! Policy hooks invoked by the AI coding assistant.
//!
//! Each hook reads one JSON event from the host, evaluates a predicate over
//! the project filesystem and answers with a [`Decision`]. Hooks fail open:
//! a malformed event, a missing file or an unreadable config all allow the
//! action.
//!
//! # Host protocol
//! - allow: exit 0, nothing on stdout
//! - warn: messages on stderr, exit 1 (the host shows them but proceeds)
//! - block: exit 0 with a [`HostResponse`] JSON object on stdout

mod bash_safety;
mod context_update;
mod design_gate;
pub mod fs;
mod work_gate;

pub use fs::{DiskFs, ProjectFs};

use crate::config::{Config, HookPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const STOP_EVENT: &str = "Stop";
pub const PRE_TOOL_USE_EVENT: &str = "PreToolUse";
pub const USER_PROMPT_SUBMIT_EVENT: &str = "UserPromptSubmit";

// ---------------------------------------------------------------------------
// HookKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Session end: CONTEXT.md must have been touched recently.
    ContextUpdate,
    /// Design or calculation edits need system understanding and references.
    DocBeforeDesign,
    /// Design prompts need an engaged CONTEXT.md.
    ContextBeforeWork,
    /// Shell command screening.
    BashSafety,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::ContextUpdate,
        HookKind::DocBeforeDesign,
        HookKind::ContextBeforeWork,
        HookKind::BashSafety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::ContextUpdate => "context-update",
            HookKind::DocBeforeDesign => "doc-before-design",
            HookKind::ContextBeforeWork => "context-before-work",
            HookKind::BashSafety => "bash-safety",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        HookKind::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// The host event this hook is registered for.
    pub fn event_name(&self) -> &'static str {
        match self {
            HookKind::ContextUpdate => STOP_EVENT,
            HookKind::DocBeforeDesign | HookKind::BashSafety => PRE_TOOL_USE_EVENT,
            HookKind::ContextBeforeWork => USER_PROMPT_SUBMIT_EVENT,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookKind::from_name(s).ok_or_else(|| {
            let names: Vec<_> = HookKind::ALL.iter().map(|k| k.as_str()).collect();
            format!("unknown hook '{s}' (expected one of: {})", names.join(", "))
        })
    }
}

// ---------------------------------------------------------------------------
// HookEvent
// ---------------------------------------------------------------------------

/// The JSON object the host writes to the hook's stdin. Unknown fields are
/// ignored and every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<ToolInput>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub notebook_path: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

impl HookEvent {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Project directory the event refers to; the process directory when
    /// the host sent none.
    pub fn project_dir(&self) -> PathBuf {
        match self.cwd.as_deref() {
            Some(cwd) if !cwd.is_empty() => PathBuf::from(cwd),
            _ => PathBuf::from("."),
        }
    }

    /// True when the event names `event`, or names nothing at all.
    pub fn is_event(&self, event: &str) -> bool {
        match self.hook_event_name.as_deref() {
            None | Some("") => true,
            Some(name) => name == event,
        }
    }

    pub fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or("")
    }

    /// The file a Write/Edit/NotebookEdit targets.
    pub fn target_path(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|t| t.file_path.as_deref().or(t.notebook_path.as_deref()))
            .unwrap_or("")
    }

    pub fn command(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|t| t.command.as_deref())
            .unwrap_or("")
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Decision / HostResponse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow,
    Block(HostResponse),
    Warn(Vec<String>),
}

impl Decision {
    pub fn exit_code(&self) -> i32 {
        match self {
            Decision::Allow | Decision::Block(_) => 0,
            Decision::Warn(_) => 1,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block(_))
    }
}

/// Blocking payload, shaped per host event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostResponse {
    Stop {
        #[serde(rename = "continue")]
        proceed: bool,
        #[serde(rename = "stopReason")]
        stop_reason: String,
    },
    ToolDenied {
        #[serde(rename = "hookSpecificOutput")]
        output: PermissionOutput,
    },
    PromptBlocked { decision: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOutput {
    pub hook_event_name: String,
    pub permission_decision: String,
    pub permission_decision_reason: String,
}

impl HostResponse {
    pub fn stop(reason: impl Into<String>) -> Self {
        HostResponse::Stop {
            proceed: false,
            stop_reason: reason.into(),
        }
    }

    pub fn deny_tool(reason: impl Into<String>) -> Self {
        HostResponse::ToolDenied {
            output: PermissionOutput {
                hook_event_name: PRE_TOOL_USE_EVENT.to_string(),
                permission_decision: "deny".to_string(),
                permission_decision_reason: reason.into(),
            },
        }
    }

    pub fn block_prompt(reason: impl Into<String>) -> Self {
        HostResponse::PromptBlocked {
            decision: "block".to_string(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            HostResponse::Stop { stop_reason, .. } => stop_reason,
            HostResponse::ToolDenied { output } => &output.permission_decision_reason,
            HostResponse::PromptBlocked { reason, .. } => reason,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one hook against an already parsed event.
pub fn evaluate(
    kind: HookKind,
    event: &HookEvent,
    fs: &dyn ProjectFs,
    policy: &HookPolicy,
    now: DateTime<Utc>,
) -> Decision {
    match kind {
        HookKind::ContextUpdate => context_update::check(event, fs, policy, now),
        HookKind::DocBeforeDesign => design_gate::check(event, fs, policy),
        HookKind::ContextBeforeWork => work_gate::check(event, fs, policy),
        HookKind::BashSafety => bash_safety::check(event),
    }
}

/// Evaluate one hook from the raw stdin payload against the real
/// filesystem, loading the policy from the event's project directory.
pub fn respond(kind: HookKind, raw: &str, now: DateTime<Utc>) -> Decision {
    let event = match HookEvent::parse(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(hook = %kind, error = %e, "malformed hook input, allowing");
            return Decision::Allow;
        }
    };
    let policy = Config::hook_policy(&event.project_dir());
    let decision = evaluate(kind, &event, &DiskFs, &policy, now);
    tracing::debug!(hook = %kind, blocked = decision.is_block(), "hook evaluated");
    decision
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
