use super::{Decision, HookEvent, HostResponse, ProjectFs, STOP_EVENT};
use crate::config::HookPolicy;
use crate::paths;
use chrono::{DateTime, TimeDelta, Utc};

const REMINDER: &str = "\
❌ BLOCKED: CONTEXT.md has not been updated this session.

Before ending, update CONTEXT.md with:
- Current project phase and status
- Changes to critical parameters
- System status changes
- New blocking issues, or issues that were resolved
- Next actions
- Decisions made (record each in docs/decisions/)

CONTEXT.md is the project's shared memory. Keep it current.";

/// Block session end when CONTEXT.md exists but is older than the
/// configured window. A project without CONTEXT.md is not ours to police.
pub(super) fn check(
    event: &HookEvent,
    fs: &dyn ProjectFs,
    policy: &HookPolicy,
    now: DateTime<Utc>,
) -> Decision {
    if !event.is_event(STOP_EVENT) {
        return Decision::Allow;
    }
    let path = paths::context_md_path(&event.project_dir());
    if !fs.exists(&path) {
        return Decision::Allow;
    }
    let modified = match fs.modified(&path) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot stat CONTEXT.md");
            return Decision::Allow;
        }
    };

    if now - modified > stale_after(policy) {
        Decision::Block(HostResponse::stop(REMINDER))
    } else {
        Decision::Allow
    }
}

fn stale_after(policy: &HookPolicy) -> TimeDelta {
    i64::try_from(policy.context_stale_after_minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::fs::mem::MemFs;

    fn stop_event() -> HookEvent {
        HookEvent::parse(r#"{"hook_event_name":"Stop","cwd":"/proj"}"#).unwrap()
    }

    #[test]
    fn fresh_context_allows() {
        let now = Utc::now();
        let fs = MemFs::default().with_file_at("/proj/CONTEXT.md", "x", now - TimeDelta::minutes(10));
        assert_eq!(
            check(&stop_event(), &fs, &HookPolicy::default(), now),
            Decision::Allow
        );
    }

    #[test]
    fn stale_context_blocks_with_stop_response() {
        let now = Utc::now();
        let fs = MemFs::default().with_file_at("/proj/CONTEXT.md", "x", now - TimeDelta::minutes(61));
        match check(&stop_event(), &fs, &HookPolicy::default(), now) {
            Decision::Block(resp @ HostResponse::Stop { .. }) => {
                assert!(resp.reason().contains("CONTEXT.md"));
            }
            other => panic!("expected stop block, got {other:?}"),
        }
    }

    #[test]
    fn exactly_at_the_window_allows() {
        let now = Utc::now();
        let fs = MemFs::default().with_file_at("/proj/CONTEXT.md", "x", now - TimeDelta::minutes(60));
        assert_eq!(
            check(&stop_event(), &fs, &HookPolicy::default(), now),
            Decision::Allow
        );
    }

    #[test]
    fn missing_context_allows() {
        assert_eq!(
            check(&stop_event(), &MemFs::default(), &HookPolicy::default(), Utc::now()),
            Decision::Allow
        );
    }

    #[test]
    fn custom_window_is_respected() {
        let now = Utc::now();
        let fs = MemFs::default().with_file_at("/proj/CONTEXT.md", "x", now - TimeDelta::minutes(90));
        let policy = HookPolicy {
            context_stale_after_minutes: 120,
            ..HookPolicy::default()
        };
        assert_eq!(check(&stop_event(), &fs, &policy, now), Decision::Allow);
    }

    #[test]
    fn huge_window_never_blocks() {
        let now = Utc::now();
        let fs = MemFs::default().with_file_at("/proj/CONTEXT.md", "x", now - TimeDelta::days(3650));
        let policy = HookPolicy {
            context_stale_after_minutes: u64::MAX,
            ..HookPolicy::default()
        };
        assert_eq!(check(&stop_event(), &fs, &policy, now), Decision::Allow);
    }
}
