use chrono::Utc;
use engkit_core::hooks::{self, Decision, HookKind};
use std::io::Read;

/// Evaluate `kind` against the event on stdin and emit the decision.
///
/// Never fails: unreadable input is treated as an allow. Returns the exit
/// code the host expects.
pub fn run(kind: HookKind) -> i32 {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        tracing::debug!(hook = %kind, error = %e, "failed to read stdin, allowing");
        return 0;
    }

    let decision = hooks::respond(kind, &raw, Utc::now());
    match &decision {
        Decision::Allow => {}
        Decision::Block(response) => println!("{}", response.to_json()),
        Decision::Warn(lines) => {
            for line in lines {
                eprintln!("{line}");
            }
        }
    }
    decision.exit_code()
}
