//! Static HTML status page rendered from `CONTEXT.md`.

use crate::config::Config;
use crate::context_doc::{recent_decisions, status_class, ContextDoc, DecisionRecord};
use crate::error::Result;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const RECENT_DECISIONS: usize = 5;
const MAX_ACTIONS: usize = 4;

const QUICK_LINKS: &[(&str, &str)] = &[
    ("CONTEXT.md", "CONTEXT"),
    ("WORKFLOW.md", "WORKFLOW"),
    (".claude/README.md", "HOOKS"),
    ("docs/systems/", "SYSTEMS"),
    ("docs/reference/", "REFERENCES"),
    ("docs/decisions/", "DECISIONS"),
    ("calculations/", "CALCS"),
];

#[derive(Debug, Clone)]
pub struct DashboardData {
    pub project_name: String,
    pub description: Option<String>,
    pub context: ContextDoc,
    pub decisions: Vec<DecisionRecord>,
    pub generated_at: DateTime<Utc>,
}

/// What was written, for the CLI to report.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub path: PathBuf,
    pub systems: usize,
    pub parameters: usize,
    pub decisions: usize,
    pub completion_percent: u32,
}

impl DashboardData {
    pub fn collect(root: &Path, now: DateTime<Utc>) -> Result<Self> {
        let (project_name, description) = match Config::load(root) {
            Ok(cfg) => (cfg.project.name, cfg.project.description),
            Err(_) => (crate::scaffold::project_name_from_dir(root), None),
        };
        Ok(Self {
            project_name,
            description,
            context: ContextDoc::load(root)?,
            decisions: recent_decisions(root, RECENT_DECISIONS)?,
            generated_at: now,
        })
    }
}

/// Collect, render and atomically write the dashboard. `output` defaults
/// to `<root>/dashboard.html`.
pub fn write_dashboard(
    root: &Path,
    output: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<DashboardSummary> {
    let data = DashboardData::collect(root, now)?;
    let path = match output {
        Some(out) if out.is_relative() => root.join(out),
        Some(out) => out.to_path_buf(),
        None => paths::dashboard_path(root),
    };
    crate::io::atomic_write(&path, render(&data).as_bytes())?;
    tracing::info!(path = %path.display(), "dashboard written");
    Ok(DashboardSummary {
        path,
        systems: data.context.systems.len(),
        parameters: data.context.parameters.len(),
        decisions: data.decisions.len(),
        completion_percent: data.context.completion_percent(),
    })
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(data: &DashboardData) -> String {
    let ctx = &data.context;
    let name = escape_html(&data.project_name);
    let completion = ctx.completion_percent();
    let mut body = String::new();

    let _ = write!(
        body,
        r#"<header>
  <h1 class="glow">{name}</h1>
  <p class="subtitle">{}</p>
</header>
<div class="status-bar">
  <div class="phase">Phase: {}</div>
  <div class="completion">
    <div class="completion-bar"><div class="completion-fill" style="width: {completion}%"></div></div>
    <span class="completion-text">{completion}% COMPLETE</span>
  </div>
</div>
"#,
        escape_html(data.description.as_deref().unwrap_or("Engineering project")),
        escape_html(&ctx.phase),
    );

    if ctx.has_blockers() {
        let _ = writeln!(
            body,
            r#"<div class="alert"><strong>⚠ BLOCKING:</strong> {}</div>"#,
            escape_html(&ctx.blocking)
        );
    } else {
        body.push_str(
            r#"<div class="success"><strong>✓ STATUS:</strong> No blocking issues</div>"#,
        );
        body.push('\n');
    }

    body.push_str("<div class=\"grid\">\n");
    let _ = write!(
        body,
        r#"<div class="panel">
  <h2>// Telemetry</h2>
  <div class="metric"><span class="metric-label">Total Systems</span><span class="metric-value">{}</span></div>
  <div class="metric"><span class="metric-label">Completed</span><span class="metric-value">{}</span></div>
  <div class="metric"><span class="metric-label">In Progress</span><span class="metric-value">{}</span></div>
  <div class="metric"><span class="metric-label">Parameters Locked</span><span class="metric-value">{}</span></div>
</div>
"#,
        ctx.systems.len(),
        ctx.completed_systems(),
        ctx.in_progress_systems(),
        ctx.parameters.len(),
    );

    body.push_str("<div class=\"panel\">\n  <h2>// Priority Queue</h2>\n  <ul class=\"actions-list\">\n");
    if ctx.next_actions.is_empty() {
        body.push_str("    <li>No actions queued</li>\n");
    }
    for action in ctx.next_actions.iter().take(MAX_ACTIONS) {
        let _ = writeln!(body, "    <li>{}</li>", escape_html(action));
    }
    body.push_str("  </ul>\n</div>\n");

    body.push_str("<div class=\"panel\">\n  <h2>// Navigation</h2>\n  <div class=\"quick-links\">\n");
    for (href, label) in QUICK_LINKS {
        let _ = writeln!(body, r#"    <a href="{href}" class="quick-link">{label}</a>"#);
    }
    body.push_str("  </div>\n</div>\n");

    body.push_str("<div class=\"panel\">\n  <h2>// Recent Decisions</h2>\n  <ul class=\"actions-list\">\n");
    if data.decisions.is_empty() {
        body.push_str("    <li>No decisions recorded</li>\n");
    }
    for d in &data.decisions {
        let _ = writeln!(
            body,
            r#"    <li><a href="docs/decisions/{}.md">{}</a>: {}</li>"#,
            escape_html(&d.id),
            escape_html(&d.id),
            escape_html(&d.title)
        );
    }
    body.push_str("  </ul>\n</div>\n</div>\n");

    body.push_str(&table(
        "// System Matrix",
        ["System", "Status", "Documentation"],
        ctx.systems.iter().map(|s| {
            [
                format!("<strong>{}</strong>", escape_html(&s.name)),
                format!(
                    r#"<span class="status-badge {}">{}</span>"#,
                    status_class(&s.status).css_class(),
                    escape_html(&s.status)
                ),
                escape_html(&s.documentation),
            ]
        }),
    ));

    body.push_str(&table(
        "// Critical Parameters",
        ["Parameter", "Value", "Source"],
        ctx.parameters.iter().map(|p| {
            [
                format!("<strong>{}</strong>", escape_html(&p.name)),
                format!(r#"<span class="param-value">{}</span>"#, escape_html(&p.value)),
                format!(r#"<span class="dim">{}</span>"#, escape_html(&p.source)),
            ]
        }),
    ));

    let _ = write!(
        body,
        "<div class=\"timestamp\">TELEMETRY TIMESTAMP // {}</div>\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{name} // PROJECT TELEMETRY</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
{body}</div>
</body>
</html>
"#
    )
}

fn table<I>(title: &str, headers: [&str; 3], rows: I) -> String
where
    I: IntoIterator<Item = [String; 3]>,
{
    let mut out = String::new();
    let _ = write!(
        out,
        "<div class=\"panel wide\">\n  <h2>{title}</h2>\n  <table>\n    <thead><tr>"
    );
    for h in headers {
        let _ = write!(out, "<th>{h}</th>");
    }
    out.push_str("</tr></thead>\n    <tbody>\n");
    for row in rows {
        out.push_str("      <tr>");
        for cell in row {
            let _ = write!(out, "<td>{cell}</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("    </tbody>\n  </table>\n</div>\n");
    out
}

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
:root {
  --primary: #00ff9d; --secondary: #00d4ff; --accent: #ff006e; --warning: #ffb800;
  --bg-dark: #0a0e1a; --bg-panel: #0f1420; --bg-elevated: #151b2b;
  --text: #e8f4f8; --text-dim: #7a8a99; --border: rgba(0, 255, 157, 0.3);
}
@keyframes flicker { 0%, 100% { opacity: 1; } 50% { opacity: 0.97; } }
@keyframes pulse { 0%, 100% { opacity: 1; } 50% { opacity: 0.6; } }
body { font-family: 'JetBrains Mono', ui-monospace, monospace; background: var(--bg-dark); color: var(--text); line-height: 1.6; }
a { color: inherit; }
.container { max-width: 1600px; margin: 0 auto; padding: 2rem; }
header { margin-bottom: 3rem; border-left: 4px solid var(--primary); padding-left: 2rem; }
h1 { font-size: 3rem; font-weight: 900; color: var(--primary); text-transform: uppercase; line-height: 1; margin-bottom: 0.5rem; text-shadow: 0 0 20px rgba(0, 255, 157, 0.5); }
.subtitle { font-size: 0.9rem; color: var(--text-dim); letter-spacing: 1px; text-transform: uppercase; }
.status-bar { background: linear-gradient(135deg, var(--bg-elevated), var(--bg-panel)); border: 1px solid var(--border); padding: 1.5rem 2rem; margin-bottom: 2rem; display: flex; justify-content: space-between; align-items: center; }
.phase { font-size: 1.1rem; color: var(--primary); font-weight: 700; text-transform: uppercase; letter-spacing: 1px; }
.completion { display: flex; align-items: center; gap: 1rem; }
.completion-bar { width: 200px; height: 8px; background: var(--bg-dark); border: 1px solid var(--border); overflow: hidden; }
.completion-fill { height: 100%; background: linear-gradient(90deg, var(--primary), var(--secondary)); box-shadow: 0 0 10px var(--primary); }
.completion-text { font-size: 0.9rem; color: var(--text-dim); }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 1.5rem; margin-bottom: 2rem; }
.panel { background: var(--bg-panel); border: 1px solid var(--border); padding: 1.5rem; margin-bottom: 1.5rem; }
.panel:hover { border-color: var(--primary); box-shadow: 0 0 20px rgba(0, 255, 157, 0.2); }
.panel h2 { font-size: 0.9rem; color: var(--primary); text-transform: uppercase; letter-spacing: 2px; margin-bottom: 1.5rem; }
.metric { display: flex; justify-content: space-between; padding: 0.75rem 0; border-bottom: 1px solid rgba(255, 255, 255, 0.05); font-size: 0.85rem; }
.metric-label, .dim { color: var(--text-dim); }
.metric-value, .param-value { color: var(--secondary); font-weight: 700; }
.alert { border: 1px solid var(--accent); border-left: 4px solid var(--accent); padding: 1rem 1.5rem; margin-bottom: 2rem; animation: pulse 2s ease-in-out infinite; }
.alert strong { color: var(--accent); }
.success { border: 1px solid var(--primary); border-left: 4px solid var(--primary); padding: 1rem 1.5rem; margin-bottom: 2rem; }
.success strong { color: var(--primary); }
.actions-list { list-style: none; }
.actions-list li { padding: 0.75rem 0 0.75rem 1.5rem; border-bottom: 1px solid rgba(255, 255, 255, 0.05); position: relative; font-size: 0.85rem; }
.actions-list li::before { content: '▸'; position: absolute; left: 0; color: var(--primary); }
table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
thead { background: var(--bg-elevated); }
th { text-align: left; padding: 1rem; font-size: 0.75rem; color: var(--primary); text-transform: uppercase; border-bottom: 2px solid var(--border); }
td { padding: 1rem; border-bottom: 1px solid rgba(255, 255, 255, 0.05); }
.status-badge { display: inline-block; padding: 0.25rem 0.75rem; font-size: 0.7rem; font-weight: 700; text-transform: uppercase; border: 1px solid; }
.status-complete { color: var(--primary); border-color: var(--primary); }
.status-progress { color: var(--secondary); border-color: var(--secondary); }
.status-pending { color: var(--warning); border-color: var(--warning); }
.status-blocked { color: var(--accent); border-color: var(--accent); }
.quick-links { display: grid; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr)); gap: 1rem; }
.quick-link { display: block; background: var(--bg-elevated); padding: 1rem; text-align: center; text-decoration: none; border: 1px solid var(--border); font-size: 0.85rem; }
.quick-link:hover { border-color: var(--primary); color: var(--primary); }
.wide { grid-column: 1 / -1; }
.timestamp { text-align: right; color: var(--text-dim); font-size: 0.75rem; margin-top: 3rem; letter-spacing: 1px; }
.glow { animation: flicker 3s ease-in-out infinite; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const CONTEXT: &str = "\
## Project State

**Current Phase:** Detailed <design>

**Blocking Issues:**

None

**Next Actions:**

- [ ] Order Inconel & test coupons

## Critical Parameters

| Parameter | Value | Source |
|---|---|---|
| Thrust | 150 N | Requirement |

## System Status

| System | Status | Documentation |
|---|---|---|
| combustor | Complete | docs/systems/combustor |
| nozzle | Research | - |
";

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn render_escapes_and_reports_completion() {
        let data = DashboardData {
            project_name: "pump <v2>".to_string(),
            description: None,
            context: ContextDoc::parse(CONTEXT),
            decisions: vec![],
            generated_at: fixed_now(),
        };
        let html = render(&data);
        assert!(html.contains("<title>pump &lt;v2&gt; // PROJECT TELEMETRY</title>"));
        assert!(html.contains("Phase: Detailed &lt;design&gt;"));
        assert!(html.contains("Order Inconel &amp; test coupons"));
        assert!(html.contains("50% COMPLETE"));
        assert!(html.contains("status-badge status-complete"));
        assert!(html.contains("status-badge status-progress"));
        assert!(html.contains("No blocking issues"));
        assert!(html.contains("No decisions recorded"));
        assert!(html.contains("2026-03-09 12:00:00 UTC"));
    }

    #[test]
    fn blockers_render_an_alert() {
        let mut context = ContextDoc::parse(CONTEXT);
        context.blocking = "Vendor quote <late>".to_string();
        let data = DashboardData {
            project_name: "pump".to_string(),
            description: Some("Test rig".to_string()),
            context,
            decisions: vec![],
            generated_at: fixed_now(),
        };
        let html = render(&data);
        assert!(html.contains(r#"<div class="alert"><strong>⚠ BLOCKING:</strong> Vendor quote &lt;late&gt;</div>"#));
        assert!(html.contains("Test rig"));
    }

    #[test]
    fn write_dashboard_uses_config_name_and_decisions() {
        let dir = TempDir::new().unwrap();
        Config::new("hot-section").save(dir.path()).unwrap();
        std::fs::write(dir.path().join("CONTEXT.md"), CONTEXT).unwrap();
        std::fs::create_dir_all(dir.path().join("docs/decisions")).unwrap();
        std::fs::write(
            dir.path().join("docs/decisions/DEC-001.md"),
            "# Use Inconel 718 liner\n",
        )
        .unwrap();

        let summary = write_dashboard(dir.path(), None, fixed_now()).unwrap();
        assert_eq!(summary.path, dir.path().join("dashboard.html"));
        assert_eq!(summary.systems, 2);
        assert_eq!(summary.parameters, 1);
        assert_eq!(summary.decisions, 1);
        assert_eq!(summary.completion_percent, 50);

        let html = std::fs::read_to_string(&summary.path).unwrap();
        assert!(html.contains("<h1 class=\"glow\">hot-section</h1>"));
        assert!(html.contains("Use Inconel 718 liner"));
    }

    #[test]
    fn write_dashboard_without_context_still_renders() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out/status.html");
        let summary = write_dashboard(dir.path(), Some(&out), fixed_now()).unwrap();
        assert_eq!(summary.completion_percent, 0);
        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("Phase: Unknown"));
        assert!(html.contains("No actions queued"));
    }

    #[test]
    fn relative_output_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        let summary =
            write_dashboard(dir.path(), Some(Path::new("reports/status.html")), fixed_now())
                .unwrap();
        assert_eq!(summary.path, dir.path().join("reports/status.html"));
        assert!(summary.path.is_file());
    }
}
