//! Live reload script injection.
//!
//! Only added to the pipeline by `serve`. Every HTML page gets a small
//! script that listens on the dev server's SSE endpoint and reloads the
//! page after a successful rebuild.

use crate::build::files::FileSet;
use crate::build::pipeline::{BuildContext, PipelineError, Stage};

/// Path of the server-sent events endpoint served by the dev server.
pub const LIVE_RELOAD_ENDPOINT: &str = "/_notesmith/live-reload";

fn script() -> String {
    format!(
        r#"<script>
(function() {{
  var source = new EventSource("{LIVE_RELOAD_ENDPOINT}");
  source.addEventListener("reload", function() {{ window.location.reload(); }});
}})();
</script>
"#
    )
}

/// Stage that injects the live reload client into HTML files.
pub struct LiveReloadStage;

fn inject(html: &str, script: &str) -> String {
    // Insert before the last closing body tag, or append when there is none
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..index]);
            out.push_str(script);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{html}{script}"),
    }
}

impl Stage for LiveReloadStage {
    fn name(&self) -> &'static str {
        "live-reload"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        let script = script();
        for (path, record) in files.iter_mut() {
            if !path.ends_with(".html") {
                continue;
            }
            let Ok(html) = record.text() else {
                continue;
            };
            record.contents = inject(html, &script).into_bytes();
        }
        Ok(())
    }
}
