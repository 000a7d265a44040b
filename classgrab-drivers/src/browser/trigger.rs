//! Scripts for the in-page capture control.
//!
//! The control is a fixed button in the top-left corner. Clicking it sets a
//! window-scoped flag that the capture loop polls for; nothing on our side
//! ever writes the flag.

/// Reserved DOM id of the injected control.
pub const TRIGGER_ELEMENT_ID: &str = "classgrab-capture-trigger";

/// Window property set to `true` by a click on the control.
pub const SIGNAL_VARIABLE: &str = "__classgrabCaptureSignal";

/// Result of the inject script when the control was already there.
pub const INJECT_PRESENT: &str = "present";
/// Result of the inject script when it added the control.
pub const INJECT_CREATED: &str = "created";
/// Result of the inject script when the document has no body yet.
pub const INJECT_NO_BODY: &str = "no-body";

/// Pre-rendered scripts for one capture run.
#[derive(Debug, Clone)]
pub struct TriggerScripts {
    inject: String,
    read_signal: String,
}

impl TriggerScripts {
    pub fn new(label: &str, ack_label: &str) -> Self {
        Self {
            inject: render_inject(label, ack_label),
            read_signal: format!("return window.{SIGNAL_VARIABLE} === true;"),
        }
    }

    /// Idempotent upsert of the control, keyed by [`TRIGGER_ELEMENT_ID`].
    pub fn inject(&self) -> &str {
        &self.inject
    }

    pub fn read_signal(&self) -> &str {
        &self.read_signal
    }
}

// Labels go through JSON encoding so quotes and non-ASCII text stay valid JS.
fn render_inject(label: &str, ack_label: &str) -> String {
    let id = js_string(TRIGGER_ELEMENT_ID);
    let label = js_string(label);
    let ack = js_string(ack_label);
    format!(
        r#"
        return (function() {{
            if (document.getElementById({id})) return "{INJECT_PRESENT}";
            if (!document.body) return "{INJECT_NO_BODY}";
            var btn = document.createElement('button');
            btn.id = {id};
            btn.textContent = {label};
            btn.style.position = 'fixed';
            btn.style.top = '10px';
            btn.style.left = '10px';
            btn.style.zIndex = '999999';
            btn.style.padding = '10px 20px';
            btn.style.backgroundColor = '#0078d4';
            btn.style.color = 'white';
            btn.style.border = 'none';
            btn.style.borderRadius = '5px';
            btn.style.cursor = 'pointer';
            btn.style.boxShadow = '0 2px 5px rgba(0,0,0,0.3)';
            btn.onclick = function() {{
                window.{SIGNAL_VARIABLE} = true;
                this.textContent = {ack};
                this.style.backgroundColor = '#ccc';
            }};
            document.body.appendChild(btn);
            return "{INJECT_CREATED}";
        }})();
        "#
    )
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
