//! Minimal filter script engine.
//!
//! [`MacroEngine`] understands the macro layer of the host's script language
//! only: `{{var::entry}}` expands to the row's entry JSON and the expanded text
//! is coerced to a boolean the way the host coerces pipe results (`true`, `on`
//! and `1` keep the row). Embedders with a full script runtime plug in their own
//! [`ScriptEngine`].

use super::ScriptEngine;
use crate::domain::error::{DrawerError, Result};

/// Variable the row's entry JSON is bound to.
pub const ENTRY_VARIABLE: &str = "entry";

/// Substitution-only script engine.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::host::{MacroEngine, ScriptEngine};
///
/// let mut engine = MacroEngine;
/// assert!(engine.evaluate("true", "{}")?);
/// assert!(!engine.evaluate("{{var::entry}}", r#"{"uid":1}"#)?);
/// assert!(engine.compile("{{var::entry").is_err());
/// # Ok::<(), lorebook_drawer::DrawerError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroEngine;

impl MacroEngine {
    fn expand(script: &str, input: &str) -> Result<String> {
        let mut out = String::with_capacity(script.len());
        let mut rest = script;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| DrawerError::Script(format!("unclosed macro at byte {start}")))?;
            let name = after[..end].trim();
            match name.strip_prefix("var::") {
                Some(var) if var == ENTRY_VARIABLE => out.push_str(input),
                _ => return Err(DrawerError::Script(format!("unknown macro {{{{{name}}}}}"))),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Host boolean coercion of a script result.
#[must_use]
pub fn is_true_boolean(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "on" | "1")
}

impl ScriptEngine for MacroEngine {
    fn compile(&mut self, script: &str) -> Result<()> {
        Self::expand(script, "").map(|_| ())
    }

    fn evaluate(&mut self, script: &str, input: &str) -> Result<bool> {
        Ok(is_true_boolean(&Self::expand(script, input)?))
    }
}
