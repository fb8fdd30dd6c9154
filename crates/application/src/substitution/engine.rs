//! Substitution engine
//!
//! Replaces placeholders in a single left-to-right pass. Inserted values are
//! never re-scanned, so a value containing `{{...}}` cannot cause further
//! expansion.

use std::borrow::Cow;

use hostvar_domain::Variable;
use serde::{Deserialize, Serialize};

use super::parser::find_placeholders;

/// Outcome of substituting a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// The resulting text.
    pub text: String,

    /// False when the text came back unchanged. Callers skip writing state
    /// back in that case to avoid spurious change notifications.
    pub changed: bool,
}

impl Substitution {
    /// An unchanged result.
    #[must_use]
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed: false,
        }
    }
}

/// Looks up the first enabled variable with this exact key.
fn lookup<'v>(variables: &'v [Variable], name: &str) -> Option<&'v Variable> {
    variables.iter().find(|v| v.enabled && v.key == name)
}

/// Replaces every `{{key}}` whose key belongs to an enabled variable.
///
/// Placeholders without an enabled match are left verbatim. Returns
/// [`Cow::Borrowed`] when nothing was replaced.
#[must_use]
pub fn replace_variables<'a>(text: &'a str, variables: &[Variable]) -> Cow<'a, str> {
    if variables.is_empty() {
        return Cow::Borrowed(text);
    }

    let mut output: Option<String> = None;
    let mut last_end = 0;

    for placeholder in find_placeholders(text) {
        let Some(variable) = lookup(variables, &placeholder.name) else {
            continue;
        };

        let out = output.get_or_insert_with(|| String::with_capacity(text.len()));
        out.push_str(&text[last_end..placeholder.span.start]);
        out.push_str(&variable.value);
        last_end = placeholder.span.end;
    }

    match output {
        Some(mut out) => {
            out.push_str(&text[last_end..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}

/// Like [`replace_variables`] but reports whether the text changed.
#[must_use]
pub fn substitute(text: &str, variables: &[Variable]) -> Substitution {
    match replace_variables(text, variables) {
        Cow::Borrowed(_) => Substitution::unchanged(text),
        Cow::Owned(replaced) => {
            let changed = replaced != text;
            Substitution {
                text: replaced,
                changed,
            }
        }
    }
}
