//! Rendering of dialect templates.
//!
//! Templates carry indexed slots (`{0}`, `{1}`, ...). Rendering is a single left-to-right
//! pass over the template: substituted text is never scanned again, so values containing
//! braces (JSON objects) come through verbatim. Nothing is escaped here.

use crate::error::{Result, SearchError};

/// Fill the indexed slots of `template` with `args`.
///
/// Every slot must refer to an existing argument. Braces that do not form a slot
/// are copied as-is.
pub fn render(template: &str, args: &[&str]) -> Result<String> {
    let extra: usize = args.iter().map(|a| a.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            let index: usize = after[..digits]
                .parse()
                .map_err(|_| SearchError::config(format!("bad template slot in '{}'", template)))?;
            let arg = args.get(index).ok_or_else(|| {
                SearchError::config(format!(
                    "template slot {{{}}} has no argument ({} given): '{}'",
                    index,
                    args.len(),
                    template
                ))
            })?;
            out.push_str(arg);
            rest = &after[digits + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Highest slot index referenced by a template plus one.
pub fn arity(template: &str) -> usize {
    let mut max = 0;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            if let Ok(index) = after[..digits].parse::<usize>() {
                max = max.max(index + 1);
            }
        }
        rest = after;
    }
    max
}
