//! Path template expansion.
//!
//! Templates use positional `%N$s` placeholders (1-indexed). `%%` is a
//! literal percent sign. Every argument is escaped as a single URL path
//! segment before substitution.

use crate::{Error, Result};
use std::collections::BTreeSet;

/// Substitutes `args` into `template`.
///
/// A placeholder may appear more than once. Fails when a placeholder is
/// malformed, refers to a missing argument, or when some argument is never
/// referenced.
///
/// # Examples
///
/// ```
/// use telnyx::path::expand_path;
///
/// assert_eq!(expand_path("widgets/%1$s", &["abc"]).unwrap(), "widgets/abc");
/// assert_eq!(
///     expand_path("calls/%1$s/actions/%2$s", &["v3:a/b", "answer"]).unwrap(),
///     "calls/v3%3Aa%2Fb/actions/answer"
/// );
/// ```
pub fn expand_path<S>(template: &str, args: &[S]) -> Result<String>
where
    S: AsRef<str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut referenced = BTreeSet::new();

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
            continue;
        }

        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        let Some(after) = tail[digits..].strip_prefix("$s") else {
            return Err(Error::InvalidPath(format!(
                "malformed placeholder in `{template}`"
            )));
        };
        let index: usize = tail[..digits].parse().map_err(|_| {
            Error::InvalidPath(format!("placeholder without index in `{template}`"))
        })?;
        let arg = index
            .checked_sub(1)
            .and_then(|i| args.get(i))
            .ok_or_else(|| {
                Error::InvalidPath(format!(
                    "placeholder %{index}$s in `{template}` has no argument ({} given)",
                    args.len()
                ))
            })?;

        out.push_str(&urlencoding::encode(arg.as_ref()));
        referenced.insert(index);
        rest = after;
    }
    out.push_str(rest);

    if referenced.len() != args.len() {
        return Err(Error::InvalidPath(format!(
            "`{template}` references {} distinct arguments but {} were given",
            referenced.len(),
            args.len()
        )));
    }

    Ok(out)
}
