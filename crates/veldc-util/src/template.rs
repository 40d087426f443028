//! `FROM`/`TO` message templating.

/// Substitutes `FROM` and `TO` in an error message template with two type
/// names.
///
/// Implicit casts happen in many places (assignments, function arguments,
/// conditions), and each caller wants its own wording with the two type
/// names in an arbitrary order, so a plain format string does not fit.
/// The template is scanned left to right; substituted text is never
/// rescanned, so a type whose name happens to contain `TO` cannot corrupt
/// the output.
///
/// # Example
///
/// ```
/// use veldc_util::render_cast_template;
///
/// let msg = render_cast_template(
///     "cannot assign a value of type FROM to a variable of type TO",
///     "int",
///     "byte",
/// );
/// assert_eq!(msg, "cannot assign a value of type int to a variable of type byte");
/// ```
pub fn render_cast_template(template: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(template.len() + from.len() + to.len());
    let mut rest = template;
    loop {
        if let Some(tail) = rest.strip_prefix("FROM") {
            out.push_str(from);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("TO") {
            out.push_str(to);
            rest = tail;
        } else {
            let mut chars = rest.chars();
            match chars.next() {
                Some(c) => {
                    out.push(c);
                    rest = chars.as_str();
                }
                None => break,
            }
        }
    }
    out
}
