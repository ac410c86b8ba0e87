/// Mirrors the façade's own project-name derivation (lowercase,
/// non-alphanumerics mapped to `-`) so the planner's SA bundle `namespace`
/// file and the server's own namespace resolution never disagree.
pub fn project_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}
