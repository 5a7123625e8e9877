//! The utilities module provides general capabilities that span the
//! kernel, mirroring, causality, and model modules.  The utilities are
//! centered around errors and naming.

pub mod errors;

/// Produce a name starting with `prefix` that is not yet taken.  The prefix
/// itself is returned when it is free; otherwise any trailing digits are
/// stripped and an increasing index, starting at 2, is appended.
pub fn unique_name<F>(prefix: &str, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !prefix.is_empty() && !is_taken(prefix) {
        return prefix.to_string();
    }
    let stem = prefix.trim_end_matches(|c: char| c.is_ascii_digit());
    let stem = if stem.is_empty() { "entity" } else { stem };
    (2..)
        .map(|index| format!("{}{}", stem, index))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| stem.to_string())
}

/// When the `console_error_panic_hook` feature is enabled, we can call the
/// `set_panic_hook` function at least once during initialization, and then
/// we will get better error messages if our code ever panics.
///
/// For more details see
/// <https://github.com/rustwasm/console_error_panic_hook#readme>
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_keeps_free_prefix() {
        assert_eq!(unique_name("state", |_| false), "state");
    }

    #[test]
    fn unique_name_appends_index() {
        let taken = ["state", "state2", "state3"];
        assert_eq!(unique_name("state", |name| taken.contains(&name)), "state4");
    }

    #[test]
    fn unique_name_strips_trailing_digits() {
        let taken = ["in1"];
        assert_eq!(unique_name("in1", |name| taken.contains(&name)), "in2");
    }
}
