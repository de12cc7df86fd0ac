use crate::models::OptionSet;

/// Keeps at most `n` options, preserving order. Never synthesizes entries.
pub fn bound<T>(mut options: Vec<T>, n: usize) -> Vec<T> {
    options.truncate(n);
    options
}

/// Applies the kind's promised count to an option set and flags short sets.
pub fn bound_set(set: OptionSet) -> OptionSet {
    let promised = set.kind.option_count();
    let returned = set.options.len();
    let options = bound(set.options, promised);
    if returned != promised {
        tracing::info!(
            kind = set.kind.as_str(),
            returned,
            promised,
            "model returned an unexpected number of options"
        );
    }
    OptionSet {
        kind: set.kind,
        partial: options.len() < promised,
        options,
    }
}
