//! Environment layering and truthiness

use crate::config::Env;
use std::ffi::OsString;

/// Merge environment maps in order; later maps win
pub fn merge_env(maps: &[&Env]) -> Env {
    let mut merged = Env::with_capacity(maps.iter().map(|m| m.len()).sum());
    for map in maps {
        for (key, value) in map.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Whether a value is explicitly truthy
///
/// Truthy: `1`, `true`, `yes`, `y`, `on` (case-insensitive, surrounding
/// whitespace ignored). Everything else, including the empty string, is false.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Look up a condition variable, falling back to the process environment
pub fn lookup_var(env: &Env, key: &str) -> String {
    match env.get(key) {
        Some(value) => value.clone(),
        None => std::env::var(key).unwrap_or_default(),
    }
}

/// Overlay overrides onto an inherited environment
///
/// Only the override keys are indexed; unrelated inherited variables pass
/// through untouched and keep their order. New keys are appended.
pub fn overlay_env(mut base: Vec<(OsString, OsString)>, overrides: &Env) -> Vec<(OsString, OsString)> {
    if overrides.is_empty() {
        return base;
    }

    let mut positions: std::collections::HashMap<&str, usize> =
        std::collections::HashMap::with_capacity(overrides.len());
    let mut remaining = overrides.len();

    for (i, (key, _)) in base.iter().enumerate() {
        let Some(key) = key.to_str() else {
            continue;
        };
        let Some((wanted, _)) = overrides.get_key_value(key) else {
            continue;
        };
        if !positions.contains_key(wanted.as_str()) {
            positions.insert(wanted.as_str(), i);
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
    }

    for (key, value) in overrides {
        match positions.get(key.as_str()) {
            Some(&i) => base[i].1 = OsString::from(value),
            None => base.push((OsString::from(key), OsString::from(value))),
        }
    }

    base
}

/// Inherited process environment with overrides applied
pub fn child_env(overrides: &Env) -> Vec<(OsString, OsString)> {
    overlay_env(std::env::vars_os().collect(), overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Env {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_later_wins() {
        let definition = env(&[("A", "1")]);
        let workflow = env(&[("A", "2"), ("B", "3")]);
        let params = env(&[("A", "4")]);

        let merged = merge_env(&[&definition, &workflow, &params]);
        assert_eq!(merged["A"], "4");
        assert_eq!(merged["B"], "3");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_env(&[]).is_empty());
        assert!(merge_env(&[&Env::new(), &Env::new()]).is_empty());
    }

    #[test]
    fn test_merge_keeps_values_verbatim() {
        let merged = merge_env(&[&env(&[("X", " a:b ")]), &env(&[("Y", "")])]);
        assert_eq!(merged["X"], " a:b ");
        assert_eq!(merged["Y"], "");
    }

    #[test]
    fn test_is_truthy() {
        for value in ["1", "true", "TRUE", "True", "yes", "YES", "y", "Y", "on", "ON", " yes "] {
            assert!(is_truthy(value), "{:?} should be truthy", value);
        }
        for value in ["0", "false", "no", "n", "off", "", "  ", "2", "enabled", "truthy"] {
            assert!(!is_truthy(value), "{:?} should be falsy", value);
        }
    }

    #[test]
    fn test_lookup_var_prefers_composed_env() {
        let composed = env(&[("PATH", "overridden")]);
        assert_eq!(lookup_var(&composed, "PATH"), "overridden");
        assert_eq!(lookup_var(&Env::new(), "ASC_WORKFLOW_SURELY_UNSET_VAR"), "");
    }

    #[test]
    fn test_overlay_replaces_in_place_and_appends() {
        let base = vec![
            (OsString::from("HOME"), OsString::from("/home/me")),
            (OsString::from("A"), OsString::from("old")),
            (OsString::from("PATH"), OsString::from("/bin")),
        ];
        let overrides = env(&[("A", "new"), ("B", "added")]);

        let result = overlay_env(base, &overrides);
        assert_eq!(result.len(), 4);
        assert_eq!(result[0], (OsString::from("HOME"), OsString::from("/home/me")));
        assert_eq!(result[1], (OsString::from("A"), OsString::from("new")));
        assert_eq!(result[2], (OsString::from("PATH"), OsString::from("/bin")));
        assert_eq!(result[3], (OsString::from("B"), OsString::from("added")));
    }

    #[test]
    fn test_overlay_without_overrides_is_identity() {
        let base = vec![(OsString::from("HOME"), OsString::from("/home/me"))];
        assert_eq!(overlay_env(base.clone(), &Env::new()), base);
    }

    #[test]
    fn test_overlay_duplicate_base_key_overrides_first() {
        let base = vec![
            (OsString::from("A"), OsString::from("1")),
            (OsString::from("A"), OsString::from("2")),
        ];
        let result = overlay_env(base, &env(&[("A", "3")]));
        assert_eq!(result[0].1, OsString::from("3"));
        assert_eq!(result[1].1, OsString::from("2"));
    }
}
