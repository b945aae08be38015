//! `KEY:VALUE` / `KEY=VALUE` parameter parsing

use crate::config::Env;
use thiserror::Error;

/// A parsed command-line parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("invalid parameter '{0}' (expected KEY:VALUE or KEY=VALUE)")]
    MissingSeparator(String),

    #[error("invalid parameter '{0}' (key must not be empty or whitespace)")]
    EmptyKey(String),
}

/// Parse one parameter token
///
/// The token splits at the earliest `:` or `=`. The key is trimmed and must be
/// non-empty; the value is kept verbatim and may itself contain separators.
pub fn parse_param(token: &str) -> Result<Param, ParamError> {
    let idx = token
        .char_indices()
        .find(|&(_, c)| c == ':' || c == '=')
        .map(|(i, _)| i)
        .ok_or_else(|| ParamError::MissingSeparator(token.to_string()))?;

    let key = token[..idx].trim();
    if key.is_empty() {
        return Err(ParamError::EmptyKey(token.to_string()));
    }

    Ok(Param {
        key: key.to_string(),
        value: token[idx + 1..].to_string(),
    })
}

/// Parse parameter tokens into an environment map; later keys win
pub fn parse_params<S: AsRef<str>>(tokens: &[S]) -> Result<Env, ParamError> {
    let mut params = Env::with_capacity(tokens.len());
    for token in tokens {
        let Param { key, value } = parse_param(token.as_ref())?;
        params.insert(key, value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colon_and_equals_are_equivalent() {
        let colon = parse_params(&["KEY:VALUE"]).unwrap();
        let equals = parse_params(&["KEY=VALUE"]).unwrap();
        assert_eq!(colon, equals);
        assert_eq!(colon.len(), 1);
        assert_eq!(colon["KEY"], "VALUE");
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let p = parse_param("K:V1:V2").unwrap();
        assert_eq!(p.key, "K");
        assert_eq!(p.value, "V1:V2");

        let p = parse_param("URL=https://example.com/?a=b").unwrap();
        assert_eq!(p.key, "URL");
        assert_eq!(p.value, "https://example.com/?a=b");
    }

    #[test]
    fn test_earliest_separator_wins() {
        let p = parse_param("A=B:C").unwrap();
        assert_eq!((p.key.as_str(), p.value.as_str()), ("A", "B:C"));

        let p = parse_param("A:B=C").unwrap();
        assert_eq!((p.key.as_str(), p.value.as_str()), ("A", "B=C"));
    }

    #[test]
    fn test_key_trimmed_value_verbatim() {
        let p = parse_param("  VERSION : 2.1.0 ").unwrap();
        assert_eq!(p.key, "VERSION");
        assert_eq!(p.value, " 2.1.0 ");

        let p = parse_param("EMPTY=").unwrap();
        assert_eq!(p.value, "");
    }

    #[test]
    fn test_invalid_tokens() {
        assert_eq!(
            parse_param("novalue"),
            Err(ParamError::MissingSeparator("novalue".into()))
        );
        assert_eq!(parse_param(":value"), Err(ParamError::EmptyKey(":value".into())));
        assert_eq!(parse_param("  =value"), Err(ParamError::EmptyKey("  =value".into())));
    }

    #[test]
    fn test_parse_params_last_wins_and_stops_on_error() {
        let params = parse_params(&["A:1", "B=2", "A=3"]).unwrap();
        assert_eq!(params["A"], "3");
        assert_eq!(params["B"], "2");

        assert!(parse_params(&["A:1", "bad"]).is_err());
        assert!(parse_params::<&str>(&[]).unwrap().is_empty());
    }
}
