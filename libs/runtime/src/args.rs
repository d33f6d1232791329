use std::collections::HashMap;

use tracing::debug;

use crate::config::ArgSeparator;

const FALLBACK_SWITCH: &str = "--";

/// Split raw command-line tokens into `name -> value` pairs using the
/// switch prefix and separator declared by the parser descriptor.
///
/// With [`ArgSeparator::Space`] the value is the token following the switch,
/// unless that token is itself a switch (then the switch is a flag with an
/// empty value). With any other separator the switch token carries its own
/// value, split at the first separator. Later occurrences win.
pub fn parse_args<I, S>(args: I, switch: &str, separator: ArgSeparator) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let switch = if switch.is_empty() {
        FALLBACK_SWITCH
    } else {
        switch
    };

    let tokens: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
    let mut out = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;

        let Some(body) = token.strip_prefix(switch) else {
            debug!(token = %token, "ignoring argument without switch prefix");
            continue;
        };
        if body.is_empty() {
            continue;
        }

        match separator.as_char() {
            None => {
                let value = match tokens.get(i) {
                    Some(next) if !next.starts_with(switch) => {
                        i += 1;
                        next.clone()
                    }
                    _ => String::new(),
                };
                out.insert(body.to_string(), value);
            }
            Some(sep) => {
                let (name, value) = body.split_once(sep).unwrap_or((body, ""));
                out.insert(name.to_string(), value.to_string());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_separated_pairs() {
        let parsed = parse_args(
            ["--dbHost", "db.local", "--dbPort", "3307"],
            "--",
            ArgSeparator::Space,
        );
        assert_eq!(parsed["dbHost"], "db.local");
        assert_eq!(parsed["dbPort"], "3307");
    }

    #[test]
    fn space_mode_flag_without_value() {
        let parsed = parse_args(["--testMode", "--dbHost", "h"], "--", ArgSeparator::Space);
        assert_eq!(parsed["testMode"], "");
        assert_eq!(parsed["dbHost"], "h");

        let trailing = parse_args(["--verbose"], "--", ArgSeparator::Space);
        assert_eq!(trailing["verbose"], "");
    }

    #[test]
    fn equals_separator_splits_at_first_occurrence() {
        let parsed = parse_args(
            ["-url=mysql://u:p@h/db?x=1", "-name"],
            "-",
            ArgSeparator::Equals,
        );
        assert_eq!(parsed["url"], "mysql://u:p@h/db?x=1");
        assert_eq!(parsed["name"], "");
    }

    #[test]
    fn other_separators() {
        assert_eq!(
            parse_args(["--a,1"], "--", ArgSeparator::Comma)["a"],
            "1"
        );
        assert_eq!(
            parse_args(["--a:1"], "--", ArgSeparator::Colon)["a"],
            "1"
        );
        assert_eq!(
            parse_args(["--a;1"], "--", ArgSeparator::SemiColon)["a"],
            "1"
        );
    }

    #[test]
    fn tokens_without_switch_are_ignored() {
        let parsed = parse_args(["stray", "--k", "v", "extra"], "--", ArgSeparator::Space);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["k"], "v");
    }

    #[test]
    fn last_occurrence_wins() {
        let parsed = parse_args(["--k", "1", "--k", "2"], "--", ArgSeparator::Space);
        assert_eq!(parsed["k"], "2");
    }

    #[test]
    fn empty_switch_falls_back_to_double_dash() {
        let parsed = parse_args(["--k", "v"], "", ArgSeparator::Space);
        assert_eq!(parsed["k"], "v");
    }
}
