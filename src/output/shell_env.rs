use crate::docker::EnvSnapshot;

const EXPORT: &str = "export";

/// Parse the output of `docker-machine env --shell=sh/bash` into variables.
///
/// Expects lines such as:
/// ```text
/// export DOCKER_TLS_VERIFY="1"
/// export DOCKER_HOST="tcp://192.168.99.100:2376"
/// # Run this command to configure your shell:
/// # eval $(docker-machine env default)
/// ```
///
/// Anything that is not an `export NAME=value` line is skipped. Later
/// assignments to the same name win.
pub fn parse_export_script(script: &str) -> EnvSnapshot {
    script.lines().filter_map(parse_export_line).collect()
}

/// Parse a single line, returning `None` for lines that assign nothing.
fn parse_export_line(line: &str) -> Option<(String, String)> {
    let rest = line.trim().strip_prefix(EXPORT)?;
    // `export` must be a whole token: `exported=1` is not an export.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let (name, value) = rest.split_once('=')?;
    Some((name.trim().to_string(), strip_quotes(value.trim()).to_string()))
}

/// Drop one layer of double quotes: the first and the last character.
///
/// No escape processing happens and the closing quote is not checked.
fn strip_quotes(value: &str) -> &str {
    match value.strip_prefix('"') {
        Some(inner) => {
            let mut chars = inner.chars();
            chars.next_back();
            chars.as_str()
        }
        None => value,
    }
}
