//! `.env` loading
//!
//! Values from `./.env` are exported into the process environment before the
//! configuration is read. Variables already present in the environment are
//! left untouched.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

/// Load `./.env` into the process environment. Returns the number of
/// variables that were set.
pub fn load_dotenv() -> usize {
    load_dotenv_from(Path::new(".env"))
}

/// Load a specific dotenv file into the process environment.
pub fn load_dotenv_from(path: &Path) -> usize {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return 0,
    };

    let mut applied = 0;
    for (key, value) in parse_dotenv(&content) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, value);
            applied += 1;
        }
    }

    debug!(path = %path.display(), applied, "Loaded .env file");
    applied
}

/// Parse dotenv text into key/value pairs.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            // Unquoted values may carry a trailing comment
            value.split(" #").next().unwrap_or(value).trim_end()
        };

        map.insert(key.to_string(), value.to_string());
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_file() {
        let map = parse_dotenv(
            r#"
# Hugging Face token
HUGGINGFACE_API_KEY=hf_test123
DAPR_HTTP_PORT="3500"
export APP_PORT=8001
QUOTED='single'
EMPTY=
TRAILING=value # comment
"#,
        );

        assert_eq!(map.get("HUGGINGFACE_API_KEY").unwrap(), "hf_test123");
        assert_eq!(map.get("DAPR_HTTP_PORT").unwrap(), "3500");
        assert_eq!(map.get("APP_PORT").unwrap(), "8001");
        assert_eq!(map.get("QUOTED").unwrap(), "single");
        assert_eq!(map.get("EMPTY").unwrap(), "");
        assert_eq!(map.get("TRAILING").unwrap(), "value");
    }

    #[test]
    fn parse_skips_garbage_lines() {
        let map = parse_dotenv("not a pair\n=novalue\n");
        assert!(map.is_empty());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        assert_eq!(load_dotenv_from(Path::new("/nonexistent/.env")), 0);
    }

    #[test]
    fn existing_variables_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(
            &env_path,
            "FELLOWSHIP_DOTENV_TEST_KEEP=from_file\nFELLOWSHIP_DOTENV_TEST_NEW=fresh\n",
        )
        .unwrap();

        std::env::set_var("FELLOWSHIP_DOTENV_TEST_KEEP", "from_env");
        let applied = load_dotenv_from(&env_path);

        assert_eq!(applied, 1);
        assert_eq!(std::env::var("FELLOWSHIP_DOTENV_TEST_KEEP").unwrap(), "from_env");
        assert_eq!(std::env::var("FELLOWSHIP_DOTENV_TEST_NEW").unwrap(), "fresh");

        std::env::remove_var("FELLOWSHIP_DOTENV_TEST_KEEP");
        std::env::remove_var("FELLOWSHIP_DOTENV_TEST_NEW");
    }
}
