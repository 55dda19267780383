use serde::{Deserialize, Serialize};

pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    6
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Pagination {
    /// Clamps user input into a range the database accepts.
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}

/// Accepts `1`/`0` as well as `true`/`false` for boolean query flags.
pub fn parse_flag(raw: &str) -> Result<Option<bool>, String> {
    match raw.trim() {
        "" => Ok(None),
        "1" | "true" | "True" => Ok(Some(true)),
        "0" | "false" | "False" => Ok(Some(false)),
        other => Err(format!("invalid boolean flag `{}`", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_out_of_range_values() {
        let p = Pagination { limit: 10_000, offset: -3 }.normalized();
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.offset, 0);
        assert_eq!(Pagination { limit: 0, offset: 0 }.normalized().limit, 1);
    }

    #[test]
    fn flag_accepts_numeric_and_words() {
        assert_eq!(parse_flag("1"), Ok(Some(true)));
        assert_eq!(parse_flag("false"), Ok(Some(false)));
        assert_eq!(parse_flag(""), Ok(None));
        assert!(parse_flag("maybe").is_err());
    }
}
