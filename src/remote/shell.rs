//! POSIX shell quoting for command text built from caller input.

/// Quotes `value` so `sh` treats it as one literal word.
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Joins words into a command line, quoting each one.
pub fn join<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| quote(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words_unquoted() {
        assert_eq!(quote("minios3/test2"), "minios3/test2");
        assert_eq!(
            quote("node-role.kubernetes.io/worker=worker"),
            "node-role.kubernetes.io/worker=worker"
        );
    }

    #[test]
    fn test_special_words_quoted() {
        assert_eq!(quote(""), "''");
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("Foobar's Access Key"), "'Foobar'\\''s Access Key'");
        assert_eq!(quote("$(id)"), "'$(id)'");
    }

    #[test]
    fn test_join() {
        assert_eq!(
            join(["mcli", "admin", "user", "add", "minios3", "u", "p w"]),
            "mcli admin user add minios3 u 'p w'"
        );
    }
}
