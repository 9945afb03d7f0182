//! Splits a Markdown document into its YAML front matter and its body. A
//! document must be structured as follows:
//!
//! 1. Initial frontmatter fence (`---`)
//! 2. YAML frontmatter
//! 3. Terminal frontmatter fence (`---`, on its own line)
//! 4. Body
//!
//! For example:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021/04/16
//! tags: [greet]
//! ---
//! # Hello
//!
//! World
//! ```

use serde_yaml::Value;
use thiserror::Error;

const FENCE: &str = "---";
const END_FENCE: &str = "\n---";

/// A document split into its raw parts.
#[derive(Debug, PartialEq, Eq)]
pub struct Split<'a> {
    pub yaml: &'a str,
    pub body: &'a str,
}

/// Splits `input` into front matter and body without parsing either.
pub fn split(input: &str) -> Result<Split<'_>> {
    let input = input.trim_start_matches('\u{feff}');
    if !input.starts_with(FENCE) {
        return Err(Error::MissingStartFence);
    }
    let rest = &input[FENCE.len()..];
    match rest.find(END_FENCE) {
        None => Err(Error::MissingEndFence),
        Some(offset) => {
            let after = &rest[offset + END_FENCE.len()..];
            Ok(Split {
                yaml: &rest[..offset],
                // the body starts on the line after the terminal fence
                body: match after.find('\n') {
                    Some(i) => &after[i + 1..],
                    None => "",
                },
            })
        }
    }
}

/// Splits `input` and parses the front matter. An empty front matter block
/// yields [`Value::Null`].
pub fn parse(input: &str) -> Result<(Value, &str)> {
    let Split { yaml, body } = split(input)?;
    if yaml.trim().is_empty() {
        return Ok((Value::Null, body));
    }
    Ok((serde_yaml::from_str(yaml)?, body))
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading front matter.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a document is missing its starting frontmatter fence.
    #[error("document must begin with `---`")]
    MissingStartFence,

    /// Returned when the starting fence was found but the terminal one was
    /// missing.
    #[error("missing closing `---`")]
    MissingEndFence,

    /// Returned when the front matter isn't valid YAML.
    #[error("invalid front matter: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_split() -> Result<()> {
        let input = indoc! {"
            ---
            title: Hello
            ---
            # Body
        "};
        assert_eq!(
            Split {
                yaml: "\ntitle: Hello",
                body: "# Body\n",
            },
            split(input)?
        );
        Ok(())
    }

    #[test]
    fn test_fence_must_start_a_line() -> Result<()> {
        let input = "---\ntitle: a---b\n---\nbody";
        let (value, body) = parse(input)?;
        assert_eq!(Some("a---b"), value["title"].as_str());
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_missing_fences() {
        assert!(matches!(split("title: x\n"), Err(Error::MissingStartFence)));
        assert!(matches!(split("---\ntitle: x\n"), Err(Error::MissingEndFence)));
    }

    #[test]
    fn test_empty_front_matter() -> Result<()> {
        let (value, body) = parse("---\n---\nbody\n")?;
        assert_eq!(Value::Null, value);
        assert_eq!("body\n", body);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse("---\ntitle: [unclosed\n---\n"),
            Err(Error::DeserializeYaml(_))
        ));
    }
}
