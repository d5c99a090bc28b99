//! template literal grammar
//!
//! A string node may embed any number of template literals:
//!
//! ```text
//! $<mutator>?{<command>:<args>}
//! ```
//!
//! - `mutator` is an optional lowercase identifier, only `object` is defined
//! - `command` is one of `env`, `func`, `arn`; only the first `:` separates it from its argument
//!
//! A backslash in front of the `$` escapes the literal: `\${env:HOME}` is the text `${env:HOME}`.
//! An empty expression (`${}`) is never a literal.
use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?P<escape>\\)?\$(?P<mutator>[a-z]+)?\{(?P<expression>[^}]*)\}")
            .expect("template literal pattern must compile")
    })
}

/// A string split into plain text and literals
#[derive(Debug, PartialEq)]
pub struct Template<'s> {
    segments: Vec<Segment<'s>>,
}

#[derive(Debug, PartialEq)]
pub enum Segment<'s> {
    Text(&'s str),
    Literal(Literal<'s>),
}

/// One `$mutator{expression}` occurrence
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Literal<'s> {
    /// full matched text
    pub raw: &'s str,
    pub mutator: Option<&'s str>,
    pub expression: &'s str,
}

impl<'s> Template<'s> {
    /// Split `input` into text and literals (left to right, non-overlapping)
    pub fn parse(input: &'s str) -> Self {
        let mut segments = vec![];
        let mut last = 0;

        for captures in literal_pattern().captures_iter(input) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let expression = captures
                .name("expression")
                .map(|m| m.as_str())
                .unwrap_or_default();

            if captures.name("escape").is_some() {
                // drop the backslash, keep the rest as text
                push_text(&mut segments, &input[last..whole.start()]);
                push_text(&mut segments, &input[whole.start() + 1..whole.end()]);
            } else if expression.is_empty() {
                push_text(&mut segments, &input[last..whole.end()]);
            } else {
                push_text(&mut segments, &input[last..whole.start()]);
                segments.push(Segment::Literal(Literal {
                    raw: whole.as_str(),
                    mutator: captures.name("mutator").map(|m| m.as_str()),
                    expression,
                }));
            }
            last = whole.end();
        }
        push_text(&mut segments, &input[last..]);

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment<'s>] {
        &self.segments
    }

    pub fn literals(&self) -> impl Iterator<Item = &Literal<'s>> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Literal(literal) => Some(literal),
            Segment::Text(_) => None,
        })
    }

    pub fn has_literals(&self) -> bool {
        self.literals().next().is_some()
    }

    /// The whole string is exactly one literal
    pub fn is_single_literal(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Literal(_)])
    }

    /// Concatenated text with escapes removed, literals kept as written
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => *text,
                Segment::Literal(literal) => literal.raw,
            })
            .collect()
    }
}

fn push_text<'s>(segments: &mut Vec<Segment<'s>>, text: &'s str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}

/// How a resolved value is spliced into its string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutator {
    /// use the value as is
    Verbatim,
    /// parse the value as json first
    Object,
}

impl Mutator {
    pub fn parse(mutator: Option<&str>, path: &str) -> Result<Self> {
        match mutator {
            None => Ok(Self::Verbatim),
            Some("object") => Ok(Self::Object),
            Some(other) => Err(Error::UnsupportedMutator {
                path: path.to_string(),
                mutator: other.to_string(),
            }),
        }
    }
}

/// Parsed literal expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `env:<NAME>`
    Env(String),
    /// `func:<name>`
    Func(Function),
    /// `arn:...`, holds the complete arn
    Arn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Stage,
    Timestamp,
}

impl Command {
    /// Parse `command:args`
    ///
    /// `path` is only used for error reporting.
    pub fn parse(expression: &str, path: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let (command, args) = trimmed.split_once(':').unwrap_or((trimmed, ""));

        match command {
            "env" => Ok(Command::Env(args.to_string())),
            "func" => match args.trim() {
                "stage" => Ok(Command::Func(Function::Stage)),
                "timestamp" => Ok(Command::Func(Function::Timestamp)),
                _ => Err(Error::UnsupportedFunction {
                    path: path.to_string(),
                    expression: expression.to_string(),
                }),
            },
            "arn" => Ok(Command::Arn(trimmed.to_string())),
            _ => Err(Error::UnsupportedLiteral {
                path: path.to_string(),
                expression: expression.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text() {
        let template = Template::parse("simple string");
        assert!(!template.has_literals());
        assert_eq!(template.segments(), &[Segment::Text("simple string")]);
    }

    #[test]
    fn single_literal() {
        let template = Template::parse("${env:TEST}");
        assert!(template.is_single_literal());
        assert_eq!(
            template.literals().next(),
            Some(&Literal {
                raw: "${env:TEST}",
                mutator: None,
                expression: "env:TEST"
            })
        );
    }

    #[test]
    fn mixed_literals_and_text() {
        let template = Template::parse("${env:A}-x-$object{env:B}");
        assert!(!template.is_single_literal());

        let literals: Vec<_> = template.literals().map(|l| (l.mutator, l.expression)).collect();
        assert_eq!(literals, vec![(None, "env:A"), (Some("object"), "env:B")]);
        assert_eq!(template.segments()[1], Segment::Text("-x-"));
    }

    #[test]
    fn escaped_literal_is_text() {
        let template = Template::parse(r"\${}");
        assert!(!template.has_literals());
        assert_eq!(template.text(), "${}");

        let template = Template::parse(r"a \${env:HOME} b");
        assert!(!template.has_literals());
        assert_eq!(template.text(), "a ${env:HOME} b");
    }

    #[test]
    fn empty_expression_is_text() {
        let template = Template::parse("${}");
        assert!(!template.has_literals());
        assert_eq!(template.text(), "${}");
    }

    #[test]
    fn commands() {
        assert_eq!(
            Command::parse("env:A:B", "").unwrap(),
            Command::Env("A:B".to_string())
        );
        assert_eq!(
            Command::parse(" func: stage ", "").unwrap(),
            Command::Func(Function::Stage)
        );
        assert_eq!(
            Command::parse("arn:aws:ssm:::parameter/x", "").unwrap(),
            Command::Arn("arn:aws:ssm:::parameter/x".to_string())
        );
    }

    #[test]
    fn unsupported_commands() {
        let err = Command::parse("myfunc", "path-to-object.a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported template literal 'path-to-object.a': 'myfunc'"
        );

        let err = Command::parse("func:nope", "a").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFunction { .. }));
    }

    #[test]
    fn mutators() {
        assert_eq!(Mutator::parse(None, "").unwrap(), Mutator::Verbatim);
        assert_eq!(Mutator::parse(Some("object"), "").unwrap(), Mutator::Object);
        assert!(matches!(
            Mutator::parse(Some("upper"), "a.b"),
            Err(Error::UnsupportedMutator { .. })
        ));
    }
}
