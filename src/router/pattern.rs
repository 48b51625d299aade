use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("pattern {pattern:?} compiles to an invalid regex")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled registration string.
///
/// Patterns without parameter tokens stay literal and are compared by string
/// equality. Everything else becomes an anchored regex whose capture groups
/// bind, in order, to `names`.
#[derive(Debug, Clone)]
pub struct Pattern {
    literal: String,
    names: Vec<String>,
    source: Option<String>,
    regex: Option<Regex>,
    case_sensitive: bool,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Self::compile_with(pattern, true)
    }

    pub fn compile_with(pattern: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let mut names = vec![];
        let parts: Vec<String> = pattern
            .split('/')
            .map(|segment| compile_segment(segment, &mut names))
            .collect();

        if names.is_empty() {
            return Ok(Self {
                literal: pattern.to_owned(),
                names,
                source: None,
                regex: None,
                case_sensitive,
            });
        }

        let source = parts.join("/");
        let regex = RegexBuilder::new(&format!("^(?:{})$", source))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| PatternError::Regex {
                pattern: pattern.to_owned(),
                source,
            })?;

        Ok(Self {
            literal: pattern.to_owned(),
            names,
            source: Some(source),
            regex: Some(regex),
            case_sensitive,
        })
    }

    /// The registration string, verbatim.
    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// Parameter names in capture order, each with its leading `:`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_literal(&self) -> bool {
        self.regex.is_none()
    }

    /// The unanchored regex the pattern compiled to, if any.
    pub fn regex_str(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => self.literal_eq(path),
        }
    }

    /// Matches `path` against the whole pattern and pairs every capture with
    /// its name. Groups beyond the named ones, e.g. nested groups inside a
    /// custom expression, are ignored.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let Some(regex) = &self.regex else {
            return self.literal_eq(path).then(Vec::new);
        };

        let caps = regex.captures(path)?;
        let params = self
            .names
            .iter()
            .zip(caps.iter().skip(1))
            .map(|(name, value)| {
                let value = value.map(|m| m.as_str()).unwrap_or_default();
                (name.clone(), value.to_owned())
            })
            .collect();
        Some(params)
    }

    pub(crate) fn literal_eq(&self, path: &str) -> bool {
        if self.case_sensitive {
            self.literal == path
        } else {
            self.literal.eq_ignore_ascii_case(path)
        }
    }
}

fn compile_segment(segment: &str, names: &mut Vec<String>) -> String {
    if segment.starts_with(':') {
        let (name, expr) = if let Some(index) = segment.find('(') {
            (&segment[..index], &segment[index..])
        } else if let Some(name) = segment.strip_suffix(":int").filter(|name| !name.is_empty()) {
            (name, "([0-9]+)")
        } else if let Some(name) = segment
            .strip_suffix(":string")
            .filter(|name| !name.is_empty())
        {
            (name, r"([\w]+)")
        } else {
            (segment, "(.*)")
        };
        names.push(name.to_owned());
        return expr.to_owned();
    }

    if segment == "*.*" {
        names.push(":path".to_owned());
        names.push(":ext".to_owned());
        return "([^.]+).([^.]+)".to_owned();
    }

    if segment.starts_with('*') {
        names.push(":splat".to_owned());
        return "(.*)".to_owned();
    }

    if segment.contains(':') && segment.contains('(') && segment.contains(')') {
        return scan_mixed_segment(segment, names);
    }

    segment.to_owned()
}

/// Handles segments such as `page:id(\d+).html`: literal text is copied, a
/// `:` starts a name that runs up to `(`, and the parenthesized expression is
/// copied as the capture group.
fn scan_mixed_segment(segment: &str, names: &mut Vec<String>) -> String {
    let mut out = String::new();
    let mut name = String::new();
    let mut expr = String::new();
    let mut in_name = false;
    let mut in_expr = false;

    for c in segment.chars() {
        if in_name && c != '(' {
            name.push(c);
            continue;
        }
        if in_expr && c != ')' {
            expr.push(c);
            continue;
        }

        match c {
            ':' => {
                name = String::from(":");
                in_name = true;
            }
            '(' => {
                in_name = false;
                in_expr = true;
                names.push(std::mem::take(&mut name));
                expr = String::from("(");
            }
            ')' => {
                in_expr = false;
                expr.push(')');
                out.push_str(&expr);
            }
            _ => out.push(c),
        }
    }
    out
}
