//! Include directive parsing
//!
//! Recognizes AsciiDoc include lines and the `cmd:` targets handled by the
//! shell include processor:
//!
//! ```text
//! include::cmd:ls[args='-al',format='bash',block=true,print=true,cwd='$PROJECT_DIR']
//! ```
//!
//! `flags` is accepted as a deprecated synonym for `args`.

use tracing::warn;

/// Prefix marking a shell-command include target
pub const CMD_PREFIX: &str = "cmd:";

/// Default code block language for `block=true`
pub const DEFAULT_FORMAT: &str = "bash";

/// Returns true if the target is a shell-command include
pub fn handles(target: &str) -> bool {
    target.starts_with(CMD_PREFIX)
}

/// An `include::` line split into its target and raw attribute list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeLine<'a> {
    /// `include::target[attrs]`
    Directive { target: &'a str, attrlist: &'a str },

    /// `\include::...`, to be emitted literally without the backslash
    Escaped(&'a str),
}

/// Matches a line against the include directive form.
///
/// Trailing whitespace is ignored. The directive must start the line and end
/// with `]`; the target may contain inner spaces but may not be empty, start
/// or end with whitespace, or contain `[`.
pub fn parse_include_line(line: &str) -> Option<IncludeLine<'_>> {
    let line = line.trim_end();
    if let Some(rest) = line.strip_prefix('\\') {
        if rest.starts_with("include::") && split_directive(rest).is_some() {
            return Some(IncludeLine::Escaped(rest));
        }
        return None;
    }

    split_directive(line).map(|(target, attrlist)| IncludeLine::Directive { target, attrlist })
}

fn split_directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("include::")?;
    let rest = rest.strip_suffix(']')?;
    let open = rest.find('[')?;
    let target = &rest[..open];

    if target.is_empty() || target.starts_with(char::is_whitespace) || target.ends_with(char::is_whitespace) {
        return None;
    }

    Some((target, &rest[open + 1..]))
}

/// Parsed attribute list of a directive, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    entries: Vec<(String, String)>,
}

impl AttributeList {
    /// Parses an AsciiDoc attribute list.
    ///
    /// Named entries take the form `name='value'`, `name="value"` or
    /// `name=value`. Entries without `=` are positional and stored under
    /// their 1-based index.
    pub fn parse(input: &str) -> Self {
        let mut entries = Vec::new();
        let mut chars = input.chars().peekable();
        let mut position = 0;

        loop {
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }

            let mut name = String::new();
            let mut value = None;

            while let Some(&c) = chars.peek() {
                match c {
                    ',' => break,
                    '=' => {
                        chars.next();
                        value = Some(read_value(&mut chars));
                        break;
                    }
                    '\'' | '"' if name.trim().is_empty() => {
                        name = read_value(&mut chars);
                        break;
                    }
                    _ => {
                        name.push(c);
                        chars.next();
                    }
                }
            }

            // Skip up to and including the separator
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
            }

            let name = name.trim().to_string();
            match value {
                Some(value) if !name.is_empty() => entries.push((name, value)),
                Some(_) => {}
                None => {
                    position += 1;
                    if !name.is_empty() {
                        entries.push((position.to_string(), name));
                    }
                }
            }
        }

        Self { entries }
    }

    /// Returns the value of the last entry with the given name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Interprets an attribute as a boolean flag
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).map(is_truthy).unwrap_or(false)
    }

    /// Sets an attribute, replacing any earlier value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(key, _)| *key != name);
        self.entries.push((name, value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites every value, leaving names and order untouched
    pub fn map_values(mut self, f: impl Fn(&str) -> String) -> Self {
        for (_, value) in &mut self.entries {
            *value = f(value);
        }
        self
    }
}

fn read_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }

    match chars.peek().copied() {
        Some(quote @ ('\'' | '"')) => {
            chars.next();
            let mut value = String::new();
            while let Some(c) = chars.next() {
                if c == '\\' && chars.peek() == Some(&quote) {
                    value.push(quote);
                    chars.next();
                } else if c == quote {
                    break;
                } else {
                    value.push(c);
                }
            }
            value
        }
        _ => {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value.trim().to_string()
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("off")
        || value == "0")
}

/// A `cmd:` include directive with its recognized attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The include target as written, e.g. `cmd:ls`
    pub target: String,

    /// Command name, the target without the `cmd:` prefix
    pub command: String,

    /// Command arguments (`args`, or the deprecated `flags`)
    pub args: Option<String>,

    /// Code block language used with `block`
    pub format: String,

    /// Wrap the output in a source block
    pub block: bool,

    /// Show the command line above the output (inside the block)
    pub print: bool,

    /// Raw working-directory expression, may contain placeholders
    pub cwd: Option<String>,
}

impl Directive {
    /// Builds a directive from a handled target and its attributes.
    ///
    /// Returns `None` when the target is not a `cmd:` target.
    pub fn parse(target: &str, attrs: &AttributeList) -> Option<Self> {
        let command = target.strip_prefix(CMD_PREFIX)?.to_string();

        let args = match (attrs.get("args"), attrs.get("flags")) {
            (Some(args), Some(_)) => {
                warn!(include_target = %target, "both 'args' and 'flags' given, using 'args'");
                Some(args)
            }
            (Some(args), None) => Some(args),
            (None, Some(flags)) => {
                warn!(include_target = %target, "'flags' is deprecated, use 'args' instead");
                Some(flags)
            }
            (None, None) => None,
        };

        let format = attrs
            .get("format")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FORMAT)
            .to_string();

        Some(Self {
            target: target.to_string(),
            command,
            args: args.filter(|a| !a.is_empty()).map(str::to_string),
            format,
            block: attrs.flag("block"),
            print: attrs.flag("print"),
            cwd: attrs.get("cwd").map(str::to_string),
        })
    }

    /// The command line as written by the author, without any version token
    pub fn command_line(&self) -> String {
        match &self.args {
            Some(args) => format!("{} {}", self.command, args),
            None => self.command.clone(),
        }
    }
}
