//! The `&group key=value, ... &end` record grammar used by headers

use crate::{Result, SddsError};

/// One `&group ... &end` record, keys in the order they appeared
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namelist {
    pub group: String,
    pub fields: Vec<(String, String)>,
}

impl Namelist {
    pub fn new<S: Into<String>>(group: S) -> Self {
        Self {
            group: group.into(),
            fields: Vec::new(),
        }
    }

    pub fn push<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.fields.push((key.into(), value.into()));
    }

    /// Push only when a value is present
    pub fn push_opt<K: Into<String>>(&mut self, key: K, value: Option<&str>) {
        if let Some(v) = value {
            self.push(key, v);
        }
    }

    /// Last value given for `key` (keys are case-insensitive)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Render as a single line, without the trailing newline
    pub fn render(&self) -> String {
        let mut out = format!("&{}", self.group);
        for (key, value) in &self.fields {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_value(value));
            out.push(',');
        }
        out.push_str(" &end");
        out
    }
}

fn quote_value(value: &str) -> String {
    let bare = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '"' | '\\' | '&' | '=' | '!'));
    if bare {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_separators(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.bump();
            } else if c == '!' {
                // comment to end of line
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, f: F) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn quoted(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SddsError::format("unterminated quoted value in header")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(SddsError::format("dangling escape in header")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

/// Parse every record in `text`
pub fn parse_namelists(text: &str) -> Result<Vec<Namelist>> {
    let mut cursor = Cursor { text, pos: 0 };
    let mut out = Vec::new();
    loop {
        cursor.skip_separators();
        match cursor.peek() {
            None => return Ok(out),
            Some('&') => {
                cursor.bump();
            }
            Some(c) => {
                return Err(SddsError::format(format!(
                    "expected '&' to start a header record, found {:?}",
                    c
                )))
            }
        }
        let group = cursor.take_while(|c| c.is_alphanumeric() || c == '_');
        if group.is_empty() {
            return Err(SddsError::format("header record without a group name"));
        }
        let mut list = Namelist::new(group.to_ascii_lowercase());
        loop {
            cursor.skip_separators();
            match cursor.peek() {
                None => {
                    return Err(SddsError::format(format!(
                        "&{} record is missing &end",
                        list.group
                    )))
                }
                Some('&') => {
                    cursor.bump();
                    let word = cursor.take_while(|c| c.is_alphanumeric());
                    if word.eq_ignore_ascii_case("end") {
                        break;
                    }
                    return Err(SddsError::format(format!(
                        "unexpected &{} inside &{} record",
                        word, list.group
                    )));
                }
                Some(_) => {}
            }
            let key = cursor
                .take_while(|c| c != '=' && !c.is_whitespace() && c != ',' && c != '&')
                .to_string();
            cursor.take_while(char::is_whitespace);
            if cursor.bump() != Some('=') {
                return Err(SddsError::format(format!(
                    "expected '=' after {} in &{} record",
                    key, list.group
                )));
            }
            cursor.take_while(|c| c == ' ' || c == '\t');
            let value = if cursor.peek() == Some('"') {
                cursor.bump();
                cursor.quoted()?
            } else {
                cursor
                    .take_while(|c| !c.is_whitespace() && c != ',' && c != '&')
                    .to_string()
            };
            list.push(key.to_ascii_lowercase(), value);
        }
        out.push(list);
    }
}

/// Whether `text` holds at least one `&end` outside quotes
pub fn has_complete_record(text: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b'&' if !in_quotes => {
                if bytes[i + 1..].len() >= 3 && bytes[i + 1..i + 4].eq_ignore_ascii_case(b"end") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let lists =
            parse_namelists("&column name=x, units=m, type=double, &end\n&data mode=ascii, &end")
                .unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].group, "column");
        assert_eq!(lists[0].get("name"), Some("x"));
        assert_eq!(lists[0].get("TYPE"), Some("double"));
        assert_eq!(lists[1].get("mode"), Some("ascii"));
    }

    #[test]
    fn test_quoted_values() {
        let lists = parse_namelists(r#"&parameter name=p, description="a, \"b\" c", &end"#).unwrap();
        assert_eq!(lists[0].get("description"), Some("a, \"b\" c"));
    }

    #[test]
    fn test_render_roundtrip() {
        let mut list = Namelist::new("array");
        list.push("name", "grid");
        list.push("units", "");
        list.push("description", "two words, one comma");
        let text = list.render();
        let parsed = parse_namelists(&text).unwrap();
        assert_eq!(parsed, vec![list]);
    }

    #[test]
    fn test_errors() {
        assert!(parse_namelists("&column name=x").is_err());
        assert!(parse_namelists("column name=x &end").is_err());
        assert!(parse_namelists("&column name \"x\" &end").is_err());
    }

    #[test]
    fn test_complete_record() {
        assert!(has_complete_record("&data mode=binary, &end"));
        assert!(!has_complete_record("&column description=\"&end\","));
    }
}
