//! Attribute-flat XML: every field becomes an attribute of one `<message/>`
//! element, e.g. `<message command="publish" message="42" topic="a/b" />`.
//!
//! Attributes only hold strings, so a list value is flattened into a single
//! `,`-joined attribute on encode and is read back as `FieldValue::Text`.

use super::{Codec, FieldValue, Fields};
use crate::utils::{Error, Result};

const ELEMENT: &str = "message";
const LIST_SEPARATOR: &str = ",";

#[derive(Debug, Default, Clone, Copy)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn encode(&self, fields: &Fields) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(64);
        out.push('<');
        out.push_str(ELEMENT);
        for (name, value) in fields {
            if !is_valid_name(name) {
                return Err(Error::format(format!("xml encode: invalid attribute name `{name}`")));
            }
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            match value {
                FieldValue::Text(s) => escape_into(&mut out, s),
                FieldValue::List(items) => escape_into(&mut out, &items.join(LIST_SEPARATOR)),
            }
            out.push('"');
        }
        out.push_str(" />");
        Ok(out.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Fields> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::format(format!("xml decode: {e}")))?;
        Parser::new(text).parse_message()
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // attribute-value normalization would turn these into spaces
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| Error::format("xml decode: unterminated entity"))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    Error::format(format!("xml decode: unknown entity `&{entity};`"))
                })?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(Error::format(format!(
                "xml decode: expected `{token}` at byte {}",
                self.pos
            )))
        }
    }

    fn name(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(Error::format(format!("xml decode: expected a name at byte {}", self.pos)));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn parse_message(mut self) -> Result<Fields> {
        self.skip_ws();
        if self.eat("<?xml") {
            let end = self
                .rest()
                .find("?>")
                .ok_or_else(|| Error::format("xml decode: unterminated declaration"))?;
            self.pos += end + 2;
            self.skip_ws();
        }

        self.expect("<")?;
        let element = self.name()?;
        if element != ELEMENT {
            return Err(Error::format(format!("xml decode: unexpected element <{element}>")));
        }

        let mut fields = Fields::new();
        loop {
            self.skip_ws();
            if self.eat("/>") {
                break;
            }
            if self.eat(">") {
                self.skip_ws();
                self.expect("</")?;
                self.expect(ELEMENT)?;
                self.skip_ws();
                self.expect(">")?;
                break;
            }

            let name = self.name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let quote = self
                .rest()
                .chars()
                .next()
                .filter(|c| matches!(c, '"' | '\''))
                .ok_or_else(|| Error::format("xml decode: attribute value must be quoted"))?;
            self.pos += 1;
            let end = self
                .rest()
                .find(quote)
                .ok_or_else(|| Error::format("xml decode: unterminated attribute value"))?;
            let raw = &self.rest()[..end];
            self.pos += end + 1;

            if fields
                .insert(name.to_string(), FieldValue::Text(unescape(raw)?))
                .is_some()
            {
                return Err(Error::format(format!("xml decode: duplicate attribute `{name}`")));
            }
        }

        self.skip_ws();
        if !self.rest().is_empty() {
            return Err(Error::format("xml decode: trailing content after element"));
        }
        Ok(fields)
    }
}
