// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable text form of a [`Bottle`].
//!
//! ```text
//! 42 3.5 hello "two words" (nested 1 2) [vocb] {1 2 255} true
//! ```
//!
//! Parsing is lenient: unterminated quotes or lists run to the end of input.
//! Lists nested beyond [`MAX_DEPTH`] are kept as their raw text.

use super::codec::MAX_DEPTH;
use super::{Bottle, Value, Vocab};
use std::iter::Peekable;
use std::str::Chars;

pub(super) fn render(bottle: &Bottle) -> String {
    let mut out = String::new();
    for (i, item) in bottle.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        render_value(&mut out, item);
    }
    out
}

fn render_value(out: &mut String, value: &Value) {
    match value {
        Value::Int8(v) => out.push_str(&v.to_string()),
        Value::Int16(v) => out.push_str(&v.to_string()),
        Value::Int32(v) => out.push_str(&v.to_string()),
        Value::Int64(v) => out.push_str(&v.to_string()),
        Value::Float32(v) => out.push_str(&float_text(f64::from(*v), v.to_string())),
        Value::Float64(v) => out.push_str(&float_text(*v, v.to_string())),
        Value::Vocab32(v) => match v.0 {
            0 => out.push_str("false"),
            c if c == i32::from(b'1') => out.push_str("true"),
            _ => {
                out.push('[');
                out.push_str(&v.decode());
                out.push(']');
            }
        },
        Value::String(s) => out.push_str(&quote(s)),
        Value::Blob(bytes) => {
            out.push('{');
            let parts: Vec<String> = bytes.iter().map(u8::to_string).collect();
            out.push_str(&parts.join(" "));
            out.push('}');
        }
        Value::List(inner) => {
            out.push('(');
            out.push_str(&render(inner));
            out.push(')');
        }
    }
}

/// Floats always carry a `.` or exponent so they parse back as floats.
fn float_text(v: f64, shortest: String) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if shortest.contains(['.', 'e', 'E']) {
        shortest
    } else {
        format!("{}.0", shortest)
    }
}

fn needs_quote(s: &str) -> bool {
    if s.is_empty() || matches!(s, "true" | "false" | "inf" | "nan") {
        return true;
    }
    s.chars().enumerate().any(|(i, ch)| {
        if ch.is_ascii_alphabetic() || ch == '_' {
            false
        } else if ch.is_ascii_digit() || ch == '.' || ch == '-' {
            i == 0
        } else {
            true
        }
    })
}

fn quote(s: &str) -> String {
    if !needs_quote(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

pub(super) fn parse(text: &str) -> Vec<Value> {
    let mut chars = text.chars().peekable();
    parse_items(&mut chars, None, 1)
}

fn parse_items(chars: &mut Peekable<Chars<'_>>, close: Option<char>, depth: usize) -> Vec<Value> {
    let mut items = Vec::new();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&ch) = chars.peek() else {
            return items;
        };
        match ch {
            c if Some(c) == close => {
                chars.next();
                return items;
            }
            '(' if depth >= MAX_DEPTH => items.push(Value::String(take_group(chars))),
            '(' => {
                chars.next();
                let nested: Bottle = parse_items(chars, Some(')'), depth + 1)
                    .into_iter()
                    .collect();
                items.push(Value::List(nested));
            }
            '"' => {
                chars.next();
                items.push(Value::String(unquote(chars)));
            }
            '[' => {
                chars.next();
                let word = take_until(chars, ']');
                items.push(Value::Vocab32(Vocab::encode(&word)));
            }
            '{' => {
                chars.next();
                let body = take_until(chars, '}');
                let bytes = body
                    .split_whitespace()
                    .filter_map(|tok| parse_int(tok).map(|v| v as u8))
                    .collect();
                items.push(Value::Blob(bytes));
            }
            _ => {
                let mut token = String::new();
                while let Some(c) = chars.next_if(|c: &char| !c.is_whitespace() && *c != '(' && *c != ')') {
                    token.push(c);
                }
                if token.is_empty() {
                    // stray closing paren at top level
                    chars.next();
                    continue;
                }
                items.push(classify(&token));
            }
        }
    }
}

fn take_until(chars: &mut Peekable<Chars<'_>>, end: char) -> String {
    let mut word = String::new();
    for c in chars.by_ref() {
        if c == end {
            break;
        }
        word.push(c);
    }
    word
}

/// Consumes one parenthesized group verbatim, quotes included.
fn take_group(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut raw = String::new();
    let mut open = 0usize;
    let mut quoted = false;
    while let Some(c) = chars.next() {
        raw.push(c);
        match c {
            '\\' if quoted => {
                if let Some(escaped) = chars.next() {
                    raw.push(escaped);
                }
            }
            '"' => quoted = !quoted,
            '(' if !quoted => open += 1,
            ')' if !quoted => {
                open = open.saturating_sub(1);
                if open == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    raw
}

fn unquote(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => break,
            },
            _ => out.push(c),
        }
    }
    out
}

fn parse_int(token: &str) -> Option<i64> {
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if hex.is_empty() || hex.len() > 8 {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn classify(token: &str) -> Value {
    match token {
        "true" => return Value::from_bool(true),
        "false" => return Value::from_bool(false),
        "inf" => return Value::Float64(f64::INFINITY),
        "-inf" => return Value::Float64(f64::NEG_INFINITY),
        "nan" => return Value::Float64(f64::NAN),
        _ => {}
    }
    if let Some(v) = parse_int(token) {
        return match i32::try_from(v) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(v),
        };
    }
    let numeric_start = token
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'));
    let numeric_body = token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if numeric_start && numeric_body {
        if let Ok(v) = token.parse::<f64>() {
            return Value::Float64(v);
        }
    }
    Value::String(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mixed() {
        let mut b = Bottle::new();
        b.add_int32(42)
            .add_float64(2.0)
            .add_string("hello")
            .add_string("two words")
            .add_vocab("ok")
            .add_blob(vec![1u8, 255])
            .add(true);
        assert_eq!(render(&b), "42 2.0 hello \"two words\" [ok] {1 255} true");
    }

    #[test]
    fn test_strings_that_look_like_numbers_are_quoted() {
        let mut b = Bottle::new();
        b.add_string("12")
            .add_string("true")
            .add_string("")
            .add_string("a-1")
            .add_string("inf")
            .add_string("-inf")
            .add_string("nan");
        assert_eq!(
            render(&b),
            "\"12\" \"true\" \"\" a-1 \"inf\" \"-inf\" \"nan\""
        );
        assert_eq!(Bottle::from_text(&render(&b)), b);
    }

    #[test]
    fn test_escapes_roundtrip() {
        let mut b = Bottle::new();
        b.add_string("line\nbreak \"quoted\" back\\slash");
        let text = render(&b);
        assert_eq!(Bottle::from_text(&text), b);
    }

    #[test]
    fn test_parse_numbers() {
        let b = Bottle::from_text("1 -2 +3 0x10 4000000000 1.5 -2e3 .5 inf nan 1.2.3 -");
        assert_eq!(b.get(0), Some(&Value::Int32(1)));
        assert_eq!(b.get(1), Some(&Value::Int32(-2)));
        assert_eq!(b.get(2), Some(&Value::Int32(3)));
        assert_eq!(b.get(3), Some(&Value::Int32(16)));
        assert_eq!(b.get(4), Some(&Value::Int64(4_000_000_000)));
        assert_eq!(b.get(5), Some(&Value::Float64(1.5)));
        assert_eq!(b.get(6), Some(&Value::Float64(-2000.0)));
        assert_eq!(b.get(7), Some(&Value::Float64(0.5)));
        assert_eq!(b.get(8), Some(&Value::Float64(f64::INFINITY)));
        assert!(b.get(9).and_then(Value::as_f64).is_some_and(f64::is_nan));
        assert_eq!(b.get(10).and_then(Value::as_str), Some("1.2.3"));
        assert_eq!(b.get(11).and_then(Value::as_str), Some("-"));
    }

    #[test]
    fn test_parse_nested_and_unterminated() {
        let b = Bottle::from_text("(a (b c)) (d");
        assert_eq!(b.len(), 2);
        let first = b.get(0).and_then(Value::as_list).expect("list");
        assert_eq!(render(first), "a (b c)");
        assert_eq!(b.get(1).and_then(Value::as_list).map(Bottle::len), Some(1));
    }

    fn depth_of(bottle: &Bottle) -> usize {
        let mut depth = 1;
        let mut level = bottle;
        while let Some(inner) = level.get(0).and_then(Value::as_list) {
            depth += 1;
            level = inner;
        }
        depth
    }

    #[test]
    fn test_deep_nesting_is_cut_at_limit() {
        let text = "(".repeat(200_000);
        let b = Bottle::from_text(&text);
        assert_eq!(depth_of(&b), MAX_DEPTH);
        assert!(b.to_bytes().is_ok());

        let mut level = &b;
        while let Some(inner) = level.get(0).and_then(Value::as_list) {
            level = inner;
        }
        let rest = level.get(0).and_then(Value::as_str).expect("raw text");
        assert_eq!(rest.len(), 200_000 - (MAX_DEPTH - 1));
    }

    #[test]
    fn test_group_beyond_limit_keeps_its_text() {
        let text = format!("{}(x \")\" y) z", "(".repeat(MAX_DEPTH - 1));
        let b = Bottle::from_text(&text);
        let mut level = &b;
        while let Some(inner) = level.get(0).and_then(Value::as_list) {
            level = inner;
        }
        assert_eq!(level.get(0).and_then(Value::as_str), Some("(x \")\" y)"));
        assert_eq!(level.get(1).and_then(Value::as_str), Some("z"));
    }

    #[test]
    fn test_text_roundtrip_is_stable() {
        let text = "1 2.5 \"x y\" (a b (3 4.0)) [ok] {1 2 3} false";
        let b = Bottle::from_text(text);
        assert_eq!(render(&b), text);
    }
}
