//! Minimal WKT reader for `POLYGON` and `MULTIPOLYGON`

use crate::errors::{ReferenceError, Result};

/// Ring of `(x, y)` positions.
pub type Ring = Vec<(f64, f64)>;

/// Exterior ring followed by zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct WktPolygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Number(f64),
    Open,
    Close,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push(Token::Word(&text[start..i]));
            }
            c if c.is_ascii_digit() || c == b'-' || c == b'+' || c == b'.' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && (bytes[i].is_ascii_digit()
                        || matches!(bytes[i], b'.' | b'e' | b'E' | b'-' | b'+'))
                {
                    i += 1;
                }
                let literal = &text[start..i];
                let value = literal
                    .parse()
                    .map_err(|_| ReferenceError::Wkt(format!("bad number '{literal}'")))?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(ReferenceError::Wkt(format!(
                    "unexpected character '{}' at offset {i}",
                    other as char
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expect(&mut self, want: Token<'static>) -> Result<()> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(ReferenceError::Wkt(format!(
                "expected {want:?}, found {other:?}"
            ))),
        }
    }

    /// `(x y [z [m]], ...)`
    fn ring(&mut self) -> Result<Ring> {
        self.expect(Token::Open)?;
        let mut ring = Vec::new();
        loop {
            let x = self.number()?;
            let y = self.number()?;
            // Extra ordinates (Z, M) are dropped.
            while let Some(Token::Number(_)) = self.peek() {
                self.pos += 1;
            }
            ring.push((x, y));
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => break,
                other => {
                    return Err(ReferenceError::Wkt(format!(
                        "expected ',' or ')' in ring, found {other:?}"
                    )))
                }
            }
        }
        if ring.len() < 3 {
            return Err(ReferenceError::Wkt(format!(
                "ring has {} positions, need at least 3",
                ring.len()
            )));
        }
        Ok(ring)
    }

    fn number(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(v)) => Ok(v),
            other => Err(ReferenceError::Wkt(format!(
                "expected number, found {other:?}"
            ))),
        }
    }

    /// `((ring), (hole), ...)`
    fn polygon(&mut self) -> Result<WktPolygon> {
        self.expect(Token::Open)?;
        let exterior = self.ring()?;
        let mut holes = Vec::new();
        loop {
            match self.next() {
                Some(Token::Comma) => holes.push(self.ring()?),
                Some(Token::Close) => break,
                other => {
                    return Err(ReferenceError::Wkt(format!(
                        "expected ',' or ')' in polygon, found {other:?}"
                    )))
                }
            }
        }
        Ok(WktPolygon { exterior, holes })
    }

    fn multipolygon(&mut self) -> Result<Vec<WktPolygon>> {
        self.expect(Token::Open)?;
        let mut polygons = vec![self.polygon()?];
        loop {
            match self.next() {
                Some(Token::Comma) => polygons.push(self.polygon()?),
                Some(Token::Close) => break,
                other => {
                    return Err(ReferenceError::Wkt(format!(
                        "expected ',' or ')' in multipolygon, found {other:?}"
                    )))
                }
            }
        }
        Ok(polygons)
    }

    /// Skip a `Z`, `M` or `ZM` dimension marker.
    fn skip_dimension(&mut self) {
        if let Some(Token::Word(w)) = self.peek() {
            if matches!(w.to_ascii_uppercase().as_str(), "Z" | "M" | "ZM") {
                self.pos += 1;
            }
        }
    }
}

/// Parse a `POLYGON` or `MULTIPOLYGON` into its polygons.
pub fn parse_polygons(text: &str) -> Result<Vec<WktPolygon>> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };

    let kind = match parser.next() {
        Some(Token::Word(w)) => w.to_ascii_uppercase(),
        other => {
            return Err(ReferenceError::Wkt(format!(
                "expected geometry type, found {other:?}"
            )))
        }
    };
    parser.skip_dimension();

    let polygons = match kind.as_str() {
        "POLYGON" => vec![parser.polygon()?],
        "MULTIPOLYGON" => parser.multipolygon()?,
        other => {
            return Err(ReferenceError::Wkt(format!(
                "unsupported geometry type {other}"
            )))
        }
    };

    if parser.pos != parser.tokens.len() {
        return Err(ReferenceError::Wkt("trailing input after geometry".to_string()));
    }
    Ok(polygons)
}
