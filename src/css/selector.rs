//! Selector parsing and right-to-left matching.
//!
//! A selector is stored subject-first: the compound that must match the
//! element itself, followed by `(combinator, compound)` steps walking
//! leftward through the source text. Matching backtracks across
//! descendant and subsequent-sibling steps, so `a b > c` finds any
//! qualifying `b`, not just the nearest one.

use cssparser::{ParseError, Parser, ParserInput, Token};

use super::{into_quire_error, CssResult};
use crate::error::{QuireError, Result};

/// The pseudo tag that `@page` rules and the synthetic page node carry.
pub const PAGE_TAG: &str = "@page";

/// What a selector needs to know about an element to match it.
pub trait Element: Copy {
    fn tag(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, name: &str) -> bool;
    fn has_attribute(&self, name: &str) -> bool;
    /// 1-based position among element siblings.
    fn position(&self) -> usize;
    /// 1-based position among element siblings with the same tag.
    fn position_of_type(&self) -> usize;
    fn is_last(&self) -> bool;
    fn parent(&self) -> Option<Self>;
    fn previous_sibling(&self) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `E F`
    Descendant,
    /// `E > F`
    Child,
    /// `E + F`
    NextSibling,
    /// `E ~ F`
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
    Class(String),
    Id(String),
    Attribute(String),
    NthChild(i32, i32),
    NthOfType(i32, i32),
    LastChild,
    Not(Box<Compound>),
}

impl SimpleSelector {
    fn matches<E: Element>(&self, element: E) -> bool {
        match self {
            SimpleSelector::Class(name) => element.has_class(name),
            SimpleSelector::Id(id) => element.id() == Some(id.as_str()),
            SimpleSelector::Attribute(name) => element.has_attribute(name),
            SimpleSelector::NthChild(a, b) => nth_matches(*a, *b, element.position()),
            SimpleSelector::NthOfType(a, b) => nth_matches(*a, *b, element.position_of_type()),
            SimpleSelector::LastChild => element.is_last(),
            SimpleSelector::Not(inner) => !inner.matches(element),
        }
    }
}

/// `an+b` against a 1-based position. With `a == 0` only position `b` matches.
fn nth_matches(a: i32, b: i32, position: usize) -> bool {
    let offset = position as i64 - b as i64;
    let a = a as i64;
    if a == 0 {
        offset == 0
    } else {
        offset % a == 0 && offset / a >= 0
    }
}

/// Simple selectors that must all hold for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    universal: bool,
    pub simple: Vec<SimpleSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && !self.universal && self.simple.is_empty()
    }

    pub fn matches<E: Element>(&self, element: E) -> bool {
        if let Some(tag) = &self.tag {
            if tag != element.tag() {
                return false;
            }
        }
        self.simple.iter().all(|s| s.matches(element))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub subject: Compound,
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// A selector matching only elements with `tag`.
    pub fn tag(tag: &str) -> Self {
        Selector {
            subject: Compound {
                tag: Some(tag.to_string()),
                ..Compound::default()
            },
            steps: Vec::new(),
        }
    }

    pub fn matches<E: Element>(&self, element: E) -> bool {
        self.subject.matches(element) && self.matches_steps(0, element)
    }

    fn matches_steps<E: Element>(&self, index: usize, element: E) -> bool {
        let Some((combinator, compound)) = self.steps.get(index) else {
            return true;
        };
        let step = |candidate: E| compound.matches(candidate) && self.matches_steps(index + 1, candidate);
        match combinator {
            Combinator::Child => element.parent().is_some_and(step),
            Combinator::NextSibling => element.previous_sibling().is_some_and(step),
            Combinator::Descendant => {
                let mut current = element.parent();
                while let Some(ancestor) = current {
                    if step(ancestor) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
            Combinator::SubsequentSibling => {
                let mut current = element.previous_sibling();
                while let Some(sibling) = current {
                    if step(sibling) {
                        return true;
                    }
                    current = sibling.previous_sibling();
                }
                false
            }
        }
    }
}

/// Parse a comma separated selector list such as `table td, p.note > b`.
pub fn parse_selector_list(source: &str) -> Result<Vec<Selector>> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_comma_separated(parse_selector)
        .map_err(into_quire_error)
}

fn parse_selector<'i>(parser: &mut Parser<'i, '_>) -> CssResult<'i, Selector> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut current = Compound::default();
    let mut pending: Option<Combinator> = None;

    parser.skip_whitespace();
    while let Ok(token) = parser.next_including_whitespace() {
        let token = token.clone();
        let explicit = match token {
            Token::WhiteSpace(_) => Some(Combinator::Descendant),
            Token::Delim('>') => Some(Combinator::Child),
            Token::Delim('+') => Some(Combinator::NextSibling),
            Token::Delim('~') => Some(Combinator::SubsequentSibling),
            _ => None,
        };
        if let Some(combinator) = explicit {
            if !current.is_empty() {
                compounds.push(std::mem::take(&mut current));
            }
            if compounds.is_empty() {
                return Err(parser.new_unexpected_token_error(token));
            }
            // `a > b` arrives as whitespace, '>', whitespace
            if combinator != Combinator::Descendant || pending.is_none() {
                pending = Some(combinator);
            }
            continue;
        }

        if current.is_empty() && !compounds.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        parse_simple(parser, token, &mut current)?;
    }

    if !current.is_empty() {
        compounds.push(current);
    } else if matches!(pending, Some(c) if c != Combinator::Descendant) || compounds.is_empty() {
        return Err(parser.new_error(cssparser::BasicParseErrorKind::EndOfInput));
    }

    let mut compounds = compounds.into_iter().rev();
    let subject = compounds.next().unwrap_or_default();
    let steps = combinators.into_iter().rev().zip(compounds).collect();
    Ok(Selector { subject, steps })
}

/// Add the simple selector that starts with `token` to `compound`.
fn parse_simple<'i>(
    parser: &mut Parser<'i, '_>,
    token: Token<'i>,
    compound: &mut Compound,
) -> CssResult<'i, ()> {
    match token {
        Token::Ident(name) => compound.tag = Some(name.to_ascii_lowercase()),
        Token::Delim('*') => compound.universal = true,
        Token::Delim('.') => {
            let name = parser.expect_ident_cloned()?;
            compound.simple.push(SimpleSelector::Class(name.to_string()));
        }
        Token::IDHash(id) => compound.simple.push(SimpleSelector::Id(id.to_string())),
        Token::SquareBracketBlock => {
            let name = parser.parse_nested_block(|p| {
                let name = p.expect_ident_cloned()?;
                // attribute value tests are accepted but only presence is checked
                while p.next().is_ok() {}
                Ok::<_, ParseError<'i, QuireError>>(name.to_ascii_lowercase())
            })?;
            compound.simple.push(SimpleSelector::Attribute(name));
        }
        Token::Colon => {
            let pseudo = parse_pseudo(parser)?;
            compound.simple.push(pseudo);
        }
        other => return Err(parser.new_unexpected_token_error(other)),
    }
    Ok(())
}

fn parse_pseudo<'i>(parser: &mut Parser<'i, '_>) -> CssResult<'i, SimpleSelector> {
    let token = parser.next_including_whitespace()?.clone();
    match token {
        Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
            "first" | "first-child" => Ok(SimpleSelector::NthChild(0, 1)),
            "last" | "last-child" => Ok(SimpleSelector::LastChild),
            "first-of-type" => Ok(SimpleSelector::NthOfType(0, 1)),
            other => Err(parser.new_custom_error(QuireError::UnsupportedSelector(format!(":{other}")))),
        },
        Token::Function(name) => match name.to_ascii_lowercase().as_str() {
            "nth-child" => {
                let (a, b) = parser.parse_nested_block(|p| {
                    Ok::<_, ParseError<'i, QuireError>>(cssparser::parse_nth(p)?)
                })?;
                Ok(SimpleSelector::NthChild(a, b))
            }
            "nth-of-type" => {
                let (a, b) = parser.parse_nested_block(|p| {
                    Ok::<_, ParseError<'i, QuireError>>(cssparser::parse_nth(p)?)
                })?;
                Ok(SimpleSelector::NthOfType(a, b))
            }
            "not" => {
                let inner = parser.parse_nested_block(|p| {
                    let mut compound = Compound::default();
                    p.skip_whitespace();
                    while let Ok(token) = p.next_including_whitespace() {
                        let token = token.clone();
                        if matches!(token, Token::WhiteSpace(_)) {
                            continue;
                        }
                        parse_simple(p, token, &mut compound)?;
                    }
                    Ok::<_, ParseError<'i, QuireError>>(compound)
                })?;
                Ok(SimpleSelector::Not(Box::new(inner)))
            }
            other => Err(parser.new_custom_error(QuireError::UnsupportedSelector(format!(":{other}()")))),
        },
        other => Err(parser.new_unexpected_token_error(other)),
    }
}
