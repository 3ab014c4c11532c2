//! # CSS
//!
//! Compiles stylesheet text into an ordered list of rules, each a selector
//! plus typed declarations, and applies them to elements.
//!
//! The cascade is deliberately simple: rules apply in source order and a
//! later rule overrides an earlier one. There is no specificity weighting.
//! Everything the engine cannot honor faithfully (unknown units, unknown
//! pseudo-classes, unknown at-rules) fails the compile before any layout
//! work starts. Unknown properties are the one exception: they are skipped
//! with a warning.

pub mod selector;
pub mod values;

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};

use crate::error::{QuireError, Result};
use crate::style::{Declaration, Style, StyleCache};
use selector::{parse_selector_list, Element, Selector, PAGE_TAG};

pub(crate) type CssResult<'i, T> = std::result::Result<T, ParseError<'i, QuireError>>;

/// The built-in user agent stylesheet, applied before any author CSS.
pub const USER_AGENT_CSS: &str = include_str!("html.css");

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
}

/// A compiled stylesheet: rules in cascade order.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Compile CSS source text.
    pub fn parse(source: &str) -> Result<Self> {
        let mut sheet = Stylesheet::default();
        sheet.add(source)?;
        Ok(sheet)
    }

    /// The user agent stylesheet on its own.
    pub fn user_agent() -> Result<Self> {
        Self::parse(USER_AGENT_CSS)
    }

    /// Compile `source` and append its rules after the existing ones.
    pub fn add(&mut self, source: &str) -> Result<()> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        parse_rule_list(&mut parser, &mut self.rules).map_err(into_quire_error)?;
        log::debug!("Stylesheet now holds {} rules", self.rules.len());
        Ok(())
    }

    /// Append another compiled sheet's rules after this one's.
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }

    /// Declarations of every rule matching `element`, in cascade order.
    pub fn matching_declarations<E: Element>(&self, element: E) -> Vec<Declaration> {
        self.rules
            .iter()
            .filter(|rule| rule.selector.matches(element))
            .flat_map(|rule| rule.declarations.iter().cloned())
            .collect()
    }

    /// Apply every matching rule on top of `base`.
    pub fn apply<E: Element>(&self, element: E, base: &Style, cache: &StyleCache) -> Style {
        base.set(cache, &self.matching_declarations(element))
    }
}

pub(crate) fn into_quire_error(error: ParseError<'_, QuireError>) -> QuireError {
    match error.kind {
        ParseErrorKind::Custom(custom) => custom,
        ParseErrorKind::Basic(kind) => QuireError::Css {
            line: error.location.line + 1,
            column: error.location.column,
            message: match kind {
                BasicParseErrorKind::UnexpectedToken(token) => format!("unexpected token {token:?}"),
                BasicParseErrorKind::EndOfInput => "unexpected end of input".to_string(),
                other => format!("{other:?}"),
            },
        },
    }
}

fn parse_rule_list<'i>(parser: &mut Parser<'i, '_>, rules: &mut Vec<Rule>) -> CssResult<'i, ()> {
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            return Ok(());
        }
        let start = parser.position();
        let token = parser.next()?.clone();
        match token {
            Token::CDO | Token::CDC => {}
            Token::AtKeyword(name) if name.eq_ignore_ascii_case("page") => {
                let prelude_start = parser.position();
                let prelude = read_prelude(parser, prelude_start)?;
                let mut selectors = if prelude.trim().is_empty() {
                    vec![Selector::default()]
                } else {
                    parse_selector_list(prelude).map_err(|e| parser.new_custom_error(e))?
                };
                for selector in &mut selectors {
                    selector.subject.tag = Some(PAGE_TAG.to_string());
                }
                let declarations = parser.parse_nested_block(parse_declarations)?;
                push_rules(rules, selectors, declarations);
            }
            Token::AtKeyword(name) => {
                return Err(parser.new_custom_error(QuireError::UnsupportedSelector(format!("@{name}"))));
            }
            Token::CurlyBracketBlock => {
                return Err(parser.new_unexpected_token_error(Token::CurlyBracketBlock));
            }
            _ => {
                let prelude = read_prelude(parser, start)?;
                let selectors = parse_selector_list(prelude).map_err(|e| parser.new_custom_error(e))?;
                let declarations = parser.parse_nested_block(parse_declarations)?;
                push_rules(rules, selectors, declarations);
            }
        }
    }
}

fn push_rules(rules: &mut Vec<Rule>, selectors: Vec<Selector>, declarations: Vec<Declaration>) {
    for selector in selectors {
        rules.push(Rule {
            selector,
            declarations: declarations.clone(),
        });
    }
}

/// Consume tokens up to and including the `{` opening a rule body, returning
/// the source text before it.
fn read_prelude<'i>(parser: &mut Parser<'i, '_>, start: cssparser::SourcePosition) -> CssResult<'i, &'i str> {
    let mut end = parser.position();
    loop {
        let token = parser.next_including_whitespace()?.clone();
        match token {
            Token::CurlyBracketBlock => return Ok(parser.slice(start..end)),
            Token::Semicolon => {
                return Err(parser.new_unexpected_token_error(Token::Semicolon));
            }
            _ => end = parser.position(),
        }
    }
}

/// The body of a rule: `property: value;` pairs, plus the `@bottom-right`
/// margin box inside `@page`.
fn parse_declarations<'i>(parser: &mut Parser<'i, '_>) -> CssResult<'i, Vec<Declaration>> {
    let mut declarations = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            return Ok(declarations);
        }
        let token = parser.next()?.clone();
        match token {
            Token::Semicolon => {}
            Token::Ident(name) => {
                let property = name.to_ascii_lowercase();
                parser.expect_colon()?;
                let values = parser.parse_until_after(cssparser::Delimiter::Semicolon, |p| {
                    values::collect_values(p, &property)
                })?;
                values::expand(&property, &values, &mut declarations)
                    .map_err(|e| parser.new_custom_error(e))?;
            }
            Token::AtKeyword(name) => {
                parser.expect_curly_bracket_block()?;
                let nested = parser.parse_nested_block(parse_declarations)?;
                if name.eq_ignore_ascii_case("bottom-right") {
                    declarations.extend(
                        nested
                            .into_iter()
                            .filter(|d| matches!(d, Declaration::PageBottomRightContent(_))),
                    );
                } else {
                    log::warn!("Ignoring unsupported margin box @{name}");
                }
            }
            other => return Err(parser.new_unexpected_token_error(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, ContentPart, Side};

    #[test]
    fn parses_rules_in_source_order() {
        let sheet = Stylesheet::parse("p { color: red } p, h1 { margin: 2pt 4pt }").unwrap();
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(
            sheet.rules[0].declarations,
            vec![Declaration::Color(Color::rgb(1.0, 0.0, 0.0))]
        );
        assert_eq!(sheet.rules[2].declarations[1], Declaration::Margin(Side::Right, 4.0));
    }

    #[test]
    fn comments_and_important_are_skipped() {
        let sheet = Stylesheet::parse("/* note */ td { padding: 1mm !important; }").unwrap();
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations.len(), 4);
    }

    #[test]
    fn page_rule_with_bottom_right_content() {
        let sheet = Stylesheet::parse(
            r#"@page { margin: 1cm; @bottom-right { content: "Page " counter(page) } }"#,
        )
        .unwrap();
        let rule = &sheet.rules[0];
        assert_eq!(rule.selector.subject.tag.as_deref(), Some(PAGE_TAG));
        assert!(rule.declarations.contains(&Declaration::PageBottomRightContent(vec![
            ContentPart::Text("Page ".to_string()),
            ContentPart::PageNumber,
        ])));
    }

    #[test]
    fn page_rule_with_pseudo_class() {
        let sheet = Stylesheet::parse("@page :first { margin-top: 10pt }").unwrap();
        assert_eq!(sheet.rules[0].selector.subject.tag.as_deref(), Some(PAGE_TAG));
        assert_eq!(sheet.rules[0].selector.subject.simple.len(), 1);
    }

    #[test]
    fn unknown_unit_fails_the_compile() {
        let err = Stylesheet::parse("p { margin: 3em }").unwrap_err();
        assert!(matches!(err, QuireError::UnknownUnit(_)));
    }

    #[test]
    fn unknown_unit_in_border_shorthand_fails_the_compile() {
        let err = Stylesheet::parse("td { border: 1em solid }").unwrap_err();
        assert!(matches!(err, QuireError::UnknownUnit(unit) if unit == "em"));
    }

    #[test]
    fn bang_without_important_is_an_invalid_value() {
        let err = Stylesheet::parse("p { color: red !bogus }").unwrap_err();
        assert!(matches!(err, QuireError::InvalidValue { property, .. } if property == "color"));
    }

    #[test]
    fn unknown_at_rule_fails_the_compile() {
        let err = Stylesheet::parse("@media print { p { color: red } }").unwrap_err();
        assert!(matches!(err, QuireError::UnsupportedSelector(_)));
    }

    #[test]
    fn syntax_error_reports_location() {
        let err = Stylesheet::parse("p { color red }").unwrap_err();
        assert!(matches!(err, QuireError::Css { line: 1, .. }));
    }

    #[test]
    fn user_agent_sheet_compiles() {
        let sheet = Stylesheet::user_agent().unwrap();
        assert!(!sheet.rules.is_empty());
    }
}
