//! Property values: token collection and conversion into typed
//! [`Declaration`]s with every length normalized to points.

use cssparser::{ParseError, Parser, Token};

use super::CssResult;
use crate::error::{QuireError, Result};
use crate::style::{
    BorderCollapse, BorderStyle, Color, ContentPart, Declaration, Display, FontFamily, FontStyle,
    FontWeight, Side, TextAlign, TextDecoration, VerticalAlign,
};

pub const INCH: f64 = 72.0;
pub const CM: f64 = INCH / 2.54;
pub const MM: f64 = CM * 0.1;

/// Convert a dimension to points.
pub fn to_points(value: f64, unit: &str) -> Result<f64> {
    let factor = match unit.to_ascii_lowercase().as_str() {
        "px" | "pt" => 1.0,
        "mm" => MM,
        "cm" => CM,
        "in" | "inch" => INCH,
        _ => return Err(QuireError::UnknownUnit(unit.to_string())),
    };
    Ok(value * factor)
}

/// One component of a declaration value, detached from the token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Ident(String),
    Number(f64),
    Dimension(f64, String),
    Percentage(f64),
    Hash(String),
    Str(String),
    /// A function call kept as source text (`rgb(0, 0, 0)`), plus its arguments.
    Function {
        name: String,
        args: Vec<Value>,
        source: String,
    },
    Comma,
}

/// Collect the remaining tokens of the value of `property`.
pub fn collect_values<'i>(parser: &mut Parser<'i, '_>, property: &str) -> CssResult<'i, Vec<Value>> {
    let mut values = Vec::new();
    loop {
        let start = parser.position();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let value = match token {
            Token::Ident(name) => Value::Ident(name.to_ascii_lowercase()),
            Token::Number { value, .. } => Value::Number(value as f64),
            Token::Dimension { value, unit, .. } => Value::Dimension(value as f64, unit.to_string()),
            Token::Percentage { unit_value, .. } => Value::Percentage(unit_value as f64 * 100.0),
            Token::Hash(hash) | Token::IDHash(hash) => Value::Hash(hash.to_string()),
            Token::QuotedString(text) => Value::Str(text.to_string()),
            Token::Comma => Value::Comma,
            Token::Function(name) => {
                let args = parser.parse_nested_block(|p| collect_values(p, property))?;
                Value::Function {
                    name: name.to_ascii_lowercase(),
                    args,
                    source: parser.slice_from(start).to_string(),
                }
            }
            Token::Delim('!') => {
                // `!important` carries no weight in source-order cascading
                if parser.expect_ident_matching("important").is_err() {
                    return Err(parser.new_custom_error(QuireError::InvalidValue {
                        property: property.to_string(),
                        value: parser.slice_from(start).to_string(),
                    }));
                }
                continue;
            }
            other => return Err(parser.new_unexpected_token_error(other)),
        };
        values.push(value);
    }
    Ok::<_, ParseError<'i, QuireError>>(values)
}

fn invalid(property: &str, values: &[Value]) -> QuireError {
    QuireError::InvalidValue {
        property: property.to_string(),
        value: format!("{values:?}"),
    }
}

fn length(property: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(v) => Ok(*v),
        Value::Dimension(v, unit) => to_points(*v, unit),
        Value::Ident(name) if property.contains("width") => match name.as_str() {
            "thin" => Ok(0.5),
            "medium" => Ok(1.0),
            "thick" => Ok(2.0),
            _ => Err(invalid(property, std::slice::from_ref(value))),
        },
        _ => Err(invalid(property, std::slice::from_ref(value))),
    }
}

fn color(property: &str, value: &Value) -> Result<Color> {
    let text = match value {
        Value::Ident(name) => name.clone(),
        Value::Hash(hash) => format!("#{hash}"),
        Value::Function { source, .. } => source.clone(),
        _ => return Err(invalid(property, std::slice::from_ref(value))),
    };
    text.parse::<csscolorparser::Color>()
        .map(|c| Color::from_rgba8(c.to_rgba8()))
        .map_err(|_| invalid(property, std::slice::from_ref(value)))
}

fn single<'a>(property: &str, values: &'a [Value]) -> Result<&'a Value> {
    match values {
        [value] => Ok(value),
        _ => Err(invalid(property, values)),
    }
}

fn keyword<'a>(property: &str, values: &'a [Value]) -> Result<&'a str> {
    match values {
        [Value::Ident(name)] => Ok(name.as_str()),
        _ => Err(invalid(property, values)),
    }
}

fn border_style(property: &str, value: &Value) -> Result<BorderStyle> {
    match value {
        Value::Ident(name) => match name.as_str() {
            "solid" | "double" | "groove" | "ridge" | "inset" | "outset" => Ok(BorderStyle::Solid),
            "dashed" | "dotted" => Ok(BorderStyle::Dashed),
            _ => Err(invalid(property, std::slice::from_ref(value))),
        },
        _ => Err(invalid(property, std::slice::from_ref(value))),
    }
}

/// The CSS 1/2/3/4 value shorthand rule, returning top, right, bottom, left.
pub fn expand_box<T: Copy>(values: &[T]) -> Option<[T; 4]> {
    match *values {
        [all] => Some([all, all, all, all]),
        [vertical, horizontal] => Some([vertical, horizontal, vertical, horizontal]),
        [top, horizontal, bottom] => Some([top, horizontal, bottom, horizontal]),
        [top, right, bottom, left] => Some([top, right, bottom, left]),
        _ => None,
    }
}

fn side_of(name: &str) -> Option<Side> {
    match name {
        "top" => Some(Side::Top),
        "right" => Some(Side::Right),
        "bottom" => Some(Side::Bottom),
        "left" => Some(Side::Left),
        _ => None,
    }
}

fn boxed<T: Copy>(
    property: &str,
    values: &[Value],
    convert: impl Fn(&str, &Value) -> Result<T>,
    declare: impl Fn(Side, T) -> Declaration,
    out: &mut Vec<Declaration>,
) -> Result<()> {
    let converted = values
        .iter()
        .map(|v| convert(property, v))
        .collect::<Result<Vec<T>>>()?;
    let sides = expand_box(&converted).ok_or_else(|| invalid(property, values))?;
    for (side, value) in Side::ALL.into_iter().zip(sides) {
        out.push(declare(side, value));
    }
    Ok(())
}

/// `border` / `border-<side>`: width, style and color in any order.
fn border_shorthand(property: &str, values: &[Value], sides: &[Side], out: &mut Vec<Declaration>) -> Result<()> {
    let mut width = None;
    let mut style = None;
    let mut paint = None;
    for value in values {
        if let Value::Ident(name) = value {
            if name == "none" || name == "hidden" {
                width = Some(0.0);
                continue;
            }
        }
        if let Value::Dimension(..) = value {
            // a dimension can only be the width; keep its unit error
            width = Some(length("border-width", value)?);
        } else if let Ok(w) = length("border-width", value) {
            width = Some(w);
        } else if let Ok(s) = border_style(property, value) {
            style = Some(s);
        } else {
            paint = Some(color(property, value)?);
        }
    }
    for side in sides {
        out.push(Declaration::BorderWidth(*side, width.unwrap_or(1.0)));
        if let Some(style) = style {
            out.push(Declaration::BorderStyle(*side, style));
        }
        if let Some(paint) = paint {
            out.push(Declaration::BorderColor(*side, paint));
        }
    }
    Ok(())
}

fn font_family(values: &[Value]) -> Option<FontFamily> {
    // consecutive idents form one unquoted family name
    let mut names = Vec::new();
    let mut current = Vec::new();
    for value in values {
        match value {
            Value::Ident(word) => current.push(word.as_str()),
            Value::Str(name) => names.push(name.clone()),
            Value::Comma => {
                if !current.is_empty() {
                    names.push(current.join(" "));
                    current.clear();
                }
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        names.push(current.join(" "));
    }
    names.iter().find_map(|name| FontFamily::from_name(name))
}

fn content(property: &str, values: &[Value]) -> Result<Vec<ContentPart>> {
    values
        .iter()
        .map(|value| match value {
            Value::Str(text) => Ok(ContentPart::Text(text.clone())),
            Value::Function { name, args, .. }
                if name == "counter" && args.first() == Some(&Value::Ident("page".to_string())) =>
            {
                Ok(ContentPart::PageNumber)
            }
            _ => Err(invalid(property, std::slice::from_ref(value))),
        })
        .collect()
}

/// Convert one `property: values` pair into declarations, appending to `out`.
/// Unknown properties are skipped with a warning.
pub fn expand(property: &str, values: &[Value], out: &mut Vec<Declaration>) -> Result<()> {
    if values.is_empty() {
        return Err(invalid(property, values));
    }
    match property {
        "display" => {
            let display = Display::from_keyword(keyword(property, values)?)
                .ok_or_else(|| invalid(property, values))?;
            out.push(Declaration::Display(display));
        }
        "visibility" => out.push(Declaration::Visibility(match keyword(property, values)? {
            "visible" => true,
            "hidden" | "collapse" => false,
            _ => return Err(invalid(property, values)),
        })),
        "font-family" => match font_family(values) {
            Some(family) => out.push(Declaration::FontFamily(family)),
            None => log::warn!("No standard font for font-family {values:?}, keeping the inherited one"),
        },
        "font-size" => out.push(Declaration::FontSize(length(property, single(property, values)?)?)),
        "font-weight" => {
            let weight = match single(property, values)? {
                Value::Ident(name) => match name.as_str() {
                    "bold" | "bolder" => FontWeight::Bold,
                    "normal" | "lighter" => FontWeight::Normal,
                    _ => return Err(invalid(property, values)),
                },
                Value::Number(n) if *n >= 600.0 => FontWeight::Bold,
                Value::Number(_) => FontWeight::Normal,
                _ => return Err(invalid(property, values)),
            };
            out.push(Declaration::FontWeight(weight));
        }
        "font-style" => out.push(Declaration::FontStyle(match keyword(property, values)? {
            "italic" | "oblique" => FontStyle::Italic,
            "normal" => FontStyle::Normal,
            _ => return Err(invalid(property, values)),
        })),
        "text-decoration" => out.push(Declaration::TextDecoration(match keyword(property, values)? {
            "none" => TextDecoration::None,
            "underline" => TextDecoration::Underline,
            "line-through" => TextDecoration::LineThrough,
            _ => return Err(invalid(property, values)),
        })),
        "color" => out.push(Declaration::Color(color(property, single(property, values)?)?)),
        "background-color" | "background" => {
            let value = single(property, values)?;
            let paint = match value {
                Value::Ident(name) if name == "transparent" || name == "none" => None,
                _ => Some(color(property, value)?),
            };
            out.push(Declaration::BackgroundColor(paint));
        }
        "text-align" => out.push(Declaration::TextAlign(match keyword(property, values)? {
            "left" | "start" => TextAlign::Left,
            "right" | "end" => TextAlign::Right,
            "center" => TextAlign::Center,
            "justify" => TextAlign::Justify,
            _ => return Err(invalid(property, values)),
        })),
        "vertical-align" => out.push(Declaration::VerticalAlign(match keyword(property, values)? {
            "top" | "baseline" | "text-top" => VerticalAlign::Top,
            "middle" => VerticalAlign::Middle,
            "bottom" | "text-bottom" => VerticalAlign::Bottom,
            _ => return Err(invalid(property, values)),
        })),
        "margin" => boxed(property, values, length, Declaration::Margin, out)?,
        "padding" => boxed(property, values, length, Declaration::Padding, out)?,
        "border-width" => boxed(property, values, length, Declaration::BorderWidth, out)?,
        "border-color" => boxed(property, values, color, Declaration::BorderColor, out)?,
        "border-style" => boxed(property, values, border_style, Declaration::BorderStyle, out)?,
        "border" => border_shorthand(property, values, &Side::ALL, out)?,
        "page-break-before" => out.push(Declaration::PageBreakBefore(keyword(property, values)? == "always")),
        "page-break-after" => out.push(Declaration::PageBreakAfter(keyword(property, values)? == "always")),
        "page-break-inside" => out.push(Declaration::PageBreakInside(keyword(property, values)? != "avoid")),
        "border-collapse" => out.push(Declaration::BorderCollapse(match keyword(property, values)? {
            "collapse" => BorderCollapse::Collapse,
            "separate" => BorderCollapse::Separate,
            _ => return Err(invalid(property, values)),
        })),
        "border-spacing" => {
            let lengths = values
                .iter()
                .map(|v| length(property, v))
                .collect::<Result<Vec<f64>>>()?;
            let (horizontal, vertical) = match lengths[..] {
                [both] => (both, both),
                [horizontal, vertical] => (horizontal, vertical),
                _ => return Err(invalid(property, values)),
            };
            out.push(Declaration::BorderSpacingHorizontal(horizontal));
            out.push(Declaration::BorderSpacingVertical(vertical));
        }
        "content" => out.push(Declaration::PageBottomRightContent(content(property, values)?)),
        _ => {
            let parts: Vec<&str> = property.split('-').collect();
            match parts[..] {
                ["margin", side] | ["padding", side] | ["border", side] | ["border", side, _] => {
                    let Some(side) = side_of(side) else {
                        log::warn!("Ignoring unsupported property '{property}'");
                        return Ok(());
                    };
                    match parts[..] {
                        ["margin", _] => out.push(Declaration::Margin(side, length(property, single(property, values)?)?)),
                        ["padding", _] => out.push(Declaration::Padding(side, length(property, single(property, values)?)?)),
                        ["border", _] => border_shorthand(property, values, &[side], out)?,
                        [_, _, "width"] => out.push(Declaration::BorderWidth(side, length(property, single(property, values)?)?)),
                        [_, _, "color"] => out.push(Declaration::BorderColor(side, color(property, single(property, values)?)?)),
                        [_, _, "style"] => {
                            out.push(Declaration::BorderStyle(side, border_style(property, single(property, values)?)?))
                        }
                        _ => log::warn!("Ignoring unsupported property '{property}'"),
                    }
                }
                _ => log::warn!("Ignoring unsupported property '{property}'"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declarations(property: &str, values: Vec<Value>) -> Vec<Declaration> {
        let mut out = Vec::new();
        expand(property, &values, &mut out).unwrap();
        out
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(to_points(10.0, "px").unwrap(), 10.0);
        assert_eq!(to_points(1.0, "in").unwrap(), 72.0);
        assert!((to_points(2.54, "cm").unwrap() - 72.0).abs() < 1e-9);
        assert!((to_points(25.4, "mm").unwrap() - 72.0).abs() < 1e-9);
        assert!(matches!(to_points(1.0, "em"), Err(QuireError::UnknownUnit(u)) if u == "em"));
    }

    #[test]
    fn box_shorthand_expansion() {
        assert_eq!(expand_box(&[1]), Some([1, 1, 1, 1]));
        assert_eq!(expand_box(&[1, 2]), Some([1, 2, 1, 2]));
        assert_eq!(expand_box(&[1, 2, 3]), Some([1, 2, 3, 2]));
        assert_eq!(expand_box(&[1, 2, 3, 4]), Some([1, 2, 3, 4]));
        assert_eq!(expand_box::<i32>(&[]), None);
    }

    #[test]
    fn margin_two_values() {
        let out = declarations("margin", vec![Value::Number(5.0), Value::Dimension(1.0, "in".into())]);
        assert_eq!(
            out,
            vec![
                Declaration::Margin(Side::Top, 5.0),
                Declaration::Margin(Side::Right, 72.0),
                Declaration::Margin(Side::Bottom, 5.0),
                Declaration::Margin(Side::Left, 72.0),
            ]
        );
    }

    #[test]
    fn border_side_shorthand() {
        let out = declarations(
            "border-bottom",
            vec![
                Value::Dimension(2.0, "px".into()),
                Value::Ident("dashed".into()),
                Value::Ident("red".into()),
            ],
        );
        assert_eq!(out.len(), 3);
        assert!(out.contains(&Declaration::BorderWidth(Side::Bottom, 2.0)));
        assert!(out.contains(&Declaration::BorderStyle(Side::Bottom, BorderStyle::Dashed)));
        assert!(out.contains(&Declaration::BorderColor(Side::Bottom, Color::rgb(1.0, 0.0, 0.0))));
    }

    #[test]
    fn hex_color() {
        let out = declarations("color", vec![Value::Hash("00ff00".into())]);
        assert_eq!(out, vec![Declaration::Color(Color::rgb(0.0, 1.0, 0.0))]);
    }

    #[test]
    fn font_family_picks_first_standard_face() {
        let out = declarations(
            "font-family",
            vec![
                Value::Str("Fancy Sans".into()),
                Value::Comma,
                Value::Ident("times".into()),
                Value::Ident("new".into()),
                Value::Ident("roman".into()),
            ],
        );
        assert_eq!(out, vec![Declaration::FontFamily(FontFamily::Times)]);
    }

    #[test]
    fn unknown_property_is_ignored() {
        assert!(declarations("float", vec![Value::Ident("left".into())]).is_empty());
    }

    #[test]
    fn unknown_unit_fails() {
        let mut out = Vec::new();
        let err = expand("padding", &[Value::Dimension(1.0, "em".into())], &mut out).unwrap_err();
        assert!(matches!(err, QuireError::UnknownUnit(_)));
    }
}
