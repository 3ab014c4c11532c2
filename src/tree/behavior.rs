//! Layout behaviors: the closed set of strategies a box can have, chosen
//! once from its computed `display` and its parent's behavior.

use super::NodeId;
use crate::css::values::to_points;
use crate::error::{QuireError, Result};
use crate::style::Display;

/// Which of the three row-group slots a row group fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowGroupKind {
    Header,
    Body,
    Footer,
}

/// How a table column gets its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnSpec {
    /// A literal width in points.
    Fixed(f64),
    /// `N*`: a share of whatever the other columns leave over.
    Proportional(f64),
    /// `0*` or `max-content`: the widest cell laid out without wrapping.
    MaxContent,
    /// `min-content`: the narrowest width the cells can wrap to.
    MinContent,
}

impl ColumnSpec {
    /// Parse a `<col width="...">` attribute. A missing width is `1*`.
    pub fn parse(width: Option<&str>) -> Result<Self> {
        let Some(width) = width.map(str::trim).filter(|w| !w.is_empty()) else {
            return Ok(ColumnSpec::Proportional(1.0));
        };
        let invalid = || QuireError::InvalidValue {
            property: "col width".to_string(),
            value: width.to_string(),
        };
        match width {
            "0*" | "max-content" => Ok(ColumnSpec::MaxContent),
            "min-content" => Ok(ColumnSpec::MinContent),
            _ if width.ends_with('*') => {
                let units = &width[..width.len() - 1];
                let units = if units.is_empty() { Ok(1.0) } else { units.parse::<f64>() };
                units.map(ColumnSpec::Proportional).map_err(|_| invalid())
            }
            _ => {
                let split = width
                    .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                    .unwrap_or(width.len());
                let (number, unit) = width.split_at(split);
                let value = number.parse::<f64>().map_err(|_| invalid())?;
                if unit.is_empty() {
                    Ok(ColumnSpec::Fixed(value))
                } else {
                    Ok(ColumnSpec::Fixed(to_points(value, unit)?))
                }
            }
        }
    }

    pub fn is_proportional(&self) -> bool {
        matches!(self, ColumnSpec::Proportional(_))
    }
}

/// The four distinguished children of a table plus its flattened body rows.
/// Slots are indices into the arena, not owners.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    pub caption: Option<NodeId>,
    pub columns: Option<NodeId>,
    pub header: Option<NodeId>,
    pub footer: Option<NodeId>,
    pub rows: Vec<NodeId>,
    /// Whether `columns` still points at the implicit column group.
    pub implicit_columns: bool,
}

/// Column measurements and the resolved widths for one available width.
#[derive(Debug, Clone, Default)]
pub struct ColumnGroupState {
    pub specs: Vec<ColumnSpec>,
    pub resolved_for: Option<f64>,
    pub widths: Vec<f64>,
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Block,
    Inline,
    ListItem,
    Table(TableState),
    TableCaption,
    TableColumnGroup(ColumnGroupState),
    TableColumn { span: usize, spec: ColumnSpec },
    TableRowGroup { kind: RowGroupKind, drawn_on: Option<u32> },
    TableRow,
    TableCell { colspan: usize },
    /// `display: none`; the box and its content take no part in layout.
    Hidden,
}

impl Behavior {
    /// Whether raw text may be appended directly to a box with this behavior.
    pub fn text_allowed(&self) -> bool {
        matches!(
            self,
            Behavior::Block
                | Behavior::Inline
                | Behavior::ListItem
                | Behavior::TableCaption
                | Behavior::TableCell { .. }
        )
    }

    /// Boxes that lay out their children as a stack of lines.
    pub fn is_flow(&self) -> bool {
        self.text_allowed()
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Behavior::Inline)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Block => "block",
            Behavior::Inline => "inline",
            Behavior::ListItem => "list-item",
            Behavior::Table(_) => "table",
            Behavior::TableCaption => "table-caption",
            Behavior::TableColumnGroup(_) => "table-column-group",
            Behavior::TableColumn { .. } => "table-column",
            Behavior::TableRowGroup { .. } => "table-row-group",
            Behavior::TableRow => "table-row",
            Behavior::TableCell { .. } => "table-cell",
            Behavior::Hidden => "none",
        }
    }

    /// A copy carrying the same configuration but none of the per-layout state.
    pub fn fresh_copy(&self) -> Behavior {
        match self {
            Behavior::Table(state) => Behavior::Table(TableState {
                caption: None,
                columns: state.columns,
                header: state.header,
                footer: state.footer,
                rows: Vec::new(),
                implicit_columns: state.implicit_columns,
            }),
            other => other.clone(),
        }
    }
}

/// Decide the behavior of a box from its `display` and its parent's behavior.
/// `attr` looks up the box's markup attributes.
pub fn select(
    tag: &str,
    display: Display,
    parent: Option<(&str, &Behavior)>,
    attr: impl Fn(&str) -> Option<String>,
) -> Result<Behavior> {
    let not_allowed = || match parent {
        Some((parent_tag, _)) => QuireError::Structure {
            tag: tag.to_string(),
            parent: parent_tag.to_string(),
        },
        None => QuireError::Structure {
            tag: tag.to_string(),
            parent: "document".to_string(),
        },
    };
    let parent_behavior = parent.map(|(_, b)| b);
    let span = |name: &str| -> Result<usize> {
        match attr(name) {
            None => Ok(1),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(QuireError::InvalidValue {
                    property: name.to_string(),
                    value,
                }),
            },
        }
    };

    match display {
        Display::None => Ok(Behavior::Hidden),
        Display::Table => match parent_behavior {
            Some(b) if !b.text_allowed() => Err(not_allowed()),
            _ => Ok(Behavior::Table(TableState::default())),
        },
        Display::TableCaption => match parent_behavior {
            Some(Behavior::Table(_)) => Ok(Behavior::TableCaption),
            _ => Err(not_allowed()),
        },
        Display::TableColumnGroup => match parent_behavior {
            Some(Behavior::Table(_)) => Ok(Behavior::TableColumnGroup(ColumnGroupState::default())),
            _ => Err(not_allowed()),
        },
        Display::TableColumn => match parent_behavior {
            Some(Behavior::Table(_)) | Some(Behavior::TableColumnGroup(_)) => Ok(Behavior::TableColumn {
                span: span("span")?,
                spec: ColumnSpec::parse(attr("width").as_deref())?,
            }),
            _ => Err(not_allowed()),
        },
        Display::TableHeaderGroup | Display::TableRowGroup | Display::TableFooterGroup => {
            let kind = match display {
                Display::TableHeaderGroup => RowGroupKind::Header,
                Display::TableFooterGroup => RowGroupKind::Footer,
                _ => RowGroupKind::Body,
            };
            match parent_behavior {
                Some(Behavior::Table(_)) => Ok(Behavior::TableRowGroup { kind, drawn_on: None }),
                _ => Err(not_allowed()),
            }
        }
        Display::TableRow => match parent_behavior {
            Some(Behavior::TableRowGroup { .. }) => Ok(Behavior::TableRow),
            _ => Err(not_allowed()),
        },
        Display::TableCell => match parent_behavior {
            Some(Behavior::TableRow) => Ok(Behavior::TableCell {
                colspan: span("colspan")?,
            }),
            _ => Err(not_allowed()),
        },
        Display::ListItem => match parent_behavior {
            None | Some(Behavior::Block) | Some(Behavior::ListItem) | Some(Behavior::TableCell { .. }) => {
                Ok(Behavior::ListItem)
            }
            _ => Err(not_allowed()),
        },
        Display::Block | Display::Inline => match parent_behavior {
            Some(b) if !b.text_allowed() => Err(not_allowed()),
            _ if display == Display::Block => Ok(Behavior::Block),
            _ => Ok(Behavior::Inline),
        },
    }
}
