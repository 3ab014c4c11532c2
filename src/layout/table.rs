//! Tables, row groups and rows.
//!
//! Column widths are resolved once per available width and cached on the
//! column group, so every row of a table (and every fragment of a split
//! table, which shares the column group) lays its cells out on the same
//! grid. A row forces all its cells to the height of the tallest one.
//!
//! The header group repeats at the top of each page a table fragment lands
//! on; it records the page it was last drawn on so a table measured twice
//! on the same page reserves it once. The footer closes every fragment.

use super::{LayoutContext, Split};
use crate::draw::{draw_background, draw_border_and_background, Surface};
use crate::error::{QuireError, Result};
use crate::style::BorderCollapse;
use crate::tree::{Behavior, BoxTree, Child, ColumnSpec, NodeId, TableState};

impl BoxTree {
    fn table_state(&self, id: NodeId) -> Option<&TableState> {
        match &self.node(id).behavior {
            Behavior::Table(state) => Some(state),
            _ => None,
        }
    }

    fn colspan(&self, cell: NodeId) -> usize {
        match self.node(cell).behavior {
            Behavior::TableCell { colspan } => colspan,
            _ => 1,
        }
    }

    fn row_cells(&self, row: NodeId) -> Vec<NodeId> {
        self.node(row)
            .child_nodes()
            .filter(|c| matches!(self.node(*c).behavior, Behavior::TableCell { .. }))
            .collect()
    }

    fn group_rows(&self, group: NodeId) -> Vec<NodeId> {
        self.node(group)
            .child_nodes()
            .filter(|c| matches!(self.node(*c).behavior, Behavior::TableRow))
            .collect()
    }

    fn drawn_on(&self, group: NodeId) -> Option<u32> {
        match self.node(group).behavior {
            Behavior::TableRowGroup { drawn_on, .. } => drawn_on,
            _ => None,
        }
    }

    /// The header group, if there is one that has not been drawn on the
    /// current page yet.
    fn pending_header(&self, table: NodeId, ctx: &LayoutContext) -> Option<NodeId> {
        self.table_state(table)
            .and_then(|state| state.header)
            .filter(|header| self.drawn_on(*header) != Some(ctx.page_number))
    }

    /// Horizontal spacing between collapsed cells, or zero.
    fn collapse_spacing(&self, id: NodeId) -> f64 {
        let table = match self.node(id).behavior {
            Behavior::Table(_) => Some(id),
            _ => self.table_of(id),
        };
        match table.map(|t| &self.node(t).style) {
            Some(style) if style.border_collapse == BorderCollapse::Collapse => style.border_spacing_horizontal,
            _ => 0.0,
        }
    }

    /// Header rows followed by body rows: the rows that decide content-sized
    /// columns.
    fn measured_rows(&self, table: NodeId) -> Vec<NodeId> {
        let Some(state) = self.table_state(table) else {
            return Vec::new();
        };
        let mut rows = state.header.map(|h| self.group_rows(h)).unwrap_or_default();
        rows.extend(state.rows.iter().copied());
        rows
    }

    /// Number of column slots a row occupies, counting spans.
    fn slot_count(&self, row: NodeId) -> usize {
        self.row_cells(row).iter().map(|cell| self.colspan(*cell)).sum()
    }

    /// The widest natural width among single-slot cells in column `index`
    /// when laid out at `width`.
    fn measure_column(&mut self, rows: &[NodeId], index: usize, width: f64, ctx: &LayoutContext) -> f64 {
        let mut widest: f64 = 0.0;
        for row in rows {
            let mut slot = 0;
            for cell in self.row_cells(*row) {
                let span = self.colspan(cell);
                if span == 1 && slot == index {
                    let (natural, _) = self.measure(cell, width, ctx);
                    widest = widest.max(natural);
                }
                slot += span;
            }
        }
        widest
    }

    /// Resolve the widths of the table's columns for `available_width`.
    ///
    /// Fixed columns take their width, content-sized columns the natural
    /// width of their widest cell (laid out no wider than `available_width`
    /// and clamped to it), and proportional columns share what is
    /// left by their units. Slots beyond the declared columns count as `1*`;
    /// a table without any column declarations splits the width evenly.
    pub fn column_widths(&mut self, table: NodeId, available_width: f64, ctx: &LayoutContext) -> Vec<f64> {
        let group = self.table_state(table).and_then(|state| state.columns);
        let specs = match group.map(|g| &self.node(g).behavior) {
            Some(Behavior::TableColumnGroup(state)) => {
                if state.resolved_for == Some(available_width) {
                    return state.widths.clone();
                }
                state.specs.clone()
            }
            _ => Vec::new(),
        };

        let rows = self.measured_rows(table);
        let slots = rows.iter().map(|row| self.slot_count(*row)).max().unwrap_or(0);
        let widths = if specs.is_empty() {
            vec![available_width / slots.max(1) as f64; slots]
        } else {
            let mut specs = specs;
            if specs.len() < slots {
                specs.resize(slots, ColumnSpec::Proportional(1.0));
            }
            let mut widths = Vec::with_capacity(specs.len());
            for (index, spec) in specs.iter().enumerate() {
                widths.push(match spec {
                    ColumnSpec::Fixed(width) => *width,
                    ColumnSpec::MaxContent => self
                        .measure_column(&rows, index, available_width, ctx)
                        .min(available_width),
                    ColumnSpec::MinContent => self.measure_column(&rows, index, 0.0, ctx).min(available_width),
                    ColumnSpec::Proportional(_) => 0.0,
                });
            }
            let taken: f64 = widths.iter().sum();
            let units: f64 = specs
                .iter()
                .map(|spec| match spec {
                    ColumnSpec::Proportional(units) => *units,
                    _ => 0.0,
                })
                .sum();
            if units > 0.0 {
                let unit = (available_width - taken).max(0.0) / units;
                for (width, spec) in widths.iter_mut().zip(&specs) {
                    if let ColumnSpec::Proportional(units) = spec {
                        *width = units * unit;
                    }
                }
            }
            widths
        };

        log::debug!(
            "<{}> columns at {:.1}pt: {:?}",
            self.node(table).tag,
            available_width,
            widths
        );
        if let Some(group) = group {
            if let Behavior::TableColumnGroup(state) = &mut self.node_mut(group).behavior {
                state.resolved_for = Some(available_width);
                state.widths = widths.clone();
            }
        }
        widths
    }

    pub(crate) fn wrap_table(&mut self, id: NodeId, available_width: f64, ctx: &LayoutContext) -> (f64, f64) {
        let frame = self.frame(id);
        let inner = (available_width - frame.horizontal()).max(0.0);
        let widths = self.column_widths(id, inner, ctx);
        let state = self.table_state(id).cloned().unwrap_or_default();

        let mut height = frame.vertical();
        if let Some(caption) = state.caption {
            height += self.measure(caption, inner, ctx).1;
        }
        if let Some(header) = self.pending_header(id, ctx) {
            height += self.wrap_group(header, inner, ctx);
        }
        for row in &state.rows {
            height += self.wrap_row(*row, &widths, ctx).1;
        }
        if let Some(footer) = state.footer {
            height += self.wrap_group(footer, inner, ctx);
        }

        let node = self.node_mut(id);
        node.width = Some(available_width);
        node.height = Some(height);
        (widths.iter().sum::<f64>() + frame.horizontal(), height)
    }

    /// Lay out every row of a group; returns the group's height.
    pub(crate) fn wrap_group(&mut self, id: NodeId, available_width: f64, ctx: &LayoutContext) -> f64 {
        let widths = match self.table_of(id) {
            Some(table) => self.column_widths(table, available_width, ctx),
            None => Vec::new(),
        };
        let mut height = 0.0;
        for row in self.group_rows(id) {
            height += self.wrap_row(row, &widths, ctx).1;
        }
        let node = self.node_mut(id);
        node.width = Some(available_width);
        node.height = Some(height);
        height
    }

    pub(crate) fn wrap_row_in_table(&mut self, id: NodeId, available_width: f64, ctx: &LayoutContext) -> (f64, f64) {
        let widths = match self.table_of(id) {
            Some(table) => self.column_widths(table, available_width, ctx),
            None => Vec::new(),
        };
        self.wrap_row(id, &widths, ctx)
    }

    /// Measure each cell at the width of the columns it spans, then force
    /// every cell to the tallest cell's height.
    fn wrap_row(&mut self, id: NodeId, widths: &[f64], ctx: &LayoutContext) -> (f64, f64) {
        let frame = self.frame(id);
        let spacing = self.collapse_spacing(id);
        let cells = self.row_cells(id);

        let mut slot = 0;
        let mut tallest: f64 = 0.0;
        let mut total = 0.0;
        for cell in &cells {
            let span = self.colspan(*cell);
            let mut width: f64 = widths.iter().skip(slot).take(span).sum();
            if span > 1 {
                width += spacing / 2.0 * span as f64;
            }
            slot += span;
            let (_, height) = self.measure(*cell, width, ctx);
            tallest = tallest.max(height);
            total += width;
        }
        for cell in &cells {
            self.node_mut(*cell).height = Some(tallest);
        }

        let height = frame.vertical() + tallest;
        let node = self.node_mut(id);
        node.width = Some(total);
        node.height = Some(height);
        (total, height)
    }

    /// Split every cell at the same height. A cell with nothing left for one
    /// half gets an empty placeholder there, so both rows keep the same
    /// column slots.
    pub(crate) fn split_row(
        &mut self,
        id: NodeId,
        top_parent: Option<NodeId>,
        bottom_parent: Option<NodeId>,
        available_height: f64,
        ctx: &LayoutContext,
    ) -> Result<Split> {
        let content_height = available_height - self.frame(id).vertical();
        let cells = self.row_cells(id);
        // cell halves are attached to the row clones afterwards
        let mut halves = Vec::with_capacity(cells.len());
        for cell in &cells {
            halves.push(self.split(*cell, None, None, content_height, ctx)?);
        }
        if halves.iter().all(|(top, _)| top.is_none()) {
            return Ok((None, Some(id)));
        }
        let continues = halves.iter().any(|(_, bottom)| bottom.is_some());
        let top_row = self.clone_node(id, top_parent);
        let bottom_row = continues.then(|| self.clone_node(id, bottom_parent));

        for (cell, (top, bottom)) in cells.iter().zip(halves) {
            let top = top.unwrap_or_else(|| self.placeholder(*cell, top_row));
            self.attach_cell(top_row, top);
            if let Some(bottom_row) = bottom_row {
                let bottom = bottom.unwrap_or_else(|| self.placeholder(*cell, bottom_row));
                self.attach_cell(bottom_row, bottom);
            }
        }
        Ok((Some(top_row), bottom_row))
    }

    /// An empty cell standing in for `cell`, keeping its span and style.
    fn placeholder(&mut self, cell: NodeId, row: NodeId) -> NodeId {
        let id = self.clone_node(cell, Some(row));
        self.node_mut(id).flow = Some(Vec::new());
        id
    }

    fn attach_cell(&mut self, row: NodeId, cell: NodeId) {
        self.reparent(cell, row);
        self.node_mut(row).children.push(Child::Node(cell));
    }

    /// Split between body rows, or inside the straddling row. The caption
    /// stays with the top fragment; header and footer are shared.
    pub(crate) fn split_table(
        &mut self,
        id: NodeId,
        top_parent: Option<NodeId>,
        bottom_parent: Option<NodeId>,
        available_height: f64,
        ctx: &LayoutContext,
    ) -> Result<Split> {
        if !self.node(id).style.page_break_inside {
            return Ok((None, Some(id)));
        }
        let state = self.table_state(id).cloned().unwrap_or_default();
        let height_of = |tree: &BoxTree, id: Option<NodeId>| id.and_then(|id| tree.node(id).height).unwrap_or(0.0);

        let reserved = self.frame(id).vertical()
            + height_of(self, state.caption)
            + height_of(self, self.pending_header(id, ctx))
            + height_of(self, state.footer);
        if reserved >= available_height {
            log::debug!(
                "<{}> needs {:.1}pt for caption, header and footer, {:.1}pt left",
                self.node(id).tag,
                reserved,
                available_height
            );
            return Ok((None, Some(id)));
        }

        let limit = available_height - reserved;
        let mut consumed = 0.0;
        let mut index = state.rows.len();
        for (i, row) in state.rows.iter().enumerate() {
            let height = height_of(self, Some(*row));
            if consumed + height > limit {
                index = i;
                break;
            }
            consumed += height;
        }
        if index == state.rows.len() {
            return Ok((Some(id), None));
        }

        let mut top_rows = state.rows[..index].to_vec();
        let mut bottom_rows = state.rows[index + 1..].to_vec();
        match self.split(state.rows[index], None, None, limit - consumed, ctx)? {
            (None, Some(row)) => bottom_rows.insert(0, row),
            (Some(row), None) => top_rows.push(row),
            (Some(upper), Some(lower)) => {
                top_rows.push(upper);
                bottom_rows.insert(0, lower);
            }
            (None, None) => {
                return Err(QuireError::Layout(format!(
                    "splitting row {} of <{}> produced neither half",
                    index,
                    self.node(id).tag
                )))
            }
        }
        if top_rows.is_empty() {
            return Ok((None, Some(id)));
        }
        log::trace!(
            "splitting <{}>: {} rows stay, {} move on",
            self.node(id).tag,
            top_rows.len(),
            bottom_rows.len()
        );

        let top = self.clone_node(id, top_parent);
        self.fill_table(top, top_rows, state.caption);
        if bottom_rows.is_empty() {
            return Ok((Some(top), None));
        }
        let bottom = self.clone_node(id, bottom_parent);
        self.fill_table(bottom, bottom_rows, None);
        Ok((Some(top), Some(bottom)))
    }

    fn fill_table(&mut self, table: NodeId, rows: Vec<NodeId>, caption: Option<NodeId>) {
        for row in &rows {
            self.reparent(*row, table);
        }
        if let Some(caption) = caption {
            self.reparent(caption, table);
        }
        let node = self.node_mut(table);
        node.children = rows.iter().map(|row| Child::Node(*row)).collect();
        if let Behavior::Table(state) = &mut node.behavior {
            state.caption = caption;
            state.rows = rows;
        }
    }

    pub(crate) fn draw_table(
        &mut self,
        id: NodeId,
        surface: &mut dyn Surface,
        x: f64,
        y: f64,
        ctx: &LayoutContext,
    ) -> (f64, f64) {
        let frame = self.frame(id);
        let node = self.node(id);
        let style = node.style.clone();
        let width = node.width.unwrap_or(0.0);
        let height = node.height.unwrap_or(0.0);
        let state = self.table_state(id).cloned().unwrap_or_default();
        if style.visibility {
            draw_border_and_background(
                surface,
                &style,
                x + style.margin.left,
                y + style.margin.top,
                width - style.margin.horizontal(),
                height - style.margin.vertical(),
            );
        }

        let inner_x = x + frame.left;
        let mut top = y + frame.top;
        if let Some(caption) = state.caption {
            top = self.draw(caption, surface, inner_x, top, ctx).1;
        }
        if let Some(header) = self.pending_header(id, ctx) {
            top = self.draw_group(header, surface, inner_x, top, ctx).1;
        }
        for row in &state.rows {
            top = self.draw_row(*row, surface, inner_x, top, ctx).1;
        }
        if let Some(footer) = state.footer {
            self.draw_group(footer, surface, inner_x, top, ctx);
        }
        (x, y + height)
    }

    pub(crate) fn draw_group(
        &mut self,
        id: NodeId,
        surface: &mut dyn Surface,
        x: f64,
        y: f64,
        ctx: &LayoutContext,
    ) -> (f64, f64) {
        let mut top = y;
        for row in self.group_rows(id) {
            top = self.draw_row(row, surface, x, top, ctx).1;
        }
        if let Behavior::TableRowGroup { drawn_on, .. } = &mut self.node_mut(id).behavior {
            *drawn_on = Some(ctx.page_number);
        }
        (x, top)
    }

    /// Paint the row background (and its borders when collapsed), then each
    /// cell at the row's top, side by side.
    pub(crate) fn draw_row(
        &mut self,
        id: NodeId,
        surface: &mut dyn Surface,
        x: f64,
        y: f64,
        ctx: &LayoutContext,
    ) -> (f64, f64) {
        let frame = self.frame(id);
        let collapsed = self.is_collapsed(id);
        let spacing = self.collapse_spacing(id);
        let node = self.node(id);
        let style = node.style.clone();
        let width = node.width.unwrap_or(0.0);
        let height = node.height.unwrap_or(0.0);

        if style.visibility {
            if collapsed {
                draw_border_and_background(surface, &style, x, y, width, height);
            } else if let Some(background) = style.background_color {
                draw_background(surface, background, x, y, width, height);
            }
        }

        let mut cell_x = x + spacing / 2.0;
        let cell_y = y + frame.top;
        for cell in self.row_cells(id) {
            let cell_width = self.node(cell).width.unwrap_or(0.0);
            self.draw(cell, surface, cell_x, cell_y, ctx);
            cell_x += cell_width + spacing / 2.0;
        }
        (x, y + height)
    }
}
