//! Cursor & table API (§4.5): a positional handle exposing scan and point
//! operations to callers. A cursor is short-lived — produced by
//! `table_start` or `table_find`, consumed by a single operation — and
//! borrows its table for its entire lifetime.
use crate::btree;
use crate::errors::Error;
use crate::node::{Node, NodeType};
use crate::table::Table;

pub struct Cursor<'a> {
    pub table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    /// True once the cursor has advanced one past the last cell of the
    /// scan's final leaf.
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Positions a cursor at the first row in key order: the leftmost
    /// leaf's first cell.
    pub fn table_start(table: &'a mut Table) -> Result<Self, Error> {
        let leaf_page_num = leftmost_leaf(table, table.root_page_num)?;
        let end_of_table = {
            let page = table.pager.get_page(leaf_page_num)?;
            Node::new(page).leaf_num_cells() == 0
        };

        Ok(Cursor {
            table,
            page_num: leaf_page_num,
            cell_num: 0,
            end_of_table,
        })
    }

    /// Positions a cursor at `key`, or at its sorted insertion point if
    /// `key` is absent. Delegates to the tree.
    pub fn table_find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        btree::find(table, key)
    }

    /// Returns the value slot of the cell the cursor currently points at.
    pub fn value(&mut self) -> Result<&[u8], Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        Ok(Node::new(page).leaf_value(self.cell_num as usize))
    }

    /// Advances to the next cell, crossing into the next leaf (via its
    /// `next_leaf` pointer) once the current one is exhausted. Sets
    /// `end_of_table` once there is no further leaf to cross into.
    pub fn advance(&mut self) -> Result<(), Error> {
        let page = self.table.pager.get_page(self.page_num)?;
        let node = Node::new(page);
        self.cell_num += 1;

        if self.cell_num >= node.leaf_num_cells() {
            let next_leaf = node.leaf_next_leaf();
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}

/// Walks `child(0)` from `page_num` down to a leaf. With `TABLE_MAX_PAGES =
/// 100` the tree never grows past two levels in practice, but this holds
/// for any depth.
pub fn leftmost_leaf(table: &mut Table, mut page_num: u32) -> Result<u32, Error> {
    loop {
        let page = table.pager.get_page(page_num)?;
        let node = Node::new(page);
        match node.get_node_type() {
            NodeType::Leaf => return Ok(page_num),
            NodeType::Internal => page_num = node.internal_child(0),
        }
    }
}
