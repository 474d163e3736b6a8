//! Meta-command dispatch (collaborator, §6): introspection commands that
//! print internal state rather than touching the tree through `Statement`.
use crate::errors::Error;
use crate::node::{
    Node, NodeType, COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE,
    LEAF_NODE_MAX_CELLS, LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::row::ROW_SIZE;
use crate::table::Table;

pub enum MetaCommandResult {
    Success,
    Unrecognized,
}

/// Handles a line starting with `.`. `.exit` is handled by the caller (it
/// needs to close the table and stop the loop); everything else is
/// dispatched here.
pub fn do_meta_command(input: &str, table: &mut Table) -> Result<MetaCommandResult, Error> {
    match input {
        ".btree" => {
            print_tree(table)?;
            Ok(MetaCommandResult::Success)
        }
        ".constants" => {
            print_constants();
            Ok(MetaCommandResult::Success)
        }
        _ => Ok(MetaCommandResult::Unrecognized),
    }
}

fn print_tree(table: &mut Table) -> Result<(), Error> {
    crate::echo!("Tree:\n");
    let page = table.pager.get_page(table.root_page_num)?;
    let node = Node::new(page);
    match node.get_node_type() {
        NodeType::Leaf => {
            let num_cells = node.leaf_num_cells();
            crate::echo!("leaf (size {})\n", num_cells);
            for i in 0..num_cells {
                crate::echo!("  - {}  :  {}\n", i, node.leaf_key(i as usize));
            }
        }
        NodeType::Internal => {
            let num_keys = node.internal_num_keys();
            crate::echo!("internal (size {})\n", num_keys);
            for i in 0..num_keys {
                crate::echo!(
                    "  - child {}  :  {}\n",
                    node.internal_child(i),
                    node.internal_key(i)
                );
            }
            crate::echo!("  - right child  :  {}\n", node.internal_right_child());
        }
    }
    Ok(())
}

fn print_constants() {
    crate::echo!("Constants:\n");
    crate::echo!("ROW_SIZE: {}\n", ROW_SIZE);
    crate::echo!("COMMON_NODE_HEADER_SIZE: {}\n", COMMON_NODE_HEADER_SIZE);
    crate::echo!("LEAF_NODE_HEADER_SIZE: {}\n", LEAF_NODE_HEADER_SIZE);
    crate::echo!("LEAF_NODE_CELL_SIZE: {}\n", LEAF_NODE_CELL_SIZE);
    crate::echo!("LEAF_NODE_SPACE_FOR_CELLS: {}\n", LEAF_NODE_SPACE_FOR_CELLS);
    crate::echo!("LEAF_NODE_MAX_CELLS: {}\n", LEAF_NODE_MAX_CELLS);
}
