//! Table and database lifecycle (§4.6): the logical handle a caller binds
//! to a filename, plus the `open`/`close` entry points.
use crate::errors::Error;
use crate::node::Node;
use crate::pager::Pager;
use std::path::Path;
use tracing::info;

/// Logical handle bound to one backing file. The root always lives at
/// page 0 for the life of the database.
pub struct Table {
    pub root_page_num: u32,
    pub pager: Pager,
}

/// Opens (or creates) the database file at `filename`. A brand-new file
/// gets an empty root leaf at page 0; an existing one is left as-is — its
/// root page is read lazily the first time a cursor touches it.
pub fn db_open(filename: &Path) -> Result<Table, Error> {
    let mut pager = Pager::open(filename)?;
    let root_page_num = 0;

    if pager.num_pages() == 0 {
        let page = pager.get_page(0)?;
        let mut root = Node::new(page);
        root.initialize_leaf();
        root.set_root(true);
        info!(filename = %filename.display(), "Created new database file");
    } else {
        info!(filename = %filename.display(), num_pages = pager.num_pages(), "Opened database file");
    }

    Ok(Table {
        root_page_num,
        pager,
    })
}

/// Flushes every page slot and releases the file descriptor.
pub fn db_close(table: &mut Table) -> Result<(), Error> {
    table.pager.close()
}
