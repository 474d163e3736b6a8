//! Pager (§4.3): a page-indexed cache over the backing file. Pages fault in
//! on demand, page allocation is strictly append-only (no free list), and
//! every cached page is written back on close — there is no dirty-bit
//! tracking, every slot is treated as potentially dirty.
//!
//! Every failure in this layer is fatal: the core has no partial-failure
//! recovery, so I/O errors and corrupt files propagate as `Error` rather
//! than an operational result.
use crate::err;
use crate::errors::Error;
use crate::node::{Page, PAGE_SIZE, TABLE_MAX_PAGES};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace};

pub struct Pager {
    file: File,
    /// Number of pages that exist, on disk or in the cache. Grows
    /// monotonically; `get_unused_page_num` always hands back this value,
    /// so new pages land contiguously after the last allocated one.
    num_pages: u32,
    /// Pages seen so far in this run. `None` until faulted in by
    /// `get_page`. Fixed capacity mirrors `TABLE_MAX_PAGES`, the documented
    /// cache-size limit (400 KiB).
    pages: heapless::Vec<Option<Box<Page>>, TABLE_MAX_PAGES>,
}

impl Pager {
    /// Opens or creates `filename` for read+write. A file whose length is
    /// not a whole number of pages is rejected as corrupt.
    pub fn open(filename: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(filename)?;
        let file_length = file.metadata()?.len();

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Corrupt,
                "db file length {} is not a multiple of the page size {}",
                file_length,
                PAGE_SIZE
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut pages = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            // heapless::Vec is pre-sized to its capacity; this never fails.
            let _ = pages.push(None);
        }

        debug!(num_pages, "Opened pager");
        Ok(Pager {
            file,
            num_pages,
            pages,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the cached buffer for `page_num`, faulting it in from disk
    /// (or zero-filling, if it doesn't exist yet) on a cache miss.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Page, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                PageOutOfBounds,
                "tried to fetch page {}, max is {}",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        if self.pages[page_num as usize].is_none() {
            let mut page = Box::new([0u8; PAGE_SIZE]);
            // A page only exists on disk if it was already accounted for
            // when we computed num_pages at open() (or by a prior flush in
            // this run); anything at or past that boundary is a fresh,
            // zero-filled page.
            if page_num < self.num_pages {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(page.as_mut_slice())?;
                trace!(page_num, "Faulted in page from disk");
            } else {
                trace!(page_num, "Allocated new zero-filled page");
            }
            self.pages[page_num as usize] = Some(page);
        }

        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        Ok(self.pages[page_num as usize].as_mut().unwrap())
    }

    /// The next page number to allocate. No free list — allocation is
    /// strictly append-only in on-disk order.
    pub fn get_unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Writes the cached page back to the file at `page_num * PAGE_SIZE`.
    /// Fatal if the slot has never been faulted in.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let page = self.pages[page_num as usize]
            .as_ref()
            .ok_or_else(|| err!(Storage, "tried to flush unallocated page {}", page_num))?;

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    /// Flushes and releases every populated slot, then closes the file.
    pub fn close(&mut self) -> Result<(), Error> {
        for page_num in 0..self.num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
                self.pages[page_num as usize] = None;
            }
        }
        self.file.sync_all()?;
        debug!(num_pages = self.num_pages, "Closed pager");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn open_empty_file_has_zero_pages() {
        let tmp = NamedTempFile::new().unwrap();
        let pager = Pager::open(tmp.path()).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn open_rejects_corrupt_length() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![0u8; 100]).unwrap();
        match Pager::open(tmp.path()) {
            Err(Error::Corrupt(_)) => {}
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn get_page_rejects_out_of_bounds() {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        match pager.get_page(TABLE_MAX_PAGES as u32) {
            Err(Error::PageOutOfBounds(_)) => {}
            other => panic!("expected PageOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn flush_and_reopen_round_trips_bytes() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut pager = Pager::open(tmp.path()).unwrap();
            let page = pager.get_page(0).unwrap();
            page[0] = 0xAB;
            pager.flush(0).unwrap();
        }
        {
            let mut pager = Pager::open(tmp.path()).unwrap();
            assert_eq!(pager.num_pages(), 1);
            let page = pager.get_page(0).unwrap();
            assert_eq!(page[0], 0xAB);
        }
    }

    #[test]
    fn get_unused_page_num_is_append_only() {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        assert_eq!(pager.get_unused_page_num(), 0);
        pager.get_page(0).unwrap();
        assert_eq!(pager.get_unused_page_num(), 1);
        pager.get_page(1).unwrap();
        assert_eq!(pager.get_unused_page_num(), 2);
    }
}
