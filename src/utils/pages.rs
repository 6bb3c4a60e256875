// Thu Oct 15 2026 - Alex

use crate::memory::{Address, MemoryError};

/// Anonymous read-write pages whose tail can be made inaccessible or unmapped. The demo and the
/// tests lay objects across a page boundary with it so that part of them cannot be read.
pub struct ScratchPages {
    base: *mut u8,
    page_size: usize,
    pages: usize,
    mapped_pages: std::cell::Cell<usize>,
}

unsafe impl Send for ScratchPages {}

impl ScratchPages {
    pub fn new(pages: usize) -> Result<Self, MemoryError> {
        let page_size = page_size();
        let len = pages
            .checked_mul(page_size)
            .ok_or_else(|| MemoryError::InvalidAddress(format!("{} pages do not fit in memory", pages)))?;
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(MemoryError::Io(std::io::Error::last_os_error()));
        }
        Ok(Self {
            base: base as *mut u8,
            page_size,
            pages,
            mapped_pages: std::cell::Cell::new(pages),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn base(&self) -> Address {
        Address::from_ptr(self.base)
    }

    pub fn page(&self, index: usize) -> Address {
        Address::new(self.base as usize + index * self.page_size)
    }

    pub fn len(&self) -> usize {
        self.pages * self.page_size
    }

    /// Copy `data` to `offset` bytes past the base. Panics if the target is outside the
    /// mapping; the target must still be writable.
    pub fn write(&self, offset: usize, data: &[u8]) {
        assert!(offset + data.len() <= self.len(), "write outside scratch pages");
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.base.add(offset), data.len());
        }
    }

    pub fn write_word(&self, offset: usize, value: usize) {
        self.write(offset, &value.to_ne_bytes());
    }

    /// Make the last `count` pages inaccessible.
    pub fn protect_tail(&self, count: usize) -> Result<(), MemoryError> {
        let start = self.pages - count;
        let rc = unsafe {
            libc::mprotect(
                self.base.add(start * self.page_size) as *mut libc::c_void,
                count * self.page_size,
                libc::PROT_NONE,
            )
        };
        if rc != 0 {
            return Err(MemoryError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Unmap the last `count` pages. They are not remapped on drop.
    pub fn unmap_tail(&self, count: usize) -> Result<(), MemoryError> {
        let mapped = self.mapped_pages.get();
        let start = mapped - count;
        let rc = unsafe {
            libc::munmap(
                self.base.add(start * self.page_size) as *mut libc::c_void,
                count * self.page_size,
            )
        };
        if rc != 0 {
            return Err(MemoryError::Io(std::io::Error::last_os_error()));
        }
        self.mapped_pages.set(start);
        Ok(())
    }
}

impl Drop for ScratchPages {
    fn drop(&mut self) {
        let mapped = self.mapped_pages.get();
        if mapped > 0 {
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, mapped * self.page_size);
            }
        }
    }
}

pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}
