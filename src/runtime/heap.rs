// Fri Oct 16 2026 - Alex

use crate::memory::{Address, WORD_SIZE};
use crate::runtime::{AllocationSizer, ClassRef, MetadataError, TypeMetadata};
use parking_lot::Mutex;
use std::alloc::{self, Layout};
use std::collections::BTreeMap;

const INSTANCE_ALIGN: usize = 16;

/// Allocator for object instances that remembers every block size, so it can answer
/// "how large is the allocation at this address".
pub struct InstanceHeap {
    allocated_blocks: Mutex<BTreeMap<usize, usize>>,
}

impl InstanceHeap {
    pub fn new() -> Self {
        Self {
            allocated_blocks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Zeroed instance of `class` with its header set.
    pub fn allocate(&self, metadata: &dyn TypeMetadata, class: ClassRef) -> Result<Address, MetadataError> {
        let size = metadata.instance_size(class)?;
        self.allocate_with_size(class, size)
    }

    /// Zeroed block of `size` bytes whose header claims `class`. The size need not match the
    /// class, which is how undersized allocations are produced.
    pub fn allocate_with_size(&self, class: ClassRef, size: usize) -> Result<Address, MetadataError> {
        let size = size.max(WORD_SIZE);
        let layout = Layout::from_size_align(size, INSTANCE_ALIGN)
            .map_err(|_| MetadataError::AllocationFailed(size))?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(MetadataError::AllocationFailed(size));
        }
        let address = Address::from_ptr(ptr);
        self.allocated_blocks.lock().insert(address.as_usize(), size);
        self.write_word(address, 0, class.header_word())?;
        Ok(address)
    }

    pub fn write_bytes(&self, object: Address, offset: usize, data: &[u8]) -> Result<(), MetadataError> {
        let blocks = self.allocated_blocks.lock();
        let size = *blocks
            .get(&object.as_usize())
            .ok_or(MetadataError::NotAllocated(object))?;
        if offset.checked_add(data.len()).map_or(true, |end| end > size) {
            return Err(MetadataError::OutOfBounds {
                offset,
                len: data.len(),
                size,
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (object.as_usize() as *mut u8).add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    pub fn write_word(&self, object: Address, offset: usize, value: usize) -> Result<(), MetadataError> {
        self.write_bytes(object, offset, &value.to_ne_bytes())
    }

    pub fn free(&self, object: Address) -> Result<(), MetadataError> {
        let size = self
            .allocated_blocks
            .lock()
            .remove(&object.as_usize())
            .ok_or(MetadataError::NotAllocated(object))?;
        unsafe {
            alloc::dealloc(object.as_usize() as *mut u8, block_layout(size));
        }
        Ok(())
    }

    pub fn is_allocated(&self, object: Address) -> bool {
        self.allocated_blocks.lock().contains_key(&object.as_usize())
    }

    pub fn live_count(&self) -> usize {
        self.allocated_blocks.lock().len()
    }
}

fn block_layout(size: usize) -> Layout {
    // Same parameters accepted at allocation time.
    unsafe { Layout::from_size_align_unchecked(size, INSTANCE_ALIGN) }
}

impl Default for InstanceHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationSizer for InstanceHeap {
    fn allocation_size(&self, address: Address) -> Option<usize> {
        self.allocated_blocks.lock().get(&address.as_usize()).copied()
    }
}

impl Drop for InstanceHeap {
    fn drop(&mut self) {
        for (&start, &size) in self.allocated_blocks.get_mut().iter() {
            unsafe {
                alloc::dealloc(start as *mut u8, block_layout(size));
            }
        }
    }
}
