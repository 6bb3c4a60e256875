// Wed Oct 14 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange, MemoryRegion, Protection};
use crate::runtime::AllocationSizer;
use std::path::Path;

const SELF_MAPS: &str = "/proc/self/maps";

/// Parse the text of a `/proc/<pid>/maps` file.
pub fn parse_maps(text: &str) -> Result<Vec<MemoryRegion>, MemoryError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Result<MemoryRegion, MemoryError> {
    let bad = || MemoryError::MapsParse(line.to_string());
    let mut columns = line.split_whitespace();

    let span = columns.next().ok_or_else(bad)?;
    let (start, end) = span.split_once('-').ok_or_else(bad)?;
    let start = usize::from_str_radix(start, 16).map_err(|_| bad())?;
    let end = usize::from_str_radix(end, 16).map_err(|_| bad())?;
    let range = MemoryRange::new(Address::new(start), Address::new(end)).ok_or_else(bad)?;

    let protection = columns.next().and_then(Protection::from_perms).ok_or_else(bad)?;
    let offset = columns
        .next()
        .and_then(|o| u64::from_str_radix(o, 16).ok())
        .ok_or_else(bad)?;
    // device and inode
    columns.next().ok_or_else(bad)?;
    columns.next().ok_or_else(bad)?;
    let name = columns.collect::<Vec<_>>().join(" ");

    Ok(MemoryRegion::new(range, protection, name).with_offset(offset))
}

pub fn read_maps(path: &Path) -> Result<Vec<MemoryRegion>, MemoryError> {
    let text = std::fs::read_to_string(path)?;
    parse_maps(&text)
}

pub fn self_regions() -> Result<Vec<MemoryRegion>, MemoryError> {
    read_maps(Path::new(SELF_MAPS))
}

/// Allocation sizes from the process memory map: the readable bytes left in the mapping that
/// contains the address. This bounds an allocation from above; it does not know heap blocks.
#[derive(Debug, Default)]
pub struct MappingSizer;

impl MappingSizer {
    pub fn new() -> Self {
        Self
    }
}

impl AllocationSizer for MappingSizer {
    fn allocation_size(&self, address: Address) -> Option<usize> {
        let regions = match self_regions() {
            Ok(regions) => regions,
            Err(e) => {
                log::debug!("memory map unavailable: {}", e);
                return None;
            }
        };
        regions
            .iter()
            .filter(|region| region.is_readable())
            .find_map(|region| region.range().remaining_from(address))
    }
}
