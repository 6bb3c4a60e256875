// Mon Oct 19 2026 - Alex

pub mod logging;
pub mod pages;

pub use logging::LoggingUtils;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hex_string_spaced(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

/// Sixteen bytes per line, each line prefixed with the address of its first byte.
pub fn hex_dump(base: crate::memory::Address, data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(i, chunk)| format!("{}  {}", base.wrapping_add(i * 16), hex_string_spaced(chunk)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
