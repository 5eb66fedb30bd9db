use sysinfo::{MemoryRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub total_mb: u64,
    pub used_mb: u64,
    pub avail_mb: u64,
}

pub fn memory_stats_mb() -> MemoryStats {
    let mut sys = System::new_with_specifics(RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()));
    sys.refresh_memory();
    // sysinfo reports bytes
    let total_mb = sys.total_memory() / (1024 * 1024);
    let avail_mb = sys.available_memory() / (1024 * 1024);
    let used_mb = total_mb.saturating_sub(avail_mb);
    MemoryStats { total_mb, used_mb, avail_mb }
}
