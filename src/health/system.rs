//! Host resource readings for the disk, memory and CPU probes

use std::io;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl DiskUsage {
    pub fn free_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.free_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Total and caller-available space on the filesystem holding `path`.
pub fn disk_usage(path: &Path) -> io::Result<DiskUsage> {
    Ok(DiskUsage {
        total_bytes: fs4::total_space(path)?,
        free_bytes: fs4::available_space(path)?,
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    pub fn used_percent(&self) -> f64 {
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        used as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Parse `/proc/meminfo`. Returns `None` when the total is missing or zero.
pub fn parse_meminfo(content: &str) -> Option<MemoryInfo> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total_kb = parts.next().and_then(|v| v.parse::<u64>().ok()),
            Some("MemAvailable:") => available_kb = parts.next().and_then(|v| v.parse::<u64>().ok()),
            _ => {}
        }
    }

    let total_kb = total_kb.filter(|t| *t > 0)?;
    Some(MemoryInfo {
        total_bytes: total_kb * 1024,
        available_bytes: available_kb.unwrap_or(0) * 1024,
    })
}

/// Parse the three load averages from `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Option<[f64; 3]> {
    let mut fields = content.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some([fields.next()??, fields.next()??, fields.next()??])
}

pub fn read_meminfo() -> io::Result<Option<MemoryInfo>> {
    Ok(parse_meminfo(&std::fs::read_to_string("/proc/meminfo")?))
}

pub fn read_loadavg() -> io::Result<Option<[f64; 3]>> {
    Ok(parse_loadavg(&std::fs::read_to_string("/proc/loadavg")?))
}

pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16384000 kB\nMemFree:         1024000 kB\nMemAvailable:    4096000 kB\nBuffers:          512000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let info = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(info.total_bytes, 16_384_000 * 1024);
        assert_eq!(info.available_bytes, 4_096_000 * 1024);
        assert!((info.used_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_meminfo_without_total() {
        assert!(parse_meminfo("MemFree: 10 kB\n").is_none());
        assert!(parse_meminfo("MemTotal: 0 kB\n").is_none());
        assert!(parse_meminfo("").is_none());
    }

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(
            parse_loadavg("0.52 0.58 0.59 1/467 12345\n"),
            Some([0.52, 0.58, 0.59])
        );
        assert_eq!(parse_loadavg("0.52 oops"), None);
        assert_eq!(parse_loadavg(""), None);
    }

    #[test]
    fn test_free_percent() {
        let usage = DiskUsage { total_bytes: 200, free_bytes: 50 };
        assert_eq!(usage.free_percent(), 25.0);
        assert_eq!(DiskUsage { total_bytes: 0, free_bytes: 0 }.free_percent(), 0.0);
    }

    #[test]
    fn test_disk_usage_of_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let usage = disk_usage(dir.path()).unwrap();
        assert!(usage.total_bytes > 0);
        assert!(usage.free_bytes <= usage.total_bytes);
        assert!((0.0..=100.0).contains(&usage.free_percent()));
    }

    #[test]
    fn test_disk_usage_of_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(disk_usage(&dir.path().join("not-there")).is_err());
    }

    #[test]
    fn test_cpu_count_is_positive() {
        assert!(cpu_count() >= 1);
    }
}
