/// Human-readable SI byte count (base 1000): `950 B`, `1.0 kB`, `1.5 MB`.
pub fn byte_count_si(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = b"kMGTPE"[exp] as char;
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}
