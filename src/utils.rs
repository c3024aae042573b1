//! Shared utility functions

/// Unified duration parser - supports "30s", "5m", "2h" or plain seconds
pub fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    // Try to parse as pure number (seconds)
    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }

    // Parse with suffix
    let (num_str, unit) = if let Some(n) = s.strip_suffix('s') {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600u64)
    } else {
        return None;
    };

    num_str.parse::<u64>().ok().map(|n| n * unit)
}

/// Parse a delay flag into seconds
pub fn parse_delay_str(s: &str) -> epc_scrape::Result<u64> {
    parse_duration(s).ok_or_else(|| {
        epc_scrape::EpcError::ConfigError(format!(
            "Invalid delay '{}'. Use format like 2s, 30s, 1m", s
        ))
    })
}

/// Truncate a string to max_len characters (not bytes), adding "..." if truncated.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}
