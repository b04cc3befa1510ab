/// Width of an exchange security code (e.g. "000001").
pub const STOCK_CODE_WIDTH: usize = 6;

/// Configures a custom Rayon thread pool with specified size.
///
/// Constituent tables for one request are resolved on this pool when the
/// user pins a thread count, separate from the global Rayon pool.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Left-pads a security code with zeros to `STOCK_CODE_WIDTH`.
///
/// Longer codes are returned unchanged.
pub fn pad_stock_code(code: &str) -> String {
    format!("{:0>width$}", code, width = STOCK_CODE_WIDTH)
}

/// Rounds `value` to `decimals` places using the exact decimal expansion of the float.
///
/// Ties go to the even digit and no scaling multiply is involved, so
/// `round_to(0.03125, 4)` is 0.0312 and `round_to(0.00035, 4)` is 0.0003.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Formats a local time as `YYYY-MM-DD HH:MM:SS`, the generation stamp on responses.
pub fn format_timestamp(ts: &chrono::DateTime<chrono::Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(&chrono::Local::now())
}
