//! Address fixed-size ranges of blocks.
//!
//! A bundle holds [SIZE] consecutive blocks starting at its base (always a multiple of [SIZE]) and
//! is stored as a single object named by the base, zero-padded to 10 decimal digits.

/// Number of blocks in a bundle.
pub const SIZE: u64 = 100;

/// Width of a bundle name.
const NAME_WIDTH: usize = 10;

/// Base of the bundle containing `num`.
pub fn base(num: u64) -> u64 {
    num - num % SIZE
}

/// Object name of the bundle starting at `base`.
pub fn name(base: u64) -> String {
    format!("{:0width$}", base, width = NAME_WIDTH)
}

/// Parse a bundle name back into its base.
///
/// Returns `None` for names that are not exactly 10 digits or not aligned to [SIZE].
pub fn parse(name: &str) -> Option<u64> {
    if name.len() != NAME_WIDTH || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let base = name.parse::<u64>().ok()?;
    (base % SIZE == 0).then_some(base)
}
