use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places every computed share is rounded to.
pub const SHARE_SCALE: u32 = 12;

/// `1 / n` at `SHARE_SCALE` places, or `None` when `n` is zero.
pub fn equal_share(n: usize) -> Option<Decimal> {
    if n == 0 {
        return None;
    }

    let share = Decimal::ONE / Decimal::from(n as u64);
    Some(share.round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::MidpointNearestEven))
}

pub fn sum<'a, I>(shares: I) -> Decimal
where
    I: IntoIterator<Item = &'a Decimal>,
{
    shares.into_iter().fold(Decimal::ZERO, |acc, s| acc + s)
}

/// Parses a decimal written in a config file or CSV cell.
pub fn parse(value: &str) -> Option<Decimal> {
    value.trim().parse::<Decimal>().ok()
}
