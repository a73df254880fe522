//! Equal-share normalization of the payees inside one split category.
//!
//! Every payee gets a nominal share at [`SHARE_SCALE`](crate::decimal::SHARE_SCALE)
//! places and whatever is left over after rounding is added to the first
//! payee, so the shares of a category always sum to exactly one.

use rust_decimal::Decimal;

use crate::decimal::{equal_share, sum};

/// Display name of the "choose your own charity" option when it is listed
/// as a regular payee row.
pub const CHOOSE_YOUR_OWN_NAME: &str = "Choose Your Own Charity";

/// Payee classes that route donations through a giving fund.
pub const GIVING_FUND_CLASSES: [&str; 2] = ["paypalgivingfund", "tidesdaf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareRule {
    /// `1 / N`
    Equal,
    /// Always zero.
    Zero,
    /// `1 / (N - 1)`: a giving fund sharing its category with the
    /// choose-your-own option.
    ExcludingChooseYourOwn,
}

/// Picks the share rule of each `(class, name)` entry of a category.
pub fn share_rules<'a, I>(entries: I) -> Vec<ShareRule>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let entries: Vec<(&str, &str)> = entries.into_iter().collect();
    let has_choose_your_own = entries.iter().any(|(_, name)| *name == CHOOSE_YOUR_OWN_NAME);

    entries
        .iter()
        .map(|(class, name)| {
            if *name == CHOOSE_YOUR_OWN_NAME {
                ShareRule::Zero
            } else if has_choose_your_own && GIVING_FUND_CLASSES.contains(class) {
                ShareRule::ExcludingChooseYourOwn
            } else {
                ShareRule::Equal
            }
        })
        .collect()
}

/// Computes one share per rule. Returns `None` for an empty category.
pub fn normalize_shares(rules: &[ShareRule]) -> Option<Vec<Decimal>> {
    let n = rules.len();
    let full = equal_share(n)?;

    let mut shares: Vec<Decimal> = rules
        .iter()
        .map(|rule| match rule {
            ShareRule::Equal => full,
            ShareRule::Zero => Decimal::ZERO,
            // N is at least 2 here because a named choose-your-own entry exists
            ShareRule::ExcludingChooseYourOwn => equal_share(n - 1).unwrap_or(full),
        })
        .collect();

    let diff = Decimal::ONE - sum(&shares);
    shares[0] += diff;

    Some(shares)
}
