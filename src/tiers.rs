//! Price tier identifiers and the ranking that picks the tier which
//! unlocks everything.

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::content_events::ContentEvent;
use crate::error::SotbError;

const MPA_PREFIX: &str = "mpa_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    Free,
    Initial,
    /// Paid something, but less than a dollar.
    LessThanOne,
    BeatTheAverage,
    /// `bt<N>`: pay at least N.
    MinPrice(u32),
    /// `average-plus<N>`: beat the average by N.
    AveragePlus(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierId {
    pub identifier: String,
    /// Activates with the price increase rather than at launch.
    pub mpa: bool,
    pub kind: TierKind,
}

fn numbered_tier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\D+)(\d+)$").expect("tier pattern is valid"))
}

impl FromStr for TierId {
    type Err = SotbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let identifier = s.trim();
        let (mpa, rest) = match identifier.strip_prefix(MPA_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, identifier),
        };
        let unknown = || SotbError::UnknownTier(identifier.to_owned());

        let kind = match rest {
            "free" => TierKind::Free,
            "initial" => TierKind::Initial,
            "lessthan1" => TierKind::LessThanOne,
            "bta" => TierKind::BeatTheAverage,
            _ => {
                let caps = numbered_tier().captures(rest).ok_or_else(unknown)?;
                let amount: u32 = caps[2].parse().map_err(|_| unknown())?;
                match &caps[1] {
                    "bt" => TierKind::MinPrice(amount),
                    "bta" => TierKind::BeatTheAverage,
                    "average-plus" => TierKind::AveragePlus(amount),
                    _ => return Err(unknown()),
                }
            }
        };

        Ok(TierId {
            identifier: identifier.to_owned(),
            mpa,
            kind,
        })
    }
}

fn whole(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(0)
}

/// Ranks a content event: a beat-the-average requirement counts 2, a
/// minimum price counts its whole dollars, an average-plus threshold counts
/// its dollars plus 2, and a future start date costs 5.
pub fn rank(event: &ContentEvent) -> i64 {
    let mut rank = 0;
    if event.requires_bta {
        rank += 2;
    }
    if let Some(price) = event.requires_min_price {
        rank += whole(price);
    }
    if let Some(threshold) = event.requires_average_plus {
        rank += whole(threshold) + 2;
    }
    if event.start_dt.is_some() {
        rank -= 5;
    }
    rank
}

/// Index of the highest ranked event. Ties keep the first one seen, except
/// that an average-plus event beats a beat-the-average event of equal rank.
pub fn highest_tier(events: &[ContentEvent]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (index, event) in events.iter().enumerate() {
        let event_rank = rank(event);
        best = match best {
            None => Some((index, event_rank)),
            Some((best_index, best_rank))
                if event_rank > best_rank
                    || (event_rank == best_rank
                        && event.is_average_plus()
                        && events[best_index].is_beat_the_average()) =>
            {
                Some((index, event_rank))
            }
            kept => kept,
        };
    }

    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tier(s: &str) -> TierId {
        s.parse().unwrap()
    }

    fn event(id: &str) -> ContentEvent {
        ContentEvent::skeleton(&tier(id), None)
    }

    #[test]
    fn parses_identifiers() {
        assert_eq!(tier("free").kind, TierKind::Free);
        assert_eq!(tier("initial").kind, TierKind::Initial);
        assert_eq!(tier("bta").kind, TierKind::BeatTheAverage);
        assert_eq!(tier("bta1").kind, TierKind::BeatTheAverage);
        assert_eq!(tier("bt15").kind, TierKind::MinPrice(15));
        assert_eq!(tier("average-plus3").kind, TierKind::AveragePlus(3));
        assert_eq!(tier("lessthan1").kind, TierKind::LessThanOne);

        let mpa = tier("mpa_bt10");
        assert!(mpa.mpa);
        assert_eq!(mpa.kind, TierKind::MinPrice(10));
        assert_eq!(mpa.identifier, "mpa_bt10");
        assert_eq!(tier("mpa_initial").kind, TierKind::Initial);
    }

    #[test]
    fn rejects_unknown_identifiers() {
        assert!(matches!(
            "gold".parse::<TierId>(),
            Err(SotbError::UnknownTier(id)) if id == "gold"
        ));
        assert!("xyz5".parse::<TierId>().is_err());
        assert!("mpa_".parse::<TierId>().is_err());
    }

    #[test]
    fn ranks_follow_requirements() {
        assert_eq!(rank(&event("initial")), 0);
        assert_eq!(rank(&event("bta")), 2);
        assert_eq!(rank(&event("bt5")), 5);
        assert_eq!(rank(&event("average-plus3")), 5);
        assert_eq!(rank(&event("free")), 0);

        let start = NaiveDate::from_ymd_opt(2016, 7, 5)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        let mpa = ContentEvent::skeleton(&tier("mpa_bt12"), Some(start));
        assert_eq!(rank(&mpa), 7);
    }

    #[test]
    fn fixed_price_beats_bta_and_initial() {
        let events = vec![event("initial"), event("bt5"), event("bta")];
        assert_eq!(highest_tier(&events), Some(1));
    }

    #[test]
    fn ties_keep_first_seen() {
        let events = vec![event("initial"), event("bt2"), event("bta")];
        assert_eq!(highest_tier(&events), Some(1));

        let events = vec![event("initial"), event("bta"), event("bt2")];
        assert_eq!(highest_tier(&events), Some(1));
    }

    #[test]
    fn average_plus_beats_same_rank_bta() {
        // average-plus0 ranks 2, same as bta
        let events = vec![event("initial"), event("bta"), event("average-plus0")];
        assert_eq!(highest_tier(&events), Some(2));
    }

    #[test]
    fn average_plus_does_not_displace_same_rank_fixed_price() {
        let events = vec![event("bt5"), event("average-plus3")];
        assert_eq!(highest_tier(&events), Some(0));
    }

    #[test]
    fn no_events_no_winner() {
        assert_eq!(highest_tier(&[]), None);
    }
}
