//! Builds the content events (price tiers and their rewards) of a bundle
//! from the tier sheet.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::error::{Result, SotbError};
use crate::literal::{Literal, ToLiteral};
use crate::records::TierRow;
use crate::tiers::{highest_tier, TierId, TierKind};

const CURRENCY_REGION: &str = "US";
const CURRENCY: &str = "USD";
const LESS_THAN_ONE: &str = "lessthan1";

const WARN_MIN_ONE_DOLLAR: &str = "Warning: You must pay at least $1.00 to receive content!";
const WARN_BTA: &str = "Warning: You will not receive the beat-the-average content! \
Add just <%= money_difference %> more to unlock!";
const WARN_AVERAGE_PLUS: &str = "Warning: You will not receive the beat-the-average-plus content! \
Add just <%= money_difference %> more to unlock!";

#[derive(Debug, Clone, PartialEq)]
pub struct ContentEvent {
    pub identifier: String,
    pub kind: TierKind,
    pub mpa: bool,
    pub subproducts: Vec<String>,
    pub tpkds: Vec<String>,
    pub coupon_definitions: Vec<String>,
    pub requires_min_price: Option<Decimal>,
    pub requires_max_price: Option<Decimal>,
    pub requires_bta: bool,
    pub requires_average_plus: Option<Decimal>,
    pub start_dt: Option<NaiveDateTime>,
    pub header: Option<String>,
    pub subheader: Option<String>,
    pub display_section: Option<String>,
    pub warning_locked: Option<String>,
}

impl ContentEvent {
    /// The event for `tier` before any rewards or subheader text are added.
    pub fn skeleton(tier: &TierId, start_dt: Option<NaiveDateTime>) -> Self {
        let mut event = ContentEvent {
            identifier: tier.identifier.clone(),
            kind: tier.kind,
            mpa: tier.mpa,
            subproducts: Vec::new(),
            tpkds: Vec::new(),
            coupon_definitions: Vec::new(),
            requires_min_price: None,
            requires_max_price: None,
            requires_bta: false,
            requires_average_plus: None,
            start_dt,
            header: None,
            subheader: None,
            display_section: None,
            warning_locked: None,
        };

        match tier.kind {
            TierKind::Free => {
                event.requires_min_price = Some(Decimal::new(0, 2));
            }
            TierKind::LessThanOne => {
                event.subproducts.push(LESS_THAN_ONE.to_owned());
                event.requires_min_price = Some(Decimal::new(1, 2));
                event.requires_max_price = Some(Decimal::ONE);
            }
            // the plain one dollar tier has no display section of its own
            TierKind::MinPrice(1) if !tier.mpa => {
                event.requires_min_price = Some(Decimal::ONE);
            }
            TierKind::MinPrice(price) => {
                event.requires_min_price = Some(Decimal::from(price));
                if !tier.mpa {
                    event.header = Some(format!("Pay ${price} or more"));
                }
                event.displayed(
                    format!("bt{price}_tier"),
                    Some(format!(
                        "Warning: You will not receive the ${price} content! \
                         Add just <%= money_difference %> more to unlock!"
                    )),
                );
            }
            TierKind::BeatTheAverage => {
                event.requires_bta = true;
                event.displayed("bta_tier".to_owned(), Some(WARN_BTA.to_owned()));
            }
            TierKind::AveragePlus(threshold) => {
                event.requires_average_plus = Some(Decimal::from(threshold));
                event.displayed("btaplus_tier".to_owned(), Some(WARN_AVERAGE_PLUS.to_owned()));
            }
            TierKind::Initial => {
                event.displayed("core_tier".to_owned(), None);
            }
        }

        event
    }

    /// The fixed event for buyers paying under a dollar.
    pub fn less_than_one() -> Self {
        let tier = TierId {
            identifier: LESS_THAN_ONE.to_owned(),
            mpa: false,
            kind: TierKind::LessThanOne,
        };
        Self::skeleton(&tier, None)
    }

    fn displayed(&mut self, section: String, warning: Option<String>) {
        self.display_section = Some(section);
        self.subheader = Some(String::new());
        self.warning_locked = warning;
    }

    pub fn is_average_plus(&self) -> bool {
        self.requires_average_plus.is_some()
    }

    pub fn is_beat_the_average(&self) -> bool {
        self.requires_bta && !self.is_average_plus()
    }

    fn is_launch_initial(&self) -> bool {
        self.kind == TierKind::Initial && !self.mpa
    }

    fn add_rewards(&mut self, row: &TierRow) {
        self.subproducts.extend(
            row.subproducts
                .iter()
                .chain(&row.android_subproducts)
                .chain(&row.soundtrack_subproducts)
                .cloned(),
        );
        self.tpkds.extend(row.tpkds.iter().cloned());
        self.coupon_definitions
            .extend(row.coupondefinitions.iter().cloned());
    }
}

fn mpa_date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)/(\d+)/(\d+) at (\d+)$").expect("mpa date pattern is valid")
    })
}

/// Parses the sheet's `[month]/[day]/[year] at [hour]` date, e.g.
/// `7/5/16 at 11`. Two-digit years are in the 2000s.
pub fn parse_mpa_date(value: &str) -> Result<NaiveDateTime> {
    let invalid = || SotbError::MpaDate(value.to_owned());
    let caps = mpa_date_pattern().captures(value.trim()).ok_or_else(invalid)?;

    let number = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());
    let (month, day, mut year, hour) = (number(1)?, number(2)?, number(3)?, number(4)?);
    if year < 100 {
        year += 2000;
    }

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(invalid)
}

pub fn build_content_events(rows: &[TierRow]) -> Result<Vec<ContentEvent>> {
    let first = rows.first().ok_or(SotbError::EmptyInput)?;
    let one_dollar_min = first.one_dollar_min;

    let mut events: Vec<ContentEvent> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut title_counts: Vec<usize> = Vec::new();
    let mut mpa_start: Option<NaiveDateTime> = None;

    for row in rows {
        let Some(identifier) = row.tier.as_deref() else {
            continue;
        };

        let position = match positions.get(identifier) {
            Some(&position) => position,
            None => {
                let tier: TierId = identifier
                    .parse()
                    .map_err(|e: SotbError| SotbError::row(row.line, e.to_string()))?;

                let start_dt = if tier.mpa {
                    Some(match mpa_start {
                        Some(start) => start,
                        None => {
                            let start = parse_mpa_date(first.mpa_date.as_deref().unwrap_or(""))?;
                            mpa_start = Some(start);
                            start
                        }
                    })
                } else {
                    None
                };

                debug!(tier = identifier, "new content event");
                events.push(ContentEvent::skeleton(&tier, start_dt));
                title_counts.push(0);
                positions.insert(identifier.to_owned(), events.len() - 1);
                events.len() - 1
            }
        };

        events[position].add_rewards(row);
        title_counts[position] += 1;
    }

    let winner = highest_tier(&events);
    if let Some(index) = winner {
        debug!(tier = %events[index].identifier, "highest tier unlocks everything");
    }

    for (index, event) in events.iter_mut().enumerate() {
        let titles = title_counts[index];
        if event.subheader.is_some() {
            event.subheader = Some(if event.is_launch_initial() {
                format!("Get {titles} titles!")
            } else if Some(index) == winner {
                "Get all titles!".to_owned()
            } else {
                format!("Get {titles} more titles!")
            });
        }

        if event.is_launch_initial() && one_dollar_min && event.tpkds.is_empty() {
            event.warning_locked = Some(WARN_MIN_ONE_DOLLAR.to_owned());
        }
    }

    if one_dollar_min && !positions.contains_key(LESS_THAN_ONE) {
        events.insert(0, ContentEvent::less_than_one());
    }

    info!(events = events.len(), "built content events");
    Ok(events)
}

fn price(amount: Decimal) -> Literal {
    Literal::map()
        .entry(
            CURRENCY_REGION,
            Literal::List(vec![Literal::Decimal(amount), Literal::str(CURRENCY)]),
        )
        .build()
}

fn names(values: &[String]) -> Literal {
    Literal::List(values.iter().map(Literal::str).collect())
}

impl ToLiteral for ContentEvent {
    fn to_literal(&self) -> Literal {
        Literal::map()
            .entry("identifier", Literal::str(&self.identifier))
            .entry("subproduct-machine-names", names(&self.subproducts))
            .entry("tpkd-machine-names", names(&self.tpkds))
            .entry("coupon-definition-machine-names", names(&self.coupon_definitions))
            .opt("requires-min-price", self.requires_min_price.map(price))
            .opt("requires-max-price", self.requires_max_price.map(price))
            .opt("requires-bta", self.requires_bta.then_some(Literal::Bool(true)))
            .opt("requires-average-plus", self.requires_average_plus.map(price))
            .opt("start-dt", self.start_dt.map(Literal::DateTime))
            .opt("header", self.header.as_deref().map(Literal::str))
            .opt("subheader", self.subheader.as_deref().map(Literal::str))
            .opt(
                "display-section-identifiers",
                self.display_section
                    .as_deref()
                    .map(|section| Literal::List(vec![Literal::str(section)])),
            )
            .opt("warning-locked", self.warning_locked.as_deref().map(Literal::str))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{read_csv, read_records};

    fn row(tier: &str, subproduct: &str) -> TierRow {
        TierRow {
            tier: Some(tier.to_owned()),
            subproducts: vec![subproduct.to_owned()],
            ..TierRow::default()
        }
    }

    fn find<'a>(events: &'a [ContentEvent], identifier: &str) -> &'a ContentEvent {
        events.iter().find(|e| e.identifier == identifier).unwrap()
    }

    #[test]
    fn parses_mpa_date() {
        let dt = parse_mpa_date("7/5/16 at 11").unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2016, 7, 5)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap()
        );
        assert_eq!(
            parse_mpa_date("12/31/2019 at 0").unwrap(),
            NaiveDate::from_ymd_opt(2019, 12, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn rejects_malformed_mpa_date() {
        assert!(matches!(parse_mpa_date("July 5th"), Err(SotbError::MpaDate(_))));
        assert!(matches!(parse_mpa_date("13/40/16 at 11"), Err(SotbError::MpaDate(_))));
        assert!(matches!(parse_mpa_date("7/5/16 at 25"), Err(SotbError::MpaDate(_))));
    }

    #[test]
    fn fixed_price_tier_unlocks_everything() {
        let rows = vec![
            row("initial", "game-a"),
            row("initial", "game-b"),
            row("bt5", "game-c"),
            row("bta", "game-d"),
            row("bta", "game-e"),
        ];
        let events = build_content_events(&rows).unwrap();

        let ids: Vec<&str> = events.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["initial", "bt5", "bta"]);

        assert_eq!(events[0].subheader.as_deref(), Some("Get 2 titles!"));
        assert_eq!(events[1].subheader.as_deref(), Some("Get all titles!"));
        assert_eq!(events[2].subheader.as_deref(), Some("Get 2 more titles!"));

        assert_eq!(events[0].subproducts, vec!["game-a", "game-b"]);
        assert_eq!(events[1].header.as_deref(), Some("Pay $5 or more"));
        assert_eq!(events[1].display_section.as_deref(), Some("bt5_tier"));
        assert!(events[2].requires_bta);
        assert_eq!(events[0].warning_locked, None);
    }

    #[test]
    fn sheet_with_mpa_and_one_dollar_minimum() {
        let rows: Vec<TierRow> = read_csv("test-inputs/content_events.csv").unwrap();
        let events = build_content_events(&rows).unwrap();

        let ids: Vec<&str> = events.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec!["lessthan1", "bt1", "initial", "bta", "average-plus2", "mpa_bt10"]
        );

        let less_than_one = &events[0];
        assert_eq!(less_than_one.subproducts, vec!["lessthan1"]);
        assert_eq!(less_than_one.requires_min_price, Some(Decimal::new(1, 2)));
        assert_eq!(less_than_one.requires_max_price, Some(Decimal::ONE));

        let bt1 = find(&events, "bt1");
        assert_eq!(bt1.requires_min_price, Some(Decimal::ONE));
        assert_eq!(bt1.subheader, None);
        assert_eq!(bt1.display_section, None);

        let initial = find(&events, "initial");
        assert_eq!(initial.subheader.as_deref(), Some("Get 2 titles!"));
        assert_eq!(initial.warning_locked.as_deref(), Some(WARN_MIN_ONE_DOLLAR));
        assert_eq!(initial.subproducts, vec!["game-a", "game-a-android", "game-b"]);
        assert_eq!(initial.coupon_definitions, vec!["coupon-1"]);

        // average-plus2 ranks 4 and beats bta at 2; mpa_bt10 ranks 5
        let mpa = find(&events, "mpa_bt10");
        assert_eq!(mpa.subheader.as_deref(), Some("Get all titles!"));
        assert_eq!(mpa.header, None);
        assert_eq!(
            mpa.start_dt,
            Some(parse_mpa_date("7/5/16 at 11").unwrap())
        );

        let average_plus = find(&events, "average-plus2");
        assert_eq!(average_plus.subheader.as_deref(), Some("Get 1 more titles!"));
        assert_eq!(average_plus.requires_average_plus, Some(Decimal::from(2)));
        assert_eq!(average_plus.tpkds, vec!["key-1", "key-2"]);
    }

    #[test]
    fn initial_with_keys_has_no_minimum_warning() {
        let mut first = row("initial", "game-a");
        first.one_dollar_min = true;
        first.tpkds = vec!["steam-key".to_owned()];
        let events = build_content_events(&[first]).unwrap();

        assert_eq!(events[0].identifier, "lessthan1");
        assert_eq!(events[1].warning_locked, None);
    }

    #[test]
    fn mpa_tier_without_date_is_error() {
        let err = build_content_events(&[row("mpa_bta", "game-a")]).unwrap_err();
        assert!(matches!(err, SotbError::MpaDate(_)));
    }

    #[test]
    fn unknown_tier_reports_line() {
        let mut platinum = row("platinum", "game-b");
        platinum.line = 3;
        let rows = vec![row("initial", "game-a"), platinum];
        let err = build_content_events(&rows).unwrap_err();
        assert!(matches!(err, SotbError::InvalidRow { line: 3, .. }));
    }

    #[test]
    fn unknown_tier_after_multi_line_cell_reports_physical_line() {
        let data = "tier,tpkds\ninitial,\"key-1\nkey-2\nkey-3\"\nplatinum,0\n";
        let rows: Vec<TierRow> = read_records(data.as_bytes()).unwrap();
        let err = build_content_events(&rows).unwrap_err();
        assert!(matches!(err, SotbError::InvalidRow { line: 5, .. }));
    }

    #[test]
    fn renders_price_requirement() {
        let events = build_content_events(&[row("bt5", "game-c")]).unwrap();
        let literal = events[0].to_literal();

        let amount = vec![Literal::Decimal(Decimal::from(5)), Literal::str("USD")];
        let expected = Literal::map().entry("US", Literal::List(amount)).build();
        assert_eq!(literal.get("requires-min-price"), Some(&expected));
        assert_eq!(
            literal.get("subheader").and_then(Literal::as_str),
            Some("Get all titles!")
        );
        assert_eq!(literal.get("requires-bta"), None);
    }
}
