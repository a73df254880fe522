//! Assembles the revenue splits document: developer and charity payees per
//! phase, normalized shares, the optional bundle partner and the house tip.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::SplitRates;
use crate::error::{Result, SotbError};
use crate::literal::{Literal, ToLiteral};
use crate::normalize::{normalize_shares, share_rules};
use crate::records::{SplitRow, CYOC_SECONDARY_ID};

pub const CYOC_CLASS: &str = "paypalgivingfund";
pub const CYOC_NAME: &str = "Choose your own charity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    /// The price-increase phase that starts later in the sale.
    Mpa,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Mpa => "mpa",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payee {
    pub class: String,
    pub name: String,
    pub secondary_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subsplit {
    pub class: String,
    pub name: String,
    pub secondary_id: Option<String>,
    pub sibling_split: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub class: String,
    pub name: String,
    pub sibling_split: Decimal,
    pub partner_split: Option<Decimal>,
    /// `None` once a single-payee category has collapsed into that payee.
    pub subsplits: Option<Vec<Subsplit>>,
}

impl Category {
    fn fixed(class: &str, name: &str, sibling_split: Decimal) -> Self {
        Self {
            class: class.to_owned(),
            name: name.to_owned(),
            sibling_split,
            partner_split: None,
            subsplits: None,
        }
    }

    /// A category over `subsplits`; exactly one subsplit collapses the
    /// category into that payee.
    fn with_subsplits(
        class: &str,
        name: &str,
        sibling_split: Decimal,
        mut subsplits: Vec<Subsplit>,
    ) -> Self {
        if subsplits.len() == 1 {
            let only = subsplits.remove(0);
            return Self::fixed(&only.class, &only.name, sibling_split);
        }

        Self {
            subsplits: Some(subsplits),
            ..Self::fixed(class, name, sibling_split)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitsDocument {
    pub phases: Vec<(Phase, Vec<Category>)>,
}

impl SplitsDocument {
    pub fn phase(&self, phase: Phase) -> Option<&[Category]> {
        self.phases
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, categories)| categories.as_slice())
    }
}

/// Flags that apply to the whole sheet, read from its first row.
#[derive(Debug, Clone, Copy, Default)]
struct DatasetFlags {
    choose_your_own_charity: bool,
    bundle_partners: bool,
}

#[derive(Debug, Default)]
struct PhasePayees {
    developers: Vec<Payee>,
    charities: Vec<Payee>,
}

pub fn build_splits(rows: &[SplitRow], rates: &SplitRates) -> Result<SplitsDocument> {
    let first = rows.first().ok_or(SotbError::EmptyInput)?;
    let flags = DatasetFlags {
        choose_your_own_charity: first.choose_your_own_charity,
        bundle_partners: first.bundle_partners,
    };

    let mut initial = PhasePayees::default();
    let mut mpa = PhasePayees::default();

    for row in rows {
        if row.mpa_only && row.initial_only {
            return Err(SotbError::row(
                row.line,
                "a payee cannot be both mpa-only and initial-only",
            ));
        }

        let developer = developer_payee(row)?;
        let charity = charity_payee(row)?;

        let mut phases: Vec<&mut PhasePayees> = Vec::with_capacity(2);
        if !row.mpa_only {
            phases.push(&mut initial);
        }
        if !row.initial_only {
            phases.push(&mut mpa);
        }

        for payees in phases {
            if let Some(developer) = &developer {
                payees.developers.push(developer.clone());
            }
            if let Some(charity) = &charity {
                payees.charities.push(charity.clone());
            }
        }
    }

    let initial_categories = build_phase(Phase::Initial, &initial, flags, rates)?;
    let mpa_categories = build_phase(Phase::Mpa, &mpa, flags, rates)?;

    let mut phases = vec![(Phase::Initial, initial_categories)];
    if phases[0].1 == mpa_categories {
        debug!("mpa payees match initial, dropping mpa phase");
    } else {
        phases.push((Phase::Mpa, mpa_categories));
    }

    Ok(SplitsDocument { phases })
}

fn developer_payee(row: &SplitRow) -> Result<Option<Payee>> {
    let Some(name) = &row.partner_name else {
        return Ok(None);
    };
    let class = row.partner_payee.clone().ok_or_else(|| {
        SotbError::row(row.line, format!("developer '{name}' has no partner-payee"))
    })?;

    Ok(Some(Payee {
        class,
        name: name.clone(),
        secondary_id: row.partner_secondary_id.clone(),
    }))
}

fn charity_payee(row: &SplitRow) -> Result<Option<Payee>> {
    let Some(name) = &row.charity_name else {
        return Ok(None);
    };
    if row.is_choose_your_own() {
        return Ok(None);
    }
    let class = row.charity_payee.clone().ok_or_else(|| {
        SotbError::row(row.line, format!("charity '{name}' has no charity-payee"))
    })?;

    Ok(Some(Payee {
        class,
        name: name.clone(),
        secondary_id: row.charity_secondary_id.clone(),
    }))
}

fn normalized(phase: Phase, category: &'static str, payees: &[Payee]) -> Result<Vec<Subsplit>> {
    let rules = share_rules(payees.iter().map(|p| (p.class.as_str(), p.name.as_str())));
    let shares = normalize_shares(&rules).ok_or(SotbError::EmptyCategory {
        phase: phase.as_str(),
        category,
    })?;

    Ok(payees
        .iter()
        .zip(shares)
        .map(|(payee, sibling_split)| Subsplit {
            class: payee.class.clone(),
            name: payee.name.clone(),
            secondary_id: payee.secondary_id.clone(),
            sibling_split,
        })
        .collect())
}

fn build_phase(
    phase: Phase,
    payees: &PhasePayees,
    flags: DatasetFlags,
    rates: &SplitRates,
) -> Result<Vec<Category>> {
    let developer_subsplits = normalized(phase, "developers", &payees.developers)?;
    let mut charity_subsplits = normalized(phase, "charity", &payees.charities)?;

    // additive: not part of the 1/N normalization
    if flags.choose_your_own_charity {
        charity_subsplits.push(Subsplit {
            class: CYOC_CLASS.to_owned(),
            name: CYOC_NAME.to_owned(),
            secondary_id: Some(CYOC_SECONDARY_ID.to_owned()),
            sibling_split: Decimal::ZERO,
        });
    }

    info!(
        phase = phase.as_str(),
        developers = payees.developers.len(),
        charities = payees.charities.len(),
        "assembled split phase"
    );

    let mut developers = Category::with_subsplits(
        "developers",
        "Developers",
        rates.developers,
        developer_subsplits,
    );
    let mut charity =
        Category::with_subsplits("charity", "Charity", rates.charity, charity_subsplits);
    let mut house = Category::fixed(&rates.house_class, &rates.house_name, rates.house_tip);

    if !flags.bundle_partners {
        return Ok(vec![developers, charity, house]);
    }

    developers.partner_split = Some(rates.partner.developers);
    charity.partner_split = Some(rates.partner.charity);
    house.partner_split = Some(rates.partner.house_tip);
    let partner = Category {
        partner_split: Some(rates.partner.partner),
        ..Category::fixed("partner", "Partner", Decimal::ZERO)
    };

    Ok(vec![developers, charity, partner, house])
}

impl ToLiteral for Subsplit {
    fn to_literal(&self) -> Literal {
        Literal::map()
            .entry("class", Literal::str(&self.class))
            .entry("name", Literal::str(&self.name))
            .opt("secondary_id", self.secondary_id.as_deref().map(Literal::str))
            .entry("sibling_split", Literal::Decimal(self.sibling_split))
            .build()
    }
}

impl ToLiteral for Category {
    fn to_literal(&self) -> Literal {
        Literal::map()
            .entry("class", Literal::str(&self.class))
            .entry("name", Literal::str(&self.name))
            .entry("sibling_split", Literal::Decimal(self.sibling_split))
            .opt("partner_split", self.partner_split.map(Literal::Decimal))
            .opt("subsplit", self.subsplits.as_deref().map(ToLiteral::to_literal))
            .build()
    }
}

impl ToLiteral for SplitsDocument {
    fn to_literal(&self) -> Literal {
        Literal::Map(
            self.phases
                .iter()
                .map(|(phase, categories)| {
                    let order = Literal::map().entry("order", categories.to_literal()).build();
                    (phase.as_str().to_owned(), order)
                })
                .collect(),
        )
    }
}
