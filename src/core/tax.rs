use serde::Serialize;

use super::types::MaritalStatus;

pub const FEDERAL_ESTATE_TAX_RATE: f64 = 0.40;

/// Basic exclusion amount by year. 2026 reflects the TCJA sunset.
const FEDERAL_EXEMPTIONS: &[(i32, f64)] = &[
    (2017, 5_490_000.0),
    (2018, 11_180_000.0),
    (2019, 11_400_000.0),
    (2020, 11_580_000.0),
    (2021, 11_700_000.0),
    (2022, 12_060_000.0),
    (2023, 12_920_000.0),
    (2024, 13_610_000.0),
    (2025, 13_990_000.0),
    (2026, 7_000_000.0),
];

const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    /// Lower bound of the band, measured on the amount being taxed.
    pub floor: f64,
    pub rate: f64,
}

const fn band(floor: f64, rate: f64) -> Bracket {
    Bracket { floor, rate }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSchedule {
    pub code: &'static str,
    pub name: &'static str,
    pub exemption: f64,
    pub brackets: &'static [Bracket],
    /// Once the taxable estate exceeds `exemption * cliff_ratio`, the
    /// brackets apply to the whole estate instead of the excess.
    pub cliff_ratio: Option<f64>,
}

const STATE_SCHEDULES: &[StateSchedule] = &[
    StateSchedule {
        code: "CT",
        name: "Connecticut",
        exemption: 13_990_000.0,
        brackets: &[band(0.0, 0.12)],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "DC",
        name: "District of Columbia",
        exemption: 4_873_200.0,
        brackets: &[
            band(0.0, 0.112),
            band(1_000_000.0, 0.136),
            band(2_000_000.0, 0.152),
            band(3_000_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "HI",
        name: "Hawaii",
        exemption: 5_490_000.0,
        brackets: &[
            band(0.0, 0.10),
            band(1_000_000.0, 0.11),
            band(2_000_000.0, 0.12),
            band(3_000_000.0, 0.13),
            band(4_000_000.0, 0.14),
            band(5_000_000.0, 0.15),
            band(10_000_000.0, 0.20),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "IL",
        name: "Illinois",
        exemption: 4_000_000.0,
        brackets: &[
            band(0.0, 0.08),
            band(1_000_000.0, 0.12),
            band(5_000_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "ME",
        name: "Maine",
        exemption: 7_000_000.0,
        brackets: &[
            band(0.0, 0.08),
            band(3_000_000.0, 0.10),
            band(6_000_000.0, 0.12),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "MD",
        name: "Maryland",
        exemption: 5_000_000.0,
        brackets: &[band(0.0, 0.16)],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "MA",
        name: "Massachusetts",
        exemption: 2_000_000.0,
        brackets: &[
            band(0.0, 0.08),
            band(1_000_000.0, 0.12),
            band(5_000_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "MN",
        name: "Minnesota",
        exemption: 3_000_000.0,
        brackets: &[
            band(0.0, 0.13),
            band(2_100_000.0, 0.14),
            band(4_100_000.0, 0.15),
            band(7_100_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "NY",
        name: "New York",
        exemption: 7_160_000.0,
        brackets: &[
            band(0.0, 0.0306),
            band(500_000.0, 0.05),
            band(1_000_000.0, 0.065),
            band(2_000_000.0, 0.08),
            band(5_000_000.0, 0.10),
            band(10_100_000.0, 0.16),
        ],
        cliff_ratio: Some(1.05),
    },
    StateSchedule {
        code: "OR",
        name: "Oregon",
        exemption: 1_000_000.0,
        brackets: &[
            band(0.0, 0.10),
            band(1_500_000.0, 0.11),
            band(2_500_000.0, 0.12),
            band(4_500_000.0, 0.13),
            band(6_500_000.0, 0.14),
            band(8_500_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "RI",
        name: "Rhode Island",
        exemption: 1_802_431.0,
        brackets: &[
            band(0.0, 0.08),
            band(1_000_000.0, 0.12),
            band(5_000_000.0, 0.16),
        ],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "VT",
        name: "Vermont",
        exemption: 5_000_000.0,
        brackets: &[band(0.0, 0.16)],
        cliff_ratio: None,
    },
    StateSchedule {
        code: "WA",
        name: "Washington",
        exemption: 3_000_000.0,
        brackets: &[
            band(0.0, 0.10),
            band(1_000_000.0, 0.15),
            band(2_000_000.0, 0.17),
            band(3_000_000.0, 0.19),
            band(4_000_000.0, 0.23),
            band(6_000_000.0, 0.26),
            band(7_000_000.0, 0.30),
            band(9_000_000.0, 0.35),
        ],
        cliff_ratio: None,
    },
];

pub fn federal_exemption_for_year(year: i32) -> f64 {
    let (first_year, first_amount) = FEDERAL_EXEMPTIONS[0];
    if year <= first_year {
        return first_amount;
    }
    FEDERAL_EXEMPTIONS
        .iter()
        .find(|(table_year, _)| *table_year == year)
        .or_else(|| FEDERAL_EXEMPTIONS.last())
        .map_or(first_amount, |(_, amount)| *amount)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FederalExclusion {
    pub basic: f64,
    pub dsue_applied: f64,
}

impl FederalExclusion {
    pub fn total(self) -> f64 {
        self.basic + self.dsue_applied
    }
}

pub fn applicable_exclusion(
    year: i32,
    marital_status: MaritalStatus,
    bypass_trust: bool,
    portability_elected: bool,
    dsue_amount: f64,
) -> FederalExclusion {
    let basic = federal_exemption_for_year(year);
    let ported = |dsue: f64| dsue.max(0.0).min(basic);

    let dsue_applied = match marital_status {
        MaritalStatus::Single => 0.0,
        MaritalStatus::Widowed if portability_elected => ported(dsue_amount),
        MaritalStatus::Widowed => 0.0,
        MaritalStatus::Married if bypass_trust => basic,
        MaritalStatus::Married if portability_elected => {
            // No DSUE figure yet: the first death is assumed to leave the full exclusion unused.
            if dsue_amount > 0.0 {
                ported(dsue_amount)
            } else {
                basic
            }
        }
        MaritalStatus::Married => 0.0,
    };

    FederalExclusion {
        basic,
        dsue_applied,
    }
}

pub fn federal_estate_tax(taxable_estate: f64, exemption: f64) -> f64 {
    (taxable_estate - exemption.max(0.0)).max(0.0) * FEDERAL_ESTATE_TAX_RATE
}

pub fn graduated_tax(amount: f64, brackets: &[Bracket]) -> f64 {
    let amount = amount.max(0.0);
    let mut tax = 0.0;
    for (idx, bracket) in brackets.iter().enumerate() {
        if amount <= bracket.floor {
            break;
        }
        let ceiling = brackets
            .get(idx + 1)
            .map_or(f64::INFINITY, |next| next.floor);
        tax += (amount.min(ceiling) - bracket.floor) * bracket.rate.clamp(0.0, 1.0);
    }
    tax
}

pub fn state_schedule(code: &str) -> Option<&'static StateSchedule> {
    STATE_SCHEDULES
        .iter()
        .find(|schedule| schedule.code.eq_ignore_ascii_case(code))
}

pub fn is_known_state(code: &str) -> bool {
    US_STATE_CODES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(code))
}

pub fn state_estate_tax(code: &str, taxable_estate: f64) -> f64 {
    let Some(schedule) = state_schedule(code) else {
        return 0.0;
    };
    schedule_tax(schedule, taxable_estate)
}

fn schedule_tax(schedule: &StateSchedule, taxable_estate: f64) -> f64 {
    let taxable = taxable_estate.max(0.0);
    if taxable <= schedule.exemption {
        return 0.0;
    }

    let base = match schedule.cliff_ratio {
        Some(ratio) if taxable > schedule.exemption * ratio => taxable,
        _ => taxable - schedule.exemption,
    };
    graduated_tax(base, schedule.brackets)
}
