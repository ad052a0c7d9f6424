use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::volumetrics::float_values;
use crate::config::SpecLimits;
use crate::core::domain::{Verdict, VolumetricProperty};
use crate::core::error::MixResult;
use crate::transformations::cleaning::put_column;

/// Inclusive acceptance range for one property. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecRule {
    pub property: VolumetricProperty,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SpecRule {
    /// Classify one value. Non-finite values are `Undefined`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixvol::algorithms::specs::SpecRule;
    /// use mixvol::core::domain::{Verdict, VolumetricProperty};
    ///
    /// let rule = SpecRule { property: VolumetricProperty::Vma, min: Some(14.0), max: None };
    /// assert_eq!(rule.classify(14.0), Verdict::Pass);
    /// assert_eq!(rule.classify(13.99), Verdict::Fail);
    /// assert_eq!(rule.classify(f64::NAN), Verdict::Undefined);
    /// ```
    pub fn classify(&self, value: f64) -> Verdict {
        if !value.is_finite() {
            return Verdict::Undefined;
        }
        let above_min = self.min.map_or(true, |min| value >= min);
        let below_max = self.max.map_or(true, |max| value <= max);
        if above_min && below_max {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Human readable range, e.g. `3 <= Va <= 5` or `VMA >= 14`.
    pub fn describe(&self) -> String {
        let symbol = self.property.symbol();
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{} <= {} <= {}", min, symbol, max),
            (Some(min), None) => format!("{} >= {}", symbol, min),
            (None, Some(max)) => format!("{} <= {}", symbol, max),
            (None, None) => format!("{} unrestricted", symbol),
        }
    }
}

/// Rules for the three properties, in calculation order.
pub fn rules_from_limits(limits: &SpecLimits) -> [SpecRule; 3] {
    [
        SpecRule {
            property: VolumetricProperty::AirVoids,
            min: Some(limits.va_min),
            max: Some(limits.va_max),
        },
        SpecRule {
            property: VolumetricProperty::Vma,
            min: Some(limits.vma_min),
            max: None,
        },
        SpecRule {
            property: VolumetricProperty::Vfb,
            min: Some(limits.vfb_min),
            max: Some(limits.vfb_max),
        },
    ]
}

/// Append `Va Status`, `VMA Status` and `VFB Status` to a table that carries
/// the derived property columns.
pub fn evaluate_specs(df: &DataFrame, limits: &SpecLimits) -> MixResult<DataFrame> {
    let mut result = df.clone();

    for rule in rules_from_limits(limits) {
        let values = float_values(df, rule.property.column_name())?;
        let verdicts: Vec<&str> = values.iter().map(|v| rule.classify(*v).as_str()).collect();
        put_column(
            &mut result,
            Column::new(rule.property.status_column().into(), verdicts),
        )?;
    }

    Ok(result)
}

/// Verdict counts for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property: VolumetricProperty,
    pub rule: String,
    pub pass: usize,
    pub fail: usize,
    pub undefined: usize,
}

/// Verdict counts for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecSummary {
    pub total_samples: usize,
    /// Samples that pass every property
    pub all_pass: usize,
    pub properties: Vec<PropertySummary>,
}

impl SpecSummary {
    pub fn property(&self, property: VolumetricProperty) -> Option<&PropertySummary> {
        self.properties.iter().find(|p| p.property == property)
    }
}

/// Count verdicts in an evaluated table.
///
/// Status cells that are missing or unreadable count as undefined.
pub fn summarize(df: &DataFrame, limits: &SpecLimits) -> MixResult<SpecSummary> {
    let total_samples = df.height();
    let mut all_pass = vec![true; total_samples];
    let mut properties = Vec::with_capacity(3);

    for rule in rules_from_limits(limits) {
        let statuses = df.column(rule.property.status_column())?.str()?;
        let mut summary = PropertySummary {
            property: rule.property,
            rule: rule.describe(),
            pass: 0,
            fail: 0,
            undefined: 0,
        };

        for (row, status) in statuses.into_iter().enumerate() {
            let verdict = status
                .and_then(|s| s.parse::<Verdict>().ok())
                .unwrap_or(Verdict::Undefined);
            match verdict {
                Verdict::Pass => summary.pass += 1,
                Verdict::Fail => summary.fail += 1,
                Verdict::Undefined => summary.undefined += 1,
            }
            if !verdict.is_pass() {
                all_pass[row] = false;
            }
        }
        properties.push(summary);
    }

    Ok(SpecSummary {
        total_samples,
        all_pass: all_pass.iter().filter(|p| **p).count(),
        properties,
    })
}
