//! Volumetric property formulas.
//!
//! Scalar formulas operate on plain `f64` and return NaN for degenerate
//! inputs (zero denominators, missing values) instead of failing.
//! [`compute_properties`] applies them row by row to a mix table.

use polars::prelude::*;

use crate::config::{VmaFormula, VolumetricsSettings};
use crate::core::domain::{
    MixConstants, VolumetricProperty, BITUMEN_COL, GMB_COL, GMM_COL, GSE_COL, PBA_COL,
};
use crate::core::error::MixResult;
use crate::transformations::cleaning::put_column;

/// Air voids, Va (%) = (Gmm - Gmb) / Gmm x 100.
///
/// # Examples
///
/// ```
/// use mixvol::algorithms::volumetrics::air_voids;
///
/// let va = air_voids(2.35, 2.45);
/// assert!((va - 4.0816).abs() < 1e-4);
/// assert!(air_voids(2.35, 0.0).is_nan());
/// ```
pub fn air_voids(gmb: f64, gmm: f64) -> f64 {
    if gmm == 0.0 {
        return f64::NAN;
    }
    (gmm - gmb) / gmm * 100.0
}

/// Voids in the mineral aggregate, VMA (%).
pub fn voids_in_mineral_aggregate(gmb: f64, gsb: f64, bitumen: f64, formula: VmaFormula) -> f64 {
    if gsb == 0.0 {
        return f64::NAN;
    }
    match formula {
        VmaFormula::GsbOnly => (1.0 - gmb / gsb) * 100.0,
        VmaFormula::GsbAndBitumen => 100.0 - (gmb / gsb) * (100.0 - bitumen),
    }
}

/// Voids filled with binder, VFB (%) = (VMA - Va) / VMA x 100.
pub fn voids_filled_with_binder(vma: f64, va: f64) -> f64 {
    if vma == 0.0 {
        return f64::NAN;
    }
    (vma - va) / vma * 100.0
}

/// Effective specific gravity of the aggregate.
///
/// Gse = (100 - Pb) / (100 / Gmm - Pb / Gb)
pub fn effective_gravity(gmm: f64, bitumen: f64, gb: f64) -> f64 {
    if gmm == 0.0 || gb == 0.0 {
        return f64::NAN;
    }
    let denominator = 100.0 / gmm - bitumen / gb;
    if denominator == 0.0 {
        return f64::NAN;
    }
    (100.0 - bitumen) / denominator
}

/// Absorbed binder by mass of aggregate, Pba (%).
///
/// Pba = 100 x Gb x (Gse - Gsb) / (Gse x Gsb)
pub fn absorbed_binder(gse: f64, gsb: f64, gb: f64) -> f64 {
    let denominator = gse * gsb;
    if denominator == 0.0 {
        return f64::NAN;
    }
    100.0 * gb * (gse - gsb) / denominator
}

/// Float values of a column with nulls read as NaN.
pub(crate) fn float_values(df: &DataFrame, name: &str) -> MixResult<Vec<f64>> {
    Ok(df
        .column(name)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Append the derived volumetric columns to a mix table.
///
/// The input must already carry `Float64` bitumen, Gmb and Gmm columns.
/// `Va (%)`, `VMA (%)` and `VFB (%)` are appended in that order, followed by
/// `Gse` and `Pba (%)` when binder absorption is enabled. An existing column
/// with one of those names is replaced. No row is dropped.
pub fn compute_properties(
    df: &DataFrame,
    constants: &MixConstants,
    settings: &VolumetricsSettings,
) -> MixResult<DataFrame> {
    constants.validate()?;

    let bitumen = float_values(df, BITUMEN_COL)?;
    let gmb = float_values(df, GMB_COL)?;
    let gmm = float_values(df, GMM_COL)?;

    let va: Vec<f64> = gmb
        .iter()
        .zip(&gmm)
        .map(|(b, m)| air_voids(*b, *m))
        .collect();
    let vma: Vec<f64> = gmb
        .iter()
        .zip(&bitumen)
        .map(|(b, pb)| voids_in_mineral_aggregate(*b, constants.gsb, *pb, settings.vma_formula))
        .collect();
    let vfb: Vec<f64> = vma
        .iter()
        .zip(&va)
        .map(|(vma, va)| voids_filled_with_binder(*vma, *va))
        .collect();

    let mut result = df.clone();
    let derived = [
        (VolumetricProperty::AirVoids.column_name(), va),
        (VolumetricProperty::Vma.column_name(), vma),
        (VolumetricProperty::Vfb.column_name(), vfb),
    ];
    for (name, values) in derived {
        if put_column(&mut result, Column::new(name.into(), values))? {
            log::warn!("Input column '{}' was replaced by the computed values", name);
        }
    }

    if settings.binder_absorption {
        let gse: Vec<f64> = gmm
            .iter()
            .zip(&bitumen)
            .map(|(m, pb)| effective_gravity(*m, *pb, constants.gb))
            .collect();
        let pba: Vec<f64> = gse
            .iter()
            .map(|g| absorbed_binder(*g, constants.gsb, constants.gb))
            .collect();
        for (name, values) in [(GSE_COL, gse), (PBA_COL, pba)] {
            if put_column(&mut result, Column::new(name.into(), values))? {
                log::warn!("Input column '{}' was replaced by the computed values", name);
            }
        }
    }

    log::debug!(
        "Computed volumetric properties for {} sample(s) using {}",
        result.height(),
        settings.vma_formula
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_frame() -> DataFrame {
        df!(
            "Sample" => &["S1", "S2", "S3"],
            "Bitumen Content (%)" => &[Some(4.5), Some(5.0), None],
            "Gmb" => &[Some(2.35), Some(2.37), Some(2.40)],
            "Gmm" => &[Some(2.45), Some(0.0), Some(2.43)],
        )
        .unwrap()
    }

    #[test]
    fn test_air_voids() {
        assert_relative_eq!(air_voids(2.35, 2.45), 4.081632653061225, epsilon = 1e-12);
        assert!(air_voids(2.35, 0.0).is_nan());
        assert!(air_voids(f64::NAN, 2.45).is_nan());
    }

    #[test]
    fn test_vma_formulas() {
        let gsb_only = voids_in_mineral_aggregate(2.35, 2.60, 5.0, VmaFormula::GsbOnly);
        assert_relative_eq!(gsb_only, (1.0 - 2.35 / 2.60) * 100.0, epsilon = 1e-12);

        let with_binder = voids_in_mineral_aggregate(2.35, 2.60, 5.0, VmaFormula::GsbAndBitumen);
        assert_relative_eq!(with_binder, 100.0 - (2.35 / 2.60) * 95.0, epsilon = 1e-12);

        // Bitumen content does not enter the gsb_only formula
        assert!(!voids_in_mineral_aggregate(2.35, 2.60, f64::NAN, VmaFormula::GsbOnly).is_nan());
        assert!(voids_in_mineral_aggregate(2.35, 2.60, f64::NAN, VmaFormula::GsbAndBitumen).is_nan());
    }

    #[test]
    fn test_vfb_zero_vma_is_nan() {
        assert!(voids_filled_with_binder(0.0, 4.0).is_nan());
        assert_relative_eq!(voids_filled_with_binder(16.0, 4.0), 75.0, epsilon = 1e-12);
    }

    #[test]
    fn test_binder_absorption() {
        let gse = effective_gravity(2.45, 5.0, 1.03);
        assert_relative_eq!(gse, 95.0 / (100.0 / 2.45 - 5.0 / 1.03), epsilon = 1e-12);
        let pba = absorbed_binder(gse, 2.60, 1.03);
        assert_relative_eq!(pba, 100.0 * 1.03 * (gse - 2.60) / (gse * 2.60), epsilon = 1e-12);
        assert!(effective_gravity(0.0, 5.0, 1.03).is_nan());
    }

    #[test]
    fn test_compute_properties_appends_columns_in_order() {
        let constants = MixConstants::new(1.03, 2.60).unwrap();
        let result =
            compute_properties(&sample_frame(), &constants, &VolumetricsSettings::default()).unwrap();

        let names: Vec<String> = result
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Sample", "Bitumen Content (%)", "Gmb", "Gmm", "Va (%)", "VMA (%)", "VFB (%)"]
        );
        assert_eq!(result.height(), 3);

        let va = float_values(&result, "Va (%)").unwrap();
        assert_relative_eq!(va[0], 4.081632653061225, epsilon = 1e-12);
        assert!(va[1].is_nan());

        let vfb = float_values(&result, "VFB (%)").unwrap();
        assert!(vfb[1].is_nan());
        assert!(vfb[2].is_finite());
    }

    #[test]
    fn test_compute_properties_with_binder_absorption() {
        let constants = MixConstants::new(1.03, 2.60).unwrap();
        let settings = VolumetricsSettings {
            vma_formula: VmaFormula::GsbAndBitumen,
            binder_absorption: true,
        };
        let result = compute_properties(&sample_frame(), &constants, &settings).unwrap();

        assert_eq!(result.width(), 9);
        assert_eq!(result.get_column_names()[7].as_str(), "Gse");
        assert_eq!(result.get_column_names()[8].as_str(), "Pba (%)");

        let vma = float_values(&result, "VMA (%)").unwrap();
        assert!(vma[2].is_nan(), "missing bitumen makes VMA undefined");
    }

    #[test]
    fn test_compute_properties_rejects_bad_constants() {
        let constants = MixConstants { gb: 1.03, gsb: -2.6 };
        let result = compute_properties(&sample_frame(), &constants, &VolumetricsSettings::default());
        assert!(result.unwrap_err().is_validation());
    }
}
