use super::{RateConvention, RateError, RateResult, RateSnapshot, RatedAsset};

/// USD value of one unit of `asset` under `convention`.
///
/// The reference asset is exactly 1.0 rather than `1.0 / 1.0`.
pub fn usd_value(asset: &RatedAsset, convention: RateConvention, is_reference: bool) -> f64 {
    if is_reference {
        return 1.0;
    }
    match convention {
        RateConvention::UnitsPerUsd => 1.0 / asset.rate,
        RateConvention::UsdPerUnit => asset.rate,
    }
}

/// `Σ(usd_value · weight) / Σ(weight)` over the snapshot.
///
/// Every weight must be finite and non-negative, and the result must be
/// finite; anything else is an error rather than a NaN handed to callers.
pub fn weighted_average(snapshot: &RateSnapshot) -> RateResult<f64> {
    if snapshot.is_empty() {
        return Err(RateError::EmptyBasket(snapshot.class));
    }

    let convention = snapshot.class.convention();
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for asset in &snapshot.assets {
        let weight = asset.weight();
        if !weight.is_finite() || weight < 0.0 {
            return Err(RateError::InvalidWeight {
                class: snapshot.class,
                code: asset.code().to_string(),
                weight,
            });
        }
        let value = usd_value(asset, convention, snapshot.is_reference(asset.code()));
        weighted_sum += value * weight;
        total_weight += weight;
    }

    if !total_weight.is_finite() || !weighted_sum.is_finite() {
        return Err(RateError::NonFiniteAverage(snapshot.class));
    }
    if total_weight == 0.0 {
        return Err(RateError::ZeroWeight(snapshot.class));
    }

    let average = weighted_sum / total_weight;
    if !average.is_finite() {
        return Err(RateError::NonFiniteAverage(snapshot.class));
    }
    Ok(average)
}
