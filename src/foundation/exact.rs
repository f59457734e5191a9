//! Exact rational arithmetic for degree-level geometry.
//!
//! Every finite `f64` is a dyadic rational, so lifting into [`BigRational`] is lossless and all
//! intermediate sums, differences and quotients stay exact until the final conversion back.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use crate::foundation::error::{MapError, MapResult};

pub(crate) fn exact(v: f64) -> MapResult<BigRational> {
    BigRational::from_float(v)
        .ok_or_else(|| MapError::configuration(format!("value {v} is not a finite number")))
}

pub(crate) fn exact_int(v: u64) -> BigRational {
    BigRational::from_integer(BigInt::from(v))
}

pub(crate) fn checked_div(num: &BigRational, den: &BigRational) -> MapResult<BigRational> {
    if den.is_zero() {
        return Err(MapError::configuration("division by zero in degree arithmetic"));
    }
    Ok(num / den)
}

pub(crate) fn approx(v: &BigRational) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
