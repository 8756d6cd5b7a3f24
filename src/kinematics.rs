use std::f64::consts::PI;

use crate::error::DomainError;

/// Natural logarithm, defined for positive arguments only
pub(crate) fn ln(x: f64) -> Result<f64, DomainError> {
    if x <= 0. {
        return Err(DomainError::Log(x));
    }
    Ok(x.ln())
}

/// Magnitude of a three-momentum
pub(crate) fn momentum(px: f64, py: f64, pz: f64) -> f64 {
    (px * px + py * py + pz * pz).sqrt()
}

/// Pseudorapidity `atanh(pz / p)`
pub(crate) fn pseudorapidity(pz: f64, p: f64) -> Result<f64, DomainError> {
    let ratio = div(pz, p, "pseudorapidity")?;
    if ratio.abs() >= 1. {
        return Err(DomainError::Atanh(ratio));
    }
    Ok(ratio.atanh())
}

/// Azimuthal angle `atan(py / px)`
///
/// NOTE: single-ratio arctangent, the result lies in [-π/2, π/2]
/// and does not resolve the quadrant.
pub(crate) fn azimuth(px: f64, py: f64) -> Result<f64, DomainError> {
    div(py, px, "azimuthal angle").map(f64::atan)
}

/// Sign function with `sign(±0) = 0` and `sign(NaN) = NaN`
pub(crate) fn sign(x: f64) -> f64 {
    if x > 0. {
        1.
    } else if x < 0. {
        -1.
    } else if x == 0. {
        0.
    } else {
        f64::NAN
    }
}

/// Representative of `x mod 2π` closest to zero, in `(-π, π]`
pub(crate) fn wrap_phi(x: f64) -> f64 {
    x - 2. * PI * (x / (2. * PI) - 0.5).ceil()
}

fn div(num: f64, den: f64, what: &'static str) -> Result<f64, DomainError> {
    if den == 0. {
        return Err(DomainError::DivisionByZero(what));
    }
    Ok(num / den)
}
