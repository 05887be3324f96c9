use log::debug;

use crate::libs::sync_error::sync_error::SyncError;

// Transport encoding of an IEEE-754 double as three integers, for transports that only carry
// integers or single-precision numbers. The encoding is computed arithmetically, never from
// the in-memory representation of the f64.

pub const EXPONENT_BIAS: i32 = 1023;
pub const MANTISSA_BITS: u32 = 52;
pub const HALF_MANTISSA_BITS: u32 = 26;

const SIGN_BIT: u32 = 1 << 11;
const EXPONENT_MASK: u32 = SIGN_BIT - 1;
const HALF_MANTISSA_MASK: u32 = (1 << HALF_MANTISSA_BITS) - 1;

#[readonly::make]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleTriple {
    pub se: u32, // sign in bit 11, biased exponent in bits 0..=10
    pub hi: u32, // top 26 mantissa bits
    pub lo: u32, // bottom 26 mantissa bits
}

impl DoubleTriple {
    // No validation: whatever arrives off the wire is decoded as-is.
    pub fn new(se: u32, hi: u32, lo: u32) -> DoubleTriple {
        DoubleTriple { se, hi, lo }
    }

    pub fn is_negative(&self) -> bool {
        self.se & SIGN_BIT != 0
    }

    pub fn biased_exponent(&self) -> i32 {
        (self.se & EXPONENT_MASK) as i32
    }
}

pub fn encode(v: f64) -> Result<DoubleTriple, SyncError> {
    if !v.is_finite() {
        return Err(SyncError::UnsupportedValue(v));
    }
    let negative = v < 0.0 || (v == 0.0 && v.is_sign_negative());
    let sign = if negative { SIGN_BIT } else { 0 };
    if v == 0.0 {
        return Ok(DoubleTriple::new(sign, 0, 0));
    }
    let mut m = if negative { -v } else { v };
    if m < f64::MIN_POSITIVE {
        return Err(SyncError::UnsupportedValue(v));
    }

    let mut exponent = EXPONENT_BIAS;
    while m >= 2.0 {
        m /= 2.0;
        exponent += 1;
    }
    while m < 1.0 {
        m *= 2.0;
        exponent -= 1;
    }

    let mut hi: u32 = 0;
    let mut lo: u32 = 0;
    for position in 0..MANTISSA_BITS {
        if m >= 1.0 {
            m -= 1.0;
        }
        m *= 2.0;
        let bit = if m >= 1.0 { 1 } else { 0 };
        if position < HALF_MANTISSA_BITS {
            hi = (hi << 1) | bit;
        } else {
            lo = (lo << 1) | bit;
        }
    }

    let triple = DoubleTriple::new(sign | exponent as u32, hi, lo);
    debug!("Encoded {} as {:?}", v, triple);
    Ok(triple)
}

pub fn decode(triple: &DoubleTriple) -> f64 {
    let exponent = triple.biased_exponent();
    let hi = triple.hi & HALF_MANTISSA_MASK;
    let lo = triple.lo & HALF_MANTISSA_MASK;

    let magnitude = if exponent == 0 && hi == 0 && lo == 0 {
        0.0
    } else {
        // Least significant bit first: each step pushes the accumulated fraction one place right.
        let mut fraction = 0.0_f64;
        for word in [lo, hi].iter() {
            let mut bits = *word;
            for _ in 0..HALF_MANTISSA_BITS {
                fraction = (fraction + (bits & 1) as f64) / 2.0;
                bits >>= 1;
            }
        }
        let mut value = 1.0 + fraction;
        let mut scale = exponent - EXPONENT_BIAS;
        while scale > 0 {
            value *= 2.0;
            scale -= 1;
        }
        while scale < 0 {
            value /= 2.0;
            scale += 1;
        }
        value
    };

    if triple.is_negative() { -magnitude } else { magnitude }
}

#[cfg(test)]
#[path = "./double_triple_spec.rs"]
mod double_triple_spec;
