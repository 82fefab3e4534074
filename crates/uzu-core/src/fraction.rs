use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Rational number representation for precise pattern timing.
///
/// Always stored in lowest terms with a positive denominator. Arithmetic
/// goes through i128 intermediates so deeply composed patterns do not
/// overflow before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };

    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    /// Create a new fraction and reduce it
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self::reduced(numerator as i128, denominator as i128)
    }

    /// Create a fraction from a whole number
    pub fn from_int(n: i64) -> Self {
        Fraction {
            numerator: n,
            denominator: 1,
        }
    }

    /// Reduce an i128 ratio and narrow it back to i64 components.
    ///
    /// Panics on a zero denominator and on ratios that stay outside i64
    /// even after reduction; both are construction errors, never produced
    /// by querying a built pattern.
    fn reduced(numerator: i128, denominator: i128) -> Self {
        if denominator == 0 {
            panic!("fraction denominator cannot be zero");
        }
        let gcd = Self::gcd_i128(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
        let sign = if denominator < 0 { -1 } else { 1 };
        let n = numerator / gcd * sign;
        let d = (denominator / gcd).abs();
        match (i64::try_from(n), i64::try_from(d)) {
            (Ok(numerator), Ok(denominator)) => Fraction {
                numerator,
                denominator,
            },
            _ => panic!("fraction overflow after reduction: {}/{}", n, d),
        }
    }

    fn gcd_i128(mut a: u128, mut b: u128) -> u128 {
        if a == 0 && b == 0 {
            return 1;
        }
        while b != 0 {
            let t = b;
            b = a % b;
            a = t;
        }
        a
    }

    /// Greatest common divisor
    pub fn gcd(mut a: i64, mut b: i64) -> i64 {
        while b != 0 {
            let t = b;
            b = a % b;
            a = t;
        }
        a
    }

    /// Least common multiple
    pub fn lcm(a: i64, b: i64) -> i64 {
        if a == 0 || b == 0 {
            return 0;
        }
        (a / Self::gcd(a.abs(), b.abs())).abs().wrapping_mul(b.abs())
    }

    /// Best rational approximation of a float, denominator bounded by 2^24.
    ///
    /// Only called at the user-input boundary; query loops never convert
    /// from floats.
    pub fn from_float(f: f64) -> Self {
        if !f.is_finite() {
            panic!("cannot build a fraction from a non-finite float");
        }
        const MAX_DENOMINATOR: i64 = 1 << 24;
        let negative = f < 0.0;
        let mut x = f.abs();
        let (mut h0, mut h1) = (0i64, 1i64);
        let (mut k0, mut k1) = (1i64, 0i64);
        loop {
            let a = x.floor();
            if a > i64::MAX as f64 {
                break;
            }
            let a = a as i64;
            let next_h = a.checked_mul(h1).and_then(|v| v.checked_add(h0));
            let next_k = a.checked_mul(k1).and_then(|v| v.checked_add(k0));
            match (next_h, next_k) {
                (Some(h), Some(k)) if k <= MAX_DENOMINATOR => {
                    h0 = h1;
                    h1 = h;
                    k0 = k1;
                    k1 = k;
                }
                _ => break,
            }
            let rest = x - a as f64;
            if rest < 1e-12 {
                break;
            }
            x = 1.0 / rest;
        }
        let numerator = if negative { -h1 } else { h1 };
        Fraction::new(numerator, k1.max(1))
    }

    /// Convert to float. One-way: only used at the scheduler boundary and
    /// for signal waveform math.
    pub fn to_float(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Get the reciprocal
    pub fn reciprocal(self) -> Self {
        Fraction::new(self.denominator, self.numerator)
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_negative(&self) -> bool {
        self.numerator < 0
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Fraction {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    /// Floor - round down to the nearest integer (towards negative infinity)
    pub fn floor(self) -> Self {
        Fraction::from_int(self.numerator.div_euclid(self.denominator))
    }

    /// Ceiling - round up to the nearest integer
    pub fn ceil(self) -> Self {
        -((-self).floor())
    }

    /// Round to the nearest integer, halves up
    pub fn round(self) -> i64 {
        (self + Fraction::new(1, 2)).floor().numerator
    }

    /// Start of the cycle this time falls in
    pub fn sam(self) -> Self {
        self.floor()
    }

    /// Start of the next cycle, strictly greater than self
    pub fn next_sam(self) -> Self {
        self.floor() + Fraction::ONE
    }

    /// Index of the cycle this time falls in
    pub fn cycle_of(self) -> i64 {
        self.numerator.div_euclid(self.denominator)
    }

    /// Position within the current cycle, in [0, 1)
    pub fn cycle_pos(self) -> Self {
        self - self.sam()
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_int(n)
    }
}

impl From<i32> for Fraction {
    fn from(n: i32) -> Self {
        Fraction::from_int(n as i64)
    }
}

impl From<usize> for Fraction {
    fn from(n: usize) -> Self {
        Fraction::from_int(n as i64)
    }
}

impl From<f64> for Fraction {
    fn from(f: f64) -> Self {
        Fraction::from_float(f)
    }
}

impl From<(i64, i64)> for Fraction {
    fn from((num, den): (i64, i64)) -> Self {
        Fraction::new(num, den)
    }
}

impl Add for Fraction {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Fraction::reduced(
            self.numerator as i128 * other.denominator as i128
                + other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl Sub for Fraction {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Fraction::reduced(
            self.numerator as i128 * other.denominator as i128
                - other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl Mul for Fraction {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Fraction::reduced(
            self.numerator as i128 * other.numerator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl Div for Fraction {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, other: Self) -> Self {
        Fraction::reduced(
            self.numerator as i128 * other.denominator as i128,
            self.denominator as i128 * other.numerator as i128,
        )
    }
}

impl Neg for Fraction {
    type Output = Self;

    fn neg(self) -> Self {
        Fraction {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl Mul<i64> for Fraction {
    type Output = Self;

    fn mul(self, n: i64) -> Self {
        Fraction::reduced(
            self.numerator as i128 * n as i128,
            self.denominator as i128,
        )
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}
