use std::cmp::Ordering;
use std::fmt;
use std::iter::Product;
use std::ops::Mul;
use std::str::FromStr;

/// A number held as `coefficient * 10^exponent` with the exponent kept
/// out of the float.
///
/// E-value products across the many hits of one query path routinely pass
/// 10^-308, where an `f64` silently flushes to zero, so the product must
/// be carried in this form. Always normalized so `1 <= |coefficient| < 10`
/// or exactly zero.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SciNot {
    coefficient: f64,
    exponent: i64,
}

impl SciNot {
    pub fn new(coefficient: f64, exponent: i64) -> Self {
        let mut value = SciNot {
            coefficient,
            exponent,
        };
        value.normalize();
        value
    }

    pub fn zero() -> Self {
        SciNot {
            coefficient: 0.0,
            exponent: 0,
        }
    }

    pub fn one() -> Self {
        SciNot {
            coefficient: 1.0,
            exponent: 0,
        }
    }

    pub fn from_f64(value: f64) -> Self {
        Self::new(value, 0)
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == 0.0
    }

    /// Collapse back to a plain float. Only safe for display and for
    /// values within the f64 range; extreme exponents under/overflow here
    /// by design.
    pub fn as_f64(&self) -> f64 {
        if self.exponent > i32::MAX as i64 {
            return f64::INFINITY * self.coefficient.signum();
        }
        if self.exponent < i32::MIN as i64 {
            return 0.0;
        }
        self.coefficient * 10f64.powi(self.exponent as i32)
    }

    fn normalize(&mut self) {
        if self.coefficient == 0.0 || !self.coefficient.is_finite() {
            self.exponent = 0;
            return;
        }
        while self.coefficient.abs() >= 10.0 {
            self.coefficient /= 10.0;
            self.exponent += 1;
        }
        while self.coefficient.abs() < 1.0 {
            self.coefficient *= 10.0;
            self.exponent -= 1;
        }
    }
}

impl Mul for SciNot {
    type Output = SciNot;

    fn mul(self, rhs: SciNot) -> SciNot {
        if self.is_zero() || rhs.is_zero() {
            return SciNot::zero();
        }
        SciNot::new(
            self.coefficient * rhs.coefficient,
            self.exponent + rhs.exponent,
        )
    }
}

impl Product for SciNot {
    fn product<I: Iterator<Item = SciNot>>(iter: I) -> SciNot {
        iter.fold(SciNot::one(), |acc, v| acc * v)
    }
}

impl PartialEq for SciNot {
    fn eq(&self, other: &Self) -> bool {
        self.coefficient == other.coefficient && self.exponent == other.exponent
    }
}

impl PartialOrd for SciNot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let sign = |v: &SciNot| {
            if v.is_zero() {
                0
            } else if v.coefficient > 0.0 {
                1
            } else {
                -1
            }
        };
        let (a, b) = (sign(self), sign(other));
        if a != b {
            return a.partial_cmp(&b);
        }
        if a == 0 {
            return Some(Ordering::Equal);
        }
        // Same nonzero sign: the exponent decides, flipped for negatives.
        let by_exponent = self.exponent.cmp(&other.exponent);
        let ord = if by_exponent == Ordering::Equal {
            self.coefficient.partial_cmp(&other.coefficient)?
        } else if a > 0 {
            by_exponent
        } else {
            by_exponent.reverse()
        };
        Some(ord)
    }
}

impl fmt::Display for SciNot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "0")
        } else {
            write!(f, "{}e{}", self.coefficient, self.exponent)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseSciNotError(String);

impl fmt::Display for ParseSciNotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse '{}' as scientific notation", self.0)
    }
}

impl std::error::Error for ParseSciNotError {}

impl FromStr for SciNot {
    type Err = ParseSciNotError;

    /// Accepts `1e-300`, `2.5E-10`, and plain decimals like `0.001`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseSciNotError(s.to_string()));
        }
        if let Some(pos) = trimmed.find(['e', 'E']) {
            let coefficient: f64 = trimmed[..pos]
                .parse()
                .map_err(|_| ParseSciNotError(s.to_string()))?;
            let exponent: i64 = trimmed[pos + 1..]
                .parse()
                .map_err(|_| ParseSciNotError(s.to_string()))?;
            Ok(SciNot::new(coefficient, exponent))
        } else {
            let value: f64 = trimmed
                .parse()
                .map_err(|_| ParseSciNotError(s.to_string()))?;
            Ok(SciNot::from_f64(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(SciNot::new(250.0, 0), SciNot::new(2.5, 2));
        assert_eq!(SciNot::new(0.5, 0), SciNot::new(5.0, -1));
        assert_eq!(SciNot::new(0.0, 5), SciNot::zero());
    }

    #[test]
    fn test_parsing() {
        assert_eq!("1e-300".parse::<SciNot>().unwrap(), SciNot::new(1.0, -300));
        assert_eq!("2.5E-10".parse::<SciNot>().unwrap(), SciNot::new(2.5, -10));
        assert_eq!("0.5".parse::<SciNot>().unwrap(), SciNot::new(5.0, -1));
        assert_eq!("12e4".parse::<SciNot>().unwrap(), SciNot::new(1.2, 5));
        assert!("".parse::<SciNot>().is_err());
        assert!("abc".parse::<SciNot>().is_err());
        assert!("1e".parse::<SciNot>().is_err());
    }

    #[test]
    fn test_product_does_not_underflow() {
        let a: SciNot = "1e-300".parse().unwrap();
        let b: SciNot = "1e-300".parse().unwrap();
        let product = a * b;
        assert_eq!(product, SciNot::new(1.0, -600));
        assert!(!product.is_zero());
        // The same product in plain f64 flushes to zero.
        assert_eq!(1e-300_f64 * 1e-300_f64, 0.0);
    }

    #[test]
    fn test_iterator_product() {
        let values: Vec<SciNot> = vec![
            "1e-100".parse().unwrap(),
            "2e-200".parse().unwrap(),
            "5e-10".parse().unwrap(),
        ];
        let product: SciNot = values.into_iter().product();
        assert_eq!(product, SciNot::new(1.0, -309));
    }

    #[test]
    fn test_ordering() {
        let small: SciNot = "1e-300".parse().unwrap();
        let smaller: SciNot = "1e-600".parse().unwrap();
        let big: SciNot = "3.0".parse().unwrap();
        assert!(smaller < small);
        assert!(small < big);
        assert!(SciNot::zero() < small);
        assert!(SciNot::new(-2.0, 5) < SciNot::zero());
        assert!(SciNot::new(-2.0, 5) < SciNot::new(-2.0, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(SciNot::new(1.0, -600).to_string(), "1e-600");
        assert_eq!(SciNot::new(2.5, 3).to_string(), "2.5e3");
        assert_eq!(SciNot::zero().to_string(), "0");
    }
}
