//! Galois field GF(2^m) arithmetic and polynomials over it.
//!
//! A field is configured by a primitive irreducible polynomial (bits are
//! coefficients, LSB is the constant term), a field size, and a generator
//! base `b` (0 for QR, 1 for most others). Addition is XOR; multiplication
//! and inverse go through precomputed exp/log tables.

use lazy_static::lazy_static;
use std::fmt;

pub struct GenericGf {
    exp: Vec<i32>,
    log: Vec<i32>,
    size: i32,
    primitive: i32,
    generator_base: i32,
}

impl GenericGf {
    pub fn new(primitive: i32, size: i32, generator_base: i32) -> GenericGf {
        let size_u = size as usize;
        let mut exp = vec![0i32; size_u];
        let mut log = vec![0i32; size_u];
        let mut x: i32 = 1;
        for i in 0..size_u {
            exp[i] = x;
            x <<= 1;
            if x >= size {
                x ^= primitive;
                x &= size - 1;
            }
        }
        for i in 0..size_u - 1 {
            log[exp[i] as usize] = i as i32;
        }
        GenericGf {
            exp,
            log,
            size,
            primitive,
            generator_base,
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn generator_base(&self) -> i32 {
        self.generator_base
    }

    pub fn zero(&self) -> GfPoly {
        GfPoly::new(vec![0])
    }

    pub fn one(&self) -> GfPoly {
        GfPoly::new(vec![1])
    }

    pub fn build_monomial(&self, degree: usize, coefficient: i32) -> GfPoly {
        if coefficient == 0 {
            return self.zero();
        }
        let mut coefficients = vec![0i32; degree + 1];
        coefficients[0] = coefficient;
        GfPoly::new(coefficients)
    }

    pub fn add_or_subtract(a: i32, b: i32) -> i32 {
        a ^ b
    }

    pub fn exp(&self, a: i32) -> i32 {
        self.exp[a as usize]
    }

    pub fn log(&self, a: i32) -> i32 {
        assert!(a != 0, "log(0) is undefined");
        self.log[a as usize]
    }

    pub fn inverse(&self, a: i32) -> i32 {
        assert!(a != 0, "0 has no inverse");
        self.exp[(self.size - self.log[a as usize] - 1) as usize]
    }

    pub fn multiply(&self, a: i32, b: i32) -> i32 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[((self.log[a as usize] + self.log[b as usize]) % (self.size - 1)) as usize]
    }
}

lazy_static! {
    /// The QR-specific field, primitive polynomial x^8+x^4+x^3+x^2+1 = 0x011D, generator base 0.
    pub static ref QR_CODE_FIELD_256: GenericGf = GenericGf::new(0x011D, 256, 0);

    /// Data Matrix's field, same primitive degree but generator base 1.
    pub static ref DATA_MATRIX_FIELD_256: GenericGf = GenericGf::new(0x012D, 256, 1);

    /// Aztec/Maxicode share the Data Matrix field for their byte-oriented codewords.
    pub static ref AZTEC_DATA_12: GenericGf = GenericGf::new(0x1069, 4096, 1);
    pub static ref MAXICODE_FIELD_64: GenericGf = GenericGf::new(0x43, 64, 1);
}

/// An immutable polynomial over a `GenericGf`, coefficients stored
/// highest-power first; leading zeros are stripped except for the zero
/// polynomial itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfPoly {
    coefficients: Vec<i32>,
}

impl GfPoly {
    pub fn new(coefficients: Vec<i32>) -> GfPoly {
        assert!(!coefficients.is_empty());
        if coefficients.len() > 1 && coefficients[0] == 0 {
            let mut first_non_zero = 1;
            while first_non_zero < coefficients.len() && coefficients[first_non_zero] == 0 {
                first_non_zero += 1;
            }
            if first_non_zero == coefficients.len() {
                return GfPoly {
                    coefficients: vec![0],
                };
            }
            return GfPoly {
                coefficients: coefficients[first_non_zero..].to_vec(),
            };
        }
        GfPoly { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    /// Coefficient of `x^degree`.
    pub fn coefficient(&self, degree: usize) -> i32 {
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    pub fn coefficients(&self) -> &[i32] {
        &self.coefficients
    }

    pub fn evaluate_at(&self, field: &GenericGf, a: i32) -> i32 {
        if a == 0 {
            return self.coefficient(0);
        }
        let mut result = self.coefficients[0];
        if a == 1 {
            for &c in &self.coefficients[1..] {
                result = GenericGf::add_or_subtract(result, c);
            }
            return result;
        }
        for &c in &self.coefficients[1..] {
            result = GenericGf::add_or_subtract(field.multiply(a, result), c);
        }
        result
    }

    pub fn add_or_subtract(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (smaller, larger) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let mut sum = vec![0i32; larger.len()];
        let len_diff = larger.len() - smaller.len();
        sum[..len_diff].copy_from_slice(&larger[..len_diff]);
        for i in len_diff..larger.len() {
            sum[i] = GenericGf::add_or_subtract(smaller[i - len_diff], larger[i]);
        }
        GfPoly::new(sum)
    }

    pub fn multiply(&self, field: &GenericGf, other: &GfPoly) -> GfPoly {
        if self.is_zero() || other.is_zero() {
            return field.zero();
        }
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0i32; a.len() + b.len() - 1];
        for (i, &ai) in a.iter().enumerate() {
            if ai == 0 {
                continue;
            }
            for (j, &bj) in b.iter().enumerate() {
                if bj != 0 {
                    product[i + j] =
                        GenericGf::add_or_subtract(product[i + j], field.multiply(ai, bj));
                }
            }
        }
        GfPoly::new(product)
    }

    pub fn multiply_scalar(&self, field: &GenericGf, scalar: i32) -> GfPoly {
        if scalar == 0 {
            return field.zero();
        }
        if scalar == 1 {
            return self.clone();
        }
        let product: Vec<i32> = self
            .coefficients
            .iter()
            .map(|&c| field.multiply(c, scalar))
            .collect();
        GfPoly::new(product)
    }

    pub fn multiply_by_monomial(&self, field: &GenericGf, degree: usize, coefficient: i32) -> GfPoly {
        if coefficient == 0 {
            return field.zero();
        }
        let mut product = vec![0i32; self.coefficients.len() + degree];
        for (i, &c) in self.coefficients.iter().enumerate() {
            product[i] = field.multiply(c, coefficient);
        }
        GfPoly::new(product)
    }

    /// Polynomial long division, returning `(quotient, remainder)`.
    pub fn divide(&self, field: &GenericGf, other: &GfPoly) -> (GfPoly, GfPoly) {
        assert!(!other.is_zero(), "division by zero polynomial");
        let mut quotient = field.zero();
        let mut remainder = self.clone();
        let denominator_leading_term = other.coefficient(other.degree());
        let inverse_denominator_leading_term = field.inverse(denominator_leading_term);

        while !remainder.is_zero() && remainder.degree() >= other.degree() {
            let degree_diff = remainder.degree() - other.degree();
            let scale = field.multiply(
                remainder.coefficient(remainder.degree()),
                inverse_denominator_leading_term,
            );
            let term = other.multiply_by_monomial(field, degree_diff, scale);
            let iteration_quotient = field.build_monomial(degree_diff, scale);
            quotient = quotient.add_or_subtract(&iteration_quotient);
            remainder = remainder.add_or_subtract(&term);
        }
        (quotient, remainder)
    }
}

impl fmt::Display for GfPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &c) in self.coefficients.iter().enumerate() {
            let degree = self.coefficients.len() - 1 - i;
            if c != 0 {
                write!(f, "{}x^{} ", c, degree)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_log_are_inverses() {
        let field = &*QR_CODE_FIELD_256;
        for a in 1..256 {
            assert_eq!(field.exp(field.log(a)), a);
        }
    }

    #[test]
    fn multiply_matches_exp_log() {
        let field = &*QR_CODE_FIELD_256;
        assert_eq!(field.multiply(0, 5), 0);
        assert_eq!(field.multiply(5, 0), 0);
        let a = 0x57;
        let b = 0x83;
        let expected = field.exp((field.log(a) + field.log(b)) % 255);
        assert_eq!(field.multiply(a, b), expected);
    }

    #[test]
    fn inverse_is_reciprocal() {
        let field = &*QR_CODE_FIELD_256;
        for a in 1..256 {
            assert_eq!(field.multiply(a, field.inverse(a)), 1);
        }
    }

    #[test]
    fn poly_division_recombines() {
        let field = &*QR_CODE_FIELD_256;
        let dividend = GfPoly::new(vec![1, 2, 3, 4, 5]);
        let divisor = GfPoly::new(vec![1, 6]);
        let (q, r) = dividend.divide(field, &divisor);
        let recombined = q.multiply(field, &divisor).add_or_subtract(&r);
        assert_eq!(recombined, dividend);
    }

    #[test]
    fn leading_zero_stripped() {
        let p = GfPoly::new(vec![0, 0, 5, 2]);
        assert_eq!(p.degree(), 1);
        assert_eq!(p.coefficient(1), 5);
    }
}
