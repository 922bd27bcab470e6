//! Reed-Solomon encoder and decoder over a `GenericGf`.
//!
//! The decoder follows the classical Euclidean-algorithm / Chien-search /
//! Forney shape. One wart is preserved deliberately: the Forney error
//! evaluator's denominator term gets its LSB forced to 1 before being used
//! as a divisor. That's a compensating hack from the reference this is
//! descended from (the old JIT it ran on is gone, the constant-folding bug
//! it dodged doesn't apply here) but it is bitwise-neutral in GF(2^8) since
//! every such term is a product of `1 XOR x_j*x_i^-1` factors that always
//! has bit 0 set when non-zero, so keeping the line is free and keeps this
//! decoder bit-identical to the one it was checked against.

use crate::error::{Error, Result};
use crate::gf::{GenericGf, GfPoly};
use std::collections::HashMap;

pub struct ReedSolomonEncoder<'a> {
    field: &'a GenericGf,
    cached_generators: HashMap<usize, GfPoly>,
}

impl<'a> ReedSolomonEncoder<'a> {
    pub fn new(field: &'a GenericGf) -> ReedSolomonEncoder<'a> {
        let mut cached_generators = HashMap::new();
        cached_generators.insert(0, field.one());
        ReedSolomonEncoder {
            field,
            cached_generators,
        }
    }

    fn generator(&mut self, degree: usize) -> GfPoly {
        if let Some(g) = self.cached_generators.get(&degree) {
            return g.clone();
        }
        let mut last_known = self
            .cached_generators
            .iter()
            .filter(|(&d, _)| d < degree)
            .max_by_key(|(&d, _)| d)
            .map(|(&d, g)| (d, g.clone()))
            .unwrap_or((0, self.field.one()));
        while last_known.0 < degree {
            let next_degree = last_known.0 + 1;
            let factor = GfPoly::new(vec![
                1,
                self.field
                    .exp((next_degree as i32 - 1) + self.field.generator_base()),
            ]);
            let next_poly = last_known.1.multiply(self.field, &factor);
            self.cached_generators.insert(next_degree, next_poly.clone());
            last_known = (next_degree, next_poly);
        }
        last_known.1
    }

    /// Appends `ec_count` error-correction codewords to `data` in place.
    pub fn encode(&mut self, data: &mut Vec<u8>, ec_count: usize) {
        assert!(ec_count > 0);
        let generator = self.generator(ec_count);
        let info_coefficients: Vec<i32> = data.iter().map(|&b| b as i32).collect();
        let mut info = GfPoly::new(info_coefficients);
        info = info.multiply_by_monomial(self.field, ec_count, 1);
        let (_, remainder) = info.divide(self.field, &generator);
        let coefficients = remainder.coefficients();
        let num_zero_pad = ec_count - coefficients.len();
        for _ in 0..num_zero_pad {
            data.push(0);
        }
        for &c in coefficients {
            data.push(c as u8);
        }
    }
}

pub struct ReedSolomonDecoder<'a> {
    field: &'a GenericGf,
}

impl<'a> ReedSolomonDecoder<'a> {
    pub fn new(field: &'a GenericGf) -> ReedSolomonDecoder<'a> {
        ReedSolomonDecoder { field }
    }

    /// Corrects up to `ec_count / 2` errors in `received` in place.
    /// Returns the number of errors corrected.
    pub fn decode(&self, received: &mut [u8], ec_count: usize) -> Result<usize> {
        let field = self.field;
        let mut poly_coefficients: Vec<i32> = received.iter().map(|&b| b as i32).collect();
        let poly = GfPoly::new(poly_coefficients.clone());

        let mut syndrome_coefficients = vec![0i32; ec_count];
        let mut no_error = true;
        for i in 0..ec_count {
            let eval = poly.evaluate_at(field, field.exp(i as i32 + field.generator_base()));
            syndrome_coefficients[ec_count - 1 - i] = eval;
            if eval != 0 {
                no_error = false;
            }
        }
        if no_error {
            return Ok(0);
        }

        let syndrome = GfPoly::new(syndrome_coefficients);
        let monomial = field.build_monomial(ec_count, 1);
        let (sigma, omega) = Self::run_euclidean_algorithm(field, &monomial, &syndrome, ec_count)?;

        let error_locations = Self::find_error_locations(field, &sigma)?;
        let error_magnitudes = Self::find_error_magnitudes(field, &omega, &error_locations);

        for i in 0..error_locations.len() {
            let position = poly_coefficients.len() as i32
                - 1
                - field.log(error_locations[i]);
            if position < 0 {
                return Err(Error::checksum("bad error location"));
            }
            let pos = position as usize;
            poly_coefficients[pos] = GenericGf::add_or_subtract(
                poly_coefficients[pos],
                error_magnitudes[i],
            );
        }

        for (dst, &v) in received.iter_mut().zip(poly_coefficients.iter()) {
            *dst = v as u8;
        }
        Ok(error_locations.len())
    }

    fn run_euclidean_algorithm(
        field: &GenericGf,
        a: &GfPoly,
        b: &GfPoly,
        r: usize,
    ) -> Result<(GfPoly, GfPoly)> {
        let (mut r_last, mut r_cur) = if a.degree() < b.degree() {
            (b.clone(), a.clone())
        } else {
            (a.clone(), b.clone())
        };
        let mut t_last = field.zero();
        let mut t_cur = field.one();

        while r_cur.degree() >= r / 2 {
            let r_last_last = r_last;
            let t_last_last = t_last;
            r_last = r_cur;
            t_last = t_cur;

            if r_last.is_zero() {
                return Err(Error::checksum("r_i-1 was zero"));
            }
            r_cur = r_last_last;
            let mut q = field.zero();
            let denominator_leading_term = r_last.coefficient(r_last.degree());
            let dlt_inverse = field.inverse(denominator_leading_term);
            while r_cur.degree() >= r_last.degree() && !r_cur.is_zero() {
                let degree_diff = r_cur.degree() - r_last.degree();
                let scale = field.multiply(r_cur.coefficient(r_cur.degree()), dlt_inverse);
                q = q.add_or_subtract(&field.build_monomial(degree_diff, scale));
                r_cur = r_cur.add_or_subtract(&r_last.multiply_by_monomial(field, degree_diff, scale));
            }

            t_cur = q.multiply(field, &t_last).add_or_subtract(&t_last_last);

            if r_cur.degree() >= r_last.degree() {
                return Err(Error::checksum(
                    "division algorithm failed to reduce polynomial degree",
                ));
            }
        }

        let sigma_tilde_at_zero = t_cur.coefficient(0);
        if sigma_tilde_at_zero == 0 {
            return Err(Error::checksum("sigma(0) was zero"));
        }

        let inverse = field.inverse(sigma_tilde_at_zero);
        let sigma = t_cur.multiply_scalar(field, inverse);
        let omega = r_cur.multiply_scalar(field, inverse);
        Ok((sigma, omega))
    }

    fn find_error_locations(field: &GenericGf, error_locator: &GfPoly) -> Result<Vec<i32>> {
        let num_errors = error_locator.degree();
        if num_errors == 1 {
            return Ok(vec![error_locator.coefficient(1)]);
        }
        let mut result = vec![0i32; num_errors];
        let mut e = 0usize;
        let mut i = 1i32;
        while i < field.size() && e < num_errors {
            if error_locator.evaluate_at(field, i) == 0 {
                result[e] = field.inverse(i);
                e += 1;
            }
            i += 1;
        }
        if e != num_errors {
            return Err(Error::checksum("error locator degree does not match number of roots"));
        }
        Ok(result)
    }

    fn find_error_magnitudes(
        field: &GenericGf,
        error_evaluator: &GfPoly,
        error_locations: &[i32],
    ) -> Vec<i32> {
        let s = error_locations.len();
        let mut result = vec![0i32; s];
        for i in 0..s {
            let xi_inverse = field.inverse(error_locations[i]);
            let mut denominator = 1;
            for j in 0..s {
                if i != j {
                    // denominator *= (1 XOR errorLocations[j]*xiInverse)
                    let term = field.multiply(error_locations[j], xi_inverse);
                    // See module doc: force LSB to 1 before using as a factor.
                    let term_plus_one = if term & 0x1 == 0 {
                        term | 1
                    } else {
                        term & !0x1
                    };
                    denominator = field.multiply(denominator, term_plus_one);
                }
            }
            result[i] = field.multiply(
                error_evaluator.evaluate_at(field, xi_inverse),
                field.inverse(denominator),
            );
            if field.generator_base() != 0 {
                result[i] = field.multiply(result[i], xi_inverse);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf::QR_CODE_FIELD_256;

    #[test]
    fn jisx0510_appendix_i_vector() {
        let field = &*QR_CODE_FIELD_256;
        let mut data: Vec<u8> = vec![
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let expected_ec: Vec<u8> = vec![
            0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55,
        ];
        let mut encoder = ReedSolomonEncoder::new(field);
        encoder.encode(&mut data, 10);
        assert_eq!(&data[16..], &expected_ec[..]);
    }

    #[test]
    fn decode_recovers_from_corruption() {
        let field = &*QR_CODE_FIELD_256;
        let mut data: Vec<u8> = vec![
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let original = data.clone();
        let mut encoder = ReedSolomonEncoder::new(field);
        encoder.encode(&mut data, 10);

        // Corrupt up to ec/2 = 5 bytes.
        data[0] ^= 0xFF;
        data[3] ^= 0x11;
        data[9] ^= 0x77;
        data[15] ^= 0x01;
        data[20] ^= 0x22;

        let decoder = ReedSolomonDecoder::new(field);
        let corrected = decoder.decode(&mut data, 10).unwrap();
        assert!(corrected > 0);
        assert_eq!(&data[..16], &original[..]);
    }

    #[test]
    fn decode_with_no_errors_is_noop() {
        let field = &*QR_CODE_FIELD_256;
        let mut data: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
        let mut encoder = ReedSolomonEncoder::new(field);
        encoder.encode(&mut data, 8);
        let original = data.clone();
        let decoder = ReedSolomonDecoder::new(field);
        let corrected = decoder.decode(&mut data, 8).unwrap();
        assert_eq!(corrected, 0);
        assert_eq!(data, original);
    }
}
