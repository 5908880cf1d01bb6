//! Galois field arithmetic over GF(2^n).
//!
//! A [`GaloisField`] is defined by its size exponent `numbits` and a
//! primitive reduction polynomial; the generator is fixed at 2. Scalar
//! multiply, power, and inverse are table lookups over log/exp tables built
//! once at construction. The exp table is stored doubled so that
//! `exp[log[a] + log[b]]` never needs a modulo.
//!
//! Construction doubles as the primitivity check: walking the generator's
//! powers must visit every nonzero element exactly once before the cycle
//! closes back to 1, otherwise the polynomial is rejected.
//!
//! On top of the scalar ops sit the bulk block operations
//! ([`multiply_block`](GaloisField::multiply_block) and
//! [`add_multiple_of_block`](GaloisField::add_multiple_of_block)) that the
//! erasure engine uses to apply one matrix coefficient across an entire
//! block buffer, one element at a time.

use std::sync::{Arc, LazyLock};

use crate::error::Error;

/// Width in bytes of one buffer element for the bulk block operations.
///
/// Must be wide enough to hold the field's `numbits`. When it is wider, the
/// unused high-order bits of every element must be zero; this is a caller
/// contract and is not checked per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementWidth {
    /// One byte per element. Fields up to 8 bits.
    U8,
    /// Two bytes per element, little-endian. Fields up to 16 bits.
    U16,
}

impl ElementWidth {
    /// Size of one element in bytes.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            ElementWidth::U8 => 1,
            ElementWidth::U16 => 2,
        }
    }

    /// Number of bits one element can hold.
    #[inline]
    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Smallest element width that fits the given field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFieldWidth`] for fields wider than 16
    /// bits, which have no vectorized element type here.
    pub fn for_field(field: &GaloisField) -> Result<Self, Error> {
        match field.numbits() {
            2..=8 => Ok(ElementWidth::U8),
            9..=16 => Ok(ElementWidth::U16),
            numbits => Err(Error::UnsupportedFieldWidth { numbits }),
        }
    }
}

/// A finite field GF(2^n), immutable after construction.
///
/// Memory for the lookup tables is proportional to `2^numbits`, so large
/// fields are expensive to build: a 16-bit field costs ~0.75 MiB of tables,
/// a 30-bit field several gigabytes. Build once per session and share.
///
/// Equality compares the defining parameters `(numbits, polynomial)` only.
pub struct GaloisField {
    numbits: u32,
    polynomial: u32,
    /// One bit higher than the highest representable value.
    overflow_mask: u32,
    /// Doubled: `exp[i]` is valid for `i < 2 * (overflow_mask - 1)`.
    exp: Vec<u32>,
    log: Vec<u32>,
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaloisField")
            .field("numbits", &self.numbits)
            .field("polynomial", &format_args!("0x{:x}", self.polynomial))
            .finish()
    }
}

impl PartialEq for GaloisField {
    fn eq(&self, other: &Self) -> bool {
        self.numbits == other.numbits && self.polynomial == other.polynomial
    }
}

impl Eq for GaloisField {}

impl GaloisField {
    /// Build a field from its size exponent and reduction polynomial.
    ///
    /// The polynomial is treated as equal to zero and must have its degree
    /// bit set (e.g. `0x11d` for the common 8-bit field). The generator is
    /// assumed to be 2.
    ///
    /// # Errors
    ///
    /// - [`Error::FieldSizeOutOfRange`] when `numbits` is outside 2..=30.
    /// - [`Error::InvalidPolynomialDegree`] when the polynomial's degree
    ///   does not match `numbits`.
    /// - [`Error::InvalidPolynomial`] when the polynomial is not primitive.
    pub fn new(numbits: u32, polynomial: u32) -> Result<Self, Error> {
        if !(2..=30).contains(&numbits) {
            return Err(Error::FieldSizeOutOfRange { numbits });
        }
        let overflow_mask = 1u32 << numbits;
        if polynomial & !(overflow_mask - 1) != overflow_mask {
            return Err(Error::InvalidPolynomialDegree {
                numbits,
                polynomial,
            });
        }

        let log_of_1 = overflow_mask - 1;
        let mut field = GaloisField {
            numbits,
            polynomial,
            overflow_mask,
            exp: vec![0; 2 * log_of_1 as usize],
            log: vec![0; overflow_mask as usize],
        };

        // Walk the powers of the generator, recording log/exp pairs. If the
        // value returns to 1 before every nonzero element has been visited,
        // or the cycle fails to close, the polynomial is not primitive.
        let mut value: u32 = 1;
        for power in 0..log_of_1 {
            if value == 1 && power != 0 {
                return Err(Error::InvalidPolynomial {
                    numbits,
                    polynomial,
                });
            }
            field.log[value as usize] = power;
            field.exp[power as usize] = value;
            value = field.multiply_without_lookup(value, 2);
        }
        if value != 1 {
            return Err(Error::InvalidPolynomial {
                numbits,
                polynomial,
            });
        }

        // Second copy so exp[log a + log b] works without a modulo.
        let (first, second) = field.exp.split_at_mut(log_of_1 as usize);
        second.copy_from_slice(first);

        Ok(field)
    }

    /// The field size exponent n of GF(2^n).
    #[inline]
    pub fn numbits(&self) -> u32 {
        self.numbits
    }

    /// The reduction polynomial.
    #[inline]
    pub fn polynomial(&self) -> u32 {
        self.polynomial
    }

    /// A value with only the overflow bit set: one higher than the highest
    /// bit of any field element. Also the number of distinct elements.
    #[inline]
    pub fn overflow_mask(&self) -> u32 {
        self.overflow_mask
    }

    /// The wraparound power: any nonzero element to this power is 1.
    #[inline]
    pub fn log_of_1(&self) -> u32 {
        self.overflow_mask - 1
    }

    /// Maximum number of erasure-coded blocks addressable in this field.
    #[inline]
    pub fn max_blocks(&self) -> usize {
        self.overflow_mask as usize
    }

    /// Field addition: XOR. Included for clarity at call sites that mirror
    /// the algebra.
    #[inline]
    pub fn add(&self, n1: u32, n2: u32) -> u32 {
        n1 ^ n2
    }

    /// Field negation: every element is its own additive inverse.
    #[inline]
    pub fn neg(&self, n: u32) -> u32 {
        n
    }

    /// Shift-and-reduce multiply, used only while building the tables.
    fn multiply_without_lookup(&self, mut n1: u32, mut n2: u32) -> u32 {
        let mut r = 0;
        while n1 != 0 {
            if n1 & 1 != 0 {
                r ^= n2;
            }
            n1 >>= 1;
            n2 <<= 1;
            if n2 & self.overflow_mask != 0 {
                n2 ^= self.polynomial;
            }
        }
        r
    }

    /// Field multiplication via the log/exp tables.
    #[inline]
    pub fn multiply(&self, n1: u32, n2: u32) -> u32 {
        if n1 == 0 || n2 == 0 {
            return 0;
        }
        self.exp[(self.log[n1 as usize] + self.log[n2 as usize]) as usize]
    }

    /// Raises `n` to the given power, with the conventions 0^0 = 1 and
    /// 0^p = 0 for p > 0.
    pub fn power(&self, n: u32, pow: u32) -> u32 {
        if n == 0 {
            return if pow == 0 { 1 } else { 0 };
        }
        let idx = (self.log[n as usize] as u64 * pow as u64) % self.log_of_1() as u64;
        self.exp[idx as usize]
    }

    /// The multiplicative inverse: the value `inv` such that `inv * n = 1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DivideByZero`] when `n` is 0.
    #[inline]
    pub fn mult_inverse(&self, n: u32) -> Result<u32, Error> {
        if n == 0 {
            return Err(Error::DivideByZero);
        }
        Ok(self.exp[(self.log_of_1() - self.log[n as usize]) as usize])
    }

    /// `buf[i] *= factor` for every element of the buffer.
    ///
    /// Elements are `width` bytes each (u16 elements little-endian); the
    /// buffer length must be a multiple of the element size and the width
    /// must fit `numbits`. A factor of 0 is a plain zero-fill.
    ///
    /// # Panics
    ///
    /// Panics on a width too small for the field or a buffer length that is
    /// not a multiple of the element size (logic errors in the caller).
    pub fn multiply_block(&self, buf: &mut [u8], factor: u32, width: ElementWidth) {
        assert!(
            self.numbits <= width.bits(),
            "element width too small for {} bit field",
            self.numbits
        );
        assert_eq!(
            buf.len() % width.bytes(),
            0,
            "buffer size not a multiple of element size"
        );

        if factor == 0 {
            buf.fill(0);
            return;
        }

        let factor_log = self.log[factor as usize];
        match width {
            ElementWidth::U8 => {
                for elem in buf.iter_mut() {
                    let n = *elem as u32;
                    if n == 0 {
                        continue;
                    }
                    *elem = self.exp[(self.log[n as usize] + factor_log) as usize] as u8;
                }
            }
            ElementWidth::U16 => {
                for chunk in buf.chunks_exact_mut(2) {
                    let n = u16::from_le_bytes([chunk[0], chunk[1]]) as u32;
                    if n == 0 {
                        continue;
                    }
                    let product = self.exp[(self.log[n as usize] + factor_log) as usize] as u16;
                    chunk.copy_from_slice(&product.to_le_bytes());
                }
            }
        }
    }

    /// `dest[i] += src[i] * factor` for every element, where `+` is XOR.
    ///
    /// This is the inner loop of both encode and decode: it applies one
    /// matrix coefficient across a whole block and folds the product into
    /// the accumulator buffer. A factor of 0 is a no-op.
    ///
    /// # Panics
    ///
    /// Panics on mismatched buffer lengths, a width too small for the
    /// field, or a length that is not a multiple of the element size.
    pub fn add_multiple_of_block(
        &self,
        dest: &mut [u8],
        src: &[u8],
        factor: u32,
        width: ElementWidth,
    ) {
        if factor == 0 {
            return;
        }
        assert!(
            self.numbits <= width.bits(),
            "element width too small for {} bit field",
            self.numbits
        );
        assert_eq!(dest.len(), src.len(), "mismatched buffer size");
        assert_eq!(
            dest.len() % width.bytes(),
            0,
            "buffer size not a multiple of element size"
        );

        let factor_log = self.log[factor as usize];
        match width {
            ElementWidth::U8 => {
                for (d, &s) in dest.iter_mut().zip(src.iter()) {
                    if s == 0 {
                        continue;
                    }
                    *d ^= self.exp[(self.log[s as usize] + factor_log) as usize] as u8;
                }
            }
            ElementWidth::U16 => {
                for (d, s) in dest.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                    let n = u16::from_le_bytes([s[0], s[1]]) as u32;
                    if n == 0 {
                        continue;
                    }
                    let product = self.exp[(self.log[n as usize] + factor_log) as usize] as u16;
                    let current = u16::from_le_bytes([d[0], d[1]]);
                    d.copy_from_slice(&(current ^ product).to_le_bytes());
                }
            }
        }
    }
}

// Primitive polynomials from the standard tables; the same ones every
// storage RS implementation settles on.
static GF4: LazyLock<Arc<GaloisField>> =
    LazyLock::new(|| Arc::new(GaloisField::new(4, 0x13).expect("gf4 polynomial is primitive")));
static GF8: LazyLock<Arc<GaloisField>> =
    LazyLock::new(|| Arc::new(GaloisField::new(8, 0x11d).expect("gf8 polynomial is primitive")));
static GF16: LazyLock<Arc<GaloisField>> = LazyLock::new(|| {
    Arc::new(GaloisField::new(16, 0x1100b).expect("gf16 polynomial is primitive"))
});

/// The process-wide 4-bit field GF(2^4), polynomial `0x13`.
pub fn gf4() -> Arc<GaloisField> {
    GF4.clone()
}

/// The process-wide 8-bit field GF(2^8), polynomial `0x11d`.
pub fn gf8() -> Arc<GaloisField> {
    GF8.clone()
}

/// The process-wide 16-bit field GF(2^16), polynomial `0x1100b`.
pub fn gf16() -> Arc<GaloisField> {
    GF16.clone()
}
