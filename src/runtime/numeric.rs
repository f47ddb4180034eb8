//! Numeric operator semantics over untyped stack cells.

use super::Trap;
use crate::ir::NumericOp;

#[inline]
fn i32_of(cell: u64) -> i32 {
    cell as u32 as i32
}

#[inline]
fn u32_of(cell: u64) -> u32 {
    cell as u32
}

#[inline]
fn f64_of(cell: u64) -> f64 {
    f64::from_bits(cell)
}

#[inline]
fn from_i32(v: i32) -> u64 {
    u64::from(v as u32)
}

#[inline]
fn from_bool(v: bool) -> u64 {
    u64::from(v)
}

#[inline]
fn from_f64(v: f64) -> u64 {
    v.to_bits()
}

fn fmin(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        // -0.0 is smaller than +0.0
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else {
        a.min(b)
    }
}

fn fmax(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else {
        a.max(b)
    }
}

/// Truncate toward zero, trapping on NaN and on results outside
/// `(lower, upper)`, both exclusive.
fn trunc(v: f64, lower: f64, upper: f64) -> Result<f64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversion);
    }
    let t = v.trunc();
    if t <= lower || t >= upper {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t)
}

fn div_s<T>(a: T, b: T, checked: impl Fn(T, T) -> Option<T>, zero: T) -> Result<T, Trap>
where
    T: PartialEq + Copy,
{
    if b == zero {
        return Err(Trap::IntegerDivideByZero);
    }
    checked(a, b).ok_or(Trap::IntegerOverflow)
}

/// Apply `op` to its operands. Unary operators ignore `b`.
pub(crate) fn apply(op: NumericOp, a: u64, b: u64) -> Result<u64, Trap> {
    use NumericOp::*;

    let (ia, ib) = (i32_of(a), i32_of(b));
    let (ua, ub) = (u32_of(a), u32_of(b));
    let (la, lb) = (a as i64, b as i64);
    let (fa, fb) = (f64_of(a), f64_of(b));

    let cell = match op {
        I32Eqz => from_bool(ia == 0),
        I32Eq => from_bool(ia == ib),
        I32Ne => from_bool(ia != ib),
        I32LtS => from_bool(ia < ib),
        I32LtU => from_bool(ua < ub),
        I32GtS => from_bool(ia > ib),
        I32GtU => from_bool(ua > ub),
        I32LeS => from_bool(ia <= ib),
        I32LeU => from_bool(ua <= ub),
        I32GeS => from_bool(ia >= ib),
        I32GeU => from_bool(ua >= ub),

        I64Eqz => from_bool(a == 0),
        I64Eq => from_bool(a == b),
        I64Ne => from_bool(a != b),
        I64LtS => from_bool(la < lb),
        I64LtU => from_bool(a < b),
        I64GtS => from_bool(la > lb),
        I64GtU => from_bool(a > b),
        I64LeS => from_bool(la <= lb),
        I64LeU => from_bool(a <= b),
        I64GeS => from_bool(la >= lb),
        I64GeU => from_bool(a >= b),

        F64Eq => from_bool(fa == fb),
        F64Ne => from_bool(fa != fb),
        F64Lt => from_bool(fa < fb),
        F64Gt => from_bool(fa > fb),
        F64Le => from_bool(fa <= fb),
        F64Ge => from_bool(fa >= fb),

        I32Clz => u64::from(ua.leading_zeros()),
        I32Ctz => u64::from(ua.trailing_zeros()),
        I32Popcnt => u64::from(ua.count_ones()),
        I32Add => from_i32(ia.wrapping_add(ib)),
        I32Sub => from_i32(ia.wrapping_sub(ib)),
        I32Mul => from_i32(ia.wrapping_mul(ib)),
        I32DivS => from_i32(div_s(ia, ib, i32::checked_div, 0)?),
        I32DivU => u64::from(ua.checked_div(ub).ok_or(Trap::IntegerDivideByZero)?),
        I32RemS => {
            if ib == 0 {
                return Err(Trap::IntegerDivideByZero);
            }
            from_i32(ia.wrapping_rem(ib))
        }
        I32RemU => u64::from(ua.checked_rem(ub).ok_or(Trap::IntegerDivideByZero)?),
        I32And => u64::from(ua & ub),
        I32Or => u64::from(ua | ub),
        I32Xor => u64::from(ua ^ ub),
        I32Shl => u64::from(ua.wrapping_shl(ub)),
        I32ShrS => from_i32(ia.wrapping_shr(ub)),
        I32ShrU => u64::from(ua.wrapping_shr(ub)),
        I32Rotl => u64::from(ua.rotate_left(ub % 32)),
        I32Rotr => u64::from(ua.rotate_right(ub % 32)),

        I64Clz => u64::from(a.leading_zeros()),
        I64Ctz => u64::from(a.trailing_zeros()),
        I64Popcnt => u64::from(a.count_ones()),
        I64Add => a.wrapping_add(b),
        I64Sub => a.wrapping_sub(b),
        I64Mul => a.wrapping_mul(b),
        I64DivS => div_s(la, lb, i64::checked_div, 0)? as u64,
        I64DivU => a.checked_div(b).ok_or(Trap::IntegerDivideByZero)?,
        I64RemS => {
            if lb == 0 {
                return Err(Trap::IntegerDivideByZero);
            }
            la.wrapping_rem(lb) as u64
        }
        I64RemU => a.checked_rem(b).ok_or(Trap::IntegerDivideByZero)?,
        I64And => a & b,
        I64Or => a | b,
        I64Xor => a ^ b,
        I64Shl => a.wrapping_shl(b as u32),
        I64ShrS => la.wrapping_shr(b as u32) as u64,
        I64ShrU => a.wrapping_shr(b as u32),
        I64Rotl => a.rotate_left((b % 64) as u32),
        I64Rotr => a.rotate_right((b % 64) as u32),

        F64Abs => a & !(1 << 63),
        F64Neg => a ^ (1 << 63),
        F64Ceil => from_f64(fa.ceil()),
        F64Floor => from_f64(fa.floor()),
        F64Trunc => from_f64(fa.trunc()),
        F64Nearest => from_f64(fa.round_ties_even()),
        F64Sqrt => from_f64(fa.sqrt()),
        F64Add => from_f64(fa + fb),
        F64Sub => from_f64(fa - fb),
        F64Mul => from_f64(fa * fb),
        F64Div => from_f64(fa / fb),
        F64Min => from_f64(fmin(fa, fb)),
        F64Max => from_f64(fmax(fa, fb)),
        F64Copysign => (a & !(1 << 63)) | (b & (1 << 63)),

        I32WrapI64 => u64::from(a as u32),
        I32TruncF64S => from_i32(trunc(fa, -2_147_483_649.0, 2_147_483_648.0)? as i32),
        I32TruncF64U => u64::from(trunc(fa, -1.0, 4_294_967_296.0)? as u32),
        I64ExtendI32S => i64::from(ia) as u64,
        I64ExtendI32U => u64::from(ua),
        I64TruncF64S => trunc(fa, -9_223_372_036_854_777_856.0, 9_223_372_036_854_775_808.0)? as i64 as u64,
        I64TruncF64U => trunc(fa, -1.0, 18_446_744_073_709_551_616.0)? as u64,
        F64ConvertI32S => from_f64(f64::from(ia)),
        F64ConvertI32U => from_f64(f64::from(ua)),
        F64ConvertI64S => from_f64(la as f64),
        F64ConvertI64U => from_f64(a as f64),
        I64ReinterpretF64 | F64ReinterpretI64 => a,
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_op(op: NumericOp, a: i32, b: i32) -> Result<i32, Trap> {
        apply(op, from_i32(a), from_i32(b)).map(i32_of)
    }

    fn f64_op(op: NumericOp, a: f64, b: f64) -> f64 {
        f64_of(apply(op, from_f64(a), from_f64(b)).unwrap())
    }

    #[test]
    fn test_integer_traps() {
        assert_eq!(i32_op(NumericOp::I32DivS, 7, 0), Err(Trap::IntegerDivideByZero));
        assert_eq!(i32_op(NumericOp::I32DivS, i32::MIN, -1), Err(Trap::IntegerOverflow));
        assert_eq!(i32_op(NumericOp::I32RemS, i32::MIN, -1), Ok(0));
        assert_eq!(i32_op(NumericOp::I32DivU, -1, 2), Ok(i32::MAX));
        assert_eq!(apply(NumericOp::I64RemU, 5, 0), Err(Trap::IntegerDivideByZero));
    }

    #[test]
    fn test_wrapping_and_shifts() {
        assert_eq!(i32_op(NumericOp::I32Add, i32::MAX, 1), Ok(i32::MIN));
        assert_eq!(i32_op(NumericOp::I32Shl, 1, 33), Ok(2));
        assert_eq!(i32_op(NumericOp::I32ShrS, -8, 1), Ok(-4));
        assert_eq!(i32_op(NumericOp::I32ShrU, -8, 28), Ok(15));
        assert_eq!(i32_op(NumericOp::I32Rotl, i32::MIN, 1), Ok(1));
        assert_eq!(apply(NumericOp::I64Shl, 1, 67), Ok(8));
        // i32 results stay zero-extended in their cell
        assert_eq!(apply(NumericOp::I32Sub, 0, 1), Ok(0xFFFF_FFFF));
    }

    #[test]
    fn test_float_semantics() {
        assert_eq!(f64_op(NumericOp::F64Mul, 2.0, 3.0), 6.0);
        assert!(f64_op(NumericOp::F64Min, f64::NAN, 1.0).is_nan());
        assert!(f64_op(NumericOp::F64Min, -0.0, 0.0).is_sign_negative());
        assert!(f64_op(NumericOp::F64Max, -0.0, 0.0).is_sign_positive());
        assert_eq!(f64_op(NumericOp::F64Nearest, 2.5, 0.0), 2.0);
        assert_eq!(f64_op(NumericOp::F64Copysign, 3.0, -0.0), -3.0);
        assert_eq!(f64_op(NumericOp::F64Neg, 0.0, 0.0).to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn test_conversions() {
        let trunc_s = |v: f64| apply(NumericOp::I32TruncF64S, from_f64(v), 0).map(i32_of);
        assert_eq!(trunc_s(-2.9), Ok(-2));
        assert_eq!(trunc_s(-2_147_483_648.9), Ok(i32::MIN));
        assert_eq!(trunc_s(2_147_483_648.0), Err(Trap::IntegerOverflow));
        assert_eq!(trunc_s(f64::NAN), Err(Trap::InvalidConversion));

        let trunc_u = |v: f64| apply(NumericOp::I64TruncF64U, from_f64(v), 0);
        assert_eq!(trunc_u(-0.9), Ok(0));
        assert_eq!(trunc_u(-1.0), Err(Trap::IntegerOverflow));
        assert_eq!(trunc_u(f64::INFINITY), Err(Trap::IntegerOverflow));

        assert_eq!(apply(NumericOp::I64ExtendI32S, from_i32(-1), 0), Ok(u64::MAX));
        assert_eq!(apply(NumericOp::I64ExtendI32U, from_i32(-1), 0), Ok(0xFFFF_FFFF));
        assert_eq!(
            f64_of(apply(NumericOp::F64ConvertI32U, from_i32(-1), 0).unwrap()),
            4_294_967_295.0
        );
    }
}
