//! Numeric operator table.
//!
//! Numeric operators carry no immediates and have fixed operand and result
//! types, so they are described by data rather than by one instruction variant
//! each. The table below is the single source for the text name, the binary
//! opcode and the operand count the interpreter pops.

use super::types::ValType;

const I32: ValType = ValType::I32;
const I64: ValType = ValType::I64;
const F64: ValType = ValType::F64;

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub code: u8,
    pub params: &'static [ValType],
}

macro_rules! numeric_ops {
    ($($variant:ident => $name:literal, $code:literal, [$($param:ident),*];)*) => {
        /// Operators without immediates.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NumericOp {
            $($variant,)*
        }

        impl NumericOp {
            pub const ALL: &'static [NumericOp] = &[$(NumericOp::$variant,)*];

            pub const fn info(self) -> OpInfo {
                match self {
                    $(NumericOp::$variant => OpInfo {
                        name: $name,
                        code: $code,
                        params: &[$($param),*],
                    },)*
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(NumericOp::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

numeric_ops! {
    I32Eqz => "i32.eqz", 0x45, [I32];
    I32Eq => "i32.eq", 0x46, [I32, I32];
    I32Ne => "i32.ne", 0x47, [I32, I32];
    I32LtS => "i32.lt_s", 0x48, [I32, I32];
    I32LtU => "i32.lt_u", 0x49, [I32, I32];
    I32GtS => "i32.gt_s", 0x4A, [I32, I32];
    I32GtU => "i32.gt_u", 0x4B, [I32, I32];
    I32LeS => "i32.le_s", 0x4C, [I32, I32];
    I32LeU => "i32.le_u", 0x4D, [I32, I32];
    I32GeS => "i32.ge_s", 0x4E, [I32, I32];
    I32GeU => "i32.ge_u", 0x4F, [I32, I32];

    I64Eqz => "i64.eqz", 0x50, [I64];
    I64Eq => "i64.eq", 0x51, [I64, I64];
    I64Ne => "i64.ne", 0x52, [I64, I64];
    I64LtS => "i64.lt_s", 0x53, [I64, I64];
    I64LtU => "i64.lt_u", 0x54, [I64, I64];
    I64GtS => "i64.gt_s", 0x55, [I64, I64];
    I64GtU => "i64.gt_u", 0x56, [I64, I64];
    I64LeS => "i64.le_s", 0x57, [I64, I64];
    I64LeU => "i64.le_u", 0x58, [I64, I64];
    I64GeS => "i64.ge_s", 0x59, [I64, I64];
    I64GeU => "i64.ge_u", 0x5A, [I64, I64];

    F64Eq => "f64.eq", 0x61, [F64, F64];
    F64Ne => "f64.ne", 0x62, [F64, F64];
    F64Lt => "f64.lt", 0x63, [F64, F64];
    F64Gt => "f64.gt", 0x64, [F64, F64];
    F64Le => "f64.le", 0x65, [F64, F64];
    F64Ge => "f64.ge", 0x66, [F64, F64];

    I32Clz => "i32.clz", 0x67, [I32];
    I32Ctz => "i32.ctz", 0x68, [I32];
    I32Popcnt => "i32.popcnt", 0x69, [I32];
    I32Add => "i32.add", 0x6A, [I32, I32];
    I32Sub => "i32.sub", 0x6B, [I32, I32];
    I32Mul => "i32.mul", 0x6C, [I32, I32];
    I32DivS => "i32.div_s", 0x6D, [I32, I32];
    I32DivU => "i32.div_u", 0x6E, [I32, I32];
    I32RemS => "i32.rem_s", 0x6F, [I32, I32];
    I32RemU => "i32.rem_u", 0x70, [I32, I32];
    I32And => "i32.and", 0x71, [I32, I32];
    I32Or => "i32.or", 0x72, [I32, I32];
    I32Xor => "i32.xor", 0x73, [I32, I32];
    I32Shl => "i32.shl", 0x74, [I32, I32];
    I32ShrS => "i32.shr_s", 0x75, [I32, I32];
    I32ShrU => "i32.shr_u", 0x76, [I32, I32];
    I32Rotl => "i32.rotl", 0x77, [I32, I32];
    I32Rotr => "i32.rotr", 0x78, [I32, I32];

    I64Clz => "i64.clz", 0x79, [I64];
    I64Ctz => "i64.ctz", 0x7A, [I64];
    I64Popcnt => "i64.popcnt", 0x7B, [I64];
    I64Add => "i64.add", 0x7C, [I64, I64];
    I64Sub => "i64.sub", 0x7D, [I64, I64];
    I64Mul => "i64.mul", 0x7E, [I64, I64];
    I64DivS => "i64.div_s", 0x7F, [I64, I64];
    I64DivU => "i64.div_u", 0x80, [I64, I64];
    I64RemS => "i64.rem_s", 0x81, [I64, I64];
    I64RemU => "i64.rem_u", 0x82, [I64, I64];
    I64And => "i64.and", 0x83, [I64, I64];
    I64Or => "i64.or", 0x84, [I64, I64];
    I64Xor => "i64.xor", 0x85, [I64, I64];
    I64Shl => "i64.shl", 0x86, [I64, I64];
    I64ShrS => "i64.shr_s", 0x87, [I64, I64];
    I64ShrU => "i64.shr_u", 0x88, [I64, I64];
    I64Rotl => "i64.rotl", 0x89, [I64, I64];
    I64Rotr => "i64.rotr", 0x8A, [I64, I64];

    F64Abs => "f64.abs", 0x99, [F64];
    F64Neg => "f64.neg", 0x9A, [F64];
    F64Ceil => "f64.ceil", 0x9B, [F64];
    F64Floor => "f64.floor", 0x9C, [F64];
    F64Trunc => "f64.trunc", 0x9D, [F64];
    F64Nearest => "f64.nearest", 0x9E, [F64];
    F64Sqrt => "f64.sqrt", 0x9F, [F64];
    F64Add => "f64.add", 0xA0, [F64, F64];
    F64Sub => "f64.sub", 0xA1, [F64, F64];
    F64Mul => "f64.mul", 0xA2, [F64, F64];
    F64Div => "f64.div", 0xA3, [F64, F64];
    F64Min => "f64.min", 0xA4, [F64, F64];
    F64Max => "f64.max", 0xA5, [F64, F64];
    F64Copysign => "f64.copysign", 0xA6, [F64, F64];

    I32WrapI64 => "i32.wrap_i64", 0xA7, [I64];
    I32TruncF64S => "i32.trunc_f64_s", 0xAA, [F64];
    I32TruncF64U => "i32.trunc_f64_u", 0xAB, [F64];
    I64ExtendI32S => "i64.extend_i32_s", 0xAC, [I32];
    I64ExtendI32U => "i64.extend_i32_u", 0xAD, [I32];
    I64TruncF64S => "i64.trunc_f64_s", 0xB0, [F64];
    I64TruncF64U => "i64.trunc_f64_u", 0xB1, [F64];
    F64ConvertI32S => "f64.convert_i32_s", 0xB7, [I32];
    F64ConvertI32U => "f64.convert_i32_u", 0xB8, [I32];
    F64ConvertI64S => "f64.convert_i64_s", 0xB9, [I64];
    F64ConvertI64U => "f64.convert_i64_u", 0xBA, [I64];
    I64ReinterpretF64 => "i64.reinterpret_f64", 0xBD, [F64];
    F64ReinterpretI64 => "f64.reinterpret_i64", 0xBF, [I64];
}
