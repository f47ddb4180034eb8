//! Test the compiled polynomial kernel against its contract.
//!
//! `kernel/polynomial.wat` is compiled once with the real pipeline, and every
//! test runs the binary in the interpreter against the Rust reference model.

use polykernel::bridge::{BridgeError, PolynomialHost};
use polykernel::core::EncodeOptions;
use polykernel::ir::{ExportKind, Limits};
use polykernel::kernel::{self, COEFFICIENT_SIZE};
use polykernel::pipeline;
use polykernel::runtime::{Instance, Module, RuntimeError, Trap, Value};
use proptest::collection::vec;
use proptest::prelude::*;
use std::sync::{Arc, OnceLock};
use std::thread;

fn kernel_module() -> Arc<Module> {
    static MODULE: OnceLock<Arc<Module>> = OnceLock::new();
    let module = MODULE.get_or_init(|| {
        let bytes = pipeline::compile(kernel::SOURCE, &EncodeOptions::default()).unwrap();
        Arc::new(Module::from_binary(&bytes).unwrap())
    });
    Arc::clone(module)
}

/// Any finite value, weighted towards magnitudes that keep Horner finite.
fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        3 => -1e3f64..1e3,
        1 => prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO,
    ]
}

/// Write coefficients at `offset` and call `evaluate` directly on an instance.
fn invoke(instance: &mut Instance, coefficients: &[f64], offset: u32, x: f64) -> Result<f64, RuntimeError> {
    let memory = instance.memory_mut().unwrap();
    memory
        .write(u64::from(offset), &kernel::encode_coefficients(coefficients))
        .unwrap();
    let args = [
        Value::I32(coefficients.len() as i32),
        Value::I32(offset as i32),
        Value::F64(x),
    ];
    match instance.invoke(kernel::EVALUATE_EXPORT, &args)? {
        Some(Value::F64(v)) => Ok(v),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_kernel_exports() {
    let _ = env_logger::builder().is_test(true).try_init();

    let module = kernel_module();
    let ir = module.ir();
    assert_eq!(ir.memory, Some(Limits { min: 1, max: Some(kernel::MAX_MEMORY_PAGES) }));
    assert_eq!(module.export_type("evaluate"), Some(&kernel::evaluate_signature()));
    assert!(module.exports_memory("memory"));

    // Only the evaluator and the memory are exported.
    let kinds: Vec<_> = ir.exports.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(kinds, vec![("memory", ExportKind::Memory(0)), ("evaluate", ExportKind::Func(0))]);
}

#[test]
fn test_documented_examples() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut host = PolynomialHost::new(kernel_module()).unwrap();
    // 2x^2 + 0x - 1 at 3: ((2*3 + 0)*3 - 1)
    assert_eq!(host.evaluate(&[2.0, 0.0, -1.0], 3.0), Ok(17.0));
    for x in [-1e300, -2.5, 0.0, 1.0, 7.0, f64::MAX] {
        assert_eq!(host.evaluate(&[1.0], x), Ok(1.0), "constant at {x}");
    }
}

#[test]
fn test_zero_count_is_zero() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut instance = Instance::new(kernel_module()).unwrap();
    for x in [0.0, -3.0, 1e308, f64::INFINITY, f64::NAN] {
        assert_eq!(invoke(&mut instance, &[], 0, x).unwrap().to_bits(), 0.0f64.to_bits());
        assert_eq!(invoke(&mut instance, &[], 65_536, x).unwrap(), 0.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn test_matches_reference_bit_for_bit(
        coefficients in vec(finite_f64(), 0..32),
        x in -100.0f64..100.0,
        offset in 0u32..64,
    ) {
        let mut instance = Instance::new(kernel_module()).unwrap();
        let got = invoke(&mut instance, &coefficients, offset, x).unwrap();

        let mut memory = vec![0u8; offset as usize];
        memory.extend(kernel::encode_coefficients(&coefficients));
        let expected = kernel::evaluate(&memory, coefficients.len() as u32, offset, x).unwrap();
        prop_assert_eq!(got.to_bits(), expected.to_bits(), "{:?} at {}", coefficients, x);

        // Same left-to-right accumulation written out by hand.
        let horner = coefficients
            .split_first()
            .map_or(0.0, |(first, rest)| rest.iter().fold(*first, |acc, c| acc * x + c));
        prop_assert_eq!(got.to_bits(), horner.to_bits());
    }

    #[test]
    fn test_overrun_always_traps(count in any::<u32>(), offset in any::<u32>()) {
        let size = 65_536u64;
        prop_assume!(u64::from(offset) + u64::from(count) * COEFFICIENT_SIZE as u64 > size);

        let mut instance = Instance::new(kernel_module()).unwrap();
        let args = [Value::I32(count as i32), Value::I32(offset as i32), Value::F64(1.0)];
        let err = instance.invoke(kernel::EVALUATE_EXPORT, &args).unwrap_err();
        prop_assert_eq!(err, RuntimeError::Trap(Trap::Unreachable));
        prop_assert!(instance.is_poisoned());

        // The reference model agrees that the request does not fit.
        let memory = vec![0u8; size as usize];
        prop_assert_eq!(kernel::evaluate(&memory, count, offset, 1.0), Err(Trap::MemoryOutOfBounds));
    }
}

#[test]
fn test_out_of_bounds_edges() {
    let _ = env_logger::builder().is_test(true).try_init();

    let module = kernel_module();
    let size = 65_536u32;
    let cases = [
        (1, size),                   // starts at the end
        (1, size - 7),               // straddles the end
        (8193, 0),                   // one coefficient too many
        (0, size + 1),               // empty, but past the end
        (u32::MAX, 0),               // count * 8 would wrap in 32 bits
        (2, u32::MAX - 7),           // offset + count * 8 would wrap
    ];

    for (count, offset) in cases {
        let mut instance = Instance::new(Arc::clone(&module)).unwrap();
        let args = [Value::I32(count as i32), Value::I32(offset as i32), Value::F64(1.0)];
        let err = instance.invoke("evaluate", &args).unwrap_err();
        assert_eq!(err, RuntimeError::Trap(Trap::Unreachable), "count {count} offset {offset}");
        assert!(instance.is_poisoned());
    }
    println!("✅ {} boundary requests trapped", cases.len());
}

#[test]
fn test_fills_memory_exactly() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut instance = Instance::new(kernel_module()).unwrap();
    let count = 65_536 / COEFFICIENT_SIZE;
    let coefficients = vec![0.5; count];
    assert_eq!(invoke(&mut instance, &coefficients, 0, 0.0), Ok(0.5));
}

#[test]
fn test_bridge_recovers_after_trap() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut host = PolynomialHost::new(kernel_module()).unwrap();
    assert_eq!(host.evaluate_raw(2, 65_536 - 8, 0.0), Err(BridgeError::Trap(Trap::Unreachable)));
    assert_eq!(host.evaluate(&[1.0, 2.0, 3.0], 10.0), Ok(123.0));
    assert_eq!(host.instantiations(), 2);
}

#[test]
fn test_concurrent_hosts_share_nothing() {
    let _ = env_logger::builder().is_test(true).try_init();

    let module = kernel_module();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let module = Arc::clone(&module);
            thread::spawn(move || {
                let mut host = PolynomialHost::new(module).unwrap();
                let mut results = Vec::new();
                for i in 0..50 {
                    // Each worker uses its own coefficients; any sharing would mix them.
                    let c = f64::from(worker * 1000 + i);
                    results.push(host.evaluate(&[1.0, c], 2.0).unwrap());
                }
                results
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let results = handle.join().unwrap();
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result, 2.0 + (worker * 1000 + i) as f64);
        }
    }
}
