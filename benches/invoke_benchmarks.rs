//! Performance benchmarks for the marshaling and invocation layer.
//!
//! Measures the per-call overhead of the typed paths against the raw
//! generic-invoke surface:
//! - method thunk calls (POD argument and return)
//! - field invoker get/set
//! - internal-call dispatch from the managed side

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use clrbridge::prelude::*;
use clrbridge::{ManagedValue, register_pod_converter};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Vec2f {
    x: f32,
    y: f32,
}

register_pod_converter!(Vec2f, token = "Bench.Vector2f");

fn bench_domain() -> Domain {
    let registry = Arc::new(InternalCallRegistry::new());
    registry
        .bind(
            "Bench.Target::Native(single)",
            internal_call(|v: f32| v * 2.0),
        )
        .expect("bind");

    let domain = Domain::new("bench", registry);
    let class = ClassBuilder::new("Bench", "Target")
        .field("value", ManagedValue::boxed(Vec2f { x: 1.0, y: 2.0 }))
        .method("Scale(single)", MethodAttributes::empty(), |_, obj, args| {
            let obj = obj.expect("instance");
            let factor = args[0].as_float().unwrap_or(1.0) as f32;
            let v = *obj
                .field_raw("value")?
                .boxed_ref::<Vec2f>()
                .expect("vector field");
            Ok(ManagedValue::boxed(Vec2f {
                x: v.x * factor,
                y: v.y * factor,
            }))
        })
        .extern_method("Native(single)", MethodAttributes::STATIC)
        .build();
    domain
        .load(AssemblyBuilder::new("bench_managed").class(class).build())
        .expect("load");
    domain
}

fn bench_method_thunk(c: &mut Criterion) {
    let domain = bench_domain();
    let class = domain.class_by_full_name("Bench.Target").expect("class");
    let obj = class.new_instance().expect("instance");
    let thunk = make_method_invoker::<(f32,), Vec2f>(&class, "Scale").expect("thunk");

    c.bench_function("method_thunk_pod", |b| {
        b.iter(|| {
            let result = thunk.call(black_box(Some(&obj)), (black_box(2.0f32),));
            black_box(result.expect("call"))
        })
    });
}

fn bench_field_invoker(c: &mut Criterion) {
    let domain = bench_domain();
    let class = domain.class_by_full_name("Bench.Target").expect("class");
    let obj = class.new_instance().expect("instance");
    let field = make_field_invoker::<Vec2f>(class.field("value").expect("field"));

    c.bench_function("field_get", |b| {
        b.iter(|| black_box(field.get(black_box(&obj)).expect("get")))
    });

    c.bench_function("field_set_get", |b| {
        b.iter(|| {
            field
                .set(&obj, black_box(Vec2f { x: 3.0, y: 4.0 }))
                .expect("set");
            black_box(field.get(&obj).expect("get"))
        })
    });
}

fn bench_internal_call(c: &mut Criterion) {
    let domain = bench_domain();
    let class = domain.class_by_full_name("Bench.Target").expect("class");
    let native = class.method_by_desc("Native(single)").expect("method");

    c.bench_function("internal_call_dispatch", |b| {
        b.iter(|| {
            let result = native.invoke(None, black_box(&[ManagedValue::Float(21.0)]));
            black_box(result.expect("invoke"))
        })
    });
}

criterion_group!(
    benches,
    bench_method_thunk,
    bench_field_invoker,
    bench_internal_call
);
criterion_main!(benches);
