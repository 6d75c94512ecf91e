//! Throughput benchmarks for the register's hot paths.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use mostrador_audit::InMemoryAuditSink;
use mostrador_auth::StaticCapabilityGate;
use mostrador_catalog::Product;
use mostrador_core::{Money, OperatorId, PaymentMethod, PaymentTender, ProductId, SystemClock};
use mostrador_infra::{
    CheckoutLine, InMemoryCustomerDirectory, InMemoryProductStore, OpContext, Register,
    RegisterConfig, StockRepository,
};

fn setup() -> (Register, ProductId, OpContext) {
    mostrador_observability::init();

    let products = Arc::new(InMemoryProductStore::new());
    let product = Product::new(
        ProductId::new(),
        1,
        "bench part",
        Money::from_major(10),
        Money::from_major(25),
        i64::MAX / 2,
        10,
    )
    .unwrap();
    let product_id = product.id;
    products.upsert(product).unwrap();

    let register = Register::new(
        RegisterConfig::default(),
        Arc::new(SystemClock),
        products,
        Arc::new(InMemoryCustomerDirectory::new()),
        Arc::new(StaticCapabilityGate::new()),
        Arc::new(InMemoryAuditSink::new()),
    )
    .unwrap();

    (register, product_id, OpContext::for_operator(OperatorId::new()))
}

fn bench_checkout(c: &mut Criterion) {
    let (register, product_id, ctx) = setup();
    let lines = [CheckoutLine {
        product_id,
        quantity: 1,
    }];

    c.bench_function("checkout_single_line", |b| {
        b.iter(|| {
            register
                .checkout(
                    &ctx,
                    None,
                    &lines,
                    None,
                    PaymentTender::new(PaymentMethod::Cash),
                    None,
                )
                .unwrap()
        })
    });
}

fn bench_ticket_lifecycle(c: &mut Criterion) {
    let (register, product_id, ctx) = setup();

    c.bench_function("ticket_create_add_finalize", |b| {
        b.iter(|| {
            let ticket = register.create_ticket(&ctx, None, None).unwrap();
            register.add_ticket_line(ticket.id(), product_id, 2).unwrap();
            register
                .finalize_ticket(&ctx, ticket.id(), PaymentTender::new(PaymentMethod::Cash))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_checkout, bench_ticket_lifecycle);
criterion_main!(benches);
