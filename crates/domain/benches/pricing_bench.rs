use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartLine, Money, Voucher, VoucherCode, price_cart};

fn make_cart(lines: usize) -> Vec<CartLine> {
    (0..lines)
        .map(|i| {
            CartLine::new(
                format!("SKU-{i:04}"),
                Money::from_cents(995 + i as i64),
                (i % 5 + 1) as u32,
            )
        })
        .collect()
}

fn make_voucher() -> Voucher {
    let now = Utc::now();
    Voucher {
        code: VoucherCode::new("BENCH10"),
        discount_percent: 10,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        min_order_amount: Money::zero(),
        max_usage: None,
        current_usage: 0,
    }
}

fn bench_price_cart(c: &mut Criterion) {
    let cart = make_cart(20);

    c.bench_function("pricing/price_cart_20_lines", |b| {
        b.iter(|| price_cart(&cart, None).unwrap());
    });
}

fn bench_price_cart_with_voucher(c: &mut Criterion) {
    let cart = make_cart(20);
    let voucher = make_voucher();

    c.bench_function("pricing/price_cart_20_lines_voucher", |b| {
        b.iter(|| price_cart(&cart, Some(&voucher)).unwrap());
    });
}

criterion_group!(benches, bench_price_cart, bench_price_cart_with_voucher);
criterion_main!(benches);
