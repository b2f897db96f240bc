//! Test fixtures and fakes shared by the scenario tests of the other crates.
//!
//! Nothing here touches the network or a real database.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ords_schemas::{Delivery, Item, Order, Payment};

mod mem_store;

pub use mem_store::MemOrderStore;

/// Creation time used by [`sample_order`]: 2021-11-26T06:22:19Z.
pub fn sample_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19)
        .single()
        .unwrap_or_default()
}

/// A fully populated order that passes validation.
pub fn sample_order(order_uid: &str) -> Order {
    sample_order_at(order_uid, sample_created_at())
}

/// Same as [`sample_order`] with an explicit `date_created`.
pub fn sample_order_at(order_uid: &str, date_created: DateTime<Utc>) -> Order {
    let track = "WBILMTESTTRACK".to_string();
    Order {
        order_uid: order_uid.to_string(),
        track_number: track.clone(),
        entry: "WBIL".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: order_uid.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number: track,
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shard_key: "9".to_string(),
        sm_id: 99,
        date_created: Some(date_created),
        oof_shard: "1".to_string(),
    }
}

/// `count` sample orders `"{prefix}-0" .. "{prefix}-{count-1}"`, each created
/// one minute after the previous one.
pub fn sample_orders(prefix: &str, count: usize) -> Vec<Order> {
    let base = sample_created_at();
    (0..count)
        .map(|i| {
            let minutes = i64::try_from(i).unwrap_or(i64::MAX);
            sample_order_at(&format!("{prefix}-{i}"), base + Duration::minutes(minutes))
        })
        .collect()
}

/// Wire bytes of `order`, as a producer would publish them.
pub fn order_payload(order: &Order) -> Vec<u8> {
    serde_json::to_vec(order).unwrap_or_default()
}
