use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{OrderLine, Product};

/// Storefront headline numbers for one vendor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VendorStats {
    pub total_sales: Decimal,
    pub total_orders: u64,
    pub total_views: u64,
    /// Orders per view; 0 when the vendor's products were never viewed.
    pub conversion_rate: f64,
}

/// Fold a vendor's product catalog and order lines into headline stats.
/// A vendor with zero orders yields zero sales, zero orders, the view sum,
/// and a conversion rate of exactly 0.
pub fn calculate_vendor_stats(products: &[Product], lines: &[OrderLine]) -> VendorStats {
    let total_sales: Decimal = lines.iter().map(OrderLine::amount).sum();

    let mut order_ids: Vec<_> = lines.iter().map(|line| line.order_id).collect();
    order_ids.sort_unstable();
    order_ids.dedup();
    let total_orders = order_ids.len() as u64;

    let total_views: u64 = products.iter().map(|product| product.total_views).sum();
    let conversion_rate =
        if total_views == 0 { 0.0 } else { total_orders as f64 / total_views as f64 };

    VendorStats { total_sales, total_orders, total_views, conversion_rate }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::{OrderId, ProductId, UserId, VendorId};

    use super::*;

    fn product(id: i64, views: u64) -> Product {
        Product {
            id: ProductId(id),
            vendor_id: VendorId(1),
            name: format!("product {id}"),
            description: String::new(),
            price: Decimal::new(999, 2),
            categories: Vec::new(),
            total_views: views,
        }
    }

    fn line(order: i64, cents: i64, quantity: u32) -> OrderLine {
        OrderLine {
            order_id: OrderId(order),
            product_id: ProductId(1),
            user_id: UserId(1),
            quantity,
            unit_price: Decimal::new(cents, 2),
            placed_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn vendor_with_zero_orders_gets_zeroed_stats_but_summed_views() {
        let stats = calculate_vendor_stats(&[product(1, 40), product(2, 60)], &[]);
        assert_eq!(stats.total_sales, Decimal::ZERO);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_views, 100);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[test]
    fn conversion_guards_division_by_zero_views() {
        let stats = calculate_vendor_stats(&[product(1, 0)], &[line(1, 1_000, 1)]);
        assert_eq!(stats.conversion_rate, 0.0);
        assert_eq!(stats.total_orders, 1);
    }

    #[test]
    fn lines_of_one_order_count_once() {
        let stats = calculate_vendor_stats(
            &[product(1, 10)],
            &[line(1, 1_000, 2), line(1, 500, 1), line(2, 1_000, 1)],
        );
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_sales, Decimal::new(3_500, 2));
        assert!((stats.conversion_rate - 0.2).abs() < 1e-12);
    }
}
