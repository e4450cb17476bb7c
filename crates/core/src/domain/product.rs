use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VendorId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Category names, in catalog order.
    pub categories: Vec<String>,
    /// Monotonically non-decreasing view counter, maintained by the storefront.
    pub total_views: u64,
}

/// Stock levels for one product. Mutated by the storefront on purchase and
/// cart reservation; read-only from the analytics side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub product_id: ProductId,
    pub current_stock: u32,
    pub safety_stock_level: u32,
    pub reorder_point: u32,
}

impl Inventory {
    /// True when stock has fallen to or below the reorder point.
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_point
    }
}
