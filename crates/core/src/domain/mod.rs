pub mod customer;
pub mod interaction;
pub mod order;
pub mod product;
pub mod review;

pub use customer::{CustomerProfile, Gender, UserId};
pub use interaction::{Interaction, InteractionKind};
pub use order::{Order, OrderId, OrderLine, OrderStatus};
pub use product::{Inventory, Product, ProductId, VendorId};
pub use review::{Review, ReviewId, SentimentLabel};
