pub mod category;
pub mod product;
pub mod product_image;
pub mod product_size;
pub mod size;

pub use category::{Entity as Category, Model as CategoryModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_size::{Entity as ProductSize, Model as ProductSizeModel};
pub use size::{Entity as Size, Model as SizeModel, SizeType};
