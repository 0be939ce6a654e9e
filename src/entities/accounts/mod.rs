pub mod address;
pub mod user;
pub mod user_profile;

pub use address::{AddressType, Entity as Address, Model as AddressModel};
pub use user::{Entity as User, Model as UserModel};
pub use user_profile::{Entity as UserProfile, Model as UserProfileModel};
