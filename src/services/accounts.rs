use crate::{
    auth::{hash_password, verify_password},
    entities::accounts::{
        address, user, user_profile, Address, AddressModel, AddressType, User, UserModel,
        UserProfile, UserProfileModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_COUNTRY: &str = "India";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    /// Username or email
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub is_staff: bool,
    pub profile: UserProfileModel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[serde(default = "default_address_type")]
    pub address_type: AddressType,
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 5, max = 15, message = "Enter a valid phone number"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255, message = "Address line 1 is required"))]
    pub address_line1: String,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn default_address_type() -> AddressType {
    AddressType::Shipping
}

/// Shipping form values suggested at checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutPrefill {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Users, profiles and saved addresses
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates the user and its empty profile.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        input.validate()?;
        if input.password != input.password2 {
            return Err(ServiceError::ValidationError(
                "Password fields didn't match.".to_string(),
            ));
        }

        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();

        let txn = self.db.begin().await?;
        let taken = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Email.eq(email.clone()))
                    .add(user::Column::Username.eq(username.clone())),
            )
            .one(&txn)
            .await?;
        if let Some(existing) = taken {
            let field = if existing.email == email {
                "email"
            } else {
                "username"
            };
            return Err(ServiceError::Conflict(format!(
                "A user with that {} already exists.",
                field
            )));
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            username: Set(username),
            password_hash: Set(hash_password(&input.password)?),
            first_name: Set(input.first_name.trim().to_string()),
            last_name: Set(input.last_name.trim().to_string()),
            is_staff: Set(false),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        user_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            phone: Set(None),
            address: Set(None),
            city: Set(None),
            state: Set(None),
            postal_code: Set(None),
            country: Set(DEFAULT_COUNTRY.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Checks credentials. `username` may also be the account email.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<UserModel, ServiceError> {
        input.validate()?;
        let login = input.username.trim();

        let user = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login.to_lowercase())),
            )
            .one(&*self.db)
            .await?;

        let user = match user {
            Some(u) if verify_password(&input.password, &u.password_hash) => u,
            _ => {
                debug!("login rejected");
                return Err(ServiceError::Unauthorized(
                    "Unable to log in with provided credentials.".to_string(),
                ));
            }
        };
        if !user.is_active {
            return Err(ServiceError::Forbidden("User account is disabled.".to_string()));
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileView, ServiceError> {
        let user = self.get_user(user_id).await?;
        let profile = Self::profile_for(&*self.db, user_id).await?;
        Ok(Self::view(user, profile))
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<ProfileView, ServiceError> {
        update.validate()?;
        let txn = self.db.begin().await?;

        let user = User::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        let user = if update.first_name.is_some() || update.last_name.is_some() {
            let mut active: user::ActiveModel = user.into();
            if let Some(first) = update.first_name {
                active.first_name = Set(first.trim().to_string());
            }
            if let Some(last) = update.last_name {
                active.last_name = Set(last.trim().to_string());
            }
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?
        } else {
            user
        };

        let profile = Self::profile_for(&txn, user_id).await?;
        let mut active: user_profile::ActiveModel = profile.into();
        if let Some(phone) = update.phone {
            active.phone = Set(non_empty(phone));
        }
        if let Some(address) = update.address {
            active.address = Set(non_empty(address));
        }
        if let Some(city) = update.city {
            active.city = Set(non_empty(city));
        }
        if let Some(state) = update.state {
            active.state = Set(non_empty(state));
        }
        if let Some(postal_code) = update.postal_code {
            active.postal_code = Set(non_empty(postal_code));
        }
        if let Some(country) = update.country.and_then(non_empty) {
            active.country = Set(country);
        }
        active.updated_at = Set(Utc::now());
        let profile = active.update(&txn).await?;

        txn.commit().await?;
        Ok(Self::view(user, profile))
    }

    /// Marks the account as staff so its next token carries the admin role.
    #[instrument(skip(self))]
    pub async fn grant_admin(&self, email: &str) -> Result<UserModel, ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No user with email {}", email)))?;
        let mut active: user::ActiveModel = user.into();
        active.is_staff = Set(true);
        active.updated_at = Set(Utc::now());
        let user = active.update(&*self.db).await?;
        info!(user_id = %user.id, "Granted admin role");
        Ok(user)
    }

    // ----- addresses -----

    /// Default addresses first, then newest.
    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<AddressModel>, ServiceError> {
        Ok(Address::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        Self::owned_address(&*self.db, user_id, address_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;

        if input.is_default {
            Self::clear_default(&txn, user_id, input.address_type, None).await?;
        }
        let now = Utc::now();
        let address = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            address_type: Set(input.address_type),
            full_name: Set(input.full_name.trim().to_string()),
            phone: Set(input.phone.trim().to_string()),
            address_line1: Set(input.address_line1.trim().to_string()),
            address_line2: Set(input.address_line2.and_then(non_empty)),
            city: Set(input.city.trim().to_string()),
            state: Set(input.state.trim().to_string()),
            postal_code: Set(input.postal_code.trim().to_string()),
            country: Set(input
                .country
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
            is_default: Set(input.is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        Self::sync_default_shipping_to_profile(&txn, user_id).await?;
        txn.commit().await?;
        info!(address_id = %address.id, "Address created");
        Ok(address)
    }

    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let existing = Self::owned_address(&txn, user_id, address_id).await?;

        if input.is_default {
            Self::clear_default(&txn, user_id, input.address_type, Some(address_id)).await?;
        }
        let mut active: address::ActiveModel = existing.into();
        active.address_type = Set(input.address_type);
        active.full_name = Set(input.full_name.trim().to_string());
        active.phone = Set(input.phone.trim().to_string());
        active.address_line1 = Set(input.address_line1.trim().to_string());
        active.address_line2 = Set(input.address_line2.and_then(non_empty));
        active.city = Set(input.city.trim().to_string());
        active.state = Set(input.state.trim().to_string());
        active.postal_code = Set(input.postal_code.trim().to_string());
        active.country = Set(input
            .country
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()));
        active.is_default = Set(input.is_default);
        active.updated_at = Set(Utc::now());
        let address = active.update(&txn).await?;

        Self::sync_default_shipping_to_profile(&txn, user_id).await?;
        txn.commit().await?;
        Ok(address)
    }

    #[instrument(skip(self))]
    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        Self::owned_address(&txn, user_id, address_id).await?;
        Address::delete_by_id(address_id).exec(&txn).await?;
        Self::sync_default_shipping_to_profile(&txn, user_id).await?;
        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_default_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Self::owned_address(&txn, user_id, address_id).await?;
        Self::clear_default(&txn, user_id, existing.address_type, Some(address_id)).await?;

        let mut active: address::ActiveModel = existing.into();
        active.is_default = Set(true);
        active.updated_at = Set(Utc::now());
        let address = active.update(&txn).await?;

        Self::sync_default_shipping_to_profile(&txn, user_id).await?;
        txn.commit().await?;
        Ok(address)
    }

    /// Copies the most recently updated default shipping address onto the profile.
    ///
    /// Leaves the profile untouched when the user has no default shipping address.
    /// The phone number is only copied when the address has one.
    pub async fn sync_default_shipping_to_profile<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let default_shipping = Address::find()
            .filter(address::Column::UserId.eq(user_id))
            .filter(address::Column::AddressType.eq(AddressType::Shipping))
            .filter(address::Column::IsDefault.eq(true))
            .order_by_desc(address::Column::UpdatedAt)
            .order_by_desc(address::Column::CreatedAt)
            .one(db)
            .await?;
        let Some(shipping) = default_shipping else {
            return Ok(());
        };

        let Some(profile) = UserProfile::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(db)
            .await?
        else {
            warn!(user_id = %user_id, "no profile to sync default shipping address into");
            return Ok(());
        };

        let mut active: user_profile::ActiveModel = profile.into();
        active.address = Set(Some(shipping.street()));
        active.city = Set(Some(shipping.city.clone()));
        active.state = Set(Some(shipping.state.clone()));
        active.postal_code = Set(Some(shipping.postal_code.clone()));
        active.country = Set(shipping.country.clone());
        if !shipping.phone.trim().is_empty() {
            active.phone = Set(Some(shipping.phone.clone()));
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        debug!(user_id = %user_id, address_id = %shipping.id, "Profile synced from default shipping address");
        Ok(())
    }

    /// Shipping form values from the profile and account.
    #[instrument(skip(self))]
    pub async fn checkout_prefill(&self, user_id: Uuid) -> Result<CheckoutPrefill, ServiceError> {
        let user = self.get_user(user_id).await?;
        let profile = UserProfile::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;

        let mut prefill = CheckoutPrefill {
            full_name: user.full_name(),
            email: user.email.clone(),
            country: "IN".to_string(),
            ..Default::default()
        };
        if let Some(p) = profile {
            prefill.phone = p.phone.unwrap_or_default();
            prefill.address = p.address.unwrap_or_default();
            prefill.city = p.city.unwrap_or_default();
            prefill.state = p.state.unwrap_or_default();
            prefill.zip_code = p.postal_code.unwrap_or_default();
            if !p.country.trim().is_empty() {
                prefill.country = p.country;
            }
        }
        Ok(prefill)
    }

    async fn profile_for<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<UserProfileModel, ServiceError> {
        if let Some(profile) = UserProfile::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(profile);
        }
        // Accounts created outside `register` (e.g. seeded staff) get a profile lazily.
        let now = Utc::now();
        Ok(user_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            phone: Set(None),
            address: Set(None),
            city: Set(None),
            state: Set(None),
            postal_code: Set(None),
            country: Set(DEFAULT_COUNTRY.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    async fn owned_address<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        Address::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))
    }

    async fn clear_default<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        address_type: AddressType,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut update = Address::update_many()
            .col_expr(address::Column::IsDefault, Expr::value(false))
            .filter(address::Column::UserId.eq(user_id))
            .filter(address::Column::AddressType.eq(address_type))
            .filter(address::Column::IsDefault.eq(true));
        if let Some(id) = except {
            update = update.filter(address::Column::Id.ne(id));
        }
        update.exec(db).await?;
        Ok(())
    }

    fn view(user: UserModel, profile: UserProfileModel) -> ProfileView {
        ProfileView {
            id: user.id,
            full_name: user.full_name(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            profile,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
