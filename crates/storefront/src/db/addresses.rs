//! Address repository.
//!
//! Maintains the one-default-per-(owner, type) invariant in both
//! directions, inside one transaction per mutation: a row that becomes
//! default clears its siblings, and a default that is demoted, deleted, or
//! moved to another type group hands the flag to the oldest sibling left
//! behind. A populated group therefore always has exactly one default, with
//! no lost update between concurrent tabs.

use sqlx::PgPool;

use copperleaf_core::{AddressId, AddressType, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressPatch, NewAddress};

const ADDRESS_COLUMNS: &str = "id, user_id, address_type, is_default, first_name, last_name, \
     line1, line2, city, province, postal_code, country_code, phone, created_at, updated_at";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(address)
    }

    /// List a user's addresses in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Create an address for a user.
    ///
    /// The first address of its type automatically becomes the default;
    /// an explicit `is_default` clears any existing sibling default in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM addresses WHERE user_id = $1 AND address_type = $2)",
        )
        .bind(user_id)
        .bind(new.address_type)
        .fetch_one(&mut *tx)
        .await?;

        let is_default = new.is_default || !has_existing;
        if is_default {
            clear_sibling_defaults(&mut tx, user_id, new.address_type, None).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses \
                 (user_id, address_type, is_default, first_name, last_name, \
                  line1, line2, city, province, postal_code, country_code, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(new.address_type)
        .bind(is_default)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.line1)
        .bind(&new.line2)
        .bind(&new.city)
        .bind(&new.province)
        .bind(&new.postal_code)
        .bind(&new.country_code)
        .bind(&new.phone)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Apply a partial update to an address.
    ///
    /// The row is locked for the duration so the default invariant holds
    /// under concurrent edits. A row that ends up default clears its
    /// siblings; demoting the current default promotes the oldest sibling
    /// instead (the only address of its type keeps the flag). Moving to
    /// another type group promotes a replacement in the old group, and the
    /// first address of the new group becomes its default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: AddressId,
        patch: &AddressPatch,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let address_type = patch.address_type.unwrap_or(current.address_type);
        let mut is_default = patch.is_default.unwrap_or(current.is_default);

        // Promotion of an orphaned group's replacement default must wait
        // until after this row is rewritten, or the partial unique index
        // would see two defaults mid-transaction.
        let mut promote_in: Option<AddressType> = None;

        if address_type == current.address_type {
            if current.is_default && !is_default {
                if has_sibling(&mut tx, current.user_id, address_type, id).await? {
                    promote_in = Some(address_type);
                } else {
                    // The only address of its type keeps the flag
                    is_default = true;
                }
            }
        } else {
            if current.is_default {
                promote_in = Some(current.address_type);
            }
            let new_group_populated =
                has_sibling(&mut tx, current.user_id, address_type, id).await?;
            is_default = patch.is_default.unwrap_or(false) || !new_group_populated;
        }

        if is_default {
            clear_sibling_defaults(&mut tx, current.user_id, address_type, Some(id)).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses SET \
                 address_type = $2, is_default = $3, first_name = $4, last_name = $5, \
                 line1 = $6, line2 = $7, city = $8, province = $9, postal_code = $10, \
                 country_code = $11, phone = $12, updated_at = now() \
             WHERE id = $1 \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(address_type)
        .bind(is_default)
        .bind(patch.first_name.as_ref().unwrap_or(&current.first_name))
        .bind(patch.last_name.as_ref().unwrap_or(&current.last_name))
        .bind(patch.line1.as_ref().unwrap_or(&current.line1))
        .bind(patch.line2.as_ref().or(current.line2.as_ref()))
        .bind(patch.city.as_ref().unwrap_or(&current.city))
        .bind(patch.province.as_ref().unwrap_or(&current.province))
        .bind(patch.postal_code.as_ref().unwrap_or(&current.postal_code))
        .bind(patch.country_code.as_ref().unwrap_or(&current.country_code))
        .bind(patch.phone.as_ref().or(current.phone.as_ref()))
        .fetch_one(&mut *tx)
        .await?;

        if let Some(group) = promote_in {
            promote_oldest_sibling(&mut tx, current.user_id, group, id).await?;
        }

        tx.commit().await?;
        Ok(address)
    }

    /// Make an address its owner's default for its type.
    ///
    /// Clearing the previous default and setting the new one happen in one
    /// transaction: both succeed or neither does.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_default(&self, id: AddressId) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        clear_sibling_defaults(&mut tx, current.user_id, current.address_type, Some(id)).await?;

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses SET is_default = TRUE, updated_at = now() \
             WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address.
    ///
    /// Deleting the default of a still-populated group promotes the oldest
    /// remaining sibling in the same transaction.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn delete(&self, id: AddressId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, (UserId, AddressType, bool)>(
            "DELETE FROM addresses WHERE id = $1 \
             RETURNING user_id, address_type, is_default",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, address_type, was_default)) = deleted else {
            return Ok(false);
        };
        if was_default {
            promote_oldest_sibling(&mut tx, user_id, address_type, id).await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Whether the (owner, type) group holds any row other than `except`.
async fn has_sibling(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    address_type: AddressType,
    except: AddressId,
) -> Result<bool, RepositoryError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM addresses \
         WHERE user_id = $1 AND address_type = $2 AND id <> $3)",
    )
    .bind(user_id)
    .bind(address_type)
    .bind(except)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

/// Hand the default flag to the oldest sibling of the given (owner, type)
/// group, skipping `except`. No-op when the group has no sibling left.
async fn promote_oldest_sibling(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    address_type: AddressType,
    except: AddressId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE addresses SET is_default = TRUE, updated_at = now() \
         WHERE id = (SELECT id FROM addresses \
                     WHERE user_id = $1 AND address_type = $2 AND id <> $3 \
                     ORDER BY created_at ASC, id ASC LIMIT 1)",
    )
    .bind(user_id)
    .bind(address_type)
    .bind(except)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Clear `is_default` on every sibling of the given (owner, type) group.
async fn clear_sibling_defaults(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    address_type: AddressType,
    except: Option<AddressId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE, updated_at = now() \
         WHERE user_id = $1 AND address_type = $2 AND is_default AND ($3::INTEGER IS NULL OR id <> $3)",
    )
    .bind(user_id)
    .bind(address_type)
    .bind(except)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
