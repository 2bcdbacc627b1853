//! Repository tests for the address default invariant.
//!
//! Each test runs in its own database created by the sqlx test harness from
//! `DATABASE_URL`, with this crate's migrations applied. They are ignored by
//! default so the unit suite stays database-free; run them against a local
//! `PostgreSQL` with:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/copperleaf_test \
//!     cargo test -p copperleaf-storefront --test addresses -- --ignored
//! ```

use sqlx::PgPool;

use copperleaf_core::{AddressType, UserId};
use copperleaf_storefront::db::{AddressRepository, RepositoryError};
use copperleaf_storefront::models::{AddressPatch, NewAddress};

const OWNER: UserId = UserId::new(1);

fn shipping_address(line1: &str) -> NewAddress {
    NewAddress {
        address_type: AddressType::Shipping,
        is_default: false,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        line1: line1.to_string(),
        line2: None,
        city: "Lima".to_string(),
        province: "Lima".to_string(),
        postal_code: "15001".to_string(),
        country_code: "PE".to_string(),
        phone: None,
    }
}

/// Number of default rows in the (owner, type) group.
async fn default_count(pool: &PgPool, owner: UserId, address_type: AddressType) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM addresses \
         WHERE user_id = $1 AND address_type = $2 AND is_default",
    )
    .bind(owner)
    .bind(address_type)
    .fetch_one(pool)
    .await
    .expect("count query failed")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn first_address_of_a_type_becomes_default(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");
    assert!(first.is_default);

    let second = repo
        .create(OWNER, &shipping_address("2 Second St"))
        .await
        .expect("create failed");
    assert!(!second.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn set_default_clears_the_previous_default(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");
    let second = repo
        .create(OWNER, &shipping_address("2 Second St"))
        .await
        .expect("create failed");

    let promoted = repo.set_default(second.id).await.expect("set_default failed");
    assert!(promoted.is_default);

    let demoted = repo
        .get(first.id)
        .await
        .expect("get failed")
        .expect("address vanished");
    assert!(!demoted.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn demoting_the_default_promotes_the_oldest_sibling(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");
    let second = repo
        .create(OWNER, &shipping_address("2 Second St"))
        .await
        .expect("create failed");

    let patch = AddressPatch {
        is_default: Some(false),
        ..AddressPatch::default()
    };
    let updated = repo.update(first.id, &patch).await.expect("update failed");
    assert!(!updated.is_default);

    let sibling = repo
        .get(second.id)
        .await
        .expect("get failed")
        .expect("address vanished");
    assert!(sibling.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn demoting_the_only_address_keeps_its_default(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let only = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");

    let patch = AddressPatch {
        is_default: Some(false),
        ..AddressPatch::default()
    };
    let updated = repo.update(only.id, &patch).await.expect("update failed");
    assert!(updated.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn deleting_the_default_promotes_a_replacement(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");
    let second = repo
        .create(OWNER, &shipping_address("2 Second St"))
        .await
        .expect("create failed");

    assert!(repo.delete(first.id).await.expect("delete failed"));

    let survivor = repo
        .get(second.id)
        .await
        .expect("get failed")
        .expect("address vanished");
    assert!(survivor.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn moving_the_default_to_another_type_heals_both_groups(pool: PgPool) {
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(OWNER, &shipping_address("1 First St"))
        .await
        .expect("create failed");
    let second = repo
        .create(OWNER, &shipping_address("2 Second St"))
        .await
        .expect("create failed");

    let patch = AddressPatch {
        address_type: Some(AddressType::Billing),
        ..AddressPatch::default()
    };
    let moved = repo.update(first.id, &patch).await.expect("update failed");

    // First of the billing group, so it becomes its default; the shipping
    // group hands its flag to the remaining sibling.
    assert_eq!(moved.address_type, AddressType::Billing);
    assert!(moved.is_default);
    let survivor = repo
        .get(second.id)
        .await
        .expect("get failed")
        .expect("address vanished");
    assert!(survivor.is_default);
    assert_eq!(default_count(&pool, OWNER, AddressType::Shipping).await, 1);
    assert_eq!(default_count(&pool, OWNER, AddressType::Billing).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn missing_address_reads_and_updates(pool: PgPool) {
    let repo = AddressRepository::new(&pool);
    let missing = copperleaf_core::AddressId::new(999_999);

    assert!(repo.get(missing).await.expect("get failed").is_none());
    assert!(matches!(
        repo.update(missing, &AddressPatch::default()).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(!repo.delete(missing).await.expect("delete failed"));
}
