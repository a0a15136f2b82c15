use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_user(&pool, "Store Admin", "admin@example.com", "admin123", true).await?;
    let user_id = ensure_user(&pool, "Demo Shopper", "user@example.com", "user123", false).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, is_admin)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET is_admin = EXCLUDED.is_admin
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(is_admin)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (admin={is_admin})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price, category, image, stock, featured)
    let products = vec![
        (
            "Pro Training Jersey",
            "Breathable polyester jersey for daily training",
            799,
            "Sportswear",
            "/images/pro-training-jersey.jpg",
            60,
            true,
        ),
        (
            "Court Ace Sneakers",
            "Lightweight court shoes with cushioned sole",
            2499,
            "Footwear",
            "/images/court-ace-sneakers.jpg",
            35,
            true,
        ),
        (
            "Match Grade Cricket Bat",
            "English willow bat, full size",
            4999,
            "Equipment",
            "/images/match-grade-bat.jpg",
            12,
            false,
        ),
        (
            "Cast Iron Dumbbell 10kg",
            "Hex dumbbell with knurled grip",
            1199,
            "Gym",
            "/images/cast-iron-dumbbell.jpg",
            80,
            false,
        ),
        (
            "Whey Protein 1kg",
            "Chocolate whey protein concentrate",
            1599,
            "Nutrition",
            "/images/whey-protein.jpg",
            100,
            true,
        ),
        (
            "Skipping Rope",
            "Adjustable speed rope with ball bearings",
            299,
            "Gym",
            "/images/skipping-rope.jpg",
            150,
            false,
        ),
    ];

    for (name, desc, price, category, image_url, stock, featured) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, image_url, stock, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(i64::from(price))
        .bind(category)
        .bind(image_url)
        .bind(stock)
        .bind(featured)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
