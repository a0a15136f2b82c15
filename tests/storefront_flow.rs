use std::sync::Arc;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        contact::ContactRequest,
        orders::{CheckoutRequest, OrderListParams, UpdateOrderStatusRequest},
        products::CreateProductRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    mailer::{Mailer, RecordingMailer},
    middleware::auth::AuthUser,
    models::{Category, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress},
    routes::params::{OrderListQuery, Pagination, ProductQuery, ProductSortBy},
    services::{admin_service, auth_service, contact_service, order_service, product_service},
    state::AppState,
};

// End to end over the service layer: register/login, admin builds the
// catalog, shopper filters it and checks out, admin walks the order through
// its status machine. Mirrors a browsing session rather than isolated calls.
#[tokio::test]
async fn register_browse_checkout_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let recorder = Arc::new(RecordingMailer::new());
    let state = setup_state(&database_url, recorder.clone()).await?;

    // --- registration ---
    let (shopper, token) = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Asha".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
        },
    )
    .await?;
    assert!(!token.is_empty());
    assert!(!shopper.is_admin);

    // Duplicate email is rejected case-insensitively.
    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Asha Again".into(),
            email: "  A@X.Com ".into(),
            password: "secret2".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    // --- login ---
    auth_service::login_user(
        &state,
        LoginRequest {
            email: "a@x.com".into(),
            password: "secret1".into(),
        },
    )
    .await?;

    // Wrong password and unknown email fail identically.
    let wrong_password = auth_service::login_user(
        &state,
        LoginRequest {
            email: "a@x.com".into(),
            password: "wrong".into(),
        },
    )
    .await
    .unwrap_err();
    let unknown_email = auth_service::login_user(
        &state,
        LoginRequest {
            email: "nobody@x.com".into(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());

    // --- catalog (admin side) ---
    let admin_id = create_admin(&state, "admin@x.com").await?;
    let auth_admin = AuthUser {
        user_id: admin_id,
        is_admin: true,
    };
    let auth_shopper = AuthUser {
        user_id: shopper.id,
        is_admin: false,
    };

    let mut created = Vec::new();
    for (name, price, category, featured) in [
        ("Running Tee", 150_i64, Category::Sportswear, false),
        ("Yoga Mat", 450, Category::Gym, true),
        ("Wrist Band", 120, Category::Sportswear, false),
        ("Trail Shoes", 2800, Category::Footwear, true),
        ("Protein Bar Box", 300, Category::Nutrition, false),
    ] {
        let resp = product_service::create_product(
            &state,
            &auth_admin,
            CreateProductRequest {
                name: name.into(),
                description: format!("{name} for everyday training"),
                long_description: None,
                price,
                category,
                image_url: format!("/images/{}.jpg", name.to_lowercase().replace(' ', "-")),
                stock: 25,
                rating: 4.0,
                reviews: 10,
                discount: 0,
                featured,
            },
        )
        .await?;
        created.push(resp.data.unwrap());
    }

    // A shopper must not create products.
    let forbidden = product_service::create_product(
        &state,
        &auth_shopper,
        CreateProductRequest {
            name: "Bootleg Item".into(),
            description: "should never exist".into(),
            long_description: None,
            price: 1,
            category: Category::Equipment,
            image_url: String::new(),
            stock: 1,
            rating: 0.0,
            reviews: 0,
            discount: 0,
            featured: false,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // --- catalog (shopper side) ---
    let in_range = product_service::list_products(
        &state,
        ProductQuery {
            search: None,
            categories: None,
            min_price: Some(100),
            max_price: Some(200),
            featured: None,
            limit: None,
            sort_by: None,
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert!(!in_range.is_empty());
    assert!(in_range.iter().all(|p| (100..=200).contains(&p.price)));

    let by_price = product_service::list_products(
        &state,
        ProductQuery {
            search: None,
            categories: None,
            min_price: None,
            max_price: None,
            featured: None,
            limit: None,
            sort_by: Some(ProductSortBy::PriceAsc),
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert!(by_price.windows(2).all(|w| w[0].price <= w[1].price));

    let sportswear = product_service::list_products(
        &state,
        ProductQuery {
            search: None,
            categories: Some("Sportswear".into()),
            min_price: None,
            max_price: None,
            featured: None,
            limit: None,
            sort_by: None,
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(sportswear.len(), 2);
    assert!(sportswear.iter().all(|p| p.category == Category::Sportswear));

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            search: Some("yoga".into()),
            categories: None,
            min_price: None,
            max_price: None,
            featured: None,
            limit: None,
            sort_by: None,
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].name, "Yoga Mat");

    // --- checkout ---
    let tee = created.iter().find(|p| p.name == "Running Tee").unwrap();
    let mat = created.iter().find(|p| p.name == "Yoga Mat").unwrap();

    // Subtotal 600 clears the free-shipping threshold.
    let order = order_service::create_order(
        &state,
        &auth_shopper,
        CheckoutRequest {
            items: vec![OrderItem {
                product_id: tee.id,
                name: tee.name.clone(),
                price: 300,
                quantity: 2,
            }],
            shipping_address: shipping_address(),
            payment_method: PaymentMethod::Cod,
            total_amount: 600,
            card: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_amount, 600);
    assert_eq!(order.order_status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);

    // Subtotal 450 pays the flat 50 fee.
    let small_order = order_service::create_order(
        &state,
        &auth_shopper,
        CheckoutRequest {
            items: vec![OrderItem {
                product_id: mat.id,
                name: mat.name.clone(),
                price: 450,
                quantity: 1,
            }],
            shipping_address: shipping_address(),
            payment_method: PaymentMethod::Cod,
            total_amount: 500,
            card: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(small_order.total_amount, 500);

    // A 5-digit pincode fails validation.
    let mut bad_address = shipping_address();
    bad_address.pincode = "12345".into();
    let rejected = order_service::create_order(
        &state,
        &auth_shopper,
        CheckoutRequest {
            items: vec![OrderItem {
                product_id: tee.id,
                name: tee.name.clone(),
                price: 300,
                quantity: 2,
            }],
            shipping_address: bad_address,
            payment_method: PaymentMethod::Cod,
            total_amount: 600,
            card: None,
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));

    // Checkout copied the shipping address onto the profile (best effort).
    let profile = auth_service::current_user(&state, shopper.id).await?;
    assert_eq!(profile.phone, "9876543210");
    assert_eq!(profile.address.pincode, "411001");

    // --- order reads ---
    let my_orders = order_service::list_orders(
        &state,
        &auth_shopper,
        OrderListParams { user_id: None },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(my_orders.len(), 2);
    assert!(my_orders
        .iter()
        .all(|o| o.order_status == OrderStatus::Processing));

    // A shopper cannot read someone else's orders by user_id.
    let foreign = order_service::list_orders(
        &state,
        &auth_shopper,
        OrderListParams {
            user_id: Some(admin_id),
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    // But an admin can.
    let seen_by_admin = order_service::list_orders(
        &state,
        &auth_admin,
        OrderListParams {
            user_id: Some(shopper.id),
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(seen_by_admin.len(), 2);

    let fetched = order_service::get_order(&state, &auth_shopper, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.total_amount, 600);

    let hidden = order_service::get_order(&state, &auth_admin, Uuid::new_v4()).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    // --- status machine ---
    let shipped = admin_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.order_status, OrderStatus::Shipped);

    // Shipped orders cannot be cancelled or rewound.
    let illegal = admin_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
        },
    )
    .await;
    assert!(matches!(illegal, Err(AppError::BadRequest(_))));

    let delivered = admin_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(delivered.order_status, OrderStatus::Delivered);

    // Delivered is terminal.
    let terminal = admin_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Processing,
        },
    )
    .await;
    assert!(matches!(terminal, Err(AppError::BadRequest(_))));

    // A non-admin cannot touch the status at all.
    let not_admin = admin_service::update_order_status(
        &state,
        &auth_shopper,
        small_order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    // --- admin listings ---
    let all_orders = admin_service::list_all_orders(
        &state,
        &auth_admin,
        OrderListQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(20),
            },
            status: Some(OrderStatus::Processing),
            sort_order: None,
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(all_orders.len(), 1);
    assert_eq!(all_orders[0].id, small_order.id);

    // --- contact form ---
    contact_service::send_contact_message(
        &state,
        ContactRequest {
            name: "Asha".into(),
            email: "a@x.com".into(),
            phone: None,
            subject: Some("Delivery".into()),
            message: "When does my order arrive?".into(),
        },
    )
    .await?;
    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Contact form: Delivery");

    Ok(())
}

fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(),
        email: "a@x.com".into(),
        phone: "9876543210".into(),
        address: "12 MG Road".into(),
        city: "Pune".into(),
        state: "Maharashtra".into(),
        pincode: "411001".into(),
    }
}

async fn setup_state(database_url: &str, mailer: Arc<dyn Mailer>) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    let pool = create_pool(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-test-secret".into(),
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        mail_from: "Storefront <noreply@storefront.local>".into(),
        contact_inbox: "owner@storefront.local".into(),
    };

    Ok(AppState {
        pool,
        orm,
        config,
        mailer,
    })
}

async fn create_admin(state: &AppState, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("Admin".into()),
        email: Set(email.to_string()),
        password_hash: Set(auth_service::hash_password("admin123")?),
        phone: Set(String::new()),
        address_line1: Set(String::new()),
        address_city: Set(String::new()),
        address_state: Set(String::new()),
        address_pincode: Set(String::new()),
        is_admin: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
