use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        contact::ContactRequest,
        orders::{CardDetails, CheckoutRequest, OrderList, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        users::{SaveAddressRequest, UserList},
    },
    models::{
        Address, Category, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Product,
        ShippingAddress, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, contact, health, orders, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::logout,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        users::save_address,
        contact::send_message,
        admin::list_all_orders,
        admin::update_order_status,
        admin::list_users
    ),
    components(
        schemas(
            User,
            Address,
            Product,
            Category,
            Order,
            OrderItem,
            ShippingAddress,
            PaymentMethod,
            PaymentStatus,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CheckoutRequest,
            CardDetails,
            OrderList,
            UpdateOrderStatusRequest,
            SaveAddressRequest,
            UserList,
            ContactRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::UserListQuery,
            health::HealthData,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<UserList>
        )
    ),
    security(
        ("session_cookie" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and session endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Users", description = "Profile endpoints"),
        (name = "Contact", description = "Contact form endpoint"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
