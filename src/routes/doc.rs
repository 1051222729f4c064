use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, SignUpRequest},
        cart::{CartLineQuantity, CartLineView, CartView, Direction},
        items::{CreateItemRequest, ItemList, UpdateItemRequest},
        orders::{CheckoutRedirect, OrderList, OrderWithItems},
        users::{ChangePasswordRequest, EditProfileRequest},
    },
    models::{Category, Item, Order, OrderLine, Unit, User},
    response::{ApiResponse, Meta, Notice},
    routes::{admin, auth, cart, catalog, checkout, health, orders, params, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::sign_up,
        auth::login,
        auth::logout,
        catalog::list_items,
        catalog::list_syrups,
        catalog::list_hot_sauces,
        catalog::list_jams,
        catalog::get_item,
        profile::profile,
        profile::edit_profile,
        profile::change_password,
        admin::add_item,
        admin::edit_item,
        admin::delete_item,
        cart::view_cart,
        cart::add_to_cart,
        checkout::create_checkout_session,
        checkout::success,
        checkout::cancel,
        checkout::cart_empty,
        orders::list_orders,
        orders::get_order
    ),
    components(
        schemas(
            User,
            Item,
            Category,
            Unit,
            Order,
            OrderLine,
            SignUpRequest,
            LoginRequest,
            LoginResponse,
            EditProfileRequest,
            ChangePasswordRequest,
            CreateItemRequest,
            UpdateItemRequest,
            ItemList,
            Direction,
            CartLineQuantity,
            CartLineView,
            CartView,
            CheckoutRedirect,
            OrderList,
            OrderWithItems,
            checkout::SessionQuery,
            params::Pagination,
            params::ItemQuery,
            Meta,
            Notice,
            ApiResponse<Item>,
            ApiResponse<ItemList>,
            ApiResponse<User>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Notice>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Catalog", description = "Browse syrups, hot sauces and jams"),
        (name = "Auth", description = "Sign up, login and logout"),
        (name = "Profile", description = "Profile and password management"),
        (name = "Admin", description = "Catalog administration"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Hosted checkout and callbacks"),
        (name = "Orders", description = "Order history"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
