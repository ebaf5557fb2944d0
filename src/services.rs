//! Thin wrappers for the storefront's domain endpoints.
//!
//! Each service borrows the [`Client`] and maps one method to one endpoint; all
//! behavior (CSRF, retry, refresh, errors) comes from [`Client::execute`].

use crate::{Client, RequestOptions, Result};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;

impl Client {
    /// Authentication endpoints under `/api/auth/`.
    pub fn auth(&self) -> AuthService<'_> {
        AuthService { client: self }
    }

    /// Product catalog endpoints under `/api/catalog/`.
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService { client: self }
    }

    /// Shopping cart endpoints under `/api/cart/`.
    pub fn cart(&self) -> CartService<'_> {
        CartService { client: self }
    }

    /// Order endpoints under `/api/orders/`.
    pub fn orders(&self) -> OrderService<'_> {
        OrderService { client: self }
    }

    /// Stock endpoints under `/api/stock/`.
    pub fn stock(&self) -> StockService<'_> {
        StockService { client: self }
    }

    /// Analytics endpoints under `/api/analytics/`.
    pub fn analytics(&self) -> AnalyticsService<'_> {
        AnalyticsService { client: self }
    }

    /// Notification endpoints under `/api/notifications/`.
    pub fn notifications(&self) -> NotificationService<'_> {
        NotificationService { client: self }
    }

    async fn fetch(&self, method: Method, path: &str) -> Result<Value> {
        let response = self.execute(path, RequestOptions::new(method)).await?;
        Ok(response.data)
    }

    async fn submit<B>(&self, method: Method, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let options = RequestOptions::new(method).with_json(body)?;
        let response = self.execute(path, options).await?;
        Ok(response.data)
    }
}

fn segment(id: impl Display) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}

/// Authentication endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AuthService<'a> {
    client: &'a Client,
}

impl AuthService<'_> {
    /// `POST /api/auth/login`
    pub async fn login<B: Serialize + ?Sized>(&self, credentials: &B) -> Result<Value> {
        self.client
            .submit(Method::POST, "/api/auth/login", credentials)
            .await
    }

    /// `POST /api/auth/register`
    pub async fn register<B: Serialize + ?Sized>(&self, user: &B) -> Result<Value> {
        self.client
            .submit(Method::POST, "/api/auth/register", user)
            .await
    }

    /// `POST /api/auth/logout`
    pub async fn logout(&self) -> Result<Value> {
        self.client.fetch(Method::POST, "/api/auth/logout").await
    }

    /// `POST /api/auth/refresh`, as an ordinary request.
    ///
    /// This goes through the full engine; the coordinated refresh used on 401 is
    /// [`Client::refresh_session`].
    pub async fn refresh(&self) -> Result<Value> {
        self.client.fetch(Method::POST, "/api/auth/refresh").await
    }

    /// `GET /api/auth/me`
    pub async fn me(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/auth/me").await
    }
}

/// Product catalog endpoints.
#[derive(Debug, Clone, Copy)]
pub struct CatalogService<'a> {
    client: &'a Client,
}

impl CatalogService<'_> {
    /// `GET /api/catalog/`
    pub async fn list(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/catalog/").await
    }

    /// `GET /api/catalog/{id}`
    pub async fn get(&self, id: impl Display) -> Result<Value> {
        let path = format!("/api/catalog/{}", segment(id));
        self.client.fetch(Method::GET, &path).await
    }
}

/// Shopping cart endpoints.
#[derive(Debug, Clone, Copy)]
pub struct CartService<'a> {
    client: &'a Client,
}

impl CartService<'_> {
    /// `GET /api/cart/`
    pub async fn get(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/cart/").await
    }

    /// `POST /api/cart/items`
    pub async fn add_item<B: Serialize + ?Sized>(&self, item: &B) -> Result<Value> {
        self.client
            .submit(Method::POST, "/api/cart/items", item)
            .await
    }

    /// `PUT /api/cart/items/{id}`
    pub async fn update_item<B: Serialize + ?Sized>(
        &self,
        id: impl Display,
        updates: &B,
    ) -> Result<Value> {
        let path = format!("/api/cart/items/{}", segment(id));
        self.client.submit(Method::PUT, &path, updates).await
    }

    /// `DELETE /api/cart/items/{id}`
    pub async fn remove_item(&self, id: impl Display) -> Result<Value> {
        let path = format!("/api/cart/items/{}", segment(id));
        self.client.fetch(Method::DELETE, &path).await
    }

    /// `DELETE /api/cart/`
    pub async fn clear(&self) -> Result<Value> {
        self.client.fetch(Method::DELETE, "/api/cart/").await
    }
}

/// Order endpoints.
#[derive(Debug, Clone, Copy)]
pub struct OrderService<'a> {
    client: &'a Client,
}

impl OrderService<'_> {
    /// `POST /api/orders/`
    pub async fn create<B: Serialize + ?Sized>(&self, order: &B) -> Result<Value> {
        self.client.submit(Method::POST, "/api/orders/", order).await
    }

    /// `GET /api/orders/`
    pub async fn list(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/orders/").await
    }

    /// `GET /api/orders/{id}`
    pub async fn get(&self, id: impl Display) -> Result<Value> {
        let path = format!("/api/orders/{}", segment(id));
        self.client.fetch(Method::GET, &path).await
    }
}

/// Stock endpoints.
#[derive(Debug, Clone, Copy)]
pub struct StockService<'a> {
    client: &'a Client,
}

impl StockService<'_> {
    /// `GET /api/stock/{product_id}`
    pub async fn get(&self, product_id: impl Display) -> Result<Value> {
        let path = format!("/api/stock/{}", segment(product_id));
        self.client.fetch(Method::GET, &path).await
    }

    /// `PUT /api/stock/{product_id}`
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        product_id: impl Display,
        stock: &B,
    ) -> Result<Value> {
        let path = format!("/api/stock/{}", segment(product_id));
        self.client.submit(Method::PUT, &path, stock).await
    }
}

/// Analytics endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsService<'a> {
    client: &'a Client,
}

impl AnalyticsService<'_> {
    /// `GET /api/analytics/dashboard`
    pub async fn dashboard(&self) -> Result<Value> {
        self.client
            .fetch(Method::GET, "/api/analytics/dashboard")
            .await
    }

    /// `GET /api/analytics/orders`
    pub async fn orders(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/analytics/orders").await
    }

    /// `GET /api/analytics/products`
    pub async fn products(&self) -> Result<Value> {
        self.client
            .fetch(Method::GET, "/api/analytics/products")
            .await
    }
}

/// Notification endpoints.
#[derive(Debug, Clone, Copy)]
pub struct NotificationService<'a> {
    client: &'a Client,
}

impl NotificationService<'_> {
    /// `GET /api/notifications/`
    pub async fn list(&self) -> Result<Value> {
        self.client.fetch(Method::GET, "/api/notifications/").await
    }

    /// `GET /api/notifications/{id}`
    pub async fn get(&self, id: impl Display) -> Result<Value> {
        let path = format!("/api/notifications/{}", segment(id));
        self.client.fetch(Method::GET, &path).await
    }

    /// `POST /api/notifications/`
    pub async fn send<B: Serialize + ?Sized>(&self, notification: &B) -> Result<Value> {
        self.client
            .submit(Method::POST, "/api/notifications/", notification)
            .await
    }
}
