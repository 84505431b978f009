//! Order service functions with database access.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{AppError, Result};
use crate::inventory::{
    queries as inventory_queries, retry_transient, DeductionError, DeductionLine, StockChange,
    Transient,
};
use crate::models::PickupPoint;
use crate::pricing::{quote_product, PriceQuote};
use crate::AppState;

use super::code::{allocate_code, normalize_code, CodePolicy, OrderCodeError};
use super::models::{OrderItem, OrderRow, OrderStatus};
use super::notify::{format_new_order, format_status_change};
use super::qr::code_qr_data_uri;
use super::queries::{self, NewOrder};
use super::requests::PlaceOrderRequest;
use super::responses::{OrderView, PlacedOrder};

/// Failure of the checkout transaction
#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Deduction(#[from] DeductionError),

    #[error(transparent)]
    Code(#[from] OrderCodeError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        PlaceOrderError::Deduction(DeductionError::Database(err))
    }
}

impl Transient for PlaceOrderError {
    fn is_transient(&self) -> bool {
        match self {
            PlaceOrderError::Deduction(e) => e.is_transient(),
            PlaceOrderError::Code(_) => false,
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Deduction(e) => e.into(),
            PlaceOrderError::Code(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Validated customer part of a checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub point_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    /// Normalized, non-empty
    pub cart: Cart,
}

/// Check a checkout request before touching the database
pub fn validate_checkout(request: &PlaceOrderRequest, now: DateTime<Utc>) -> Result<CheckoutDetails> {
    let point_id = request
        .cart
        .point_id()
        .ok_or_else(|| AppError::Validation("Select a pickup point first".to_string()))?;

    let mut cart = request.cart.clone();
    cart.normalize();
    if cart.is_empty() {
        return Err(AppError::Validation("Cart is empty".to_string()));
    }

    let customer_name = request.customer_name.trim();
    if customer_name.is_empty() {
        return Err(AppError::Validation("Customer name is required".to_string()));
    }

    let customer_phone = normalize_phone(&request.customer_phone)
        .ok_or_else(|| AppError::Validation("Invalid phone number".to_string()))?;

    if let Some(pickup) = request.pickup_time {
        if pickup < now {
            return Err(AppError::Validation("Pickup time is in the past".to_string()));
        }
    }

    Ok(CheckoutDetails {
        point_id,
        customer_name: customer_name.to_string(),
        customer_phone,
        cart,
    })
}

/// Strip separators; keeps an optional leading `+` and 6-15 digits
fn normalize_phone(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (plus, rest) = match raw.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", raw),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' => {}
            _ => return None,
        }
    }

    (6..=15).contains(&digits.len()).then(|| format!("{plus}{digits}"))
}

/// Price every cart line at the current quotes
async fn price_cart(
    state: &AppState,
    point: &PickupPoint,
    cart: &Cart,
    now: DateTime<Utc>,
) -> Result<(Vec<OrderItem>, Decimal)> {
    let mut names = HashMap::with_capacity(cart.lines().len());
    let mut quotes = HashMap::with_capacity(cart.lines().len());

    for line in cart.lines() {
        let (join, product) = tokio::try_join!(
            inventory_queries::find_point_product(&state.db, point.id, line.product_id),
            inventory_queries::find_product(&state.db, line.product_id),
        )?;

        let product = product
            .filter(|p| p.producer_id == point.producer_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown product {}", line.product_id)))?;

        quotes.insert(
            product.id,
            quote_product(&state.pricing, point, &product, join.as_ref(), now),
        );
        names.insert(product.id, product.name);
    }

    order_items(cart, &names, &quotes)
}

/// Order lines and total for a priced cart
fn order_items(
    cart: &Cart,
    names: &HashMap<Uuid, String>,
    quotes: &HashMap<Uuid, PriceQuote>,
) -> Result<(Vec<OrderItem>, Decimal)> {
    let unpriced = |id: Uuid| AppError::Internal(format!("No price for product {}", id));

    let items = cart
        .lines()
        .iter()
        .map(|line| -> Result<OrderItem> {
            let quote = quotes.get(&line.product_id).ok_or_else(|| unpriced(line.product_id))?;
            Ok(OrderItem {
                product_id: line.product_id,
                name: names.get(&line.product_id).cloned().unwrap_or_default(),
                quantity: line.quantity,
                unit_price: quote.display_price(),
                unit: quote.unit.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let total = cart
        .total(quotes)
        .ok_or_else(|| AppError::Internal("Cart has unpriced lines".to_string()))?;
    Ok((items, total))
}

/// One attempt at the checkout transaction.
///
/// Re-running with the same order id never double-deducts: an existing order
/// is returned as-is.
async fn try_place(
    state: &AppState,
    order: &NewOrder,
    lines: &[DeductionLine],
    policy: &CodePolicy,
) -> std::result::Result<(OrderRow, Vec<StockChange>, bool), PlaceOrderError> {
    let mut tx = state.db.begin().await?;

    if let Some(existing) = queries::find_order(&mut *tx, order.id).await? {
        return Ok((existing, Vec::new(), false));
    }

    let taken = queries::open_order_codes(&mut *tx).await?;
    let code = {
        let mut rng = rand::thread_rng();
        allocate_code(&mut rng, policy, |c| taken.contains(c))?
    };

    let Some(created_at) = queries::insert_order(&mut tx, order, &code).await? else {
        // Placed concurrently under the same id
        drop(tx);
        let existing = queries::find_order(&state.db, order.id).await?;
        return match existing {
            Some(existing) => Ok((existing, Vec::new(), false)),
            None => Err(DeductionError::Contended {
                product_id: lines.first().map(|l| l.product_id).unwrap_or_default(),
            }
            .into()),
        };
    };

    let mut changes = Vec::with_capacity(lines.len());
    for line in lines {
        changes.push(inventory_queries::deduct_line(&mut tx, order.id, order.point_id, *line).await?);
    }

    tx.commit().await?;

    let row = OrderRow {
        id: order.id,
        producer_id: order.producer_id,
        point_id: order.point_id,
        code,
        status: OrderStatus::Pending,
        items: sqlx::types::Json(order.items.clone()),
        customer_name: order.customer_name.clone(),
        customer_phone: order.customer_phone.clone(),
        pickup_time: order.pickup_time,
        total: order.total,
        created_at,
    };
    Ok((row, changes, true))
}

/// Place an order: price the cart, allocate a pickup code and deduct stock in
/// one transaction.
///
/// The whole transaction is retried on transient faults; insufficient stock
/// is returned without retrying and leaves no partial deduction behind.
pub async fn place_order(
    state: &AppState,
    request: PlaceOrderRequest,
    now: DateTime<Utc>,
) -> Result<PlacedOrder> {
    let details = validate_checkout(&request, now)?;
    let point = state.cache.point(&state.db, details.point_id).await?;
    let (items, total) = price_cart(state, &point, &details.cart, now).await?;
    let lines = details.cart.deduction_lines();

    let new_order = NewOrder {
        id: request.order_id.unwrap_or_else(Uuid::new_v4),
        producer_id: point.producer_id,
        point_id: point.id,
        items,
        customer_name: details.customer_name,
        customer_phone: details.customer_phone,
        pickup_time: request.pickup_time,
        total,
    };

    let policy = state.code_policy;
    let (order, changes, created) = retry_transient(state.deduction_retries, || {
        try_place(state, &new_order, &lines, &policy)
    })
    .await?;

    state.feed.publish_all(&changes);

    if created {
        tracing::info!(
            "Order {} placed at point {} with code {} ({} items)",
            order.id,
            order.point_id,
            order.code,
            details.cart.item_count()
        );
        state
            .notifier
            .notify(format_new_order(&order, &point.name, state.schedule.timezone()));
    } else {
        tracing::info!("Order {} already placed, returning existing", order.id);
    }

    Ok(PlacedOrder {
        order: order_view(state, order).await,
        created,
    })
}

/// Move an order to a new status; cancelling returns its stock
pub async fn update_status(state: &AppState, order_id: Uuid, next: OrderStatus) -> Result<OrderView> {
    let mut tx = state.db.begin().await?;
    let mut order = queries::lock_order(&mut tx, order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous = order.status;
    if previous == next {
        return Ok(order_view(state, order).await);
    }
    if !previous.can_transition_to(next) {
        return Err(AppError::Validation(format!(
            "Cannot change order from {} to {}",
            previous, next
        )));
    }

    queries::set_status(&mut tx, order_id, next).await?;
    let restored = if next == OrderStatus::Cancelled {
        inventory_queries::restore_order_deductions(&mut tx, order_id).await?
    } else {
        Vec::new()
    };
    tx.commit().await?;

    order.status = next;
    state.feed.publish_all(&restored);
    tracing::info!("Order {} moved from {} to {}", order_id, previous, next);
    state.notifier.notify(format_status_change(&order, previous));

    Ok(order_view(state, order).await)
}

/// Find the order a customer-typed pickup code refers to
pub async fn lookup_by_code(
    state: &AppState,
    raw_code: &str,
    producer_id: Option<Uuid>,
) -> Result<OrderView> {
    let code = normalize_code(raw_code).ok_or(AppError::NotFound)?;
    let order = queries::find_by_code(&state.db, &code, producer_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(order_view(state, order).await)
}

/// Decorate an order with its point and QR code; both are optional extras
async fn order_view(state: &AppState, order: OrderRow) -> OrderView {
    let point_id = order.point_id;
    let mut view = OrderView::new(order);

    match state.cache.point(&state.db, point_id).await {
        Ok(point) => {
            view.point_name = Some(point.name.clone());
            view.point_address = Some(point.address.clone());
        }
        Err(e) => tracing::warn!("Point {} unavailable for order view: {}", point_id, e),
    }

    match code_qr_data_uri(&view.code) {
        Ok(uri) => view.qr = Some(uri),
        Err(e) => tracing::warn!("QR rendering failed for order {}: {}", view.id, e),
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{StockLevel, StockSource};
    use crate::schedule::DiscountPhase;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request(cart: Cart) -> PlaceOrderRequest {
        PlaceOrderRequest {
            order_id: None,
            cart,
            customer_name: "  Ион  ".to_string(),
            customer_phone: "+373 (60) 00-00-00".to_string(),
            pickup_time: None,
        }
    }

    fn filled_cart() -> (Cart, Uuid) {
        let point = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut cart = Cart::for_point(point);
        cart.add(product, 2, &StockLevel::new(5, true, StockSource::PointProduct))
            .unwrap();
        (cart, product)
    }

    #[test]
    fn test_validate_checkout() {
        let (cart, product) = filled_cart();
        let details = validate_checkout(&request(cart), Utc::now()).unwrap();
        assert_eq!(details.customer_name, "Ион");
        assert_eq!(details.customer_phone, "+37360000000");
        assert_eq!(
            details.cart.deduction_lines(),
            vec![DeductionLine {
                product_id: product,
                quantity: 2
            }]
        );
    }

    fn quote(price: Decimal) -> PriceQuote {
        PriceQuote {
            regular_price: price,
            discount_price: None,
            is_discount_active: false,
            discount_phase: DiscountPhase::Inactive,
            unit: "шт".to_string(),
        }
    }

    #[test]
    fn test_order_items_total_from_cart() {
        let stock = StockLevel::new(10, true, StockSource::PointProduct);
        let bread = Uuid::new_v4();
        let cake = Uuid::new_v4();
        let mut cart = Cart::for_point(Uuid::new_v4());
        cart.add(bread, 3, &stock).unwrap();
        cart.add(cake, 1, &stock).unwrap();

        let names = HashMap::from([
            (bread, "Хлеб".to_string()),
            (cake, "Торт".to_string()),
        ]);
        let mut quotes = HashMap::from([(bread, quote(dec!(12.50))), (cake, quote(dec!(80)))]);

        let (items, total) = order_items(&cart, &names, &quotes).unwrap();
        assert_eq!(total, dec!(117.50));
        assert_eq!(total, cart.total(&quotes).unwrap());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Хлеб");
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[1].unit_price, dec!(80));

        quotes.remove(&cake);
        assert!(matches!(
            order_items(&cart, &names, &quotes),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_checkout_rejects_empty_cart() {
        let cart = Cart::for_point(Uuid::new_v4());
        assert!(matches!(
            validate_checkout(&request(cart), Utc::now()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_checkout(&request(Cart::new()), Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_checkout_rejects_bad_contact_or_time() {
        let (cart, _) = filled_cart();

        let mut bad_name = request(cart.clone());
        bad_name.customer_name = "   ".to_string();
        assert!(validate_checkout(&bad_name, Utc::now()).is_err());

        let mut bad_phone = request(cart.clone());
        bad_phone.customer_phone = "call me".to_string();
        assert!(validate_checkout(&bad_phone, Utc::now()).is_err());

        let mut past = request(cart);
        past.pickup_time = Some(Utc::now() - Duration::hours(1));
        assert!(validate_checkout(&past, Utc::now()).is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("069 123 456"), Some("069123456".to_string()));
        assert_eq!(normalize_phone("+373-69-123456"), Some("+37369123456".to_string()));
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("+37369x23456"), None);
    }

    #[test]
    fn test_place_error_transience() {
        assert!(PlaceOrderError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!PlaceOrderError::from(OrderCodeError::Exhausted { attempts: 10 }).is_transient());
        let stock = PlaceOrderError::from(DeductionError::InsufficientStock {
            product_id: Uuid::nil(),
        });
        assert!(!stock.is_transient());
        assert!(matches!(AppError::from(stock), AppError::InsufficientStock { .. }));
    }
}
