//! In-memory store.
//!
//! Implements every store trait over plain vectors behind one async mutex,
//! with the same ordering, uniqueness and stock rules as the `PostgreSQL`
//! repositories. Used by tests.

use std::cmp::Reverse;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mp_records_core::{
    CustomerId, MemberId, MessageId, OrderId, OrderNumber, ProductId, ProductStatus, ReleaseId,
    UserId,
};

use super::{
    CustomerStore, MemberStore, MessageStore, OrderFilter, OrderStore, ProductFilter,
    ProductStore, ReleaseStore, RepositoryError, SettingsStore, StockDecrement, Store, UserStore,
};
use crate::models::{
    AdminUser, CartItem, Customer, Member, Message, Order, Product, Release, Settings,
};

#[derive(Default)]
struct Collections {
    releases: Vec<Release>,
    products: Vec<Product>,
    members: Vec<Member>,
    messages: Vec<Message>,
    orders: Vec<Order>,
    customers: Vec<(Customer, Option<String>)>,
    settings: Option<Settings>,
    users: Vec<(AdminUser, String)>,
}

/// Store backed by in-process collections.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Collections>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Replace the element matching `pred`, or fail with `NotFound`.
fn replace<T: Clone>(
    items: &mut [T],
    pred: impl Fn(&T) -> bool,
    value: &T,
) -> Result<(), RepositoryError> {
    let slot = items
        .iter_mut()
        .find(|item| pred(item))
        .ok_or(RepositoryError::NotFound)?;
    *slot = value.clone();
    Ok(())
}

/// Remove the element matching `pred`, or fail with `NotFound`.
fn remove<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> Result<(), RepositoryError> {
    let before = items.len();
    items.retain(|item| !pred(item));
    if items.len() == before {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    async fn list_releases(&self, active_only: bool) -> Result<Vec<Release>, RepositoryError> {
        let data = self.data.lock().await;
        let mut releases: Vec<Release> = data
            .releases
            .iter()
            .filter(|r| r.active || !active_only)
            .cloned()
            .collect();
        releases.sort_by_key(|r| (r.position, Reverse(r.created_at)));
        Ok(releases)
    }

    async fn get_release(&self, id: ReleaseId) -> Result<Option<Release>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.releases.iter().find(|r| r.id == id).cloned())
    }

    async fn find_release_by_title(
        &self,
        title: &str,
    ) -> Result<Option<Release>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.releases.iter().find(|r| r.title == title).cloned())
    }

    async fn insert_release(&self, release: &Release) -> Result<(), RepositoryError> {
        self.data.lock().await.releases.push(release.clone());
        Ok(())
    }

    async fn update_release(&self, release: &Release) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        replace(&mut data.releases, |r| r.id == release.id, release)
    }

    async fn delete_release(&self, id: ReleaseId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        remove(&mut data.releases, |r| r.id == id)
    }

    async fn set_release_positions(
        &self,
        positions: &[(ReleaseId, i32)],
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if positions
            .iter()
            .any(|(id, _)| !data.releases.iter().any(|r| r.id == *id))
        {
            return Err(RepositoryError::NotFound);
        }
        for (id, position) in positions {
            if let Some(release) = data.releases.iter_mut().find(|r| r.id == *id) {
                release.position = *position;
            }
        }
        Ok(())
    }

    async fn count_releases(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.releases.len()))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.lock().await;
        let mut products: Vec<Product> = data
            .products
            .iter()
            .filter(|p| !filter.active_only || p.status == ProductStatus::Active)
            .filter(|p| filter.category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        products.sort_by_key(|p| Reverse(p.created_at));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.products.iter().find(|p| p.name == name).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.data.lock().await.products.push(product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        replace(&mut data.products, |p| p.id == product.id, product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        remove(&mut data.products, |p| p.id == id)
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.products.len()))
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn list_members(&self, active_only: bool) -> Result<Vec<Member>, RepositoryError> {
        let data = self.data.lock().await;
        let mut members: Vec<Member> = data
            .members
            .iter()
            .filter(|m| m.active || !active_only)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.position, m.created_at));
        Ok(members)
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.members.iter().find(|m| m.id == id).cloned())
    }

    async fn find_member_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Member>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.members.iter().find(|m| m.nickname == nickname).cloned())
    }

    async fn insert_member(&self, member: &Member) -> Result<(), RepositoryError> {
        self.data.lock().await.members.push(member.clone());
        Ok(())
    }

    async fn update_member(&self, member: &Member) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        replace(&mut data.members, |m| m.id == member.id, member)
    }

    async fn delete_member(&self, id: MemberId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        remove(&mut data.members, |m| m.id == id)
    }

    async fn count_members(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.members.len()))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_messages(&self) -> Result<Vec<Message>, RepositoryError> {
        let data = self.data.lock().await;
        let mut messages = data.messages.clone();
        messages.sort_by_key(|m| Reverse(m.sent_at));
        Ok(messages)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError> {
        self.data.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn mark_message_read(&self, id: MessageId) -> Result<Message, RepositoryError> {
        let mut data = self.data.lock().await;
        let message = data
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound)?;
        message.read = true;
        Ok(message.clone())
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        remove(&mut data.messages, |m| m.id == id)
    }

    async fn count_messages(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.messages.len()))
    }

    async fn count_unread_messages(&self) -> Result<u64, RepositoryError> {
        let data = self.data.lock().await;
        Ok(count(data.messages.iter().filter(|m| !m.read).count()))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let data = self.data.lock().await;
        let mut orders: Vec<Order> = data
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.customer.is_none_or(|c| o.customer == Some(c)))
            .cloned()
            .collect();
        orders.sort_by_key(|o| Reverse(o.created_at));
        Ok(orders)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.orders.iter().find(|o| &o.number == number).cloned())
    }

    async fn insert_order(
        &self,
        order: &Order,
        decrements: &[StockDecrement],
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;

        if data.orders.iter().any(|o| o.number == order.number) {
            return Err(RepositoryError::Conflict(
                "order number already exists".to_owned(),
            ));
        }

        // Work on a copy so a failing decrement leaves stock untouched.
        let mut products = data.products.clone();
        for decrement in decrements {
            let exhausted = || RepositoryError::StockExhausted {
                product: decrement.product,
                size: decrement.size.clone(),
            };
            let size = products
                .iter_mut()
                .find(|p| p.id == decrement.product)
                .and_then(|p| p.sizes.iter_mut().find(|s| s.name == decrement.size))
                .ok_or_else(exhausted)?;
            size.stock = size
                .stock
                .checked_sub(decrement.quantity)
                .ok_or_else(exhausted)?;
        }

        data.products = products;
        data.orders.push(order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if data
            .orders
            .iter()
            .any(|o| o.number == order.number && o.id != order.id)
        {
            return Err(RepositoryError::Conflict(
                "order number already exists".to_owned(),
            ));
        }
        replace(&mut data.orders, |o| o.id == order.id, order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        remove(&mut data.orders, |o| o.id == id)
    }

    async fn count_orders(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.orders.len()))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let data = self.data.lock().await;
        let mut customers: Vec<Customer> = data.customers.iter().map(|(c, _)| c.clone()).collect();
        customers.sort_by_key(|c| Reverse(c.created_at));
        Ok(customers)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .customers
            .iter()
            .find(|(c, _)| c.id == id)
            .map(|(c, _)| c.clone()))
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .customers
            .iter()
            .find(|(c, _)| c.email.as_str() == email)
            .map(|(c, _)| c.clone()))
    }

    async fn customer_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Customer, Option<String>)>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .customers
            .iter()
            .find(|(c, _)| c.email.as_str() == email)
            .cloned())
    }

    async fn insert_customer(
        &self,
        customer: &Customer,
        password_hash: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if data.customers.iter().any(|(c, _)| c.email == customer.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        data.customers
            .push((customer.clone(), password_hash.map(str::to_owned)));
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if data
            .customers
            .iter()
            .any(|(c, _)| c.email == customer.email && c.id != customer.id)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let (slot, _) = data
            .customers
            .iter_mut()
            .find(|(c, _)| c.id == customer.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = customer.clone();
        Ok(())
    }

    async fn set_cart(&self, id: CustomerId, cart: &[CartItem]) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        let (customer, _) = data
            .customers
            .iter_mut()
            .find(|(c, _)| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        customer.cart = cart.to_vec();
        Ok(())
    }

    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.customers.len()))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self) -> Result<Option<Settings>, RepositoryError> {
        Ok(self.data.lock().await.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), RepositoryError> {
        self.data.lock().await.settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn count_users(&self) -> Result<u64, RepositoryError> {
        Ok(count(self.data.lock().await.users.len()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<AdminUser>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn user_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .cloned())
    }

    async fn insert_user(
        &self,
        user: &AdminUser,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.lock().await;
        if data.users.iter().any(|(u, _)| u.username == user.username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }
        data.users.push((user.clone(), password_hash.to_owned()));
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{ProductDraft, ProductSize, ReleaseDraft};

    fn product_with_stock(stock: u32) -> Product {
        ProductDraft {
            name: Some("Tee".into()),
            price: Some(Decimal::new(50, 0)),
            sizes: Some(vec![ProductSize {
                name: "M".into(),
                stock,
            }]),
            ..Default::default()
        }
        .into_product(Utc::now())
        .unwrap()
    }

    fn sample_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            number: OrderNumber::for_date(now.date_naive(), 1),
            customer: None,
            shipping: crate::models::ShippingDraft {
                first_name: Some("Jan".into()),
                last_name: Some("Nowak".into()),
                email: Some("jan@example.pl".into()),
                phone: Some("600000000".into()),
                street: Some("Długa 1".into()),
                city: Some("Kraków".into()),
                postal_code: Some("30-001".into()),
                country: None,
            }
            .into_details()
            .unwrap(),
            items: Vec::new(),
            totals: mp_records_core::OrderTotals::from_subtotal(Decimal::ZERO),
            payment_method: mp_records_core::PaymentMethod::Transfer,
            payment_status: mp_records_core::PaymentStatus::Pending,
            status: mp_records_core::OrderStatus::New,
            tracking_number: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_releases_sorted_by_position_then_newest() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (title, position, age) in [("a", 1, 0), ("b", 0, 5), ("c", 0, 1)] {
            let mut release = ReleaseDraft {
                title: Some(title.into()),
                artists: Some("x".into()),
                position: Some(position),
                ..Default::default()
            }
            .into_release(now - Duration::minutes(age))
            .unwrap();
            release.created_at = now - Duration::minutes(age);
            store.insert_release(&release).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_releases(false)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_failed_decrement_leaves_stock() {
        let store = MemoryStore::new();
        let product = product_with_stock(1);
        store.insert_product(&product).await.unwrap();

        let decrement = StockDecrement {
            product: product.id,
            size: "M".into(),
            quantity: 2,
        };
        let order = sample_order();
        let err = store.insert_order(&order, &[decrement]).await.unwrap_err();

        assert!(matches!(err, RepositoryError::StockExhausted { .. }));
        let stored = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.sizes[0].stock, 1);
        assert_eq!(store.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_customer_email_conflicts() {
        let store = MemoryStore::new();
        let email = mp_records_core::Email::parse("a@b.pl").unwrap();
        let first =
            Customer::new(email.clone(), Some("A".into()), Some("B".into()), None, Utc::now())
                .unwrap();
        let second =
            Customer::new(email, Some("C".into()), Some("D".into()), None, Utc::now()).unwrap();

        store.insert_customer(&first, None).await.unwrap();
        let err = store.insert_customer(&second, None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
