use chrono::NaiveDate;

use crate::api::OrderRow;
use crate::errors::Result;
use crate::models::{Dish, Menu, Order, Role, User};

pub mod sqlite;

/// Trait hiding the storage implementation.
///
/// The domain rules talk to this so unit tests can run against the
/// in-memory mock while the server runs on SQLite. The uniqueness
/// guarantees documented per method are the real concurrency guard: a
/// prior existence read is never to be trusted over the constraint.
pub trait Database: Send {
    /// Insert a user. Usernames are unique; a duplicate surfaces as
    /// `Error::DuplicateUser`.
    fn insert_user(&mut self, username: &str, display_name: &str, role: Role) -> Result<User>;

    /// Look up a user by username, `None` when unknown.
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a dish. Names are unique and case-sensitive;
    /// `Error::DuplicateDish` on a collision.
    fn insert_dish(&mut self, name: &str) -> Result<Dish>;

    /// Rename a dish in place. `Error::NotFound` when the id is unknown,
    /// `Error::DuplicateDish` when the new name collides.
    fn rename_dish(&mut self, dish_id: i64, name: &str) -> Result<Dish>;

    /// Look up a dish by id, `None` when unknown.
    fn dish_by_id(&self, dish_id: i64) -> Result<Option<Dish>>;

    /// The whole catalogue, in id order.
    fn list_dishes(&self) -> Result<Vec<Dish>>;

    /// Insert a menu with a freshly generated opaque token and the
    /// notification flag down. The date uniqueness constraint decides
    /// duplicates, surfaced as `Error::DuplicateDate`; every dish id must
    /// already exist.
    fn insert_menu(&mut self, date: NaiveDate, detail: &str, dish_ids: &[i64]) -> Result<Menu>;

    /// Replace a menu's detail and dish set, clearing the notification
    /// flag in the same write so an edited menu can never pretend it was
    /// already announced. `Error::NotFound` when the id is gone.
    fn replace_menu(&mut self, menu_id: i64, detail: &str, dish_ids: &[i64]) -> Result<Menu>;

    /// Every menu recorded for a date, dishes included.
    ///
    /// Deliberately plural: reducing this to at-most-one (and deciding what
    /// more than one means) happens in exactly one helper upstream.
    fn menus_for_date(&self, date: NaiveDate) -> Result<Vec<Menu>>;

    /// Look up a menu by its opaque token, `None` when unknown.
    fn menu_by_token(&self, token: &str) -> Result<Option<Menu>>;

    /// Record that the menu's announcement actually went out.
    fn mark_notified(&mut self, menu_id: i64) -> Result<()>;

    /// Every order by one employee on one day. Plural for the same reason
    /// as `menus_for_date`.
    fn orders_for_day(&self, employee_id: i64, day: NaiveDate) -> Result<Vec<Order>>;

    /// Insert a new order for (employee, day). The uniqueness constraint on
    /// that pair is authoritative: losing a race surfaces as
    /// `Error::Conflict`, which callers map to update-instead-of-insert.
    fn insert_order(
        &mut self,
        employee_id: i64,
        dish_id: i64,
        customizations: &str,
        day: NaiveDate,
    ) -> Result<Order>;

    /// Overwrite an order's dish and customizations, keeping its identity
    /// and created_at. `Error::NotFound` when the id is gone.
    fn update_order(&mut self, order_id: i64, dish_id: i64, customizations: &str) -> Result<Order>;

    /// The administrator's report: everyone's pick for the day, joined with
    /// names, sorted by username.
    fn day_orders(&self, day: NaiveDate) -> Result<Vec<OrderRow>>;
}

pub mod mock {
    use std::cell::Cell;

    use uuid::Uuid;

    use super::*;
    use crate::errors::Error;

    /// A stored menu before hydration; public so tests can push rows that
    /// bypass the uniqueness checks and recreate corrupted states.
    #[derive(Debug, Clone)]
    pub struct MenuRow {
        pub id: i64,
        pub token: String,
        pub date: NaiveDate,
        pub detail: String,
        pub dish_ids: Vec<i64>,
        pub notification_sent: bool,
    }

    /// In-memory database for unit tests.
    ///
    /// The fields are public on purpose: integrity-violation tests need to
    /// fabricate states the write methods refuse to produce.
    #[derive(Default)]
    pub struct MockDb {
        pub users: Vec<User>,
        pub dishes: Vec<Dish>,
        pub menus: Vec<MenuRow>,
        pub orders: Vec<Order>,
        /// While positive, `orders_for_day` answers with nothing and counts
        /// down. That is the stale read a racing submit sees right before
        /// the uniqueness constraint rejects its insert.
        pub stale_order_reads: Cell<u32>,
        next_id: i64,
    }

    impl MockDb {
        pub fn new() -> MockDb {
            MockDb::default()
        }

        fn next_id(&mut self) -> i64 {
            self.next_id += 1;
            self.next_id
        }

        fn hydrate(&self, row: &MenuRow) -> Result<Menu> {
            let mut dishes = Vec::with_capacity(row.dish_ids.len());
            for dish_id in &row.dish_ids {
                let dish = self
                    .dishes
                    .iter()
                    .find(|dish| dish.id == *dish_id)
                    .ok_or(Error::UnknownDish(*dish_id))?;
                dishes.push(dish.clone());
            }
            Ok(Menu {
                id: row.id,
                token: row.token.clone(),
                date: row.date,
                detail: row.detail.clone(),
                dishes,
                notification_sent: row.notification_sent,
            })
        }

        fn check_dishes_exist(&self, dish_ids: &[i64]) -> Result<()> {
            for dish_id in dish_ids {
                if !self.dishes.iter().any(|dish| dish.id == *dish_id) {
                    return Err(Error::UnknownDish(*dish_id));
                }
            }
            Ok(())
        }
    }

    impl Database for MockDb {
        fn insert_user(
            &mut self,
            username: &str,
            display_name: &str,
            role: Role,
        ) -> Result<User> {
            if self.users.iter().any(|user| user.username == username) {
                return Err(Error::DuplicateUser(username.to_string()));
            }
            let user = User {
                id: self.next_id(),
                username: username.to_string(),
                display_name: display_name.to_string(),
                role,
            };
            self.users.push(user.clone());
            Ok(user)
        }

        fn user_by_username(&self, username: &str) -> Result<Option<User>> {
            Ok(self
                .users
                .iter()
                .find(|user| user.username == username)
                .cloned())
        }

        fn insert_dish(&mut self, name: &str) -> Result<Dish> {
            if self.dishes.iter().any(|dish| dish.name == name) {
                return Err(Error::DuplicateDish(name.to_string()));
            }
            let dish = Dish {
                id: self.next_id(),
                name: name.to_string(),
            };
            self.dishes.push(dish.clone());
            Ok(dish)
        }

        fn rename_dish(&mut self, dish_id: i64, name: &str) -> Result<Dish> {
            if self
                .dishes
                .iter()
                .any(|dish| dish.name == name && dish.id != dish_id)
            {
                return Err(Error::DuplicateDish(name.to_string()));
            }
            let dish = self
                .dishes
                .iter_mut()
                .find(|dish| dish.id == dish_id)
                .ok_or_else(|| Error::NotFound(format!("No dish with id {}", dish_id)))?;
            dish.name = name.to_string();
            Ok(dish.clone())
        }

        fn dish_by_id(&self, dish_id: i64) -> Result<Option<Dish>> {
            Ok(self.dishes.iter().find(|dish| dish.id == dish_id).cloned())
        }

        fn list_dishes(&self) -> Result<Vec<Dish>> {
            Ok(self.dishes.clone())
        }

        fn insert_menu(
            &mut self,
            date: NaiveDate,
            detail: &str,
            dish_ids: &[i64],
        ) -> Result<Menu> {
            if self.menus.iter().any(|menu| menu.date == date) {
                return Err(Error::DuplicateDate(date));
            }
            self.check_dishes_exist(dish_ids)?;
            let row = MenuRow {
                id: self.next_id(),
                token: Uuid::new_v4().to_string(),
                date,
                detail: detail.to_string(),
                dish_ids: dish_ids.to_vec(),
                notification_sent: false,
            };
            self.menus.push(row.clone());
            self.hydrate(&row)
        }

        fn replace_menu(&mut self, menu_id: i64, detail: &str, dish_ids: &[i64]) -> Result<Menu> {
            self.check_dishes_exist(dish_ids)?;
            let row = self
                .menus
                .iter_mut()
                .find(|menu| menu.id == menu_id)
                .ok_or_else(|| Error::NotFound(format!("No menu with id {}", menu_id)))?;
            row.detail = detail.to_string();
            row.dish_ids = dish_ids.to_vec();
            row.notification_sent = false;
            let row = row.clone();
            self.hydrate(&row)
        }

        fn menus_for_date(&self, date: NaiveDate) -> Result<Vec<Menu>> {
            self.menus
                .iter()
                .filter(|menu| menu.date == date)
                .map(|row| self.hydrate(row))
                .collect()
        }

        fn menu_by_token(&self, token: &str) -> Result<Option<Menu>> {
            match self.menus.iter().find(|menu| menu.token == token) {
                Some(row) => Ok(Some(self.hydrate(row)?)),
                None => Ok(None),
            }
        }

        fn mark_notified(&mut self, menu_id: i64) -> Result<()> {
            let row = self
                .menus
                .iter_mut()
                .find(|menu| menu.id == menu_id)
                .ok_or_else(|| Error::NotFound(format!("No menu with id {}", menu_id)))?;
            row.notification_sent = true;
            Ok(())
        }

        fn orders_for_day(&self, employee_id: i64, day: NaiveDate) -> Result<Vec<Order>> {
            let stale = self.stale_order_reads.get();
            if stale > 0 {
                self.stale_order_reads.set(stale - 1);
                return Ok(Vec::new());
            }
            Ok(self
                .orders
                .iter()
                .filter(|order| order.employee_id == employee_id && order.created_at == day)
                .cloned()
                .collect())
        }

        fn insert_order(
            &mut self,
            employee_id: i64,
            dish_id: i64,
            customizations: &str,
            day: NaiveDate,
        ) -> Result<Order> {
            if self
                .orders
                .iter()
                .any(|order| order.employee_id == employee_id && order.created_at == day)
            {
                return Err(Error::Conflict(
                    "An order already exists for today".to_string(),
                ));
            }
            let order = Order {
                id: self.next_id(),
                employee_id,
                dish_id,
                customizations: customizations.to_string(),
                created_at: day,
            };
            self.orders.push(order.clone());
            Ok(order)
        }

        fn update_order(
            &mut self,
            order_id: i64,
            dish_id: i64,
            customizations: &str,
        ) -> Result<Order> {
            let order = self
                .orders
                .iter_mut()
                .find(|order| order.id == order_id)
                .ok_or_else(|| Error::NotFound(format!("No order with id {}", order_id)))?;
            order.dish_id = dish_id;
            order.customizations = customizations.to_string();
            Ok(order.clone())
        }

        fn day_orders(&self, day: NaiveDate) -> Result<Vec<OrderRow>> {
            let mut rows = Vec::new();
            for order in self.orders.iter().filter(|order| order.created_at == day) {
                let user = self
                    .users
                    .iter()
                    .find(|user| user.id == order.employee_id)
                    .ok_or_else(|| {
                        Error::NotFound(format!("No user with id {}", order.employee_id))
                    })?;
                let dish = self
                    .dishes
                    .iter()
                    .find(|dish| dish.id == order.dish_id)
                    .ok_or(Error::UnknownDish(order.dish_id))?;
                rows.push(OrderRow {
                    username: user.username.clone(),
                    display_name: user.display_name.clone(),
                    dish: dish.name.clone(),
                    customizations: order.customizations.clone(),
                });
            }
            rows.sort_by(|a, b| a.username.cmp(&b.username));
            Ok(rows)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn day(d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
        }

        #[test]
        fn test_mock_db_uniqueness() {
            let mut db = MockDb::new();
            let soup = db.insert_dish("Soup").unwrap();

            assert!(matches!(
                db.insert_dish("Soup"),
                Err(Error::DuplicateDish(_))
            ));
            // Case-sensitive on purpose.
            assert!(db.insert_dish("soup").is_ok());

            db.insert_menu(day(10), "Lunch!", &[soup.id]).unwrap();
            assert!(matches!(
                db.insert_menu(day(10), "Again", &[soup.id]),
                Err(Error::DuplicateDate(_))
            ));

            let nora = db.insert_user("nora", "Nora", Role::Admin).unwrap();
            db.insert_order(nora.id, soup.id, "", day(10)).unwrap();
            assert!(matches!(
                db.insert_order(nora.id, soup.id, "", day(10)),
                Err(Error::Conflict(_))
            ));
        }

        #[test]
        fn test_mock_db_menu_edit_clears_flag_and_rehydrates() {
            let mut db = MockDb::new();
            let soup = db.insert_dish("Soup").unwrap();
            let salad = db.insert_dish("Salad").unwrap();

            let menu = db.insert_menu(day(10), "Lunch!", &[soup.id]).unwrap();
            assert!(!menu.notification_sent);
            db.mark_notified(menu.id).unwrap();

            let edited = db.replace_menu(menu.id, "Changed", &[salad.id]).unwrap();
            assert!(!edited.notification_sent);
            assert_eq!(edited.dishes, vec![salad.clone()]);
            assert_eq!(edited.token, menu.token);
        }

        #[test]
        fn test_mock_db_day_report_joins_names() {
            let mut db = MockDb::new();
            let soup = db.insert_dish("Soup").unwrap();
            let zoe = db.insert_user("zoe", "Zoe", Role::Employee).unwrap();
            let abe = db.insert_user("abe", "Abe", Role::Employee).unwrap();
            db.insert_order(zoe.id, soup.id, " extra bread ", day(10))
                .unwrap();
            db.insert_order(abe.id, soup.id, "", day(10)).unwrap();
            db.insert_order(abe.id, soup.id, "", day(11)).unwrap();

            let rows = db.day_orders(day(10)).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].username, "abe");
            assert_eq!(rows[1].username, "zoe");
            // Whitespace survives storage untouched.
            assert_eq!(rows[1].customizations, " extra bread ");
        }

        #[test]
        fn test_mock_db_stale_reads_then_recovers() {
            let mut db = MockDb::new();
            let soup = db.insert_dish("Soup").unwrap();
            let zoe = db.insert_user("zoe", "Zoe", Role::Employee).unwrap();
            db.insert_order(zoe.id, soup.id, "", day(10)).unwrap();

            db.stale_order_reads.set(1);
            assert!(db.orders_for_day(zoe.id, day(10)).unwrap().is_empty());
            assert_eq!(db.orders_for_day(zoe.id, day(10)).unwrap().len(), 1);
        }
    }
}
