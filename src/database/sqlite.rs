use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::api::OrderRow;
use crate::database::Database;
use crate::errors::{Error, Result};
use crate::models::{Dish, Menu, Order, Role, User};

/// Contains the SQL queries used to interact with the database
pub mod sql_queries {
    /// Dates are stored as ISO `YYYY-MM-DD` text, which sorts and compares
    /// correctly as a string. The UNIQUE constraints here are load-bearing:
    /// they are what actually enforces one menu per date and one order per
    /// employee per day, whatever the handlers believed when they read.
    pub const CREATE_TABLES: &str = "
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('admin', 'employee'))
        );
        CREATE TABLE IF NOT EXISTS dishes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS menus (
            id INTEGER PRIMARY KEY,
            token TEXT NOT NULL UNIQUE,
            date TEXT NOT NULL UNIQUE,
            detail TEXT NOT NULL,
            notification_sent INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS menu_dishes (
            menu_id INTEGER NOT NULL REFERENCES menus (id) ON DELETE CASCADE,
            dish_id INTEGER NOT NULL REFERENCES dishes (id) ON DELETE CASCADE,
            PRIMARY KEY (menu_id, dish_id)
        );
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY,
            employee_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            dish_id INTEGER NOT NULL REFERENCES dishes (id) ON DELETE CASCADE,
            customizations TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            UNIQUE (employee_id, created_at)
        );
    ";

    pub const INSERT_USER: &str =
        "INSERT INTO users (username, display_name, role) VALUES (?1, ?2, ?3)";
    pub const SELECT_USER: &str =
        "SELECT id, username, display_name, role FROM users WHERE username = ?1";

    pub const INSERT_DISH: &str = "INSERT INTO dishes (name) VALUES (?1)";
    pub const RENAME_DISH: &str = "UPDATE dishes SET name = ?2 WHERE id = ?1";
    pub const SELECT_DISH: &str = "SELECT id, name FROM dishes WHERE id = ?1";
    pub const SELECT_DISHES: &str = "SELECT id, name FROM dishes ORDER BY id";

    pub const INSERT_MENU: &str = "INSERT INTO menus (token, date, detail) VALUES (?1, ?2, ?3)";
    /// Editing a menu and lowering its notification flag happen in the same
    /// statement so no interleaving can observe an edited-but-announced menu.
    pub const UPDATE_MENU: &str =
        "UPDATE menus SET detail = ?2, notification_sent = 0 WHERE id = ?1";
    pub const MARK_NOTIFIED: &str = "UPDATE menus SET notification_sent = 1 WHERE id = ?1";
    pub const SELECT_MENUS_BY_DATE: &str =
        "SELECT id, token, date, detail, notification_sent FROM menus WHERE date = ?1";
    pub const SELECT_MENU_BY_TOKEN: &str =
        "SELECT id, token, date, detail, notification_sent FROM menus WHERE token = ?1";
    pub const SELECT_MENU_BY_ID: &str =
        "SELECT id, token, date, detail, notification_sent FROM menus WHERE id = ?1";

    pub const LINK_DISH: &str =
        "INSERT OR IGNORE INTO menu_dishes (menu_id, dish_id) VALUES (?1, ?2)";
    pub const UNLINK_DISHES: &str = "DELETE FROM menu_dishes WHERE menu_id = ?1";
    pub const SELECT_MENU_DISHES: &str = "SELECT dishes.id, dishes.name FROM dishes
         JOIN menu_dishes ON menu_dishes.dish_id = dishes.id
         WHERE menu_dishes.menu_id = ?1 ORDER BY dishes.id";

    pub const INSERT_ORDER: &str =
        "INSERT INTO orders (employee_id, dish_id, customizations, created_at) VALUES (?1, ?2, ?3, ?4)";
    pub const UPDATE_ORDER: &str =
        "UPDATE orders SET dish_id = ?2, customizations = ?3 WHERE id = ?1";
    pub const SELECT_ORDER: &str =
        "SELECT id, employee_id, dish_id, customizations, created_at FROM orders WHERE id = ?1";
    pub const SELECT_ORDERS_FOR_DAY: &str =
        "SELECT id, employee_id, dish_id, customizations, created_at FROM orders
         WHERE employee_id = ?1 AND created_at = ?2";
    pub const SELECT_DAY_ORDERS: &str =
        "SELECT users.username, users.display_name, dishes.name, orders.customizations FROM orders
         JOIN users ON users.id = orders.employee_id
         JOIN dishes ON dishes.id = orders.dish_id
         WHERE orders.created_at = ?1 ORDER BY users.username";
}

/// True when SQLite rejected a write because a UNIQUE (or primary key)
/// constraint already holds that value. Foreign key failures carry a
/// different extended code and stay plain database errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(cause, _) => {
            cause.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || cause.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

fn role_from_sql(index: usize, text: String) -> rusqlite::Result<Role> {
    Role::parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            format!("unknown role '{}'", text).into(),
        )
    })
}

/// Link a menu to its dishes inside an open transaction.
/// This exists only to make the borrow checker happy
fn link_dishes(tx: &rusqlite::Transaction, menu_id: i64, dish_ids: &[i64]) -> Result<()> {
    let mut stmt = tx.prepare(sql_queries::LINK_DISH)?;
    for dish_id in dish_ids {
        stmt.execute(params![menu_id, dish_id])?;
    }
    Ok(())
}

pub struct SqliteDatabase {
    /// The connection
    conn: Connection,
}

impl SqliteDatabase {
    /// Open the database file at `path`, creating the schema when absent.
    pub fn open(path: &str) -> Result<SqliteDatabase> {
        SqliteDatabase::from_connection(Connection::open(path)?)
    }

    /// A fresh, private in-memory database.
    pub fn in_memory() -> Result<SqliteDatabase> {
        SqliteDatabase::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<SqliteDatabase> {
        conn.execute_batch(sql_queries::CREATE_TABLES)?;
        Ok(SqliteDatabase { conn })
    }

    fn dishes_for_menu(&self, menu_id: i64) -> Result<Vec<Dish>> {
        self.conn
            .prepare(sql_queries::SELECT_MENU_DISHES)?
            .query_map(params![menu_id], |row| {
                Ok(Dish {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|err| err.into())
    }

    /// Run one of the menu SELECTs and hydrate each row with its dish list.
    fn menus_where(&self, query: &str, key: &dyn rusqlite::ToSql) -> Result<Vec<Menu>> {
        let rows = self
            .conn
            .prepare(query)?
            .query_map(params![key], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, NaiveDate>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())?;

        rows.into_iter()
            .map(|(id, token, date, detail, notification_sent)| {
                Ok(Menu {
                    id,
                    token,
                    date,
                    detail,
                    dishes: self.dishes_for_menu(id)?,
                    notification_sent,
                })
            })
            .collect()
    }

    fn menu_by_id(&self, menu_id: i64) -> Result<Menu> {
        let mut menus = self.menus_where(sql_queries::SELECT_MENU_BY_ID, &menu_id)?;
        menus
            .pop()
            .ok_or_else(|| Error::NotFound(format!("No menu with id {}", menu_id)))
    }

    fn order_by_id(&self, order_id: i64) -> Result<Order> {
        self.conn
            .query_row(sql_queries::SELECT_ORDER, params![order_id], |row| {
                Ok(Order {
                    id: row.get(0)?,
                    employee_id: row.get(1)?,
                    dish_id: row.get(2)?,
                    customizations: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("No order with id {}", order_id)))
    }
}

impl Database for SqliteDatabase {
    fn insert_user(&mut self, username: &str, display_name: &str, role: Role) -> Result<User> {
        if let Err(err) = self.conn.execute(
            sql_queries::INSERT_USER,
            params![username, display_name, role.as_str()],
        ) {
            if is_unique_violation(&err) {
                return Err(Error::DuplicateUser(username.to_string()));
            }
            return Err(err.into());
        }
        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            role,
        })
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(sql_queries::SELECT_USER, params![username], |row| {
                let role: String = row.get(3)?;
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                    role: role_from_sql(3, role)?,
                })
            })
            .optional()
            .map_err(|err| err.into())
    }

    fn insert_dish(&mut self, name: &str) -> Result<Dish> {
        if let Err(err) = self.conn.execute(sql_queries::INSERT_DISH, params![name]) {
            if is_unique_violation(&err) {
                return Err(Error::DuplicateDish(name.to_string()));
            }
            return Err(err.into());
        }
        Ok(Dish {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn rename_dish(&mut self, dish_id: i64, name: &str) -> Result<Dish> {
        match self
            .conn
            .execute(sql_queries::RENAME_DISH, params![dish_id, name])
        {
            Err(err) if is_unique_violation(&err) => Err(Error::DuplicateDish(name.to_string())),
            Err(err) => Err(err.into()),
            Ok(0) => Err(Error::NotFound(format!("No dish with id {}", dish_id))),
            Ok(_) => Ok(Dish {
                id: dish_id,
                name: name.to_string(),
            }),
        }
    }

    fn dish_by_id(&self, dish_id: i64) -> Result<Option<Dish>> {
        self.conn
            .query_row(sql_queries::SELECT_DISH, params![dish_id], |row| {
                Ok(Dish {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
            .map_err(|err| err.into())
    }

    fn list_dishes(&self) -> Result<Vec<Dish>> {
        self.conn
            .prepare(sql_queries::SELECT_DISHES)?
            .query_map(params![], |row| {
                Ok(Dish {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|err| err.into())
    }

    fn insert_menu(&mut self, date: NaiveDate, detail: &str, dish_ids: &[i64]) -> Result<Menu> {
        let token = Uuid::new_v4().to_string();
        let tx = self.conn.transaction()?;
        if let Err(err) = tx.execute(sql_queries::INSERT_MENU, params![token, date, detail]) {
            if is_unique_violation(&err) {
                return Err(Error::DuplicateDate(date));
            }
            return Err(err.into());
        }
        let menu_id = tx.last_insert_rowid();
        link_dishes(&tx, menu_id, dish_ids)?;
        tx.commit()?;

        self.menu_by_id(menu_id)
    }

    fn replace_menu(&mut self, menu_id: i64, detail: &str, dish_ids: &[i64]) -> Result<Menu> {
        let tx = self.conn.transaction()?;
        if tx.execute(sql_queries::UPDATE_MENU, params![menu_id, detail])? == 0 {
            return Err(Error::NotFound(format!("No menu with id {}", menu_id)));
        }
        tx.execute(sql_queries::UNLINK_DISHES, params![menu_id])?;
        link_dishes(&tx, menu_id, dish_ids)?;
        tx.commit()?;

        self.menu_by_id(menu_id)
    }

    fn menus_for_date(&self, date: NaiveDate) -> Result<Vec<Menu>> {
        self.menus_where(sql_queries::SELECT_MENUS_BY_DATE, &date)
    }

    fn menu_by_token(&self, token: &str) -> Result<Option<Menu>> {
        let mut menus = self.menus_where(sql_queries::SELECT_MENU_BY_TOKEN, &token)?;
        Ok(menus.pop())
    }

    fn mark_notified(&mut self, menu_id: i64) -> Result<()> {
        if self
            .conn
            .execute(sql_queries::MARK_NOTIFIED, params![menu_id])?
            == 0
        {
            return Err(Error::NotFound(format!("No menu with id {}", menu_id)));
        }
        Ok(())
    }

    fn orders_for_day(&self, employee_id: i64, day: NaiveDate) -> Result<Vec<Order>> {
        self.conn
            .prepare(sql_queries::SELECT_ORDERS_FOR_DAY)?
            .query_map(params![employee_id, day], |row| {
                Ok(Order {
                    id: row.get(0)?,
                    employee_id: row.get(1)?,
                    dish_id: row.get(2)?,
                    customizations: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|err| err.into())
    }

    fn insert_order(
        &mut self,
        employee_id: i64,
        dish_id: i64,
        customizations: &str,
        day: NaiveDate,
    ) -> Result<Order> {
        if let Err(err) = self.conn.execute(
            sql_queries::INSERT_ORDER,
            params![employee_id, dish_id, customizations, day],
        ) {
            if is_unique_violation(&err) {
                return Err(Error::Conflict("An order already exists for today".to_string()));
            }
            return Err(err.into());
        }
        Ok(Order {
            id: self.conn.last_insert_rowid(),
            employee_id,
            dish_id,
            customizations: customizations.to_string(),
            created_at: day,
        })
    }

    fn update_order(&mut self, order_id: i64, dish_id: i64, customizations: &str) -> Result<Order> {
        if self.conn.execute(
            sql_queries::UPDATE_ORDER,
            params![order_id, dish_id, customizations],
        )? == 0
        {
            return Err(Error::NotFound(format!("No order with id {}", order_id)));
        }
        self.order_by_id(order_id)
    }

    fn day_orders(&self, day: NaiveDate) -> Result<Vec<OrderRow>> {
        self.conn
            .prepare(sql_queries::SELECT_DAY_ORDERS)?
            .query_map(params![day], |row| {
                Ok(OrderRow {
                    username: row.get(0)?,
                    display_name: row.get(1)?,
                    dish: row.get(2)?,
                    customizations: row.get(3)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|err| err.into())
    }
}
