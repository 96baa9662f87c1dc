// This file contains the types used to communicate through the API
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Dish, Menu, Role};

/// A dish, as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DishView {
    /// Sequential id, assigned by the server on creation
    pub id: i64,
    /// Name given on creation (unique, case-sensitive)
    pub name: String,
}

impl From<Dish> for DishView {
    fn from(dish: Dish) -> Self {
        DishView {
            id: dish.id,
            name: dish.name,
        }
    }
}

/// A published menu, as returned by the API
///
/// The menu is addressed by its opaque token everywhere outside the server;
/// the internal row id never appears on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MenuView {
    pub token: String,
    pub date: NaiveDate,
    /// Free-text message to employees
    pub detail: String,
    pub dishes: Vec<DishView>,
    pub notification_sent: bool,
}

impl From<Menu> for MenuView {
    fn from(menu: Menu) -> Self {
        MenuView {
            token: menu.token,
            date: menu.date,
            detail: menu.detail,
            dishes: menu.dishes.into_iter().map(DishView::from).collect(),
            notification_sent: menu.notification_sent,
        }
    }
}

/// Body of the publish-menu request
#[derive(Serialize, Deserialize, Debug)]
pub struct NewMenu {
    pub date: NaiveDate,
    pub detail: String,
    pub dish_ids: Vec<i64>,
}

/// Body of the edit-menu request
#[derive(Serialize, Deserialize, Debug)]
pub struct MenuUpdate {
    pub detail: String,
    pub dish_ids: Vec<i64>,
}

/// Response to menu creation/edition, menu plus a human-readable note
#[derive(Serialize, Deserialize, Debug)]
pub struct MenuReceipt {
    pub menu: MenuView,
    pub note: String,
}

/// What `GET /menu` answers: the menu when one was published for today,
/// otherwise a note saying there is none yet. An absent menu is a normal
/// state here, not an error.
#[derive(Serialize, Deserialize, Debug)]
pub struct TodayMenu {
    pub menu: Option<MenuView>,
    pub note: Option<String>,
}

/// Response to a notification request
#[derive(Serialize, Deserialize, Debug)]
pub struct NotifyReceipt {
    pub note: String,
}

/// Body of the submit-order request
///
/// `dish_id` stays optional on the wire so that "no dish picked" reaches the
/// domain check instead of failing JSON parsing; the domain is the single
/// source of truth for "a dish is mandatory".
#[derive(Serialize, Deserialize, Debug)]
pub struct NewOrder {
    pub dish_id: Option<i64>,
    #[serde(default)]
    pub customizations: String,
}

/// An existing order, as shown to its owner
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub dish: DishView,
    pub customizations: String,
    pub date: NaiveDate,
}

/// The per-employee order state for today
#[derive(Serialize, Deserialize, Debug)]
pub struct OrderView {
    /// Today's order, when one exists
    pub existing: Option<PlacedOrder>,
    /// Human-readable summary or "too late" annotation
    pub note: Option<String>,
    /// Whether submitting is currently possible: open before the cutoff,
    /// and always open to someone who already ordered today
    pub ordering_open: bool,
}

/// What `GET /menus/{token}/order` answers
#[derive(Serialize, Deserialize, Debug)]
pub struct OrderPage {
    pub menu: MenuView,
    pub order: OrderView,
}

/// Response to an order submission
#[derive(Serialize, Deserialize, Debug)]
pub struct OrderReceipt {
    pub order: PlacedOrder,
    pub note: String,
}

/// One line of the administrator's daily report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub username: String,
    pub display_name: String,
    pub dish: String,
    pub customizations: String,
}

/// What `GET /orders` answers
#[derive(Serialize, Deserialize, Debug)]
pub struct DayOrders {
    pub date: NaiveDate,
    pub orders: Vec<OrderRow>,
}

/// Body of the create-dish request
#[derive(Serialize, Deserialize, Debug)]
pub struct NewDish {
    pub name: String,
}

/// Response to dish creation/edition
#[derive(Serialize, Deserialize, Debug)]
pub struct DishReceipt {
    pub dish: DishView,
    pub note: String,
}

/// Body of the register-user request
#[derive(Serialize, Deserialize, Debug)]
pub struct NewUser {
    pub username: String,
    /// Falls back to the username when omitted or blank
    #[serde(default)]
    pub display_name: String,
    pub role: Role,
}

/// A user, as returned by the API
#[derive(Serialize, Deserialize, Debug)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

/// Error body rendered at the request boundary
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}
