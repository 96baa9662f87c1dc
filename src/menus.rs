//! Menu publication: one menu per date, addressed externally by an opaque
//! token, announced over the notification channel on demand.

use chrono::NaiveDate;

use crate::database::Database;
use crate::errors::{at_most_one, Error, Result};
use crate::models::Menu;
use crate::notify::Notifier;

/// The menu published for a date, if any.
///
/// Zero rows is the everyday "not published yet" answer, not an error.
/// More than one means the date uniqueness constraint has been defeated;
/// the lookup refuses to guess which menu is real.
pub fn menu_for_date(db: &dyn Database, date: NaiveDate) -> Result<Option<Menu>> {
    at_most_one(db.menus_for_date(date)?, |n| {
        format!("There are {} menus for {}", n, date)
    })
}

/// Publish the menu for a date.
///
/// The date UNIQUE constraint decides whether the date is taken; a racing
/// publish loses with `Error::DuplicateDate` rather than trusting a prior
/// read.
pub fn publish_menu(
    db: &mut dyn Database,
    date: NaiveDate,
    detail: &str,
    dish_ids: &[i64],
) -> Result<Menu> {
    let dish_ids = checked_dish_set(&*db, dish_ids)?;
    db.insert_menu(date, detail, &dish_ids)
}

/// Replace a published menu's detail and dish set.
///
/// The menu keeps its token and date. The notification flag drops with the
/// edit, whether or not an announcement had gone out, so the flag can never
/// describe a menu nobody saw.
pub fn update_menu(
    db: &mut dyn Database,
    token: &str,
    detail: &str,
    dish_ids: &[i64],
) -> Result<Menu> {
    let dish_ids = checked_dish_set(&*db, dish_ids)?;
    let menu = db
        .menu_by_token(token)?
        .ok_or_else(|| Error::NotFound(format!("No menu at {}", token)))?;
    db.replace_menu(menu.id, detail, &dish_ids)
}

/// Announce today's menu on the notification channel.
///
/// Re-announcing an already announced menu is allowed. The flag is raised
/// strictly after the send succeeds: a failed send leaves the menu marked
/// unannounced so the failure stays visible.
pub fn notify_today(
    db: &mut dyn Database,
    notifier: &dyn Notifier,
    today: NaiveDate,
    public_url: &str,
) -> Result<Menu> {
    let menu = menu_for_date(&*db, today)?
        .ok_or_else(|| Error::NotFound("The menu has not been created yet!".to_string()))?;
    notifier.send(&announcement(&menu, public_url))?;
    db.mark_notified(menu.id)?;
    Ok(Menu {
        notification_sent: true,
        ..menu
    })
}

/// The announcement text: the menu detail, the dishes on offer, and the
/// shareable ordering link. The link embeds only the opaque token.
pub fn announcement(menu: &Menu, public_url: &str) -> String {
    let mut text = format!("The menu for {} is here :)\n{}", menu.date, menu.detail);
    for dish in &menu.dishes {
        text.push_str("\n- ");
        text.push_str(&dish.name);
    }
    text.push_str("\nOrder here: ");
    text.push_str(public_url.trim_end_matches('/'));
    text.push_str("/menus/");
    text.push_str(&menu.token);
    text.push_str("/order");
    text
}

/// A published menu always offers at least one existing dish. Returns the
/// ids deduplicated, order preserved.
fn checked_dish_set(db: &dyn Database, dish_ids: &[i64]) -> Result<Vec<i64>> {
    if dish_ids.is_empty() {
        return Err(Error::EmptyDishSet);
    }
    let mut unique = Vec::with_capacity(dish_ids.len());
    for dish_id in dish_ids {
        if db.dish_by_id(*dish_id)?.is_none() {
            return Err(Error::UnknownDish(*dish_id));
        }
        if !unique.contains(dish_id) {
            unique.push(*dish_id);
        }
    }
    Ok(unique)
}
