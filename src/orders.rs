//! The daily order state machine: one order per employee per day, first
//! orders gated by the cutoff hour, amendments always allowed.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::api::{OrderReceipt, OrderView, PlacedOrder};
use crate::database::Database;
use crate::errors::{at_most_one, Error, Result};
use crate::models::{Dish, Order, User};

/// Whether a first order can still be placed at `now`. Amendments are not
/// subject to this gate. Evaluated against the clock on every request,
/// never cached.
pub fn can_order(now: NaiveDateTime, cutoff_hour: u32) -> bool {
    now.time().hour() < cutoff_hour
}

/// A stored submission together with its resolved dish and how it got
/// there, ready to be rendered as a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub order: Order,
    pub dish: Dish,
    /// True when an existing order was amended instead of a row created.
    pub amended: bool,
}

impl Placed {
    /// The confirmation shown to the employee.
    pub fn note(&self) -> String {
        let lead = if self.amended {
            format!("Your order has been updated to: {}", self.dish.name)
        } else {
            format!("You have ordered {}!", self.dish.name)
        };
        order_note(&lead, &self.order.customizations)
    }
}

impl From<Placed> for OrderReceipt {
    fn from(placed: Placed) -> OrderReceipt {
        OrderReceipt {
            note: placed.note(),
            order: as_placed(placed.order, placed.dish),
        }
    }
}

/// Append the customizations to a summary line. Blank customizations leave
/// the summary untouched; non-blank ones appear trimmed after a separator.
/// The stored value itself is never trimmed.
pub fn order_note(lead: &str, customizations: &str) -> String {
    let trimmed = customizations.trim();
    if trimmed.is_empty() {
        lead.to_string()
    } else {
        format!("{} | {}", lead, trimmed)
    }
}

/// The employee's order state for today: their order and summary when one
/// exists, otherwise whether the submission window is still open.
pub fn view_order(
    db: &dyn Database,
    employee: &User,
    now: NaiveDateTime,
    cutoff_hour: u32,
) -> Result<OrderView> {
    match existing_order(db, employee, now.date())? {
        Some(order) => {
            let dish = db
                .dish_by_id(order.dish_id)?
                .ok_or(Error::UnknownDish(order.dish_id))?;
            let note = order_note(
                &format!("You have ordered {}", dish.name),
                &order.customizations,
            );
            Ok(OrderView {
                existing: Some(as_placed(order, dish)),
                note: Some(note),
                // An order on file keeps the window open for amendments
                // whatever the hour.
                ordering_open: true,
            })
        }
        None => {
            let open = can_order(now, cutoff_hour);
            Ok(OrderView {
                existing: None,
                note: if open {
                    None
                } else {
                    Some(Error::TooLate(now.time()).to_string())
                },
                ordering_open: open,
            })
        }
    }
}

/// Submit or amend today's order.
///
/// With an order already on file the submission amends it in place, same
/// row, same day, no cutoff check. Without one the cutoff gate applies,
/// then a fresh row is inserted. An insert that trips the one-per-day
/// uniqueness constraint lost a race against another submission by the
/// same employee; the constraint is believed over our earlier read and the
/// submission is retried as an amendment of the winning row.
pub fn submit_order(
    db: &mut dyn Database,
    employee: &User,
    dish_id: Option<i64>,
    customizations: &str,
    now: NaiveDateTime,
    cutoff_hour: u32,
) -> Result<Placed> {
    let dish_id = dish_id.ok_or(Error::NoDishSelected)?;
    let dish = db
        .dish_by_id(dish_id)?
        .ok_or(Error::UnknownDish(dish_id))?;
    let today = now.date();

    if let Some(order) = existing_order(&*db, employee, today)? {
        let order = db.update_order(order.id, dish_id, customizations)?;
        return Ok(Placed {
            order,
            dish,
            amended: true,
        });
    }

    if !can_order(now, cutoff_hour) {
        return Err(Error::TooLate(now.time()));
    }

    match db.insert_order(employee.id, dish_id, customizations, today) {
        Ok(order) => Ok(Placed {
            order,
            dish,
            amended: false,
        }),
        Err(Error::Conflict(reason)) => {
            let order = existing_order(&*db, employee, today)?
                .ok_or(Error::Conflict(reason))?;
            let order = db.update_order(order.id, dish_id, customizations)?;
            Ok(Placed {
                order,
                dish,
                amended: true,
            })
        }
        Err(err) => Err(err),
    }
}

fn as_placed(order: Order, dish: Dish) -> PlacedOrder {
    PlacedOrder {
        dish: dish.into(),
        customizations: order.customizations,
        date: order.created_at,
    }
}

/// Today's order for one employee, through the shared at-most-one funnel.
fn existing_order(db: &dyn Database, employee: &User, day: NaiveDate) -> Result<Option<Order>> {
    at_most_one(db.orders_for_day(employee.id, day)?, |n| {
        format!("There are {} orders for {} today", n, employee.username)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mock::MockDb;
    use crate::models::Role;

    const CUTOFF: u32 = 15;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn setup() -> (MockDb, User, Dish, Dish) {
        let mut db = MockDb::new();
        let zoe = db.insert_user("zoe", "Zoe", Role::Employee).unwrap();
        let soup = db.insert_dish("Corn soup").unwrap();
        let salad = db.insert_dish("Chicken salad").unwrap();
        (db, zoe, soup, salad)
    }

    #[test]
    fn test_can_order_flips_once_at_the_cutoff() {
        for hour in 0..24 {
            assert_eq!(can_order(at(10, hour), CUTOFF), hour < CUTOFF);
        }
        // Once closed, a later hour never reopens the window.
        let mut was_open = true;
        for hour in 0..24 {
            let open = can_order(at(10, hour), CUTOFF);
            assert!(was_open || !open);
            was_open = open;
        }
    }

    #[test]
    fn test_first_order_before_cutoff_is_created() {
        let (mut db, zoe, soup, _) = setup();

        let placed = submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 10), CUTOFF).unwrap();
        assert!(!placed.amended);
        assert_eq!(placed.note(), "You have ordered Corn soup!");
        assert_eq!(placed.order.created_at, at(10, 10).date());
        assert_eq!(db.orders.len(), 1);
    }

    #[test]
    fn test_first_order_after_cutoff_is_rejected() {
        let (mut db, zoe, soup, _) = setup();

        let err =
            submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 16), CUTOFF).unwrap_err();
        assert!(matches!(err, Error::TooLate(_)));
        assert_eq!(err.to_string(), "Too late to order, it is 16:00");
        assert!(db.orders.is_empty());
    }

    #[test]
    fn test_amending_after_cutoff_is_allowed() {
        let (mut db, zoe, soup, salad) = setup();
        let first =
            submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 10), CUTOFF).unwrap();

        let placed = submit_order(
            &mut db,
            &zoe,
            Some(salad.id),
            "dressing on the side",
            at(10, 18),
            CUTOFF,
        )
        .unwrap();

        assert!(placed.amended);
        assert_eq!(placed.order.id, first.order.id, "same row, amended");
        assert_eq!(placed.order.created_at, first.order.created_at);
        assert_eq!(
            placed.note(),
            "Your order has been updated to: Chicken salad | dressing on the side"
        );
        assert_eq!(db.orders.len(), 1);
    }

    #[test]
    fn test_resubmitting_same_day_mutates_the_single_row() {
        let (mut db, zoe, soup, salad) = setup();
        submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 9), CUTOFF).unwrap();
        submit_order(&mut db, &zoe, Some(salad.id), "", at(10, 11), CUTOFF).unwrap();

        assert_eq!(db.orders.len(), 1);
        assert_eq!(db.orders[0].dish_id, salad.id);
    }

    #[test]
    fn test_missing_and_unknown_dishes_are_rejected() {
        let (mut db, zoe, _, _) = setup();

        let err = submit_order(&mut db, &zoe, None, "extra rice", at(10, 10), CUTOFF).unwrap_err();
        assert_eq!(err.to_string(), "Please choose a dish");

        assert!(matches!(
            submit_order(&mut db, &zoe, Some(999), "", at(10, 10), CUTOFF),
            Err(Error::UnknownDish(999))
        ));
        assert!(db.orders.is_empty());
    }

    #[test]
    fn test_customizations_are_stored_verbatim_and_trimmed_in_notes() {
        let (mut db, zoe, soup, _) = setup();

        let placed = submit_order(
            &mut db,
            &zoe,
            Some(soup.id),
            "  no onions  ",
            at(10, 10),
            CUTOFF,
        )
        .unwrap();

        assert_eq!(placed.order.customizations, "  no onions  ");
        assert_eq!(placed.note(), "You have ordered Corn soup! | no onions");
    }

    #[test]
    fn test_blank_customizations_never_reach_the_note() {
        let (mut db, zoe, soup, _) = setup();

        let placed =
            submit_order(&mut db, &zoe, Some(soup.id), "   ", at(10, 10), CUTOFF).unwrap();
        assert_eq!(placed.order.customizations, "   ");
        assert_eq!(placed.note(), "You have ordered Corn soup!");
    }

    #[test]
    fn test_view_before_cutoff_without_order() {
        let (db, zoe, _, _) = setup();

        let view = view_order(&db, &zoe, at(10, 10), CUTOFF).unwrap();
        assert!(view.existing.is_none());
        assert!(view.note.is_none());
        assert!(view.ordering_open);
    }

    #[test]
    fn test_view_after_cutoff_without_order_is_closed() {
        let (db, zoe, _, _) = setup();

        let view = view_order(&db, &zoe, at(10, 17), CUTOFF).unwrap();
        assert!(!view.ordering_open);
        assert_eq!(
            view.note.as_deref(),
            Some("Too late to order, it is 17:00")
        );
    }

    #[test]
    fn test_view_with_order_stays_open_after_cutoff() {
        let (mut db, zoe, soup, _) = setup();
        submit_order(&mut db, &zoe, Some(soup.id), " no onions ", at(10, 10), CUTOFF).unwrap();

        let view = view_order(&db, &zoe, at(10, 18), CUTOFF).unwrap();
        assert!(view.ordering_open, "amendments are never gated");
        assert_eq!(
            view.note.as_deref(),
            Some("You have ordered Corn soup | no onions")
        );
        let existing = view.existing.unwrap();
        assert_eq!(existing.customizations, " no onions ");
    }

    #[test]
    fn test_two_rows_for_one_day_is_an_integrity_violation() {
        let (mut db, zoe, soup, salad) = setup();
        // Fabricate what the uniqueness constraint exists to prevent.
        for dish in [&soup, &salad] {
            db.orders.push(Order {
                id: 90 + dish.id,
                employee_id: zoe.id,
                dish_id: dish.id,
                customizations: String::new(),
                created_at: at(10, 0).date(),
            });
        }

        let err = view_order(&db, &zoe, at(10, 10), CUTOFF).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(err.to_string().contains("please contact an administrator"));
    }

    #[test]
    fn test_lost_insert_race_amends_the_winning_row() {
        let (mut db, zoe, soup, salad) = setup();
        // The racing submission already landed, but our read predates it.
        submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 9), CUTOFF).unwrap();
        db.stale_order_reads.set(1);

        let placed =
            submit_order(&mut db, &zoe, Some(salad.id), "rice", at(10, 10), CUTOFF).unwrap();

        assert!(placed.amended, "the constraint outranks the stale read");
        assert_eq!(db.orders.len(), 1);
        assert_eq!(db.orders[0].dish_id, salad.id);
        assert_eq!(db.orders[0].customizations, "rice");
    }

    #[test]
    fn test_unreadable_race_winner_surfaces_as_retryable_conflict() {
        let (mut db, zoe, soup, salad) = setup();
        submit_order(&mut db, &zoe, Some(soup.id), "", at(10, 9), CUTOFF).unwrap();
        // Both the first read and the post-conflict read come back empty.
        db.stale_order_reads.set(2);

        let err =
            submit_order(&mut db, &zoe, Some(salad.id), "", at(10, 10), CUTOFF).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(err.to_string().ends_with("please try again"));
    }
}
