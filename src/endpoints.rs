use crate::api::{
    DayOrders, DishReceipt, DishView, ErrorBody, MenuReceipt, MenuUpdate, NewDish, NewMenu,
    NewOrder, NewUser, NotifyReceipt, OrderPage, OrderReceipt, TodayMenu, UserView,
};
use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use crate::routes::*;
use crate::state::AppState;
use crate::{menus, orders, session};

/// Note shown whenever a request needs a menu that does not exist.
const NO_MENU_YET: &str = "The menu has not been created yet!";

/// Build the router with every endpoint of the API registered.
pub fn create_http_router() -> Result<HttpRouter> {
    let mut router = HttpRouter::new()?;

    router.add_route("GET", endpoints::MENU, today_menu);
    router.add_route("POST", endpoints::MENU_NOTIFY, notify_today);
    router.add_route("POST", endpoints::MENUS, publish_menu);
    router.add_route("PUT", endpoints::MENU_BY_TOKEN, update_menu);
    router.add_route("GET", endpoints::MENU_ORDER, order_page);
    router.add_route("POST", endpoints::MENU_ORDER, submit_order);
    router.add_route("GET", endpoints::ORDERS, day_orders);
    router.add_route("GET", endpoints::DISHES, list_dishes);
    router.add_route("POST", endpoints::DISHES, add_dish);
    router.add_route("PUT", endpoints::DISH_BY_ID, rename_dish);
    router.add_route("POST", endpoints::USERS, add_user);

    Ok(router)
}

/// Render an error at the request boundary.
///
/// Integrity and storage failures are the operator's problem and log at
/// error severity; a failed announcement is worth a warning; the rest is
/// everyday client mistakes, kept at debug.
pub fn error_response(err: Error) -> Response {
    match &err {
        Error::Integrity(_) | Error::Database(_) | Error::Io(_) => log::error!("{}", err),
        Error::Notification(_) => log::warn!("Announcement failed: {}", err),
        _ => log::debug!("Rejected request: {}", err),
    }
    let status = err.status();
    Response::json(
        status,
        &ErrorBody {
            error: err.to_string(),
        },
    )
    .unwrap_or_else(|_| Response::error(status))
}

/// GET /menu: today's menu, or a note that there is none. Public.
fn today_menu(_: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let today = state.clock.today();
    let body = match menus::menu_for_date(state.db.as_ref(), today)? {
        Some(menu) => TodayMenu {
            menu: Some(menu.into()),
            note: None,
        },
        None => TodayMenu {
            menu: None,
            note: Some(NO_MENU_YET.to_string()),
        },
    };
    Response::json(200, &body)
}

/// POST /menus: publish the menu for a date. Admin.
fn publish_menu(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let body: NewMenu = serde_json::from_str(&request.body)?;
    let menu = menus::publish_menu(state.db.as_mut(), body.date, &body.detail, &body.dish_ids)?;
    let note = format!("Menu has been created for {}!", menu.date);
    Response::json(201, &MenuReceipt {
        menu: menu.into(),
        note,
    })
}

/// PUT /menus/{menu_token}: replace detail and dish set. Admin.
fn update_menu(request: Request, params: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let token = params
        .get(params::MENU_TOKEN)
        .ok_or_else(|| Error::BadRequest("Missing menu token".to_string()))?;
    let body: MenuUpdate = serde_json::from_str(&request.body)?;
    let menu = menus::update_menu(state.db.as_mut(), token, &body.detail, &body.dish_ids)?;
    let note = format!("Menu for {} has been updated!", menu.date);
    Response::json(200, &MenuReceipt {
        menu: menu.into(),
        note,
    })
}

/// POST /menu/notify: announce today's menu. Admin.
fn notify_today(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let today = state.clock.today();
    let public_url = state.config.public_url.clone();
    let menu = menus::notify_today(
        state.db.as_mut(),
        state.notifier.as_ref(),
        today,
        &public_url,
    )?;
    let note = format!("The menu for {} has been announced!", menu.date);
    Response::json(200, &NotifyReceipt { note })
}

/// GET /menus/{menu_token}/order: the menu and the caller's order state.
/// Any authenticated user, admins included.
fn order_page(request: Request, params: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;

    let token = params
        .get(params::MENU_TOKEN)
        .ok_or_else(|| Error::BadRequest("Missing menu token".to_string()))?;
    let menu = state
        .db
        .menu_by_token(token)?
        .ok_or_else(|| Error::NotFound(NO_MENU_YET.to_string()))?;

    let view = orders::view_order(
        state.db.as_ref(),
        &user,
        state.clock.now(),
        state.config.cutoff_hour,
    )?;
    Response::json(200, &OrderPage {
        menu: menu.into(),
        order: view,
    })
}

/// POST /menus/{menu_token}/order: submit or amend today's order.
/// Any authenticated user.
fn submit_order(request: Request, params: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;

    let token = params
        .get(params::MENU_TOKEN)
        .ok_or_else(|| Error::BadRequest("Missing menu token".to_string()))?;
    // The link has to point at a real menu; the order itself is always
    // for today, whichever day's link was followed.
    if state.db.menu_by_token(token)?.is_none() {
        return Err(Error::NotFound(NO_MENU_YET.to_string()));
    }

    let body: NewOrder = serde_json::from_str(&request.body)?;
    let placed = orders::submit_order(
        state.db.as_mut(),
        &user,
        body.dish_id,
        &body.customizations,
        state.clock.now(),
        state.config.cutoff_hour,
    )?;
    let status = if placed.amended { 200 } else { 201 };
    Response::json(status, &OrderReceipt::from(placed))
}

/// GET /orders: everyone's pick for today. Admin.
fn day_orders(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let date = state.clock.today();
    let orders = state.db.day_orders(date)?;
    Response::json(200, &DayOrders { date, orders })
}

/// GET /dishes: the whole catalogue. Admin.
fn list_dishes(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let dishes: Vec<DishView> = state
        .db
        .list_dishes()?
        .into_iter()
        .map(DishView::from)
        .collect();
    Response::json(200, &dishes)
}

/// POST /dishes: add a dish to the catalogue. Admin.
fn add_dish(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let body: NewDish = serde_json::from_str(&request.body)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("A dish needs a name".to_string()));
    }
    let dish = state.db.insert_dish(name)?;
    let note = format!("Dish {} was added!", dish.name);
    Response::json(201, &DishReceipt {
        dish: dish.into(),
        note,
    })
}

/// PUT /dishes/{dish_id}: rename a dish. Admin.
fn rename_dish(request: Request, params: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let dish_id = params
        .get(params::DISH_ID)
        .ok_or_else(|| Error::BadRequest("Missing dish id".to_string()))
        .and_then(|id| {
            id.parse::<i64>()
                .map_err(|err| Error::BadRequest(err.to_string()))
        })?;
    let body: NewDish = serde_json::from_str(&request.body)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("A dish needs a name".to_string()));
    }
    let dish = state.db.rename_dish(dish_id, name)?;
    Response::json(200, &DishReceipt {
        dish: dish.into(),
        note: "Dish was edited successfully!".to_string(),
    })
}

/// POST /users: register a user. Admin.
fn add_user(request: Request, _: HttpParams, state: &mut AppState) -> Result<Response> {
    let user = session::current_user(state.db.as_ref(), &request)?;
    session::require_admin(&user)?;

    let body: NewUser = serde_json::from_str(&request.body)?;
    let username = body.username.trim();
    if username.is_empty() {
        return Err(Error::BadRequest("A user needs a username".to_string()));
    }
    let display_name = match body.display_name.trim() {
        "" => username,
        trimmed => trimmed,
    };
    let created = state.db.insert_user(username, display_name, body.role)?;
    Response::json(201, &UserView {
        id: created.id,
        username: created.username,
        display_name: created.display_name,
        role: created.role,
    })
}
