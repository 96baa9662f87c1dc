use std::collections::HashMap;

use matchit::Router;

use crate::errors::{self, Error, Result};
use crate::http::{Request, Response};
use crate::state::AppState;

/// Utility macro generating a constant for the HTTP endpoint, and associate it with
/// an identifier. Matchit requires both
macro_rules! make_paths {
        ($($name:ident: $path:expr,)*) => {

        pub mod paths {
                    $(
                        pub const $name: &str = concat!("/api/v1", $path);
                    )*
        }
        pub mod endpoints {
            $(
                pub const $name: &str = stringify!($name);
            )*
        }

        }
    }

make_paths! {
    MENU: "/menu",
    MENU_NOTIFY: "/menu/notify",
    MENUS: "/menus",
    MENU_BY_TOKEN: "/menus/{menu_token}",
    MENU_ORDER: "/menus/{menu_token}/order",
    ORDERS: "/orders",
    DISHES: "/dishes",
    DISH_BY_ID: "/dishes/{dish_id}",
    USERS: "/users",
}

/// Utility to add a list of paths to the router automatically
macro_rules! add_path{
    ($router:ident $(, $path:ident)*) => {
        $(
            $router.insert(paths::$path, endpoints::$path)?;
        )*
    }
}

/// Names of the parameters in the HTTP paths, used to extract them
/// from the parameters inside of request handling
pub mod params {
    /// Key of menu tokens in HTTP paths
    pub const MENU_TOKEN: &str = "menu_token";

    /// Key of dish ids in HTTP paths
    pub const DISH_ID: &str = "dish_id";
}

/// Return the HTTP path addressing a menu by its opaque token
pub fn menu_by_token(token: &str) -> String {
    paths::MENU_BY_TOKEN.replace("{menu_token}", token)
}

/// Return the HTTP path of the order page under a menu
pub fn menu_order(token: &str) -> String {
    paths::MENU_ORDER.replace("{menu_token}", token)
}

/// Return the HTTP path for a dish based on its id
pub fn dish_by_id(dish_id: i64) -> String {
    paths::DISH_BY_ID.replace("{dish_id}", &dish_id.to_string())
}

// spurious warning, I am using this in tests
#[allow(unused_macros)]
/// Utility to create easily hashmaps of parameters for testing
macro_rules! make_params {
    () => {
        std::collections::HashMap::new()
    };
    ($name:ident: $value:expr $(, $name2:ident: $value2:expr)* ) => {
        {
            let mut map = std::collections::HashMap::new();
            map.insert($crate::routes::params::$name.to_string(), $value.to_string());
            $(
                map.insert($crate::routes::params::$name2.to_string(), $value2.to_string());
            )*
            map
        }
        }
    }

#[allow(unused_imports)]
pub(crate) use make_params;

/// Create a new router with the paths defined in this module
///
/// Errors from this function are programming errors, most likely stemming from a
/// misuse of matchit
fn new_router() -> errors::Result<Router<&'static str>> {
    let mut router = Router::new();
    add_path!(
        router,
        MENU,
        MENU_NOTIFY,
        MENUS,
        MENU_BY_TOKEN,
        MENU_ORDER,
        ORDERS,
        DISHES,
        DISH_BY_ID,
        USERS
    );
    Ok(router)
}

/// Type of the object containing the HTTP path parameters passed to handlers
pub type HttpParams = HashMap<String, String>;
/// Type of the function that handles HTTP requests
pub type HttpHandler = fn(Request, HttpParams, &mut AppState) -> Result<Response>;

/// The router is in charge of taking in raw HTTP requests and to dispatch them to
/// the appropriate handler function.
pub struct HttpRouter {
    routes: Router<&'static str>,
    handlers: HashMap<&'static str, HashMap<&'static str, HttpHandler>>,
}

impl HttpRouter {
    /// Creates a new empty router
    ///
    /// Although the matchit router is not empty, there are no methods associated
    /// to the routes yet, so no request can be processed
    /// Errors in this function are programming errors.
    pub fn new() -> Result<Self> {
        let routes = new_router()?;
        Ok(HttpRouter {
            routes,
            handlers: HashMap::new(),
        })
    }

    /// Add a new route to the router
    pub fn add_route(&mut self, method: &'static str, route: &'static str, handler: HttpHandler) {
        let method_to_handler = self.handlers.entry(route).or_insert_with(HashMap::new);
        method_to_handler.insert(method, handler);
    }

    /// Sends a request to the appropriate handler if it exists
    ///
    /// If there is a route matching the request, its handler will be called and the result of the
    /// function will be the result of the handler. If no route is defined for this request,
    /// return Error::NotFound
    ///
    /// Checking that all parameters are present and that the body is correct is the
    /// responsibility of the handler
    pub fn route(&self, request: Request, state: &mut AppState) -> Result<Response> {
        let route = self
            .routes
            .at(&request.path)
            .map_err(|err| Error::NotFound(err.to_string()))?;
        let method_to_handler = self.handlers.get(route.value).ok_or_else(|| {
            Error::NotFound(format!(
                "No method associated to this route: {}",
                route.value
            ))
        })?;
        let handler = method_to_handler
            .get(request.method.as_str())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No handler for {} {}",
                    request.method.as_str(),
                    route.value
                ))
            })?;

        let params: HashMap<String, String> = route
            .params
            .iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        handler(request, params, state)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_routes() {
        let router = new_router().unwrap();
        assert_eq!(*router.at("/api/v1/menu").unwrap().value, endpoints::MENU);
        assert_eq!(
            *router.at("/api/v1/menu/notify").unwrap().value,
            endpoints::MENU_NOTIFY
        );
        assert_eq!(*router.at("/api/v1/menus").unwrap().value, endpoints::MENUS);
        assert_eq!(
            *router.at("/api/v1/menus/some-token").unwrap().value,
            endpoints::MENU_BY_TOKEN
        );
        assert_eq!(
            *router.at("/api/v1/menus/some-token/order").unwrap().value,
            endpoints::MENU_ORDER
        );
        assert_eq!(
            *router.at("/api/v1/orders").unwrap().value,
            endpoints::ORDERS
        );
        assert_eq!(
            *router.at("/api/v1/dishes").unwrap().value,
            endpoints::DISHES
        );
        assert_eq!(
            *router.at("/api/v1/dishes/7").unwrap().value,
            endpoints::DISH_BY_ID
        );
        assert_eq!(*router.at("/api/v1/users").unwrap().value, endpoints::USERS);
    }

    #[test]
    fn test_route_parameters_are_extracted() {
        let router = new_router().unwrap();

        let route = router
            .at("/api/v1/menus/3297d242-55poke/order")
            .unwrap();
        assert_eq!(route.params.get("menu_token"), Some("3297d242-55poke"));

        let route = router.at("/api/v1/dishes/12").unwrap();
        assert_eq!(route.params.get("dish_id"), Some("12"));
    }

    #[test]
    fn test_missing_routes() {
        let router = new_router().unwrap();
        assert!(router.at("/api/v1/missing").is_err());
        assert!(router.at("/api/v2/menu").is_err());
        assert!(router.at("/menu").is_err());
    }

    #[test]
    fn test_path_helpers_embed_only_the_identifier() {
        assert_eq!(menu_by_token("abc-123"), "/api/v1/menus/abc-123");
        assert_eq!(menu_order("abc-123"), "/api/v1/menus/abc-123/order");
        assert_eq!(dish_by_id(7), "/api/v1/dishes/7");
    }

    #[test]
    fn test_make_params() {
        let params = make_params!(MENU_TOKEN: "abc", DISH_ID: "2");
        assert_eq!(params.get(params::MENU_TOKEN).unwrap(), "abc");
        assert_eq!(params.get(params::DISH_ID).unwrap(), "2");
    }

    #[test]
    fn test_router_dispatches_on_path_and_method() {
        const EXPECTED_GET_MENU: &str = "get_menu";
        const EXPECTED_POST_MENUS: &str = "post_menus";

        let mut state = AppState::fixture();

        let mut router = HttpRouter::new().unwrap();
        router.add_route("GET", endpoints::MENU, |_, _, _| {
            Ok(Response::ok_with_body(EXPECTED_GET_MENU.to_string()))
        });
        router.add_route("POST", endpoints::MENUS, |_, _, _| {
            Ok(Response::ok_with_body(EXPECTED_POST_MENUS.to_string()))
        });

        let response = router
            .route(Request::get(paths::MENU), &mut state)
            .unwrap();
        assert_eq!(response.body, EXPECTED_GET_MENU);

        let response = router
            .route(Request::post(paths::MENUS, "".to_string()), &mut state)
            .unwrap();
        assert_eq!(response.body, EXPECTED_POST_MENUS);

        // Route known, method not registered.
        assert!(router
            .route(Request::put(paths::MENU, "".to_string()), &mut state)
            .is_err());
    }

    #[test]
    fn test_router_hands_parameters_to_the_handler() {
        let mut router = HttpRouter::new().unwrap();
        let mut state = AppState::fixture();

        router.add_route("POST", endpoints::MENU_ORDER, |_, params, _| {
            let token = params.get("menu_token").unwrap();
            Ok(Response::ok_with_body(token.to_string()))
        });

        let response = router
            .route(
                Request::post("/api/v1/menus/tok-42/order", "".to_string()),
                &mut state,
            )
            .unwrap();

        assert_eq!(response.body, "tok-42");
    }
}
