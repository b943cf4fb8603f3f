//! In-memory storefront backend served by actix-web on an ephemeral port, for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use actix_web::http::header::AUTHORIZATION;
use actix_web::rt::time;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use crate::client::model::cart::CartLine;
use crate::client::model::food::FoodItem;

pub(crate) const USERNAME: &str = "alice";
pub(crate) const PASSWORD: &str = "wonderland";
pub(crate) const TOKEN: &str = "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b";
const USER_ID: i64 = 7;

struct Line {
    id: i64,
    food_id: i64,
    quantity: u32,
}

struct Backend {
    foods: Vec<FoodItem>,
    lines: Vec<Line>,
    next_line_id: i64,
    next_order_id: i64,
    hits: HashMap<&'static str, usize>,
    delay: Option<Duration>,
    fail_mutations: bool,
    total_skew: Decimal,
    last_idempotency_key: Option<String>,
    /// Authorization header of the latest request per route
    auth_headers: HashMap<&'static str, Option<String>>,
}

impl Backend {
    fn seeded() -> Self {
        let food = |id, name: &str, cents, image: Option<&str>| FoodItem {
            id,
            name: name.to_string(),
            description: format!("{name}, freshly made"),
            price: Decimal::new(cents, 2),
            image_path: image.map(str::to_string),
            created_at: None,
        };
        Self {
            foods: vec![
                food(1, "Margherita Pizza", 1299, Some("/media/food_images/pizza.jpg")),
                food(2, "Caesar Salad", 850, None),
                food(3, "Chicken Wings", 950, Some("https://cdn.example.com/wings.jpg")),
            ],
            lines: Vec::new(),
            next_line_id: 1,
            next_order_id: 1,
            hits: HashMap::new(),
            delay: None,
            fail_mutations: false,
            total_skew: Decimal::ZERO,
            last_idempotency_key: None,
            auth_headers: HashMap::new(),
        }
    }

    fn cart_line(&self, line: &Line) -> Option<CartLine> {
        let food = self.foods.iter().find(|f| f.id == line.food_id)?.clone();
        Some(CartLine { id: line.id, food, quantity: line.quantity })
    }

    fn cart_lines(&self) -> Vec<CartLine> {
        self.lines.iter().filter_map(|line| self.cart_line(line)).collect()
    }
}

type State = web::Data<Mutex<Backend>>;

fn lock(state: &State) -> MutexGuard<'_, Backend> {
    state.lock().unwrap()
}

fn auth_header(req: &HttpRequest) -> Option<String> {
    req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn hit(state: &State, req: &HttpRequest, route: &'static str) {
    let mut backend = lock(state);
    *backend.hits.entry(route).or_default() += 1;
    backend.auth_headers.insert(route, auth_header(req));
}

fn authorized(req: &HttpRequest) -> bool {
    auth_header(req) == Some(format!("Token {TOKEN}"))
}

/// Token authentication runs before the view, so even public routes refuse a bad token.
fn carries_invalid_token(req: &HttpRequest) -> bool {
    auth_header(req).is_some() && !authorized(req)
}

fn invalid_token() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"detail": "Invalid token."}))
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"detail": "Authentication credentials were not provided."}))
}

fn mutation_failure() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({"error": "Failed to update cart", "detail": "database is locked"}))
}

async fn health(state: State, req: HttpRequest) -> HttpResponse {
    hit(&state, &req, "GET /health/");
    if carries_invalid_token(&req) {
        return invalid_token();
    }
    HttpResponse::Ok().json(json!({"status": "healthy", "message": "API is operational"}))
}

#[derive(Deserialize)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
}

async fn login(state: State, req: HttpRequest, body: web::Json<Credentials>) -> HttpResponse {
    hit(&state, &req, "POST /login/");
    if carries_invalid_token(&req) {
        return invalid_token();
    }
    match (body.username.as_deref(), body.password.as_deref()) {
        (Some(USERNAME), Some(PASSWORD)) => HttpResponse::Ok().json(json!({
            "token": TOKEN, "user_id": USER_ID, "username": USERNAME, "message": "Login successful"
        })),
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => {
            HttpResponse::Unauthorized().json(json!({"error": "Invalid username or password"}))
        }
        _ => HttpResponse::BadRequest().json(json!({"error": "Username and password required"})),
    }
}

async fn register(state: State, req: HttpRequest, body: web::Json<Credentials>) -> HttpResponse {
    hit(&state, &req, "POST /register/");
    if carries_invalid_token(&req) {
        return invalid_token();
    }
    match body.username.as_deref() {
        Some(USERNAME) => HttpResponse::BadRequest()
            .json(json!({"username": ["A user with that username already exists."]})),
        Some(username) if body.password.is_some() && body.email.is_some() => HttpResponse::Created().json(json!({
            "token": "fresh-token", "user_id": USER_ID + 1, "username": username,
            "message": "User registered successfully"
        })),
        _ => HttpResponse::BadRequest().json(json!({"password": ["This field is required."]})),
    }
}

async fn foods(state: State, req: HttpRequest) -> HttpResponse {
    hit(&state, &req, "GET /foods/");
    if carries_invalid_token(&req) {
        return invalid_token();
    }
    let delay = lock(&state).delay;
    if let Some(delay) = delay {
        time::sleep(delay).await;
    }
    HttpResponse::Ok().json(&lock(&state).foods)
}

async fn cart(state: State, req: HttpRequest) -> HttpResponse {
    hit(&state, &req, "GET /cart/");
    if !authorized(&req) {
        return unauthorized();
    }
    let backend = lock(&state);
    let items = backend.cart_lines();
    let total = items.iter().map(CartLine::subtotal).sum::<Decimal>() + backend.total_skew;
    // the real backend renders the total as a float
    HttpResponse::Ok().json(json!({"items": items, "total": total.to_f64()}))
}

#[derive(Deserialize)]
struct AddBody {
    food_id: i64,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

async fn cart_add(state: State, req: HttpRequest, body: web::Json<AddBody>) -> HttpResponse {
    hit(&state, &req, "POST /cart/add/");
    if !authorized(&req) {
        return unauthorized();
    }
    let mut backend = lock(&state);
    if !backend.foods.iter().any(|f| f.id == body.food_id) {
        return HttpResponse::NotFound().json(json!({"error": "Food item not found"}));
    }
    let index = match backend.lines.iter().position(|l| l.food_id == body.food_id) {
        Some(index) => {
            backend.lines[index].quantity += body.quantity;
            index
        }
        None => {
            let id = backend.next_line_id;
            backend.next_line_id += 1;
            backend.lines.push(Line { id, food_id: body.food_id, quantity: body.quantity });
            backend.lines.len() - 1
        }
    };
    HttpResponse::Created().json(backend.cart_line(&backend.lines[index]))
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: Option<u32>,
}

async fn cart_update(state: State, req: HttpRequest, id: web::Path<i64>, body: web::Json<UpdateBody>) -> HttpResponse {
    hit(&state, &req, "PUT /cart/update/");
    if !authorized(&req) {
        return unauthorized();
    }
    let mut backend = lock(&state);
    if backend.fail_mutations {
        return mutation_failure();
    }
    let id = id.into_inner();
    let Some(index) = backend.lines.iter().position(|l| l.id == id) else {
        return HttpResponse::NotFound().json(json!({"error": "Cart item not found"}));
    };
    match body.quantity {
        Some(quantity) if quantity > 0 => {
            backend.lines[index].quantity = quantity;
            HttpResponse::Ok().json(backend.cart_line(&backend.lines[index]))
        }
        _ => HttpResponse::BadRequest().json(json!({"error": "Invalid quantity"})),
    }
}

async fn cart_remove(state: State, req: HttpRequest, id: web::Path<i64>) -> HttpResponse {
    hit(&state, &req, "DELETE /cart/update/");
    if !authorized(&req) {
        return unauthorized();
    }
    let mut backend = lock(&state);
    if backend.fail_mutations {
        return mutation_failure();
    }
    let id = id.into_inner();
    let before = backend.lines.len();
    backend.lines.retain(|l| l.id != id);
    if backend.lines.len() == before {
        return HttpResponse::NotFound().json(json!({"error": "Cart item not found"}));
    }
    HttpResponse::NoContent().finish()
}

async fn order_create(state: State, req: HttpRequest) -> HttpResponse {
    hit(&state, &req, "POST /order/create/");
    if !authorized(&req) {
        return unauthorized();
    }
    let mut backend = lock(&state);
    backend.last_idempotency_key = req
        .headers()
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let items = backend.cart_lines();
    if items.is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Cart is empty"}));
    }
    let id = backend.next_order_id;
    backend.next_order_id += 1;
    backend.lines.clear();
    let total_price: Decimal = items.iter().map(CartLine::subtotal).sum();
    let order_items = items
        .iter()
        .map(|line| json!({"id": line.id, "food": line.food, "quantity": line.quantity, "price": line.food.price}))
        .collect::<Vec<_>>();
    HttpResponse::Created().json(json!({
        "id": id,
        "user": USER_ID,
        "total_price": total_price.round_dp(2),
        "created_at": Utc::now(),
        "items": order_items,
    }))
}

/// Handle to a running fake backend.
pub(crate) struct FakeBackend {
    /// base url including `/api`
    pub api_url: String,
    state: State,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: State = web::Data::new(Mutex::new(Backend::seeded()));
        let data = state.clone();
        let server = HttpServer::new(move || {
            App::new().app_data(data.clone()).service(
                web::scope("/api")
                    .route("/health/", web::get().to(health))
                    .route("/login/", web::post().to(login))
                    .route("/register/", web::post().to(register))
                    .route("/foods/", web::get().to(foods))
                    .route("/cart/", web::get().to(cart))
                    .route("/cart/add/", web::post().to(cart_add))
                    .service(
                        web::resource("/cart/update/{id}/")
                            .route(web::put().to(cart_update))
                            .route(web::delete().to(cart_remove)),
                    )
                    .route("/order/create/", web::post().to(order_create)),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("failed to bind fake backend");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        Self {
            api_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state).hits.get(route).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        lock(&self.state).hits.values().sum()
    }

    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    pub fn fail_mutations(&self, fail: bool) {
        lock(&self.state).fail_mutations = fail;
    }

    /// Makes `GET /cart/` report a total off by `skew`.
    pub fn skew_total(&self, skew: Decimal) {
        lock(&self.state).total_skew = skew;
    }

    /// Empties the cart behind the client's back.
    pub fn clear_cart(&self) {
        lock(&self.state).lines.clear();
    }

    /// Authorization header the latest request to `route` carried, `None` if it had none.
    pub fn auth_header(&self, route: &str) -> Option<String> {
        lock(&self.state).auth_headers.get(route).cloned().flatten()
    }

    pub fn last_idempotency_key(&self) -> Option<String> {
        lock(&self.state).last_idempotency_key.clone()
    }
}
